use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::TryStreamExt;
use log::{debug, error, info};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::io::{ReaderStream, StreamReader};
use tower_http::cors::CorsLayer;

use converter::{sandbox, AudioFormat, ConversionRequest};

use crate::error::ServerError;
use crate::state::AppState;

/// Media uploads are large; 2 GiB covers anything a phone records
const UPLOAD_LIMIT_BYTES: usize = 2 * 1024 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/api/convert", post(convert))
        .route("/download/audio/{filename}", get(download_audio))
        .route("/download/video/{filename}", get(download_video))
        .route("/api/audio/{filename}", delete(delete_audio))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": converter::APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
    }))
}

#[derive(Debug, Deserialize)]
struct ConvertParams {
    format: Option<String>,
    bitrate: Option<String>,
}

/// Upload a media file and convert its audio track.
///
/// Multipart `file` field, optional `format` (default mp3) and `bitrate`
/// (default 192k) query parameters. Returns the output filename and a
/// download locator on success.
async fn convert(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConvertParams>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ServerError> {
    let format = AudioFormat::from_name(params.format.as_deref().unwrap_or("mp3"));
    let bitrate = params.bitrate.unwrap_or_else(|| "192k".to_string());

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        info!("Uploading file: {}", original_name);

        let mut reader = StreamReader::new(field.map_err(std::io::Error::other));
        let handle = state.stager.stage(&mut reader, &original_name).await?;
        info!("File saved: {}", handle.path.display());

        let request = ConversionRequest {
            input_path: handle.path.clone(),
            format,
            bitrate: bitrate.clone(),
        };

        let (tx, mut rx) = mpsc::channel::<converter::ProgressEvent>(32);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!("Conversion progress: {}%", event.percent);
            }
        });

        let result = state.converter.convert(&request, Some(tx)).await.map_err(|e| {
            error!("Conversion failed: {e}");
            ServerError::from(e)
        })?;

        info!("Conversion completed: {}", result.file_name);

        return Ok(Json(serde_json::json!({
            "status": "success",
            "filename": result.file_name,
            "download_url": format!(
                "{}/download/audio/{}",
                state.config.public_base_url, result.file_name
            ),
        })));
    }

    Err(ServerError::BadRequest("No file uploaded".to_string()))
}

async fn download_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    serve_media_file(&state.config.audio_dir, &filename).await
}

async fn download_video(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    serve_media_file(&state.config.video_dir, &filename).await
}

/// Stream a file from `dir` as a forced download.
///
/// The filename is stripped to its final component and must resolve inside
/// the directory; anything else is reported as missing rather than leaked.
async fn serve_media_file(dir: &std::path::Path, filename: &str) -> Result<Response, ServerError> {
    let name = std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ServerError::NotFound("File not found".to_string()))?;
    let path = dir.join(name);

    if !sandbox::is_within_root(dir, &path) {
        return Err(ServerError::NotFound("File not found".to_string()));
    }

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ServerError::NotFound("File not found".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
            .map_err(|e| ServerError::Internal(e.to_string()))?,
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}

/// Advisory artifact deletion; always answers, never errors
async fn delete_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Json<serde_json::Value> {
    let deleted = state.artifacts.delete_artifact(&filename).await;
    Json(serde_json::json!({ "deleted": deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use converter::ConvertConfig;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn test_state(video: PathBuf, audio: PathBuf, ffmpeg: PathBuf) -> Arc<AppState> {
        Arc::new(AppState::new(ConvertConfig {
            video_dir: video,
            audio_dir: audio,
            cover_art_path: PathBuf::from("/nonexistent/logo.png"),
            public_base_url: "http://test.local".to_string(),
            ffmpeg_bin: ffmpeg,
            listen_addr: "127.0.0.1:0".to_string(),
        }))
    }

    fn app() -> (tempfile::TempDir, tempfile::TempDir, Router) {
        let video = tempfile::tempdir().unwrap();
        let audio = tempfile::tempdir().unwrap();
        let state = test_state(
            video.path().to_path_buf(),
            audio.path().to_path_buf(),
            PathBuf::from("ffmpeg"),
        );
        let router = create_router(state);
        (video, audio, router)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_v, _a, app) = app();
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_service_info_names_product() {
        let (_v, _a, app) = app();
        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["service"], "SoniEffect");
    }

    #[tokio::test]
    async fn test_convert_without_file_is_bad_request() {
        let (_v, _a, app) = app();
        let res = app
            .oneshot(
                Request::post("/api/convert")
                    .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from("--XBOUNDARY--\r\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_missing_file_is_404() {
        let (_v, _a, app) = app();
        let res = app
            .oneshot(
                Request::get("/download/audio/nope.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_serves_attachment() {
        let (_v, audio, app) = app();
        std::fs::write(audio.path().join("song.mp3"), b"mp3 bytes").unwrap();

        let res = app
            .oneshot(
                Request::get("/download/audio/song.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"song.mp3\""
        );
        assert_eq!(
            res.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        let body = to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"mp3 bytes");
    }

    #[tokio::test]
    async fn test_delete_endpoint_reports_boolean() {
        let (_v, audio, app) = app();
        std::fs::write(audio.path().join("gone.mp3"), b"x").unwrap();

        let res = app
            .clone()
            .oneshot(
                Request::delete("/api/audio/gone.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["deleted"], true);

        // Second delete of the same name is a calm false
        let res = app
            .oneshot(
                Request::delete("/api/audio/gone.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["deleted"], false);
    }

    #[tokio::test]
    async fn test_delete_traversal_reports_false() {
        let (_v, _a, app) = app();
        let res = app
            .oneshot(
                Request::delete("/api/audio/..%2F..%2Fetc%2Fpasswd")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["deleted"], false);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_end_to_end_with_fake_engine() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let video = tempfile::tempdir().unwrap();
        let audio = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();

        let engine = bin.path().join("fake-ffmpeg.sh");
        {
            let mut f = std::fs::File::create(&engine).unwrap();
            write!(
                f,
                "#!/bin/sh\nfor out in \"$@\"; do :; done\n\
                 echo '  Duration: 00:00:10.00' >&2\n\
                 echo 'time=00:00:10.00' >&2\n\
                 echo converted > \"$out\"\n"
            )
            .unwrap();
        }
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();

        let state = test_state(
            video.path().to_path_buf(),
            audio.path().to_path_buf(),
            engine,
        );
        let app = create_router(state);

        let body = "--XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"My Song (final)!.mov\"\r\n\
             Content-Type: video/quicktime\r\n\r\n\
             fake video bytes\r\n\
             --XBOUNDARY--\r\n"
            .to_string();

        let res = app
            .oneshot(
                Request::post("/api/convert?format=mp3&bitrate=192k")
                    .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["filename"], "SoniEffect_Converted_My_Song__final__.mp3");
        assert_eq!(
            json["download_url"],
            "http://test.local/download/audio/SoniEffect_Converted_My_Song__final__.mp3"
        );

        // Input consumed, artifact present
        assert!(!video.path().join("My_Song__final__.mov").exists());
        assert!(audio
            .path()
            .join("SoniEffect_Converted_My_Song__final__.mp3")
            .exists());
    }
}
