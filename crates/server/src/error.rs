use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use converter::ConvertError;

/// Error payload returned to HTTP clients
#[derive(Debug)]
pub enum ServerError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<ConvertError> for ServerError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::InvalidInput(_) => ServerError::BadRequest(err.to_string()),
            ConvertError::TranscodeFailed { .. } => ServerError::Internal(err.to_string()),
            ConvertError::Io(_) => ServerError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ServerError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
