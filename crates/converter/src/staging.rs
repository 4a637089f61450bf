use std::path::PathBuf;
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::Result;

/// Handle to a staged upload inside the input root.
///
/// The path is always `<video_dir>/<file_name>` with `file_name` produced by
/// [`sanitize_filename`], so it cannot point outside the root. The handle is
/// consumed by the artifact lifecycle manager once the conversion succeeds.
#[derive(Debug, Clone)]
pub struct InputHandle {
    /// Filename as supplied by the client (untrusted, for logging only)
    pub original_name: String,
    /// Sanitized filename the upload was written to
    pub file_name: String,
    /// Full path of the staged file inside the input root
    pub path: PathBuf,
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Whitelist characters keep their relative order; everything else, including
/// path separators, collapses to underscores, so the result is always a bare
/// filename.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes incoming upload streams into the input root
#[derive(Debug, Clone)]
pub struct Stager {
    video_dir: PathBuf,
}

impl Stager {
    pub fn new(video_dir: PathBuf) -> Self {
        Self { video_dir }
    }

    /// Stream an upload body to a sanitized filename inside the input root.
    ///
    /// The body is copied chunk by chunk, never buffered whole. A partially
    /// written file left behind by a failed copy is not cleaned up here.
    pub async fn stage<R>(&self, reader: &mut R, original_name: &str) -> Result<InputHandle>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file_name = sanitize_filename(original_name);
        let path = self.video_dir.join(&file_name);

        debug!("Staging upload '{}' as {}", original_name, path.display());

        let mut file = tokio::fs::File::create(&path).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;

        info!("Staged {} ({} bytes)", path.display(), written);

        Ok(InputHandle {
            original_name: original_name.to_string(),
            file_name,
            path,
        })
    }
}
