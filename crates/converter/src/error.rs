use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors surfaced by the conversion pipeline.
///
/// All three variants are fatal to the request they occur in; none triggers
/// an automatic retry. Artifact deletion is the one operation that swallows
/// its failures instead of reporting them here.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The resolved input path failed sandbox validation
    #[error("invalid input path: {0}")]
    InvalidInput(String),

    /// The transcoding engine exited non-zero
    #[error("transcode failed (exit code {code:?}):\n{stderr_tail}")]
    TranscodeFailed {
        code: Option<i32>,
        stderr_tail: String,
    },

    /// Staging or storage failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
