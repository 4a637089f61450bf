pub mod artifact;
pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod sandbox;
pub mod staging;

pub use artifact::ArtifactStore;
pub use command::{AudioFormat, CommandBuilder};
pub use config::ConvertConfig;
pub use error::{ConvertError, Result};
pub use pipeline::{ConversionRequest, ConversionResult, Converter};
pub use progress::{ProgressEvent, ProgressParser};
pub use staging::{InputHandle, Stager};

/// Product name used for output file naming and embedded metadata
pub const APP_NAME: &str = "SoniEffect";
