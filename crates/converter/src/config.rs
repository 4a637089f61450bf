use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the SoniEffect conversion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Directory where uploaded video files are staged (input root)
    pub video_dir: PathBuf,
    /// Directory where converted audio files are written (output root)
    pub audio_dir: PathBuf,
    /// Cover-art image embedded into outputs when the file exists
    pub cover_art_path: PathBuf,
    /// Base URL used to build download locators returned to clients
    pub public_base_url: String,
    /// Path to the ffmpeg binary
    pub ffmpeg_bin: PathBuf,
    /// Address the HTTP server binds to
    pub listen_addr: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ConvertConfig {
    /// Defaults suitable for a local development run
    pub fn default_config() -> Self {
        Self {
            video_dir: PathBuf::from("media/video"),
            audio_dir: PathBuf::from("media/audio"),
            cover_art_path: PathBuf::from("assets/logo/logo.png"),
            public_base_url: "http://127.0.0.1:5000".to_string(),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            listen_addr: "0.0.0.0:5000".to_string(),
        }
    }

    /// Read configuration from a TOML or JSON file.
    ///
    /// A missing path, or no path at all, yields the defaults; a present but
    /// unparseable file is an error rather than a silent fallback.
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    let file_config: ConvertConfig = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                    config = file_config;
                } else {
                    let file_config: ConvertConfig = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                    config = file_config;
                }
            }
        }

        Ok(config)
    }
}
