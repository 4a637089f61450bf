use std::path::{Path, PathBuf};
use log::{debug, warn};

use crate::command::AudioFormat;
use crate::error::Result;
use crate::sandbox;
use crate::staging::sanitize_filename;

/// Lifecycle manager for staged inputs and produced artifacts.
///
/// Owns output naming, discards consumed inputs, and offers best-effort
/// deletion of artifacts by bare filename.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    video_dir: PathBuf,
    audio_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(video_dir: PathBuf, audio_dir: PathBuf) -> Self {
        Self {
            video_dir,
            audio_dir,
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    /// Output filename for a conversion: `SoniEffect_Converted_<stem>.<ext>`.
    ///
    /// The stem is re-sanitized with the staging whitelist, so a caller-built
    /// stem cannot smuggle separators into the name.
    pub fn output_file_name(stem: &str, format: AudioFormat) -> String {
        format!(
            "{}_Converted_{}.{}",
            crate::APP_NAME,
            sanitize_filename(stem),
            format.extension()
        )
    }

    /// Full output path inside the output root
    pub fn output_path(&self, stem: &str, format: AudioFormat) -> PathBuf {
        self.audio_dir.join(Self::output_file_name(stem, format))
    }

    /// Remove a staged input once the engine has consumed it.
    ///
    /// A file that already vanished is not an error; anything else is.
    pub async fn discard_input(&self, input: &Path) -> Result<()> {
        match tokio::fs::remove_file(input).await {
            Ok(()) => {
                debug!("Removed staged input {}", input.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort deletion of a produced artifact by bare filename.
    ///
    /// The name is stripped to its final component and must resolve inside
    /// the output root. Every failure, including OS-level deletion errors,
    /// becomes `false` — deletion is advisory cleanup and must never crash
    /// a caller asking to remove an unknown or already-removed file.
    pub async fn delete_artifact(&self, filename: &str) -> bool {
        let Some(name) = Path::new(filename).file_name() else {
            return false;
        };
        let target = self.audio_dir.join(name);

        if !sandbox::is_within_root(&self.audio_dir, &target) {
            warn!("Refusing to delete outside output root: {}", filename);
            return false;
        }

        match tokio::fs::remove_file(&target).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Delete of {} failed: {}", target.display(), e);
                false
            }
        }
    }
}
