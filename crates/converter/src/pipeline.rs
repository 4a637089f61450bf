use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;

use log::{debug, info, warn};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::artifact::ArtifactStore;
use crate::command::{AudioFormat, CommandBuilder};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::progress::{ProgressEvent, ProgressParser};

/// Diagnostic lines retained for the error report when the engine fails
const STDERR_TAIL_LINES: usize = 20;

/// One conversion invocation. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Staged input file; must resolve inside the input root
    pub input_path: PathBuf,
    pub format: AudioFormat,
    pub bitrate: String,
}

/// Outcome of a successful conversion.
///
/// Only produced when the engine exited zero and the output file exists.
/// The caller owns the artifact from here and is responsible for eventual
/// deletion through [`ArtifactStore::delete_artifact`].
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub output_path: PathBuf,
    pub file_name: String,
}

/// Drives the transcoding engine for one request at a time.
///
/// Each call spawns one engine process, supervises it to exit, and parses
/// its diagnostic stream for progress. Concurrent calls are independent; the
/// only shared state is the input/output directory namespace. There is no
/// internal timeout or cancellation: a stalled engine blocks its caller until
/// an external watchdog kills the process.
pub struct Converter {
    cfg: ConvertConfig,
    builder: CommandBuilder,
    artifacts: ArtifactStore,
}

impl Converter {
    pub fn new(cfg: ConvertConfig) -> Self {
        let artifacts = ArtifactStore::new(cfg.video_dir.clone(), cfg.audio_dir.clone());
        Self {
            cfg,
            builder: CommandBuilder::new(),
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Convert a staged input to the requested audio format.
    ///
    /// Progress events are delivered through `progress` with `try_send`;
    /// a full channel drops the event rather than stalling the encode, so
    /// delivery is lossy but ordering is preserved. The staged input is
    /// deleted once the engine exits zero and the output file is confirmed
    /// on disk; on failure the input stays put for the caller to retry or
    /// clean up.
    pub async fn convert(
        &self,
        req: &ConversionRequest,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Result<ConversionResult> {
        let input = req
            .input_path
            .canonicalize()
            .map_err(|_| ConvertError::InvalidInput(req.input_path.display().to_string()))?;

        if !crate::sandbox::is_within_root(&self.cfg.video_dir, &input) {
            return Err(ConvertError::InvalidInput(format!(
                "{} is outside the input root",
                req.input_path.display()
            )));
        }

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        let file_name = ArtifactStore::output_file_name(stem, req.format);
        let output_path = self.artifacts.output_path(stem, req.format);

        let cover_art = self.cfg.cover_art_path.exists().then_some(self.cfg.cover_art_path.as_path());
        let title_tag = rand::thread_rng().gen_range(100..1000);

        let args = self.builder.build(
            &input,
            &output_path,
            req.format,
            &req.bitrate,
            cover_art,
            title_tag,
        );
        debug!(
            "Spawning engine: {} {}",
            self.cfg.ffmpeg_bin.display(),
            args.join(" ")
        );

        let mut child = Command::new(&self.cfg.ffmpeg_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Stderr handle exists because we just asked for a pipe
        let stderr = child.stderr.take().ok_or_else(|| {
            ConvertError::Io(std::io::Error::other("engine stderr was not captured"))
        })?;

        let mut parser = ProgressParser::new();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut lines = BufReader::new(stderr).lines();

        let mut read_err = None;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.clone());

                    if let Some(event) = parser.push_line(&line) {
                        if let Some(tx) = &progress {
                            // Lossy on purpose: progress must never stall the encode
                            let _ = tx.try_send(event);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    read_err = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = read_err {
            // The diagnostic stream died under us; don't leak the process
            let _ = child.kill().await;
            let _ = child.wait().await;
            return Err(e.into());
        }

        // Stream closed; reap the process exactly once
        let status = child.wait().await?;

        if !status.success() {
            warn!(
                "Engine exited non-zero ({:?}) for {}",
                status.code(),
                input.display()
            );
            return Err(ConvertError::TranscodeFailed {
                code: status.code(),
                stderr_tail: tail.iter().cloned().collect::<Vec<_>>().join("\n"),
            });
        }

        // Exit code alone has lied before; require the artifact on disk
        // before the input is considered spent
        if tokio::fs::metadata(&output_path).await.is_err() {
            return Err(ConvertError::TranscodeFailed {
                code: status.code(),
                stderr_tail: format!("engine exited zero but produced no output at {}", output_path.display()),
            });
        }

        // Input is spent; the lifecycle manager retires it
        self.artifacts.discard_input(&input).await?;

        info!("Conversion complete: {}", file_name);

        Ok(ConversionResult {
            output_path,
            file_name,
        })
    }
}
