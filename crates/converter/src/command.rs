use std::path::Path;

/// Target audio container/codec selected by the client.
///
/// Unknown format names fall back to `Wav` (uncompressed PCM), mirroring the
/// engine's "anything else gets pcm_s16le" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Flac,
    Wav,
}

impl AudioFormat {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "mp3" => AudioFormat::Mp3,
            "m4a" => AudioFormat::M4a,
            "flac" => AudioFormat::Flac,
            _ => AudioFormat::Wav,
        }
    }

    /// File extension used for output naming
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
        }
    }
}

/// Command builder for generating ffmpeg argument lists
pub struct CommandBuilder;

impl CommandBuilder {
    pub fn new() -> Self {
        CommandBuilder
    }

    /// Build the full audio-extraction command.
    ///
    /// Always requests hardware-accelerated decode, a bounded input thread
    /// queue, and audio stream 0 from the input. When `cover_art` is given it
    /// becomes a second input attached as embedded cover art. Codec selection
    /// is format-driven; `title_tag` is the random 3-digit suffix embedded in
    /// the title metadata so players don't serve stale cached tags.
    pub fn build(
        &self,
        input: &Path,
        output: &Path,
        format: AudioFormat,
        bitrate: &str,
        cover_art: Option<&Path>,
        title_tag: u32,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "info".into(),
            "-hwaccel".into(),
            "auto".into(),
            "-thread_queue_size".into(),
            "4096".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
        ];

        if let Some(cover) = cover_art {
            args.push("-i".into());
            args.push(cover.to_string_lossy().into_owned());
        }

        args.push("-map".into());
        args.push("0:a:0".into());

        if cover_art.is_some() {
            args.push("-map".into());
            args.push("1:v:0".into());
            args.push("-disposition:v:0".into());
            args.push("attached_pic".into());
        }

        match format {
            AudioFormat::Mp3 => {
                args.push("-c:a".into());
                args.push("libmp3lame".into());
                args.push("-b:a".into());
                args.push(bitrate.to_string());
                // Fastest LAME compression level; quality is set by bitrate
                args.push("-compression_level".into());
                args.push("0".into());
                args.push("-id3v2_version".into());
                args.push("3".into());
                args.push("-metadata:s:v".into());
                args.push("title=Album cover".into());
                args.push("-metadata:s:v".into());
                args.push("comment=Cover (front)".into());
            }
            AudioFormat::M4a => {
                args.push("-c:a".into());
                args.push("aac".into());
                args.push("-b:a".into());
                args.push(bitrate.to_string());
                // Raise the AAC cutoff so high frequencies survive
                args.push("-cutoff".into());
                args.push("20000".into());
            }
            AudioFormat::Flac => {
                args.push("-c:a".into());
                args.push("flac".into());
            }
            AudioFormat::Wav => {
                args.push("-c:a".into());
                args.push("pcm_s16le".into());
            }
        }

        args.push("-metadata".into());
        args.push(format!("title={} Audio #{}", crate::APP_NAME, title_tag));
        args.push("-metadata".into());
        args.push(format!("artist={}", crate::APP_NAME));
        args.push("-metadata".into());
        args.push(format!("album={} Conversions", crate::APP_NAME));
        args.push("-movflags".into());
        args.push("+faststart".into());
        args.push("-threads".into());
        args.push("0".into());
        args.push(output.to_string_lossy().into_owned());

        args
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}
