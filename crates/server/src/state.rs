use converter::{ArtifactStore, ConvertConfig, Converter, Stager};

/// Shared application state handed to every handler
pub struct AppState {
    pub config: ConvertConfig,
    pub converter: Converter,
    pub stager: Stager,
    pub artifacts: ArtifactStore,
}

impl AppState {
    pub fn new(config: ConvertConfig) -> Self {
        let stager = Stager::new(config.video_dir.clone());
        let artifacts = ArtifactStore::new(config.video_dir.clone(), config.audio_dir.clone());
        let converter = Converter::new(config.clone());
        Self {
            config,
            converter,
            stager,
            artifacts,
        }
    }
}
