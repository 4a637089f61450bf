mod error;
mod routes;
mod state;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use converter::ConvertConfig;
use log::{info, warn};

use crate::routes::create_router;
use crate::state::AppState;

/// SoniEffect audio conversion server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Default log filter when RUST_LOG is unset
fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; --verbose only raises the default
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(args.verbose)),
    )
    .format_timestamp_secs()
    .init();

    let cfg = ConvertConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    info!("{} server starting", converter::APP_NAME);
    info!("Configuration loaded:");
    info!("  Video dir: {}", cfg.video_dir.display());
    info!("  Audio dir: {}", cfg.audio_dir.display());
    info!("  Cover art: {}", cfg.cover_art_path.display());
    info!("  Public base URL: {}", cfg.public_base_url);
    info!("  ffmpeg binary: {}", cfg.ffmpeg_bin.display());

    // Both roots must exist before the first upload arrives
    for dir in [&cfg.video_dir, &cfg.audio_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    if !cfg.cover_art_path.exists() {
        warn!(
            "Cover art not found at {}; outputs will have no embedded art",
            cfg.cover_art_path.display()
        );
    }

    let listen_addr = cfg.listen_addr.clone();
    let state = Arc::new(AppState::new(cfg));
    let app = create_router(state);

    info!("Listening on {}", listen_addr);
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated")?;

    Ok(())
}
