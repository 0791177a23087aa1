//! Lookout barcode scanner, driven by a replayed camera script

use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::Result;
use tracing::{info, warn};

use lookout::capture::{ReplayCamera, ScriptDecoder};
use lookout::display::raster;
use lookout::notify::LogSink;
use lookout::pipeline::run_pipeline;
use lookout::utils;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lookout=debug".into()),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Lookout launching...");

    // Load configuration: first argument is an optional config file
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = utils::load_config(config_path.as_deref())?;
    lookout::CONFIG.store(Arc::new(config));
    let config = lookout::CONFIG.load_full();

    let camera = ReplayCamera::open(config.capture.clone()).await?;
    let decoder = Arc::new(ScriptDecoder::new(config.capture.formats.clone()));

    let report = tokio::select! {
        report = run_pipeline(&config, camera, decoder, Arc::new(LogSink)) => report?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down");
            return Ok(());
        }
    };

    info!(
        "Scan complete: {} new barcodes from {} frames ({} dropped, {} buffers returned)",
        report.stats.detections,
        report.stats.frames_captured,
        report.stats.frames_dropped,
        report.buffers_returned
    );

    if let Some(path) = &config.overlay.snapshot_path {
        let mut overlay = report.overlay;
        match overlay.draw() {
            Some(surface) => raster::save_snapshot(surface, path)?,
            None => warn!("Overlay has no size, skipping snapshot"),
        }
    }

    info!("Lookout shutting down");
    Ok(())
}
