//! Scanner pipeline: camera -> latest-frame slot -> analyzer -> consumer

pub mod analyzer;
pub mod dedup;
pub mod slot;

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tracing::{debug, info, instrument};

pub use analyzer::{Completion, DetectionConsumer, DetectionEvent, FrameAnalyzer};
pub use dedup::DedupFilter;
pub use slot::LatestFrameSlot;

use crate::capture::{Decoder, ReplayCamera};
use crate::display::OverlayRenderer;
use crate::notify::{NotificationSink, Notifier};
use crate::{Config, PipelineStats};

/// Paint cadence of the render loop
const RENDER_INTERVAL: Duration = Duration::from_millis(16);

/// Outcome of a finished pipeline run
pub struct PipelineReport {
    pub stats: PipelineStats,
    /// Frames handed back to the camera
    pub buffers_returned: u64,
    pub overlay: OverlayRenderer,
}

/// Run the scanner until the camera runs dry.
///
/// Frames are analyzed one at a time; decode completions are serialized
/// through a single consumer that owns the dedup state. The overlay lives on
/// its own render thread and only sees commands posted through its handle.
#[instrument(skip_all)]
pub async fn run_pipeline<D, S>(
    config: &Config,
    camera: ReplayCamera,
    decoder: Arc<D>,
    sink: Arc<S>,
) -> Result<PipelineReport>
where
    D: Decoder,
    S: NotificationSink,
{
    let slot = LatestFrameSlot::new(1);
    let (completion_tx, completion_rx) = flume::bounded(config.pipeline.completion_queue.max(1));

    let (mut renderer, overlay) = OverlayRenderer::with_handle(config.overlay.constants());
    overlay.layout(config.overlay.width, config.overlay.height);
    let render_task = tokio::task::spawn_blocking(move || {
        while renderer.wait_for_commands(RENDER_INTERVAL) {
            if renderer.needs_repaint() {
                renderer.draw();
            }
        }
        renderer.draw();
        renderer
    });

    let consumer = DetectionConsumer::new(Notifier::new(sink, &config.notify)).with_overlay(
        overlay.clone(),
        Duration::from_millis(config.pipeline.highlight_hold_ms),
    );
    let consumer_task = tokio::spawn(consumer.run(completion_rx));

    let returned = camera.returned_buffers();
    let camera_task = tokio::spawn(camera.stream_into(slot.clone()));

    let mut analyzer = FrameAnalyzer::new(decoder, completion_tx);
    while let Some(frame) = slot.next().await {
        analyzer.analyze(frame).await;
    }
    drop(analyzer);
    debug!("Camera closed, draining completions");

    let frames_captured = camera_task.await?;
    let mut stats = consumer_task.await?;
    drop(overlay);
    let overlay = render_task.await?;

    let (_, _, dropped) = slot.stats();
    stats.frames_captured = frames_captured;
    stats.frames_dropped = dropped;
    info!(
        captured = stats.frames_captured,
        dropped = stats.frames_dropped,
        analyzed = stats.frames_analyzed,
        failures = stats.decode_failures,
        detections = stats.detections,
        "Pipeline finished"
    );

    Ok(PipelineReport {
        stats,
        buffers_returned: returned.load(std::sync::atomic::Ordering::Relaxed),
        overlay,
    })
}
