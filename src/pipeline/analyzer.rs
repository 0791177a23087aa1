//! Frame analysis: decode submission and the single-writer detection consumer

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use tracing::{debug, info, instrument, warn};

use super::dedup::DedupFilter;
use crate::capture::decoder::{Decoder, DetectionResult};
use crate::capture::Frame;
use crate::display::OverlayHandle;
use crate::error::DecodeError;
use crate::notify::{NotificationSink, Notifier};
use crate::PipelineStats;

/// A barcode value different from the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionEvent {
    pub value: String,
    pub frame_sequence: u64,
    pub detected_at: Instant,
}

/// Decode outcome posted back for one frame. Owns the frame until released.
#[derive(Debug)]
pub struct Completion {
    pub frame: Frame,
    pub outcome: Result<DetectionResult, DecodeError>,
}

/// Submits frames to the decode capability.
///
/// `analyze` awaits the decode before posting its outcome, and takes
/// `&mut self`, so one analyzer has at most one frame in flight and
/// completions reach the queue in submission order whatever the decode time.
/// Dedup state is never touched from the decode context.
pub struct FrameAnalyzer<D> {
    decoder: Arc<D>,
    completions: Sender<Completion>,
}

impl<D: Decoder> FrameAnalyzer<D> {
    pub fn new(decoder: Arc<D>, completions: Sender<Completion>) -> Self {
        Self {
            decoder,
            completions,
        }
    }

    /// Decode one frame and post the outcome for the consumer.
    /// Waits for queue space when the consumer falls behind.
    #[instrument(skip_all, fields(sequence = frame.sequence()))]
    pub async fn analyze(&mut self, frame: Frame) {
        let Some(image) = frame.image().cloned() else {
            debug!("Frame carries no image, skipping");
            frame.release();
            return;
        };

        let started = Instant::now();
        let outcome = self.decoder.decode(image, frame.rotation()).await;
        metrics::histogram!("decode_time_us").record(started.elapsed().as_micros() as f64);

        if let Err(flume::SendError(completion)) =
            self.completions.send_async(Completion { frame, outcome }).await
        {
            warn!(
                sequence = completion.frame.sequence(),
                "Completion queue closed, releasing frame"
            );
            completion.frame.release();
        }
    }
}

/// Sole owner of the dedup state; turns completions into detection events.
pub struct DetectionConsumer<S> {
    dedup: DedupFilter,
    notifier: Notifier<S>,
    overlay: Option<OverlayHandle>,
    highlight_hold: Duration,
    last_detection: Option<Instant>,
    stats: PipelineStats,
}

impl<S: NotificationSink> DetectionConsumer<S> {
    pub fn new(notifier: Notifier<S>) -> Self {
        Self {
            dedup: DedupFilter::new(),
            notifier,
            overlay: None,
            highlight_hold: Duration::from_millis(1500),
            last_detection: None,
            stats: PipelineStats::default(),
        }
    }

    /// Drive the overlay highlight from detections
    pub fn with_overlay(mut self, overlay: OverlayHandle, hold: Duration) -> Self {
        self.overlay = Some(overlay);
        self.highlight_hold = hold;
        self
    }

    pub fn dedup(&self) -> &DedupFilter {
        &self.dedup
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Process one completion and release its frame.
    ///
    /// Notifications are dispatched without waiting, so release never
    /// depends on delivery.
    #[instrument(skip_all, fields(sequence = completion.frame.sequence()))]
    pub fn handle(&mut self, completion: Completion) -> Vec<DetectionEvent> {
        let Completion { frame, outcome } = completion;
        self.stats.frames_analyzed += 1;
        metrics::counter!("frames_analyzed").increment(1);

        let values = match outcome {
            Ok(values) => values,
            Err(e) => {
                warn!("Decode failed: {}", e);
                self.stats.decode_failures += 1;
                metrics::counter!("decode_failures").increment(1);
                frame.release();
                return Vec::new();
            }
        };

        let sequence = frame.sequence();
        let events: Vec<DetectionEvent> = self
            .dedup
            .accept_frame(values.iter().map(Option::as_deref))
            .into_iter()
            .map(|value| DetectionEvent {
                value: value.to_string(),
                frame_sequence: sequence,
                detected_at: Instant::now(),
            })
            .collect();

        for event in &events {
            info!(value = %event.value, "New barcode detected");
            self.notifier.notify(event);
        }
        self.stats.detections += events.len() as u64;
        metrics::counter!("detections_emitted").increment(events.len() as u64);

        frame.release();
        self.refresh_highlight(!events.is_empty());
        events
    }

    /// Consume completions until every analyzer has gone away
    pub async fn run(mut self, completions: Receiver<Completion>) -> PipelineStats {
        let hold = self.highlight_hold.max(Duration::from_millis(10));
        loop {
            match tokio::time::timeout(hold, completions.recv_async()).await {
                Ok(Ok(completion)) => {
                    self.handle(completion);
                }
                Ok(Err(_)) => break,
                Err(_) => self.refresh_highlight(false),
            }
        }
        self.refresh_highlight(false);
        self.stats
    }

    fn refresh_highlight(&mut self, detected: bool) {
        let Some(overlay) = &self.overlay else {
            return;
        };

        if detected {
            self.last_detection = Some(Instant::now());
            overlay.set_detection(true);
        } else if self
            .last_detection
            .is_some_and(|at| at.elapsed() >= self.highlight_hold)
        {
            self.last_detection = None;
            overlay.set_detection(false);
        }
    }
}
