pub mod capture;
pub mod display;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod utils;

use std::path::PathBuf;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

pub use capture::{Frame, Rotation, Symbology};
pub use display::{OverlayConstants, OverlayHandle, OverlayRenderer};
pub use pipeline::{DedupFilter, DetectionConsumer, DetectionEvent, FrameAnalyzer};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub pipeline: PipelineConfig,
    pub overlay: OverlayConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Replay script, one line per frame
    pub script: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub rotation_degrees: u32,
    /// Formats the decoder reports, everything else is dropped
    pub formats: Vec<Symbology>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub completion_queue: usize,
    /// How long the overlay stays green after the last new detection
    pub highlight_hold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Preview surface size in pixels
    pub width: u32,
    pub height: u32,
    pub margin: i32,
    pub corner_radius: f32,
    pub reference_width: f32,
    pub reference_height: f32,
    pub fill_alpha: u8,
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub recipients: Vec<String>,
    pub subject: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from("scan.txt"),
            width: 640,
            height: 480,
            fps: 30,
            rotation_degrees: 90,
            formats: vec![Symbology::Ean13, Symbology::UpcA, Symbology::UpcE],
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            completion_queue: 4,
            highlight_hold_ms: 1500,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            margin: 50,
            corner_radius: 20.0,
            reference_width: 480.0,
            reference_height: 640.0,
            fill_alpha: 80,
            snapshot_path: None,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            subject: "barcode result".into(),
        }
    }
}

impl OverlayConfig {
    pub fn constants(&self) -> OverlayConstants {
        OverlayConstants {
            margin: self.margin,
            corner_radius: self.corner_radius,
            reference_width: self.reference_width,
            reference_height: self.reference_height,
            fill_alpha: self.fill_alpha,
        }
    }
}

/// Counters collected over one pipeline run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub frames_analyzed: u64,
    pub decode_failures: u64,
    pub detections: u64,
}
