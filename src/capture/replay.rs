//! Scripted camera that replays recorded scans as frames
//!
//! Script format, one frame per line:
//! - `-` delivers a frame without an image
//! - `!` delivers an image the decoder fails on
//! - an empty line delivers an image with no barcode in it
//! - anything else is a comma separated list of values seen in that frame
//! - lines starting with `#` are comments

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument};

use super::frame::{Frame, FrameMetadata, Rotation};
use crate::pipeline::LatestFrameSlot;
use crate::CaptureConfig;

pub struct ReplayCamera {
    lines: Vec<String>,
    cursor: usize,
    config: CaptureConfig,
    rotation: Rotation,
    sequence: u64,
    returned: Arc<AtomicU64>,
}

impl ReplayCamera {
    /// Load the script named in the capture config
    pub async fn open(config: CaptureConfig) -> Result<Self> {
        info!("Opening replay script: {}", config.script.display());
        let script = tokio::fs::read_to_string(&config.script)
            .await
            .map_err(|e| eyre!("Failed to read {}: {}", config.script.display(), e))?;
        Self::from_script(&script, config)
    }

    pub fn from_script(script: &str, config: CaptureConfig) -> Result<Self> {
        if config.fps == 0 {
            return Err(eyre!("Capture fps must be non-zero"));
        }
        let rotation = Rotation::try_from(config.rotation_degrees)?;
        let lines: Vec<String> = script
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .map(str::to_owned)
            .collect();

        info!("Replay camera ready: {} frames at {} fps", lines.len(), config.fps);
        Ok(Self {
            lines,
            cursor: 0,
            config,
            rotation,
            sequence: 0,
            returned: Arc::new(AtomicU64::new(0)),
        })
    }

    #[cfg(test)]
    pub fn remaining(&self) -> usize {
        self.lines.len() - self.cursor
    }

    /// Frames handed back by the pipeline so far
    pub fn returned_buffers(&self) -> Arc<AtomicU64> {
        self.returned.clone()
    }

    /// Produce the next frame, `None` at end of script
    pub fn capture_frame(&mut self) -> Option<Frame> {
        let line = self.lines.get(self.cursor)?.trim();
        let payload = match line {
            "-" => None,
            "" => Some(Bytes::from_static(b" ")),
            text => Some(Bytes::copy_from_slice(text.as_bytes())),
        };
        self.cursor += 1;
        self.sequence += 1;

        let returned = self.returned.clone();
        let frame = Frame::new(
            payload,
            FrameMetadata {
                sequence: self.sequence,
                width: self.config.width,
                height: self.config.height,
                rotation: self.rotation,
            },
        )
        .with_release(move |_| {
            returned.fetch_add(1, Ordering::Relaxed);
        });
        Some(frame)
    }

    /// Push every frame into `slot` at the configured rate, then close it.
    /// Returns the number of frames captured.
    #[instrument(skip_all, fields(fps = self.config.fps))]
    pub async fn stream_into(mut self, slot: LatestFrameSlot) -> u64 {
        let mut ticker = tokio::time::interval(Duration::from_secs(1) / self.config.fps);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while let Some(frame) = self.capture_frame() {
            ticker.tick().await;
            slot.push(frame);
        }
        slot.close();
        info!("Replay finished after {} frames", self.sequence);
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(frame: &Frame) -> Option<&[u8]> {
        frame.image().map(|data| &data[..])
    }

    fn camera(script: &str) -> ReplayCamera {
        ReplayCamera::from_script(script, CaptureConfig::default()).unwrap()
    }

    #[test]
    fn parses_script_lines_into_frames() {
        let mut cam = camera("# header\n036000291452\n-\n\n!\n");
        assert_eq!(cam.remaining(), 4);

        let first = cam.capture_frame().unwrap();
        assert_eq!(first.sequence(), 1);
        assert_eq!(first.rotation(), Rotation::Deg90);
        assert_eq!(image(&first), Some(&b"036000291452"[..]));

        assert_eq!(image(&cam.capture_frame().unwrap()), None);
        assert_eq!(image(&cam.capture_frame().unwrap()), Some(&b" "[..]));
        assert_eq!(image(&cam.capture_frame().unwrap()), Some(&b"!"[..]));
        assert!(cam.capture_frame().is_none());

        drop(first);
        assert_eq!(cam.returned_buffers().load(Ordering::Relaxed), 4);
    }

    #[test]
    fn rejects_bad_rotation_and_zero_fps() {
        let config = CaptureConfig {
            rotation_degrees: 45,
            ..CaptureConfig::default()
        };
        assert!(ReplayCamera::from_script("", config).is_err());

        let config = CaptureConfig {
            fps: 0,
            ..CaptureConfig::default()
        };
        assert!(ReplayCamera::from_script("", config).is_err());
    }

    #[tokio::test]
    async fn streams_into_slot_and_closes() {
        let cam = camera("036000291452\n4006381333931\n");
        let returned = cam.returned_buffers();
        let slot = LatestFrameSlot::new(4);

        let produced = cam.stream_into(slot.clone()).await;
        assert_eq!(produced, 2);

        let mut seen = Vec::new();
        while let Some(frame) = slot.next().await {
            seen.push(frame.sequence());
            frame.release();
        }
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(returned.load(Ordering::Relaxed), 2);
    }
}
