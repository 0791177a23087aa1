use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::FrameError;

/// Hook handing the image buffer back to the capture side.
pub type ReleaseHook = Box<dyn FnOnce(&FrameMetadata) + Send + 'static>;

/// One captured image plus metadata.
///
/// The release hook runs exactly once: `release` consumes the frame, and a
/// frame that is dropped without an explicit release is released on drop.
pub struct Frame {
    /// Image payload, `None` when the camera delivered no usable image
    pub payload: Option<Bytes>,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,

    release: Option<ReleaseHook>,
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
}

/// Orientation hint the decoder needs to read the image upright
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = FrameError;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(FrameError::InvalidRotation(other)),
        }
    }
}

impl Frame {
    pub fn new(payload: Option<Bytes>, meta: FrameMetadata) -> Self {
        Self {
            payload,
            meta: Arc::new(meta),
            timestamp: Instant::now(),
            release: None,
        }
    }

    /// Attach a release hook; hooks run in the order they were attached
    pub fn with_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&FrameMetadata) + Send + 'static,
    {
        let chained: ReleaseHook = match self.release.take() {
            Some(prev) => Box::new(move |meta: &FrameMetadata| {
                prev(meta);
                hook(meta);
            }),
            None => Box::new(hook),
        };
        self.release = Some(chained);
        self
    }

    pub fn sequence(&self) -> u64 {
        self.meta.sequence
    }

    pub fn rotation(&self) -> Rotation {
        self.meta.rotation
    }

    /// Payload if it holds at least one byte
    pub fn image(&self) -> Option<&Bytes> {
        self.payload.as_ref().filter(|data| !data.is_empty())
    }

    /// Return the buffer to the capture side
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(hook) = self.release.take() {
            hook(&self.meta);
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.meta.sequence)
            .field("payload_len", &self.payload.as_ref().map(Bytes::len))
            .field("rotation", &self.meta.rotation)
            .field("released", &self.release.is_none())
            .finish()
    }
}
