use thiserror::Error;

/// Failure reported by a decode capability for one frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("image payload could not be decoded: {0}")]
    Malformed(String),
}

/// Failure reported by a notification sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Frame construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unsupported rotation: {0} degrees")]
    InvalidRotation(u32),
}
