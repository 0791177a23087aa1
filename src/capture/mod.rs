pub mod decoder;
pub mod frame;
pub mod replay;

pub use decoder::{Decoder, DetectionResult, ScriptDecoder, Symbology};
pub use frame::Frame;
pub use frame::{FrameMetadata, Rotation};
pub use replay::ReplayCamera;
