//! Bridge-Core: Foundation types for the ECG/EDA streaming bridge
//!
//! Raw device frames, calibrated samples, rolling buffers and the device
//! driver contract.

pub mod decoder;
pub mod device;
pub mod error;
pub mod sample;
pub mod sequence;
pub mod signal_buffer;

pub use decoder::{decode, decode_now};
pub use device::{DeviceConnector, DeviceSession};
pub use error::{BridgeError, BridgeResult};
pub use sample::*;
pub use sequence::{SequenceGap, SequenceTracker};
pub use signal_buffer::{ChannelBuffers, SignalBuffer, DEFAULT_BUFFER_CAPACITY};
