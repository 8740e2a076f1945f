//! Contract between the bridge and an acquisition device driver
//!
//! The physical link is an external collaborator. Drivers implement these
//! traits; the streaming server only ever talks to them through here.

use crate::error::BridgeResult;
use crate::sample::RawSample;
use async_trait::async_trait;

/// Sampling rate the bridge acquires at
pub const DEFAULT_SAMPLING_RATE_HZ: u32 = 100;

/// Analog inputs carrying ECG (A1) and EDA (A2)
pub const DEFAULT_CHANNELS: [usize; 2] = [0, 1];

/// Samples pulled from the device per loop iteration
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Establishes a link to a device by address
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    type Session: DeviceSession;

    /// Open the hardware link; fails with `ConnectFailed`
    async fn open(&self, address: &str) -> BridgeResult<Self::Session>;
}

/// An open link to an acquisition device
#[async_trait]
pub trait DeviceSession: Send {
    /// Begin sampling; fails with `DeviceRejected`
    async fn start_acquisition(
        &mut self,
        sampling_rate_hz: u32,
        channels: &[usize],
    ) -> BridgeResult<()>;

    /// Wait for and return the next `count` samples; fails with `ReadFailed`
    async fn read_batch(&mut self, count: usize) -> BridgeResult<Vec<RawSample>>;

    /// Stop sampling
    async fn stop(&mut self) -> BridgeResult<()>;

    /// Release the link. Idempotent and infallible.
    async fn close(&mut self);

    /// Human-readable identifier for logs
    fn describe(&self) -> String {
        "device".to_string()
    }
}
