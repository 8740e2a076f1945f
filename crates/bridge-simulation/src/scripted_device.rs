//! Deterministic device for tests and playback
//!
//! Emits a known sequence-number progression with fixed or cycled ADC codes,
//! and can inject failures at each stage of the device lifecycle. A shared
//! [`DeviceProbe`] records what the bridge did to the device so tests can
//! check that cleanup really happened.

use async_trait::async_trait;
use bridge_core::{BridgeError, BridgeResult, DeviceConnector, DeviceSession, RawSample};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

/// Behaviour of a scripted device
#[derive(Debug, Clone)]
pub struct ScriptedConfig {
    /// Sequence number of the first sample
    pub first_seq: i64,
    /// ECG codes, cycled sample by sample
    pub ecg_pattern: Vec<i64>,
    /// Constant EDA code
    pub eda_code: i64,
    /// `open` fails with `ConnectFailed`
    pub fail_open: bool,
    /// `start_acquisition` fails with `DeviceRejected`
    pub reject_start: bool,
    /// Zero-based batch index whose read fails
    pub fail_read_at: Option<usize>,
    /// After this many batches, reads never complete
    pub stall_after: Option<usize>,
    /// `stop` returns an error
    pub fail_stop: bool,
    /// Artificial delay before each batch is returned
    pub batch_delay: Option<Duration>,
}

impl Default for ScriptedConfig {
    fn default() -> Self {
        Self {
            first_seq: 0,
            ecg_pattern: vec![512],
            eda_code: 512,
            fail_open: false,
            reject_start: false,
            fail_read_at: None,
            stall_after: None,
            fail_stop: false,
            batch_delay: None,
        }
    }
}

/// Counters shared between a connector, its sessions and the test
#[derive(Debug, Default)]
pub struct DeviceProbe {
    opens: AtomicUsize,
    starts: AtomicUsize,
    batches: AtomicUsize,
    stops: AtomicUsize,
    closes: AtomicUsize,
}

impl DeviceProbe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Batches successfully returned
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Calls to `stop`, successful or not
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Calls to `close` that actually released the device
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Opens scripted devices
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    config: ScriptedConfig,
    probe: Arc<DeviceProbe>,
}

impl ScriptedConnector {
    pub fn new(config: ScriptedConfig) -> Self {
        Self {
            config,
            probe: Arc::new(DeviceProbe::default()),
        }
    }

    /// Handle for inspecting device interactions
    pub fn probe(&self) -> Arc<DeviceProbe> {
        Arc::clone(&self.probe)
    }
}

#[async_trait]
impl DeviceConnector for ScriptedConnector {
    type Session = ScriptedDevice;

    async fn open(&self, address: &str) -> BridgeResult<ScriptedDevice> {
        if self.config.fail_open {
            return Err(BridgeError::ConnectFailed {
                address: address.to_string(),
                reason: "scripted connect failure".to_string(),
            });
        }

        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedDevice {
            config: self.config.clone(),
            probe: Arc::clone(&self.probe),
            next_seq: self.config.first_seq,
            pattern_pos: 0,
            batches_read: 0,
            started: false,
            closed: false,
        })
    }
}

/// An open scripted device
pub struct ScriptedDevice {
    config: ScriptedConfig,
    probe: Arc<DeviceProbe>,
    next_seq: i64,
    pattern_pos: usize,
    batches_read: usize,
    started: bool,
    closed: bool,
}

impl ScriptedDevice {
    fn next_ecg_code(&mut self) -> i64 {
        if self.config.ecg_pattern.is_empty() {
            return 512;
        }
        let code = self.config.ecg_pattern[self.pattern_pos % self.config.ecg_pattern.len()];
        self.pattern_pos += 1;
        code
    }
}

#[async_trait]
impl DeviceSession for ScriptedDevice {
    async fn start_acquisition(
        &mut self,
        _sampling_rate_hz: u32,
        _channels: &[usize],
    ) -> BridgeResult<()> {
        if self.config.reject_start {
            return Err(BridgeError::DeviceRejected {
                reason: "scripted rejection".to_string(),
            });
        }
        self.started = true;
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_batch(&mut self, count: usize) -> BridgeResult<Vec<RawSample>> {
        if !self.started || self.closed {
            return Err(BridgeError::read_failed("device not acquiring"));
        }
        if self.config.fail_read_at == Some(self.batches_read) {
            return Err(BridgeError::read_failed("scripted read failure"));
        }
        if self.config.stall_after.is_some_and(|n| self.batches_read >= n) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.config.batch_delay {
            tokio::time::sleep(delay).await;
        }

        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            let ecg = self.next_ecg_code();
            batch.push(RawSample::from_channels(self.next_seq, ecg, self.config.eda_code));
            self.next_seq += 1;
        }

        self.batches_read += 1;
        self.probe.batches.fetch_add(1, Ordering::SeqCst);
        Ok(batch)
    }

    async fn stop(&mut self) -> BridgeResult<()> {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.started = false;
        if self.config.fail_stop {
            return Err(BridgeError::StopFailed {
                reason: "scripted stop failure".to_string(),
            });
        }
        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn describe(&self) -> String {
        "scripted device".to_string()
    }
}
