//! Simulated acquisition device backed by the physiology simulator
//!
//! Behaves like the real sensor from the bridge's point of view: it must be
//! opened and started before reads, validates acquisition parameters, and in
//! realtime mode each read blocks for as long as the hardware would take to
//! produce the batch.

use crate::physiology_simulator::{PhysiologySimulator, SimulationConfig};
use async_trait::async_trait;
use bridge_core::{BridgeError, BridgeResult, DeviceConnector, DeviceSession, RawSample};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info};

/// Rates the reference hardware accepts
pub const SUPPORTED_SAMPLING_RATES: [u32; 4] = [1, 10, 100, 1000];

/// Highest analog input index on the reference hardware
pub const MAX_ANALOG_CHANNEL: usize = 5;

/// Opens simulated devices
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    config: SimulationConfig,
}

impl SimulatedConnector {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DeviceConnector for SimulatedConnector {
    type Session = SimulatedDevice;

    async fn open(&self, address: &str) -> BridgeResult<SimulatedDevice> {
        if address.trim().is_empty() {
            return Err(BridgeError::ConnectFailed {
                address: address.to_string(),
                reason: "empty device address".to_string(),
            });
        }
        self.config.validate().map_err(|e| BridgeError::ConnectFailed {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        info!(address, "Simulated device opened");
        Ok(SimulatedDevice {
            address: address.to_string(),
            config: self.config.clone(),
            simulator: None,
            next_deadline: None,
            closed: false,
        })
    }
}

/// An open simulated device
pub struct SimulatedDevice {
    address: String,
    config: SimulationConfig,
    simulator: Option<PhysiologySimulator>,
    next_deadline: Option<Instant>,
    closed: bool,
}

impl SimulatedDevice {
    pub fn is_acquiring(&self) -> bool {
        self.simulator.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl DeviceSession for SimulatedDevice {
    async fn start_acquisition(
        &mut self,
        sampling_rate_hz: u32,
        channels: &[usize],
    ) -> BridgeResult<()> {
        if self.closed {
            return Err(BridgeError::DeviceRejected {
                reason: "device is closed".to_string(),
            });
        }
        if !SUPPORTED_SAMPLING_RATES.contains(&sampling_rate_hz) {
            return Err(BridgeError::DeviceRejected {
                reason: format!(
                    "unsupported sampling rate {}Hz, expected one of {:?}",
                    sampling_rate_hz, SUPPORTED_SAMPLING_RATES
                ),
            });
        }
        if channels.is_empty() || channels.iter().any(|&c| c > MAX_ANALOG_CHANNEL) {
            return Err(BridgeError::DeviceRejected {
                reason: format!("invalid channel selection {:?}", channels),
            });
        }

        let simulator = PhysiologySimulator::new(self.config.clone(), sampling_rate_hz as f64)
            .map_err(|e| BridgeError::DeviceRejected { reason: e.to_string() })?;
        self.simulator = Some(simulator);
        self.next_deadline = None;

        info!(rate = sampling_rate_hz, ?channels, "Simulated acquisition started");
        Ok(())
    }

    async fn read_batch(&mut self, count: usize) -> BridgeResult<Vec<RawSample>> {
        if self.closed {
            return Err(BridgeError::read_failed("device is closed"));
        }
        let realtime = self.config.realtime;
        let simulator = self
            .simulator
            .as_mut()
            .ok_or_else(|| BridgeError::read_failed("acquisition not started"))?;

        if realtime {
            // Deadlines advance by exactly one batch so pacing does not drift
            let batch_time = Duration::from_secs_f64(count as f64 / simulator.sampling_rate());
            let deadline = self.next_deadline.unwrap_or_else(Instant::now) + batch_time;
            sleep_until(deadline).await;
            self.next_deadline = Some(deadline);
        }

        Ok(simulator.generate(count))
    }

    async fn stop(&mut self) -> BridgeResult<()> {
        if self.simulator.take().is_some() {
            debug!(address = %self.address, "Simulated acquisition stopped");
        }
        self.next_deadline = None;
        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.simulator = None;
            self.closed = true;
            debug!(address = %self.address, "Simulated device closed");
        }
    }

    fn describe(&self) -> String {
        format!("simulated device {}", self.address)
    }
}
