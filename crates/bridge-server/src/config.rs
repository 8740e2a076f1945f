//! Startup configuration for the bridge
//!
//! Everything is a startup parameter: command-line flags, each of which can
//! also be supplied through a `BIOBRIDGE_*` environment variable.

use bridge_core::device::{DEFAULT_BATCH_SIZE, DEFAULT_CHANNELS, DEFAULT_SAMPLING_RATE_HZ};
use bridge_core::{BridgeError, BridgeResult, DEFAULT_BUFFER_CAPACITY};
use bridge_simulation::{Scenario, SimulationConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Port the bridge listens on by default
pub const DEFAULT_PORT: u16 = 5555;

/// Address of the reference sensor
pub const DEFAULT_DEVICE_ADDRESS: &str = "98:D3:51:FE:86:88";

/// Streaming server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Device identifier handed to the connector
    pub device_address: String,
    /// Loopback port to listen on; 0 lets the OS choose
    pub port: u16,
    pub sampling_rate_hz: u32,
    /// Analog inputs for ECG and EDA, in that order
    pub channels: Vec<usize>,
    /// Samples read and transmitted per packet
    pub batch_size: usize,
    /// History kept per channel for the estimators
    pub buffer_capacity: usize,
    /// Deadline for the downstream client to connect; unbounded if unset
    pub accept_timeout_ms: Option<u64>,
    /// Deadline for each device batch; unbounded if unset
    pub read_timeout_ms: Option<u64>,
    /// Deadline for each packet write; unbounded if unset
    pub write_timeout_ms: Option<u64>,
    /// Stop cleanly after this many packets
    pub max_packets: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            channels: DEFAULT_CHANNELS.to_vec(),
            batch_size: DEFAULT_BATCH_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            accept_timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
            max_packets: None,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> BridgeResult<()> {
        if self.device_address.trim().is_empty() {
            return Err(BridgeError::config("device address cannot be empty"));
        }
        if self.sampling_rate_hz == 0 {
            return Err(BridgeError::config("sampling rate must be greater than 0"));
        }
        if self.channels.len() != 2 {
            return Err(BridgeError::config(format!(
                "exactly two channels (ECG, EDA) are required, got {}",
                self.channels.len()
            )));
        }
        if self.batch_size == 0 {
            return Err(BridgeError::config("batch size must be greater than 0"));
        }
        if self.buffer_capacity == 0 {
            return Err(BridgeError::config("buffer capacity must be at least 1"));
        }
        Ok(())
    }

    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

/// Command-line interface of the `biobridge` binary
#[derive(Debug, Parser)]
#[command(name = "biobridge", version, about = "Stream ECG/EDA metrics from a biosignal device over TCP")]
pub struct CliArgs {
    /// Device address (MAC or port name)
    #[arg(long, env = "BIOBRIDGE_DEVICE", default_value = DEFAULT_DEVICE_ADDRESS)]
    pub device: String,

    /// Loopback port to serve the metrics stream on
    #[arg(short, long, env = "BIOBRIDGE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Samples per transmitted packet
    #[arg(long, env = "BIOBRIDGE_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Give up waiting for a client after this many milliseconds
    #[arg(long, env = "BIOBRIDGE_ACCEPT_TIMEOUT_MS")]
    pub accept_timeout_ms: Option<u64>,

    /// Fail a device read that takes longer than this many milliseconds
    #[arg(long, env = "BIOBRIDGE_READ_TIMEOUT_MS")]
    pub read_timeout_ms: Option<u64>,

    /// Fail a client write that takes longer than this many milliseconds
    #[arg(long, env = "BIOBRIDGE_WRITE_TIMEOUT_MS")]
    pub write_timeout_ms: Option<u64>,

    /// Stop after sending this many packets
    #[arg(long, env = "BIOBRIDGE_MAX_PACKETS")]
    pub max_packets: Option<u64>,

    /// Simulated subject: resting, baseline, stressed or exercise
    #[arg(long, env = "BIOBRIDGE_SCENARIO", default_value = "baseline")]
    pub scenario: String,

    /// Override the simulated base heart rate (bpm)
    #[arg(long, env = "BIOBRIDGE_BASE_HEART_RATE")]
    pub base_heart_rate: Option<f64>,

    /// Override the simulated stress level (0-1)
    #[arg(long, env = "BIOBRIDGE_STRESS")]
    pub stress: Option<f64>,

    /// Seed for reproducible simulated signals
    #[arg(long, env = "BIOBRIDGE_SEED")]
    pub seed: Option<u64>,

    /// Generate samples as fast as possible instead of at the sampling rate
    #[arg(long, env = "BIOBRIDGE_NO_PACING")]
    pub no_pacing: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "BIOBRIDGE_LOG", default_value = "info")]
    pub log_level: String,
}

impl CliArgs {
    /// Server configuration described by the flags
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            device_address: self.device.clone(),
            port: self.port,
            batch_size: self.batch_size,
            accept_timeout_ms: self.accept_timeout_ms,
            read_timeout_ms: self.read_timeout_ms,
            write_timeout_ms: self.write_timeout_ms,
            max_packets: self.max_packets,
            ..BridgeConfig::default()
        }
    }

    /// Simulated device configuration described by the flags
    pub fn simulation_config(&self) -> BridgeResult<SimulationConfig> {
        let scenario = Scenario::from_name(&self.scenario).ok_or_else(|| {
            BridgeError::config(format!("unknown scenario '{}'", self.scenario))
        })?;

        let mut config = SimulationConfig::from_scenario(scenario);
        if let Some(bpm) = self.base_heart_rate {
            config.base_heart_rate = bpm;
        }
        if let Some(stress) = self.stress {
            config.stress_level = stress;
        }
        config.seed = self.seed;
        config.realtime = !self.no_pacing;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = BridgeConfig::default();
        assert_eq!(config.port, 5555);
        assert_eq!(config.sampling_rate_hz, 100);
        assert_eq!(config.channels, vec![0, 1]);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.buffer_capacity, 100);
        assert!(config.accept_timeout().is_none());
        assert!(config.read_timeout().is_none());
        assert!(config.write_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let bad = [
            BridgeConfig { channels: vec![0], ..BridgeConfig::default() },
            BridgeConfig { batch_size: 0, ..BridgeConfig::default() },
            BridgeConfig { buffer_capacity: 0, ..BridgeConfig::default() },
            BridgeConfig { sampling_rate_hz: 0, ..BridgeConfig::default() },
            BridgeConfig { device_address: String::new(), ..BridgeConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(BridgeError::Config { .. })));
        }
    }

    #[test]
    fn test_cli_parsing() {
        let args = CliArgs::try_parse_from([
            "biobridge",
            "--port",
            "6000",
            "--read-timeout-ms",
            "250",
            "--scenario",
            "stressed",
            "--seed",
            "9",
            "--no-pacing",
        ])
        .unwrap();

        let config = args.bridge_config();
        assert_eq!(config.port, 6000);
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.device_address, DEFAULT_DEVICE_ADDRESS);

        let simulation = args.simulation_config().unwrap();
        assert_eq!(simulation.base_heart_rate, 95.0);
        assert_eq!(simulation.seed, Some(9));
        assert!(!simulation.realtime);
    }

    #[test]
    fn test_every_flag_has_env_fallback() {
        let command = CliArgs::command();
        for arg in command.get_arguments() {
            let id = arg.get_id().as_str();
            if matches!(id, "help" | "version") {
                continue;
            }
            let env = arg.get_env().and_then(|name| name.to_str());
            assert!(
                env.is_some_and(|name| name.starts_with("BIOBRIDGE_")),
                "--{id} cannot be set from the environment"
            );
        }
    }

    #[test]
    fn test_unknown_scenario_rejected() {
        let args = CliArgs::try_parse_from(["biobridge", "--scenario", "marathon"]).unwrap();
        assert!(args.simulation_config().is_err());
    }

    #[test]
    fn test_config_serde_round_trip_keeps_timeouts() {
        let config = BridgeConfig {
            write_timeout_ms: Some(1500),
            ..BridgeConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.write_timeout(), Some(Duration::from_millis(1500)));
    }
}
