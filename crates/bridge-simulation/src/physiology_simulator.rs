//! ECG/EDA signal simulator producing raw device frames
//!
//! Values are generated in calibrated units and then quantised through the
//! inverse of the bridge's calibration, so the decoder sees the same kind of
//! 10-bit codes a real sensor would deliver.

use crate::waveform::{pqrst, respiratory_wander, skin_conductance_response, Scenario};
use bridge_core::decoder::{ecg_to_code, eda_to_code};
use bridge_core::{BridgeError, BridgeResult, RawSample};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Width of the hardware sequence counter (4 bits)
pub const DEFAULT_SEQUENCE_MODULUS: i64 = 16;

/// Noise configuration for the simulated channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise on the ECG channel (calibrated units)
    pub ecg_std: f64,
    /// Gaussian noise on the EDA channel (µS)
    pub eda_std: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            ecg_std: 0.003,
            eda_std: 0.015,
        }
    }
}

/// Configuration for the physiology simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Mean heart rate the beat generator aims for (bpm)
    pub base_heart_rate: f64,
    /// Beat-to-beat jitter as a fraction of the beat interval
    pub hrv_fraction: f64,
    /// Breathing rate driving ECG baseline wander
    pub respiratory_rate: f64,
    /// Stress level in 0-1 driving skin conductance
    pub stress_level: f64,
    pub noise: NoiseConfig,
    /// Value at which the sequence counter wraps to zero
    pub sequence_modulus: i64,
    /// Pace reads to the sampling rate like real hardware
    pub realtime: bool,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_heart_rate: 70.0,
            hrv_fraction: 0.1,
            respiratory_rate: 15.0,
            stress_level: 0.3,
            noise: NoiseConfig::default(),
            sequence_modulus: DEFAULT_SEQUENCE_MODULUS,
            realtime: true,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Configuration seeded from a predefined scenario
    pub fn from_scenario(scenario: Scenario) -> Self {
        let (base_heart_rate, stress_level) = scenario.parameters();
        Self {
            base_heart_rate,
            stress_level,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if !(20.0..=250.0).contains(&self.base_heart_rate) {
            return Err(BridgeError::config(format!(
                "simulated heart rate {} outside 20-250 bpm",
                self.base_heart_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.stress_level) {
            return Err(BridgeError::config("simulated stress level must be within 0-1"));
        }
        if self.sequence_modulus < 2 {
            return Err(BridgeError::config("sequence modulus must be at least 2"));
        }
        Ok(())
    }
}

/// An active skin-conductance response
#[derive(Debug, Clone, Copy)]
struct ScrEvent {
    onset: f64,
    amplitude: f64,
}

/// Generates consecutive raw frames of synthetic ECG and EDA
pub struct PhysiologySimulator {
    config: SimulationConfig,
    rng: rand::rngs::StdRng,
    ecg_noise: Normal<f64>,
    eda_noise: Normal<f64>,
    sampling_rate: f64,
    time: f64,
    last_beat: f64,
    next_interval: f64,
    scr: Option<ScrEvent>,
    seq: i64,
}

impl PhysiologySimulator {
    /// Create a new simulator sampling at `sampling_rate` Hz
    pub fn new(config: SimulationConfig, sampling_rate: f64) -> BridgeResult<Self> {
        config.validate()?;
        if sampling_rate <= 0.0 {
            return Err(BridgeError::config("sampling rate must be positive"));
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        let rng = rand::rngs::StdRng::seed_from_u64(seed);

        let ecg_noise = Normal::new(0.0, config.noise.ecg_std)
            .map_err(|e| BridgeError::config(format!("invalid ECG noise: {}", e)))?;
        let eda_noise = Normal::new(0.0, config.noise.eda_std)
            .map_err(|e| BridgeError::config(format!("invalid EDA noise: {}", e)))?;

        let base_interval = 60.0 / config.base_heart_rate;
        Ok(PhysiologySimulator {
            config,
            rng,
            ecg_noise,
            eda_noise,
            sampling_rate,
            time: 0.0,
            // First beat starts at t = 0
            last_beat: -base_interval,
            next_interval: base_interval,
            scr: None,
            seq: 0,
        })
    }

    /// Generate the next `count` frames
    pub fn generate(&mut self, count: usize) -> Vec<RawSample> {
        (0..count).map(|_| self.next_frame()).collect()
    }

    /// Generate a single frame and advance simulated time by one sample
    pub fn next_frame(&mut self) -> RawSample {
        let ecg = self.ecg_value();
        let eda = self.eda_value();
        let frame = RawSample::from_channels(self.seq, ecg_to_code(ecg), eda_to_code(eda));

        self.seq = (self.seq + 1) % self.config.sequence_modulus;
        self.time += 1.0 / self.sampling_rate;
        frame
    }

    fn ecg_value(&mut self) -> f64 {
        if self.time - self.last_beat >= self.next_interval {
            self.last_beat = self.time;
            self.next_interval = self.draw_beat_interval();
        }

        pqrst(self.time - self.last_beat)
            + respiratory_wander(self.time, self.config.respiratory_rate)
            + self.ecg_noise.sample(&mut self.rng)
    }

    /// Next RR interval; stress damps the variability
    fn draw_beat_interval(&mut self) -> f64 {
        let base = 60.0 / self.config.base_heart_rate;
        let jitter = self.rng.gen_range(-0.5..0.5) * self.config.hrv_fraction * base;
        base + jitter * (1.0 - self.config.stress_level * 0.5)
    }

    fn eda_value(&mut self) -> f64 {
        let stress = self.config.stress_level;
        let tonic = 2.0 + stress * 5.0 + 0.2 * (2.0 * std::f64::consts::PI * 0.05 * self.time).sin();

        if self.scr.is_none() && self.rng.gen::<f64>() < stress * 0.01 {
            self.scr = Some(ScrEvent {
                onset: self.time,
                amplitude: 0.5 * stress * (1.0 + self.rng.gen::<f64>()),
            });
        }

        let time = self.time;
        let phasic = self
            .scr
            .and_then(|event| skin_conductance_response(time - event.onset, event.amplitude));
        if phasic.is_none() {
            self.scr = None;
        }

        tonic + phasic.unwrap_or(0.0) + self.eda_noise.sample(&mut self.rng)
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
