//! Heart-rate estimation from the rolling ECG buffer
//!
//! A single-pass threshold peak detector: strict local maxima above
//! `mean + k·σ` are taken as beats and the mean spacing between them is
//! converted to beats per minute. It is deliberately approximate; the
//! guarantees that matter are the fallback value and the output range.

use crate::estimator::SignalEstimator;
use crate::stats::ChannelStats;
use serde::{Deserialize, Serialize};

/// Heart-rate detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateConfig {
    /// Rate the buffered samples were acquired at
    pub sampling_rate_hz: f64,
    /// Fewer buffered samples than this yields the default
    pub min_samples: usize,
    /// Multiple of the standard deviation added to the mean for the threshold
    pub threshold_factor: f64,
    /// Returned whenever no estimate can be made
    pub default_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 100.0,
            min_samples: 50,
            threshold_factor: 0.6,
            default_bpm: 70.0,
            min_bpm: 40.0,
            max_bpm: 200.0,
        }
    }
}

/// Peak-interval heart-rate estimator
#[derive(Debug, Clone, Default)]
pub struct HeartRateEstimator {
    config: HeartRateConfig,
}

impl HeartRateEstimator {
    pub fn new(config: HeartRateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeartRateConfig {
        &self.config
    }

    /// Indices of samples above threshold that beat both neighbours
    ///
    /// First and last samples are never peaks. Equality with a neighbour
    /// disqualifies a sample.
    pub fn detect_peaks(&self, ecg: &[f64]) -> Vec<usize> {
        if ecg.len() < 3 {
            return Vec::new();
        }

        let stats = ChannelStats::calculate(ecg);
        let threshold = stats.mean + stats.std_dev * self.config.threshold_factor;

        ecg.windows(3)
            .enumerate()
            .filter(|(_, w)| w[1] > threshold && w[1] > w[0] && w[1] > w[2])
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Beats per minute, always within `[min_bpm, max_bpm]`
    pub fn estimate(&self, ecg: &[f64]) -> f64 {
        let cfg = &self.config;
        if ecg.len() < cfg.min_samples {
            return cfg.default_bpm;
        }

        let peaks = self.detect_peaks(ecg);
        if peaks.len() < 2 {
            return cfg.default_bpm;
        }

        let sample_period = 1.0 / cfg.sampling_rate_hz;
        let interval_count = (peaks.len() - 1) as f64;
        let avg_interval = peaks
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) as f64 * sample_period)
            .sum::<f64>()
            / interval_count;

        let bpm = if avg_interval > 0.0 {
            60.0 / avg_interval
        } else {
            cfg.default_bpm
        };

        if !bpm.is_finite() {
            return cfg.default_bpm;
        }

        bpm.clamp(cfg.min_bpm, cfg.max_bpm)
    }
}

impl SignalEstimator for HeartRateEstimator {
    fn estimate(&self, values: &[f64]) -> f64 {
        HeartRateEstimator::estimate(self, values)
    }

    fn name(&self) -> &str {
        "heart_rate"
    }
}
