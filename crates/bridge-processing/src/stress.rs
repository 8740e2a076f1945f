//! Stress proxy derived from skin conductance
//!
//! The proxy is the mean buffered EDA scaled by a tenth. It is not clamped,
//! unlike the heart rate.

use crate::estimator::SignalEstimator;
use crate::stats::mean;
use serde::{Deserialize, Serialize};

/// Stress proxy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressConfig {
    /// Divisor applied to the mean EDA (µS)
    pub scale_microsiemens: f64,
    /// Returned while the buffer is empty
    pub default_level: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            scale_microsiemens: 10.0,
            default_level: 0.3,
        }
    }
}

/// Running-average stress proxy
#[derive(Debug, Clone, Default)]
pub struct StressEstimator {
    config: StressConfig,
}

impl StressEstimator {
    pub fn new(config: StressConfig) -> Self {
        Self { config }
    }

    pub fn estimate(&self, eda: &[f64]) -> f64 {
        if eda.is_empty() {
            return self.config.default_level;
        }
        mean(eda) / self.config.scale_microsiemens
    }
}

impl SignalEstimator for StressEstimator {
    fn estimate(&self, values: &[f64]) -> f64 {
        StressEstimator::estimate(self, values)
    }

    fn name(&self) -> &str {
        "stress_level"
    }
}
