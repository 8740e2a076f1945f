//! Combined metric computation over a session's channel buffers

use crate::estimator::SignalEstimator;
use crate::heart_rate::{HeartRateConfig, HeartRateEstimator};
use crate::stats::ChannelStats;
use crate::stress::{StressConfig, StressEstimator};
use bridge_core::ChannelBuffers;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived metrics for one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub heart_rate: f64,
    pub stress_level: f64,
}

/// Runs one estimator per channel against buffer snapshots
pub struct MetricsEngine {
    heart_rate: Box<dyn SignalEstimator>,
    stress: Box<dyn SignalEstimator>,
}

impl MetricsEngine {
    pub fn new(heart_rate: HeartRateConfig, stress: StressConfig) -> Self {
        Self::with_estimators(
            Box::new(HeartRateEstimator::new(heart_rate)),
            Box::new(StressEstimator::new(stress)),
        )
    }

    /// Default estimators with beat intervals measured at `sampling_rate_hz`
    pub fn for_sampling_rate(sampling_rate_hz: f64) -> Self {
        let heart_rate = HeartRateConfig {
            sampling_rate_hz,
            ..HeartRateConfig::default()
        };
        Self::new(heart_rate, StressConfig::default())
    }

    /// Engine with custom ECG and EDA estimators
    pub fn with_estimators(
        heart_rate: Box<dyn SignalEstimator>,
        stress: Box<dyn SignalEstimator>,
    ) -> Self {
        Self { heart_rate, stress }
    }

    /// Heart rate and stress proxy from the current buffer contents
    pub fn compute(&self, buffers: &ChannelBuffers) -> DerivedMetrics {
        let ecg = buffers.ecg.snapshot();
        let eda = buffers.eda.snapshot();

        DerivedMetrics {
            heart_rate: self.heart_rate.estimate(&ecg),
            stress_level: self.stress.estimate(&eda),
        }
    }

    /// Statistics of both channels for diagnostics
    pub fn buffer_stats(&self, buffers: &ChannelBuffers) -> (ChannelStats, ChannelStats) {
        (
            ChannelStats::calculate(&buffers.ecg.snapshot()),
            ChannelStats::calculate(&buffers.eda.snapshot()),
        )
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(HeartRateConfig::default(), StressConfig::default())
    }
}

impl fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("heart_rate", &self.heart_rate.name())
            .field("stress", &self.stress.name())
            .finish()
    }
}
