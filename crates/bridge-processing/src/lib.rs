//! Bridge-Processing: Derived physiological metrics
//!
//! Heart rate from ECG peak spacing and a stress proxy from mean skin
//! conductance, both computed over the rolling channel buffers.

pub mod estimator;
pub mod heart_rate;
pub mod metrics;
pub mod stats;
pub mod stress;

pub use estimator::SignalEstimator;
pub use heart_rate::{HeartRateConfig, HeartRateEstimator};
pub use metrics::{DerivedMetrics, MetricsEngine};
pub use stats::ChannelStats;
pub use stress::{StressConfig, StressEstimator};
