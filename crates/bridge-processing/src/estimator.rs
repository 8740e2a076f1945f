//! Common interface for estimators that reduce a channel buffer to one value

/// Reduces a buffered channel to a single derived metric
pub trait SignalEstimator: Send + Sync {
    /// Compute the metric from values in arrival order
    fn estimate(&self, values: &[f64]) -> f64;

    /// Metric name used in logs
    fn name(&self) -> &str;
}
