//! Summary statistics over a buffered channel

use serde::{Deserialize, Serialize};

/// Basic statistics for a signal channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divides by N)
    pub std_dev: f64,
    pub rms: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
                rms: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = mean(data);

        let sum_sq: f64 = data.iter().map(|x| x * x).sum();
        let rms = (sum_sq / n).sqrt();

        let variance: f64 = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            count: data.len(),
            mean,
            std_dev,
            rms,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}

/// Arithmetic mean; zero for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = ChannelStats::calculate(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        // mean 5, squared deviations sum to 32 over 8 values
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = ChannelStats::calculate(&data);

        assert_eq!(stats.mean, 5.0);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.peak_to_peak, 7.0);
    }

    #[test]
    fn test_rms_of_alternating_signal() {
        let data: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let stats = ChannelStats::calculate(&data);

        assert!((stats.rms - 1.0).abs() < 1e-12);
        assert!(stats.mean.abs() < 1e-12);
    }
}
