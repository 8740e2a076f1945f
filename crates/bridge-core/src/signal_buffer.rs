//! Rolling buffers holding the most recent calibrated values per channel

use crate::error::{BridgeError, BridgeResult};
use crate::sample::ProcessedSample;
use std::collections::VecDeque;

/// History kept per channel unless configured otherwise
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Fixed-capacity ring buffer that overwrites its oldest entry
#[derive(Debug, Clone)]
pub struct SignalBuffer<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> SignalBuffer<T> {
    /// Create an empty buffer; capacity must be at least one
    pub fn with_capacity(capacity: usize) -> BridgeResult<Self> {
        if capacity == 0 {
            return Err(BridgeError::config("buffer capacity must be at least 1"));
        }

        Ok(Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a value, evicting the oldest one when full
    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Copy of the contents in arrival order
    pub fn snapshot(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The ECG and EDA history owned by one streaming session
#[derive(Debug, Clone)]
pub struct ChannelBuffers {
    pub ecg: SignalBuffer<f64>,
    pub eda: SignalBuffer<f64>,
}

impl ChannelBuffers {
    /// Create both channel buffers with the same capacity
    pub fn new(capacity: usize) -> BridgeResult<Self> {
        Ok(Self {
            ecg: SignalBuffer::with_capacity(capacity)?,
            eda: SignalBuffer::with_capacity(capacity)?,
        })
    }

    /// Record the calibrated values of one decoded sample
    pub fn record(&mut self, sample: &ProcessedSample) {
        self.ecg.push(sample.ecg);
        self.eda.push(sample.eda);
    }
}

impl Default for ChannelBuffers {
    fn default() -> Self {
        Self {
            ecg: SignalBuffer {
                values: VecDeque::with_capacity(DEFAULT_BUFFER_CAPACITY),
                capacity: DEFAULT_BUFFER_CAPACITY,
            },
            eda: SignalBuffer {
                values: VecDeque::with_capacity(DEFAULT_BUFFER_CAPACITY),
                capacity: DEFAULT_BUFFER_CAPACITY,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_keeps_last_capacity_values_in_order() {
        let capacity = 100;
        for extra in [1usize, 7, 100, 250] {
            let mut buffer = SignalBuffer::with_capacity(capacity).unwrap();
            let total = capacity + extra;
            for i in 0..total {
                buffer.push(i as f64);
            }

            let expected: Vec<f64> = (extra..total).map(|i| i as f64).collect();
            assert_eq!(buffer.len(), capacity);
            assert_eq!(buffer.snapshot(), expected);
        }
    }

    #[test]
    fn test_partial_fill() {
        let mut buffer = SignalBuffer::with_capacity(5).unwrap();
        buffer.push(1);
        buffer.push(2);

        assert_eq!(buffer.snapshot(), vec![1, 2]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.capacity(), 5);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut buffer = SignalBuffer::with_capacity(3).unwrap();
        buffer.push(1.0);
        let snapshot = buffer.snapshot();
        buffer.push(2.0);

        assert_eq!(snapshot, vec![1.0]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(SignalBuffer::<f64>::with_capacity(0).is_err());
    }

    #[test]
    fn test_channel_buffers_record_both_channels() {
        let mut buffers = ChannelBuffers::new(2).unwrap();
        for seq in 0..3 {
            buffers.record(&ProcessedSample {
                timestamp: 0.0,
                ecg: seq as f64,
                eda: seq as f64 * 10.0,
                seq,
            });
        }

        assert_eq!(buffers.ecg.snapshot(), vec![1.0, 2.0]);
        assert_eq!(buffers.eda.snapshot(), vec![10.0, 20.0]);
        assert_eq!(ChannelBuffers::default().ecg.capacity(), DEFAULT_BUFFER_CAPACITY);
    }
}
