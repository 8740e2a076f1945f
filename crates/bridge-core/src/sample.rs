//! Sample and packet types flowing through the bridge

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};

/// Number of fields in a raw device frame
pub const RAW_SAMPLE_ARITY: usize = 7;

/// Field holding the device sequence counter
pub const SEQ_INDEX: usize = 0;

/// Field holding the first analog channel (ECG)
pub const ECG_INDEX: usize = 5;

/// Field holding the second analog channel (EDA)
pub const EDA_INDEX: usize = 6;

/// One raw frame as emitted by the acquisition device
///
/// Layout: `[seq, d1, d2, d3, d4, a1, a2]` where `d*` are digital I/O states
/// and `a*` are 10-bit ADC codes for the two active analog channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawSample([i64; RAW_SAMPLE_ARITY]);

impl RawSample {
    /// Create a raw sample from a full-width frame
    pub const fn new(fields: [i64; RAW_SAMPLE_ARITY]) -> Self {
        Self(fields)
    }

    /// Build a raw sample from driver output, rejecting the wrong arity
    pub fn from_slice(fields: &[i64]) -> BridgeResult<Self> {
        let fields: [i64; RAW_SAMPLE_ARITY] =
            fields.try_into().map_err(|_| BridgeError::MalformedSample {
                expected: RAW_SAMPLE_ARITY,
                actual: fields.len(),
            })?;
        Ok(Self(fields))
    }

    /// Convenience constructor for the two-channel layout
    pub const fn from_channels(seq: i64, ecg_code: i64, eda_code: i64) -> Self {
        Self([seq, 0, 0, 0, 0, ecg_code, eda_code])
    }

    /// Device sequence counter
    #[inline]
    pub const fn seq(&self) -> i64 {
        self.0[SEQ_INDEX]
    }

    /// ADC code of the ECG channel
    #[inline]
    pub const fn ecg_code(&self) -> i64 {
        self.0[ECG_INDEX]
    }

    /// ADC code of the EDA channel
    #[inline]
    pub const fn eda_code(&self) -> i64 {
        self.0[EDA_INDEX]
    }

    /// All fields in device order
    pub fn fields(&self) -> &[i64; RAW_SAMPLE_ARITY] {
        &self.0
    }
}

/// A calibrated sample ready for transmission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSample {
    /// Wall-clock seconds at decode time
    pub timestamp: f64,
    /// Centred and amplified ECG value
    pub ecg: f64,
    /// Skin conductance in microsiemens
    pub eda: f64,
    /// Device sequence counter, carried through unchanged
    pub seq: i64,
}

/// Message sent to the downstream consumer once per loop iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsPacket {
    /// Samples decoded during this iteration, in device order
    pub samples: Vec<ProcessedSample>,
    /// Estimated heart rate in beats per minute
    pub heart_rate: f64,
    /// Non-clinical stress proxy derived from EDA
    pub stress_level: f64,
}

impl MetricsPacket {
    /// Sequence numbers carried by this packet
    pub fn sequence_numbers(&self) -> Vec<i64> {
        self.samples.iter().map(|s| s.seq).collect()
    }
}
