//! Conversion of raw ADC codes into calibrated physical values
//!
//! The calibration is fixed by the acquisition hardware: a 10-bit converter
//! over a 0-3.3V reference. ECG is re-centred on the reference midpoint and
//! amplified; EDA is rescaled linearly onto a 0-10 µS range.

use crate::sample::{ProcessedSample, RawSample};
use chrono::Utc;

/// Converter resolution used as the divisor (2^10)
pub const ADC_FULL_SCALE: f64 = 1024.0;

/// Largest code a 10-bit converter can emit
pub const ADC_MAX_CODE: i64 = 1023;

/// Converter reference voltage
pub const REFERENCE_VOLTAGE: f64 = 3.3;

/// Midpoint the ECG front-end is biased to
pub const ECG_MIDPOINT_VOLTAGE: f64 = 1.65;

/// Gain applied to the centred ECG voltage
pub const ECG_GAIN: f64 = 2.0;

/// Upper end of the EDA range in microsiemens
pub const EDA_RANGE_MICROSIEMENS: f64 = 10.0;

/// ADC code to voltage
#[inline]
pub fn code_to_voltage(code: i64) -> f64 {
    (code as f64 / ADC_FULL_SCALE) * REFERENCE_VOLTAGE
}

/// ADC code to calibrated ECG value
#[inline]
pub fn ecg_from_code(code: i64) -> f64 {
    (code_to_voltage(code) - ECG_MIDPOINT_VOLTAGE) * ECG_GAIN
}

/// ADC code to skin conductance in µS
#[inline]
pub fn eda_from_code(code: i64) -> f64 {
    (code_to_voltage(code) / REFERENCE_VOLTAGE) * EDA_RANGE_MICROSIEMENS
}

/// Calibrated ECG value back to the nearest ADC code
pub fn ecg_to_code(value: f64) -> i64 {
    let voltage = value / ECG_GAIN + ECG_MIDPOINT_VOLTAGE;
    voltage_to_code(voltage)
}

/// Skin conductance back to the nearest ADC code
pub fn eda_to_code(microsiemens: f64) -> i64 {
    let voltage = microsiemens / EDA_RANGE_MICROSIEMENS * REFERENCE_VOLTAGE;
    voltage_to_code(voltage)
}

fn voltage_to_code(voltage: f64) -> i64 {
    let code = (voltage / REFERENCE_VOLTAGE * ADC_FULL_SCALE).round();
    (code as i64).clamp(0, ADC_MAX_CODE)
}

/// Current wall-clock time in fractional seconds since the Unix epoch
pub fn wall_clock_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Decode a raw frame with an explicit timestamp
pub fn decode(raw: &RawSample, timestamp: f64) -> ProcessedSample {
    ProcessedSample {
        timestamp,
        ecg: ecg_from_code(raw.ecg_code()),
        eda: eda_from_code(raw.eda_code()),
        seq: raw.seq(),
    }
}

/// Decode a raw frame stamped with the current wall-clock time
///
/// The device clock is not used; timestamps reflect when the bridge saw the
/// sample.
pub fn decode_now(raw: &RawSample) -> ProcessedSample {
    decode(raw, wall_clock_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_matches_calibration_for_all_codes() {
        for code in 0..=ADC_MAX_CODE {
            let raw = RawSample::from_channels(code, code, code);
            let sample = decode(&raw, 0.0);

            let expected_ecg = ((code as f64 / 1024.0 * 3.3) - 1.65) * 2.0;
            let expected_eda = (code as f64 / 1024.0 * 3.3) / 3.3 * 10.0;

            assert_eq!(sample.ecg, expected_ecg);
            assert_eq!(sample.eda, expected_eda);
            assert_eq!(sample.seq, code);
        }
    }

    #[test]
    fn test_decode_is_pure() {
        let raw = RawSample::from_channels(42, 600, 300);
        assert_eq!(decode(&raw, 7.0), decode(&raw, 7.0));
    }

    #[test]
    fn test_midpoint_code_is_near_zero_ecg() {
        // 512/1024 * 3.3 = 1.65V exactly
        assert_eq!(ecg_from_code(512), 0.0);
        assert_eq!(eda_from_code(0), 0.0);
    }

    #[test]
    fn test_inverse_conversions_round_trip_codes() {
        for code in [0, 1, 200, 512, 900, ADC_MAX_CODE] {
            assert_eq!(ecg_to_code(ecg_from_code(code)), code);
            assert_eq!(eda_to_code(eda_from_code(code)), code);
        }
        assert_eq!(ecg_to_code(100.0), ADC_MAX_CODE);
        assert_eq!(eda_to_code(-5.0), 0);
    }

    #[test]
    fn test_decode_now_uses_wall_clock() {
        let before = wall_clock_seconds();
        let sample = decode_now(&RawSample::from_channels(1, 512, 512));
        let after = wall_clock_seconds();
        assert!(sample.timestamp >= before && sample.timestamp <= after);
    }
}
