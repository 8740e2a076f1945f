//! Synthetic cardiac and electrodermal waveform shapes

use std::f64::consts::PI;

/// ECG amplitude at `t` seconds after the start of a beat
///
/// Piecewise PQRST complex lasting 420ms, flat afterwards:
/// P 0-80ms, PR flat, Q 110-130ms, R 130-190ms, S 190-210ms,
/// ST 210-300ms slightly raised, T 300-420ms.
///
/// R spans five samples at 100 Hz and P and T stay small relative to it, so
/// a mean + 0.6σ peak threshold over a one-second window admits only R.
pub fn pqrst(t: f64) -> f64 {
    let half_sine = |start: f64, width: f64, amplitude: f64| {
        amplitude * (PI * (t - start) / width).sin()
    };

    match t {
        t if t < 0.0 => 0.0,
        t if t < 0.08 => half_sine(0.0, 0.08, 0.08),
        t if t < 0.11 => 0.0,
        t if t < 0.13 => half_sine(0.11, 0.02, -0.1),
        t if t < 0.19 => half_sine(0.13, 0.06, 1.2),
        t if t < 0.21 => half_sine(0.19, 0.02, -0.2),
        t if t < 0.30 => 0.02,
        t if t < 0.42 => half_sine(0.30, 0.12, 0.1),
        _ => 0.0,
    }
}

/// Lifetime of a skin-conductance response
pub const SCR_DURATION_SECS: f64 = 5.0;

/// Skin-conductance response amplitude `elapsed` seconds after onset
///
/// Linear rise over one second, then exponential decay with a 2s time
/// constant. `None` once the response has run its course.
pub fn skin_conductance_response(elapsed: f64, amplitude: f64) -> Option<f64> {
    if !(0.0..SCR_DURATION_SECS).contains(&elapsed) {
        return None;
    }

    if elapsed < 1.0 {
        Some(amplitude * elapsed)
    } else {
        Some(amplitude * (-(elapsed - 1.0) / 2.0).exp())
    }
}

/// Slow baseline wander caused by breathing
pub fn respiratory_wander(time: f64, breaths_per_minute: f64) -> f64 {
    0.03 * (2.0 * PI * breaths_per_minute / 60.0 * time).sin()
}

/// Predefined physiological scenarios for the simulated device
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scenario {
    /// Calm subject at rest
    Resting,
    /// Default everyday values
    Baseline,
    /// Elevated heart rate and conductance
    Stressed,
    /// High heart rate, moderate conductance
    Exercise,
}

impl Scenario {
    /// Base heart rate in bpm and stress level in 0-1
    pub fn parameters(&self) -> (f64, f64) {
        match self {
            Scenario::Resting => (65.0, 0.1),
            Scenario::Baseline => (70.0, 0.3),
            Scenario::Stressed => (95.0, 0.8),
            Scenario::Exercise => (130.0, 0.5),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::Resting => "Resting subject",
            Scenario::Baseline => "Everyday baseline",
            Scenario::Stressed => "Acute stress",
            Scenario::Exercise => "Moderate exercise",
        }
    }

    /// Look up a scenario by its lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "resting" | "rest" => Some(Scenario::Resting),
            "baseline" => Some(Scenario::Baseline),
            "stressed" | "stress" => Some(Scenario::Stressed),
            "exercise" => Some(Scenario::Exercise),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r_wave_dominates_complex() {
        let r_peak = pqrst(0.16);
        assert!((r_peak - 1.2).abs() < 1e-9);

        let mut t = 0.0;
        while t < 0.5 {
            assert!(pqrst(t) <= r_peak + 1e-9);
            t += 0.001;
        }
    }

    #[test]
    fn test_r_wave_is_a_strict_maximum_at_100hz() {
        let samples: Vec<f64> = (0..50).map(|i| pqrst(i as f64 * 0.01)).collect();
        let (peak_index, _) = samples
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best });

        assert_eq!(peak_index, 16);
        assert!(samples[15] < samples[16] && samples[17] < samples[16]);
        assert!(samples[14] > 0.5, "R should cover neighbouring samples");
        assert!(samples.iter().enumerate().all(|(i, &v)| (14..=18).contains(&i) || v < 0.15));
    }

    #[test]
    fn test_flat_outside_complex() {
        assert_eq!(pqrst(-0.1), 0.0);
        assert_eq!(pqrst(0.1), 0.0);
        assert_eq!(pqrst(0.45), 0.0);
        assert_eq!(pqrst(0.25), 0.02);
    }

    #[test]
    fn test_scr_shape() {
        assert_eq!(skin_conductance_response(0.5, 2.0), Some(1.0));
        assert_eq!(skin_conductance_response(1.0, 2.0), Some(2.0));
        let decayed = skin_conductance_response(3.0, 2.0).unwrap();
        assert!((decayed - 2.0 * (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(skin_conductance_response(5.0, 2.0), None);
        assert_eq!(skin_conductance_response(-1.0, 2.0), None);
    }

    #[test]
    fn test_scenario_lookup() {
        assert_eq!(Scenario::from_name("Stressed"), Some(Scenario::Stressed));
        assert_eq!(Scenario::from_name("rest"), Some(Scenario::Resting));
        assert_eq!(Scenario::from_name("sprint"), None);
        assert_eq!(Scenario::Baseline.parameters(), (70.0, 0.3));
    }
}
