//! Pulse rate from zero-crossings of the normalized red signal.
//!
//! One oscillation produces two sign changes, so the beat frequency is half
//! the crossing rate over the observed time span.
use ndarray::{Array1, ArrayView1};

use crate::config::Clamp;

/// Z-score normalization (population standard deviation).
///
/// Returns `None` for an empty or flat series, which has no usable scale.
pub fn z_score(series: &[f64]) -> Option<Array1<f64>> {
    let view = ArrayView1::from(series);
    let mean = view.mean()?;
    let std = view.std(0.0);
    if !(std.is_finite() && std > 0.0) {
        return None;
    }
    Some(view.mapv(|v| (v - mean) / std))
}

/// Number of positions where consecutive values differ in sign bit.
pub fn count_zero_crossings(normalized: &[f64]) -> usize {
    normalized
        .windows(2)
        .filter(|pair| pair[0].is_sign_negative() != pair[1].is_sign_negative())
        .count()
}

/// Estimate beats per minute from a conditioned series and its timestamps.
///
/// `None` means "not enough signal"; callers keep their previous estimate.
pub fn estimate_pulse(series: &[f64], timestamps: &[f64], clamp: Clamp) -> Option<i32> {
    if series.len() < 2 || timestamps.len() != series.len() {
        return None;
    }
    let normalized = z_score(series)?;
    let crossings = count_zero_crossings(normalized.as_slice()?);
    if crossings < 2 {
        return None;
    }
    let span = timestamps[timestamps.len() - 1] - timestamps[0];
    if !(span.is_finite() && span > 0.0) {
        return None;
    }
    let beats_per_second = crossings as f64 / (2.0 * span);
    Some(clamp.apply_f64(beats_per_second * 60.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::smoothing::smooth;
    use std::f64::consts::PI;

    const PULSE: Clamp = Clamp::new(40, 180);

    fn sine(freq_hz: f64, sample_rate_hz: f64, samples: usize) -> (Vec<f64>, Vec<f64>) {
        let times: Vec<f64> = (0..samples).map(|i| i as f64 / sample_rate_hz).collect();
        let values = times
            .iter()
            .map(|t| 140.0 + 2.0 * (2.0 * PI * freq_hz * t).sin())
            .collect();
        (values, times)
    }

    fn smoothed_estimate(freq_hz: f64, samples: usize) -> i32 {
        let (values, times) = sine(freq_hz, 30.0, samples);
        let smoothed = smooth(&values, 5);
        estimate_pulse(&smoothed, &times[4..], PULSE).unwrap()
    }

    #[test]
    fn synthetic_pulse_near_72_bpm() {
        let five_seconds = smoothed_estimate(1.2, 150);
        assert!((five_seconds - 72).abs() <= 6, "got {five_seconds}");
        let ten_seconds = smoothed_estimate(1.2, 300);
        assert!((ten_seconds - 72).abs() <= 4, "got {ten_seconds}");
    }

    #[test]
    fn alternating_series_is_exact() {
        // n-1 crossings over (n-1)*dt seconds -> 1/(2*dt) Hz.
        let series: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let times: Vec<f64> = (0..21).map(|i| i as f64 * 0.5).collect();
        assert_eq!(estimate_pulse(&series, &times, PULSE), Some(60));
    }

    #[test]
    fn clamps_implausible_rates() {
        let series = [1.0, -1.0, 1.0];
        // 2 crossings over 6 s -> 10 bpm
        assert_eq!(estimate_pulse(&series, &[0.0, 3.0, 6.0], PULSE), Some(40));
        // 2 crossings over 0.2 s -> 300 bpm
        assert_eq!(estimate_pulse(&series, &[0.0, 0.1, 0.2], PULSE), Some(180));
    }

    #[test]
    fn insufficient_signal_is_none() {
        assert_eq!(estimate_pulse(&[1.0], &[0.0], PULSE), None);
        assert_eq!(estimate_pulse(&[5.0; 30], &[0.0; 30], PULSE), None);
        // monotonic ramp crosses its mean exactly once
        let ramp: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let times: Vec<f64> = (0..30).map(|i| i as f64 / 30.0).collect();
        assert_eq!(estimate_pulse(&ramp, &times, PULSE), None);
        // zero time span
        assert_eq!(estimate_pulse(&[1.0, -1.0, 1.0], &[2.0, 2.0, 2.0], PULSE), None);
        // mismatched lengths
        assert_eq!(estimate_pulse(&[1.0, -1.0, 1.0], &[0.0, 1.0], PULSE), None);
    }

    #[test]
    fn crossings_follow_sign_bit() {
        assert_eq!(count_zero_crossings(&[1.0, -1.0, -2.0, 3.0, 0.5]), 2);
        assert_eq!(count_zero_crossings(&[]), 0);
        let normalized = z_score(&[2.0, 4.0, 6.0]).unwrap();
        assert!((normalized.sum()).abs() < 1e-12);
        assert!(z_score(&[3.0, 3.0]).is_none());
    }
}
