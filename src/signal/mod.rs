// src/signal/mod.rs
pub mod pulse;
pub mod roi;
pub mod saturation;
pub mod smoothing;

pub use pulse::{count_zero_crossings, estimate_pulse, z_score};
pub use roi::{centered_roi, encode_jpeg, reduce_frame};
pub use saturation::{estimate_spo2, ratio_of_ratios, AcDc};
pub use smoothing::smooth;

use log::debug;
use serde::Serialize;

use crate::buffer::SampleBuffer;
use crate::config::OximeterConfig;

/// Latest pulse and saturation readings; zero means "not yet estimated".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct VitalEstimate {
    pub pulse_rate_bpm: i32,
    pub spo2_pct: i32,
    pub last_updated: f64,
}

/// Smooth both channels and run the two estimators over the buffer.
///
/// An estimator without enough signal keeps the previous value. When neither
/// produces a value the previous estimate is returned untouched, including its
/// `last_updated` stamp.
pub fn estimate_vitals(
    samples: &SampleBuffer,
    config: &OximeterConfig,
    previous: &VitalEstimate,
    now: f64,
) -> VitalEstimate {
    let window = config.smoothing_window;
    let red = smooth(&samples.red(), window);
    let ir = smooth(&samples.ir(), window);
    // each smoothed point is stamped with the last sample of its window
    let timestamps = samples.timestamps();
    let aligned = timestamps
        .get(window.saturating_sub(1)..)
        .unwrap_or_default();

    let pulse = estimate_pulse(&red, aligned, config.pulse_clamp);
    let spo2 = estimate_spo2(&red, &ir, config.spo2_clamp);
    if pulse.is_none() && spo2.is_none() {
        return *previous;
    }
    let estimate = VitalEstimate {
        pulse_rate_bpm: pulse.unwrap_or(previous.pulse_rate_bpm),
        spo2_pct: spo2.unwrap_or(previous.spo2_pct),
        last_updated: now,
    };
    debug!(
        "vitals over {} samples: {} bpm, {}% SpO2",
        samples.len(),
        estimate.pulse_rate_bpm,
        estimate.spo2_pct
    );
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Sample;
    use std::f64::consts::PI;

    fn pulsing_buffer(freq_hz: f64, samples: usize) -> SampleBuffer {
        let mut buffer = SampleBuffer::with_capacity(samples);
        for i in 0..samples {
            let t = i as f64 / 30.0;
            let phase = (2.0 * PI * freq_hz * t).sin();
            buffer.push(Sample {
                red: 150.0 + 1.5 * phase,
                ir: 90.0 + 0.9 * phase,
                timestamp: 100.0 + t,
            });
        }
        buffer
    }

    #[test]
    fn chain_updates_both_estimates() {
        let buffer = pulsing_buffer(1.2, 150);
        let config = OximeterConfig::default();
        let vitals = estimate_vitals(&buffer, &config, &VitalEstimate::default(), 5.0);
        assert!((vitals.pulse_rate_bpm - 72).abs() <= 6);
        assert_eq!(vitals.spo2_pct, 85);
        assert_eq!(vitals.last_updated, 5.0);
    }

    #[test]
    fn flat_signal_keeps_previous() {
        let mut buffer = SampleBuffer::with_capacity(100);
        for i in 0..100 {
            buffer.push(Sample {
                red: 120.0,
                ir: 80.0,
                timestamp: i as f64 / 30.0,
            });
        }
        let previous = VitalEstimate {
            pulse_rate_bpm: 64,
            spo2_pct: 96,
            last_updated: 1.0,
        };
        let vitals = estimate_vitals(&buffer, &OximeterConfig::default(), &previous, 9.0);
        assert_eq!(vitals, previous);
    }

    #[test]
    fn short_buffer_keeps_previous() {
        let buffer = pulsing_buffer(1.2, 3);
        let vitals = estimate_vitals(
            &buffer,
            &OximeterConfig::default(),
            &VitalEstimate::default(),
            2.0,
        );
        assert_eq!(vitals, VitalEstimate::default());
    }
}
