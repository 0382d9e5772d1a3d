//! Ratio-of-ratios SpO2 approximation.
//!
//! `spo2 = 110 - 25 * R` with `R = (AC_red / DC_red) / (AC_ir / DC_ir)` is an
//! uncalibrated linear fit. With the visible-light "ir" channel it yields a
//! plausible-looking number, not a medical measurement.
use ndarray::ArrayView1;

use crate::config::Clamp;

/// Pulsatile (standard deviation) and baseline (mean) levels of a series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcDc {
    pub ac: f64,
    pub dc: f64,
}

impl AcDc {
    pub fn of(series: &[f64]) -> Option<Self> {
        let view = ArrayView1::from(series);
        let dc = view.mean()?;
        Some(Self {
            ac: view.std(0.0),
            dc,
        })
    }

    pub fn perfusion(&self) -> f64 {
        self.ac / self.dc
    }
}

/// `None` unless both baselines are positive and the ratio is finite.
pub fn ratio_of_ratios(red: &[f64], ir: &[f64]) -> Option<f64> {
    let red = AcDc::of(red)?;
    let ir = AcDc::of(ir)?;
    if !(red.dc > 0.0 && ir.dc > 0.0) {
        return None;
    }
    let ratio = red.perfusion() / ir.perfusion();
    ratio.is_finite().then_some(ratio)
}

pub fn estimate_spo2(red: &[f64], ir: &[f64], clamp: Clamp) -> Option<i32> {
    let ratio = ratio_of_ratios(red, ir)?;
    Some(clamp.apply_f64(110.0 - 25.0 * ratio))
}
