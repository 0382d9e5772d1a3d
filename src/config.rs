use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OximeterError;

/// One of the three color planes of an RGB frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl ColorChannel {
    /// Index of this plane inside an `Rgb<u8>` pixel.
    pub fn index(self) -> usize {
        match self {
            ColorChannel::Red => 0,
            ColorChannel::Green => 1,
            ColorChannel::Blue => 2,
        }
    }
}

/// Which image planes feed the "red" and "ir" series.
///
/// The camera only sees visible light, so the default maps "ir" onto the blue
/// plane as a stand-in for an infrared LED. Estimates derived from it are a
/// simulation of a two-wavelength oximeter, not a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub red: ColorChannel,
    pub ir: ColorChannel,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            red: ColorChannel::Red,
            ir: ColorChannel::Blue,
        }
    }
}

/// Inclusive integer range used to reject implausible estimates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clamp {
    pub min: i32,
    pub max: i32,
}

impl Clamp {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
    pub fn apply(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
    /// Rounds to the nearest integer and clamps; non-finite inputs saturate.
    pub fn apply_f64(&self, value: f64) -> i32 {
        let rounded = value.round();
        if rounded.is_nan() {
            return self.min;
        }
        // `as` saturates at the i32 bounds, which clamp then folds into range.
        self.apply(rounded as i32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Construction-time settings of a monitor. Durations are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OximeterConfig {
    pub buffer_size: usize,
    pub fps: f64,
    pub resolution: Resolution,
    pub channels: ChannelMap,
    pub smoothing_window: usize,
    pub pulse_clamp: Clamp,
    pub spo2_clamp: Clamp,
    pub join_timeout_secs: f64,
    pub retry_backoff_secs: f64,
    pub warmup_secs: f64,
}

impl Default for OximeterConfig {
    fn default() -> Self {
        Self {
            buffer_size: 150,
            fps: 30.0,
            resolution: Resolution::default(),
            channels: ChannelMap::default(),
            smoothing_window: 5,
            pulse_clamp: Clamp::new(40, 180),
            spo2_clamp: Clamp::new(70, 100),
            join_timeout_secs: 1.0,
            retry_backoff_secs: 0.5,
            warmup_secs: 1.0,
        }
    }
}

impl OximeterConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OximeterError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OximeterError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(OximeterError::InvalidFrameRate);
        }
        if self.buffer_size < 2 {
            return Err(OximeterError::InvalidBufferSize(self.buffer_size));
        }
        if self.smoothing_window == 0 || self.smoothing_window > self.buffer_size {
            return Err(OximeterError::InvalidWindow(self.smoothing_window));
        }
        for (name, clamp) in [("pulse", self.pulse_clamp), ("spo2", self.spo2_clamp)] {
            if clamp.min > clamp.max {
                return Err(OximeterError::InvalidClamp {
                    name,
                    min: clamp.min,
                    max: clamp.max,
                });
            }
        }
        for (name, secs) in [
            ("join_timeout_secs", self.join_timeout_secs),
            ("retry_backoff_secs", self.retry_backoff_secs),
            ("warmup_secs", self.warmup_secs),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(OximeterError::InvalidDuration { name });
            }
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.join_timeout_secs)
    }
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.retry_backoff_secs)
    }
    pub fn warmup(&self) -> Duration {
        Duration::from_secs_f64(self.warmup_secs)
    }
    /// Number of buffered samples required before the estimators run.
    pub fn estimation_threshold(&self) -> usize {
        self.buffer_size / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OximeterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.buffer_size, 150);
        assert_eq!(config.estimation_threshold(), 75);
        assert_eq!(config.channels.ir, ColorChannel::Blue);
        assert!((config.frame_interval().as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = OximeterConfig {
            fps: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OximeterError::InvalidFrameRate)
        ));
        config.fps = 30.0;
        config.smoothing_window = 0;
        assert!(matches!(
            config.validate(),
            Err(OximeterError::InvalidWindow(0))
        ));
        config.smoothing_window = 5;
        config.buffer_size = 1;
        assert!(matches!(
            config.validate(),
            Err(OximeterError::InvalidBufferSize(1))
        ));
        config.buffer_size = 150;
        config.spo2_clamp = Clamp::new(100, 70);
        assert!(matches!(
            config.validate(),
            Err(OximeterError::InvalidClamp { name: "spo2", .. })
        ));
        config.spo2_clamp = Clamp::new(70, 100);
        config.retry_backoff_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn clamp_rounds_and_saturates() {
        let pulse = Clamp::new(40, 180);
        assert_eq!(pulse.apply_f64(10.0), 40);
        assert_eq!(pulse.apply_f64(300.0), 180);
        assert_eq!(pulse.apply_f64(72.5), 73);
        assert_eq!(pulse.apply_f64(f64::INFINITY), 180);
        assert_eq!(pulse.apply_f64(f64::NEG_INFINITY), 40);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: OximeterConfig =
            serde_json::from_str(r#"{ "buffer_size": 60, "channels": { "red": "red", "ir": "green" } }"#)
                .unwrap();
        assert_eq!(config.buffer_size, 60);
        assert_eq!(config.channels.ir, ColorChannel::Green);
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.pulse_clamp, Clamp::new(40, 180));
    }
}
