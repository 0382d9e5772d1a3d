use std::f64::consts::PI;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Resolution;
use crate::error::OximeterError;
use crate::sensor::{SensorDriver, SensorHandle};

// Baseline plane levels of a fingertip lit from behind.
const RED_BASELINE: f64 = 150.0;
const GREEN_BASELINE: f64 = 60.0;
const BLUE_BASELINE: f64 = 90.0;
// Pulsatile amplitude of the blue ("ir") plane.
const BLUE_AMPLITUDE: f64 = 1.5;

/// Synthetic camera that renders frames modulated by a heartbeat.
///
/// The red/blue amplitudes are chosen so the ratio-of-ratios maps back onto the
/// requested saturation, which makes the whole pipeline testable without
/// hardware. Time is taken from the wall clock since `open`.
#[derive(Clone, Debug)]
pub struct SimulatedDriver {
    bpm: f64,
    spo2: f64,
    noise: f64,
    seed: u64,
}

impl SimulatedDriver {
    pub fn new(bpm: f64, spo2: f64) -> Self {
        Self {
            bpm,
            spo2,
            noise: 0.2,
            seed: 0,
        }
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    /// Peak amplitude of uniform per-frame noise added to every plane.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(0.0);
        self
    }
    fn red_amplitude(&self) -> f64 {
        let ratio = (110.0 - self.spo2) / 25.0;
        ratio * (BLUE_AMPLITUDE / BLUE_BASELINE) * RED_BASELINE
    }
}

impl SensorDriver for SimulatedDriver {
    fn open(
        &self,
        resolution: Resolution,
        frame_interval: Duration,
    ) -> Result<Box<dyn SensorHandle>, OximeterError> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(OximeterError::SensorInit(format!(
                "unsupported resolution {}x{}",
                resolution.width, resolution.height
            )));
        }
        debug!(
            "simulated camera {}x{} every {:?} ({} bpm, {}% SpO2)",
            resolution.width,
            resolution.height,
            frame_interval,
            self.bpm,
            self.spo2
        );
        Ok(Box::new(SimulatedHandle::new(self, resolution)))
    }
}

struct SimulatedHandle {
    resolution: Resolution,
    beat_hz: f64,
    red_amplitude: f64,
    noise: f64,
    rng: StdRng,
    opened_at: Instant,
    closed: bool,
}

impl SimulatedHandle {
    fn new(driver: &SimulatedDriver, resolution: Resolution) -> Self {
        Self {
            resolution,
            beat_hz: driver.bpm / 60.0,
            red_amplitude: driver.red_amplitude(),
            noise: driver.noise,
            rng: StdRng::seed_from_u64(driver.seed),
            opened_at: Instant::now(),
            closed: false,
        }
    }
    fn jitter(&mut self) -> f64 {
        if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        }
    }
    fn render(&mut self, t: f64) -> RgbImage {
        let pulse = (2.0 * PI * self.beat_hz * t).sin();
        let levels = [
            RED_BASELINE + self.red_amplitude * pulse + self.jitter(),
            GREEN_BASELINE + self.jitter(),
            BLUE_BASELINE + BLUE_AMPLITUDE * pulse + self.jitter(),
        ];
        // Ordered dither keeps sub-integer levels visible in the ROI mean.
        RgbImage::from_fn(self.resolution.width, self.resolution.height, |x, y| {
            let offset = ((x * 7 + y * 13) % 16) as f64 / 16.0;
            Rgb(levels.map(|level| (level + offset).floor().clamp(0.0, 255.0) as u8))
        })
    }
}

impl SensorHandle for SimulatedHandle {
    fn capture_frame(&mut self) -> Result<RgbImage, OximeterError> {
        if self.closed {
            return Err(OximeterError::SensorReleased);
        }
        let t = self.opened_at.elapsed().as_secs_f64();
        Ok(self.render(t))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
