// src/sensor/mod.rs
pub mod manual;
pub mod simulated;

pub use manual::ManualDriver;
pub use simulated::SimulatedDriver;

use std::time::Duration;

use image::RgbImage;

use crate::config::Resolution;
use crate::error::OximeterError;

/// Factory for camera sessions. Implementations wrap the platform capture API.
pub trait SensorDriver: Send + Sync {
    /// Open the device. Failures must be reported as `OximeterError::SensorInit`.
    fn open(
        &self,
        resolution: Resolution,
        frame_interval: Duration,
    ) -> Result<Box<dyn SensorHandle>, OximeterError>;
}

/// An open camera owned by the capture loop.
pub trait SensorHandle: Send {
    /// Block until the next frame is available.
    fn capture_frame(&mut self) -> Result<RgbImage, OximeterError>;
    /// Release the device. Calling it more than once is harmless.
    fn close(&mut self);
}
