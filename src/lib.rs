//! Camera pulse oximeter core.
//!
//! A background capture loop samples the mean red and "ir" (blue, standing in
//! for infrared) intensity of a fingertip region, and estimates pulse rate
//! from zero-crossings and SpO2 from the ratio of ratios. Estimates are
//! approximations for demonstration, not medical measurements.
pub mod buffer;
pub mod capture;
pub mod config;
pub mod error;
pub mod monitor;
pub mod plot;
pub mod sensor;
pub mod service;
pub mod signal;

pub use buffer::{HistoricalData, Sample, SampleBuffer};
pub use capture::LoopState;
pub use config::{ChannelMap, Clamp, ColorChannel, OximeterConfig, Resolution};
pub use error::OximeterError;
pub use monitor::{CurrentData, Monitor};
pub use plot::{render_history_png, PlotStyle};
pub use sensor::{ManualDriver, SensorDriver, SensorHandle, SimulatedDriver};
pub use signal::VitalEstimate;
