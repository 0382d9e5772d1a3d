//! Argument parsing for running from the command line

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;

use camox::OximeterConfig;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file with monitor settings; the flags below override it
    #[clap(short, long, value_parser)]
    pub config: Option<PathBuf>,
    /// Number of samples kept in the rolling buffer
    #[clap(short, long, value_parser)]
    pub buffer_size: Option<usize>,
    /// Target capture rate in frames per second
    #[clap(short, long, value_parser)]
    pub fps: Option<f64>,
    /// Seconds to monitor before shutting down
    #[clap(short, long, value_parser, default_value_t = 10.0)]
    pub duration: f64,
    /// Heart rate of the simulated subject
    #[clap(long, value_parser, default_value_t = 72.0)]
    pub bpm: f64,
    /// Oxygen saturation of the simulated subject
    #[clap(long, value_parser, default_value_t = 97.0)]
    pub spo2: f64,
    /// Seed for the simulated sensor noise
    #[clap(long, value_parser, default_value_t = 0)]
    pub seed: u64,
    /// Write a PNG of the buffered signals here on exit
    #[clap(long, value_parser)]
    pub plot: Option<PathBuf>,
    /// Write the last ROI as JPEG here on exit
    #[clap(long, value_parser)]
    pub roi: Option<PathBuf>,
}

impl Args {
    pub fn monitor_config(&self) -> Result<OximeterConfig> {
        let mut config = match &self.config {
            Some(path) => OximeterConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => OximeterConfig::default(),
        };
        if let Some(buffer_size) = self.buffer_size {
            config.buffer_size = buffer_size;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        config.validate()?;
        ensure!(
            self.duration.is_finite() && self.duration >= 0.0,
            "duration must be a non-negative number of seconds"
        );
        Ok(config)
    }
}
