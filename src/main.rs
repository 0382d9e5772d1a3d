mod args;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use camox::{render_history_png, service, PlotStyle, SimulatedDriver};

use crate::args::Args;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.monitor_config()?;

    let driver = SimulatedDriver::new(args.bpm, args.spo2).with_seed(args.seed);
    let monitor =
        service::init(config, Arc::new(driver)).context("failed to initialise the monitor")?;
    if !monitor.start_monitoring() {
        bail!("monitoring did not start");
    }

    let deadline = Instant::now() + Duration::from_secs_f64(args.duration);
    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        thread::sleep(remaining.min(Duration::from_secs(1)));
        let data = monitor.get_current_data();
        let samples = data.historical_data.as_ref().map_or(0, |h| h.len());
        println!(
            "{}",
            serde_json::json!({
                "pulse_rate": data.pulse_rate_bpm,
                "spo2": data.spo2_pct,
                "timestamp": data.timestamp,
                "samples": samples,
            })
        );
    }

    let data = monitor.get_current_data();
    service::teardown();

    if let Some(path) = &args.plot {
        match &data.historical_data {
            Some(history) => {
                let png = render_history_png(history, PlotStyle::default())?;
                std::fs::write(path, png)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!("history plot written to {}", path.display());
            }
            None => warn!("no samples captured, skipping plot"),
        }
    }
    if let Some(path) = &args.roi {
        match &data.roi_image {
            Some(jpeg) => {
                std::fs::write(path, jpeg)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!("ROI image written to {}", path.display());
            }
            None => warn!("no ROI captured, skipping image"),
        }
    }
    Ok(())
}
