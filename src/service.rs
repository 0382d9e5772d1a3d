//! Process-wide monitor for front ends that need a single shared instance
//! (e.g. an HTTP layer). The core types never reach for it themselves.

use std::sync::Arc;

use log::info;
use once_cell::sync::OnceCell;

use crate::config::OximeterConfig;
use crate::error::OximeterError;
use crate::monitor::Monitor;
use crate::sensor::SensorDriver;

static SERVICE: OnceCell<Monitor> = OnceCell::new();

/// Build the shared monitor on first call; later calls return the existing
/// instance and ignore their arguments.
pub fn init(
    config: OximeterConfig,
    driver: Arc<dyn SensorDriver>,
) -> Result<&'static Monitor, OximeterError> {
    SERVICE.get_or_try_init(|| {
        info!("initialising monitor service");
        Monitor::with_driver(config, driver)
    })
}

pub fn global() -> Option<&'static Monitor> {
    SERVICE.get()
}

/// Stop any running session and release the sensor. The instance itself
/// stays available, so monitoring can be started again.
pub fn teardown() {
    if let Some(monitor) = SERVICE.get() {
        monitor.stop_monitoring();
        info!("monitor service torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ManualDriver;
    use image::{Rgb, RgbImage};

    #[test]
    fn singleton_lifecycle() {
        let driver = ManualDriver::new([RgbImage::from_pixel(12, 12, Rgb([120, 40, 80]))]);
        let config = OximeterConfig {
            fps: 200.0,
            warmup_secs: 0.0,
            ..Default::default()
        };
        let monitor = init(config.clone(), Arc::new(driver.clone())).unwrap();
        let again = init(config, Arc::new(ManualDriver::new(Vec::<RgbImage>::new()))).unwrap();
        assert!(std::ptr::eq(monitor, again));
        assert!(global().is_some());

        assert!(monitor.start_monitoring());
        teardown();
        assert!(!monitor.is_running());
        assert_eq!(driver.open_handles(), 0);
    }
}
