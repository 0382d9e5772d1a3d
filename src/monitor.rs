use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, error, info, warn};
use serde::{Serialize, Serializer};

use crate::buffer::HistoricalData;
use crate::capture::{
    lock, release_sensor, CaptureLoop, LoopControl, LoopState, SensorSlot, SharedState,
};
use crate::config::OximeterConfig;
use crate::error::OximeterError;
use crate::sensor::SensorDriver;
use crate::signal::{encode_jpeg, VitalEstimate};

/// What a caller sees when it asks for the latest readings.
#[derive(Clone, Debug, Serialize)]
pub struct CurrentData {
    #[serde(rename = "pulse_rate")]
    pub pulse_rate_bpm: i32,
    #[serde(rename = "spo2")]
    pub spo2_pct: i32,
    /// Wall-clock seconds since the Unix epoch at the time of the query.
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_data: Option<HistoricalData>,
    /// JPEG of the most recent ROI. Serialized as a base64 string for display.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_base64"
    )]
    pub roi_image: Option<Vec<u8>>,
}

fn serialize_base64<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match bytes {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

struct Session {
    control: Arc<LoopControl>,
    sensor: SensorSlot,
    exited: Receiver<()>,
    thread: JoinHandle<()>,
}

impl Session {
    fn shutdown(self, join_timeout: Duration) {
        self.control.request_stop();
        match self.exited.recv_timeout(join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.thread.join().is_err() {
                    warn!("capture thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "capture loop did not exit within {:?}, releasing sensor anyway",
                    join_timeout
                );
            }
        }
        if release_sensor(&self.sensor) {
            info!("sensor released");
        }
    }
}

/// Start/stop control and snapshot reads over one capture session at a time.
///
/// A plain value: every instance owns its own buffer, estimate and thread, so
/// several can coexist (e.g. in tests).
pub struct Monitor {
    config: OximeterConfig,
    driver: Arc<dyn SensorDriver>,
    shared: Arc<Mutex<SharedState>>,
    // Serializes start and stop; held for the whole shutdown.
    session: Mutex<Option<Session>>,
    // Lifecycle of the latest session, readable while a stop is in progress.
    control: Mutex<Option<Arc<LoopControl>>>,
    origin: Instant,
}

impl Monitor {
    pub fn new(
        config: OximeterConfig,
        driver: impl SensorDriver + 'static,
    ) -> Result<Self, OximeterError> {
        Self::with_driver(config, Arc::new(driver))
    }

    pub fn with_driver(
        config: OximeterConfig,
        driver: Arc<dyn SensorDriver>,
    ) -> Result<Self, OximeterError> {
        config.validate()?;
        let shared = Arc::new(Mutex::new(SharedState::new(config.buffer_size)));
        Ok(Self {
            config,
            driver,
            shared,
            session: Mutex::new(None),
            control: Mutex::new(None),
            origin: Instant::now(),
        })
    }

    pub fn config(&self) -> &OximeterConfig {
        &self.config
    }

    /// Open the sensor and spawn the capture loop.
    ///
    /// `Ok(false)` if a session is already running. A sensor that cannot be
    /// opened is reported as `OximeterError::SensorInit` and leaves the
    /// monitor idle.
    pub fn try_start(&self) -> Result<bool, OximeterError> {
        let mut session = lock(&self.session);
        if let Some(active) = session.as_ref() {
            if active.control.state() != LoopState::Idle {
                debug!("start requested while a session is active");
                return Ok(false);
            }
        }
        // A loop that ended on its own still needs its sensor released.
        if let Some(finished) = session.take() {
            finished.shutdown(Duration::ZERO);
        }

        let handle = self
            .driver
            .open(self.config.resolution, self.config.frame_interval())?;
        let sensor: SensorSlot = Arc::new(Mutex::new(Some(handle)));
        lock(&self.shared).reset();

        let control = Arc::new(LoopControl::running());
        let (exited_tx, exited_rx) = mpsc::channel();
        let worker = CaptureLoop::new(
            self.config.clone(),
            Arc::clone(&sensor),
            Arc::clone(&self.shared),
            Arc::clone(&control),
            self.origin,
        );
        let thread = match thread::Builder::new()
            .name("camox-capture".into())
            .spawn(move || worker.run(exited_tx))
        {
            Ok(thread) => thread,
            Err(err) => {
                release_sensor(&sensor);
                return Err(err.into());
            }
        };
        info!(
            "monitoring started ({}x{}, buffer {} samples)",
            self.config.resolution.width, self.config.resolution.height, self.config.buffer_size
        );
        *lock(&self.control) = Some(Arc::clone(&control));
        *session = Some(Session {
            control,
            sensor,
            exited: exited_rx,
            thread,
        });
        Ok(true)
    }

    /// `true` if a new session was started.
    pub fn start_monitoring(&self) -> bool {
        match self.try_start() {
            Ok(started) => started,
            Err(err) => {
                error!("failed to start monitoring: {err}");
                false
            }
        }
    }

    /// Stop the loop, waiting at most the join timeout, then release the
    /// sensor whether or not the loop finished. Always succeeds.
    pub fn stop_monitoring(&self) -> bool {
        let mut session = lock(&self.session);
        match session.take() {
            Some(active) => {
                active.shutdown(self.config.join_timeout());
                info!("monitoring stopped");
            }
            None => debug!("stop requested with no session"),
        }
        true
    }

    /// Lifecycle of the latest session. Does not wait for a stop in progress,
    /// which reports `Stopping` until the loop has exited.
    pub fn state(&self) -> LoopState {
        lock(&self.control)
            .as_ref()
            .map(|control| control.state())
            .unwrap_or(LoopState::Idle)
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn vitals(&self) -> VitalEstimate {
        lock(&self.shared).vitals
    }

    pub fn history(&self) -> HistoricalData {
        lock(&self.shared).buffer.snapshot()
    }

    /// Consistent copy of the latest estimate, history and ROI.
    ///
    /// Only the copy happens under the lock; JPEG encoding runs after it is
    /// released. Never triggers estimation.
    pub fn get_current_data(&self) -> CurrentData {
        let (vitals, historical_data, roi) = {
            let shared = lock(&self.shared);
            let history = (!shared.buffer.is_empty()).then(|| shared.buffer.snapshot());
            (shared.vitals, history, shared.roi.clone())
        };
        let roi_image = roi.and_then(|roi| match encode_jpeg(&roi) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("dropping ROI image: {err}");
                None
            }
        });
        CurrentData {
            pulse_rate_bpm: vitals.pulse_rate_bpm,
            spo2_pct: vitals.spo2_pct,
            timestamp: unix_now(),
            historical_data,
            roi_image,
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
