//! The capture loop: one background thread that owns the camera, turns frames
//! into samples and keeps the vital estimates current.
//!
//! Everything a reader can see (buffer, estimate, latest ROI) lives behind a
//! single mutex. A cycle appends its sample and, when enough samples exist,
//! replaces the estimate inside one acquisition of that mutex, so readers only
//! ever observe state from fully completed cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbImage;
use log::{debug, info, warn};

use crate::buffer::{Sample, SampleBuffer};
use crate::config::OximeterConfig;
use crate::error::OximeterError;
use crate::sensor::SensorHandle;
use crate::signal::{centered_roi, estimate_vitals, reduce_frame, VitalEstimate};

// Upper bound on how long a sleep goes without checking the stop flag.
const STOP_POLL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
}

/// State shared between the capture loop (sole writer) and readers.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub buffer: SampleBuffer,
    pub vitals: VitalEstimate,
    pub roi: Option<RgbImage>,
}

impl SharedState {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: SampleBuffer::with_capacity(capacity),
            vitals: VitalEstimate::default(),
            roi: None,
        }
    }
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.vitals = VitalEstimate::default();
        self.roi = None;
    }
}

/// The open camera. `None` once it has been released.
pub(crate) type SensorSlot = Arc<Mutex<Option<Box<dyn SensorHandle>>>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Close and drop whatever handle is still in the slot.
pub(crate) fn release_sensor(sensor: &SensorSlot) -> bool {
    match lock(sensor).take() {
        Some(mut handle) => {
            handle.close();
            true
        }
        None => false,
    }
}

/// Cooperative cancellation flag plus the loop's lifecycle state.
#[derive(Debug)]
pub(crate) struct LoopControl {
    stop: AtomicBool,
    state: Mutex<LoopState>,
}

impl LoopControl {
    pub fn running() -> Self {
        Self {
            stop: AtomicBool::new(false),
            state: Mutex::new(LoopState::Running),
        }
    }
    pub fn state(&self) -> LoopState {
        *lock(&self.state)
    }
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let mut state = lock(&self.state);
        if *state == LoopState::Running {
            *state = LoopState::Stopping;
        }
    }
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
    fn set_idle(&self) {
        *lock(&self.state) = LoopState::Idle;
    }
}

/// Marks the loop idle and signals `stop()` however the thread exits,
/// including by panic.
struct ExitGuard {
    control: Arc<LoopControl>,
    exited: Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _ = self.exited.send(());
        self.control.set_idle();
    }
}

#[derive(Debug, Default)]
struct CycleStats {
    cycles: u64,
    failures: u64,
    skipped: u64,
}

pub(crate) struct CaptureLoop {
    config: OximeterConfig,
    sensor: SensorSlot,
    shared: Arc<Mutex<SharedState>>,
    control: Arc<LoopControl>,
    origin: Instant,
}

impl CaptureLoop {
    pub fn new(
        config: OximeterConfig,
        sensor: SensorSlot,
        shared: Arc<Mutex<SharedState>>,
        control: Arc<LoopControl>,
        origin: Instant,
    ) -> Self {
        Self {
            config,
            sensor,
            shared,
            control,
            origin,
        }
    }

    pub fn run(self, exited: Sender<()>) {
        let _guard = ExitGuard {
            control: Arc::clone(&self.control),
            exited,
        };
        if !self.sleep_unless_stopped(self.config.warmup()) {
            return;
        }
        info!("capture loop running at {} fps", self.config.fps);
        let interval = self.config.frame_interval();
        let mut stats = CycleStats::default();
        while !self.control.stop_requested() {
            let cycle_started = Instant::now();
            match self.run_cycle() {
                Ok(recorded) => {
                    stats.cycles += 1;
                    if !recorded {
                        stats.skipped += 1;
                    }
                    self.sleep_unless_stopped(interval.saturating_sub(cycle_started.elapsed()));
                }
                Err(OximeterError::SensorReleased) => {
                    info!("sensor released, capture loop exiting");
                    break;
                }
                Err(err) => {
                    stats.failures += 1;
                    warn!("capture cycle failed: {err}");
                    self.sleep_unless_stopped(self.config.retry_backoff());
                }
            }
        }
        info!(
            "capture loop stopped after {} cycles ({} failed, {} without a sample)",
            stats.cycles, stats.failures, stats.skipped
        );
    }

    /// One capture; `Ok(false)` when the frame produced no sample.
    fn run_cycle(&self) -> Result<bool, OximeterError> {
        let frame = {
            let mut slot = lock(&self.sensor);
            let handle = slot.as_mut().ok_or(OximeterError::SensorReleased)?;
            handle.capture_frame()?
        };
        let Some(roi) = centered_roi(&frame) else {
            debug!("frame {}x{} too small for an ROI", frame.width(), frame.height());
            return Ok(false);
        };
        let Some((red, ir)) = reduce_frame(&roi, self.config.channels) else {
            return Ok(false);
        };
        let timestamp = self.origin.elapsed().as_secs_f64();

        let mut shared = lock(&self.shared);
        // A stopped session must not write into the state of the next one.
        if self.control.stop_requested() {
            return Ok(false);
        }
        shared.buffer.push(Sample {
            red,
            ir,
            timestamp,
        });
        shared.roi = Some(roi);
        if shared.buffer.len() >= self.config.estimation_threshold() {
            let vitals = estimate_vitals(&shared.buffer, &self.config, &shared.vitals, timestamp);
            shared.vitals = vitals;
        }
        Ok(true)
    }

    /// Sleep in short slices; returns `false` if a stop was requested.
    fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.control.stop_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(STOP_POLL));
        }
    }
}
