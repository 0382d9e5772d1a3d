use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::RgbImage;

use crate::config::Resolution;
use crate::error::OximeterError;
use crate::sensor::{SensorDriver, SensorHandle};

#[derive(Debug, Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    captures: AtomicUsize,
}

/// Scripted driver that replays a fixed list of frames in a loop.
///
/// Useful for tests and deterministic playback: opening can be made to fail,
/// the first captures can be made to error, and every open/close/capture is
/// counted across all handles.
#[derive(Clone, Debug)]
pub struct ManualDriver {
    frames: Arc<Vec<RgbImage>>,
    fail_open: bool,
    failing_captures: usize,
    capture_delay: Duration,
    counters: Arc<Counters>,
}

impl ManualDriver {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: Arc::new(frames.into_iter().collect()),
            fail_open: false,
            failing_captures: 0,
            capture_delay: Duration::ZERO,
            counters: Arc::default(),
        }
    }
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
    /// The first `count` captures of every handle return a capture error.
    pub fn with_failed_captures(mut self, count: usize) -> Self {
        self.failing_captures = count;
        self
    }
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }
    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }
    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }
    pub fn captures(&self) -> usize {
        self.counters.captures.load(Ordering::SeqCst)
    }
    /// Handles opened but not yet closed.
    pub fn open_handles(&self) -> usize {
        self.opens().saturating_sub(self.closes())
    }
}

impl SensorDriver for ManualDriver {
    fn open(
        &self,
        _resolution: Resolution,
        _frame_interval: Duration,
    ) -> Result<Box<dyn SensorHandle>, OximeterError> {
        if self.fail_open {
            return Err(OximeterError::SensorInit("manual driver set to fail".into()));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ManualHandle {
            driver: self.clone(),
            cursor: 0,
            attempts: 0,
            closed: false,
        }))
    }
}

struct ManualHandle {
    driver: ManualDriver,
    cursor: usize,
    attempts: usize,
    closed: bool,
}

impl SensorHandle for ManualHandle {
    fn capture_frame(&mut self) -> Result<RgbImage, OximeterError> {
        if self.closed {
            return Err(OximeterError::SensorReleased);
        }
        if !self.driver.capture_delay.is_zero() {
            thread::sleep(self.driver.capture_delay);
        }
        self.attempts += 1;
        self.driver.counters.captures.fetch_add(1, Ordering::SeqCst);
        if self.attempts <= self.driver.failing_captures {
            return Err(OximeterError::Capture(format!(
                "scripted failure {}",
                self.attempts
            )));
        }
        let frames = &self.driver.frames;
        if frames.is_empty() {
            return Err(OximeterError::Capture("no frames scripted".into()));
        }
        let frame = frames[self.cursor % frames.len()].clone();
        self.cursor += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.driver.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        self.close();
    }
}
