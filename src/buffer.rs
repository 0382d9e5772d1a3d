use std::collections::VecDeque;

use serde::Serialize;

/// One paired reading of the two color channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub red: f64,
    pub ir: f64,
    /// Monotonic seconds since the owning monitor was created.
    pub timestamp: f64,
}

/// Copy of the buffered series, with times relative to the oldest sample.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HistoricalData {
    pub red: Vec<f64>,
    pub ir: Vec<f64>,
    pub times: Vec<f64>,
}

impl HistoricalData {
    pub fn len(&self) -> usize {
        self.times.len()
    }
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
    pub fn duration_seconds(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// Fixed-capacity FIFO of samples; the oldest entry is evicted when full.
///
/// Whole samples are stored, so the red, ir and time series can never drift
/// apart in length.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn push(&mut self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
    pub fn red(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.red).collect()
    }
    pub fn ir(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.ir).collect()
    }
    pub fn timestamps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }
    pub fn snapshot(&self) -> HistoricalData {
        let origin = self.samples.front().map(|s| s.timestamp).unwrap_or(0.0);
        let mut history = HistoricalData {
            red: Vec::with_capacity(self.samples.len()),
            ir: Vec::with_capacity(self.samples.len()),
            times: Vec::with_capacity(self.samples.len()),
        };
        for sample in &self.samples {
            history.red.push(sample.red);
            history.ir.push(sample.ir);
            history.times.push(sample.timestamp - origin);
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> Sample {
        Sample {
            red: i as f64,
            ir: 1000.0 + i as f64,
            timestamp: 10.0 + i as f64 * 0.5,
        }
    }

    #[test]
    fn keeps_last_n_in_order() {
        let capacity = 8;
        for extra in [0usize, 1, 5, 23] {
            let mut buffer = SampleBuffer::with_capacity(capacity);
            for i in 0..capacity + extra {
                buffer.push(sample(i));
            }
            assert_eq!(buffer.len(), capacity);
            let kept: Vec<f64> = buffer.red();
            let expected: Vec<f64> = (extra..capacity + extra).map(|i| i as f64).collect();
            assert_eq!(kept, expected);
        }
    }

    #[test]
    fn partial_fill_keeps_everything() {
        let mut buffer = SampleBuffer::with_capacity(150);
        for i in 0..10 {
            buffer.push(sample(i));
        }
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.iter().next(), Some(&sample(0)));
    }

    #[test]
    fn snapshot_normalizes_time_and_is_independent() {
        let mut buffer = SampleBuffer::with_capacity(4);
        for i in 0..6 {
            buffer.push(sample(i));
        }
        let history = buffer.snapshot();
        assert_eq!(history.times, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(history.red, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(history.ir.len(), history.red.len());
        assert!((history.duration_seconds() - 1.5).abs() < 1e-12);

        buffer.push(sample(6));
        assert_eq!(history.red[0], 2.0);
        assert_eq!(buffer.snapshot().red[0], 3.0);
    }

    #[test]
    fn empty_snapshot() {
        let buffer = SampleBuffer::with_capacity(4);
        let history = buffer.snapshot();
        assert!(history.is_empty());
        assert_eq!(history.duration_seconds(), 0.0);
    }
}
