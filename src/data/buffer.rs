//! Bounded rolling buffer of metrics samples.

use std::collections::{vec_deque, VecDeque};

use routewatch_types::Sample;

/// Default number of samples kept (six minutes at a 3 s poll).
pub const DEFAULT_CAPACITY: usize = 120;

/// Append-only ring buffer ordered by arrival.
///
/// When full, the oldest sample is evicted. There is no other way to remove
/// a sample and no way to modify one in place. Failed fetches never touch it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for TimeSeriesBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TimeSeriesBuffer {
    /// Create an empty buffer holding at most `capacity` samples (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting from the front past capacity.
    ///
    /// A timestamp older than the newest sample's is lifted to it, keeping
    /// timestamps non-decreasing.
    pub fn append(&mut self, mut sample: Sample) {
        if let Some(last) = self.samples.back() {
            sample.timestamp_ms = sample.timestamp_ms.max(last.timestamp_ms);
        }
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Samples oldest first. Call again to restart.
    pub fn series(&self) -> vec_deque::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: u64) -> Sample {
        Sample::new(ts).p95(ts as f64)
    }

    #[test]
    fn keeps_last_capacity_samples_in_order() {
        for extra in [1, 5, 37, 120] {
            let mut buffer = TimeSeriesBuffer::with_capacity(10);
            let total = 10 + extra;
            for ts in 0..total {
                buffer.append(sample(ts));
            }
            assert_eq!(buffer.len(), 10);
            let kept: Vec<u64> = buffer.series().map(|s| s.timestamp_ms).collect();
            let expected: Vec<u64> = (total - 10..total).collect();
            assert_eq!(kept, expected);
        }
    }

    #[test]
    fn latest_is_newest() {
        let mut buffer = TimeSeriesBuffer::default();
        assert!(buffer.latest().is_none());
        buffer.append(sample(1));
        buffer.append(sample(2));
        assert_eq!(buffer.latest().map(|s| s.timestamp_ms), Some(2));
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn out_of_order_timestamp_is_lifted() {
        let mut buffer = TimeSeriesBuffer::with_capacity(4);
        buffer.append(sample(50));
        buffer.append(sample(20));
        let stamps: Vec<u64> = buffer.series().map(|s| s.timestamp_ms).collect();
        assert_eq!(stamps, vec![50, 50]);
        assert_eq!(buffer.latest().map(|s| s.p95_ms), Some(20.0));
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut buffer = TimeSeriesBuffer::with_capacity(0);
        buffer.append(sample(1));
        buffer.append(sample(2));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.latest().map(|s| s.timestamp_ms), Some(2));
    }

    #[test]
    fn series_is_restartable() {
        let mut buffer = TimeSeriesBuffer::with_capacity(3);
        buffer.append(sample(1));
        buffer.append(sample(2));
        let first: Vec<_> = buffer.series().collect();
        let second: Vec<_> = buffer.series().collect();
        assert_eq!(first, second);
        assert_eq!(buffer.series().rev().next().map(|s| s.timestamp_ms), Some(2));
    }
}
