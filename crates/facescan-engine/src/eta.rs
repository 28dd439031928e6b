//! Moving-average ETA over recent per-item durations.

use std::collections::VecDeque;
use std::time::Duration;

/// Bounded ring of the most recent per-candidate processing durations.
///
/// The estimate is the window mean multiplied by the remaining item count.
#[derive(Debug)]
pub struct EtaEstimator {
    samples: VecDeque<Duration>,
    window: usize,
}

impl EtaEstimator {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// `None` until at least one sample has been recorded.
    pub fn estimate(&self, remaining_items: usize) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        let mean = total / self.samples.len() as u32;
        Some(mean * remaining_items as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_estimate_without_samples() {
        let eta = EtaEstimator::new(5);
        assert_eq!(eta.estimate(10), None);
    }

    #[test]
    fn test_mean_times_remaining() {
        let mut eta = EtaEstimator::new(5);
        eta.record(Duration::from_millis(100));
        eta.record(Duration::from_millis(300));
        assert_eq!(eta.estimate(4), Some(Duration::from_millis(800)));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut eta = EtaEstimator::new(2);
        eta.record(Duration::from_millis(1000));
        eta.record(Duration::from_millis(200));
        eta.record(Duration::from_millis(400));
        // The 1000ms sample has been evicted; mean is 300ms.
        assert_eq!(eta.estimate(2), Some(Duration::from_millis(600)));
    }

    #[test]
    fn test_zero_remaining() {
        let mut eta = EtaEstimator::new(3);
        eta.record(Duration::from_millis(50));
        assert_eq!(eta.estimate(0), Some(Duration::ZERO));
    }

    #[test]
    fn test_window_floor_of_one() {
        let mut eta = EtaEstimator::new(0);
        eta.record(Duration::from_millis(70));
        eta.record(Duration::from_millis(90));
        assert_eq!(eta.estimate(1), Some(Duration::from_millis(90)));
    }
}
