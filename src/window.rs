//! Fixed-capacity running-speed window.
//!
//! Holds the most recent K instantaneous speeds and exposes their
//! arithmetic mean. Before the window fills for the first time the mean
//! covers only the values held so far; it is never padded with zeros.

use std::collections::VecDeque;

/// Ring buffer over the most recent instantaneous speeds (m/s).
#[derive(Debug, Clone)]
pub struct SpeedWindow {
    capacity: usize,
    speeds: VecDeque<f64>,
    sum: f64,
}

impl SpeedWindow {
    /// Create a window holding up to `capacity` speeds.
    ///
    /// Capacity must be non-zero; the config layer validates this before
    /// construction.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            speeds: VecDeque::with_capacity(capacity),
            sum: 0.0,
        }
    }

    /// Push a speed, evicting the oldest value once at capacity.
    pub fn push(&mut self, speed: f64) {
        if self.speeds.len() == self.capacity {
            if let Some(evicted) = self.speeds.pop_front() {
                self.sum -= evicted;
            }
        }
        self.speeds.push_back(speed);
        self.sum += speed;
    }

    /// Running mean over the values currently held.
    ///
    /// Returns `None` before the first push.
    pub fn mean(&self) -> Option<f64> {
        if self.speeds.is_empty() {
            return None;
        }
        Some(self.sum / self.speeds.len() as f64)
    }

    /// Number of speeds currently held.
    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    /// True until the first push.
    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_has_no_mean() {
        let window = SpeedWindow::new(4);
        assert!(window.mean().is_none());
        assert!(window.is_empty());
    }

    #[test]
    fn test_partial_fill_averages_held_values_only() {
        let mut window = SpeedWindow::new(10);
        window.push(1.0);
        window.push(3.0);
        // Mean over the 2 held values, not 10 zero-padded slots
        assert!((window.mean().unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_ring_eviction_at_capacity() {
        let mut window = SpeedWindow::new(3);
        for s in [1.0, 2.0, 3.0, 4.0] {
            window.push(s);
        }
        // 1.0 evicted, window holds [2, 3, 4]
        assert_eq!(window.len(), 3);
        assert!((window.mean().unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_long_stream_stays_bounded() {
        let mut window = SpeedWindow::new(5);
        for i in 0..1000 {
            window.push(i as f64);
        }
        assert_eq!(window.len(), 5);
        // Last five values: 995..=999
        assert!((window.mean().unwrap() - 997.0).abs() < 1e-9);
    }
}
