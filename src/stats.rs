//! Frontend framerate statistics

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Framerate measured over the most recent processed batches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Framerate {
    /// Mean frames per second over the window
    pub fps: f64,
    pub mean_frame_duration: Duration,
    pub min_frame_duration: Duration,
    pub max_frame_duration: Duration,
    /// Number of intervals the figures are based on
    pub samples: usize,
}

/// Rolling framerate over the last `window` batch arrivals.
#[derive(Debug, Clone)]
pub struct FramerateTracker {
    window: usize,
    arrivals: VecDeque<Instant>,
}

impl FramerateTracker {
    /// `window` is clamped to at least two arrivals (one interval).
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self { window, arrivals: VecDeque::with_capacity(window) }
    }

    /// Record one processed batch.
    ///
    /// Returns `None` until two arrivals have been seen.
    pub fn record(&mut self, at: Instant) -> Option<Framerate> {
        if self.arrivals.len() == self.window {
            self.arrivals.pop_front();
        }
        self.arrivals.push_back(at);
        self.current()
    }

    pub fn current(&self) -> Option<Framerate> {
        let durations: Vec<Duration> = self
            .arrivals
            .iter()
            .zip(self.arrivals.iter().skip(1))
            .map(|(earlier, later)| later.saturating_duration_since(*earlier))
            .collect();

        let samples = durations.len();
        let min = durations.iter().min().copied()?;
        let max = durations.iter().max().copied()?;
        let total: Duration = durations.iter().sum();
        let mean = total / samples as u32;

        let fps = if mean.is_zero() { 0.0 } else { 1.0 / mean.as_secs_f64() };

        Some(Framerate {
            fps,
            mean_frame_duration: mean,
            min_frame_duration: min,
            max_frame_duration: max,
            samples,
        })
    }

    /// Forget all arrivals, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.arrivals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_two_arrivals() {
        let mut tracker = FramerateTracker::new(10);
        assert_eq!(tracker.record(Instant::now()), None);
    }

    #[test]
    fn steady_thirty_hertz() {
        let start = Instant::now();
        let mut tracker = FramerateTracker::new(10);
        let mut last = None;
        for i in 0..5u32 {
            last = tracker.record(start + Duration::from_micros(33_333) * i);
        }

        let rate = last.unwrap();
        assert_eq!(rate.samples, 4);
        assert!((rate.fps - 30.0).abs() < 0.01, "fps was {}", rate.fps);
        assert_eq!(rate.min_frame_duration, rate.max_frame_duration);
    }

    #[test]
    fn window_drops_oldest_arrivals() {
        let start = Instant::now();
        let mut tracker = FramerateTracker::new(3);

        // One slow interval, then fast ones push it out of the window
        tracker.record(start);
        tracker.record(start + Duration::from_secs(1));
        tracker.record(start + Duration::from_millis(1100));
        let rate = tracker.record(start + Duration::from_millis(1200)).unwrap();

        assert_eq!(rate.samples, 2);
        assert_eq!(rate.max_frame_duration, Duration::from_millis(100));
        assert!((rate.fps - 10.0).abs() < 1e-9);
    }

    #[test]
    fn min_and_max_track_extremes() {
        let start = Instant::now();
        let mut tracker = FramerateTracker::new(10);
        tracker.record(start);
        tracker.record(start + Duration::from_millis(10));
        let rate = tracker.record(start + Duration::from_millis(40)).unwrap();

        assert_eq!(rate.min_frame_duration, Duration::from_millis(10));
        assert_eq!(rate.max_frame_duration, Duration::from_millis(30));
        assert_eq!(rate.mean_frame_duration, Duration::from_millis(20));
    }

    #[test]
    fn reset_clears_history() {
        let start = Instant::now();
        let mut tracker = FramerateTracker::new(4);
        tracker.record(start);
        tracker.record(start + Duration::from_millis(16));
        tracker.reset();
        assert_eq!(tracker.current(), None);
    }
}
