//! Rolling frame-rate accounting.

use std::time::Instant;

/// Frames per measurement window.
pub const DEFAULT_FPS_WINDOW: u32 = 10;

/// Frame counter that produces a rate once per window.
///
/// Frames inside a window report the rate from the previous window, so the
/// displayed value only changes every `window` frames and never divides by a
/// near-zero interval.
#[derive(Debug, Clone)]
pub struct FrameRateSample {
    window: u32,
    count: u32,
    window_start: Instant,
    rate: f64,
}

impl FrameRateSample {
    pub fn new(window: u32, now: Instant) -> Self {
        Self {
            window: window.max(1),
            count: 0,
            window_start: now,
            rate: 0.0,
        }
    }

    /// Count one frame presented at `now` and return the current rate.
    pub fn record(&mut self, now: Instant) -> f64 {
        self.count += 1;
        if self.count >= self.window {
            let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
            if elapsed > 0.0 {
                self.rate = self.count as f64 / elapsed;
            }
            self.count = 0;
            self.window_start = now;
        }
        self.rate
    }

    /// Last computed rate (0.0 until the first window completes).
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Frames counted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Default for FrameRateSample {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_WINDOW, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ten_frames_over_two_seconds() {
        let start = Instant::now();
        let mut fps = FrameRateSample::new(10, start);
        for i in 1..=10u64 {
            fps.record(start + Duration::from_millis(200 * i));
        }
        assert!((fps.rate() - 5.0).abs() < 1e-9);
        assert_eq!(fps.count(), 0);
    }

    #[test]
    fn test_rate_carried_within_window() {
        let start = Instant::now();
        let mut fps = FrameRateSample::new(10, start);
        for i in 1..=10u64 {
            fps.record(start + Duration::from_millis(100 * i));
        }
        let first = fps.rate();
        assert!((first - 10.0).abs() < 1e-9);

        // Next frames are much slower but the rate does not move until the
        // window completes.
        let later = start + Duration::from_secs(5);
        assert_eq!(fps.record(later), first);
        assert_eq!(fps.count(), 1);
    }

    #[test]
    fn test_zero_rate_before_first_window() {
        let start = Instant::now();
        let mut fps = FrameRateSample::new(10, start);
        assert_eq!(fps.record(start + Duration::from_millis(10)), 0.0);
    }

    #[test]
    fn test_zero_elapsed_keeps_previous_rate() {
        let start = Instant::now();
        let mut fps = FrameRateSample::new(2, start);
        fps.record(start);
        assert_eq!(fps.record(start), 0.0);
        assert_eq!(fps.count(), 0);
    }
}
