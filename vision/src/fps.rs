use std::time::{Duration, Instant};

pub const FPS_WINDOW: usize = 25;
const REFRESH_EVERY: usize = 5;

/// Rolling frame rate estimate over the last [`FPS_WINDOW`] frame durations.
///
/// The estimate is only refreshed when the write index wraps or lands on a
/// multiple of five, so it lags the true rate by a few frames.
#[derive(Debug, Clone)]
pub struct FrameRateMonitor {
    durations: [Duration; FPS_WINDOW],
    idx: usize,
    filled: usize,
    last: Instant,
    estimate: f64,
}

impl FrameRateMonitor {
    pub fn new(start: Instant) -> Self {
        Self {
            durations: [Duration::ZERO; FPS_WINDOW],
            idx: 0,
            filled: 0,
            last: start,
            estimate: 0.0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> f64 {
        self.durations[self.idx] = now.saturating_duration_since(self.last);
        self.last = now;
        self.filled = (self.filled + 1).min(FPS_WINDOW);
        self.idx += 1;

        if self.idx >= FPS_WINDOW {
            self.idx = 0;
            self.refresh();
        } else if self.idx % REFRESH_EVERY == 0 {
            self.refresh();
        }

        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    fn refresh(&mut self) {
        let total: Duration = self.durations[..self.filled].iter().sum();
        let mean = total.as_secs_f64() / self.filled as f64;
        if mean > 0.0 {
            self.estimate = 1.0 / mean;
        }
    }
}
