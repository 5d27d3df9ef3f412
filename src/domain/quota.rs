//! Hourly Quota Counter
//!
//! Caps the number of candidates that may pass the filter per hour. The
//! window starts when the counter is created; `roll` restarts it at the
//! current instant once a full hour has elapsed.

use std::time::Duration;

use tokio::time::Instant;

/// Length of the quota window
pub const QUOTA_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct HourlyQuotaCounter {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl HourlyQuotaCounter {
    pub fn new() -> Self {
        Self::with_window(QUOTA_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
            window,
        }
    }

    /// Reset the counter if the window has elapsed
    pub fn roll(&mut self, now: Instant) {
        if now.duration_since(self.window_start) >= self.window {
            self.count = 0;
            self.window_start = now;
        }
    }

    /// Whether another pass fits under `max`
    pub fn has_room(&self, max: u32) -> bool {
        self.count < max
    }

    /// Count one passed candidate
    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    /// Time left until the window resets
    pub fn remaining(&self, now: Instant) -> Duration {
        (self.window_start + self.window).saturating_duration_since(now)
    }
}

impl Default for HourlyQuotaCounter {
    fn default() -> Self {
        Self::new()
    }
}
