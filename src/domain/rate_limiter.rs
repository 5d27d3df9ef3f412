//! Rolling Window Rate Limiter
//!
//! Bounds outbound enrichment calls to N starts per rolling window (60 calls
//! per 60 seconds by default). Callers that find the window full wait until the
//! oldest recorded start leaves the window instead of being dropped, up to a
//! deadline of `max_wait_rounds` windows measured from entry into `acquire`.
//! Time spent queued behind other callers counts against that deadline.
//!
//! The check-or-wait step is serialized through a single FIFO mutex, so
//! concurrent callers are admitted in arrival order and the ceiling holds for
//! every rolling window, not just fixed buckets.

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::debug;

/// Default ceiling of calls per window
pub const DEFAULT_MAX_REQUESTS_PER_WINDOW: usize = 60;
/// Default rolling window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default number of windows a caller may wait before giving up
pub const DEFAULT_MAX_WAIT_ROUNDS: u32 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Rate limit wait exhausted after {0} rounds")]
    WaitExhausted(u32),
}

/// Sliding-log rate limiter shared by all enrichment calls
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    max_wait_rounds: u32,
    /// Start instants of calls admitted within the current window
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window`
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self::with_max_wait_rounds(max_requests, window, DEFAULT_MAX_WAIT_ROUNDS)
    }

    pub fn with_max_wait_rounds(max_requests: usize, window: Duration, max_wait_rounds: u32) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            max_wait_rounds,
            starts: Mutex::new(VecDeque::with_capacity(max_requests.max(1))),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for a slot in the window and record the call start.
    ///
    /// Holding the lock across the sleep queues later callers behind this one,
    /// which keeps admission monotonic. The deadline covers both the queueing
    /// and the sleep.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        let deadline = Instant::now() + self.window * self.max_wait_rounds;
        let exhausted = RateLimitError::WaitExhausted(self.max_wait_rounds);

        let mut starts = timeout_at(deadline, self.starts.lock())
            .await
            .map_err(|_| exhausted.clone())?;

        loop {
            let now = Instant::now();
            self.evict_expired(&mut starts, now);

            if starts.len() < self.max_requests {
                starts.push_back(now);
                return Ok(());
            }

            // Window is full: the oldest start determines when a slot frees up
            let free_at = starts
                .front()
                .map(|oldest| *oldest + self.window)
                .unwrap_or(now);
            if free_at > deadline {
                debug!(
                    in_window = starts.len(),
                    max_wait_rounds = self.max_wait_rounds,
                    "Rate limit wait would pass deadline, giving up"
                );
                return Err(exhausted);
            }

            debug!(
                in_window = starts.len(),
                wait_ms = free_at.saturating_duration_since(now).as_millis() as u64,
                "Rate limit reached, delaying call"
            );
            sleep_until(free_at).await;
        }
    }

    /// Calls started within the current rolling window
    pub async fn in_flight_window(&self) -> usize {
        let mut starts = self.starts.lock().await;
        self.evict_expired(&mut starts, Instant::now());
        starts.len()
    }

    fn evict_expired(&self, starts: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = starts.front() {
            if now.duration_since(*oldest) >= self.window {
                starts.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS_PER_WINDOW, DEFAULT_WINDOW)
    }
}
