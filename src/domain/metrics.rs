//! Pipeline Metrics
//!
//! Running counters for detections, enrichment outcomes and timings. The
//! recorder is shared between the connection task and enrichment tasks; the
//! consumer reads snapshots.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::candidate::SourceType;

/// Maximum API response time samples retained
pub const MAX_RESPONSE_TIME_SAMPLES: usize = 100;

#[derive(Debug, Default)]
struct MetricsState {
    detections: u64,
    token_creations: u64,
    pool_creations: u64,
    duplicates: u64,
    total_attempts: u64,
    successes: u64,
    failures: u64,
    filtered: u64,
    total_detection_time_ms: u64,
    api_response_times_ms: VecDeque<u64>,
}

/// Read-only metrics snapshot handed to the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub detections: u64,
    pub token_creations: u64,
    pub pool_creations: u64,
    pub duplicates: u64,
    pub total_attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub filtered: u64,
    pub total_detection_time_ms: u64,
    pub api_response_times_ms: Vec<u64>,
    /// successes / total_attempts (0 when nothing attempted)
    pub success_rate: f64,
    /// Mean of the retained API response samples
    pub average_api_response_time_ms: f64,
    /// total_detection_time_ms / decided candidates
    pub average_detection_time_ms: f64,
}

/// Thread-safe metrics accumulator
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    state: Mutex<MetricsState>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A classified (non-null) event arrived
    pub fn record_detection(&self, source: SourceType) {
        self.with_state(|s| {
            s.detections += 1;
            match source {
                SourceType::TokenCreation => s.token_creations += 1,
                SourceType::PoolCreation => s.pool_creations += 1,
            }
        });
    }

    /// A detection was dropped by the candidate cache
    pub fn record_duplicate(&self) {
        self.with_state(|s| s.duplicates += 1);
    }

    /// An unseen candidate entered enrichment
    pub fn record_attempt(&self) {
        self.with_state(|s| s.total_attempts += 1);
    }

    /// Candidate passed the filter
    pub fn record_success(&self, detection_time: Duration) {
        self.with_state(|s| {
            s.successes += 1;
            s.total_detection_time_ms += detection_time.as_millis() as u64;
        });
    }

    /// Candidate was rejected by the filter
    pub fn record_filtered(&self, detection_time: Duration) {
        self.with_state(|s| {
            s.filtered += 1;
            s.total_detection_time_ms += detection_time.as_millis() as u64;
        });
    }

    /// Enrichment failed and the candidate was dropped
    pub fn record_failure(&self) {
        self.with_state(|s| s.failures += 1);
    }

    /// One upstream API call completed (successfully or not)
    pub fn record_api_response_time(&self, elapsed: Duration) {
        self.with_state(|s| {
            if s.api_response_times_ms.len() >= MAX_RESPONSE_TIME_SAMPLES {
                s.api_response_times_ms.pop_front();
            }
            s.api_response_times_ms.push_back(elapsed.as_millis() as u64);
        });
    }

    /// Snapshot with derived rates
    pub fn snapshot(&self) -> PerformanceMetrics {
        self.with_state(|s| {
            let success_rate = if s.total_attempts > 0 {
                s.successes as f64 / s.total_attempts as f64
            } else {
                0.0
            };

            let average_api_response_time_ms = if s.api_response_times_ms.is_empty() {
                0.0
            } else {
                s.api_response_times_ms.iter().sum::<u64>() as f64
                    / s.api_response_times_ms.len() as f64
            };

            let decided = s.successes + s.filtered;
            let average_detection_time_ms = if decided > 0 {
                s.total_detection_time_ms as f64 / decided as f64
            } else {
                0.0
            };

            PerformanceMetrics {
                detections: s.detections,
                token_creations: s.token_creations,
                pool_creations: s.pool_creations,
                duplicates: s.duplicates,
                total_attempts: s.total_attempts,
                successes: s.successes,
                failures: s.failures,
                filtered: s.filtered,
                total_detection_time_ms: s.total_detection_time_ms,
                api_response_times_ms: s.api_response_times_ms.iter().copied().collect(),
                success_rate,
                average_api_response_time_ms,
                average_detection_time_ms,
            }
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MetricsState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
