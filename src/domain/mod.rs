//! Domain Layer - Core pipeline logic for the token sniper
//!
//! Pure types and rules with no network access. All external interactions
//! happen through the ports layer.
//!
//! - `candidate`: Candidate record, metadata and safety flags
//! - `known_programs`: Program ids, opcodes and reserved addresses
//! - `classifier`: Transaction classification into candidate events
//! - `candidate_cache`: Process-lifetime dedup of mint addresses
//! - `rate_limiter`: Rolling-window limiter for upstream calls
//! - `sniper_config`: Filter thresholds and partial updates
//! - `quota`: Hourly pass quota
//! - `filter`: Ordered filter checks
//! - `metrics`: Running performance counters

pub mod candidate;
pub mod known_programs;
pub mod classifier;
pub mod candidate_cache;
pub mod rate_limiter;
pub mod sniper_config;
pub mod quota;
pub mod filter;
pub mod metrics;

pub use candidate::{Candidate, CandidateError, SafetyFlags, SourceType, TokenMetadata, Verdict};
pub use classifier::{
    decode_transaction, Classification, InstructionAccount, InstructionView, TransactionClassifier,
};
pub use candidate_cache::CandidateCache;
pub use rate_limiter::{RateLimitError, RateLimiter};
pub use sniper_config::{SniperConfig, SniperConfigError, SniperConfigUpdate};
pub use quota::HourlyQuotaCounter;
pub use filter::{FilterDecision, FilterPipeline, FilterRejection};
pub use metrics::{MetricsRecorder, PerformanceMetrics};
