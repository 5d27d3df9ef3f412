//! Filter Pipeline
//!
//! Applies the configured thresholds to a fully enriched candidate. Checks run
//! in a fixed order and short-circuit on the first failure:
//!
//! 1. liquidity (skipped when the threshold is 0)
//! 2. 24h volume (skipped when the threshold is 0)
//! 3. LP burned, if required
//! 4. mint authority revoked, if required
//! 5. hourly quota
//!
//! A passing evaluation consumes one quota slot in the same call, so callers
//! that hold the quota lock across `evaluate` cannot overshoot the limit.

use thiserror::Error;
use tokio::time::Instant;

use crate::domain::candidate::{Candidate, CandidateError};
use crate::domain::quota::HourlyQuotaCounter;
use crate::domain::sniper_config::SniperConfig;

/// Why a candidate was filtered out
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterRejection {
    #[error("Metadata unavailable")]
    MissingMetadata,

    #[error("Safety verification unavailable")]
    MissingSafety,

    #[error("Insufficient liquidity: ${actual:.2} < ${minimum:.2}")]
    InsufficientLiquidity { actual: f64, minimum: f64 },

    #[error("Insufficient 24h volume: ${actual:.2} < ${minimum:.2}")]
    InsufficientVolume { actual: f64, minimum: f64 },

    #[error("LP tokens not burned")]
    LpNotBurned,

    #[error("Mint authority not revoked")]
    MintAuthorityNotRevoked,

    #[error("Hourly quota exceeded: {count}/{max} candidates passed this hour")]
    QuotaExceeded { count: u32, max: u32 },
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    Pass,
    Reject(FilterRejection),
}

impl FilterDecision {
    pub fn pass(&self) -> bool {
        matches!(self, FilterDecision::Pass)
    }

    /// Human-readable rejection reason, `None` on pass
    pub fn reason(&self) -> Option<String> {
        match self {
            FilterDecision::Pass => None,
            FilterDecision::Reject(rejection) => Some(rejection.to_string()),
        }
    }

    /// Record this decision as the candidate's terminal verdict
    pub fn apply(&self, candidate: &mut Candidate) -> Result<(), CandidateError> {
        match self {
            FilterDecision::Pass => candidate.mark_passed(),
            FilterDecision::Reject(rejection) => candidate.mark_filtered(rejection.to_string()),
        }
    }
}

/// Stateless evaluator over candidate, config snapshot and quota
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterPipeline;

impl FilterPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a candidate, consuming a quota slot on pass.
    pub fn evaluate(
        &self,
        candidate: &Candidate,
        config: &SniperConfig,
        quota: &mut HourlyQuotaCounter,
    ) -> FilterDecision {
        match self.check(candidate, config, quota) {
            Ok(()) => {
                quota.increment();
                FilterDecision::Pass
            }
            Err(rejection) => FilterDecision::Reject(rejection),
        }
    }

    fn check(
        &self,
        candidate: &Candidate,
        config: &SniperConfig,
        quota: &mut HourlyQuotaCounter,
    ) -> Result<(), FilterRejection> {
        let metadata = candidate
            .metadata
            .as_ref()
            .ok_or(FilterRejection::MissingMetadata)?;
        let safety = candidate.safety.ok_or(FilterRejection::MissingSafety)?;

        if config.min_liquidity_threshold > 0.0
            && metadata.liquidity_usd < config.min_liquidity_threshold
        {
            return Err(FilterRejection::InsufficientLiquidity {
                actual: metadata.liquidity_usd,
                minimum: config.min_liquidity_threshold,
            });
        }

        if config.min_volume_threshold > 0.0
            && metadata.volume_24h_usd < config.min_volume_threshold
        {
            return Err(FilterRejection::InsufficientVolume {
                actual: metadata.volume_24h_usd,
                minimum: config.min_volume_threshold,
            });
        }

        if config.require_lp_burned && !safety.is_lp_burned {
            return Err(FilterRejection::LpNotBurned);
        }

        if config.require_mint_revoked && !safety.is_mint_authority_revoked {
            return Err(FilterRejection::MintAuthorityNotRevoked);
        }

        quota.roll(Instant::now());
        if !quota.has_room(config.max_snipes_per_hour) {
            return Err(FilterRejection::QuotaExceeded {
                count: quota.count(),
                max: config.max_snipes_per_hour,
            });
        }

        Ok(())
    }
}
