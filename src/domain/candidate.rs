//! Candidate Types
//!
//! A candidate is a detected, not-yet-vetted new token event. It is created
//! when the classifier extracts a mint address, enriched with metadata and
//! safety flags, and finally receives a terminal verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which on-chain signal produced the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// A token program "initialize mint" instruction
    TokenCreation,
    /// A liquidity pool creation instruction
    PoolCreation,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::TokenCreation => write!(f, "token_creation"),
            SourceType::PoolCreation => write!(f, "pool_creation"),
        }
    }
}

/// Filter verdict. Only `Pending -> Passed` and `Pending -> Filtered` are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pending,
    Passed,
    Filtered,
}

impl Verdict {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Verdict::Pending)
    }
}

/// Market metadata returned by the enrichment API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub price_usd: f64,
}

/// Rug-pull safety flags returned by the verification API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafetyFlags {
    pub is_lp_burned: bool,
    pub is_mint_authority_revoked: bool,
}

impl SafetyFlags {
    /// Flags used when verification fails: nothing is assumed safe
    pub fn fail_closed() -> Self {
        Self::default()
    }

    pub fn is_fully_safe(&self) -> bool {
        self.is_lp_burned && self.is_mint_authority_revoked
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CandidateError {
    #[error("Candidate {mint} already has terminal verdict {verdict:?}")]
    AlreadyDecided { mint: String, verdict: Verdict },
}

/// A new token event moving through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub mint_address: String,
    pub source_type: SourceType,
    pub discovered_at: DateTime<Utc>,
    pub metadata: Option<TokenMetadata>,
    pub safety: Option<SafetyFlags>,
    verdict: Verdict,
    filter_reason: Option<String>,
}

impl Candidate {
    pub fn new(mint_address: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            mint_address: mint_address.into(),
            source_type,
            discovered_at: Utc::now(),
            metadata: None,
            safety: None,
            verdict: Verdict::Pending,
            filter_reason: None,
        }
    }

    /// Attach enrichment results. Rejected once a verdict has been reached.
    pub fn enrich(
        &mut self,
        metadata: Option<TokenMetadata>,
        safety: SafetyFlags,
    ) -> Result<(), CandidateError> {
        self.ensure_pending()?;
        self.metadata = metadata;
        self.safety = Some(safety);
        Ok(())
    }

    pub fn mark_passed(&mut self) -> Result<(), CandidateError> {
        self.ensure_pending()?;
        self.verdict = Verdict::Passed;
        Ok(())
    }

    pub fn mark_filtered(&mut self, reason: impl Into<String>) -> Result<(), CandidateError> {
        self.ensure_pending()?;
        self.verdict = Verdict::Filtered;
        self.filter_reason = Some(reason.into());
        Ok(())
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn filter_reason(&self) -> Option<&str> {
        self.filter_reason.as_deref()
    }

    /// Symbol if metadata was fetched
    pub fn symbol(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.symbol.as_str())
    }

    fn ensure_pending(&self) -> Result<(), CandidateError> {
        if self.verdict.is_terminal() {
            return Err(CandidateError::AlreadyDecided {
                mint: self.mint_address.clone(),
                verdict: self.verdict,
            });
        }
        Ok(())
    }
}
