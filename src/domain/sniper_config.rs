//! Sniper Filter Configuration
//!
//! Thresholds applied to every enriched candidate. The live configuration is
//! owned by the controller and can be updated at runtime with a partial
//! [`SniperConfigUpdate`]; invalid updates are rejected as a whole.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Filter thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SniperConfig {
    /// Minimum pool liquidity in USD (0 disables the check)
    #[serde(default = "default_min_liquidity_threshold")]
    pub min_liquidity_threshold: f64,

    /// Minimum 24h volume in USD (0 disables the check)
    #[serde(default = "default_min_volume_threshold")]
    pub min_volume_threshold: f64,

    /// Require LP tokens to be burned
    #[serde(default = "default_require_lp_burned")]
    pub require_lp_burned: bool,

    /// Require mint authority to be revoked
    #[serde(default = "default_require_mint_revoked")]
    pub require_mint_revoked: bool,

    /// Maximum candidates allowed to pass per rolling hour
    #[serde(default = "default_max_snipes_per_hour")]
    pub max_snipes_per_hour: u32,
}

fn default_min_liquidity_threshold() -> f64 { 1_000.0 }
fn default_min_volume_threshold() -> f64 { 500.0 }
fn default_require_lp_burned() -> bool { true }
fn default_require_mint_revoked() -> bool { true }
fn default_max_snipes_per_hour() -> u32 { 10 }

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            min_liquidity_threshold: default_min_liquidity_threshold(),
            min_volume_threshold: default_min_volume_threshold(),
            require_lp_burned: default_require_lp_burned(),
            require_mint_revoked: default_require_mint_revoked(),
            max_snipes_per_hour: default_max_snipes_per_hour(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SniperConfigError {
    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl SniperConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), SniperConfigError> {
        validate_threshold("min_liquidity_threshold", self.min_liquidity_threshold)?;
        validate_threshold("min_volume_threshold", self.min_volume_threshold)?;

        if self.max_snipes_per_hour == 0 {
            return Err(SniperConfigError::InvalidValue {
                field: "max_snipes_per_hour",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Return a copy with the update applied, validated.
    pub fn merged(&self, update: &SniperConfigUpdate) -> Result<Self, SniperConfigError> {
        let mut next = self.clone();
        if let Some(v) = update.min_liquidity_threshold {
            next.min_liquidity_threshold = v;
        }
        if let Some(v) = update.min_volume_threshold {
            next.min_volume_threshold = v;
        }
        if let Some(v) = update.require_lp_burned {
            next.require_lp_burned = v;
        }
        if let Some(v) = update.require_mint_revoked {
            next.require_mint_revoked = v;
        }
        if let Some(v) = update.max_snipes_per_hour {
            next.max_snipes_per_hour = v;
        }
        next.validate()?;
        Ok(next)
    }
}

fn validate_threshold(field: &'static str, value: f64) -> Result<(), SniperConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SniperConfigError::InvalidValue {
            field,
            reason: format!("must be a finite value >= 0, got {}", value),
        });
    }
    Ok(())
}

/// Partial configuration update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SniperConfigUpdate {
    #[serde(default)]
    pub min_liquidity_threshold: Option<f64>,
    #[serde(default)]
    pub min_volume_threshold: Option<f64>,
    #[serde(default)]
    pub require_lp_burned: Option<bool>,
    #[serde(default)]
    pub require_mint_revoked: Option<bool>,
    #[serde(default)]
    pub max_snipes_per_hour: Option<u32>,
}

impl SniperConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
