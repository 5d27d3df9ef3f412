//! Token API Wire Types
//!
//! Response bodies of the upstream token data API. Providers are loose about
//! numeric fields, so numbers may arrive as JSON numbers, numeric strings or
//! `null`; all of these are accepted and missing values become 0. A string
//! that is not a number makes the whole body malformed.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::domain::candidate::{SafetyFlags, TokenMetadata};

/// `{ "result": ... }` wrapper used by every endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ResultEnvelope<T> {
    pub result: Option<T>,
}

/// Body of `GET /token/{mint}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenInfoPayload {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub decimals: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub liquidity: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub volume: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub price: f64,
}

impl TokenInfoPayload {
    pub fn into_metadata(self) -> TokenMetadata {
        TokenMetadata {
            symbol: self.symbol.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            decimals: self.decimals.clamp(0.0, u8::MAX as f64) as u8,
            liquidity_usd: self.liquidity,
            volume_24h_usd: self.volume,
            price_usd: self.price,
        }
    }
}

/// Body of `GET /token/verify`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayload {
    #[serde(default)]
    pub is_lp_burned: bool,
    #[serde(default)]
    pub is_mint_authority_revoked: bool,
}

impl From<VerifyPayload> for SafetyFlags {
    fn from(payload: VerifyPayload) -> Self {
        SafetyFlags {
            is_lp_burned: payload.is_lp_burned,
            is_mint_authority_revoked: payload.is_mint_authority_revoked,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Number, numeric string or null; other strings are rejected
fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    match value {
        Some(NumberOrString::Number(n)) if n.is_finite() => Ok(n),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| D::Error::custom(format!("expected a numeric string, got {s:?}"))),
        _ => Ok(0.0),
    }
}
