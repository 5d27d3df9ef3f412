//! Token API Adapter
//!
//! Enrichment and safety verification against the upstream token data API:
//! - `GET /token/{mint}?network=...` for symbol, liquidity, volume and price
//! - `GET /token/verify?token_address=...&network=...` for LP-burn and
//!   mint-authority status
//!
//! Calls share one [`RateLimiter`](crate::domain::rate_limiter::RateLimiter).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use token_sniper::adapters::token_api::{TokenApiClient, TokenApiConfig};
//! use token_sniper::domain::RateLimiter;
//!
//! let client = TokenApiClient::new(TokenApiConfig::default(), Arc::new(RateLimiter::default()))?;
//! let metadata = client.try_fetch_metadata("SomeMintAddress").await?;
//! println!("Liquidity: ${:.2}", metadata.liquidity_usd);
//! ```

mod client;
mod types;

pub use client::{TokenApiClient, TokenApiConfig, TokenApiError, API_KEY_HEADER};
pub use types::{ResultEnvelope, TokenInfoPayload, VerifyPayload};
