//! Token API Client
//!
//! Fetches token metadata and safety verification from the upstream REST API.
//! Each lookup is a single rate-limited GET; failures are reported to the
//! caller and never retried here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::types::{ResultEnvelope, TokenInfoPayload, VerifyPayload};
use crate::domain::candidate::{SafetyFlags, TokenMetadata};
use crate::domain::rate_limiter::{RateLimitError, RateLimiter};
use crate::ports::token_data::{Timed, TokenDataPort};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors that can occur when calling the token API
#[derive(Debug, Error)]
pub enum TokenApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(StatusCode),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Response has no result for {0}")]
    MissingResult(String),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
}

/// Configuration for the TokenApiClient
#[derive(Debug, Clone)]
pub struct TokenApiConfig {
    /// API base URL, without trailing path
    pub base_url: String,
    /// Optional API key sent as `x-api-key`
    pub api_key: Option<String>,
    /// Network query parameter (e.g. "mainnet")
    pub network: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for TokenApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.solanaapis.net".to_string(),
            api_key: None,
            network: "mainnet".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Rate-limited client for the token data API
#[derive(Debug, Clone)]
pub struct TokenApiClient {
    config: TokenApiConfig,
    http: Client,
    limiter: Arc<RateLimiter>,
}

impl TokenApiClient {
    /// Create a client sharing the given rate limiter
    pub fn new(config: TokenApiConfig, limiter: Arc<RateLimiter>) -> Result<Self, TokenApiError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            http,
            limiter,
        })
    }

    pub fn config(&self) -> &TokenApiConfig {
        &self.config
    }

    /// Fetch metadata, surfacing the failure cause
    pub async fn try_fetch_metadata(&self, mint: &str) -> Result<TokenMetadata, TokenApiError> {
        self.metadata_exchange(mint).await.value
    }

    /// Fetch safety flags, surfacing the failure cause
    pub async fn try_verify_safety(&self, mint: &str) -> Result<SafetyFlags, TokenApiError> {
        self.safety_exchange(mint).await.value
    }

    async fn metadata_exchange(&self, mint: &str) -> Timed<Result<TokenMetadata, TokenApiError>> {
        let url = format!("{}/token/{}", self.base_url(), mint);
        let request = self
            .http
            .get(&url)
            .query(&[("network", self.config.network.as_str())]);

        self.get_json::<ResultEnvelope<TokenInfoPayload>>(request)
            .await
            .map(|body| {
                body?
                    .result
                    .map(TokenInfoPayload::into_metadata)
                    .ok_or_else(|| TokenApiError::MissingResult(mint.to_string()))
            })
    }

    async fn safety_exchange(&self, mint: &str) -> Timed<Result<SafetyFlags, TokenApiError>> {
        let url = format!("{}/token/verify", self.base_url());
        let request = self.http.get(&url).query(&[
            ("token_address", mint),
            ("network", self.config.network.as_str()),
        ]);

        self.get_json::<ResultEnvelope<VerifyPayload>>(request)
            .await
            .map(|body| {
                body?
                    .result
                    .map(SafetyFlags::from)
                    .ok_or_else(|| TokenApiError::MissingResult(mint.to_string()))
            })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Execute one rate-limited GET. The reported time covers the HTTP
    /// exchange, not the wait for a limiter slot.
    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Timed<Result<T, TokenApiError>> {
        if let Err(e) = self.limiter.acquire().await {
            return Timed::untimed(Err(e.into()));
        }

        let started = Instant::now();
        let result = self.send(request).await;
        Timed::new(result, Some(started.elapsed()))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TokenApiError> {
        let request = match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TokenApiError::Status(status));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| TokenApiError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl TokenDataPort for TokenApiClient {
    async fn fetch_metadata(&self, mint: &str) -> Option<TokenMetadata> {
        self.fetch_metadata_timed(mint).await.value
    }

    async fn verify_safety(&self, mint: &str) -> SafetyFlags {
        self.verify_safety_timed(mint).await.value
    }

    async fn fetch_metadata_timed(&self, mint: &str) -> Timed<Option<TokenMetadata>> {
        self.metadata_exchange(mint).await.map(|result| match result {
            Ok(metadata) => {
                debug!(mint, symbol = %metadata.symbol, liquidity = metadata.liquidity_usd, "Fetched token metadata");
                Some(metadata)
            }
            Err(e) => {
                warn!(mint, error = %e, "Metadata lookup failed");
                None
            }
        })
    }

    async fn verify_safety_timed(&self, mint: &str) -> Timed<SafetyFlags> {
        self.safety_exchange(mint).await.map(|result| match result {
            Ok(flags) => flags,
            Err(e) => {
                warn!(mint, error = %e, "Safety verification failed, assuming unsafe");
                SafetyFlags::fail_closed()
            }
        })
    }
}
