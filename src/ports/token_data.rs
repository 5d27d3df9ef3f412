use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::candidate::{SafetyFlags, TokenMetadata};

/// A lookup result together with the time spent talking to the upstream.
///
/// `exchange_time` is `None` when no request went out, for example when the
/// rate limiter gave up before a slot freed.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub exchange_time: Option<Duration>,
}

impl<T> Timed<T> {
    pub fn new(value: T, exchange_time: Option<Duration>) -> Self {
        Self { value, exchange_time }
    }

    pub fn untimed(value: T) -> Self {
        Self::new(value, None)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timed<U> {
        Timed::new(f(self.value), self.exchange_time)
    }
}

/// Token enrichment port
///
/// Both calls are fail-soft: implementations log upstream failures and
/// return `None` for metadata and fail-closed flags for safety, so a single
/// bad lookup never interrupts the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenDataPort: Send + Sync {
    /// Market metadata (symbol, liquidity, volume, price) for a mint
    async fn fetch_metadata(&self, mint: &str) -> Option<TokenMetadata>;

    /// LP-burn and mint-authority status for a mint
    async fn verify_safety(&self, mint: &str) -> SafetyFlags;

    /// `fetch_metadata` plus the upstream exchange time.
    ///
    /// The default times the whole call; adapters that queue before the
    /// request should report the exchange alone.
    async fn fetch_metadata_timed(&self, mint: &str) -> Timed<Option<TokenMetadata>> {
        let started = Instant::now();
        let value = self.fetch_metadata(mint).await;
        Timed::new(value, Some(started.elapsed()))
    }

    /// `verify_safety` plus the upstream exchange time
    async fn verify_safety_timed(&self, mint: &str) -> Timed<SafetyFlags> {
        let started = Instant::now();
        let value = self.verify_safety(mint).await;
        Timed::new(value, Some(started.elapsed()))
    }
}
