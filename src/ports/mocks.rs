//! Recording test doubles for the ports.
//!
//! Used by unit tests across the crate and by the integration suite.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::domain::candidate::{Candidate, SafetyFlags, TokenMetadata};
use crate::ports::observer::{SniperEvent, SniperObserver};
use crate::ports::stream::{StreamConnector, StreamError, StreamSession};
use crate::ports::token_data::TokenDataPort;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Token data
// =============================================================================

/// Token data port with per-mint responses and call recording
#[derive(Debug, Default)]
pub struct MockTokenData {
    metadata: Mutex<HashMap<String, TokenMetadata>>,
    safety: Mutex<HashMap<String, SafetyFlags>>,
    default_metadata: Mutex<Option<TokenMetadata>>,
    default_safety: Mutex<SafetyFlags>,
    delay: Mutex<Duration>,
    metadata_calls: Mutex<Vec<String>>,
    safety_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTokenData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata returned for a specific mint
    pub fn with_metadata(self, mint: &str, metadata: TokenMetadata) -> Self {
        lock(&self.metadata).insert(mint.to_string(), metadata);
        self
    }

    /// Safety flags returned for a specific mint
    pub fn with_safety(self, mint: &str, flags: SafetyFlags) -> Self {
        lock(&self.safety).insert(mint.to_string(), flags);
        self
    }

    /// Metadata returned for mints without a specific response
    pub fn with_default_metadata(self, metadata: TokenMetadata) -> Self {
        *lock(&self.default_metadata) = Some(metadata);
        self
    }

    /// Safety flags returned for mints without a specific response
    pub fn with_default_safety(self, flags: SafetyFlags) -> Self {
        *lock(&self.default_safety) = flags;
        self
    }

    /// Simulated latency of every call
    pub fn with_delay(self, delay: Duration) -> Self {
        *lock(&self.delay) = delay;
        self
    }

    pub fn metadata_calls(&self) -> Vec<String> {
        lock(&self.metadata_calls).clone()
    }

    pub fn safety_calls(&self) -> Vec<String> {
        lock(&self.safety_calls).clone()
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *lock(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenDataPort for MockTokenData {
    async fn fetch_metadata(&self, mint: &str) -> Option<TokenMetadata> {
        lock(&self.metadata_calls).push(mint.to_string());
        self.simulate_call().await;

        let specific = lock(&self.metadata).get(mint).cloned();
        specific.or_else(|| lock(&self.default_metadata).clone())
    }

    async fn verify_safety(&self, mint: &str) -> SafetyFlags {
        lock(&self.safety_calls).push(mint.to_string());
        self.simulate_call().await;

        let specific = lock(&self.safety).get(mint).copied();
        specific.unwrap_or_else(|| *lock(&self.default_safety))
    }
}

// =============================================================================
// Stream transport
// =============================================================================

/// One scripted inbound frame
#[derive(Debug, Clone)]
pub enum ScriptedFrame {
    Text(String),
    Error(String),
}

/// What a scripted session does once its frames are exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closes the stream
    Close,
    /// Stream stays open and silent
    Hold,
}

/// Inbound frames of one scripted session
#[derive(Debug, Clone)]
pub struct SessionScript {
    frames: VecDeque<ScriptedFrame>,
    end: SessionEnd,
}

impl SessionScript {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            end: SessionEnd::Close,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.frames.push_back(ScriptedFrame::Text(text.into()));
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.frames.push_back(ScriptedFrame::Error(message.into()));
        self
    }

    pub fn hold_open(mut self) -> Self {
        self.end = SessionEnd::Hold;
        self
    }
}

impl Default for SessionScript {
    fn default() -> Self {
        Self::new()
    }
}

enum ConnectOutcome {
    Fail(String),
    Scripted(SessionScript),
    Channel(mpsc::UnboundedReceiver<String>),
}

/// Connector replaying scripted outcomes, one per `connect` call.
///
/// Once the script is exhausted every further `connect` fails.
#[derive(Default)]
pub struct ScriptedConnector {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    attempts: Mutex<Vec<Instant>>,
    urls: Mutex<Vec<String>>,
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next connect attempt fails
    pub fn fail(self, message: impl Into<String>) -> Self {
        lock(&self.outcomes).push_back(ConnectOutcome::Fail(message.into()));
        self
    }

    /// Next connect attempt opens a scripted session
    pub fn session(self, script: SessionScript) -> Self {
        lock(&self.outcomes).push_back(ConnectOutcome::Scripted(script));
        self
    }

    /// Next connect attempt opens a session fed by the returned sender.
    /// Dropping the sender closes the session.
    pub fn channel_session(&self) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.outcomes).push_back(ConnectOutcome::Channel(rx));
        tx
    }

    /// Number of connect calls so far
    pub fn attempts(&self) -> usize {
        lock(&self.attempts).len()
    }

    /// Instants at which connect was called
    pub fn attempt_times(&self) -> Vec<Instant> {
        lock(&self.attempts).clone()
    }

    pub fn urls(&self) -> Vec<String> {
        lock(&self.urls).clone()
    }

    /// Every frame sent on any session, in order
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Number of sessions closed locally
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn StreamSession>, StreamError> {
        lock(&self.attempts).push(Instant::now());
        lock(&self.urls).push(url.to_string());

        let outcome = lock(&self.outcomes).pop_front();
        let source = match outcome {
            Some(ConnectOutcome::Fail(message)) => {
                return Err(StreamError::ConnectionFailed(message))
            }
            None => {
                return Err(StreamError::ConnectionFailed(
                    "no scripted connection left".to_string(),
                ))
            }
            Some(ConnectOutcome::Scripted(script)) => FrameSource::Scripted(script),
            Some(ConnectOutcome::Channel(rx)) => FrameSource::Channel(rx),
        };

        Ok(Box::new(ScriptedSession {
            source,
            sent: Arc::clone(&self.sent),
            closes: Arc::clone(&self.closes),
        }))
    }
}

enum FrameSource {
    Scripted(SessionScript),
    Channel(mpsc::UnboundedReceiver<String>),
}

struct ScriptedSession {
    source: FrameSource,
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl StreamSession for ScriptedSession {
    async fn send_text(&mut self, text: String) -> Result<(), StreamError> {
        lock(&self.sent).push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, StreamError>> {
        match &mut self.source {
            FrameSource::Channel(rx) => rx.recv().await.map(Ok),
            FrameSource::Scripted(script) => match script.frames.pop_front() {
                Some(ScriptedFrame::Text(text)) => Some(Ok(text)),
                Some(ScriptedFrame::Error(message)) => {
                    Some(Err(StreamError::ReceiveFailed(message)))
                }
                None => match script.end {
                    SessionEnd::Close => None,
                    SessionEnd::Hold => std::future::pending().await,
                },
            },
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Observer recording every notification
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SniperEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SniperEvent> {
        lock(&self.events).clone()
    }

    /// Candidates reported as new tokens
    pub fn detected(&self) -> Vec<Candidate> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                SniperEvent::NewToken { candidate } => Some(candidate.clone()),
                _ => None,
            })
            .collect()
    }

    /// Candidates reported as filtered
    pub fn filtered(&self) -> Vec<Candidate> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                SniperEvent::Filtered { candidate } => Some(candidate.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                SniperEvent::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count_connected(&self) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| matches!(e, SniperEvent::Connected))
            .count()
    }

    pub fn count_disconnected(&self) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| matches!(e, SniperEvent::Disconnected))
            .count()
    }
}

impl SniperObserver for RecordingObserver {
    fn on_new_token_detected(&self, candidate: &Candidate) {
        lock(&self.events).push(SniperEvent::NewToken {
            candidate: candidate.clone(),
        });
    }

    fn on_candidate_filtered(&self, candidate: &Candidate) {
        lock(&self.events).push(SniperEvent::Filtered {
            candidate: candidate.clone(),
        });
    }

    fn on_connected(&self) {
        lock(&self.events).push(SniperEvent::Connected);
    }

    fn on_disconnected(&self) {
        lock(&self.events).push(SniperEvent::Disconnected);
    }

    fn on_error(&self, message: &str) {
        lock(&self.events).push(SniperEvent::Error {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::SourceType;

    fn metadata(symbol: &str) -> TokenMetadata {
        TokenMetadata {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals: 9,
            liquidity_usd: 10_000.0,
            volume_24h_usd: 1_000.0,
            price_usd: 0.01,
        }
    }

    #[tokio::test]
    async fn test_mock_token_data() {
        let mock = MockTokenData::new()
            .with_metadata("MintA", metadata("AAA"))
            .with_default_safety(SafetyFlags {
                is_lp_burned: true,
                is_mint_authority_revoked: false,
            });

        assert_eq!(mock.fetch_metadata("MintA").await.unwrap().symbol, "AAA");
        assert!(mock.fetch_metadata("MintB").await.is_none());
        assert!(mock.verify_safety("MintA").await.is_lp_burned);

        assert_eq!(mock.metadata_calls(), vec!["MintA".to_string(), "MintB".to_string()]);
        assert_eq!(mock.safety_calls(), vec!["MintA".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_connector_replays_outcomes() {
        let connector = ScriptedConnector::new()
            .fail("refused")
            .session(SessionScript::new().text("hello").error("reset"));

        assert!(connector.connect("ws://a").await.is_err());

        let mut session = connector.connect("ws://a").await.unwrap();
        session.send_text("sub".to_string()).await.unwrap();
        assert_eq!(session.next_text().await, Some(Ok("hello".to_string())));
        assert!(matches!(session.next_text().await, Some(Err(StreamError::ReceiveFailed(_)))));
        assert!(session.next_text().await.is_none());

        assert!(connector.connect("ws://a").await.is_err());
        assert_eq!(connector.attempts(), 3);
        assert_eq!(connector.sent(), vec!["sub".to_string()]);
    }

    #[tokio::test]
    async fn test_channel_session() {
        let connector = ScriptedConnector::new();
        let feed = connector.channel_session();
        let mut session = connector.connect("ws://b").await.unwrap();

        feed.send("frame".to_string()).unwrap();
        assert_eq!(session.next_text().await, Some(Ok("frame".to_string())));

        drop(feed);
        assert!(session.next_text().await.is_none());
    }

    #[test]
    fn test_recording_observer() {
        let observer = RecordingObserver::new();
        observer.on_connected();
        observer.on_new_token_detected(&Candidate::new("M", SourceType::PoolCreation));
        observer.on_error("fatal");

        assert_eq!(observer.count_connected(), 1);
        assert_eq!(observer.detected().len(), 1);
        assert_eq!(observer.errors(), vec!["fatal".to_string()]);
        assert!(observer.filtered().is_empty());
    }
}
