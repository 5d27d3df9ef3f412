//! Stream Connection Manager
//!
//! Owns the persistent connection to the transaction feed: connects,
//! (re)subscribes, dispatches inbound frames in arrival order, answers
//! keepalive pings and reconnects with exponential backoff.
//!
//! Reconnect policy: after a failed connect or a dropped connection the
//! attempt counter is incremented and the next attempt waits
//! `base_delay * 1.5^(attempt - 1)`. Once the counter exceeds
//! `max_reconnect_attempts` the manager stops for good and reports a single
//! fatal error. A successful connect resets the counter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::types::{InboundEnvelope, InboundMessage, SubscribeMessage, PONG_MESSAGE};
use crate::domain::known_programs::default_subscription_programs;
use crate::ports::stream::{StreamConnector, StreamError, StreamSession};

/// Default streaming endpoint
pub const DEFAULT_WS_URL: &str = "wss://api.solanastreaming.com/";
/// Reconnects allowed before the manager gives up
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// Delay before the first reconnect
pub const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 1000;
/// Growth factor between consecutive reconnect delays
pub const BACKOFF_MULTIPLIER: f64 = 1.5;
/// Maximum inbound frame size in bytes
pub const MAX_MESSAGE_SIZE: usize = 1_048_576; // 1 MB

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Reconnect budget exhausted
    Stopped,
}

/// Receiver of stream events. Calls are made from the connection task, one
/// at a time, in arrival order.
pub trait StreamHandler: Send + Sync {
    /// Base64 transaction payload
    fn on_transaction(&self, payload: &str);

    fn on_connected(&self);

    /// An established connection was lost
    fn on_disconnected(&self);

    /// Reconnect budget exhausted
    fn on_fatal(&self, error: &StreamError);
}

/// Configuration for StreamConnectionManager
#[derive(Debug, Clone)]
pub struct StreamManagerConfig {
    /// WebSocket URL
    pub ws_url: String,
    /// Network name sent with subscriptions
    pub network: String,
    /// Maximum reconnection attempts
    pub max_reconnect_attempts: u32,
    /// First reconnect delay in milliseconds
    pub reconnect_base_delay_ms: u64,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Program ids subscribed to on connect
    pub subscribe_programs: Vec<String>,
}

impl Default for StreamManagerConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            network: "mainnet".to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_base_delay_ms: DEFAULT_RECONNECT_BASE_DELAY_MS,
            max_message_size: MAX_MESSAGE_SIZE,
            subscribe_programs: default_subscription_programs(),
        }
    }
}

/// Delay before reconnect number `attempt` (1-based)
pub fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let millis = base_delay_ms as f64 * BACKOFF_MULTIPLIER.powi(exponent);
    Duration::from_millis(millis.round() as u64)
}

/// How a session ended
enum SessionOutcome {
    Shutdown,
    Lost { established: bool, error: StreamError },
}

/// Persistent transaction feed connection
pub struct StreamConnectionManager {
    config: StreamManagerConfig,
    connector: Arc<dyn StreamConnector>,
    handler: Arc<dyn StreamHandler>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    reconnect_attempts: AtomicU32,
}

impl StreamConnectionManager {
    pub fn new(
        config: StreamManagerConfig,
        connector: Arc<dyn StreamConnector>,
        handler: Arc<dyn StreamHandler>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            connector,
            handler,
            state_tx,
            shutdown_tx,
            reconnect_attempts: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &StreamManagerConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Consecutive failed attempts since the last successful connect
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Close the connection and suppress reconnection
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Run until `stop()` is called or the reconnect budget is exhausted
    pub async fn run(&self) -> Result<(), StreamError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut attempt = 0u32;

        info!(url = %self.config.ws_url, "Stream manager starting");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            match self.connect_and_process(&mut shutdown_rx, &mut attempt).await {
                SessionOutcome::Shutdown => break,
                SessionOutcome::Lost { established, error } => {
                    if established {
                        warn!(error = %error, "Stream connection lost");
                        self.handler.on_disconnected();
                    } else {
                        warn!(error = %error, "Stream connection failed");
                    }
                }
            }

            if *shutdown_rx.borrow() {
                break;
            }

            attempt += 1;
            self.reconnect_attempts.store(attempt, Ordering::SeqCst);

            if attempt > self.config.max_reconnect_attempts {
                let fatal = StreamError::MaxReconnectsExceeded(self.config.max_reconnect_attempts);
                error!(error = %fatal, "Giving up on stream connection");
                self.set_state(ConnectionState::Stopped);
                self.handler.on_fatal(&fatal);
                return Err(fatal);
            }

            self.set_state(ConnectionState::Reconnecting);
            let delay = backoff_delay(self.config.reconnect_base_delay_ms, attempt);
            warn!(
                delay_ms = delay.as_millis() as u64,
                attempt,
                max = self.config.max_reconnect_attempts,
                "Reconnecting"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stopped(&mut shutdown_rx) => break,
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("Stream manager stopped");
        Ok(())
    }

    /// Connect, subscribe and pump frames until the session ends
    async fn connect_and_process(
        &self,
        shutdown_rx: &mut watch::Receiver<bool>,
        attempt: &mut u32,
    ) -> SessionOutcome {
        if self.state() != ConnectionState::Reconnecting {
            self.set_state(ConnectionState::Connecting);
        }

        let connected = tokio::select! {
            result = self.connector.connect(&self.config.ws_url) => result,
            _ = stopped(shutdown_rx) => return SessionOutcome::Shutdown,
        };

        let mut session = match connected {
            Ok(session) => session,
            Err(error) => {
                return SessionOutcome::Lost {
                    established: false,
                    error,
                }
            }
        };

        self.set_state(ConnectionState::Connected);
        *attempt = 0;
        self.reconnect_attempts.store(0, Ordering::SeqCst);
        info!(url = %self.config.ws_url, "Stream connected");

        if let Err(error) = self.send_subscriptions(session.as_mut()).await {
            let _ = session.close().await;
            return SessionOutcome::Lost {
                established: false,
                error,
            };
        }
        self.handler.on_connected();

        loop {
            let frame = tokio::select! {
                frame = session.next_text() => frame,
                _ = stopped(shutdown_rx) => {
                    if let Err(e) = session.close().await {
                        debug!(error = %e, "Close on shutdown failed");
                    }
                    return SessionOutcome::Shutdown;
                }
            };

            let result = match frame {
                Some(Ok(text)) => self.process_message(session.as_mut(), &text).await,
                Some(Err(error)) => Err(error),
                None => Err(StreamError::Closed),
            };

            if let Err(error) = result {
                return SessionOutcome::Lost {
                    established: true,
                    error,
                };
            }
        }
    }

    async fn send_subscriptions(&self, session: &mut dyn StreamSession) -> Result<(), StreamError> {
        session
            .send_text(SubscribeMessage::transactions(&self.config.network).to_json())
            .await?;

        for program_id in &self.config.subscribe_programs {
            session
                .send_text(SubscribeMessage::program(program_id, &self.config.network).to_json())
                .await?;
        }

        debug!(programs = self.config.subscribe_programs.len(), "Subscriptions sent");
        Ok(())
    }

    /// Handle one inbound frame. Only transport failures are errors;
    /// malformed frames are logged and skipped.
    async fn process_message(
        &self,
        session: &mut dyn StreamSession,
        raw_message: &str,
    ) -> Result<(), StreamError> {
        if raw_message.len() > self.config.max_message_size {
            warn!(
                size = raw_message.len(),
                max = self.config.max_message_size,
                "Dropping oversized message"
            );
            return Ok(());
        }

        let trimmed = raw_message.trim();
        if trimmed.is_empty() {
            debug!("Ignoring empty message");
            return Ok(());
        }

        if !trimmed.starts_with('{') {
            warn!("Dropping message that is not a JSON object");
            return Ok(());
        }

        let envelope: InboundEnvelope = match serde_json::from_str(trimmed) {
            Ok(envelope) => envelope,
            Err(e) => {
                let preview: String = trimmed.chars().take(200).collect();
                warn!(error = %e, preview = %preview, "Failed to parse message");
                return Ok(());
            }
        };

        match InboundMessage::from(envelope) {
            InboundMessage::Ping => {
                session.send_text(PONG_MESSAGE.to_string()).await?;
            }
            InboundMessage::Transaction(payload) => {
                self.handler.on_transaction(&payload);
            }
            InboundMessage::EmptyTransaction => {
                warn!("Transaction message without payload");
            }
            InboundMessage::Other(kind) => {
                debug!(kind = %kind, "Ignoring message");
            }
        }

        Ok(())
    }
}

/// Resolves once shutdown has been requested
async fn stopped(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stopped| *stopped).await;
}

/// Builder for StreamConnectionManager configuration
#[derive(Debug, Default)]
pub struct StreamManagerBuilder {
    config: StreamManagerConfig,
}

impl StreamManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set WebSocket URL
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws_url = url.into();
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.config.network = network.into();
        self
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    pub fn reconnect_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.reconnect_base_delay_ms = delay_ms;
        self
    }

    /// Set maximum message size in bytes
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn subscribe_programs(mut self, programs: Vec<String>) -> Self {
        self.config.subscribe_programs = programs;
        self
    }

    pub fn build(
        self,
        connector: Arc<dyn StreamConnector>,
        handler: Arc<dyn StreamHandler>,
    ) -> StreamConnectionManager {
        StreamConnectionManager::new(self.config, connector, handler)
    }
}
