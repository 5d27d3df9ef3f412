use async_trait::async_trait;
use thiserror::Error;

/// Persistent stream transport error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Max reconnect attempts ({0}) exceeded")]
    MaxReconnectsExceeded(u32),
}

/// An open, bidirectional text stream
#[async_trait]
pub trait StreamSession: Send {
    /// Send a text frame
    async fn send_text(&mut self, text: String) -> Result<(), StreamError>;

    /// Next inbound text frame; `None` once the peer closed the stream
    async fn next_text(&mut self) -> Option<Result<String, StreamError>>;

    /// Close the stream
    async fn close(&mut self) -> Result<(), StreamError>;
}

/// Factory for stream sessions
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn StreamSession>, StreamError>;
}
