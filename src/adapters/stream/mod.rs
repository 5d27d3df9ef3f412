//! Transaction Stream Adapter
//!
//! Persistent connection to a real-time transaction feed:
//! - Subscribes to raw transactions and the well-known token/pool programs
//! - Answers `{"type":"ping"}` with `{"type":"pong"}`
//! - Reconnects with 1.5x exponential backoff, giving up after a fixed budget
//!
//! The transport is pluggable through [`StreamConnector`](crate::ports::stream::StreamConnector);
//! [`WebSocketConnector`] is the production implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use token_sniper::adapters::stream::{StreamManagerBuilder, WebSocketConnector};
//!
//! let manager = StreamManagerBuilder::new()
//!     .ws_url("wss://stream.example/")
//!     .build(Arc::new(WebSocketConnector::new()), handler);
//! manager.run().await?;
//! ```

mod manager;
mod types;
mod websocket;

pub use manager::{
    backoff_delay, ConnectionState, StreamConnectionManager, StreamHandler, StreamManagerBuilder,
    StreamManagerConfig, BACKOFF_MULTIPLIER, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_BASE_DELAY_MS, DEFAULT_WS_URL, MAX_MESSAGE_SIZE,
};
pub use types::{InboundEnvelope, InboundMessage, SubscribeMessage, PONG_MESSAGE};
pub use websocket::WebSocketConnector;
