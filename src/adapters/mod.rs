//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Token API: metadata and safety lookups over REST
//! - Stream: WebSocket transaction feed with reconnection
//! - CLI: Command-line interface definitions

pub mod token_api;
pub mod stream;
pub mod cli;

pub use token_api::{TokenApiClient, TokenApiConfig};
pub use stream::{StreamConnectionManager, WebSocketConnector};
pub use cli::CliApp;
