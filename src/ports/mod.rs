//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Token enrichment (metadata and safety lookups)
//! - The persistent transaction stream transport
//! - Consumer notifications

pub mod token_data;
pub mod stream;
pub mod observer;
pub mod mocks;

// Re-export main traits and types
pub use token_data::{Timed, TokenDataPort};
pub use stream::{StreamConnector, StreamError, StreamSession};
pub use observer::{ChannelObserver, SniperEvent, SniperObserver};
