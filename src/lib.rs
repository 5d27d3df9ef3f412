//! Token Sniper Library
//!
//! Real-time detection of new Solana token launches: a persistent transaction
//! stream is classified for token-mint and pool-creation instructions, every
//! new mint is enriched with market and safety data, and candidates passing
//! the configured filters are reported to an observer.
//!
//! # Modules
//!
//! - `domain`: Core logic (Candidate, TransactionClassifier, FilterPipeline, RateLimiter, metrics)
//! - `ports`: Trait abstractions (TokenDataPort, StreamConnector, SniperObserver)
//! - `adapters`: External implementations (token REST API, WebSocket stream, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: SniperController lifecycle and pipeline wiring

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
