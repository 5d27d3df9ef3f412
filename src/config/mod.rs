//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, ApiSection, AppConfig, ConfigError, LoggingSection, StreamSection,
    API_KEY_ENV, API_URL_ENV, WS_URL_ENV,
};
