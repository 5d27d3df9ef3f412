//! Configuration Loader
//!
//! Loads and validates the sniper configuration from a TOML file.
//! Secrets and endpoints can be overridden through the environment.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::stream::{
    StreamManagerConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_BASE_DELAY_MS,
    DEFAULT_WS_URL, MAX_MESSAGE_SIZE,
};
use crate::adapters::token_api::TokenApiConfig;
use crate::application::SniperSettings;
use crate::domain::known_programs::{default_subscription_programs, pool_rule_for};
use crate::domain::rate_limiter::{RateLimiter, DEFAULT_MAX_WAIT_ROUNDS};
use crate::domain::sniper_config::SniperConfig;

/// Overrides `api.api_key`
pub const API_KEY_ENV: &str = "SNIPER_API_KEY";
/// Overrides `stream.ws_url`
pub const WS_URL_ENV: &str = "SNIPER_WS_URL";
/// Overrides `api.base_url`
pub const API_URL_ENV: &str = "SNIPER_API_URL";

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub sniper: SniperConfig,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Streaming feed section
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSection {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Programs subscribed to on connect (defaults to the known token and pool programs)
    #[serde(default = "default_subscription_programs")]
    pub subscribe_programs: Vec<String>,
    /// Restrict pool-creation detection to these programs
    #[serde(default)]
    pub pool_programs: Option<Vec<String>>,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            network: default_network(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            max_message_size: default_max_message_size(),
            subscribe_programs: default_subscription_programs(),
            pool_programs: None,
        }
    }
}

impl StreamSection {
    /// WebSocket URL with environment override
    /// Checks SNIPER_WS_URL first, falls back to config value
    pub fn get_ws_url(&self) -> String {
        env_override(WS_URL_ENV, &self.ws_url)
    }
}

/// Token data API section
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upstream calls allowed per rolling minute
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: usize,
    /// Windows a call may wait, queueing included, before giving up on the rate limiter
    #[serde(default = "default_max_wait_rounds")]
    pub max_wait_rounds: u32,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            api_key: None,
            network: default_network(),
            timeout_secs: default_timeout_secs(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            max_wait_rounds: default_max_wait_rounds(),
        }
    }
}

impl ApiSection {
    /// Base URL with environment override
    pub fn get_base_url(&self) -> String {
        env_override(API_URL_ENV, &self.base_url)
    }

    /// API key with environment override
    /// Checks SNIPER_API_KEY first, falls back to config value
    pub fn get_api_key(&self) -> Option<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}
fn default_api_url() -> String {
    TokenApiConfig::default().base_url
}
fn default_network() -> String {
    "mainnet".to_string()
}
fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}
fn default_reconnect_base_delay_ms() -> u64 {
    DEFAULT_RECONNECT_BASE_DELAY_MS
}
fn default_max_message_size() -> usize {
    MAX_MESSAGE_SIZE
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_rate_limit_per_minute() -> usize {
    60
}
fn default_max_wait_rounds() -> u32 {
    DEFAULT_MAX_WAIT_ROUNDS
}
fn default_log_level() -> String {
    "info".to_string()
}

fn env_override(var: &str, fallback: &str) -> String {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => fallback.to_string(),
    }
}

fn resolve_api_key(env_value: Option<String>, file_value: Option<&str>) -> Option<String> {
    env_value
        .filter(|key| !key.trim().is_empty())
        .or_else(|| file_value.filter(|key| !key.trim().is_empty()).map(str::to_string))
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ws_url = self.stream.get_ws_url();
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "stream.ws_url must be a ws:// or wss:// URL, got '{}'",
                ws_url
            )));
        }

        if self.stream.max_message_size == 0 {
            return Err(ConfigError::ValidationError(
                "stream.max_message_size must be > 0".to_string(),
            ));
        }

        if self.stream.reconnect_base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "stream.reconnect_base_delay_ms must be > 0".to_string(),
            ));
        }

        if let Some(programs) = &self.stream.pool_programs {
            if !programs.is_empty() && programs.iter().all(|p| pool_rule_for(p).is_none()) {
                return Err(ConfigError::ValidationError(format!(
                    "stream.pool_programs contains no known liquidity program: {:?}",
                    programs
                )));
            }
        }

        let base_url = self.api.get_base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs must be > 0".to_string(),
            ));
        }

        if self.api.rate_limit_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "api.rate_limit_per_minute must be > 0".to_string(),
            ));
        }

        self.sniper
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }

    /// Controller settings, environment overrides applied
    pub fn sniper_settings(&self) -> SniperSettings {
        SniperSettings {
            stream: StreamManagerConfig {
                ws_url: self.stream.get_ws_url(),
                network: self.stream.network.clone(),
                max_reconnect_attempts: self.stream.max_reconnect_attempts,
                reconnect_base_delay_ms: self.stream.reconnect_base_delay_ms,
                max_message_size: self.stream.max_message_size,
                subscribe_programs: self.stream.subscribe_programs.clone(),
            },
            sniper: self.sniper.clone(),
            pool_programs: self.stream.pool_programs.clone(),
        }
    }

    /// Token API client config, environment overrides applied
    pub fn token_api_config(&self) -> TokenApiConfig {
        TokenApiConfig {
            base_url: self.api.get_base_url(),
            api_key: self.api.get_api_key(),
            network: self.api.network.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    /// Rate limiter shared by all upstream calls
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::with_max_wait_rounds(
            self.api.rate_limit_per_minute,
            RATE_LIMIT_WINDOW,
            self.api.max_wait_rounds,
        )
    }
}
