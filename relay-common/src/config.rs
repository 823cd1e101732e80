//! Configuration management for the relay.
//!
//! The relay keeps no files on disk, so configuration is assembled from
//! defaults and environment variables only.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Default values
//!
//! # Environment Variable Mapping
//!
//! ## Telegram
//! - `TELEGRAM_BOT_TOKEN` → telegram.bot_token (required)
//! - `RELAY_POLL_TIMEOUT_SECS` → telegram.poll_timeout_secs
//!
//! ## Inference
//! - `OLLAMA_MODEL` → inference.model
//! - `RELAY_TEMPERATURE` → inference.temperature
//! - `RELAY_TOP_P` → inference.top_p
//! - `RELAY_TIMEOUT_SECS` → inference.timeout_secs
//!
//! ## Session
//! - `RELAY_MAX_TURNS` → session.max_turns
//! - `RELAY_CONTEXT_TURNS` → session.context_turns
//!
//! ## Observability
//! - `RELAY_LOG_LEVEL` → observability.log_level
//! - `RELAY_LOG_FORMAT` → observability.log_format

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::Result;

/// Model used when `OLLAMA_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

// ============================================================================
// Telegram Configuration
// ============================================================================

/// Telegram channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API credential. The process refuses to start without it.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_poll_timeout_secs() -> u64 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

// ============================================================================
// Inference Configuration
// ============================================================================

/// Settings for calls to the user-bound generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Whole-request deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_top_p() -> f64 {
    0.9
}

fn default_timeout_secs() -> u64 {
    60
}

impl InferenceConfig {
    /// Request deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Per-user history limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turn records retained per user (default: 20)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Most recent turn records resent with each prompt (default: 6)
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

fn default_max_turns() -> usize {
    20
}

fn default_context_turns() -> usize {
    6
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            context_turns: default_context_turns(),
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the environment and validate it.
    ///
    /// Fails when the bot token is missing so the process exits before
    /// touching the network.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token.trim().to_string());
        }
        if let Some(secs) = parse_var(&lookup, "RELAY_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs = secs;
        }

        if let Some(model) = lookup("OLLAMA_MODEL") {
            let model = model.trim();
            if !model.is_empty() {
                self.inference.model = model.to_string();
            }
        }
        if let Some(t) = parse_var(&lookup, "RELAY_TEMPERATURE") {
            self.inference.temperature = t;
        }
        if let Some(p) = parse_var(&lookup, "RELAY_TOP_P") {
            self.inference.top_p = p;
        }
        if let Some(secs) = parse_var(&lookup, "RELAY_TIMEOUT_SECS") {
            self.inference.timeout_secs = secs;
        }

        if let Some(n) = parse_var(&lookup, "RELAY_MAX_TURNS") {
            self.session.max_turns = n;
        }
        if let Some(n) = parse_var(&lookup, "RELAY_CONTEXT_TURNS") {
            self.session.context_turns = n;
        }

        if let Some(level) = lookup("RELAY_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("RELAY_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// The configured bot token, if present and non-blank.
    pub fn bot_token(&self) -> Option<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}
