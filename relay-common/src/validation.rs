//! Configuration validation for the relay.
//!
//! Provides validation logic for configuration fields to ensure
//! all required values are present and within valid ranges.

use thiserror::Error;

use crate::config::{Config, InferenceConfig, ObservabilityConfig, SessionConfig, TelegramConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.telegram.validate() {
            errors.push(e);
        }
        if let Err(e) = self.inference.validate() {
            errors.push(e);
        }
        if let Err(e) = self.session.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for TelegramConfig {
    fn validate(&self) -> ValidationResult<()> {
        let present = self
            .bot_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !present {
            return Err(ValidationError::MissingField {
                field: "telegram.bot_token (TELEGRAM_BOT_TOKEN)".into(),
            });
        }
        if self.poll_timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "telegram.poll_timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

impl Validate for InferenceConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "inference.model".into(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "inference.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidValue {
                field: "inference.temperature".into(),
                reason: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ValidationError::InvalidValue {
                field: "inference.top_p".into(),
                reason: format!("{} is outside 0.0..=1.0", self.top_p),
            });
        }
        Ok(())
    }
}

impl Validate for SessionConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.max_turns == 0 {
            return Err(ValidationError::InvalidValue {
                field: "session.max_turns".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.context_turns > self.max_turns {
            return Err(ValidationError::Conflict {
                reason: format!(
                    "session.context_turns ({}) exceeds session.max_turns ({})",
                    self.context_turns, self.max_turns
                ),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("expected one of {LOG_LEVELS:?}"),
            });
        }
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("expected one of {LOG_FORMATS:?}"),
            });
        }
        Ok(())
    }
}
