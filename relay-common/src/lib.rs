//! Relay Common - Shared configuration, errors and logging for the relay.
//!
//! This crate provides:
//! - Configuration types, environment loading and validation
//! - The startup error type and its exit code
//! - Logging setup and trace id helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{Config, InferenceConfig, ObservabilityConfig, SessionConfig, TelegramConfig};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};

