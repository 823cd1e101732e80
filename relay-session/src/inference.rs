//! Inference client for the user-bound generation endpoint.
//!
//! Every call ends in a [`GenerateOutcome`]; nothing here returns an error,
//! because the caller always needs something to reply with.

use crate::endpoint::Endpoint;
use crate::persona::Replies;
use async_trait::async_trait;
use relay_common::config::InferenceConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

// ============================================================================
// Outcome
// ============================================================================

/// Classified result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Non-empty generated text.
    Success(String),
    /// The request did not complete within the deadline.
    Timeout,
    /// Endpoint unreachable: refused, DNS failure, tunnel down.
    ConnectionFailure,
    /// The endpoint answered with a non-success status.
    ServerError(u16),
    /// Success status but no usable `response` text.
    EmptyReply,
    /// Anything else. Carries a diagnostic for the operator log.
    Unknown(String),
}

impl GenerateOutcome {
    /// Short name for log fields.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Timeout => "timeout",
            Self::ConnectionFailure => "connection_failure",
            Self::ServerError(_) => "server_error",
            Self::EmptyReply => "empty_reply",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Map the outcome to the text the user sees.
    pub fn into_reply(self, replies: &Replies) -> String {
        match self {
            Self::Success(text) => text,
            Self::Timeout => replies.timeout.clone(),
            Self::ConnectionFailure => replies.connection_failure.clone(),
            Self::ServerError(_) => replies.server_error.clone(),
            Self::EmptyReply => replies.empty_reply.clone(),
            Self::Unknown(_) => replies.unknown_failure.clone(),
        }
    }

    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ConnectionFailure
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

// ============================================================================
// Generate Trait
// ============================================================================

/// Something that can turn a prompt into an outcome at an endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, endpoint: &Endpoint, prompt: &str) -> GenerateOutcome;
}

// ============================================================================
// Inference Client
// ============================================================================

/// Request parameters for every generation call.
#[derive(Debug, Clone)]
pub struct InferenceOptions {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub timeout: Duration,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self::from(&InferenceConfig::default())
    }
}

impl From<&InferenceConfig> for InferenceOptions {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            timeout: config.timeout(),
        }
    }
}

/// HTTP client for the `/api/generate` endpoint.
pub struct InferenceClient {
    client: reqwest::Client,
    options: InferenceOptions,
}

impl InferenceClient {
    /// Create a new client.
    pub fn new(options: InferenceOptions) -> Self {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, options }
    }

    /// Set the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }

    async fn call(&self, url: &str, prompt: &str) -> GenerateOutcome {
        let request = GenerateRequest {
            model: &self.options.model,
            prompt,
            stream: false,
            options: SamplingOptions {
                temperature: self.options.temperature,
                top_p: self.options.top_p,
            },
        };

        let response = match self
            .client
            .post(url)
            .json(&request)
            .timeout(self.options.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return GenerateOutcome::from_reqwest(&e),
        };

        let status = response.status();
        if !status.is_success() {
            return GenerateOutcome::ServerError(status.as_u16());
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return GenerateOutcome::from_reqwest(&e),
        };

        match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(GenerateResponse {
                response: Some(text),
            }) if !text.trim().is_empty() => GenerateOutcome::Success(text),
            Ok(_) => GenerateOutcome::EmptyReply,
            Err(e) => GenerateOutcome::Unknown(format!("undecodable response body: {e}")),
        }
    }
}

#[async_trait]
impl Generate for InferenceClient {
    async fn generate(&self, endpoint: &Endpoint, prompt: &str) -> GenerateOutcome {
        let start = Instant::now();

        tracing::debug!(
            endpoint = %endpoint.generate_url(),
            model = %self.options.model,
            prompt_chars = prompt.len(),
            "Calling inference endpoint"
        );

        let outcome = self.call(endpoint.generate_url(), prompt).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            GenerateOutcome::Success(text) => tracing::info!(
                endpoint = %endpoint,
                elapsed_ms,
                reply_chars = text.len(),
                "Inference reply received"
            ),
            GenerateOutcome::Unknown(detail) => tracing::error!(
                endpoint = %endpoint,
                elapsed_ms,
                error = %detail,
                "Error calling inference endpoint"
            ),
            GenerateOutcome::ServerError(status) => tracing::info!(
                endpoint = %endpoint,
                elapsed_ms,
                status,
                "Inference endpoint returned an error status"
            ),
            other => tracing::info!(
                endpoint = %endpoint,
                elapsed_ms,
                outcome = other.kind(),
                "Inference call did not produce a reply"
            ),
        }

        outcome
    }
}
