//! Channel trait for messaging adapters.

use crate::message::{ChannelMessage, OutgoingMessage};
use async_trait::async_trait;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Channel error type.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Channel not ready")]
    NotReady,
}

/// Channel adapter trait.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name.
    fn name(&self) -> &'static str;

    /// Connect and verify credentials.
    async fn init(&mut self) -> ChannelResult<()>;

    /// Send a text message. Returns the channel's ID for the last part sent.
    async fn send(&self, message: OutgoingMessage) -> ChannelResult<String>;

    /// Show a "typing" indicator in a chat. Channels without one do nothing.
    async fn send_typing(&self, _channel_id: &str) -> ChannelResult<()> {
        Ok(())
    }

    /// Receive messages until the channel fails, calling `callback` for each.
    async fn listen<F>(&self, callback: F) -> ChannelResult<()>
    where
        F: Fn(ChannelMessage) + Send + Sync + 'static;

    /// Check if the channel is healthy.
    async fn health_check(&self) -> ChannelResult<()>;

    /// Shutdown the channel gracefully.
    async fn shutdown(&self) -> ChannelResult<()>;
}
