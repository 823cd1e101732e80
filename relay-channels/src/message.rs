//! Message types for channel communication.

use relay_common::logging::generate_trace_id;
use std::time::{SystemTime, UNIX_EPOCH};

/// An inbound text message, normalised across channels.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    /// Message ID (channel-specific)
    pub id: String,
    /// Where replies go (chat ID)
    pub channel_id: String,
    /// Stable user identity; sessions are keyed on this
    pub user_id: String,
    /// Display handle, when the channel provides one
    pub username: Option<String>,
    pub text: String,
    /// Timestamp (Unix millis)
    pub timestamp: i64,
    /// Correlates log lines for one message
    pub trace_id: String,
}

impl ChannelMessage {
    /// Build a message stamped with a fresh ID, the current time and a trace ID.
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            username: None,
            text: text.into(),
            timestamp: now_millis(),
            trace_id: generate_trace_id(),
        }
    }
}

/// An outbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub channel_id: String,
    /// Inbound message ID this answers, if any
    pub reply_to: Option<String>,
    pub text: String,
}

impl OutgoingMessage {
    /// Reply to an inbound message in the same chat.
    pub fn reply(to: &ChannelMessage, text: impl Into<String>) -> Self {
        Self {
            channel_id: to.channel_id.clone(),
            reply_to: Some(to.id.clone()),
            text: text.into(),
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
