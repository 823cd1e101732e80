//! Telegram channel adapter.
//!
//! Long-polls the Bot API with `getUpdates` and replies in plain text.
//! Only text messages are surfaced; every other update is acknowledged and
//! dropped.

use crate::message::{ChannelMessage, OutgoingMessage};
use crate::traits::{Channel, ChannelError, ChannelResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Public Bot API host.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram's per-message size limit.
const MAX_MESSAGE_LEN: usize = 4096;

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Slack on top of the long-poll timeout for the HTTP deadline.
const POLL_GRACE: Duration = Duration::from_secs(10);

// ============================================================================
// Bot API Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the result or turn the failure into a channel error.
    ///
    /// `fail` builds the error for failures that are neither auth nor rate
    /// limiting.
    fn into_result(self, status: StatusCode, fail: fn(String) -> ChannelError) -> ChannelResult<T> {
        if self.ok {
            if let Some(result) = self.result {
                return Ok(result);
            }
        }

        let description = self
            .description
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Err(ChannelError::Auth(description)),
            StatusCode::TOO_MANY_REQUESTS => Err(ChannelError::RateLimited {
                retry_after_secs: self
                    .parameters
                    .and_then(|p| p.retry_after)
                    .unwrap_or(POLL_RETRY_DELAY.as_secs()),
            }),
            _ => Err(fail(description)),
        }
    }
}

/// Error text without the request URL, which embeds the bot token.
fn redact(err: reqwest::Error) -> String {
    err.without_url().to_string()
}

/// Decode a Bot API envelope, classifying failures by HTTP status.
async fn read_response<T: DeserializeOwned>(
    resp: reqwest::Response,
    fail: fn(String) -> ChannelError,
) -> ChannelResult<T> {
    let status = resp.status();
    let data = match resp.json::<ApiResponse<T>>().await {
        Ok(data) => data,
        Err(e) => ApiResponse {
            ok: false,
            result: None,
            description: Some(format!("undecodable body: {}", redact(e))),
            parameters: None,
        },
    };
    data.into_result(status, fail)
}

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    #[serde(default)]
    date: i64,
    chat: Chat,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl Message {
    /// Convert to a channel message. `None` for anything without text.
    fn into_channel_message(self) -> Option<ChannelMessage> {
        let text = self.text?;
        let chat_id = self.chat.id.to_string();

        // Sessions follow the person; fall back to the chat for anonymous posts.
        let user_id = self
            .from
            .as_ref()
            .map_or_else(|| chat_id.clone(), |u| u.id.to_string());

        let mut msg = ChannelMessage::new(chat_id, user_id, text);
        msg.id = self.message_id.to_string();
        msg.timestamp = self.date.saturating_mul(1000);
        msg.username = self.from.and_then(|u| u.username);
        Some(msg)
    }
}

// ============================================================================
// Telegram Channel
// ============================================================================

/// Telegram channel - long-polls the Bot API for updates.
pub struct TelegramChannel {
    bot_token: String,
    api_base: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create a channel against a specific API host and poll timeout.
    pub fn with_options(bot_token: String, api_base: &str, poll_timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs) + POLL_GRACE)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            poll_timeout_secs,
            client,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// One `getUpdates` round.
    ///
    /// Returns the offset for the next poll and the text messages received.
    /// The offset moves past every update, including skipped ones.
    pub async fn fetch_updates(&self, offset: i64) -> ChannelResult<(i64, Vec<ChannelMessage>)> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message"]
        });

        let resp = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Connection(redact(e)))?;

        let updates: Vec<serde_json::Value> =
            read_response(resp, ChannelError::Connection).await?;

        let mut next_offset = offset;
        let mut messages = Vec::new();

        for raw in updates {
            if let Some(uid) = raw.get("update_id").and_then(serde_json::Value::as_i64) {
                next_offset = next_offset.max(uid + 1);
            }

            let update: Update = match serde_json::from_value(raw) {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!("Skipping undecodable Telegram update: {e}");
                    continue;
                }
            };

            let Some(message) = update.message else {
                continue;
            };

            match message.into_channel_message() {
                Some(msg) => messages.push(msg),
                None => tracing::debug!("Skipping non-text Telegram message"),
            }
        }

        Ok((next_offset, messages))
    }

    /// Send one chunk as plain text.
    async fn send_single_chunk(&self, text: &str, chat_id: &str) -> ChannelResult<i64> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(redact(e)))?;

        let sent: SentMessage = read_response(resp, ChannelError::SendFailed).await?;
        Ok(sent.message_id)
    }
}

/// Largest index `<= at` that falls on a char boundary of `s`.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    let mut i = at.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split a message into chunks that fit within Telegram's limit.
///
/// Prefers paragraph, then line, then sentence, then word boundaries. Only
/// the separator is dropped, so indentation at the start of a line survives.
fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let cut = floor_char_boundary(remaining, max_len);
        let chunk = &remaining[..cut];

        // (chunk end, separator bytes dropped before the next chunk)
        let (end, skip) = chunk
            .rfind("\n\n")
            .map(|i| (i, 2))
            .or_else(|| chunk.rfind('\n').map(|i| (i, 1)))
            .or_else(|| chunk.rfind(". ").map(|i| (i + 1, 1)))
            .or_else(|| chunk.rfind(' ').map(|i| (i, 1)))
            .filter(|&(end, _)| end > 0)
            .unwrap_or((cut, 0));

        chunks.push(remaining[..end].to_string());
        remaining = &remaining[end + skip..];
    }

    chunks
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn init(&mut self) -> ChannelResult<()> {
        // Verify bot token by calling getMe
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::Connection(redact(e)))?;

        let me: User = read_response(resp, ChannelError::Auth)
            .await
            .map_err(|e| match e {
                ChannelError::Auth(msg) => ChannelError::Auth(format!("Invalid bot token: {msg}")),
                other => other,
            })?;

        tracing::info!(
            bot_id = me.id,
            bot_username = me.username.as_deref().unwrap_or("unknown"),
            "Telegram channel initialized"
        );
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> ChannelResult<String> {
        if message.text.trim().is_empty() {
            return Err(ChannelError::InvalidMessage("empty text".into()));
        }

        let chunks = split_message(&message.text, MAX_MESSAGE_LEN);
        let parts = chunks.len();
        let mut last_id = 0;
        for chunk in chunks {
            last_id = self.send_single_chunk(&chunk, &message.channel_id).await?;
        }

        tracing::debug!(
            chat_id = %message.channel_id,
            reply_to = ?message.reply_to,
            parts,
            "Telegram message sent"
        );
        Ok(last_id.to_string())
    }

    async fn send_typing(&self, channel_id: &str) -> ChannelResult<()> {
        let body = serde_json::json!({
            "chat_id": channel_id,
            "action": "typing"
        });

        let resp = self
            .client
            .post(self.api_url("sendChatAction"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(redact(e)))?;

        read_response::<bool>(resp, ChannelError::SendFailed).await?;
        Ok(())
    }

    async fn listen<F>(&self, callback: F) -> ChannelResult<()>
    where
        F: Fn(ChannelMessage) + Send + Sync + 'static,
    {
        let mut offset: i64 = 0;

        tracing::info!("Telegram channel listening for messages...");

        loop {
            match self.fetch_updates(offset).await {
                Ok((next_offset, messages)) => {
                    offset = next_offset;
                    for msg in messages {
                        tracing::info!(
                            trace_id = %msg.trace_id,
                            user_id = %msg.user_id,
                            chat_id = %msg.channel_id,
                            "Telegram message received"
                        );
                        callback(msg);
                    }
                }
                Err(ChannelError::RateLimited { retry_after_secs }) => {
                    tracing::warn!(retry_after_secs, "Telegram poll rate limited");
                    tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                }
                Err(e) => {
                    tracing::warn!("Telegram poll error: {e}");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn health_check(&self) -> ChannelResult<()> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::Connection(redact(e)))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::NotReady)
        }
    }

    async fn shutdown(&self) -> ChannelResult<()> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}
