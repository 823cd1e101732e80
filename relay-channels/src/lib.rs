//! Relay Channels - Telegram front end for the persona relay.
//!
//! ```text
//! Telegram ─ getUpdates ─→ TelegramChannel ─→ Dispatcher ─→ per-user worker
//!                                                             ↓
//! Telegram ←─ sendMessage ←──────────────────── Orchestrator ← user's endpoint
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod commands;
pub mod dispatcher;
pub mod message;
pub mod telegram;
pub mod traits;

// Re-export commonly used types
pub use commands::{Command, Inbound};
pub use dispatcher::Dispatcher;
pub use message::{ChannelMessage, OutgoingMessage};
pub use telegram::TelegramChannel;
pub use traits::{Channel, ChannelError, ChannelResult};

use anyhow::Context;
use relay_common::config::Config;
use relay_session::{InferenceClient, InferenceOptions, Orchestrator, Persona};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long queued turns may keep running after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the relay until Ctrl-C.
pub async fn start_relay(config: &Config) -> anyhow::Result<()> {
    let token = config
        .bot_token()
        .context("TELEGRAM_BOT_TOKEN is not set")?
        .to_string();

    let client = InferenceClient::new(InferenceOptions::from(&config.inference));
    let orchestrator = Arc::new(Orchestrator::with_config(
        client,
        Persona::default(),
        &config.session,
    ));

    let mut telegram = TelegramChannel::with_options(
        token,
        telegram::TELEGRAM_API_BASE,
        config.telegram.poll_timeout_secs,
    );
    telegram
        .init()
        .await
        .context("Telegram initialisation failed")?;
    let channel = Arc::new(telegram);

    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(Dispatcher::new(channel.clone(), orchestrator));
    let dispatcher_handle = dispatcher.spawn(rx);

    tracing::info!(
        model = %config.inference.model,
        max_turns = config.session.max_turns,
        context_turns = config.session.context_turns,
        "Relay running, press Ctrl+C to stop"
    );

    tokio::select! {
        result = channel.listen(move |msg| {
            if tx.send(msg).is_err() {
                tracing::error!("Dispatcher gone, dropping message");
            }
        }) => {
            result.context("Telegram listener stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received");
        }
    }

    channel.shutdown().await?;

    if tokio::time::timeout(DRAIN_TIMEOUT, dispatcher_handle)
        .await
        .is_err()
    {
        tracing::warn!("Dispatcher did not drain in time");
    }

    Ok(())
}
