//! Routes inbound messages to the orchestrator and sends the replies.
//!
//! Each user gets a worker task with its own queue. A user's messages are
//! handled strictly in arrival order; different users never wait on each
//! other.

use crate::commands::{self, Command, Inbound};
use crate::message::{ChannelMessage, OutgoingMessage};
use crate::traits::Channel;
use relay_session::{Generate, Orchestrator};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Worker {
    tx: mpsc::UnboundedSender<ChannelMessage>,
    handle: JoinHandle<()>,
}

/// Connects a channel to the orchestrator.
pub struct Dispatcher<C, G: Generate> {
    channel: Arc<C>,
    orchestrator: Arc<Orchestrator<G>>,
}

impl<C, G> Dispatcher<C, G>
where
    C: Channel + 'static,
    G: Generate + 'static,
{
    pub fn new(channel: Arc<C>, orchestrator: Arc<Orchestrator<G>>) -> Self {
        Self {
            channel,
            orchestrator,
        }
    }

    /// Handle one message end to end: classify, run, reply.
    pub async fn handle(&self, message: ChannelMessage) {
        let user_id = message.user_id.as_str();

        let reply = match commands::parse(&message.text) {
            Inbound::Ignored => {
                tracing::debug!(trace_id = %message.trace_id, user_id, "Ignoring message");
                return;
            }
            Inbound::Command(command) => {
                tracing::info!(trace_id = %message.trace_id, user_id, ?command, "Command received");
                self.run_command(user_id, command).await
            }
            Inbound::Chat(text) => {
                if let Err(e) = self.channel.send_typing(&message.channel_id).await {
                    tracing::debug!(trace_id = %message.trace_id, "Typing indicator failed: {e}");
                }
                self.orchestrator.on_message(user_id, &text).await
            }
        };

        let outgoing = OutgoingMessage::reply(&message, reply);
        if let Err(e) = self.channel.send(outgoing).await {
            tracing::warn!(
                trace_id = %message.trace_id,
                user_id,
                channel = self.channel.name(),
                error = %e,
                "Failed to send reply"
            );
        }
    }

    async fn run_command(&self, user_id: &str, command: Command) -> String {
        match command {
            Command::Start => self.orchestrator.start(user_id),
            Command::SetEndpoint(url) => self.orchestrator.bind(user_id, url.as_deref()).await,
            Command::Status => self.orchestrator.status(user_id).await,
            Command::Help => self.orchestrator.help(),
            Command::Reset => self.orchestrator.reset(user_id).await,
        }
    }

    /// Start the routing task.
    ///
    /// The returned handle completes once `rx` is closed and every worker has
    /// drained its queue.
    ///
    /// Workers are never reaped: one idle task and queue per user lives as
    /// long as the dispatcher, the same lifetime as that user's session in
    /// the orchestrator's registry.
    pub fn spawn(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<ChannelMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Dispatcher started");
            let mut workers: HashMap<String, Worker> = HashMap::new();

            while let Some(message) = rx.recv().await {
                let user_id = message.user_id.clone();
                let worker = workers
                    .entry(user_id.clone())
                    .or_insert_with(|| self.clone().spawn_worker(&user_id));

                if let Err(mpsc::error::SendError(message)) = worker.tx.send(message) {
                    // Worker died (panicked turn); replace it and retry once.
                    tracing::warn!(user_id = %user_id, "Restarting user worker");
                    let replacement = self.clone().spawn_worker(&user_id);
                    if replacement.tx.send(message).is_err() {
                        tracing::error!(user_id = %user_id, "Dropping message, worker unavailable");
                    }
                    *worker = replacement;
                }
            }

            tracing::info!(users = workers.len(), "Dispatcher draining");
            for (user_id, Worker { tx, handle }) in workers {
                drop(tx);
                if let Err(e) = handle.await {
                    tracing::error!(user_id = %user_id, error = %e, "User worker failed");
                }
            }
            tracing::info!("Dispatcher stopped");
        })
    }

    fn spawn_worker(self: Arc<Self>, user_id: &str) -> Worker {
        let (tx, mut rx) = mpsc::unbounded_channel::<ChannelMessage>();
        tracing::debug!(user_id, "Spawning user worker");

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                self.handle(message).await;
            }
        });

        Worker { tx, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ChannelError, ChannelResult};
    use async_trait::async_trait;
    use relay_session::{Endpoint, GenerateOutcome, Persona};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        typing: Mutex<Vec<String>>,
        sent: Mutex<Vec<OutgoingMessage>>,
        fail_sends: bool,
    }

    #[async_trait]
    impl Channel for Outbox {
        fn name(&self) -> &'static str {
            "outbox"
        }

        async fn init(&mut self) -> ChannelResult<()> {
            Ok(())
        }

        async fn send(&self, message: OutgoingMessage) -> ChannelResult<String> {
            if self.fail_sends {
                return Err(ChannelError::SendFailed("offline".into()));
            }
            self.sent.lock().unwrap().push(message);
            Ok("1".into())
        }

        async fn send_typing(&self, channel_id: &str) -> ChannelResult<()> {
            self.typing.lock().unwrap().push(channel_id.to_string());
            Ok(())
        }

        async fn listen<F>(&self, _callback: F) -> ChannelResult<()>
        where
            F: Fn(ChannelMessage) + Send + Sync + 'static,
        {
            Ok(())
        }

        async fn health_check(&self) -> ChannelResult<()> {
            Ok(())
        }

        async fn shutdown(&self) -> ChannelResult<()> {
            Ok(())
        }
    }

    struct Fixed;

    #[async_trait]
    impl Generate for Fixed {
        async fn generate(&self, _endpoint: &Endpoint, _prompt: &str) -> GenerateOutcome {
            GenerateOutcome::Success("hey!".into())
        }
    }

    fn dispatcher(outbox: Outbox) -> Dispatcher<Outbox, Fixed> {
        Dispatcher::new(
            Arc::new(outbox),
            Arc::new(Orchestrator::new(Fixed, Persona::default())),
        )
    }

    #[tokio::test]
    async fn test_chat_sends_typing_then_reply() {
        let d = dispatcher(Outbox::default());
        d.handle(ChannelMessage::new("chat", "42", "/setngrok https://abc.test"))
            .await;
        d.handle(ChannelMessage::new("chat", "42", "hello")).await;

        assert_eq!(*d.channel.typing.lock().unwrap(), vec!["chat".to_string()]);
        let sent = d.channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].text.contains("https://abc.test"));
        assert_eq!(sent[1].text, "hey!");
        assert_eq!(sent[1].channel_id, "chat");
    }

    #[tokio::test]
    async fn test_commands_route_to_orchestrator() {
        let d = dispatcher(Outbox::default());
        let replies = d.orchestrator.persona().replies.clone();

        for text in ["/start", "/help", "/status", "/reset", "/setngrok"] {
            d.handle(ChannelMessage::new("chat", "42", text)).await;
        }

        let sent: Vec<String> = d
            .channel
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect();
        assert_eq!(
            sent,
            vec![
                replies.greeting,
                replies.help,
                replies.status_unbound,
                replies.reset,
                replies.bind_usage,
            ]
        );
        assert!(d.channel.typing.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_gets_no_reply() {
        let d = dispatcher(Outbox::default());
        d.handle(ChannelMessage::new("chat", "42", "/weather")).await;
        assert!(d.channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_not_fatal() {
        let d = dispatcher(Outbox {
            fail_sends: true,
            ..Outbox::default()
        });
        d.handle(ChannelMessage::new("chat", "42", "/setngrok https://abc.test"))
            .await;
        d.handle(ChannelMessage::new("chat", "42", "hello")).await;

        // The turn still happened even though the reply was lost.
        let snap = d.orchestrator.sessions().snapshot("42").await.unwrap();
        assert_eq!(snap.history.len(), 2);
    }
}
