//! Session orchestrator: one entry point per inbound command plus chat.
//!
//! Turn flow for a chat message:
//!
//! 1. No endpoint bound → bind guidance, no history change, no network call
//! 2. Read the context window, compile the prompt
//! 3. Call the endpoint and turn the outcome into reply text
//! 4. Append the user turn, then the assistant turn (even error texts)
//!
//! The user's session lock is held for the whole turn so a user's messages
//! are processed one at a time.

use crate::history::Speaker;
use crate::inference::Generate;
use crate::persona::{Persona, Replies};
use crate::prompt::compile;
use crate::session::SessionRegistry;
use relay_common::config::SessionConfig;
use relay_common::logging::preview;
use std::sync::Arc;

/// Ties sessions, persona and the inference client together.
pub struct Orchestrator<G: Generate> {
    sessions: SessionRegistry,
    persona: Arc<Persona>,
    client: G,
    context_turns: usize,
}

impl<G: Generate> Orchestrator<G> {
    /// Create an orchestrator with default history limits.
    pub fn new(client: G, persona: Persona) -> Self {
        Self::with_config(client, persona, &SessionConfig::default())
    }

    /// Create an orchestrator with explicit history limits.
    pub fn with_config(client: G, persona: Persona, config: &SessionConfig) -> Self {
        Self {
            sessions: SessionRegistry::new(config.max_turns),
            persona: Arc::new(persona),
            client,
            context_turns: config.context_turns.min(config.max_turns),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn client(&self) -> &G {
        &self.client
    }

    pub fn context_turns(&self) -> usize {
        self.context_turns
    }

    /// Greeting with bind instructions.
    pub fn start(&self, user_id: &str) -> String {
        self.sessions.session(user_id);
        self.persona.replies.greeting.clone()
    }

    /// Command list.
    pub fn help(&self) -> String {
        self.persona.replies.help.clone()
    }

    /// Bind (or rebind) the user's endpoint.
    pub async fn bind(&self, user_id: &str, raw_url: Option<&str>) -> String {
        let replies = &self.persona.replies;

        let Some(raw_url) = raw_url.map(str::trim).filter(|u| !u.is_empty()) else {
            return replies.bind_usage.clone();
        };

        let session = self.sessions.session(user_id);
        let mut session = session.lock().await;

        match session.bind(raw_url) {
            Ok(endpoint) => {
                tracing::info!(user_id, endpoint = %endpoint, "Endpoint bound");
                Replies::render(&replies.bound, endpoint.base())
            }
            Err(e) => {
                tracing::info!(user_id, error = %e, "Rejected endpoint");
                replies.invalid_url.clone()
            }
        }
    }

    /// Report the bound endpoint, or that nothing is bound.
    pub async fn status(&self, user_id: &str) -> String {
        let replies = &self.persona.replies;
        let session = self.sessions.session(user_id);
        let session = session.lock().await;

        match session.endpoint() {
            Ok(endpoint) => Replies::render(&replies.status_bound, endpoint.base()),
            Err(_) => replies.status_unbound.clone(),
        }
    }

    /// Clear the user's history. The endpoint binding is untouched.
    pub async fn reset(&self, user_id: &str) -> String {
        let session = self.sessions.session(user_id);
        let mut session = session.lock().await;
        let dropped = session.history.len();
        session.reset();

        tracing::info!(user_id, dropped_turns = dropped, "History reset");
        self.persona.replies.reset.clone()
    }

    /// Handle one chat message and return the reply text.
    pub async fn on_message(&self, user_id: &str, text: &str) -> String {
        let session = self.sessions.session(user_id);
        let mut session = session.lock().await;

        let endpoint = match session.endpoint() {
            Ok(endpoint) => endpoint.clone(),
            Err(_) => {
                tracing::debug!(user_id, "Message before bind");
                return self.persona.replies.not_bound.clone();
            }
        };

        let window = session.history.window(self.context_turns);
        let prompt = compile(&self.persona, &window, text);

        tracing::debug!(
            user_id,
            window_turns = window.len(),
            text = %preview(text, 80),
            "Compiled prompt"
        );

        let outcome = self.client.generate(&endpoint, &prompt).await;
        let kind = outcome.kind();
        let reply = outcome.into_reply(&self.persona.replies);

        session.history.append(Speaker::User, text);
        session.history.append(Speaker::Assistant, reply.as_str());

        tracing::debug!(
            user_id,
            outcome = kind,
            history_turns = session.history.len(),
            "Turn recorded"
        );

        reply
    }
}
