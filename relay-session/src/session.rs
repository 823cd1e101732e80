//! Per-user session state and the process-wide session registry.

use crate::endpoint::Endpoint;
use crate::error::{SessionError, SessionResult};
use crate::history::{History, MAX_TURNS};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// State for one user: the bound endpoint and the conversation so far.
#[derive(Debug, Clone)]
pub struct Session {
    pub endpoint: Option<Endpoint>,
    pub history: History,
}

impl Session {
    pub fn new(max_turns: usize) -> Self {
        Self {
            endpoint: None,
            history: History::with_capacity_limit(max_turns),
        }
    }

    /// Validate and store an endpoint, replacing any previous binding.
    ///
    /// On failure the previous binding is kept.
    pub fn bind(&mut self, raw_url: &str) -> SessionResult<&Endpoint> {
        let endpoint = Endpoint::parse(raw_url)?;
        Ok(self.endpoint.insert(endpoint))
    }

    pub fn is_bound(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn endpoint(&self) -> SessionResult<&Endpoint> {
        self.endpoint.as_ref().ok_or(SessionError::NotBound)
    }

    /// Clear history only; the endpoint binding survives.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MAX_TURNS)
    }
}

/// Sessions keyed by user identity, created lazily, kept for process lifetime.
///
/// Each session sits behind its own async mutex; holding it for a whole turn
/// serialises that user's turns without blocking other users.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    max_turns: usize,
}

impl SessionRegistry {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns,
        }
    }

    /// The session for `user_id`, created on first use.
    pub fn session(&self, user_id: &str) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.get(user_id) {
            return existing.clone();
        }
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(user_id, "Creating session");
                Arc::new(Mutex::new(Session::new(self.max_turns)))
            })
            .clone()
    }

    /// Copy of the current state, waiting for any in-flight turn to finish.
    pub async fn snapshot(&self, user_id: &str) -> Option<Session> {
        let session = self.sessions.get(user_id).map(|s| s.clone())?;
        let guard = session.lock().await;
        Some(guard.clone())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(MAX_TURNS)
    }
}
