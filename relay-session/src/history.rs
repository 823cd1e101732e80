//! Bounded per-user conversation history.

use std::collections::VecDeque;

/// Turn records retained per session.
pub const MAX_TURNS: usize = 20;

/// Most recent turn records sent with each prompt.
pub const CONTEXT_TURNS: usize = 6;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One attributed utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRecord {
    pub speaker: Speaker,
    pub text: String,
}

impl TurnRecord {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }
}

/// Chronological log of turns, oldest first, capped at `max_turns`.
///
/// Appending past the cap evicts from the front.
#[derive(Debug, Clone)]
pub struct History {
    turns: VecDeque<TurnRecord>,
    max_turns: usize,
}

impl History {
    /// Create an empty history with the default cap.
    pub fn new() -> Self {
        Self::with_capacity_limit(MAX_TURNS)
    }

    /// Create an empty history holding at most `max_turns` records.
    pub fn with_capacity_limit(max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: VecDeque::with_capacity(max_turns + 1),
            max_turns,
        }
    }

    /// Append one record, then evict oldest records until within the cap.
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.turns.push_back(TurnRecord::new(speaker, text));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// The last `n` records in chronological order (fewer if shorter).
    pub fn window(&self, n: usize) -> Vec<TurnRecord> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &TurnRecord> {
        self.turns.iter()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
