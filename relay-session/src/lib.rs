//! Relay Session - the conversational core of the relay.
//!
//! Turns `(user, text)` into reply text:
//! - Endpoint binding per user (validated syntactically, never probed)
//! - Bounded per-user history with a smaller context window
//! - Deterministic prompt compilation from persona + window + new input
//! - An inference client that classifies every network outcome into text
//! - An orchestrator that serialises turns per user
//!
//! ```text
//! message → Orchestrator → Session (endpoint?) → compile → InferenceClient
//!                               ↑                                  ↓
//!                               └──── append user + assistant ←── reply
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod endpoint;
pub mod error;
pub mod history;
pub mod inference;
pub mod orchestrator;
pub mod persona;
pub mod prompt;
pub mod session;

pub use endpoint::{Endpoint, GENERATE_PATH};
pub use error::{SessionError, SessionResult};
pub use history::{History, Speaker, TurnRecord, CONTEXT_TURNS, MAX_TURNS};
pub use inference::{Generate, GenerateOutcome, InferenceClient, InferenceOptions};
pub use orchestrator::Orchestrator;
pub use persona::{Persona, Replies};
pub use prompt::compile;
pub use session::{Session, SessionRegistry};
