//! Conversation engine for Dreamwalk.
//!
//! Drives players through a [`GameGraph`](dw_core::GameGraph): name intake,
//! paced presentation of state bodies, reply menus, and the code-entry lock
//! protocol. Each user owns an independent [`Session`]; the engine serializes
//! events per user while different users proceed concurrently.

/// Engine and phrase configuration.
pub mod config;
/// The per-user state machine and turn handling.
pub mod engine;
/// Error types for the conversation engine.
pub mod error;
/// Rendering a state into outbound messages.
pub mod presenter;
/// Per-user game progress.
pub mod session;

pub use config::{EngineConfig, Phrases};
pub use engine::{Conversation, Engine, Event, TurnOutcome, UserId};
pub use error::{FictionError, FictionResult};
pub use presenter::{Outbound, Outbox, Presentation, Transcript, button_rows, present, render_menu};
pub use session::Session;
