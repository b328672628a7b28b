//! Core types for Dreamwalk: narrative states, conditions, and the game graph.
//!
//! This crate defines the data model that scripts parse into. It is
//! independent of the parser: a [`GameGraph`] can be built programmatically
//! from [`StateDefinition`] values or deserialized from JSON.

/// Conjunctive conditions over visited states and modifier tags.
pub mod condition;
/// Error types used throughout the crate.
pub mod error;
/// The immutable, validated graph of states.
pub mod graph;
/// State definitions, message blocks, components, and replies.
pub mod state;

/// Re-export condition types.
pub use condition::{Atom, Condition, History, Test};
/// Re-export error types.
pub use error::{ConditionError, GraphError, GraphResult};
/// Re-export graph types.
pub use graph::{ENTRY_STATE, GameGraph, NAME_INTAKE_STATE};
/// Re-export state types.
pub use state::{
    Component, Lock, MessageBlock, ModifierAction, ModifierChange, MoneyGain, Reply,
    StateDefinition, StateId, TerminalKind,
};
