use crate::state::StateId;

/// Alias for `Result<T, GraphError>`.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while assembling or querying a [`GameGraph`](crate::GameGraph).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Two states share the same id.
    #[error("duplicate state id {0}")]
    DuplicateState(StateId),

    /// The script has no state `1` to start from.
    #[error("missing entry state {}", crate::ENTRY_STATE)]
    MissingEntry,

    /// State `0` belongs to name intake and cannot be declared.
    #[error("state id {0} is reserved for name intake")]
    ReservedState(StateId),

    /// A reply or lock points at a state that does not exist.
    #[error("state {from} refers to unknown state {to}")]
    UnknownTarget {
        /// The state holding the reference.
        from: StateId,
        /// The missing destination.
        to: StateId,
    },

    /// A lock state needs a reply at index 1 as its escape hatch.
    #[error("lock state {0} has no replies to fall back on")]
    LockWithoutEscape(StateId),

    /// A lookup asked for a state the graph does not hold.
    #[error("unknown state {0}")]
    UnknownState(StateId),
}

/// Errors raised while parsing a condition expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    /// The expression has no atoms at all.
    #[error("empty condition")]
    Empty,

    /// One of the `and`-separated parts is blank (e.g. `a and`).
    #[error("empty term in condition \"{0}\"")]
    EmptyAtom(String),

    /// A part is neither `TOKEN` nor `not TOKEN`.
    #[error("invalid term \"{0}\": expected `TOKEN` or `not TOKEN`")]
    InvalidAtom(String),

    /// A visited-state number does not fit a state id.
    #[error("state number out of range: {0}")]
    StateOutOfRange(String),
}
