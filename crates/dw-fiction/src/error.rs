//! Error types for the conversation engine.

use std::path::PathBuf;

use dw_core::GraphError;
use thiserror::Error;

/// Result type for engine operations.
pub type FictionResult<T> = Result<T, FictionError>;

/// Errors that can occur while running conversations.
///
/// Player mistakes are not errors: they are reported as a
/// [`TurnOutcome`](crate::TurnOutcome) and answered with a phrase.
#[derive(Debug, Error)]
pub enum FictionError {
    /// A transition named a state the graph does not hold.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A phrases file could not be read.
    #[error("cannot read phrases from {}: {source}", path.display())]
    PhrasesIo {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A phrases file is not valid JSON for [`Phrases`](crate::Phrases).
    #[error("invalid phrases: {0}")]
    PhrasesFormat(#[from] serde_json::Error),
}
