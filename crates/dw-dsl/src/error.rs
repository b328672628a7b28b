//! Load-time errors for game scripts.

use std::ops::Range;
use std::path::PathBuf;

use dw_core::GraphError;
use miette::{Diagnostic as MietteDiagnostic, SourceSpan};
use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Result type for script loading.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors that stop a script from loading. None of these are recoverable at runtime.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ScriptError {
    /// A tag, header, reply line, or span is malformed.
    #[error("malformed script: {message}")]
    #[diagnostic(code(dreamwalk::malformed_script))]
    Malformed {
        /// What went wrong.
        message: String,
        /// Where it went wrong.
        #[label("here")]
        span: SourceSpan,
    },

    /// The script parsed but its states do not form a valid graph.
    #[error("invalid game graph: {source}")]
    #[diagnostic(code(dreamwalk::invalid_graph))]
    Graph {
        /// The graph validation failure.
        source: GraphError,
        /// Header of the offending state, when there is one.
        #[label("in this state")]
        span: Option<SourceSpan>,
    },

    /// The script file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    #[diagnostic(code(dreamwalk::io))]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl ScriptError {
    pub(crate) fn malformed(span: Range<usize>, message: impl Into<String>) -> Self {
        ScriptError::Malformed {
            message: message.into(),
            span: span.into(),
        }
    }

    /// Byte range of the error in the (newline-normalized) source, if known.
    pub fn span(&self) -> Option<Range<usize>> {
        let span = match self {
            ScriptError::Malformed { span, .. } => Some(span),
            ScriptError::Graph { span, .. } => span.as_ref(),
            ScriptError::Io { .. } => None,
        }?;
        Some(span.offset()..span.offset() + span.len())
    }

    /// Convert into a renderable diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = self.span().unwrap_or(0..0);
        match self {
            ScriptError::Malformed { message, .. } => Diagnostic::error(span, message.clone()),
            ScriptError::Graph { source, .. } => {
                Diagnostic::error(span, source.to_string()).with_label("in this state")
            }
            ScriptError::Io { .. } => Diagnostic::error(span, self.to_string()),
        }
    }
}
