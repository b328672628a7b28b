//! Script language for Dreamwalk games.
//!
//! A script is Markdown-flavoured text: `### ID` headers, body paragraphs with
//! inline tags, and a final paragraph of `> text (ID)` replies. This crate
//! parses scripts into [`StateDefinition`]s, validates them into a
//! [`GameGraph`], renders load errors, and prints states back to canonical
//! script text.

/// Parser settings such as the terminal markers.
pub mod config;
/// Diagnostics and their ariadne rendering.
pub mod diagnostics;
/// Load-time error types.
pub mod error;
/// Tag-boundary lexer for state bodies.
pub mod lexer;
/// Section, header, reply and body parsing.
pub mod parser;
/// Canonical script printer.
pub mod printer;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use dw_core::{GameGraph, GraphError, StateDefinition, StateId};
use parser::Span;

pub use config::ScriptConfig;
pub use diagnostics::{Diagnostic, Severity, render_diagnostics};
pub use error::{ScriptError, ScriptResult};
pub use parser::ParsedState;
pub use printer::print_script;

/// Normalize `\r\n` line endings. Error spans always refer to the normalized text.
pub fn normalize(source: &str) -> Cow<'_, str> {
    if source.contains('\r') {
        Cow::Owned(source.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Parse a script with the default markers.
pub fn parse(source: &str) -> ScriptResult<Vec<StateDefinition>> {
    parse_with(source, &ScriptConfig::default())
}

/// Parse a script into its states, in document order.
pub fn parse_with(source: &str, config: &ScriptConfig) -> ScriptResult<Vec<StateDefinition>> {
    let source = normalize(source);
    let states = parser::parse_states(&source, config)?;
    Ok(states.into_iter().map(|p| p.state).collect())
}

/// A validated script together with where each state was declared.
#[derive(Debug, Clone)]
pub struct LoadedScript {
    /// The validated graph.
    pub graph: GameGraph,
    headers: BTreeMap<StateId, Span>,
}

impl LoadedScript {
    /// Span of the `### ID` header that declared state `id`.
    pub fn header(&self, id: StateId) -> Option<Span> {
        self.headers.get(&id).cloned()
    }
}

/// Parse a script and validate it into a [`GameGraph`].
///
/// Graph errors are reported against the header of the state at fault.
pub fn load_graph(source: &str, config: &ScriptConfig) -> ScriptResult<GameGraph> {
    load_script(source, config).map(|script| script.graph)
}

/// Like [`load_graph`], keeping the header span of every state.
pub fn load_script(source: &str, config: &ScriptConfig) -> ScriptResult<LoadedScript> {
    let source = normalize(source);
    let parsed = parser::parse_states(&source, config)?;

    let header_of = |id: StateId| {
        parsed
            .iter()
            .rev()
            .find(|p| p.state.id == id)
            .map(|p| p.header.clone().into())
    };

    let graph = GameGraph::new(parsed.iter().map(|p| p.state.clone())).map_err(|source| {
        let span = match &source {
            GraphError::DuplicateState(id)
            | GraphError::ReservedState(id)
            | GraphError::LockWithoutEscape(id)
            | GraphError::UnknownState(id) => header_of(*id),
            GraphError::UnknownTarget { from, .. } => header_of(*from),
            GraphError::MissingEntry => None,
        };
        ScriptError::Graph { source, span }
    })?;

    let headers = parsed.into_iter().map(|p| (p.state.id, p.header)).collect();
    Ok(LoadedScript { graph, headers })
}

/// Read, parse, and validate a script file.
pub fn load_file(path: impl AsRef<Path>, config: &ScriptConfig) -> ScriptResult<GameGraph> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_graph(&source, config)
}
