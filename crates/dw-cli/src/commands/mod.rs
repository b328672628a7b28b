pub mod check;
pub mod export;
pub mod list;
pub mod play;
pub mod show;

use std::path::Path;

use dw_core::{GameGraph, StateDefinition, StateId, TerminalKind};
use dw_dsl::diagnostics::{Diagnostic, Severity, render_diagnostics};
use dw_dsl::parser::Span;
use dw_dsl::{LoadedScript, ScriptConfig, ScriptError};
use miette::Diagnostic as _;

/// A loaded script: its normalized text and the validated graph.
pub struct Script {
    pub source: String,
    pub loaded: LoadedScript,
}

impl Script {
    pub fn graph(&self) -> &GameGraph {
        &self.loaded.graph
    }

    /// Header span of a state, or an empty span at the start.
    pub fn header(&self, id: StateId) -> Span {
        self.loaded.header(id).unwrap_or(0..0)
    }
}

/// Read, parse, and validate a script, printing diagnostics on failure.
fn load(path: &Path, config: &ScriptConfig) -> Result<Script, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let source = dw_dsl::normalize(&raw).into_owned();

    match dw_dsl::load_script(&source, config) {
        Ok(loaded) => Ok(Script { source, loaded }),
        Err(err) => {
            let diagnostic = err.to_diagnostic();
            print_diagnostics(&source, path, std::slice::from_ref(&diagnostic));
            Err(failure_message(&err, &diagnostic, &source, path))
        }
    }
}

/// `file:line:col: message [code]`, without a location when the error has no span.
fn failure_message(err: &ScriptError, diagnostic: &Diagnostic, source: &str, path: &Path) -> String {
    let mut message = match err.span() {
        Some(_) => {
            let (line, col) = diagnostic.location(source);
            format!("{}:{line}:{col}: {err}", path.display())
        }
        None => format!("{}: {err}", path.display()),
    };
    if let Some(code) = err.code() {
        message.push_str(&format!(" [{code}]"));
    }
    message
}

/// Print diagnostics to stderr using ariadne.
fn print_diagnostics(source: &str, path: &Path, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let filename = path.display().to_string();
    let rendered = render_diagnostics(source, &filename, diagnostics);
    eprint!("{rendered}");

    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    if warnings > 0 && warnings == diagnostics.len() {
        eprintln!(
            "  {} warning{}",
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
    }
}

/// Short label for how a state behaves.
fn kind_label(state: &StateDefinition) -> &'static str {
    match state.terminal {
        TerminalKind::Lethal => "lethal",
        TerminalKind::Victory => "victory",
        TerminalKind::None if state.lock.is_some() => "lock",
        TerminalKind::None => "choice",
    }
}
