//! Script diagnostics and their terminal rendering.
//!
//! Spans are byte ranges into the newline-normalized script, the same text
//! the parser saw.

use std::fmt;
use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};
use dw_core::StateId;

/// How serious a finding is. Only errors stop a script from loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The script cannot be played.
    Error,
    /// The script loads but is likely to misbehave in play.
    Warning,
}

/// A finding about a script, anchored to a span of its source.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// Byte range of the offending text.
    pub span: Range<usize>,
    /// One-line summary.
    pub message: String,
    /// Text attached to the underlined span. Defaults to the message.
    pub label: Option<String>,
    /// The state the finding is about, when it concerns a whole state.
    pub state: Option<StateId>,
}

impl Diagnostic {
    fn new(severity: Severity, span: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity,
            span,
            message: message.into(),
            label: None,
            state: None,
        }
    }

    /// An error at `span`.
    pub fn error(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, span, message)
    }

    /// A warning at `span`.
    pub fn warning(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, span, message)
    }

    /// Attach a label to the underlined span.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Mark the finding as concerning state `id`.
    pub fn in_state(mut self, id: StateId) -> Self {
        self.state = Some(id);
        self
    }

    /// 1-based line and column where the span starts.
    ///
    /// Columns count characters, so Cyrillic markers do not skew them.
    pub fn location(&self, source: &str) -> (usize, usize) {
        let offset = self.span.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |nl| nl + 1);
        (line, before[line_start..].chars().count() + 1)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}: {}", self.message)
    }
}

/// Render diagnostics with ariadne, one report each, in the given order.
pub fn render_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) -> String {
    let mut output = Vec::new();

    for diag in diagnostics {
        let (kind, color) = match diag.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
        };

        let mut report = Report::build(kind, (filename, diag.span.clone()))
            .with_message(&diag.message)
            .with_label(
                Label::new((filename, diag.span.clone()))
                    .with_message(diag.label.as_deref().unwrap_or(&diag.message))
                    .with_color(color),
            );
        if let Some(id) = diag.state {
            report = report.with_note(format!("in state {id}"));
        }

        report
            .finish()
            .write((filename, Source::from(source)), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "### 1\n\nYou find <money lots/>.\n\n> Leave (2)\n----\n### 2\n\nпотрачено <mod/>";

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::error(0..5, "unknown tag <mood/>");
        assert_eq!(d.to_string(), "error: unknown tag <mood/>");
        let w = Diagnostic::warning(0..5, "state 8 is unreachable").in_state(8);
        assert_eq!(w.to_string(), "warning: state 8 is unreachable");
        assert_eq!(w.state, Some(8));
    }

    #[test]
    fn location_counts_lines_and_characters() {
        let money = SCRIPT.find("<money").unwrap();
        assert_eq!(Diagnostic::error(0..5, "x").location(SCRIPT), (1, 1));
        assert_eq!(Diagnostic::error(money..money + 1, "x").location(SCRIPT), (3, 10));

        let tag = SCRIPT.find("<mod/>").unwrap();
        assert_eq!(Diagnostic::error(tag..tag + 6, "x").location(SCRIPT), (9, 11));
    }

    #[test]
    fn location_clamps_past_the_end() {
        let d = Diagnostic::error(500..500, "x");
        assert_eq!(d.location("### 1\nab"), (2, 3));
    }

    #[test]
    fn render_names_file_and_state() {
        let start = SCRIPT.find("<money").unwrap();
        let diags = vec![
            Diagnostic::error(start..start + 14, "invalid money amount")
                .with_label("expected N, 1-N or WORD N")
                .in_state(1),
        ];
        let output = render_diagnostics(SCRIPT, "game.md", &diags);
        assert!(output.contains("game.md"));
        assert!(output.contains("invalid money amount"));
        assert!(output.contains("in state 1"));
    }
}
