use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use dw_core::{Component, StateDefinition};
use dw_dsl::ScriptConfig;

const PREVIEW_CHARS: usize = 50;

pub fn run(path: &Path, config: &ScriptConfig) -> Result<(), String> {
    let script = super::load(path, config)?;
    let graph = script.graph();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["State", "Kind", "Replies", "Opening"]);

    for state in graph.states() {
        table.add_row(vec![
            state.id.to_string(),
            super::kind_label(state).to_string(),
            state.replies.len().to_string(),
            preview(state),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} states", graph.len());

    Ok(())
}

/// First line of the state's first text, shortened.
fn preview(state: &StateDefinition) -> String {
    let first = state
        .message_blocks
        .iter()
        .flat_map(|b| &b.components)
        .find_map(|c| match c {
            Component::Text { text } => text.lines().find(|l| !l.trim().is_empty()),
            _ => None,
        });

    match first {
        None => "—".to_string(),
        Some(line) if line.chars().count() > PREVIEW_CHARS => {
            let short: String = line.chars().take(PREVIEW_CHARS - 3).collect();
            format!("{short}...")
        }
        Some(line) => line.to_string(),
    }
}
