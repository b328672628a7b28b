use std::path::Path;

use colored::Colorize;
use dw_core::{Component, ModifierAction, MoneyGain, StateId};
use dw_dsl::ScriptConfig;

pub fn run(path: &Path, config: &ScriptConfig, id: StateId) -> Result<(), String> {
    let script = super::load(path, config)?;
    let state = script
        .graph()
        .get(id)
        .ok_or_else(|| format!("state not found: {id}"))?;

    println!(
        "  {} [{}]",
        format!("State {id}").bold(),
        super::kind_label(state).dimmed()
    );
    println!();

    for block in &state.message_blocks {
        let indent = if let Some(condition) = &block.condition {
            println!("  {} {}", "if".cyan(), condition.to_string().cyan());
            "    "
        } else {
            "  "
        };

        for component in &block.components {
            match component {
                Component::Text { text } => {
                    for line in text.lines() {
                        println!("{indent}{line}");
                    }
                }
                Component::Modifier(change) => {
                    let line = match change.action {
                        ModifierAction::Add => format!("+ {}", change.tag).green(),
                        ModifierAction::Remove => format!("- {}", change.tag).red(),
                    };
                    println!("{indent}{line}");
                }
                Component::Money { gain } => {
                    let amount = match gain {
                        MoneyGain::Fixed(n) => n.to_string(),
                        MoneyGain::UpTo(max) => format!("1-{max}"),
                    };
                    println!("{indent}{}", format!("$ {amount}").yellow());
                }
                Component::Break { wait_secs } => {
                    println!("{indent}{}", format!("~ pause {wait_secs}s").dimmed());
                }
            }
        }
    }

    if let Some(lock) = &state.lock {
        println!();
        println!(
            "  {} {}: ASK -> {}, other codes -> {}",
            "lock".bold(),
            lock.kind,
            lock.correct,
            lock.wrong
        );
    }

    if !state.replies.is_empty() {
        println!();
        println!("  {}:", "Replies".bold());
        for (i, reply) in state.replies.iter().enumerate() {
            let condition = reply
                .condition
                .as_ref()
                .map(|c| format!("  (if {c})").dimmed().to_string())
                .unwrap_or_default();
            println!("    {}) {} -> {}{condition}", i + 1, reply.text, reply.destination);
        }
    }

    Ok(())
}
