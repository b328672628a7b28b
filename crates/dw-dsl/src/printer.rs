//! Canonical script printer.
//!
//! Printing a parsed state list and parsing the result yields the same
//! states. Emphasis is written doubled (`*` as `**`) so that the parser's
//! collapsing restores it, and a state's lock tag is always written at the
//! end of its body.

use std::fmt::Write;

use dw_core::{
    Component, Lock, MessageBlock, ModifierAction, MoneyGain, Reply, StateDefinition, TerminalKind,
};

use crate::config::ScriptConfig;
use crate::parser::SEPARATOR;

/// Serialize states back into script text.
pub fn print_script(states: &[StateDefinition], config: &ScriptConfig) -> String {
    states
        .iter()
        .map(|state| print_state(state, config))
        .collect::<Vec<_>>()
        .join(&format!("\n{SEPARATOR}\n"))
}

fn print_state(state: &StateDefinition, config: &ScriptConfig) -> String {
    let mut body = String::new();
    for block in &state.message_blocks {
        print_block(&mut body, block);
    }
    if let Some(lock) = &state.lock {
        print_lock(&mut body, lock);
    }

    let marker = match state.terminal {
        TerminalKind::None => None,
        TerminalKind::Lethal => Some(config.lethal_marker.as_str()),
        TerminalKind::Victory => config.victory_marker.as_deref(),
    };
    if let Some(marker) = marker.filter(|m| !body.contains(m)) {
        if !body.trim().is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(marker);
    }

    let mut out = format!("### {}\n\n", state.id);
    out.push_str(body.trim_end());
    if !state.replies.is_empty() {
        if !body.trim().is_empty() {
            out.push_str("\n\n");
        }
        let lines: Vec<String> = state.replies.iter().map(print_reply).collect();
        out.push_str(&lines.join("\n"));
    }
    out.push('\n');
    out
}

fn emphasis(text: &str) -> String {
    text.replace('*', "**")
}

fn print_block(out: &mut String, block: &MessageBlock) {
    if let Some(condition) = &block.condition {
        let _ = write!(out, "<if {condition}>");
    }
    for component in &block.components {
        print_component(out, component);
    }
    if block.condition.is_some() {
        out.push_str("</if>");
    }
}

fn print_component(out: &mut String, component: &Component) {
    match component {
        Component::Text { text } => out.push_str(&emphasis(text)),
        Component::Modifier(change) => match change.action {
            ModifierAction::Add => {
                let _ = write!(out, "<mod {}/>", change.tag);
            }
            ModifierAction::Remove => {
                let _ = write!(out, "<mod not {}/>", change.tag);
            }
        },
        Component::Money { gain } => match gain {
            MoneyGain::Fixed(amount) => {
                let _ = write!(out, "<money {amount}/>");
            }
            MoneyGain::UpTo(max) => {
                let _ = write!(out, "<money 1-{max}/>");
            }
        },
        Component::Break { wait_secs: 0 } => out.push_str("<mb/>"),
        Component::Break { wait_secs } => {
            let _ = write!(out, "<mb wait={wait_secs}/>");
        }
    }
}

fn print_lock(out: &mut String, lock: &Lock) {
    let _ = write!(
        out,
        "<input {} correct={} wrong={}/>",
        lock.kind, lock.correct, lock.wrong
    );
}

fn print_reply(reply: &Reply) -> String {
    let text = emphasis(&reply.text);
    match &reply.condition {
        Some(condition) => format!("> <if {condition}>{text} ({})</if>", reply.destination),
        None => format!("> {text} ({})", reply.destination),
    }
}
