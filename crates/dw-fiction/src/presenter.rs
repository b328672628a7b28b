//! Rendering a state into outbound messages.
//!
//! Presentation walks a state's message blocks in order, buffering text and
//! flushing it as a separate message at every break. Breaks pause with
//! `tokio::time::sleep`, so a waiting player never blocks the runtime and a
//! dropped turn cancels the rest of its presentation.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dw_core::{Component, Reply, StateDefinition, StateId, TerminalKind, condition};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::EngineConfig;
use crate::session::Session;

/// Where the engine sends what the player sees.
pub trait Outbox: Send + Sync {
    /// Send a plain text message.
    fn emit_text(&self, text: String);
    /// Offer a menu. Entries are already interpolated and in menu order.
    fn emit_choice_menu(&self, choices: Vec<String>);
}

/// A message bound for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A chat message.
    Text(String),
    /// A reply menu, entries in menu order.
    Menu(Vec<String>),
}

impl Outbound {
    /// Render for a plain-text transport.
    pub fn render(&self) -> String {
        match self {
            Outbound::Text(text) => text.clone(),
            Outbound::Menu(choices) => render_menu(choices),
        }
    }
}

/// Render choices as numbered `1) text` lines.
pub fn render_menu(choices: &[String]) -> String {
    choices
        .iter()
        .enumerate()
        .map(|(i, choice)| format!("{}) {choice}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lay out menu buttons numbered `1..=count`.
///
/// Up to three buttons share one row; longer menus put the last two
/// buttons on a second row.
pub fn button_rows(count: usize) -> Vec<Vec<usize>> {
    match count {
        0 => Vec::new(),
        1..=3 => vec![(1..=count).collect()],
        _ => vec![(1..=count - 2).collect(), (count - 1..=count).collect()],
    }
}

impl Outbox for UnboundedSender<Outbound> {
    fn emit_text(&self, text: String) {
        if self.send(Outbound::Text(text)).is_err() {
            tracing::debug!("outbound channel closed, dropping text");
        }
    }

    fn emit_choice_menu(&self, choices: Vec<String>) {
        if self.send(Outbound::Menu(choices)).is_err() {
            tracing::debug!("outbound channel closed, dropping menu");
        }
    }
}

/// An [`Outbox`] that records everything sent to it.
#[derive(Debug, Default)]
pub struct Transcript {
    sent: Mutex<Vec<Outbound>>,
}

impl Transcript {
    /// An empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn messages(&self) -> Vec<Outbound> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, message: Outbound) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

impl Outbox for Transcript {
    fn emit_text(&self, text: String) {
        self.push(Outbound::Text(text));
    }

    fn emit_choice_menu(&self, choices: Vec<String>) {
        self.push(Outbound::Menu(choices));
    }
}

/// How a presentation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// A menu with this many entries was offered.
    Menu(usize),
    /// No reply was eligible; nothing was offered.
    DeadEnd,
    /// The state was terminal and its closing phrase was sent.
    Ended(TerminalKind),
}

/// Present `state` to the player owning `session`.
///
/// The caller records the visit before presenting. On a terminal state the
/// closing phrase is sent and the caller is expected to drop the session.
pub async fn present(
    session: &mut Session,
    state: &StateDefinition,
    config: &EngineConfig,
    outbox: &impl Outbox,
) -> Presentation {
    let mut buffer = String::new();

    for block in &state.message_blocks {
        if !condition::evaluate(block.condition.as_ref(), session) {
            continue;
        }
        for component in &block.components {
            match component {
                Component::Text { text } => buffer.push_str(text),
                Component::Break { wait_secs } => {
                    flush(&mut buffer, session, outbox);
                    pause(*wait_secs, config.wait_scale).await;
                }
                Component::Modifier(change) => session.apply(change),
                Component::Money { gain } => {
                    let amount = session.credit(gain, config.money_threshold);
                    tracing::debug!(state = state.id, amount, total = session.money(), "money gained");
                }
            }
        }
    }
    flush(&mut buffer, session, outbox);

    match state.terminal {
        TerminalKind::Lethal => {
            outbox.emit_text(config.phrases.defeat.clone());
            Presentation::Ended(TerminalKind::Lethal)
        }
        TerminalKind::Victory => {
            outbox.emit_text(config.phrases.victory.clone());
            Presentation::Ended(TerminalKind::Victory)
        }
        TerminalKind::None => offer_replies(session, state.id, &state.replies, outbox),
    }
}

fn flush(buffer: &mut String, session: &Session, outbox: &impl Outbox) {
    if !buffer.trim().is_empty() {
        outbox.emit_text(session.interpolate(buffer));
    }
    buffer.clear();
}

async fn pause(wait_secs: u64, scale: f64) {
    if wait_secs == 0 {
        return;
    }
    let delay = Duration::try_from_secs_f64(wait_secs as f64 * scale).unwrap_or_default();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn offer_replies(
    session: &mut Session,
    state: StateId,
    replies: &[Reply],
    outbox: &impl Outbox,
) -> Presentation {
    let eligible: Vec<Reply> = replies
        .iter()
        .filter(|reply| condition::evaluate(reply.condition.as_ref(), session))
        .cloned()
        .collect();
    let choices: Vec<String> = eligible
        .iter()
        .map(|reply| session.interpolate(&reply.text))
        .collect();
    session.offer(eligible);

    if choices.is_empty() {
        tracing::warn!(state, "no eligible replies, player is stuck");
        return Presentation::DeadEnd;
    }
    let count = choices.len();
    outbox.emit_choice_menu(choices);
    Presentation::Menu(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_core::{Condition, MessageBlock, ModifierChange, MoneyGain};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> Session {
        Session::new("Ava", StdRng::seed_from_u64(3))
    }

    fn texts(messages: &[Outbound]) -> Vec<String> {
        messages.iter().map(Outbound::render).collect()
    }

    #[test]
    fn menu_rendering() {
        let menu = render_menu(&["Go".to_string(), "Stay".to_string()]);
        assert_eq!(menu, "1) Go\n2) Stay");
    }

    #[test]
    fn button_layout() {
        assert!(button_rows(0).is_empty());
        assert_eq!(button_rows(3), vec![vec![1, 2, 3]]);
        assert_eq!(button_rows(5), vec![vec![1, 2, 3], vec![4, 5]]);
        assert_eq!(button_rows(4), vec![vec![1, 2], vec![3, 4]]);
    }

    #[tokio::test(start_paused = true)]
    async fn break_splits_messages_and_waits() {
        let state = StateDefinition::new(1)
            .with_block(MessageBlock::new(vec![
                Component::text("Hello {char_name}"),
                Component::Break { wait_secs: 3 },
                Component::text("  "),
                Component::Break { wait_secs: 0 },
                Component::text("Again"),
            ]))
            .with_terminal(TerminalKind::Victory);
        let outbox = Transcript::new();
        let mut s = session();

        let started = tokio::time::Instant::now();
        let result = present(&mut s, &state, &EngineConfig::default(), &outbox).await;

        assert_eq!(result, Presentation::Ended(TerminalKind::Victory));
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(
            texts(&outbox.take()),
            vec![
                "Hello Ava".to_string(),
                "Again".to_string(),
                EngineConfig::default().phrases.victory
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wait_scale_shortens_breaks() {
        let state = StateDefinition::new(1)
            .with_block(MessageBlock::new(vec![Component::Break { wait_secs: 10 }]))
            .with_reply(Reply::new("On", 1));
        let config = EngineConfig::default().with_wait_scale(0.0);
        let started = tokio::time::Instant::now();
        present(&mut session(), &state, &config, &Transcript::new()).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn false_blocks_are_skipped_with_their_effects() {
        let state = StateDefinition::new(1)
            .with_block(MessageBlock::conditional(
                Condition::parse("lamp").unwrap(),
                vec![
                    Component::text("Lit."),
                    Component::Modifier(ModifierChange::add("seen")),
                ],
            ))
            .with_block(MessageBlock::conditional(
                Condition::parse("not lamp").unwrap(),
                vec![Component::text("Dark.")],
            ))
            .with_reply(Reply::new("On", 1));
        let outbox = Transcript::new();
        let mut s = session();
        present(&mut s, &state, &EngineConfig::default(), &outbox).await;

        assert_eq!(outbox.take()[0], Outbound::Text("Dark.".to_string()));
        assert!(s.modifiers().all(|m| m != "seen"));
    }

    #[tokio::test]
    async fn effects_apply_in_document_order() {
        let state = StateDefinition::new(1)
            .with_block(MessageBlock::new(vec![
                Component::Modifier(ModifierChange::add("lamp")),
                Component::Money {
                    gain: MoneyGain::Fixed(15),
                },
                Component::text("{money} coins"),
            ]))
            .with_block(MessageBlock::conditional(
                Condition::parse("lamp and money").unwrap(),
                vec![Component::text(", and the lamp")],
            ))
            .with_reply(Reply::new("On", 1));
        let outbox = Transcript::new();
        let mut s = session();
        present(&mut s, &state, &EngineConfig::default(), &outbox).await;

        assert_eq!(
            outbox.take()[0],
            Outbound::Text("15 coins, and the lamp".to_string())
        );
    }

    #[tokio::test]
    async fn replies_are_filtered_and_renumbered() {
        let state = StateDefinition::new(1)
            .with_reply(Reply::new("Always", 2))
            .with_reply(Reply::new("Hidden", 3).with_condition(Condition::parse("key").unwrap()))
            .with_reply(Reply::new("Also {char_name}", 4));
        let outbox = Transcript::new();
        let mut s = session();
        let result = present(&mut s, &state, &EngineConfig::default(), &outbox).await;

        assert_eq!(result, Presentation::Menu(2));
        assert_eq!(
            outbox.take(),
            vec![Outbound::Menu(vec![
                "Always".to_string(),
                "Also Ava".to_string()
            ])]
        );
        assert_eq!(s.destination(2), Some(4));
    }

    #[tokio::test]
    async fn dead_end_sends_no_menu() {
        let state = StateDefinition::new(1)
            .with_block(MessageBlock::new(vec![Component::text("Stuck.")]))
            .with_reply(Reply::new("Hidden", 1).with_condition(Condition::parse("key").unwrap()));
        let outbox = Transcript::new();
        let mut s = session();
        let result = present(&mut s, &state, &EngineConfig::default(), &outbox).await;

        assert_eq!(result, Presentation::DeadEnd);
        assert_eq!(outbox.take(), vec![Outbound::Text("Stuck.".to_string())]);
        assert!(s.offered().is_empty());
    }

    #[tokio::test]
    async fn lethal_state_sends_defeat_phrase() {
        let state = StateDefinition::new(6)
            .with_block(MessageBlock::new(vec![Component::text("You fall.")]))
            .with_terminal(TerminalKind::Lethal);
        let outbox = Transcript::new();
        let result = present(&mut session(), &state, &EngineConfig::default(), &outbox).await;

        assert_eq!(result, Presentation::Ended(TerminalKind::Lethal));
        assert_eq!(
            texts(&outbox.take()),
            vec![
                "You fall.".to_string(),
                EngineConfig::default().phrases.defeat
            ]
        );
    }

    #[tokio::test]
    async fn channel_outbox_forwards_messages() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.emit_text("hi".to_string());
        tx.emit_choice_menu(vec!["a".to_string()]);
        assert_eq!(rx.recv().await, Some(Outbound::Text("hi".to_string())));
        assert_eq!(rx.recv().await, Some(Outbound::Menu(vec!["a".to_string()])));
    }
}
