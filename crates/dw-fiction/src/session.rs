//! Per-user game progress.

use std::collections::BTreeSet;
use std::fmt::Write;

use dw_core::{
    ENTRY_STATE, History, ModifierAction, ModifierChange, MoneyGain, Reply, StateId,
};
use rand::rngs::StdRng;

/// Tag added once a session's balance reaches the money threshold.
pub const MONEY_TAG: &str = "money";

const CHAR_NAME: &str = "{char_name}";
const LAST_EARN: &str = "{last_earn}";
const MONEY: &str = "{money}";

/// One player's progress through a game.
///
/// Created at name intake and dropped when a terminal state is reached or
/// the player starts over.
#[derive(Debug)]
pub struct Session {
    char_name: String,
    visited: Vec<StateId>,
    modifiers: BTreeSet<String>,
    money: u32,
    last_earn: Option<u32>,
    offered: Vec<Reply>,
    rng: StdRng,
}

impl Session {
    /// A fresh session standing in the entry state.
    pub fn new(char_name: impl Into<String>, rng: StdRng) -> Self {
        Self {
            char_name: char_name.into(),
            visited: vec![ENTRY_STATE],
            modifiers: BTreeSet::new(),
            money: 0,
            last_earn: None,
            offered: Vec::new(),
            rng,
        }
    }

    /// The name given at intake.
    pub fn char_name(&self) -> &str {
        &self.char_name
    }

    /// The state the player is in: always the last visited one.
    pub fn current_state(&self) -> StateId {
        self.visited.last().copied().unwrap_or(ENTRY_STATE)
    }

    /// Every state entered so far, in order, repeats included.
    pub fn visited(&self) -> &[StateId] {
        &self.visited
    }

    /// Record entering a state.
    pub fn visit(&mut self, state: StateId) {
        self.visited.push(state);
    }

    /// Current modifier tags, sorted.
    pub fn modifiers(&self) -> impl Iterator<Item = &str> {
        self.modifiers.iter().map(String::as_str)
    }

    /// Current balance.
    pub fn money(&self) -> u32 {
        self.money
    }

    /// The most recent money gain, if any.
    pub fn last_earn(&self) -> Option<u32> {
        self.last_earn
    }

    /// Apply a modifier change. Removing an absent tag does nothing.
    pub fn apply(&mut self, change: &ModifierChange) {
        match change.action {
            ModifierAction::Add => {
                self.modifiers.insert(change.tag.clone());
            }
            ModifierAction::Remove => {
                self.modifiers.remove(&change.tag);
            }
        }
    }

    /// Resolve and credit a money gain, returning the amount.
    ///
    /// Reaching `threshold` adds [`MONEY_TAG`]; the tag is never taken away
    /// automatically.
    pub fn credit(&mut self, gain: &MoneyGain, threshold: u32) -> u32 {
        let amount = gain.resolve(&mut self.rng);
        self.last_earn = Some(amount);
        self.money = self.money.saturating_add(amount);
        if self.money >= threshold {
            self.modifiers.insert(MONEY_TAG.to_string());
        }
        amount
    }

    /// Remember the replies shown in the last menu, in menu order.
    pub fn offer(&mut self, replies: Vec<Reply>) {
        self.offered = replies;
    }

    /// Replies from the last menu.
    pub fn offered(&self) -> &[Reply] {
        &self.offered
    }

    /// Destination of a 1-based menu selection.
    pub fn destination(&self, selection: usize) -> Option<StateId> {
        selection
            .checked_sub(1)
            .and_then(|index| self.offered.get(index))
            .map(|reply| reply.destination)
    }

    /// Substitute `{char_name}`, `{last_earn}` and `{money}`.
    ///
    /// Values are inserted in a single pass, so braces inside a substituted
    /// value are never expanded. `{last_earn}` is empty until money is gained.
    pub fn interpolate(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix(CHAR_NAME) {
                out.push_str(&self.char_name);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(LAST_EARN) {
                if let Some(amount) = self.last_earn {
                    let _ = write!(out, "{amount}");
                }
                rest = after;
            } else if let Some(after) = tail.strip_prefix(MONEY) {
                let _ = write!(out, "{}", self.money);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl History for Session {
    fn has_visited(&self, state: StateId) -> bool {
        self.visited.contains(&state)
    }

    fn has_modifier(&self, tag: &str) -> bool {
        self.modifiers.contains(tag)
    }
}
