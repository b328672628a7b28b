use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Numeric identifier of a state. Unique within a graph.
pub type StateId = u32;

/// One narrative state: its message body, replies, and optional lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDefinition {
    /// Unique id; `1` is the entry state.
    pub id: StateId,
    /// Body blocks in document order.
    pub message_blocks: Vec<MessageBlock>,
    /// The reply menu in document order. Empty for terminal states.
    pub replies: Vec<Reply>,
    /// Code-entry lock, if the body holds an `<input/>` tag.
    pub lock: Option<Lock>,
    /// Whether and how the state ends the session.
    pub terminal: TerminalKind,
}

impl StateDefinition {
    /// Create an empty, non-terminal state.
    pub fn new(id: StateId) -> Self {
        Self {
            id,
            message_blocks: Vec::new(),
            replies: Vec::new(),
            lock: None,
            terminal: TerminalKind::None,
        }
    }

    /// Append a message block.
    pub fn with_block(mut self, block: MessageBlock) -> Self {
        self.message_blocks.push(block);
        self
    }

    /// Append a reply.
    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    /// Attach a lock.
    pub fn with_lock(mut self, lock: Lock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Mark the state as terminal.
    pub fn with_terminal(mut self, terminal: TerminalKind) -> Self {
        self.terminal = terminal;
        self
    }

    /// Returns `true` for lethal and victory states.
    pub fn is_terminal(&self) -> bool {
        self.terminal != TerminalKind::None
    }

    /// Every state id this state can transition to, replies first, then lock targets.
    pub fn targets(&self) -> impl Iterator<Item = StateId> + '_ {
        self.replies
            .iter()
            .map(|r| r.destination)
            .chain(self.lock.iter().flat_map(|l| [l.correct, l.wrong]))
    }
}

/// How a terminal state ends the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalKind {
    /// Not terminal; the state offers replies.
    #[default]
    None,
    /// The player lost.
    Lethal,
    /// The player won.
    Victory,
}

/// A run of components shown only when its condition holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBlock {
    /// Gate for the whole block; `None` always shows.
    pub condition: Option<Condition>,
    /// Contents in document order.
    pub components: Vec<Component>,
}

impl MessageBlock {
    /// An unconditional block.
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            condition: None,
            components,
        }
    }

    /// A block gated by `condition`.
    pub fn conditional(condition: Condition, components: Vec<Component>) -> Self {
        Self {
            condition: Some(condition),
            components,
        }
    }
}

/// A piece of a message body, processed in order during presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    /// Literal text; may contain `{char_name}`, `{last_earn}` and `{money}`.
    Text {
        /// The fragment, with emphasis already collapsed.
        text: String,
    },
    /// Add or remove a modifier tag.
    Modifier(ModifierChange),
    /// Credit money to the session.
    Money {
        /// How much to credit.
        gain: MoneyGain,
    },
    /// Flush buffered text as its own message, then pause.
    Break {
        /// Pause length in seconds; `0` only splits the message.
        wait_secs: u64,
    },
}

impl Component {
    /// Shorthand for a [`Component::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Component::Text { text: text.into() }
    }
}

/// Whether a modifier change adds or removes its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierAction {
    /// `<mod TAG/>`
    Add,
    /// `<mod not TAG/>`
    Remove,
}

/// A change to the session's modifier set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierChange {
    /// The tag affected.
    pub tag: String,
    /// Add or remove.
    pub action: ModifierAction,
}

impl ModifierChange {
    /// Set `tag`.
    pub fn add(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            action: ModifierAction::Add,
        }
    }

    /// Clear `tag`. Clearing an absent tag is a no-op.
    pub fn remove(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            action: ModifierAction::Remove,
        }
    }
}

/// The amount a money component credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoneyGain {
    /// Always the same amount.
    Fixed(u32),
    /// Uniformly random in `1..=max`. `max` is at least 1.
    UpTo(u32),
}

impl MoneyGain {
    /// Resolve the amount to credit.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match *self {
            MoneyGain::Fixed(amount) => amount,
            MoneyGain::UpTo(max) => rng.random_range(1..=max.max(1)),
        }
    }
}

/// One entry of a state's reply menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Menu text, may hold placeholders.
    pub text: String,
    /// Shown only when this holds.
    pub condition: Option<Condition>,
    /// State entered when the reply is chosen.
    pub destination: StateId,
}

impl Reply {
    /// An unconditional reply.
    pub fn new(text: impl Into<String>, destination: StateId) -> Self {
        Self {
            text: text.into(),
            condition: None,
            destination,
        }
    }

    /// Gate the reply behind a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Code-entry lock layered on top of a state's reply menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// Input kind named in the script (e.g. `code`).
    pub kind: String,
    /// Destination for the correct code.
    pub correct: StateId,
    /// Destination for any other three-letter code.
    pub wrong: StateId,
}
