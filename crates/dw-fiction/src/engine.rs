//! The per-user state machine.
//!
//! Every user moves through `Idle → AwaitingName → Playing → … → AwaitingName`.
//! The engine keeps one [`Conversation`] per user behind its own async mutex:
//! events from the same user are handled one at a time, including across
//! break pauses, while other users proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use dw_core::{GameGraph, Lock, StateId, TerminalKind};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::EngineConfig;
use crate::error::FictionResult;
use crate::presenter::{Outbox, Presentation, present};
use crate::session::Session;

/// Transport-level identifier of a player.
pub type UserId = u64;

/// Lock input that opens the lock outright.
const LOCK_ANSWER: &str = "ASK";
/// Length of a lock code attempt.
const LOCK_CODE_LEN: usize = 3;
/// Lock input that falls through to the escape reply.
const LOCK_ESCAPE: &str = "1";

/// Something a player did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The player asked to (re)start.
    Start,
    /// A typed message.
    Text(String),
    /// A 1-based menu button.
    Choice(usize),
}

/// What a turn did. Player mistakes are outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The name prompt was sent.
    NamePrompted,
    /// The player entered and was shown this state.
    Presented(StateId),
    /// The selection was not on the menu. Nothing changed.
    InvalidChoice,
    /// Lock input was not understood. Nothing changed.
    NotUnderstood,
    /// The event does not apply in the current phase.
    Ignored,
    /// A terminal state ended the session.
    Ended(TerminalKind),
}

/// Where a user is in the conversation.
#[derive(Debug, Default)]
pub enum Conversation {
    /// The user never started.
    #[default]
    Idle,
    /// The next text message is taken as the character name.
    AwaitingName,
    /// A game is in progress.
    Playing(Session),
}

impl Conversation {
    /// The running session, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Conversation::Playing(session) => Some(session),
            _ => None,
        }
    }
}

type Slot = Arc<tokio::sync::Mutex<Conversation>>;

/// Runs conversations for any number of users over one shared graph.
pub struct Engine {
    graph: Arc<GameGraph>,
    config: EngineConfig,
    conversations: Mutex<HashMap<UserId, Slot>>,
}

impl Engine {
    /// An engine with no conversations yet.
    pub fn new(graph: impl Into<Arc<GameGraph>>, config: EngineConfig) -> Self {
        Self {
            graph: graph.into(),
            config,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, user: UserId) -> Slot {
        let mut conversations = self
            .conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(conversations.entry(user).or_default())
    }

    /// Look at a user's conversation, waiting for any turn in progress.
    ///
    /// Unknown users are seen as [`Conversation::Idle`] and are not registered.
    pub async fn inspect<R>(&self, user: UserId, f: impl FnOnce(&Conversation) -> R) -> R {
        let slot = self
            .conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .cloned();
        match slot {
            Some(slot) => f(&*slot.lock().await),
            None => f(&Conversation::Idle),
        }
    }

    /// Handle one event from `user`, sending everything the player sees to `outbox`.
    pub async fn handle(
        &self,
        user: UserId,
        event: Event,
        outbox: &impl Outbox,
    ) -> FictionResult<TurnOutcome> {
        let slot = self.slot(user);
        let mut conversation = slot.lock().await;

        let outcome = match event {
            Event::Start => self.start(&mut conversation, outbox),
            Event::Text(text) => match &mut *conversation {
                Conversation::Idle => {
                    tracing::debug!(user, "ignoring text before start");
                    TurnOutcome::Ignored
                }
                Conversation::AwaitingName => {
                    self.provide_name(&mut conversation, &text, outbox).await?
                }
                Conversation::Playing(session) => self.text(session, &text, outbox).await?,
            },
            Event::Choice(selection) => match &mut *conversation {
                Conversation::Playing(session) => self.choose(session, selection, outbox).await?,
                _ => {
                    tracing::debug!(user, selection, "ignoring choice outside a game");
                    TurnOutcome::Ignored
                }
            },
        };

        if let TurnOutcome::Ended(kind) = outcome {
            tracing::info!(user, ?kind, "session ended");
            *conversation = Conversation::AwaitingName;
        }
        tracing::debug!(user, ?outcome, "turn handled");
        Ok(outcome)
    }

    /// Prompt for a name, dropping any game in progress.
    fn start(&self, conversation: &mut Conversation, outbox: &impl Outbox) -> TurnOutcome {
        *conversation = Conversation::AwaitingName;
        outbox.emit_text(self.config.phrases.name_prompt.clone());
        TurnOutcome::NamePrompted
    }

    /// Begin a fresh session named `name` and present the entry state.
    async fn provide_name(
        &self,
        conversation: &mut Conversation,
        name: &str,
        outbox: &impl Outbox,
    ) -> FictionResult<TurnOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let mut session = Session::new(name, self.session_rng());
        outbox.emit_text(session.interpolate(&self.config.phrases.name_accepted));

        let entry = self.graph.entry()?;
        let outcome = match present(&mut session, entry, &self.config, outbox).await {
            Presentation::Ended(kind) => TurnOutcome::Ended(kind),
            _ => TurnOutcome::Presented(entry.id),
        };
        *conversation = Conversation::Playing(session);
        Ok(outcome)
    }

    /// Route typed text: through the lock protocol when the current state
    /// has a lock, otherwise as a menu number.
    async fn text(
        &self,
        session: &mut Session,
        text: &str,
        outbox: &impl Outbox,
    ) -> FictionResult<TurnOutcome> {
        let input = text.trim();
        let state = self.graph.state(session.current_state())?;

        if let Some(lock) = &state.lock {
            return self.unlock(session, lock, input, outbox).await;
        }

        match input.parse::<usize>() {
            Ok(selection) => self.choose(session, selection, outbox).await,
            Err(_) => {
                tracing::debug!(state = state.id, input, "ignoring non-numeric input");
                Ok(TurnOutcome::Ignored)
            }
        }
    }

    /// The lock protocol, in priority order: the answer word opens the lock,
    /// any other three-letter code trips it, `1` falls through to the escape
    /// reply, and anything else gets a nudge.
    async fn unlock(
        &self,
        session: &mut Session,
        lock: &Lock,
        input: &str,
        outbox: &impl Outbox,
    ) -> FictionResult<TurnOutcome> {
        if input.eq_ignore_ascii_case(LOCK_ANSWER) {
            tracing::debug!(kind = %lock.kind, "lock opened");
            self.transition(session, lock.correct, outbox).await
        } else if input.len() == LOCK_CODE_LEN && input.chars().all(|c| c.is_ascii_alphabetic()) {
            tracing::debug!(kind = %lock.kind, input, "wrong code");
            self.transition(session, lock.wrong, outbox).await
        } else if input == LOCK_ESCAPE {
            self.choose(session, 1, outbox).await
        } else {
            outbox.emit_text(self.config.phrases.not_understood.clone());
            Ok(TurnOutcome::NotUnderstood)
        }
    }

    /// Follow a 1-based selection from the last menu.
    async fn choose(
        &self,
        session: &mut Session,
        selection: usize,
        outbox: &impl Outbox,
    ) -> FictionResult<TurnOutcome> {
        match session.destination(selection) {
            Some(destination) => self.transition(session, destination, outbox).await,
            None => {
                outbox.emit_text(self.config.phrases.invalid_choice.clone());
                Ok(TurnOutcome::InvalidChoice)
            }
        }
    }

    async fn transition(
        &self,
        session: &mut Session,
        destination: StateId,
        outbox: &impl Outbox,
    ) -> FictionResult<TurnOutcome> {
        let state = self.graph.state(destination)?;
        session.visit(destination);
        Ok(match present(session, state, &self.config, outbox).await {
            Presentation::Ended(kind) => TurnOutcome::Ended(kind),
            _ => TurnOutcome::Presented(destination),
        })
    }

    fn session_rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
