//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FictionError, FictionResult};

/// Balance at which a session gains the `money` tag.
pub const DEFAULT_MONEY_THRESHOLD: u32 = 15;

/// Fixed messages the engine sends outside of state bodies.
///
/// `name_accepted` may use the same placeholders as state text. Any field
/// missing from a phrases file keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phrases {
    /// Sent on start, asking for a character name.
    pub name_prompt: String,
    /// Sent once the name is taken, before the entry state.
    pub name_accepted: String,
    /// Sent when a selection is not on the current menu.
    pub invalid_choice: String,
    /// Sent when lock input is neither a code nor the escape reply.
    pub not_understood: String,
    /// Sent after a lethal state.
    pub defeat: String,
    /// Sent after a victory state.
    pub victory: String,
}

impl Default for Phrases {
    fn default() -> Self {
        Self {
            name_prompt: "Welcome, dreamer. What is your character's name?".to_string(),
            name_accepted: "Nice to meet you, {char_name}. Close your eyes...".to_string(),
            invalid_choice: "There is no such option. Pick a number from the menu.".to_string(),
            not_understood: "Nothing happens. Try a three-letter code, or choose 1 to step back."
                .to_string(),
            defeat: "You wake up in a cold sweat. Send a name to dream again.".to_string(),
            victory: "You made it out. Send a name to dream again.".to_string(),
        }
    }
}

impl Phrases {
    /// Parse phrases from JSON.
    pub fn from_json(json: &str) -> FictionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read phrases from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> FictionResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FictionError::PhrasesIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Balance at which the `money` tag is added.
    pub money_threshold: u32,
    /// RNG seed for money rolls. `None` seeds each session from the OS.
    pub seed: Option<u64>,
    /// Multiplier applied to every break delay. `0.0` disables pauses.
    pub wait_scale: f64,
    /// Messages sent outside of state bodies.
    pub phrases: Phrases,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            money_threshold: DEFAULT_MONEY_THRESHOLD,
            seed: None,
            wait_scale: 1.0,
            phrases: Phrases::default(),
        }
    }
}

impl EngineConfig {
    /// Set the money threshold.
    pub fn with_money_threshold(mut self, threshold: u32) -> Self {
        self.money_threshold = threshold;
        self
    }

    /// Seed every session's RNG for reproducible play.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Scale break delays. Negative or non-finite values disable pauses.
    pub fn with_wait_scale(mut self, scale: f64) -> Self {
        self.wait_scale = if scale.is_finite() { scale.max(0.0) } else { 0.0 };
        self
    }

    /// Replace the phrase set.
    pub fn with_phrases(mut self, phrases: Phrases) -> Self {
        self.phrases = phrases;
        self
    }
}
