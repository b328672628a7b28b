//! Condition expressions.
//!
//! A condition is a conjunction of atoms separated by the word `and`.
//! Each atom is a token, optionally preceded by `not`. An all-digit token
//! tests the visited-state history; any other token tests the modifier set.
//! There is no `or` and no grouping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConditionError;
use crate::state::StateId;

const CONJUNCTION: &str = "and";
const NEGATION: &str = "not";

/// What a condition is evaluated against.
pub trait History {
    /// Whether the state was visited at any point in the session.
    fn has_visited(&self, state: StateId) -> bool;
    /// Whether the modifier tag is currently set.
    fn has_modifier(&self, tag: &str) -> bool;
}

/// The membership test performed by a single atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Test {
    /// The state id appears in the visited history.
    Visited(StateId),
    /// The tag is in the modifier set.
    Modifier(String),
}

/// One term of a conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    /// Written with a leading `not`.
    pub negated: bool,
    /// The membership test to perform.
    pub test: Test,
}

impl Atom {
    /// Evaluate this atom alone. `not` flips only this atom.
    pub fn evaluate(&self, history: &impl History) -> bool {
        let present = match &self.test {
            Test::Visited(state) => history.has_visited(*state),
            Test::Modifier(tag) => history.has_modifier(tag),
        };
        present != self.negated
    }

    fn from_words(words: &[&str], source: &str) -> Result<Self, ConditionError> {
        let (negated, token) = match words {
            [] => return Err(ConditionError::EmptyAtom(source.trim().to_string())),
            [token] if *token != NEGATION => (false, *token),
            [NEGATION, token] => (true, *token),
            _ => return Err(ConditionError::InvalidAtom(words.join(" "))),
        };

        let test = if token.chars().all(|c| c.is_ascii_digit()) {
            let state = token
                .parse::<StateId>()
                .map_err(|_| ConditionError::StateOutOfRange(token.to_string()))?;
            Test::Visited(state)
        } else {
            Test::Modifier(token.to_string())
        };

        Ok(Atom { negated, test })
    }
}

impl FromStr for Atom {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        Atom::from_words(&words, s)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{NEGATION} ")?;
        }
        match &self.test {
            Test::Visited(state) => write!(f, "{state}"),
            Test::Modifier(tag) => write!(f, "{tag}"),
        }
    }
}

/// A parsed conjunction of atoms. Always holds at least one atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    atoms: Vec<Atom>,
}

impl Condition {
    /// Parse a condition expression such as `key and not 12`.
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let words: Vec<&str> = source.split_whitespace().collect();
        if words.is_empty() {
            return Err(ConditionError::Empty);
        }
        let atoms = words
            .split(|word| *word == CONJUNCTION)
            .map(|terms| Atom::from_words(terms, source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { atoms })
    }

    /// The atoms in source order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Strict conjunction with early exit on the first failing atom.
    pub fn evaluate(&self, history: &impl History) -> bool {
        self.atoms.iter().all(|atom| atom.evaluate(history))
    }
}

/// Evaluate an optional condition; a missing condition always holds.
pub fn evaluate(condition: Option<&Condition>, history: &impl History) -> bool {
    condition.is_none_or(|c| c.evaluate(history))
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::parse(s)
    }
}

impl TryFrom<String> for Condition {
    type Error = ConditionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Condition::parse(&value)
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                write!(f, " {CONJUNCTION} ")?;
            }
            write!(f, "{atom}")?;
        }
        Ok(())
    }
}
