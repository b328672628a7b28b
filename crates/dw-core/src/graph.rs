use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::state::{StateDefinition, StateId};

/// Pseudo-state used while the player is naming their character.
pub const NAME_INTAKE_STATE: StateId = 0;
/// The state every session starts in after name intake.
pub const ENTRY_STATE: StateId = 1;

/// The immutable graph of states a game is played on.
///
/// Built once at load time and shared read-only by every session. Construction
/// validates that ids are unique, that the entry state exists, and that every
/// reply and lock target resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<StateDefinition>", into = "Vec<StateDefinition>")]
pub struct GameGraph {
    states: BTreeMap<StateId, StateDefinition>,
}

impl GameGraph {
    /// Build and validate a graph from parsed states.
    pub fn new(states: impl IntoIterator<Item = StateDefinition>) -> GraphResult<Self> {
        let mut by_id = BTreeMap::new();
        for state in states {
            if state.id == NAME_INTAKE_STATE {
                return Err(GraphError::ReservedState(state.id));
            }
            let id = state.id;
            if by_id.insert(id, state).is_some() {
                return Err(GraphError::DuplicateState(id));
            }
        }

        if !by_id.contains_key(&ENTRY_STATE) {
            return Err(GraphError::MissingEntry);
        }

        for state in by_id.values() {
            if let Some(to) = state.targets().find(|t| !by_id.contains_key(t)) {
                return Err(GraphError::UnknownTarget { from: state.id, to });
            }
            if state.lock.is_some() && state.replies.is_empty() {
                return Err(GraphError::LockWithoutEscape(state.id));
            }
        }

        Ok(Self { states: by_id })
    }

    /// Look up a state by id.
    pub fn get(&self, id: StateId) -> Option<&StateDefinition> {
        self.states.get(&id)
    }

    /// Look up a state by id, failing with [`GraphError::UnknownState`].
    pub fn state(&self, id: StateId) -> GraphResult<&StateDefinition> {
        self.get(id).ok_or(GraphError::UnknownState(id))
    }

    /// The state sessions begin in.
    pub fn entry(&self) -> GraphResult<&StateDefinition> {
        self.state(ENTRY_STATE)
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the graph holds no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterate over states in ascending id order.
    pub fn states(&self) -> impl Iterator<Item = &StateDefinition> {
        self.states.values()
    }

    /// Ids of states that no other state leads to, excluding the entry.
    pub fn unreachable(&self) -> Vec<StateId> {
        let referenced: std::collections::BTreeSet<StateId> =
            self.states().flat_map(|s| s.targets()).collect();
        self.states
            .keys()
            .copied()
            .filter(|id| *id != ENTRY_STATE && !referenced.contains(id))
            .collect()
    }
}

impl TryFrom<Vec<StateDefinition>> for GameGraph {
    type Error = GraphError;

    fn try_from(states: Vec<StateDefinition>) -> Result<Self, Self::Error> {
        GameGraph::new(states)
    }
}

impl From<GameGraph> for Vec<StateDefinition> {
    fn from(graph: GameGraph) -> Self {
        graph.states.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Lock, Reply, TerminalKind};

    fn chain() -> Vec<StateDefinition> {
        vec![
            StateDefinition::new(1).with_reply(Reply::new("Go on", 2)),
            StateDefinition::new(2).with_reply(Reply::new("Again", 3)),
            StateDefinition::new(3).with_terminal(TerminalKind::Victory),
        ]
    }

    #[test]
    fn builds_valid_graph() {
        let graph = GameGraph::new(chain()).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.entry().unwrap().id, 1);
        assert_eq!(graph.state(3).unwrap().terminal, TerminalKind::Victory);
        assert_eq!(graph.state(7), Err(GraphError::UnknownState(7)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut states = chain();
        states.push(StateDefinition::new(2));
        assert_eq!(
            GameGraph::new(states).unwrap_err(),
            GraphError::DuplicateState(2)
        );
    }

    #[test]
    fn rejects_missing_entry() {
        let states = vec![StateDefinition::new(2).with_terminal(TerminalKind::Lethal)];
        assert_eq!(GameGraph::new(states).unwrap_err(), GraphError::MissingEntry);
    }

    #[test]
    fn rejects_reserved_id() {
        let mut states = chain();
        states.push(StateDefinition::new(0));
        assert_eq!(
            GameGraph::new(states).unwrap_err(),
            GraphError::ReservedState(0)
        );
    }

    #[test]
    fn rejects_dangling_reply() {
        let states = vec![StateDefinition::new(1).with_reply(Reply::new("Into the void", 42))];
        assert_eq!(
            GameGraph::new(states).unwrap_err(),
            GraphError::UnknownTarget { from: 1, to: 42 }
        );
    }

    #[test]
    fn rejects_dangling_lock_target() {
        let mut states = chain();
        states[1].lock = Some(Lock {
            kind: "code".to_string(),
            correct: 3,
            wrong: 99,
        });
        assert_eq!(
            GameGraph::new(states).unwrap_err(),
            GraphError::UnknownTarget { from: 2, to: 99 }
        );
    }

    #[test]
    fn rejects_lock_without_escape_reply() {
        let mut states = chain();
        states.push(StateDefinition::new(4).with_lock(Lock {
            kind: "code".to_string(),
            correct: 3,
            wrong: 1,
        }));
        assert_eq!(
            GameGraph::new(states).unwrap_err(),
            GraphError::LockWithoutEscape(4)
        );
    }

    #[test]
    fn finds_unreachable_states() {
        let mut states = chain();
        states.push(StateDefinition::new(8).with_terminal(TerminalKind::Lethal));
        let graph = GameGraph::new(states).unwrap();
        assert_eq!(graph.unreachable(), vec![8]);
    }

    #[test]
    fn json_round_trip() {
        let graph = GameGraph::new(chain()).unwrap();
        let json = serde_json::to_string(&graph).unwrap();
        let back: GameGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.states().count(), 3);

        let dangling = r#"[{"id":1,"message_blocks":[],"replies":[{"text":"x","condition":null,"destination":5}],"lock":null,"terminal":"none"}]"#;
        assert!(serde_json::from_str::<GameGraph>(dangling).is_err());
    }
}
