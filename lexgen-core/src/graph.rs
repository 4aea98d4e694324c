//! Shared transition graph
//!
//! Every pattern of a lexer is compiled into one [`Graph`]. The graph owns all
//! epsilon and symbol edges and hands out fresh state identifiers; compiled
//! patterns only remember their entry and accept states. States are never
//! removed, so identifiers double as indices into the state arena.

use crate::normalize::RegularDefinitions;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A state identifier, unique within one [`Graph`]
pub type StateId = u32;

/// Symbol used in patterns for an explicit empty transition
pub const EPSILON: char = '$';

/// Outgoing edges of a single state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Targets reachable without consuming input
    pub epsilon: BTreeSet<StateId>,
    /// At most one target per symbol
    pub transitions: BTreeMap<char, StateId>,
}

/// The store of all states and edges produced by one compilation session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    states: Vec<State>,
    definitions: RegularDefinitions,
}

impl Graph {
    /// Create an empty graph without regular definitions
    pub fn new() -> Self {
        Graph {
            states: Vec::new(),
            definitions: RegularDefinitions::new(),
        }
    }

    /// Create an empty graph bound to an already resolved definitions table
    pub fn with_definitions(definitions: RegularDefinitions) -> Self {
        Graph {
            states: Vec::new(),
            definitions,
        }
    }

    /// The regular definitions patterns are normalized against
    pub fn definitions(&self) -> &RegularDefinitions {
        &self.definitions
    }

    /// Allocate a new state and return its ID
    pub fn new_state(&mut self) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(State::default());
        id
    }

    /// Add an epsilon edge; duplicates are absorbed
    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from as usize].epsilon.insert(to);
    }

    /// Add an edge consuming `symbol`
    ///
    /// Symbol edges always leave a freshly allocated state, so a state never
    /// gains a second edge for the same symbol.
    pub fn add_transition(&mut self, from: StateId, symbol: char, to: StateId) {
        let previous = self.states[from as usize].transitions.insert(symbol, to);
        debug_assert!(
            previous.is_none() || previous == Some(to),
            "state {from} already has an edge on {symbol:?}"
        );
    }

    /// Epsilon successors of `state`
    pub fn epsilon_targets(&self, state: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.states
            .get(state as usize)
            .into_iter()
            .flat_map(|s| s.epsilon.iter().copied())
    }

    /// The target of `state` on `symbol`, if any
    pub fn target(&self, state: StateId, symbol: char) -> Option<StateId> {
        self.states
            .get(state as usize)
            .and_then(|s| s.transitions.get(&symbol).copied())
    }

    /// Look up a state's edges
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id as usize)
    }

    /// Whether `id` was issued by this graph
    pub fn contains(&self, id: StateId) -> bool {
        (id as usize) < self.states.len()
    }

    /// Number of states issued so far
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Total number of epsilon and symbol edges
    pub fn edge_count(&self) -> usize {
        self.states
            .iter()
            .map(|s| s.epsilon.len() + s.transitions.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_ids_are_sequential() {
        let mut graph = Graph::new();
        assert_eq!(graph.new_state(), 0);
        assert_eq!(graph.new_state(), 1);
        assert_eq!(graph.new_state(), 2);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_epsilon_edges_are_a_set() {
        let mut graph = Graph::new();
        let a = graph.new_state();
        let b = graph.new_state();
        graph.add_epsilon(a, b);
        graph.add_epsilon(a, b);
        assert_eq!(graph.epsilon_targets(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_symbol_edge_lookup() {
        let mut graph = Graph::new();
        let a = graph.new_state();
        let b = graph.new_state();
        graph.add_transition(a, 'x', b);
        assert_eq!(graph.target(a, 'x'), Some(b));
        assert_eq!(graph.target(a, 'y'), None);
        assert_eq!(graph.target(b, 'x'), None);
    }

    #[test]
    fn test_unknown_state_has_no_edges() {
        let graph = Graph::new();
        assert!(!graph.contains(7));
        assert_eq!(graph.epsilon_targets(7).count(), 0);
        assert_eq!(graph.target(7, 'a'), None);
    }

    #[test]
    fn test_definitions_are_kept() {
        let mut defs = RegularDefinitions::new();
        defs.declare("d", "0|1");
        let graph = Graph::with_definitions(defs);
        assert_eq!(graph.definitions().get("d"), Some("0|1"));
    }
}
