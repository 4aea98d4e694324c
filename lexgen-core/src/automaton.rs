//! Pattern automata and their runtime instances
//!
//! A [`PatternAutomaton`] is the immutable entry/accept pair of one compiled
//! pattern. An [`AutomatonInstance`] simulates it over the shared [`Graph`] by
//! tracking the set of currently active states.

use crate::graph::{Graph, StateId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The entry and accept states of one compiled pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternAutomaton {
    entry: StateId,
    accept: StateId,
}

impl PatternAutomaton {
    pub fn new(entry: StateId, accept: StateId) -> Self {
        PatternAutomaton { entry, accept }
    }

    pub fn entry(&self) -> StateId {
        self.entry
    }

    pub fn accept(&self) -> StateId {
        self.accept
    }

    /// Create a fresh instance positioned at the start of the pattern
    pub fn instantiate<'g>(&self, graph: &'g Graph) -> AutomatonInstance<'g> {
        AutomatonInstance::new(*self, graph)
    }

    /// Whether the pattern accepts the whole of `input`
    pub fn matches(&self, graph: &Graph, input: &str) -> bool {
        let mut instance = self.instantiate(graph);
        for symbol in input.chars() {
            instance.consume(symbol);
            if instance.is_dead() {
                return false;
            }
        }
        instance.is_accepting()
    }
}

/// A running simulation of one [`PatternAutomaton`]
///
/// Instances are cheap and private to one tokenizing session; the graph they
/// read from is shared and never modified.
#[derive(Debug, Clone)]
pub struct AutomatonInstance<'g> {
    graph: &'g Graph,
    pattern: PatternAutomaton,
    active: HashSet<StateId>,
    accepting: bool,
}

impl<'g> AutomatonInstance<'g> {
    pub fn new(pattern: PatternAutomaton, graph: &'g Graph) -> Self {
        let mut instance = AutomatonInstance {
            graph,
            pattern,
            active: HashSet::new(),
            accepting: false,
        };
        instance.reset();
        instance
    }

    /// Return to the epsilon-closure of the entry state
    pub fn reset(&mut self) {
        self.close([self.pattern.entry]);
    }

    /// Advance every active state over `symbol`
    ///
    /// If no active state has an edge on `symbol` the instance dies and stays
    /// dead until [`reset`](Self::reset).
    pub fn consume(&mut self, symbol: char) {
        let next: Vec<StateId> = self
            .active
            .iter()
            .filter_map(|&state| self.graph.target(state, symbol))
            .collect();
        self.close(next);
    }

    /// Whether the active set contains the accept state
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Whether the active set is empty
    pub fn is_dead(&self) -> bool {
        self.active.is_empty()
    }

    pub fn pattern(&self) -> PatternAutomaton {
        self.pattern
    }

    pub fn active_states(&self) -> &HashSet<StateId> {
        &self.active
    }

    /// Replace the active set with the epsilon-closure of `seeds`
    fn close(&mut self, seeds: impl IntoIterator<Item = StateId>) {
        self.active.clear();
        let mut stack = Vec::new();
        for state in seeds {
            if self.active.insert(state) {
                stack.push(state);
            }
        }

        while let Some(state) = stack.pop() {
            for target in self.graph.epsilon_targets(state) {
                if self.active.insert(target) {
                    stack.push(target);
                }
            }
        }

        self.accepting = self.active.contains(&self.pattern.accept);
    }
}
