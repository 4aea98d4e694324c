//! Lexer rules and the per-state rule table

use crate::action::Action;
use crate::automaton::PatternAutomaton;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lexical unit marker meaning "emit nothing"
pub const NO_LEXICAL_UNIT: &str = "-";

/// A compiled pattern with the token it produces and the actions it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    lexical_unit: Option<String>,
    pattern: PatternAutomaton,
    actions: Vec<Action>,
}

impl Rule {
    pub fn new(
        lexical_unit: Option<String>,
        pattern: PatternAutomaton,
        actions: Vec<Action>,
    ) -> Self {
        Rule {
            lexical_unit,
            pattern,
            actions,
        }
    }

    /// Build a rule from the textual unit, where `-` means no unit
    pub fn with_unit(unit: &str, pattern: PatternAutomaton, actions: Vec<Action>) -> Self {
        let lexical_unit = (unit != NO_LEXICAL_UNIT).then(|| unit.to_string());
        Rule::new(lexical_unit, pattern, actions)
    }

    /// The token tag, or `None` if matches are suppressed
    pub fn lexical_unit(&self) -> Option<&str> {
        self.lexical_unit.as_deref()
    }

    pub fn pattern(&self) -> PatternAutomaton {
        self.pattern
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// Maps each lexer state to its rules in declaration order
///
/// Rule order is the tie-break priority between equally long matches and is
/// never changed after insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTable {
    states: BTreeMap<String, Vec<Rule>>,
}

impl StateTable {
    pub fn new() -> Self {
        StateTable {
            states: BTreeMap::new(),
        }
    }

    /// Make sure `state` exists, possibly without rules
    pub fn declare_state(&mut self, state: impl Into<String>) {
        self.states.entry(state.into()).or_default();
    }

    /// Append a rule to `state`, declaring the state if needed
    pub fn push(&mut self, state: impl Into<String>, rule: Rule) {
        self.states.entry(state.into()).or_default().push(rule);
    }

    /// The rules of `state`, or `None` if it was never declared
    pub fn rules(&self, state: &str) -> Option<&[Rule]> {
        self.states.get(state).map(Vec::as_slice)
    }

    pub fn contains(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }

    /// State names in sorted order
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// All `(state, rule)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.states
            .iter()
            .flat_map(|(state, rules)| rules.iter().map(move |rule| (state.as_str(), rule)))
    }

    /// Total number of rules over all states
    pub fn rule_count(&self) -> usize {
        self.states.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(unit: &str, entry: u32) -> Rule {
        Rule::with_unit(unit, PatternAutomaton::new(entry, entry + 1), Vec::new())
    }

    #[test]
    fn test_dash_means_no_unit() {
        assert_eq!(rule("-", 0).lexical_unit(), None);
        assert_eq!(rule("IDN", 0).lexical_unit(), Some("IDN"));
    }

    #[test]
    fn test_rules_keep_insertion_order() {
        let mut table = StateTable::new();
        table.push("S", rule("A", 0));
        table.push("S", rule("B", 2));
        table.push("S", rule("C", 4));

        let units: Vec<_> = table
            .rules("S")
            .unwrap()
            .iter()
            .map(|r| r.lexical_unit().unwrap())
            .collect();
        assert_eq!(units, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_declared_state_without_rules() {
        let mut table = StateTable::new();
        table.declare_state("Empty");
        assert!(table.contains("Empty"));
        assert_eq!(table.rules("Empty"), Some(&[][..]));
        assert_eq!(table.rules("Missing"), None);
    }

    #[test]
    fn test_counts_and_iteration() {
        let mut table = StateTable::new();
        table.push("B", rule("X", 0));
        table.push("A", rule("Y", 2));
        table.push("A", rule("-", 4));

        assert_eq!(table.rule_count(), 3);
        assert_eq!(table.state_names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(table.iter().count(), 3);
    }
}
