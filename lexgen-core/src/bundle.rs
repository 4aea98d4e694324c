//! The compiled lexer: start state, rule table and shared graph
//!
//! A bundle is everything the tokenizer needs. It is written to disk as JSON
//! by the generator and read back by the analyzer.

use crate::action::Action;
use crate::error::{LexgenError, Result};
use crate::graph::Graph;
use crate::rule::{Rule, StateTable};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A compiled lexer ready for tokenizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexerBundle {
    start_state: String,
    states: StateTable,
    graph: Graph,
}

impl LexerBundle {
    /// Assemble a bundle and check it for consistency
    pub fn new(start_state: impl Into<String>, states: StateTable, graph: Graph) -> Result<Self> {
        let bundle = LexerBundle {
            start_state: start_state.into(),
            states,
            graph,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn start_state(&self) -> &str {
        &self.start_state
    }

    pub fn states(&self) -> &StateTable {
        &self.states
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The rules of `state`, or `None` if the state is unknown
    pub fn rules(&self, state: &str) -> Option<&[Rule]> {
        self.states.rules(state)
    }

    /// Check that every name and state id the bundle refers to exists
    pub fn validate(&self) -> Result<()> {
        if !self.states.contains(&self.start_state) {
            return Err(LexgenError::Bundle(format!(
                "start state `{}` has no entry in the state table",
                self.start_state
            )));
        }

        for (state, rule) in self.states.iter() {
            let pattern = rule.pattern();
            if !self.graph.contains(pattern.entry()) || !self.graph.contains(pattern.accept()) {
                return Err(LexgenError::Bundle(format!(
                    "a rule of state `{state}` refers to states {}..{} outside the graph",
                    pattern.entry(),
                    pattern.accept()
                )));
            }
            for action in rule.actions() {
                if let Action::SwitchState(target) = action
                    && !self.states.contains(target)
                {
                    return Err(LexgenError::Bundle(format!(
                        "a rule of state `{state}` switches to unknown state `{target}`"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Serialize the bundle as JSON into `writer`
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Write the bundle to `path` as JSON
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        log::debug!(
            "saved bundle to {} ({} states, {} rules)",
            path.display(),
            self.graph.len(),
            self.states.rule_count()
        );
        Ok(())
    }

    /// Read and validate a bundle from JSON
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let bundle: LexerBundle = serde_json::from_reader(reader)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Read and validate a bundle from JSON bytes
    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        let bundle: LexerBundle = serde_json::from_slice(data)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Load a bundle previously written by [`save_json`](Self::save_json)
    pub fn load_json(path: &Path) -> Result<Self> {
        let bundle = Self::from_reader(BufReader::new(File::open(path)?))?;
        log::debug!(
            "loaded bundle from {} ({} states, {} rules)",
            path.display(),
            bundle.graph.len(),
            bundle.states.rule_count()
        );
        Ok(bundle)
    }
}
