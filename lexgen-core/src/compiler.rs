//! Pattern compilation into the shared graph
//!
//! This module implements Thompson's construction directly over the pattern
//! text. Each compiled pattern becomes a subgraph of a [`Graph`] delimited by
//! an entry and an accept state.
//!
//! Syntax (in order of precedence, lowest to highest):
//!   pattern  := choice ( '|' choice )*
//!   choice   := item*
//!   item     := atom '*'?
//!   atom     := literal | '\' char | '$' | '(' pattern ')'
//!
//! `$` is the empty transition. Escapes `\t`, `\n`, `\_` (space) and `\0`
//! (NUL) name special characters; any other escaped character stands for
//! itself. A `*` with nothing in front of it is a literal star.

use crate::automaton::PatternAutomaton;
use crate::error::{MalformedKind, PatternError};
use crate::graph::{EPSILON, Graph, StateId};
use crate::normalize::normalize;
use std::ops::Range;

const ESCAPE: char = '\\';
const KLEENE: char = '*';
const CHOICE: char = '|';
const GROUP_OPEN: char = '(';
const GROUP_CLOSE: char = ')';

/// Compile `pattern` into `graph`
///
/// `{name}` references are expanded against the graph's regular definitions
/// first.
pub fn compile(pattern: &str, graph: &mut Graph) -> Result<PatternAutomaton, PatternError> {
    Compiler::new(graph).compile(pattern)
}

/// Compiles patterns into a borrowed [`Graph`]
pub struct Compiler<'g> {
    graph: &'g mut Graph,
}

impl<'g> Compiler<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Compiler { graph }
    }

    /// Compile one pattern and return its entry/accept pair
    pub fn compile(&mut self, pattern: &str) -> Result<PatternAutomaton, PatternError> {
        let normalized = normalize(pattern, self.graph.definitions())?;
        let chars: Vec<char> = normalized.chars().collect();

        let (entry, accept) = self
            .compile_choices(&chars, 0)
            .map_err(|(position, kind)| PatternError::MalformedPattern {
                pattern: normalized.clone(),
                position,
                kind,
            })?;

        log::trace!("compiled `{pattern}` into states {entry}..{accept}");
        Ok(PatternAutomaton::new(entry, accept))
    }

    /// Compile a pattern that may contain top-level alternation
    ///
    /// `base` is the offset of `chars` in the normalized pattern and is only
    /// used for error positions.
    fn compile_choices(
        &mut self,
        chars: &[char],
        base: usize,
    ) -> Result<(StateId, StateId), (usize, MalformedKind)> {
        let choices = split_choices(chars);
        if choices.len() == 1 {
            return self.compile_sequence(chars, base);
        }

        let entry = self.graph.new_state();
        let accept = self.graph.new_state();

        for range in choices {
            let offset = base + range.start;
            let (s, a) = self.compile_choices(&chars[range], offset)?;
            self.graph.add_epsilon(entry, s);
            self.graph.add_epsilon(a, accept);
        }

        Ok((entry, accept))
    }

    /// Compile a single choice: a chain of atoms, each optionally starred
    fn compile_sequence(
        &mut self,
        chars: &[char],
        base: usize,
    ) -> Result<(StateId, StateId), (usize, MalformedKind)> {
        let entry = self.graph.new_state();
        let accept = self.graph.new_state();
        let mut last = entry;
        let mut idx = 0;

        while idx < chars.len() {
            let (mut start, mut end) = match chars[idx] {
                ESCAPE => {
                    let escaped = chars
                        .get(idx + 1)
                        .copied()
                        .ok_or((base + idx, MalformedKind::DanglingEscape))?;
                    idx += 1;
                    self.compile_symbol(unescape(escaped))
                }
                GROUP_OPEN => {
                    let close = find_closing(chars, idx, GROUP_OPEN, GROUP_CLOSE)
                        .ok_or((base + idx, MalformedKind::UnclosedGroup))?;
                    let inner = self.compile_choices(&chars[idx + 1..close], base + idx + 1)?;
                    idx = close;
                    inner
                }
                GROUP_CLOSE => return Err((base + idx, MalformedKind::UnmatchedParen)),
                EPSILON => self.compile_empty(),
                symbol => self.compile_symbol(symbol),
            };

            if chars.get(idx + 1) == Some(&KLEENE) {
                (start, end) = self.compile_star(start, end);
                idx += 1;
            }

            self.graph.add_epsilon(last, start);
            last = end;
            idx += 1;
        }

        self.graph.add_epsilon(last, accept);
        Ok((entry, accept))
    }

    /// Compile a single symbol edge between two fresh states
    fn compile_symbol(&mut self, symbol: char) -> (StateId, StateId) {
        let start = self.graph.new_state();
        let accept = self.graph.new_state();
        self.graph.add_transition(start, symbol, accept);
        (start, accept)
    }

    /// Compile an explicit empty transition
    fn compile_empty(&mut self) -> (StateId, StateId) {
        let start = self.graph.new_state();
        let accept = self.graph.new_state();
        self.graph.add_epsilon(start, accept);
        (start, accept)
    }

    /// Wrap an already compiled subgraph in a zero-or-more loop
    fn compile_star(&mut self, inner_start: StateId, inner_accept: StateId) -> (StateId, StateId) {
        let start = self.graph.new_state();
        let accept = self.graph.new_state();
        self.graph.add_epsilon(start, inner_start);
        self.graph.add_epsilon(start, accept);
        self.graph.add_epsilon(inner_accept, inner_start);
        self.graph.add_epsilon(inner_accept, accept);
        (start, accept)
    }
}

/// Map the character after a backslash to the symbol it stands for
pub fn unescape(symbol: char) -> char {
    match symbol {
        't' => '\t',
        'n' => '\n',
        '_' => ' ',
        '0' => '\0',
        other => other,
    }
}

/// Whether `chars[idx]` is preceded by an odd number of backslashes
pub(crate) fn is_escaped(chars: &[char], idx: usize) -> bool {
    chars[..idx]
        .iter()
        .rev()
        .take_while(|&&c| c == ESCAPE)
        .count()
        % 2
        == 1
}

/// Find the `close` matching the `open` at `open_idx`, skipping escaped
/// characters and nested pairs
pub(crate) fn find_closing(chars: &[char], open_idx: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, &c) in chars.iter().enumerate().skip(open_idx) {
        if is_escaped(chars, idx) {
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

/// Split on `|` outside of any group
fn split_choices(chars: &[char]) -> Vec<Range<usize>> {
    let mut choices = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;

    for (idx, &c) in chars.iter().enumerate() {
        if is_escaped(chars, idx) {
            continue;
        }
        match c {
            GROUP_OPEN => depth += 1,
            GROUP_CLOSE => depth -= 1,
            CHOICE if depth == 0 => {
                choices.push(start..idx);
                start = idx + 1;
            }
            _ => {}
        }
    }

    choices.push(start..chars.len());
    choices
}
