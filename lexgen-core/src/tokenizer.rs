//! Maximal-munch tokenizer
//!
//! The tokenizer runs one [`AutomatonInstance`] per rule of the current lexer
//! state in lock step. Each cycle scans forward from the token start while any
//! instance is alive and remembers the longest prefix some rule accepted; on
//! equal length the rule declared first wins. The winning rule's actions then
//! run, and a token is emitted unless the rule (or a `Suppress` action) says
//! otherwise. When nothing matches, one character is skipped and reported as
//! a [`LexicalError`].

use crate::action::Action;
use crate::automaton::AutomatonInstance;
use crate::bundle::LexerBundle;
use crate::error::{LexgenError, LexicalError, Result};
use crate::rule::Rule;
use std::fmt;

/// One emitted token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The lexical unit of the matching rule
    pub tag: String,
    /// Line counter at emission time
    pub line: usize,
    /// The matched text
    pub lexeme: String,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.tag, self.line, self.lexeme)
    }
}

/// Counters collected while tokenizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    /// Tokens emitted
    pub tokens: usize,
    /// Matches that produced no token
    pub suppressed: usize,
    /// Characters consumed by matches
    pub matched_chars: usize,
    /// Characters skipped by error recovery
    pub skipped_chars: usize,
}

/// Everything produced by tokenizing one input
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStream {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexicalError>,
    pub stats: TokenizerStats,
}

/// Tokenize `input` to completion
pub fn tokenize(bundle: &LexerBundle, input: &str) -> Result<TokenStream> {
    let mut tokenizer = Tokenizer::new(bundle, input)?;
    let tokens: Vec<Token> = tokenizer.by_ref().collect();
    Ok(TokenStream {
        tokens,
        errors: tokenizer.errors,
        stats: tokenizer.stats,
    })
}

/// A tokenizing session over one input
///
/// Yields tokens lazily through [`Iterator`]. Any number of sessions may share
/// one bundle; each keeps its own automaton instances.
pub struct Tokenizer<'b> {
    bundle: &'b LexerBundle,
    input: Vec<char>,
    state: &'b str,
    rules: &'b [Rule],
    instances: Vec<AutomatonInstance<'b>>,
    /// First character of the current token
    start: usize,
    /// End of the scanned prefix (exclusive)
    scan: usize,
    /// End of the best match so far (exclusive)
    last_accept: usize,
    line: usize,
    /// States entered through empty matches at the current `start`
    empty_entries: Vec<&'b str>,
    errors: Vec<LexicalError>,
    stats: TokenizerStats,
}

impl<'b> Tokenizer<'b> {
    /// Start a session in the bundle's start state
    pub fn new(bundle: &'b LexerBundle, input: &str) -> Result<Self> {
        let start_state = bundle.start_state();
        if bundle.rules(start_state).is_none() {
            return Err(LexgenError::Bundle(format!(
                "start state `{start_state}` has no entry in the state table"
            )));
        }

        let mut tokenizer = Tokenizer {
            bundle,
            input: input.chars().collect(),
            state: start_state,
            rules: &[],
            instances: Vec::new(),
            start: 0,
            scan: 0,
            last_accept: 0,
            line: 1,
            empty_entries: Vec::new(),
            errors: Vec::new(),
            stats: TokenizerStats::default(),
        };
        tokenizer.enter_state(start_state);
        Ok(tokenizer)
    }

    /// The current lexer state
    pub fn state(&self) -> &str {
        self.state
    }

    /// The current line counter
    pub fn line(&self) -> usize {
        self.line
    }

    /// Offset of the next character to tokenize
    pub fn position(&self) -> usize {
        self.start
    }

    /// Lexical errors recovered so far
    pub fn errors(&self) -> &[LexicalError] {
        &self.errors
    }

    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    /// Produce the next token, running suppressed matches and recovery
    /// along the way
    pub fn next_token(&mut self) -> Option<Token> {
        while self.start < self.input.len() {
            match self.scan() {
                Some((rule, end)) => {
                    if let Some(token) = self.apply(rule, end) {
                        return Some(token);
                    }
                }
                None => self.recover(),
            }
        }
        None
    }

    /// Switch to `state` and instantiate its rules
    fn enter_state(&mut self, state: &'b str) {
        log::trace!("entering lexer state `{state}`");
        self.state = state;
        self.rules = self.bundle.rules(state).unwrap_or_default();
        let graph = self.bundle.graph();
        self.instances = self
            .rules
            .iter()
            .map(|rule| rule.pattern().instantiate(graph))
            .collect();
    }

    fn reset_instances(&mut self) {
        for instance in &mut self.instances {
            instance.reset();
        }
    }

    /// Scan forward from the token start
    ///
    /// Returns the index of the winning rule and the end of its match.
    fn scan(&mut self) -> Option<(usize, usize)> {
        self.reset_instances();
        self.scan = self.start;
        self.last_accept = self.start;
        let mut best = None;

        while self.scan < self.input.len() {
            let symbol = self.input[self.scan];
            self.scan += 1;

            let mut alive = false;
            let mut accepted = false;
            for (idx, instance) in self.instances.iter_mut().enumerate() {
                if instance.is_dead() {
                    continue;
                }
                instance.consume(symbol);
                if instance.is_dead() {
                    continue;
                }
                alive = true;
                // First rule to accept at this length keeps priority.
                if !accepted && instance.is_accepting() {
                    accepted = true;
                    best = Some((idx, self.scan));
                }
            }

            if !alive {
                break;
            }
        }

        if let Some((_, end)) = best {
            self.last_accept = end;
        }
        best
    }

    /// Run the winning rule's actions and decide on emission
    fn apply(&mut self, rule_idx: usize, end: usize) -> Option<Token> {
        let rules = self.rules;
        let rule = &rules[rule_idx];
        let state_before = self.state;
        self.scan = end;
        self.last_accept = end;

        let mut lexical_unit = rule.lexical_unit();
        for action in rule.actions() {
            match action {
                Action::SwitchState(target) => self.enter_state(target),
                Action::GoBack(count) => self.go_back(*count),
                Action::Suppress => lexical_unit = None,
                Action::IncrementLine => self.line += 1,
            }
        }

        let end = self.last_accept;
        if end == self.start {
            // Empty matches may only move to states not yet visited at this
            // position; anything else would repeat forever.
            if self.empty_entries.is_empty() {
                self.empty_entries.push(state_before);
            }
            if self.empty_entries.contains(&self.state) {
                self.recover();
                return None;
            }
            self.empty_entries.push(self.state);
        } else {
            self.empty_entries.clear();
        }

        let lexeme: String = self.input[self.start..end].iter().collect();
        self.stats.matched_chars += end - self.start;
        self.start = end;

        match lexical_unit {
            Some(tag) => {
                log::trace!("{tag} {} {lexeme:?}", self.line);
                self.stats.tokens += 1;
                Some(Token {
                    tag: tag.to_string(),
                    line: self.line,
                    lexeme,
                })
            }
            None => {
                self.stats.suppressed += 1;
                None
            }
        }
    }

    /// Keep only the first `count` characters of the current match
    ///
    /// The instances are re-fed with the retained prefix so that they reflect
    /// exactly what was kept; the rest is scanned again by the next cycle.
    fn go_back(&mut self, count: usize) {
        let end = (self.start + count).min(self.last_accept);
        self.scan = end;
        self.last_accept = end;

        // Nothing reads the instances before the next scan resets them; they
        // still track the retained prefix so their state matches `last_accept`.
        self.reset_instances();
        let retained = &self.input[self.start..end];
        for instance in &mut self.instances {
            for &symbol in retained {
                instance.consume(symbol);
            }
        }
    }

    /// Skip the character at the token start and record the error
    fn recover(&mut self) {
        let error = LexicalError {
            position: self.start,
            line: self.line,
            character: self.input[self.start],
        };
        log::warn!("{error}");
        self.errors.push(error);
        self.stats.skipped_chars += 1;
        self.start += 1;
        self.empty_entries.clear();
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
