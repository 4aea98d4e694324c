//! Lexgen Core Library
//!
//! A lexical-analyzer generator. Rules written as regular expressions are
//! compiled into one shared epsilon-NFA graph; the tokenizer simulates one
//! automaton per rule in parallel and picks the longest match, breaking ties
//! by rule order.

pub mod action;
pub mod automaton;
pub mod bundle;
pub mod compiler;
pub mod definitions;
pub mod error;
pub mod graph;
pub mod normalize;
pub mod rule;
pub mod tokenizer;

pub use action::Action;
pub use automaton::{AutomatonInstance, PatternAutomaton};
pub use bundle::LexerBundle;
pub use compiler::{Compiler, compile};
pub use definitions::{LexerDefinition, RuleDefinition, parse_definitions};
pub use error::{
    DefinitionError, LexgenError, LexicalError, MalformedKind, PatternError, Result,
};
pub use graph::{EPSILON, Graph, State, StateId};
pub use normalize::{RegularDefinitions, normalize};
pub use rule::{NO_LEXICAL_UNIT, Rule, StateTable};
pub use tokenizer::{Token, TokenStream, Tokenizer, TokenizerStats, tokenize};

/// Parse a definitions source and compile it into a bundle
///
/// This is the main entry point of the generator.
pub fn generate(source: &str) -> Result<LexerBundle> {
    parse_definitions(source)?.compile()
}
