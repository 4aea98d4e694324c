//! Error types for the lexer generator
//!
//! Errors are grouped by the phase that raises them: pattern compilation,
//! reading the definitions source, and loading or persisting a compiled
//! bundle. Lexical errors found while tokenizing are not fatal and are
//! reported as [`LexicalError`] diagnostics instead.

use thiserror::Error;

/// The main error type for the lexer generator
#[derive(Error, Debug)]
pub enum LexgenError {
    /// A pattern or regular definition could not be compiled
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// The definitions source is malformed
    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// A compiled bundle is internally inconsistent
    #[error("invalid bundle: {0}")]
    Bundle(String),

    /// Reading input or writing output failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A bundle could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while normalizing or compiling a single pattern
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    /// The pattern is not well formed
    #[error("malformed pattern `{pattern}` at position {position}: {kind}")]
    MalformedPattern {
        /// The pattern being compiled
        pattern: String,
        /// Character offset of the problem
        position: usize,
        /// What is wrong with it
        kind: MalformedKind,
    },

    /// A `{name}` reference has no matching regular definition
    #[error("undefined regular definition '{{{0}}}'")]
    UndefinedReference(String),

    /// Regular definitions reference each other in a cycle
    #[error("cyclic regular definition '{{{0}}}'")]
    CyclicDefinition(String),
}

/// Specific kinds of malformed patterns
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// `(` without a matching `)`
    #[error("unclosed group")]
    UnclosedGroup,

    /// `)` without a matching `(`
    #[error("unmatched `)`")]
    UnmatchedParen,

    /// `{` without a matching `}`
    #[error("unclosed regular definition reference")]
    UnclosedReference,

    /// Pattern ends with a lone backslash
    #[error("dangling escape at end of pattern")]
    DanglingEscape,
}

/// Errors in the textual definitions source
///
/// Every variant carries the 1-based line the problem was found on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// A mandatory header line is missing
    #[error("line {line}: expected {expected}")]
    MissingHeader {
        line: usize,
        expected: &'static str,
    },

    /// A `{name} pattern` line could not be split
    #[error("line {line}: malformed regular definition")]
    MalformedDefinition { line: usize },

    /// The line should start a rule but does not
    #[error("line {line}: expected a rule header `<State>pattern`")]
    ExpectedRule { line: usize },

    /// A rule block is missing `{`, its lexical unit, or the closing `}`
    #[error("line {line}: rule block is not terminated")]
    UnterminatedRule { line: usize },

    /// An action keyword that is not recognised
    #[error("line {line}: action `{name}` is not supported")]
    UnsupportedAction { line: usize, name: String },

    /// An action with a missing or bad argument
    #[error("line {line}: invalid argument for `{action}`: {reason}")]
    InvalidActionArgument {
        line: usize,
        action: String,
        reason: String,
    },

    /// A lexer state that was not declared in the `%X` line
    #[error("line {line}: unknown lexer state `{name}`")]
    UnknownState { line: usize, name: String },

    /// A lexical unit that was not declared in the `%L` line
    #[error("line {line}: unknown lexical unit `{name}`")]
    UnknownLexicalUnit { line: usize, name: String },

    /// The `%X` line declares no states
    #[error("line {line}: no lexer states declared")]
    NoStates { line: usize },

    /// A pattern on this line failed to compile
    #[error("line {line}: {error}")]
    Pattern { line: usize, error: PatternError },
}

impl DefinitionError {
    /// The line the error refers to
    pub fn line(&self) -> usize {
        match self {
            DefinitionError::MissingHeader { line, .. }
            | DefinitionError::MalformedDefinition { line }
            | DefinitionError::ExpectedRule { line }
            | DefinitionError::UnterminatedRule { line }
            | DefinitionError::UnsupportedAction { line, .. }
            | DefinitionError::InvalidActionArgument { line, .. }
            | DefinitionError::UnknownState { line, .. }
            | DefinitionError::UnknownLexicalUnit { line, .. }
            | DefinitionError::NoStates { line }
            | DefinitionError::Pattern { line, .. } => *line,
        }
    }
}

/// A position where no rule matched
///
/// The tokenizer recovers by skipping one character; these diagnostics make
/// the skipped input observable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: no rule matches {character:?} at offset {position}")]
pub struct LexicalError {
    /// Character offset in the input
    pub position: usize,
    /// Line counter at the time of the error
    pub line: usize,
    /// The skipped character
    pub character: char,
}

/// Result type alias for lexer generator operations
pub type Result<T> = std::result::Result<T, LexgenError>;
