//! Actions run after a rule matches

use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keyword of the enter-state action in the definitions source
pub const ENTER_STATE: &str = "UDJI_U_STANJE";
/// Keyword of the go-back action
pub const GO_BACK: &str = "VRATI_SE";
/// Keyword of the line-increment action
pub const NEW_LINE: &str = "NOVI_REDAK";
/// Keyword of the suppress action
pub const SKIP: &str = "-";

/// An effect executed when a rule matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Continue tokenizing in the named lexer state
    SwitchState(String),
    /// Keep only the first `n` characters of the match
    GoBack(usize),
    /// Do not emit a token for this match
    Suppress,
    /// Increment the line counter
    IncrementLine,
}

impl Action {
    /// Parse an action line such as `VRATI_SE 2`
    ///
    /// `line` is only used for error reporting.
    pub fn parse(text: &str, line: usize) -> Result<Action, DefinitionError> {
        let mut words = text.split_whitespace();
        let name = words.next().unwrap_or_default();

        let action = match name {
            ENTER_STATE => {
                let state = words.next().ok_or_else(|| missing_argument(line, name))?;
                Action::SwitchState(state.to_string())
            }
            GO_BACK => {
                let count = words.next().ok_or_else(|| missing_argument(line, name))?;
                let count = count
                    .parse::<usize>()
                    .map_err(|e| DefinitionError::InvalidActionArgument {
                        line,
                        action: name.to_string(),
                        reason: format!("`{count}` is not a character count ({e})"),
                    })?;
                Action::GoBack(count)
            }
            NEW_LINE => Action::IncrementLine,
            SKIP => Action::Suppress,
            _ => {
                return Err(DefinitionError::UnsupportedAction {
                    line,
                    name: name.to_string(),
                });
            }
        };

        if let Some(extra) = words.next() {
            return Err(DefinitionError::InvalidActionArgument {
                line,
                action: name.to_string(),
                reason: format!("unexpected argument `{extra}`"),
            });
        }

        Ok(action)
    }
}

fn missing_argument(line: usize, action: &str) -> DefinitionError {
    DefinitionError::InvalidActionArgument {
        line,
        action: action.to_string(),
        reason: "missing argument".to_string(),
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SwitchState(state) => write!(f, "{ENTER_STATE} {state}"),
            Action::GoBack(count) => write!(f, "{GO_BACK} {count}"),
            Action::Suppress => write!(f, "{SKIP}"),
            Action::IncrementLine => write!(f, "{NEW_LINE}"),
        }
    }
}
