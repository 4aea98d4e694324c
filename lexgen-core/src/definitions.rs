//! Reader for the textual lexer definition format
//!
//! ```text
//! {digit} 0|1|2|3|4|5|6|7|8|9          regular definitions
//! %X S_start S_comment                 lexer states, the first one starts
//! %L NUMBER                            lexical units
//! <S_start>{digit}{digit}*             rule: state and pattern
//! {
//! NUMBER                               lexical unit, or `-` for none
//! VRATI_SE 1                           actions, one per line
//! }
//! ```
//!
//! Blank lines between entries are ignored.

use crate::action::Action;
use crate::bundle::LexerBundle;
use crate::compiler::compile;
use crate::error::{DefinitionError, PatternError, Result};
use crate::graph::Graph;
use crate::normalize::RegularDefinitions;
use crate::rule::{NO_LEXICAL_UNIT, Rule, StateTable};
use std::str::FromStr;

const STATES_HEADER: &str = "%X";
const UNITS_HEADER: &str = "%L";
const DEFINITION_OPEN: char = '{';
const DEFINITION_CLOSE: char = '}';
const STATE_OPEN: char = '<';
const STATE_CLOSE: char = '>';
const BLOCK_OPEN: &str = "{";
const BLOCK_CLOSE: &str = "}";

/// One rule as written in the definitions source
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    /// Lexer state the rule belongs to
    pub state: String,
    /// Raw pattern, before regular definitions are expanded
    pub pattern: String,
    /// Lexical unit, or `-`
    pub lexical_unit: String,
    pub actions: Vec<Action>,
    /// Line of the `<State>pattern` header
    pub line: usize,
}

/// A parsed, not yet compiled, lexer definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerDefinition {
    pub definitions: RegularDefinitions,
    /// Line each regular definition was declared on
    pub definition_lines: Vec<(String, usize)>,
    /// Lexer states in declaration order
    pub states: Vec<String>,
    pub lexical_units: Vec<String>,
    pub rules: Vec<RuleDefinition>,
}

impl LexerDefinition {
    /// The first declared state
    pub fn start_state(&self) -> &str {
        self.states.first().map(String::as_str).unwrap_or_default()
    }

    /// Compile every rule into one shared graph
    pub fn compile(&self) -> Result<LexerBundle> {
        let definitions = self
            .definitions
            .resolve()
            .map_err(|error| DefinitionError::Pattern {
                line: self.definition_line(&error),
                error,
            })?;

        let mut graph = Graph::with_definitions(definitions);
        let mut states = StateTable::new();
        for state in &self.states {
            states.declare_state(state.clone());
        }

        for rule in &self.rules {
            let pattern = compile(&rule.pattern, &mut graph).map_err(|error| {
                DefinitionError::Pattern {
                    line: rule.line,
                    error,
                }
            })?;
            states.push(
                rule.state.clone(),
                Rule::with_unit(&rule.lexical_unit, pattern, rule.actions.clone()),
            );
        }

        log::debug!(
            "compiled {} rules in {} states into {} graph states",
            self.rules.len(),
            self.states.len(),
            graph.len()
        );
        LexerBundle::new(self.start_state(), states, graph)
    }

    /// Best guess at the definition line a resolution error belongs to
    fn definition_line(&self, error: &PatternError) -> usize {
        let line_of = |name: &str| {
            self.definition_lines
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, line)| *line)
        };
        let found = match error {
            PatternError::CyclicDefinition(name) => line_of(name),
            PatternError::UndefinedReference(name) => {
                let reference = format!("{DEFINITION_OPEN}{name}{DEFINITION_CLOSE}");
                self.definitions
                    .iter()
                    .find(|(_, pattern)| pattern.contains(&reference))
                    .and_then(|(n, _)| line_of(n))
            }
            PatternError::MalformedPattern { pattern, .. } => self
                .definitions
                .iter()
                .find(|(_, p)| *p == pattern.as_str())
                .and_then(|(n, _)| line_of(n)),
        };
        found.unwrap_or(1)
    }
}

impl FromStr for LexerDefinition {
    type Err = DefinitionError;

    fn from_str(source: &str) -> std::result::Result<Self, Self::Err> {
        parse_definitions(source)
    }
}

/// Parse a definitions source
pub fn parse_definitions(source: &str) -> std::result::Result<LexerDefinition, DefinitionError> {
    DefinitionParser::new(source).parse()
}

struct DefinitionParser<'a> {
    /// Non-blank lines with their 1-based numbers
    lines: Vec<(usize, &'a str)>,
    pos: usize,
    total_lines: usize,
}

impl<'a> DefinitionParser<'a> {
    fn new(source: &'a str) -> Self {
        let lines: Vec<(usize, &str)> = source
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)))
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();
        DefinitionParser {
            lines,
            pos: 0,
            total_lines: source.lines().count(),
        }
    }

    fn peek(&self) -> Option<(usize, &'a str)> {
        self.lines.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<(usize, &'a str)> {
        let line = self.peek();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    /// Line number to report when input ends early
    fn end_line(&self) -> usize {
        self.total_lines + 1
    }

    fn parse(mut self) -> std::result::Result<LexerDefinition, DefinitionError> {
        let mut definition = LexerDefinition::default();

        self.parse_regular_definitions(&mut definition)?;
        definition.states = self.parse_header(STATES_HEADER, "`%X` state declaration")?;
        if definition.states.is_empty() {
            let line = self.lines[self.pos - 1].0;
            return Err(DefinitionError::NoStates { line });
        }
        definition.lexical_units = self.parse_header(UNITS_HEADER, "`%L` lexical units")?;

        while self.peek().is_some() {
            let rule = self.parse_rule(&definition)?;
            definition.rules.push(rule);
        }

        log::debug!(
            "parsed {} regular definitions, {} states, {} rules",
            definition.definitions.len(),
            definition.states.len(),
            definition.rules.len()
        );
        Ok(definition)
    }

    fn parse_regular_definitions(
        &mut self,
        definition: &mut LexerDefinition,
    ) -> std::result::Result<(), DefinitionError> {
        while let Some((line, text)) = self.peek() {
            if !text.starts_with(DEFINITION_OPEN) {
                break;
            }
            self.pos += 1;

            let close = text
                .find(DEFINITION_CLOSE)
                .ok_or(DefinitionError::MalformedDefinition { line })?;
            let name = &text[1..close];
            let pattern = text[close + 1..]
                .strip_prefix(' ')
                .ok_or(DefinitionError::MalformedDefinition { line })?;
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(DefinitionError::MalformedDefinition { line });
            }

            definition.definitions.declare(name, pattern);
            definition.definition_lines.push((name.to_string(), line));
        }
        Ok(())
    }

    fn parse_header(
        &mut self,
        header: &str,
        expected: &'static str,
    ) -> std::result::Result<Vec<String>, DefinitionError> {
        let (line, text) = self.advance().ok_or(DefinitionError::MissingHeader {
            line: self.end_line(),
            expected,
        })?;
        let rest = text
            .strip_prefix(header)
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            .ok_or(DefinitionError::MissingHeader { line, expected })?;
        Ok(rest.split_whitespace().map(str::to_string).collect())
    }

    fn parse_rule(
        &mut self,
        definition: &LexerDefinition,
    ) -> std::result::Result<RuleDefinition, DefinitionError> {
        let (line, header) = self
            .advance()
            .ok_or(DefinitionError::ExpectedRule { line: self.end_line() })?;
        let close = header
            .strip_prefix(STATE_OPEN)
            .and_then(|rest| rest.find(STATE_CLOSE))
            .ok_or(DefinitionError::ExpectedRule { line })?;
        // `close` is relative to the text after `<`.
        let state = &header[1..close + 1];
        let pattern = &header[close + 2..];
        if !definition.states.iter().any(|s| s == state) {
            return Err(DefinitionError::UnknownState {
                line,
                name: state.to_string(),
            });
        }

        match self.advance() {
            Some((_, text)) if text.trim() == BLOCK_OPEN => {}
            _ => return Err(DefinitionError::UnterminatedRule { line }),
        }

        let (unit_line, unit) = self
            .advance()
            .ok_or(DefinitionError::UnterminatedRule { line })?;
        let unit = unit.trim();
        if unit == BLOCK_CLOSE {
            return Err(DefinitionError::UnterminatedRule { line });
        }
        if unit != NO_LEXICAL_UNIT && !definition.lexical_units.iter().any(|u| u == unit) {
            return Err(DefinitionError::UnknownLexicalUnit {
                line: unit_line,
                name: unit.to_string(),
            });
        }

        let mut actions = Vec::new();
        loop {
            let (action_line, text) = self
                .advance()
                .ok_or(DefinitionError::UnterminatedRule { line })?;
            if text.trim() == BLOCK_CLOSE {
                break;
            }
            let action = Action::parse(text, action_line)?;
            if let Action::SwitchState(target) = &action
                && !definition.states.iter().any(|s| s == target)
            {
                return Err(DefinitionError::UnknownState {
                    line: action_line,
                    name: target.clone(),
                });
            }
            actions.push(action);
        }

        Ok(RuleDefinition {
            state: state.to_string(),
            pattern: pattern.to_string(),
            lexical_unit: unit.to_string(),
            actions,
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexgenError;
    use crate::tokenizer::tokenize;

    const SIMPLE: &str = "\
{digit} 0|1|2|3|4|5|6|7|8|9
{number} {digit}{digit}*
%X S_start S_comment
%L NUMBER PLUS
<S_start>{number}
{
NUMBER
}
<S_start>+
{
PLUS
}

<S_start>\\_
{
-
}
<S_start>\\n
{
-
NOVI_REDAK
}
<S_start>#
{
-
UDJI_U_STANJE S_comment
}
<S_comment>\\n
{
-
NOVI_REDAK
UDJI_U_STANJE S_start
}
<S_comment>(a|b|c|\\_)
{
-
}
";

    #[test]
    fn test_parse_sections() {
        let definition = parse_definitions(SIMPLE).unwrap();
        assert_eq!(definition.definitions.len(), 2);
        assert_eq!(definition.definitions.get("number"), Some("{digit}{digit}*"));
        assert_eq!(definition.states, vec!["S_start", "S_comment"]);
        assert_eq!(definition.start_state(), "S_start");
        assert_eq!(definition.lexical_units, vec!["NUMBER", "PLUS"]);
        assert_eq!(definition.rules.len(), 7);
    }

    #[test]
    fn test_parse_rule_details() {
        let definition: LexerDefinition = SIMPLE.parse().unwrap();
        let rule = &definition.rules[5];
        assert_eq!(rule.state, "S_comment");
        assert_eq!(rule.pattern, "\\n");
        assert_eq!(rule.lexical_unit, "-");
        assert_eq!(
            rule.actions,
            vec![
                Action::IncrementLine,
                Action::SwitchState("S_start".to_string())
            ]
        );
        assert_eq!(definition.rules[2].line, 14);
    }

    #[test]
    fn test_compile_and_tokenize() {
        let bundle = parse_definitions(SIMPLE).unwrap().compile().unwrap();
        let stream = tokenize(&bundle, "12 + 3 # a b\n40+").unwrap();
        let rendered: Vec<String> = stream.tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["NUMBER 1 12", "PLUS 1 +", "NUMBER 1 3", "NUMBER 2 40", "PLUS 2 +"]
        );
        assert!(stream.errors.is_empty());
    }

    #[test]
    fn test_missing_state_header() {
        let err = parse_definitions("{a} x\n%L A\n").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::MissingHeader {
                line: 2,
                expected: "`%X` state declaration",
            }
        );
    }

    #[test]
    fn test_missing_units_header_at_end() {
        let err = parse_definitions("%X S\n").unwrap_err();
        assert!(matches!(err, DefinitionError::MissingHeader { line: 2, .. }));
    }

    #[test]
    fn test_no_states() {
        let err = parse_definitions("%X\n%L A\n").unwrap_err();
        assert_eq!(err, DefinitionError::NoStates { line: 1 });
    }

    #[test]
    fn test_malformed_regular_definition() {
        let err = parse_definitions("{digit}0|1\n%X S\n%L A\n").unwrap_err();
        assert_eq!(err, DefinitionError::MalformedDefinition { line: 1 });
    }

    #[test]
    fn test_unknown_state_in_rule() {
        let err = parse_definitions("%X S\n%L A\n<T>a\n{\nA\n}\n").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownState {
                line: 3,
                name: "T".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_switch_target() {
        let err =
            parse_definitions("%X S\n%L A\n<S>a\n{\nA\nUDJI_U_STANJE T\n}\n").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownState {
                line: 6,
                name: "T".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_lexical_unit() {
        let err = parse_definitions("%X S\n%L A\n<S>a\n{\nB\n}\n").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownLexicalUnit {
                line: 5,
                name: "B".to_string(),
            }
        );
    }

    #[test]
    fn test_unsupported_action_reports_line() {
        let err = parse_definitions("%X S\n%L A\n<S>a\n{\nA\nSKOK\n}\n").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnsupportedAction {
                line: 6,
                name: "SKOK".to_string(),
            }
        );
    }

    #[test]
    fn test_unterminated_rule() {
        let err = parse_definitions("%X S\n%L A\n<S>a\n{\nA\n").unwrap_err();
        assert_eq!(err, DefinitionError::UnterminatedRule { line: 3 });

        let err = parse_definitions("%X S\n%L A\n<S>a\nA\n}\n").unwrap_err();
        assert_eq!(err, DefinitionError::UnterminatedRule { line: 3 });
    }

    #[test]
    fn test_expected_rule_header() {
        let err = parse_definitions("%X S\n%L A\nS>a\n").unwrap_err();
        assert_eq!(err, DefinitionError::ExpectedRule { line: 3 });
    }

    #[test]
    fn test_pattern_with_angle_bracket() {
        let definition = parse_definitions("%X S\n%L OP\n<S>>|<\n{\nOP\n}\n").unwrap();
        assert_eq!(definition.rules[0].pattern, ">|<");
    }

    #[test]
    fn test_compile_reports_pattern_line() {
        let definition = parse_definitions("%X S\n%L A\n<S>a\n{\nA\n}\n<S>(b\n{\nA\n}\n").unwrap();
        match definition.compile() {
            Err(LexgenError::Definition(DefinitionError::Pattern { line, .. })) => {
                assert_eq!(line, 7)
            }
            other => panic!("expected pattern error, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_reports_cyclic_definition_line() {
        let definition =
            parse_definitions("{a} {b}\n{b} x|{a}\n%X S\n%L A\n<S>{a}\n{\nA\n}\n").unwrap();
        match definition.compile() {
            Err(LexgenError::Definition(DefinitionError::Pattern { line, error })) => {
                assert_eq!(error, PatternError::CyclicDefinition("a".to_string()));
                assert_eq!(line, 1);
            }
            other => panic!("expected cyclic definition, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_reports_undefined_reference_line() {
        let definition =
            parse_definitions("{a} x\n{b} {nope}\n%X S\n%L A\n<S>{a}\n{\nA\n}\n").unwrap();
        match definition.compile() {
            Err(LexgenError::Definition(DefinitionError::Pattern { line, error })) => {
                assert_eq!(error, PatternError::UndefinedReference("nope".to_string()));
                assert_eq!(line, 2);
            }
            other => panic!("expected undefined reference, got {other:?}"),
        }
    }

    #[test]
    fn test_states_without_rules_are_kept() {
        let bundle = parse_definitions("%X S Idle\n%L A\n<S>a\n{\nA\n}\n")
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(bundle.rules("Idle"), Some(&[][..]));
    }

    #[test]
    fn test_crlf_line_endings() {
        let definition = parse_definitions("%X S\r\n%L A\r\n<S>a\r\n{\r\nA\r\n}\r\n").unwrap();
        assert_eq!(definition.rules[0].pattern, "a");
        assert_eq!(definition.rules[0].lexical_unit, "A");
    }
}
