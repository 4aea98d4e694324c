//! Regular definition expansion
//!
//! Patterns may refer to named regular definitions with `{name}`. Before a
//! pattern is compiled every reference is replaced by `(` + definition + `)`.
//! Definitions may themselves reference other definitions; [`RegularDefinitions::resolve`]
//! expands all of them up front so that a single pass suffices afterwards.
//! A backslash in front of `{` keeps the brace literal.

use crate::compiler::{find_closing, is_escaped};
use crate::error::{MalformedKind, PatternError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const REFERENCE_OPEN: char = '{';
const REFERENCE_CLOSE: char = '}';

/// An ordered table of regular definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegularDefinitions {
    /// `(name, pattern)` in declaration order
    entries: Vec<(String, String)>,
}

impl RegularDefinitions {
    /// Create an empty table
    pub fn new() -> Self {
        RegularDefinitions {
            entries: Vec::new(),
        }
    }

    /// Declare a definition; redeclaring a name replaces its pattern
    pub fn declare(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        let name = name.into();
        let pattern = pattern.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = pattern,
            None => self.entries.push((name, pattern)),
        }
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_str())
    }

    /// Iterate over `(name, pattern)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand every definition so that none of them contains a reference
    ///
    /// # Errors
    /// `UndefinedReference` if a definition refers to an unknown name,
    /// `CyclicDefinition` if definitions refer to each other in a loop.
    pub fn resolve(&self) -> Result<RegularDefinitions, PatternError> {
        let mut cache = HashMap::new();
        let mut visiting = HashSet::new();
        let mut resolved = RegularDefinitions::new();

        for (name, _) in &self.entries {
            let expanded = self.resolve_entry(name, &mut cache, &mut visiting)?;
            resolved.declare(name.clone(), expanded);
        }

        log::debug!("resolved {} regular definitions", resolved.len());
        Ok(resolved)
    }

    fn resolve_entry(
        &self,
        name: &str,
        cache: &mut HashMap<String, String>,
        visiting: &mut HashSet<String>,
    ) -> Result<String, PatternError> {
        if let Some(done) = cache.get(name) {
            return Ok(done.clone());
        }
        let raw = self
            .get(name)
            .ok_or_else(|| PatternError::UndefinedReference(name.to_string()))?;
        if !visiting.insert(name.to_string()) {
            return Err(PatternError::CyclicDefinition(name.to_string()));
        }

        let expanded = expand(raw, |reference| {
            self.resolve_entry(reference, cache, visiting)
        })?;

        visiting.remove(name);
        cache.insert(name.to_string(), expanded.clone());
        Ok(expanded)
    }
}

/// Replace every `{name}` in `pattern` with its definition from `definitions`
///
/// The table is expected to be resolved already; definitions are substituted
/// verbatim without further expansion.
///
/// # Example
/// ```
/// use lexgen_core::{normalize, RegularDefinitions};
///
/// let mut defs = RegularDefinitions::new();
/// defs.declare("digit", "0|1");
/// assert_eq!(normalize("{digit}{digit}*", &defs).unwrap(), "(0|1)(0|1)*");
/// ```
pub fn normalize(pattern: &str, definitions: &RegularDefinitions) -> Result<String, PatternError> {
    expand(pattern, |name| {
        definitions
            .get(name)
            .map(str::to_string)
            .ok_or_else(|| PatternError::UndefinedReference(name.to_string()))
    })
}

fn expand<F>(pattern: &str, mut lookup: F) -> Result<String, PatternError>
where
    F: FnMut(&str) -> Result<String, PatternError>,
{
    let chars: Vec<char> = pattern.chars().collect();
    let mut output = String::with_capacity(pattern.len());
    let mut idx = 0;

    while idx < chars.len() {
        let c = chars[idx];
        if c == REFERENCE_OPEN && !is_escaped(&chars, idx) {
            let close = find_closing(&chars, idx, REFERENCE_OPEN, REFERENCE_CLOSE).ok_or_else(
                || PatternError::MalformedPattern {
                    pattern: pattern.to_string(),
                    position: idx,
                    kind: MalformedKind::UnclosedReference,
                },
            )?;
            let name: String = chars[idx + 1..close].iter().collect();
            let body = lookup(&name)?;

            output.push('(');
            output.push_str(&body);
            output.push(')');
            idx = close + 1;
        } else {
            output.push(c);
            idx += 1;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs(pairs: &[(&str, &str)]) -> RegularDefinitions {
        let mut table = RegularDefinitions::new();
        for (name, pattern) in pairs {
            table.declare(*name, *pattern);
        }
        table
    }

    #[test]
    fn test_normalize_without_references() {
        let table = RegularDefinitions::new();
        assert_eq!(normalize("ab|c*", &table).unwrap(), "ab|c*");
    }

    #[test]
    fn test_normalize_wraps_in_parens() {
        let table = defs(&[("digit", "0|1|2")]);
        assert_eq!(normalize("x{digit}", &table).unwrap(), "x(0|1|2)");
    }

    #[test]
    fn test_escaped_brace_is_kept() {
        let table = defs(&[("digit", "0")]);
        assert_eq!(normalize(r"\{digit\}", &table).unwrap(), r"\{digit\}");
    }

    #[test]
    fn test_double_backslash_does_not_escape_brace() {
        let table = defs(&[("d", "0")]);
        assert_eq!(normalize(r"\\{d}", &table).unwrap(), r"\\(0)");
    }

    #[test]
    fn test_undefined_reference() {
        let table = RegularDefinitions::new();
        assert_eq!(
            normalize("{nope}", &table),
            Err(PatternError::UndefinedReference("nope".to_string()))
        );
    }

    #[test]
    fn test_unclosed_reference() {
        let table = RegularDefinitions::new();
        let err = normalize("a{digit", &table).unwrap_err();
        assert!(matches!(
            err,
            PatternError::MalformedPattern {
                position: 1,
                kind: MalformedKind::UnclosedReference,
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_nested_definitions() {
        let table = defs(&[
            ("digit", "0|1"),
            ("hex", "{digit}|a|b"),
            ("number", "{hex}{hex}*"),
        ]);
        let resolved = table.resolve().unwrap();
        assert_eq!(resolved.get("digit"), Some("0|1"));
        assert_eq!(resolved.get("hex"), Some("(0|1)|a|b"));
        assert_eq!(resolved.get("number"), Some("((0|1)|a|b)((0|1)|a|b)*"));
    }

    #[test]
    fn test_resolve_keeps_declaration_order() {
        let table = defs(&[("b", "x"), ("a", "{b}")]);
        let resolved = table.resolve().unwrap();
        let names: Vec<_> = resolved.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_resolve_forward_reference() {
        let table = defs(&[("a", "{b}y"), ("b", "x")]);
        let resolved = table.resolve().unwrap();
        assert_eq!(resolved.get("a"), Some("(x)y"));
    }

    #[test]
    fn test_resolve_detects_cycle() {
        let table = defs(&[("a", "{b}"), ("b", "x|{a}")]);
        assert_eq!(
            table.resolve(),
            Err(PatternError::CyclicDefinition("a".to_string()))
        );
    }

    #[test]
    fn test_resolve_detects_self_reference() {
        let table = defs(&[("a", "x{a}")]);
        assert_eq!(
            table.resolve(),
            Err(PatternError::CyclicDefinition("a".to_string()))
        );
    }

    #[test]
    fn test_redeclare_replaces() {
        let mut table = defs(&[("a", "x")]);
        table.declare("a", "y");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a"), Some("y"));
    }
}
