use super::module::{is_bracket, Module, Param, CLOSE_BRACKET, OPEN_BRACKET};
use super::Defines;
use crate::error::{PlantformError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ordered sequence of modules, e.g. `F(1)[+(30)F(0.5)]A`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParametricString {
    modules: Vec<Module>,
}

impl ParametricString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_modules(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    pub fn parse(input: &str) -> Result<Self> {
        parse_modules(input).map(Self::from_modules)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut Vec<Module> {
        &mut self.modules
    }

    pub fn into_modules(self) -> Vec<Module> {
        self.modules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Module> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Module> {
        self.modules.get_mut(index)
    }

    pub fn push(&mut self, module: Module) {
        self.modules.push(module);
    }

    pub fn insert(&mut self, index: usize, module: Module) {
        self.modules.insert(index, module);
    }

    pub fn remove(&mut self, index: usize) -> Module {
        self.modules.remove(index)
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }

    pub fn extend(&mut self, other: ParametricString) {
        self.modules.extend(other.modules);
    }

    /// Replace the module at `index` with the modules of `replacement`.
    pub fn splice_at(&mut self, index: usize, replacement: ParametricString) {
        self.modules
            .splice(index..index + 1, replacement.modules.into_iter());
    }

    /// Number of modules excluding brackets.
    pub fn len_without_brackets(&self) -> usize {
        self.modules.iter().filter(|m| !m.is_bracket()).count()
    }

    pub fn count_letter(&self, letter: char) -> usize {
        self.modules.iter().filter(|m| m.letter == letter).count()
    }

    pub fn contains_letter(&self, letter: char) -> bool {
        self.modules.iter().any(|m| m.letter == letter)
    }

    pub fn contains_letter_at_least(&self, letter: char, count: usize) -> bool {
        self.count_letter(letter) >= count
    }

    pub fn contains_all_letters_at_least(&self, letters: &[char], count: usize) -> bool {
        letters
            .iter()
            .all(|l| self.contains_letter_at_least(*l, count))
    }

    pub fn has_branches(&self) -> bool {
        self.contains_letter(OPEN_BRACKET)
    }

    pub fn first_index_of(&self, letter: char) -> Option<usize> {
        self.modules.iter().position(|m| m.letter == letter)
    }

    /// Remove the modules in `start..end`, clamped to the string.
    pub fn remove_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.modules.len());
        if start < end {
            self.modules.drain(start..end);
        }
    }

    /// Set every parameter of every `letter` module to `value`.
    pub fn set_params_of_letter(&mut self, letter: char, value: &Param) {
        for m in self.modules.iter_mut().filter(|m| m.letter == letter) {
            m.set_all_params(value.clone());
        }
    }

    /// Indices of every module that is not a bracket.
    pub fn actual_indices(&self) -> Vec<usize> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_bracket())
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct letters in order of first appearance.
    pub fn letters(&self) -> Vec<char> {
        let mut letters = Vec::new();
        for m in &self.modules {
            if !letters.contains(&m.letter) {
                letters.push(m.letter);
            }
        }
        letters
    }

    /// Every `]` closes a previous `[` and nothing stays open.
    pub fn is_balanced(&self) -> bool {
        let mut depth: i64 = 0;
        for m in &self.modules {
            match m.letter {
                OPEN_BRACKET => depth += 1,
                CLOSE_BRACKET => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        depth == 0
    }

    /// Replace every parameter that names a define with the define's value.
    pub fn evaluate_defines(&mut self, defines: &Defines) {
        if defines.is_empty() {
            return;
        }
        for m in self.modules.iter_mut() {
            for p in m.params.iter_mut() {
                if let Param::Symbol(name) = p {
                    if let Some(v) = defines.get(name.as_str()) {
                        *p = Param::Number(*v);
                    }
                }
            }
        }
    }

    pub fn reset_locks(&mut self) {
        for m in self.modules.iter_mut() {
            m.locked = false;
        }
    }
}

impl fmt::Display for ParametricString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modules {
            write!(f, "{}", m)?;
        }
        Ok(())
    }
}

impl FromStr for ParametricString {
    type Err = PlantformError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Vec<Module>> for ParametricString {
    fn from(modules: Vec<Module>) -> Self {
        Self::from_modules(modules)
    }
}

impl<'a> IntoIterator for &'a ParametricString {
    type Item = &'a Module;
    type IntoIter = std::slice::Iter<'a, Module>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

fn parse_modules(input: &str) -> Result<Vec<Module>> {
    let text = input.trim();
    let chars: Vec<char> = text.chars().collect();
    let mut modules = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' | ')' | ',' | ';' | '|' => {
                return Err(PlantformError::parse(
                    text,
                    i,
                    format!("unexpected '{}'", c),
                ));
            }
            c if c.is_whitespace() => {
                return Err(PlantformError::parse(text, i, "unexpected whitespace"));
            }
            _ => {}
        }

        let mut params = Vec::new();
        let mut next = i + 1;
        if chars.get(next) == Some(&'(') {
            if is_bracket(c) {
                return Err(PlantformError::parse(
                    text,
                    next,
                    "brackets cannot carry parameters",
                ));
            }
            let close = find_closing(&chars, next).map_err(|pos| {
                PlantformError::parse(text, pos, "invalid character inside parameter list")
            })?;
            let close = close.ok_or_else(|| PlantformError::parse(text, next, "unclosed '('"))?;
            let content: String = chars[next + 1..close].iter().collect();
            if !content.is_empty() {
                for raw in content.split(',') {
                    let raw = raw.trim();
                    if raw.is_empty() {
                        return Err(PlantformError::parse(text, next, "empty parameter"));
                    }
                    params.push(Param::parse(raw));
                }
            }
            next = close + 1;
        }

        modules.push(Module {
            letter: c,
            params,
            locked: false,
        });
        i = next;
    }

    Ok(modules)
}

/// Position of the `)` matching the `(` at `open`. Nested parentheses, brackets
/// and separators are not valid inside a parameter list.
fn find_closing(chars: &[char], open: usize) -> std::result::Result<Option<usize>, usize> {
    for (offset, c) in chars[open + 1..].iter().enumerate() {
        let pos = open + 1 + offset;
        match c {
            ')' => return Ok(Some(pos)),
            '(' | '[' | ']' | ';' | '|' => return Err(pos),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let s = ParametricString::parse("F(1,x)[+(30)A]B").unwrap();
        assert_eq!(s.len(), 7);
        assert_eq!(s.get(0).unwrap().params.len(), 2);
        assert_eq!(s.get(0).unwrap().params[0], Param::Number(1.0));
        assert_eq!(s.get(0).unwrap().params[1], Param::symbol("x"));
        assert!(s.get(1).unwrap().is_open_bracket());
        assert_eq!(s.len_without_brackets(), 5);
    }

    #[test]
    fn test_empty_parens_mean_no_params() {
        let s = ParametricString::parse("F()").unwrap();
        assert_eq!(s.len(), 1);
        assert!(s.get(0).unwrap().params.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ParametricString::parse("F(1").is_err());
        assert!(ParametricString::parse("F)").is_err());
        assert!(ParametricString::parse("F A").is_err());
        assert!(ParametricString::parse("[(1)F]").is_err());
        assert!(ParametricString::parse("F(1,)").is_err());
        assert!(ParametricString::parse("F;A").is_err());
        assert!(ParametricString::parse("F|A").is_err());
        assert!(ParametricString::parse("F((1))").is_err());
    }

    #[test]
    fn test_parse_trims_input() {
        let s = ParametricString::parse("  FA \n").unwrap();
        assert_eq!(s.to_string(), "FA");
    }

    #[test]
    fn test_round_trip() {
        let text = "!(0.5)F(1)[-(d0)A(x*1.2)][+(30)A(1)]";
        let s = ParametricString::parse(text).unwrap();
        assert_eq!(s.to_string(), text);
    }

    #[test]
    fn test_balance() {
        assert!(ParametricString::parse("F[A[B]]").unwrap().is_balanced());
        assert!(!ParametricString::parse("F[A").unwrap().is_balanced());
        assert!(!ParametricString::parse("]F[").unwrap().is_balanced());
    }

    #[test]
    fn test_evaluate_defines() {
        let mut defines = Defines::new();
        defines.insert("d0".to_string(), 0.25);
        let mut s = ParametricString::parse("F(d0)A(d1)").unwrap();
        s.evaluate_defines(&defines);
        assert_eq!(s.to_string(), "F(0.25)A(d1)");
    }
}
