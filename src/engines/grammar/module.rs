use crate::error::{PlantformError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OPEN_BRACKET: char = '[';
pub const CLOSE_BRACKET: char = ']';

/// Letters that rotate the turtle.
pub const ORIENTATION_LETTERS: [char; 6] = ['+', '-', '&', '^', '/', '\\'];

/// Characters that can never be a module letter.
const RESERVED: [char; 5] = ['(', ')', ',', ';', '|'];

/// A module parameter: either a number or an unevaluated name/expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    Number(f64),
    Symbol(String),
}

impl Param {
    /// Numbers are only recognised when the text parses to a finite float.
    pub fn parse(text: &str) -> Param {
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Param::Number(v),
            _ => Param::Symbol(text.to_string()),
        }
    }

    pub fn symbol(name: impl Into<String>) -> Param {
        Param::Symbol(name.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Param::Number(v) => Some(*v),
            Param::Symbol(_) => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Param::Number(_) => None,
            Param::Symbol(s) => Some(s),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Number(v) => write!(f, "{}", v),
            Param::Symbol(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Number(v)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::parse(s)
    }
}

/// A single grammar symbol: one letter plus an ordered parameter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub letter: char,
    pub params: Vec<Param>,
    /// Set on modules produced during the current rewriting pass.
    #[serde(skip)]
    pub locked: bool,
}

impl Module {
    pub fn new(letter: char, params: Vec<Param>) -> Result<Self> {
        if !is_valid_letter(letter) {
            return Err(PlantformError::parse(
                &letter.to_string(),
                0,
                format!("'{}' cannot be used as a module letter", letter),
            ));
        }
        if is_bracket(letter) && !params.is_empty() {
            return Err(PlantformError::parse(
                &letter.to_string(),
                0,
                "brackets cannot carry parameters",
            ));
        }
        Ok(Self {
            letter,
            params,
            locked: false,
        })
    }

    /// A module without parameters. Reserved letters are rejected by the parser,
    /// callers building modules by hand are expected to use alphabet letters.
    pub fn bare(letter: char) -> Self {
        Self {
            letter,
            params: Vec::new(),
            locked: false,
        }
    }

    pub fn open_bracket() -> Self {
        Self::bare(OPEN_BRACKET)
    }

    pub fn close_bracket() -> Self {
        Self::bare(CLOSE_BRACKET)
    }

    pub fn is_bracket(&self) -> bool {
        is_bracket(self.letter)
    }

    pub fn is_open_bracket(&self) -> bool {
        self.letter == OPEN_BRACKET
    }

    pub fn is_close_bracket(&self) -> bool {
        self.letter == CLOSE_BRACKET
    }

    pub fn is_orientation(&self) -> bool {
        ORIENTATION_LETTERS.contains(&self.letter)
    }

    pub fn set_all_params(&mut self, value: Param) {
        for p in self.params.iter_mut() {
            *p = value.clone();
        }
    }
}

// The lock flag is scratch state of a rewriting pass, not part of identity.
impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.letter == other.letter && self.params == other.params
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter)?;
        if !self.params.is_empty() {
            write!(f, "(")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

pub fn is_bracket(letter: char) -> bool {
    letter == OPEN_BRACKET || letter == CLOSE_BRACKET
}

pub fn is_valid_letter(letter: char) -> bool {
    !letter.is_whitespace() && !RESERVED.contains(&letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_parse() {
        assert_eq!(Param::parse("1.5"), Param::Number(1.5));
        assert_eq!(Param::parse("x"), Param::symbol("x"));
        assert_eq!(Param::parse("x*1.2"), Param::symbol("x*1.2"));
        // Rust accepts these as floats, they still have to stay symbolic
        assert_eq!(Param::parse("inf"), Param::symbol("inf"));
        assert_eq!(Param::parse("NaN"), Param::symbol("NaN"));
    }

    #[test]
    fn test_module_display() {
        let m = Module::new('F', vec![Param::Number(2.0), Param::symbol("x")]).unwrap();
        assert_eq!(m.to_string(), "F(2,x)");
        assert_eq!(Module::bare('A').to_string(), "A");
    }

    #[test]
    fn test_brackets_reject_params() {
        assert!(Module::new('[', vec![Param::Number(1.0)]).is_err());
        assert!(Module::new('(', vec![]).is_err());
        assert!(Module::new(']', vec![]).is_ok());
    }

    #[test]
    fn test_equality_ignores_lock() {
        let a = Module::bare('F');
        let mut b = Module::bare('F');
        b.locked = true;
        assert_eq!(a, b);
    }
}
