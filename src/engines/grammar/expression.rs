//! Arithmetic over successor parameters.
//!
//! Expressions are folded strictly left to right without precedence, so
//! `x+1*2` is `(x+1)*2`. An operator stays active until another one is seen
//! and an operand with no operator in front of it replaces the running value.

use super::module::Param;
use super::Defines;
use crate::error::{PlantformError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '%' => Some(Operator::Rem),
            _ => None,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64> {
        match self {
            Operator::Add => Ok(lhs + rhs),
            Operator::Sub => Ok(lhs - rhs),
            Operator::Mul => Ok(lhs * rhs),
            Operator::Div => {
                if rhs == 0.0 {
                    return Err(PlantformError::Evaluation(format!("{} / 0", lhs)));
                }
                Ok(lhs / rhs)
            }
            Operator::Rem => {
                if rhs == 0.0 {
                    return Err(PlantformError::Evaluation(format!("{} % 0", lhs)));
                }
                // floored modulo, the sign follows the divisor
                Ok(lhs - rhs * (lhs / rhs).floor())
            }
        }
    }
}

/// Name lookup for an expression: global defines first, then the formal
/// parameters bound from the module being rewritten.
pub struct Scope<'a> {
    defines: &'a Defines,
    formals: Vec<(&'a str, &'a Param)>,
}

impl<'a> Scope<'a> {
    pub fn new(defines: &'a Defines) -> Self {
        Self {
            defines,
            formals: Vec::new(),
        }
    }

    pub fn bind(&mut self, name: &'a str, value: &'a Param) {
        self.formals.push((name, value));
    }

    pub fn lookup(&self, name: &str) -> Result<f64> {
        if let Some(v) = self.defines.get(name) {
            return Ok(*v);
        }
        match self.formals.iter().find(|(formal, _)| *formal == name) {
            Some((_, value)) => self.resolve(value),
            None => Err(PlantformError::UndefinedName(name.to_string())),
        }
    }

    /// Numeric value of an actual parameter. Symbols are accepted when they name
    /// a define that has not been substituted yet.
    pub fn resolve(&self, value: &Param) -> Result<f64> {
        match value {
            Param::Number(v) => Ok(*v),
            Param::Symbol(s) => match self.defines.get(s.as_str()) {
                Some(v) => Ok(*v),
                None => Err(PlantformError::UndefinedName(s.clone())),
            },
        }
    }

    pub fn evaluate(&self, expression: &str) -> Result<f64> {
        evaluate(expression, self)
    }
}

pub fn evaluate(expression: &str, scope: &Scope<'_>) -> Result<f64> {
    let chars: Vec<char> = expression.chars().collect();
    let mut acc: Option<f64> = None;
    let mut pending: Option<Operator> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(op) = Operator::from_char(c) {
            pending = Some(op);
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let operand = if c.is_ascii_digit() || c == '.' {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            token.parse::<f64>().map_err(|_| {
                PlantformError::Evaluation(format!("invalid number '{}' in '{}'", token, expression))
            })?
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            scope.lookup(&token)?
        } else {
            return Err(PlantformError::Evaluation(format!(
                "unsupported character '{}' in '{}'",
                c, expression
            )));
        };

        acc = Some(match pending {
            None => operand,
            Some(op) => op.apply(acc.unwrap_or(0.0), operand)?,
        });
    }

    acc.ok_or_else(|| PlantformError::Evaluation(format!("empty expression '{}'", expression)))
}
