use super::expression::Scope;
use super::module::{Module, Param};
use super::Defines;
use crate::error::{PlantformError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl RelOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Gt => ">",
            RelOp::Lt => "<",
            RelOp::Ge => ">=",
            RelOp::Le => "<=",
            RelOp::Eq => "=",
            RelOp::Ne => "!=",
        }
    }

    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            RelOp::Gt => lhs > rhs,
            RelOp::Lt => lhs < rhs,
            RelOp::Ge => lhs >= rhs,
            RelOp::Le => lhs <= rhs,
            RelOp::Eq => lhs == rhs,
            RelOp::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionValue {
    Literal(f64),
    Define(String),
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Literal(v) => write!(f, "{}", v),
            ConditionValue::Define(name) => write!(f, "{}", name),
        }
    }
}

/// When a production may fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// `*`
    Always,
    /// Probability weight in `[0, 1]`, shared with sibling productions of the same letter.
    Stochastic(f64),
    /// `x > 1.5`: compares a formal parameter of the predecessor.
    Parametric {
        variable: String,
        op: RelOp,
        value: ConditionValue,
    },
}

impl Condition {
    pub fn is_stochastic(&self) -> bool {
        matches!(self, Condition::Stochastic(_))
    }

    pub fn is_parametric(&self) -> bool {
        matches!(self, Condition::Parametric { .. })
    }

    /// Weight used when a production is split into stochastic alternatives.
    pub fn weight(&self) -> Option<f64> {
        match self {
            Condition::Always => Some(1.0),
            Condition::Stochastic(w) => Some(*w),
            Condition::Parametric { .. } => None,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text == "*" {
            return Ok(Condition::Always);
        }
        if let Ok(w) = text.parse::<f64>() {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(PlantformError::parse(
                    text,
                    0,
                    "stochastic weight must lie in [0, 1]",
                ));
            }
            return Ok(Condition::Stochastic(w));
        }
        parse_parametric(text)
    }

    /// Parametric test against `module`, which has already matched `predecessor`.
    pub fn holds_for(&self, predecessor: &Module, module: &Module, defines: &Defines) -> Result<bool> {
        let (variable, op, value) = match self {
            Condition::Parametric { variable, op, value } => (variable, op, value),
            _ => return Ok(true),
        };

        let index = predecessor
            .params
            .iter()
            .position(|p| p.as_symbol() == Some(variable.as_str()))
            .ok_or_else(|| PlantformError::UndefinedName(variable.clone()))?;
        let actual = module.params.get(index).ok_or_else(|| {
            PlantformError::Evaluation(format!(
                "module {} has no parameter bound to '{}'",
                module, variable
            ))
        })?;

        let scope = Scope::new(defines);
        let lhs = scope.resolve(actual)?;
        let rhs = match value {
            ConditionValue::Literal(v) => *v,
            ConditionValue::Define(name) => scope.resolve(&Param::Symbol(name.clone()))?,
        };
        Ok(op.compare(lhs, rhs))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "*"),
            Condition::Stochastic(w) => write!(f, "{}", w),
            Condition::Parametric { variable, op, value } => {
                write!(f, "{} {} {}", variable, op.symbol(), value)
            }
        }
    }
}

impl FromStr for Condition {
    type Err = PlantformError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_parametric(text: &str) -> Result<Condition> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || !(chars[0].is_ascii_alphabetic() || chars[0] == '_') {
        return Err(PlantformError::parse(text, 0, "expected '*', a weight or a comparison"));
    }

    let mut i = 0;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    let variable: String = chars[..i].iter().collect();
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }

    let rest: String = chars[i..].iter().collect();
    let (op, width) = [
        (">=", RelOp::Ge),
        ("<=", RelOp::Le),
        ("!=", RelOp::Ne),
        ("==", RelOp::Eq),
        (">", RelOp::Gt),
        ("<", RelOp::Lt),
        ("=", RelOp::Eq),
    ]
    .iter()
    .find(|(symbol, _)| rest.starts_with(symbol))
    .map(|(symbol, op)| (*op, symbol.len()))
    .ok_or_else(|| PlantformError::parse(text, i, "expected a comparison operator"))?;

    let value_text = rest[width..].trim();
    if value_text.is_empty() {
        return Err(PlantformError::parse(text, i + width, "missing comparison value"));
    }
    let value = match value_text.parse::<f64>() {
        Ok(v) if v.is_finite() => ConditionValue::Literal(v),
        _ => {
            let valid = value_text
                .chars()
                .enumerate()
                .all(|(n, c)| c == '_' || c.is_ascii_alphabetic() || (n > 0 && c.is_ascii_digit()));
            if !valid {
                return Err(PlantformError::parse(text, i + width, "invalid comparison value"));
            }
            ConditionValue::Define(value_text.to_string())
        }
    };

    Ok(Condition::Parametric {
        variable,
        op,
        value,
    })
}

/// Randomness shared by all stochastic productions within one rewriting pass.
///
/// One draw is taken lazily per pass. Each module-match attempt restarts the
/// cumulative weight, and a stochastic production fires when the draw falls in
/// `[before, before + weight)`.
#[derive(Debug, Default)]
pub struct PassContext {
    draw: Option<f64>,
    cumulative: f64,
}

impl PassContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_module(&mut self) {
        self.cumulative = 0.0;
    }

    pub fn stochastic_hit<R: Rng>(&mut self, weight: f64, rng: &mut R) -> bool {
        let r = *self.draw.get_or_insert_with(|| rng.gen::<f64>());
        let before = self.cumulative;
        self.cumulative += weight;
        r >= before && r < self.cumulative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Condition::parse("*").unwrap(), Condition::Always);
        assert_eq!(Condition::parse("0.4").unwrap(), Condition::Stochastic(0.4));
        let c = Condition::parse("x>1.5").unwrap();
        assert_eq!(c.to_string(), "x > 1.5");
        assert_eq!(Condition::parse(&c.to_string()).unwrap(), c);
        let c = Condition::parse("y != d0").unwrap();
        assert_eq!(
            c,
            Condition::Parametric {
                variable: "y".to_string(),
                op: RelOp::Ne,
                value: ConditionValue::Define("d0".to_string())
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Condition::parse("1.5").is_err());
        assert!(Condition::parse("x ~ 1").is_err());
        assert!(Condition::parse("x >").is_err());
        assert!(Condition::parse("").is_err());
    }

    #[test]
    fn test_parametric_holds() {
        let predecessor = Module::new('A', vec![Param::symbol("x")]).unwrap();
        let module = Module::new('A', vec![Param::Number(2.0)]).unwrap();
        let defines = Defines::new();
        let c = Condition::parse("x > 1.5").unwrap();
        assert!(c.holds_for(&predecessor, &module, &defines).unwrap());
        let c = Condition::parse("x <= 1.5").unwrap();
        assert!(!c.holds_for(&predecessor, &module, &defines).unwrap());
        let c = Condition::parse("z > 1").unwrap();
        assert!(c.holds_for(&predecessor, &module, &defines).is_err());
    }

    #[test]
    fn test_stochastic_partition() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut ctx = PassContext::new();
        ctx.begin_module();
        let first = ctx.stochastic_hit(0.5, &mut rng);
        let second = ctx.stochastic_hit(0.5, &mut rng);
        // exactly one of two complementary weights fires
        assert!(first ^ second);

        // the same draw is reused for the next module in the pass
        ctx.begin_module();
        assert_eq!(ctx.stochastic_hit(0.5, &mut rng), first);
    }
}
