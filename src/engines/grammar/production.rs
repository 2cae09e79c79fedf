use super::condition::{Condition, PassContext};
use super::expression::Scope;
use super::module::{Module, Param};
use super::string::ParametricString;
use super::Defines;
use crate::error::{PlantformError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A rewriting rule `predecessor : condition -> successor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub predecessor: Module,
    pub condition: Condition,
    pub successor: ParametricString,
}

impl Production {
    pub fn new(predecessor: Module, condition: Condition, successor: ParametricString) -> Self {
        Self {
            predecessor,
            condition,
            successor,
        }
    }

    /// Build from the three textual parts. The predecessor must be exactly one module.
    pub fn from_parts(predecessor: &str, condition: &str, successor: &str) -> Result<Self> {
        let mut modules = ParametricString::parse(predecessor)?.into_modules();
        if modules.len() != 1 {
            return Err(PlantformError::PredecessorArity(modules.len()));
        }
        let predecessor = modules.remove(0);
        if predecessor.is_bracket() {
            return Err(PlantformError::parse(
                &predecessor.to_string(),
                0,
                "a bracket cannot be rewritten",
            ));
        }
        Ok(Self {
            predecessor,
            condition: Condition::parse(condition)?,
            successor: ParametricString::parse(successor)?,
        })
    }

    /// Parse the genome form `pred;cond;succ`.
    pub fn from_genome(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split(';').collect();
        if parts.len() != 3 {
            return Err(PlantformError::InvalidGenome(format!(
                "production '{}' must have three ';'-separated parts",
                text
            )));
        }
        Self::from_parts(parts[0], parts[1], parts[2])
    }

    pub fn to_genome(&self) -> String {
        format!("{};{};{}", self.predecessor, self.condition, self.successor)
    }

    pub fn letter(&self) -> char {
        self.predecessor.letter
    }

    /// Whether this production rewrites `module` in the current pass.
    pub fn matches<R: Rng>(
        &self,
        module: &Module,
        defines: &Defines,
        ctx: &mut PassContext,
        rng: &mut R,
    ) -> Result<bool> {
        if module.letter != self.predecessor.letter {
            return Ok(false);
        }
        match &self.condition {
            Condition::Always => Ok(true),
            Condition::Stochastic(weight) => Ok(ctx.stochastic_hit(*weight, rng)),
            Condition::Parametric { .. } => {
                self.condition.holds_for(&self.predecessor, module, defines)
            }
        }
    }

    /// Append the successor instantiated for `module` to `out`. Every produced
    /// module is locked for the rest of the pass.
    pub fn apply(&self, module: &Module, defines: &Defines, out: &mut Vec<Module>) -> Result<()> {
        let mut scope = Scope::new(defines);
        for (formal, actual) in self.predecessor.params.iter().zip(module.params.iter()) {
            if let Param::Symbol(name) = formal {
                scope.bind(name, actual);
            }
        }

        for template in self.successor.iter() {
            let mut produced = Module {
                letter: template.letter,
                params: Vec::with_capacity(template.params.len()),
                locked: true,
            };
            for param in &template.params {
                let value = match param {
                    Param::Number(v) => *v,
                    Param::Symbol(expression) => scope.evaluate(expression)?,
                };
                produced.params.push(Param::Number(value));
            }
            out.push(produced);
        }
        Ok(())
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : {} -> {}",
            self.predecessor, self.condition, self.successor
        )
    }
}

/// Textual form `pred:cond->succ`, whitespace around the parts is ignored.
impl FromStr for Production {
    type Err = PlantformError;

    fn from_str(s: &str) -> Result<Self> {
        let (predecessor, rest) = s
            .split_once(':')
            .ok_or_else(|| PlantformError::parse(s, 0, "expected 'pred:cond->succ'"))?;
        let (condition, successor) = rest
            .split_once("->")
            .ok_or_else(|| PlantformError::parse(s, predecessor.len() + 1, "missing '->'"))?;
        Self::from_parts(predecessor.trim(), condition.trim(), successor.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_textual_syntax() {
        let p: Production = "A(x):x > 1->F(x*2)A(x-1)".parse().unwrap();
        assert_eq!(p.letter(), 'A');
        assert!(p.condition.is_parametric());
        assert_eq!(p.to_string(), "A(x) : x > 1 -> F(x*2)A(x-1)");
        assert_eq!(p.to_genome(), "A(x);x > 1;F(x*2)A(x-1)");
        assert_eq!(Production::from_genome(&p.to_genome()).unwrap(), p);
    }

    #[test]
    fn test_predecessor_arity() {
        let err = Production::from_parts("AB", "*", "F").unwrap_err();
        assert!(matches!(err, PlantformError::PredecessorArity(2)));
        assert!(Production::from_genome("A;*").is_err());
    }

    #[test]
    fn test_apply_binds_formals() {
        let p: Production = "A(x,y):*->F(x*y)[+(30)A(y,x)]".parse().unwrap();
        let module = Module::new('A', vec![Param::Number(2.0), Param::Number(3.0)]).unwrap();
        let mut out = Vec::new();
        p.apply(&module, &Defines::new(), &mut out).unwrap();
        let result = ParametricString::from_modules(out);
        assert_eq!(result.to_string(), "F(6)[+(30)A(3,2)]");
        assert!(result.iter().all(|m| m.locked));
    }

    #[test]
    fn test_matches_letter_and_condition() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = PassContext::new();
        let p: Production = "A(x):x<1->F".parse().unwrap();
        let small = Module::new('A', vec![Param::Number(0.5)]).unwrap();
        let large = Module::new('A', vec![Param::Number(5.0)]).unwrap();
        let other = Module::bare('B');
        let defines = Defines::new();
        assert!(p.matches(&small, &defines, &mut ctx, &mut rng).unwrap());
        assert!(!p.matches(&large, &defines, &mut ctx, &mut rng).unwrap());
        assert!(!p.matches(&other, &defines, &mut ctx, &mut rng).unwrap());
    }
}
