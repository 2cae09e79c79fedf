use super::condition::PassContext;
use super::module::Module;
use super::production::Production;
use super::string::ParametricString;
use super::Defines;
use crate::error::{PlantformError, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between genome fields.
pub const GENOME_SEPARATOR: &str = "||";

/// A parametric L-system: axiom, ordered productions, global defines and an
/// iteration count, plus a memoised rewriting result.
///
/// Mutating accessors drop the memo; callers that change state through other
/// means must call [`LSystem::clear_result`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LSystem {
    axiom: ParametricString,
    productions: Vec<Production>,
    defines: Defines,
    iterations: usize,
    seed: u64,
    #[serde(skip)]
    result: Option<ParametricString>,
}

impl Default for LSystem {
    fn default() -> Self {
        Self {
            axiom: ParametricString::new(),
            productions: Vec::new(),
            defines: Defines::new(),
            iterations: 1,
            seed: 0,
            result: None,
        }
    }
}

impl LSystem {
    pub fn new(axiom: ParametricString, iterations: usize) -> Self {
        Self {
            axiom,
            iterations,
            ..Self::default()
        }
    }

    /// Seed of the pass randomness used by stochastic productions.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.result = None;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn axiom(&self) -> &ParametricString {
        &self.axiom
    }

    pub fn axiom_mut(&mut self) -> &mut ParametricString {
        self.result = None;
        &mut self.axiom
    }

    pub fn set_axiom(&mut self, axiom: ParametricString) {
        self.axiom = axiom;
        self.result = None;
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
        self.result = None;
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn productions_mut(&mut self) -> &mut Vec<Production> {
        self.result = None;
        &mut self.productions
    }

    pub fn production(&self, index: usize) -> Option<&Production> {
        self.productions.get(index)
    }

    pub fn add_production(&mut self, production: Production) {
        self.productions.push(production);
        self.result = None;
    }

    pub fn remove_production(&mut self, index: usize) -> Option<Production> {
        if index >= self.productions.len() {
            return None;
        }
        self.result = None;
        Some(self.productions.remove(index))
    }

    /// Index of the first production rewriting `letter`.
    pub fn production_with_predecessor(&self, letter: char) -> Option<usize> {
        self.productions.iter().position(|p| p.letter() == letter)
    }

    pub fn clear_productions(&mut self) {
        self.productions.clear();
        self.result = None;
    }

    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    pub fn defines_mut(&mut self) -> &mut Defines {
        self.result = None;
        &mut self.defines
    }

    /// Adds a define unless the name is already taken.
    pub fn add_define(&mut self, name: impl Into<String>, value: f64) -> bool {
        let name = name.into();
        if self.defines.contains_key(&name) {
            return false;
        }
        self.defines.insert(name, value);
        self.result = None;
        true
    }

    /// Change the value of an existing define.
    pub fn override_define(&mut self, name: &str, value: f64) -> Result<()> {
        match self.defines.get_mut(name) {
            Some(v) => {
                *v = value;
                self.result = None;
                Ok(())
            }
            None => Err(PlantformError::UndefinedName(name.to_string())),
        }
    }

    /// Copy in defines from `other` without overwriting existing names.
    pub fn merge_defines(&mut self, other: &Defines) {
        for (name, value) in other {
            self.defines.entry(name.clone()).or_insert(*value);
        }
        self.result = None;
    }

    /// Reset to an empty system with the same iteration count and seed.
    pub fn clear(&mut self) {
        self.axiom.clear();
        self.productions.clear();
        self.defines.clear();
        self.result = None;
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    pub fn cached_result(&self) -> Option<&ParametricString> {
        self.result.as_ref()
    }

    /// Rewrite the axiom for the configured iteration count, memoised.
    pub fn result(&mut self) -> Result<&ParametricString> {
        if self.result.is_none() {
            let rewritten = self.iterate(self.iterations)?;
            self.result = Some(rewritten);
        }
        match &self.result {
            Some(result) => Ok(result),
            None => Err(PlantformError::Evaluation("result was not computed".to_string())),
        }
    }

    /// Apply `iterations` rewriting passes to the axiom. Deterministic for a given seed.
    pub fn iterate(&self, iterations: usize) -> Result<ParametricString> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut current = self.axiom.clone();

        for pass in 0..iterations {
            current.reset_locks();
            let mut ctx = PassContext::new();
            current = self.rewrite_pass(&current, &mut ctx, &mut rng)?;
            current.evaluate_defines(&self.defines);
            debug!("Pass {}: {} modules", pass + 1, current.len());
        }
        current.evaluate_defines(&self.defines);
        current.reset_locks();

        Ok(current)
    }

    fn rewrite_pass(
        &self,
        input: &ParametricString,
        ctx: &mut PassContext,
        rng: &mut StdRng,
    ) -> Result<ParametricString> {
        let mut out: Vec<Module> = Vec::with_capacity(input.len() * 2);

        for module in input.iter() {
            if module.is_bracket() || module.locked {
                out.push(module.clone());
                continue;
            }

            ctx.begin_module();
            let mut rewritten = false;
            for production in &self.productions {
                if production.matches(module, &self.defines, ctx, rng)? {
                    production.apply(module, &self.defines, &mut out)?;
                    rewritten = true;
                    break;
                }
            }
            if !rewritten {
                out.push(module.clone());
            }
        }

        Ok(ParametricString::from_modules(out))
    }

    /// `axiom||iterations||pred;cond;succ||...||name=value||...`
    pub fn to_genome(&self) -> String {
        let mut genome = format!("{}{}{}", self.axiom, GENOME_SEPARATOR, self.iterations);
        for production in &self.productions {
            genome.push_str(GENOME_SEPARATOR);
            genome.push_str(&production.to_genome());
        }
        for (name, value) in &self.defines {
            genome.push_str(GENOME_SEPARATOR);
            genome.push_str(&format!("{}={}", name, value));
        }
        genome
    }

    pub fn from_genome(genome: &str) -> Result<Self> {
        let mut fields = genome.trim().split(GENOME_SEPARATOR);
        let axiom = fields
            .next()
            .ok_or_else(|| PlantformError::InvalidGenome("missing axiom".to_string()))?;
        let iterations = fields
            .next()
            .ok_or_else(|| PlantformError::InvalidGenome("missing iteration count".to_string()))?;
        let iterations = iterations.trim().parse::<usize>().map_err(|_| {
            PlantformError::InvalidGenome(format!("invalid iteration count '{}'", iterations))
        })?;

        let mut lsystem = LSystem::new(ParametricString::parse(axiom)?, iterations);
        for field in fields {
            if field.contains(';') {
                lsystem.productions.push(Production::from_genome(field)?);
            } else if let Some((name, value)) = field.split_once('=') {
                let value = value.trim().parse::<f64>().map_err(|_| {
                    PlantformError::InvalidGenome(format!("invalid define '{}'", field))
                })?;
                lsystem.defines.insert(name.trim().to_string(), value);
            } else {
                return Err(PlantformError::InvalidGenome(format!(
                    "unrecognised field '{}'",
                    field
                )));
            }
        }
        Ok(lsystem)
    }
}

/// Equality over the grammar, ignoring the memoised result.
impl PartialEq for LSystem {
    fn eq(&self, other: &Self) -> bool {
        self.axiom == other.axiom
            && self.productions == other.productions
            && self.defines == other.defines
            && self.iterations == other.iterations
    }
}

impl fmt::Display for LSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "w {}", self.axiom)?;
        for production in &self.productions {
            writeln!(f, "{}", production)?;
        }
        for (name, value) in &self.defines {
            write!(f, "({} = {}) ", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn algae() -> LSystem {
        let mut l = LSystem::new(ParametricString::parse("A").unwrap(), 4);
        l.add_production("A:*->AB".parse().unwrap());
        l.add_production("B:*->A".parse().unwrap());
        l
    }

    #[test]
    fn test_algae() {
        let l = algae();
        assert_eq!(l.iterate(0).unwrap().to_string(), "A");
        assert_eq!(l.iterate(1).unwrap().to_string(), "AB");
        assert_eq!(l.iterate(4).unwrap().to_string(), "ABAABABA");
    }

    #[test]
    fn test_first_matching_production_wins() {
        let mut l = LSystem::new(ParametricString::parse("A(1)A(3)").unwrap(), 1);
        l.add_production("A(x):x>2->B".parse().unwrap());
        l.add_production("A(x):*->C(x)".parse().unwrap());
        assert_eq!(l.iterate(1).unwrap().to_string(), "C(1)B");
    }

    #[test]
    fn test_defines_substituted_after_pass() {
        let mut l = LSystem::new(ParametricString::parse("A(d0)").unwrap(), 1);
        l.add_define("d0", 0.5);
        l.add_production("A(x):*->F(x*2)G(d0)".parse().unwrap());
        assert_eq!(l.iterate(1).unwrap().to_string(), "F(1)G(0.5)");
        assert_eq!(l.iterate(0).unwrap().to_string(), "A(0.5)");
    }

    #[test]
    fn test_result_is_memoised() {
        let mut l = algae();
        assert!(l.cached_result().is_none());
        assert_eq!(l.result().unwrap().len(), 8);
        assert!(l.cached_result().is_some());
        l.set_iterations(1);
        assert!(l.cached_result().is_none());
        assert_eq!(l.result().unwrap().len(), 2);
    }

    #[test]
    fn test_genome_round_trip() {
        let mut l = algae();
        l.add_define("d0", 1.25);
        let genome = l.to_genome();
        assert_eq!(genome, "A||4||A;*;AB||B;*;A||d0=1.25");
        let back = LSystem::from_genome(&genome).unwrap();
        assert_eq!(back, l);
    }

    #[test]
    fn test_invalid_genome() {
        assert!(LSystem::from_genome("A").is_err());
        assert!(LSystem::from_genome("A||x").is_err());
        assert!(LSystem::from_genome("A||2||A;*").is_err());
        assert!(LSystem::from_genome("A||2||junk").is_err());
    }

    #[test]
    fn test_display() {
        let mut l = algae();
        l.add_define("d0", 2.0);
        assert_eq!(l.to_string(), "w A\nA : * -> AB\nB : * -> A\n(d0 = 2) ");
    }

    #[test]
    fn test_override_define_requires_existing_name() {
        let mut l = LSystem::from_genome("F(d0)||1||d0=1").unwrap();
        l.override_define("d0", 3.0).unwrap();
        assert_eq!(l.result().unwrap().to_string(), "F(3)");
        assert!(l.override_define("d1", 1.0).is_err());
    }

}
