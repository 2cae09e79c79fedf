use super::traits::{check_probability, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::PlantformError;
use serde::{Deserialize, Serialize};

/// Which alphabet and mutation table the generator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorKind {
    /// Full template alphabet with generic grammar mutations.
    Generic,
    /// Plant-shaped seed system with structure-aware mutations.
    Plants,
}

/// Size bounds on generated systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorLimits {
    pub max_productions: usize,
    pub min_successor_length: usize,
    pub max_successor_length: usize,
    pub min_generated_length: usize,
    pub max_generated_length: usize,
    pub min_axiom_length: usize,
    pub max_axiom_length: usize,
    pub min_define_value: f64,
    pub max_define_value: f64,
    pub max_defines: usize,
    pub min_random_defines: usize,
    pub max_random_defines: usize,
    pub min_random_productions: usize,
    pub max_random_productions: usize,
}

impl Default for GeneratorLimits {
    fn default() -> Self {
        Self {
            max_productions: 4,
            min_successor_length: 1,
            max_successor_length: 24,
            min_generated_length: 1,
            max_generated_length: 1,
            min_axiom_length: 1,
            max_axiom_length: 5,
            min_define_value: 0.0,
            max_define_value: 2.0,
            max_defines: 10,
            min_random_defines: 1,
            max_random_defines: 4,
            min_random_productions: 1,
            max_random_productions: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub parameterized: bool,
    pub defines_probability: f64,
    pub constants_probability: f64,
    pub target_iterations: usize,
    pub branch_probability: f64,
    pub branch_close_probability: f64,
    /// Draw at or below this picks a simplifying mutation.
    pub simplify_threshold: f64,
    /// The same draw at or below this picks a modifying mutation, otherwise complexify.
    pub modify_threshold: f64,
    pub mutation_steps_at_once: usize,
    /// Enables production splitting and stochastic weight changes.
    pub stochastic_mutations: bool,
    pub limits: GeneratorLimits,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::Generic,
            parameterized: true,
            defines_probability: 0.5,
            constants_probability: 0.0,
            target_iterations: 3,
            branch_probability: 0.5,
            branch_close_probability: 0.2,
            simplify_threshold: 0.25,
            modify_threshold: 0.55,
            mutation_steps_at_once: 1,
            stochastic_mutations: false,
            limits: GeneratorLimits::default(),
            seed: None,
        }
    }
}

impl ConfigSection for GeneratorConfig {
    fn section_name() -> &'static str {
        "generator"
    }

    fn validate(&self) -> Result<(), PlantformError> {
        check_probability("Defines probability", self.defines_probability)?;
        check_probability("Constants probability", self.constants_probability)?;
        check_probability("Branch probability", self.branch_probability)?;
        check_probability("Branch close probability", self.branch_close_probability)?;
        check_probability("Simplify threshold", self.simplify_threshold)?;
        check_probability("Modify threshold", self.modify_threshold)?;

        let l = &self.limits;
        if l.min_generated_length > l.max_generated_length
            || l.min_axiom_length > l.max_axiom_length
            || l.min_successor_length > l.max_successor_length
            || l.min_random_defines > l.max_random_defines
            || l.min_random_productions > l.max_random_productions
        {
            return Err(PlantformError::Configuration(
                "Generator limits must have min <= max".to_string(),
            ));
        }
        if l.min_define_value > l.max_define_value {
            return Err(PlantformError::Configuration(
                "Define value range is empty".to_string(),
            ));
        }
        if l.max_random_defines > l.max_defines {
            return Err(PlantformError::Configuration(
                "Random defines exceed the define limit".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        let defaults = Self::default();
        ConfigManifest {
            section: Self::section_name().to_string(),
            fields: vec![
                FieldManifest::new(
                    "parameterized",
                    "bool",
                    serde_json::json!(defaults.parameterized),
                    None,
                    "Generate modules with parameters",
                ),
                FieldManifest::new(
                    "defines_probability",
                    "float",
                    serde_json::json!(defaults.defines_probability),
                    Some((0.0, 1.0)),
                    "Chance that a generated parameter refers to a define",
                ),
                FieldManifest::new(
                    "constants_probability",
                    "float",
                    serde_json::json!(defaults.constants_probability),
                    Some((0.0, 1.0)),
                    "Chance that a generated parameter is a random constant",
                ),
                FieldManifest::new(
                    "branch_probability",
                    "float",
                    serde_json::json!(defaults.branch_probability),
                    Some((0.0, 1.0)),
                    "Chance to open a branch before each generated module",
                ),
                FieldManifest::new(
                    "mutation_steps_at_once",
                    "integer",
                    serde_json::json!(defaults.mutation_steps_at_once),
                    Some((1.0, 100.0)),
                    "Mutations applied per mutation request",
                ),
            ],
        }
    }
}
