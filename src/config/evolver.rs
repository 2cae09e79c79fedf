use super::traits::{check_probability, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::PlantformError;
use serde::{Deserialize, Serialize};

/// How the first population is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialPopulation {
    /// Logically randomized systems.
    Randomized,
    /// Copies of the starting instance.
    FromInstance,
    /// Each member is the best of a short automated evolution.
    FromAutomatedEvolution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolverConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Evolution stops once the best fitness reaches this value. Zero disables it.
    pub target_fitness: f64,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub initial_population: InitialPopulation,
    pub initialisation_complexify_steps: usize,
    /// Evolve render parameters alongside the grammar.
    pub consider_render_parameters: bool,
    /// Reject systems whose result draws no line.
    pub discard_empty: bool,
    /// Reject systems whose result is longer than this. Zero disables it.
    pub discard_larger_than: usize,
    pub max_discard_retries: usize,
    pub crossover_retry_limit: usize,
    /// Target of the short evolutions that seed `FromAutomatedEvolution`.
    pub good_initial_fitness: f64,
    pub max_target_iterations: usize,
    pub parallel_fitness: bool,
    pub seed: Option<u64>,
}

impl Default for EvolverConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 2,
            target_fitness: 0.0,
            crossover_rate: 0.8,
            mutation_rate: 0.3,
            initial_population: InitialPopulation::Randomized,
            initialisation_complexify_steps: 5,
            consider_render_parameters: true,
            discard_empty: false,
            discard_larger_than: 0,
            max_discard_retries: 10,
            crossover_retry_limit: 100,
            good_initial_fitness: 4.0,
            max_target_iterations: 1000,
            parallel_fitness: false,
            seed: None,
        }
    }
}

impl ConfigSection for EvolverConfig {
    fn section_name() -> &'static str {
        "evolver"
    }

    fn validate(&self) -> Result<(), PlantformError> {
        if self.population_size < 2 {
            return Err(PlantformError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        check_probability("Crossover rate", self.crossover_rate)?;
        check_probability("Mutation rate", self.mutation_rate)?;
        if self.crossover_retry_limit == 0 {
            return Err(PlantformError::Configuration(
                "Crossover retry limit must be positive".to_string(),
            ));
        }
        if self.target_fitness < 0.0 {
            return Err(PlantformError::Configuration(
                "Target fitness cannot be negative".to_string(),
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
                    "population_size",
                    "integer",
                    serde_json::json!(defaults.population_size),
                    Some((2.0, 1000.0)),
                    "Number of instances in the population",
                ),
                FieldManifest::new(
                    "generations",
                    "integer",
                    serde_json::json!(defaults.generations),
                    Some((0.0, 10000.0)),
                    "Generations to run when no target fitness is set",
                ),
                FieldManifest::new(
                    "target_fitness",
                    "float",
                    serde_json::json!(defaults.target_fitness),
                    None,
                    "Stop when the best instance reaches this fitness",
                ),
                FieldManifest::new(
                    "crossover_rate",
                    "float",
                    serde_json::json!(defaults.crossover_rate),
                    Some((0.0, 1.0)),
                    "Probability that a selected pair is crossed",
                ),
                FieldManifest::new(
                    "mutation_rate",
                    "float",
                    serde_json::json!(defaults.mutation_rate),
                    Some((0.0, 1.0)),
                    "Probability that a child is mutated",
                ),
                FieldManifest::new(
                    "discard_larger_than",
                    "integer",
                    serde_json::json!(defaults.discard_larger_than),
                    None,
                    "Maximum result length, zero for no limit",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EvolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rates_are_checked() {
        let config = EvolverConfig {
            mutation_rate: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
