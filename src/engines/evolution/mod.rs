//! Genetic evolution of L-systems: instances, fitness, operators and the evolver loop.

pub mod evolver;
pub mod fitness;
pub mod instance;
pub mod operators;
pub mod progress;
pub mod render_params;

pub use evolver::{GeneticEvolver, ProgressCallback};
pub use fitness::{fitness_from_config, FitnessFunction, NonNegative, OchoaFitness, TreeFitness};
pub use instance::{random_plant_name, GeneticInstance, INSTANCE_SEPARATOR};
pub use operators::{best_selection, roulette_selection, sort_population, switch_strings};
pub use progress::{
    ConsoleProgressCallback, FitnessHistory, GenerationRecord, NullProgressCallback,
};
pub use render_params::{DetailKind, RenderParameters, RENDER_MUTATION_PROBABILITY};
