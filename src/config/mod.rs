pub mod traits;
pub mod evolver;
pub mod generator;
pub mod turtle;
pub mod fitness;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use evolver::{EvolverConfig, InitialPopulation};
pub use generator::{GeneratorConfig, GeneratorKind, GeneratorLimits};
pub use turtle::TurtleConfig;
pub use fitness::{FitnessConfig, FitnessKind, FitnessWeights};
pub use traits::ConfigSection;
