pub mod generator;
pub mod mutation;
pub mod policy;
pub mod random;
pub mod templates;

pub use generator::{remove_first_branch, remove_module_at, Generator, ProductionFilter};
pub use mutation::{MutationEntry, MutationKind, Tier};
pub use policy::{policy_for, GenerationPolicy, GenericPolicy, PlantPolicy};
pub use templates::{TemplateLibrary, TemplateModule};
