pub mod evolution;
pub mod generation;
pub mod grammar;
pub mod turtle;
