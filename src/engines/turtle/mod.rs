pub mod interpreter;
pub mod math;
pub mod statistics;

pub use interpreter::{DetailQuad, Turtle, TurtleResult};
pub use math::{Euler, Quaternion, Vector3};
pub use statistics::{Extents, ShapeStatistics, Spans};
