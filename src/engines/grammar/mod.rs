//! Parametric L-system grammar: modules, strings, productions and rewriting.

pub mod condition;
pub mod expression;
pub mod lsystem;
pub mod module;
pub mod production;
pub mod string;

pub use condition::{Condition, ConditionValue, PassContext, RelOp};
pub use lsystem::LSystem;
pub use module::{Module, Param};
pub use production::Production;
pub use string::ParametricString;

use std::collections::BTreeMap;

/// Global named constants of an L-system, ordered by name.
pub type Defines = BTreeMap<String, f64>;
