use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Complexify,
    Modify,
    Simplify,
}

/// Every structural change the generators know how to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    // Generic grammar edits
    AddModuleProduction,
    RemoveModuleProduction,
    ChangeModuleProduction,
    AddProduction,
    RemoveProduction,
    AddModuleAxiom,
    RemoveModuleAxiom,
    ChangeModuleAxiom,
    SplitProduction,
    ChangeStochasticProduction,
    ChangeParameterExpression,
    // Plant structure edits
    AppendLeaf,
    InsertLine,
    InsertSelf,
    InsertBranch,
    InsertSize,
    SplitLine,
    RotateLine,
    ChangeParameter,
    RemoveLeaf,
    RemoveSelf,
    RemoveOrientation,
    RemoveLine,
    RemoveBranch,
    RemoveSize,
}

impl MutationKind {
    pub fn description(&self) -> &'static str {
        match self {
            MutationKind::AddModuleProduction => "added a module to a random production",
            MutationKind::RemoveModuleProduction => "removed a module from a random production",
            MutationKind::ChangeModuleProduction => "changed a module in a random production",
            MutationKind::AddProduction => "added a production for a used letter",
            MutationKind::RemoveProduction => "removed a random production",
            MutationKind::AddModuleAxiom => "added a module to the axiom",
            MutationKind::RemoveModuleAxiom => "removed a module from the axiom",
            MutationKind::ChangeModuleAxiom => "changed a module in the axiom",
            MutationKind::SplitProduction => "split a production into two stochastic ones",
            MutationKind::ChangeStochasticProduction => "changed the weight of a stochastic production",
            MutationKind::ChangeParameterExpression => "changed a parameter expression",
            MutationKind::AppendLeaf => "added a leaf after a line",
            MutationKind::InsertLine => "inserted a line into a random production",
            MutationKind::InsertSelf => "inserted a self-copy into a random production",
            MutationKind::InsertBranch => "inserted a branch into a random production",
            MutationKind::InsertSize => "changed the size of a random line",
            MutationKind::SplitLine => "split a line into two branches",
            MutationKind::RotateLine => "rotated a random line",
            MutationKind::ChangeParameter => "changed a random parameter value",
            MutationKind::RemoveLeaf => "removed a leaf",
            MutationKind::RemoveSelf => "removed a self-copy",
            MutationKind::RemoveOrientation => "removed an orientation",
            MutationKind::RemoveLine => "removed a line",
            MutationKind::RemoveBranch => "removed a branch",
            MutationKind::RemoveSize => "removed a size change",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A registry row: the mutation, its tier and its relative weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationEntry {
    pub kind: MutationKind,
    pub tier: Tier,
    pub weight: u32,
}

impl MutationEntry {
    pub const fn new(kind: MutationKind, tier: Tier, weight: u32) -> Self {
        Self { kind, tier, weight }
    }
}
