use super::generator::Generator;
use super::mutation::{MutationEntry, MutationKind, Tier};
use crate::config::GeneratorKind;
use crate::engines::grammar::{Condition, Module, ParametricString, Production};
use crate::error::Result;

/// Alphabet and constraints a [`Generator`] works under: which mutations it
/// may draw from and what the simplest system looks like.
pub trait GenerationPolicy: Send + Sync {
    fn kind(&self) -> GeneratorKind;

    /// The mutation registry of this policy.
    fn mutations(&self) -> &'static [MutationEntry];

    /// Productions with this predecessor are never touched by mutations.
    fn protected_predecessor(&self) -> Option<char> {
        None
    }

    /// Fill the (cleared) generator system with the starting point of this policy.
    fn build_simple(&self, generator: &mut Generator) -> Result<()>;
}

static GENERIC_MUTATIONS: [MutationEntry; 11] = [
    MutationEntry::new(MutationKind::AddModuleAxiom, Tier::Complexify, 3),
    MutationEntry::new(MutationKind::AddProduction, Tier::Complexify, 4),
    MutationEntry::new(MutationKind::AddModuleProduction, Tier::Complexify, 10),
    MutationEntry::new(MutationKind::SplitProduction, Tier::Complexify, 5),
    MutationEntry::new(MutationKind::ChangeModuleAxiom, Tier::Modify, 3),
    MutationEntry::new(MutationKind::ChangeModuleProduction, Tier::Modify, 12),
    MutationEntry::new(MutationKind::ChangeParameterExpression, Tier::Modify, 5),
    MutationEntry::new(MutationKind::ChangeStochasticProduction, Tier::Modify, 5),
    MutationEntry::new(MutationKind::RemoveModuleAxiom, Tier::Simplify, 3),
    MutationEntry::new(MutationKind::RemoveModuleProduction, Tier::Simplify, 5),
    MutationEntry::new(MutationKind::RemoveProduction, Tier::Simplify, 2),
];

static PLANT_MUTATIONS: [MutationEntry; 14] = [
    MutationEntry::new(MutationKind::AppendLeaf, Tier::Complexify, 6),
    MutationEntry::new(MutationKind::SplitLine, Tier::Complexify, 6),
    MutationEntry::new(MutationKind::RotateLine, Tier::Complexify, 6),
    MutationEntry::new(MutationKind::InsertSelf, Tier::Complexify, 6),
    MutationEntry::new(MutationKind::InsertLine, Tier::Complexify, 6),
    MutationEntry::new(MutationKind::InsertBranch, Tier::Complexify, 6),
    MutationEntry::new(MutationKind::InsertSize, Tier::Complexify, 6),
    MutationEntry::new(MutationKind::ChangeParameter, Tier::Modify, 15),
    MutationEntry::new(MutationKind::RemoveLeaf, Tier::Simplify, 5),
    MutationEntry::new(MutationKind::RemoveSelf, Tier::Simplify, 5),
    MutationEntry::new(MutationKind::RemoveOrientation, Tier::Simplify, 5),
    MutationEntry::new(MutationKind::RemoveLine, Tier::Simplify, 5),
    MutationEntry::new(MutationKind::RemoveBranch, Tier::Simplify, 5),
    MutationEntry::new(MutationKind::RemoveSize, Tier::Simplify, 5),
];

/// Whole template alphabet, grammar-level edits, starts from the axiom `F`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericPolicy;

impl GenerationPolicy for GenericPolicy {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Generic
    }

    fn mutations(&self) -> &'static [MutationEntry] {
        &GENERIC_MUTATIONS
    }

    fn build_simple(&self, generator: &mut Generator) -> Result<()> {
        let f = generator.module_of_letter('F')?;
        generator
            .lsystem_mut()
            .set_axiom(ParametricString::from_modules(vec![f]));
        Ok(())
    }
}

/// Plant-shaped edits on top of a growing stub:
///
/// ```text
/// w A
/// A(x) : * -> !F[-A][+A]
/// F(x) : * -> F(x)
/// !(x) : * -> !(x*1.2)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PlantPolicy;

impl PlantPolicy {
    /// Letter of the radius production kept out of reach of mutations.
    pub const SIZE_LETTER: char = '!';
}

impl GenerationPolicy for PlantPolicy {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Plants
    }

    fn mutations(&self) -> &'static [MutationEntry] {
        &PLANT_MUTATIONS
    }

    fn protected_predecessor(&self) -> Option<char> {
        Some(Self::SIZE_LETTER)
    }

    fn build_simple(&self, generator: &mut Generator) -> Result<()> {
        let a = generator.module_of_letter('A')?;
        generator
            .lsystem_mut()
            .set_axiom(ParametricString::from_modules(vec![a]));

        // growth
        let predecessor = generator.predecessor_of_letter('A')?;
        let mut growth = ParametricString::new();
        growth.push(generator.module_of_letter(Self::SIZE_LETTER)?);
        growth.push(generator.module_of_letter('F')?);
        for side in ['-', '+'] {
            growth.push(Module::open_bracket());
            growth.push(generator.module_of_letter(side)?);
            growth.push(generator.module_of_letter('A')?);
            growth.push(Module::close_bracket());
        }
        generator
            .lsystem_mut()
            .add_production(Production::new(predecessor, Condition::Always, growth));

        // length
        let predecessor = generator.predecessor_of_letter('F')?;
        let length =
            generator.append_module_from_predecessor('F', ParametricString::new(), &predecessor, None)?;
        generator
            .lsystem_mut()
            .add_production(Production::new(predecessor, Condition::Always, length));

        // size
        let predecessor = generator.predecessor_of_letter(Self::SIZE_LETTER)?;
        let size = generator.append_module_from_predecessor(
            Self::SIZE_LETTER,
            ParametricString::new(),
            &predecessor,
            Some("x*1.2"),
        )?;
        generator
            .lsystem_mut()
            .add_production(Production::new(predecessor, Condition::Always, size));

        Ok(())
    }
}

pub fn policy_for(kind: GeneratorKind) -> Box<dyn GenerationPolicy> {
    match kind {
        GeneratorKind::Generic => Box::new(GenericPolicy),
        GeneratorKind::Plants => Box::new(PlantPolicy),
    }
}
