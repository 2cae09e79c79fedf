use super::mutation::{MutationEntry, MutationKind, Tier};
use super::policy::{policy_for, GenerationPolicy};
use super::random::{random_item, round_two_digits, two_digit_float, weighted_index};
use super::templates::TemplateLibrary;
use crate::config::{GeneratorConfig, GeneratorKind};
use crate::engines::grammar::module::ORIENTATION_LETTERS;
use crate::engines::grammar::{Condition, LSystem, Module, Param, ParametricString, Production};
use crate::error::{PlantformError, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Which productions a mutation may pick from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionFilter {
    /// Skip successors longer than this.
    pub max_length: Option<usize>,
    /// Successor must contain this letter at least `min_count` times.
    pub letter: Option<char>,
    pub min_count: usize,
    pub exclude_predecessor: Option<char>,
    pub has_branches: Option<bool>,
    /// Skip productions with a parametric condition.
    pub non_parametric: bool,
    pub stochastic_only: bool,
}

impl ProductionFilter {
    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn with_letter(mut self, letter: char) -> Self {
        self.letter = Some(letter);
        self.min_count = self.min_count.max(1);
        self
    }

    pub fn at_least(mut self, count: usize) -> Self {
        self.min_count = count;
        self
    }

    pub fn excluding(mut self, predecessor: Option<char>) -> Self {
        self.exclude_predecessor = predecessor;
        self
    }

    pub fn with_branches(mut self) -> Self {
        self.has_branches = Some(true);
        self
    }

    fn accepts(&self, production: &Production) -> bool {
        let successor = &production.successor;
        if let Some(max) = self.max_length {
            if successor.len() > max {
                return false;
            }
        }
        if let Some(branches) = self.has_branches {
            if successor.has_branches() != branches {
                return false;
            }
        }
        if let Some(letter) = self.letter {
            if successor.count_letter(letter) < self.min_count {
                return false;
            }
        }
        if self.exclude_predecessor == Some(production.letter()) {
            return false;
        }
        if self.non_parametric && production.condition.is_parametric() {
            return false;
        }
        if self.stochastic_only && !production.condition.is_stochastic() {
            return false;
        }
        true
    }
}

/// Builds and incrementally mutates an [`LSystem`] using a template alphabet
/// and a [`GenerationPolicy`].
pub struct Generator {
    lsystem: LSystem,
    library: TemplateLibrary,
    policy: Box<dyn GenerationPolicy>,
    config: GeneratorConfig,
    rng: StdRng,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let policy = policy_for(config.kind);
        Self::with_policy(config, policy)
    }

    pub fn with_policy(config: GeneratorConfig, policy: Box<dyn GenerationPolicy>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let library = TemplateLibrary::new(
            config.parameterized,
            config.defines_probability,
            config.constants_probability,
            &config.limits,
        );
        let lsystem = LSystem::new(ParametricString::new(), config.target_iterations);
        Self {
            lsystem,
            library,
            policy,
            config,
            rng,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn kind(&self) -> GeneratorKind {
        self.policy.kind()
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn lsystem(&self) -> &LSystem {
        &self.lsystem
    }

    pub fn lsystem_mut(&mut self) -> &mut LSystem {
        &mut self.lsystem
    }

    pub fn set_lsystem(&mut self, lsystem: LSystem) {
        self.lsystem = lsystem;
    }

    pub fn take_lsystem(&mut self) -> LSystem {
        std::mem::take(&mut self.lsystem)
    }

    /// Run `mutate_any_multiple_times` on a copy of `lsystem`.
    pub fn mutated(&mut self, lsystem: &LSystem) -> Result<LSystem> {
        self.set_lsystem(lsystem.clone());
        self.mutate_any_multiple_times()?;
        let mut mutated = self.take_lsystem();
        mutated.clear_result();
        Ok(mutated)
    }

    pub fn clear(&mut self) {
        self.lsystem.clear();
    }

    /// Replace the current system with the simplest one of the policy.
    pub fn reset_to_simple(&mut self) -> Result<()> {
        self.clear();
        self.lsystem.set_iterations(self.config.target_iterations);
        let policy = std::mem::replace(&mut self.policy, Box::new(super::policy::GenericPolicy));
        let result = policy.build_simple(self);
        self.policy = policy;
        result
    }

    /// Uniformly random defines, axiom and productions.
    pub fn randomize(&mut self) -> Result<()> {
        self.clear();
        self.lsystem.set_iterations(self.config.target_iterations);
        let limits = self.config.limits.clone();

        let n_defines = self
            .rng
            .gen_range(limits.min_random_defines..=limits.max_random_defines);
        for _ in 0..n_defines {
            self.library.new_define(&mut self.lsystem, &mut self.rng);
        }

        let axiom = self.random_string(
            limits.min_generated_length,
            limits.max_generated_length,
            None,
        )?;
        self.lsystem.set_axiom(axiom);

        let n_productions = self
            .rng
            .gen_range(limits.min_random_productions..=limits.max_random_productions);
        for _ in 0..n_productions {
            let letters = self.library.letters();
            let letter = *random_item(&letters, &mut self.rng)
                .ok_or_else(|| PlantformError::Generation("empty template library".to_string()))?;
            let predecessor = self.predecessor_of_letter(letter)?;
            let successor = self.random_string(
                limits.min_generated_length,
                limits.max_generated_length,
                Some(&predecessor),
            )?;
            self.lsystem
                .add_production(Production::new(predecessor, Condition::Always, successor));
        }
        debug!("Randomized system:\n{}", self.lsystem);
        Ok(())
    }

    /// Start from the simplest system and apply `steps` complexifying mutations.
    pub fn logically_randomize(&mut self, steps: usize) -> Result<()> {
        self.reset_to_simple()?;
        for _ in 0..steps {
            self.mutate_complexify()?;
        }
        Ok(())
    }

    pub fn mutate_any_multiple_times(&mut self) -> Result<()> {
        for _ in 0..self.config.mutation_steps_at_once {
            self.mutate_any()?;
        }
        Ok(())
    }

    /// Simplify, modify or complexify according to the configured thresholds.
    pub fn mutate_any(&mut self) -> Result<Option<MutationKind>> {
        let draw = self.rng.gen::<f64>();
        if draw <= self.config.simplify_threshold {
            self.mutate_simplify()
        } else if draw <= self.config.modify_threshold {
            self.mutate_modify()
        } else {
            self.mutate_complexify()
        }
    }

    pub fn mutate_complexify(&mut self) -> Result<Option<MutationKind>> {
        self.mutate_tier(Tier::Complexify)
    }

    pub fn mutate_modify(&mut self) -> Result<Option<MutationKind>> {
        self.mutate_tier(Tier::Modify)
    }

    pub fn mutate_simplify(&mut self) -> Result<Option<MutationKind>> {
        self.mutate_tier(Tier::Simplify)
    }

    /// Pick a weighted mutation among the available ones of `tier` and apply it.
    /// Returns `None` when nothing in the tier is applicable.
    pub fn mutate_tier(&mut self, tier: Tier) -> Result<Option<MutationKind>> {
        let entries = self.available_mutations(tier);
        let weights: Vec<u32> = entries.iter().map(|e| e.weight).collect();
        match weighted_index(&weights, &mut self.rng) {
            Some(index) => {
                let kind = entries[index].kind;
                self.apply_mutation(kind)?;
                debug!("Mutation: {}", kind.description());
                Ok(Some(kind))
            }
            None => {
                debug!("Cannot perform any {:?} mutation", tier);
                Ok(None)
            }
        }
    }

    pub fn available_mutations(&self, tier: Tier) -> Vec<MutationEntry> {
        self.policy
            .mutations()
            .iter()
            .filter(|e| e.tier == tier && self.is_available(e.kind))
            .copied()
            .collect()
    }

    /// Gating predicate of each mutation on the current system.
    pub fn is_available(&self, kind: MutationKind) -> bool {
        let limits = &self.config.limits;
        let n_productions = self.lsystem.productions().len();
        let usable = self.usable();
        let short = usable.max_length(limits.max_successor_length);

        match kind {
            MutationKind::AddModuleAxiom => {
                self.lsystem.axiom().len_without_brackets() < limits.max_axiom_length
            }
            MutationKind::AddProduction => {
                n_productions < limits.max_productions
                    && !self.unused_predecessor_letters().is_empty()
            }
            MutationKind::AddModuleProduction => self.has_production(&short),
            MutationKind::SplitProduction => {
                self.config.stochastic_mutations
                    && n_productions < limits.max_productions
                    && self.has_production(&ProductionFilter {
                        non_parametric: true,
                        ..usable
                    })
            }
            MutationKind::ChangeModuleAxiom => {
                !self.replaceable_indices(self.lsystem.axiom()).is_empty()
            }
            MutationKind::ChangeModuleProduction => self.has_production(&usable),
            MutationKind::ChangeParameterExpression => {
                self.config.parameterized && self.has_production(&usable)
            }
            MutationKind::ChangeStochasticProduction => {
                self.config.stochastic_mutations
                    && self.has_production(&ProductionFilter {
                        stochastic_only: true,
                        ..usable
                    })
            }
            MutationKind::RemoveModuleAxiom => {
                self.lsystem.axiom().len_without_brackets() > limits.min_axiom_length
            }
            MutationKind::RemoveModuleProduction | MutationKind::RemoveProduction => {
                self.has_production(&usable)
            }
            MutationKind::AppendLeaf
            | MutationKind::SplitLine
            | MutationKind::RotateLine
            | MutationKind::InsertSize
            | MutationKind::InsertBranch => self.has_production(&short.with_letter('F')),
            MutationKind::InsertLine | MutationKind::InsertSelf => self.has_production(&short),
            MutationKind::ChangeParameter => {
                self.config.parameterized && self.has_production(&usable)
            }
            MutationKind::RemoveLeaf => self.has_production(&usable.with_letter('L')),
            MutationKind::RemoveSelf => self.has_production(&usable.with_letter('A')),
            MutationKind::RemoveSize => self.has_production(&usable.with_letter('!')),
            MutationKind::RemoveOrientation => ORIENTATION_LETTERS
                .iter()
                .any(|o| self.has_production(&usable.with_letter(*o))),
            MutationKind::RemoveLine => self.has_production(&usable.with_letter('F').at_least(2)),
            MutationKind::RemoveBranch => self.has_production(&usable.with_branches()),
        }
    }

    pub fn apply_mutation(&mut self, kind: MutationKind) -> Result<()> {
        let max_length = self.config.limits.max_successor_length;
        let usable = self.usable();
        let short = usable.max_length(max_length);

        match kind {
            MutationKind::AddModuleAxiom => {
                let axiom = self.lsystem.axiom().clone();
                let axiom = self.add_random_module(axiom)?;
                self.lsystem.set_axiom(axiom);
            }
            MutationKind::RemoveModuleAxiom => {
                let axiom = self.lsystem.axiom().clone();
                let axiom = self.remove_random_module(axiom);
                self.lsystem.set_axiom(axiom);
            }
            MutationKind::ChangeModuleAxiom => {
                let axiom = self.lsystem.axiom().clone();
                let axiom = self.change_random_module(axiom)?;
                self.lsystem.set_axiom(axiom);
            }
            MutationKind::AddModuleProduction => {
                self.edit_random_successor(&short, |g, s| g.add_random_module(s))?;
            }
            MutationKind::ChangeModuleProduction => {
                self.edit_random_successor(&usable, |g, s| g.change_random_module(s))?;
            }
            MutationKind::RemoveModuleProduction => {
                if let Some(index) =
                    self.edit_random_successor(&usable, |g, s| Ok(g.remove_random_module(s)))?
                {
                    if self.lsystem.productions()[index].successor.is_empty() {
                        self.delete_production(index, true);
                    }
                }
            }
            MutationKind::AddProduction => self.add_production_for_unused_letter()?,
            MutationKind::RemoveProduction => {
                if let Some(index) = self.random_production(&usable) {
                    self.delete_production(index, true);
                }
            }
            MutationKind::SplitProduction => {
                let filter = ProductionFilter {
                    non_parametric: true,
                    ..usable
                };
                if let Some(index) = self.random_production(&filter) {
                    self.split_production(index)?;
                }
            }
            MutationKind::ChangeStochasticProduction => {
                let filter = ProductionFilter {
                    stochastic_only: true,
                    ..usable
                };
                if let Some(index) = self.random_production(&filter) {
                    self.change_stochastic_weight(index);
                }
            }
            MutationKind::ChangeParameterExpression | MutationKind::ChangeParameter => {
                if let Some(index) = self.random_production(&usable) {
                    let production = self.lsystem.productions()[index].clone();
                    let successor = self
                        .change_random_parameter(production.successor, Some(&production.predecessor))?;
                    self.lsystem.productions_mut()[index].successor = successor;
                }
            }
            MutationKind::AppendLeaf => {
                let replacement = self.modules_of_letters(&['F', 'L'])?;
                self.replace_line(&short, replacement)?;
                self.remove_duplicates_of('L');
            }
            MutationKind::InsertLine => {
                self.edit_random_successor(&short, |g, s| g.insert_module_of_letter_randomly('F', s))?;
            }
            MutationKind::InsertSelf => {
                self.edit_random_successor(&short, |g, s| g.insert_module_of_letter_randomly('A', s))?;
            }
            MutationKind::InsertBranch => {
                let orientation = self.random_orientation();
                let mut replacement = ParametricString::new();
                replacement.push(Module::open_bracket());
                replacement.extend(self.modules_of_letters(&[orientation, 'F'])?);
                replacement.push(Module::close_bracket());
                replacement.push(self.module_of_letter('F')?);
                self.replace_line(&short, replacement)?;
            }
            MutationKind::InsertSize => {
                let replacement = self.modules_of_letters(&['!', 'F'])?;
                self.replace_line(&short, replacement)?;
                self.remove_duplicates_of('!');
            }
            MutationKind::SplitLine => {
                let mut replacement = ParametricString::new();
                for _ in 0..2 {
                    let orientation = self.random_orientation();
                    replacement.push(Module::open_bracket());
                    replacement.extend(self.modules_of_letters(&[orientation, 'F'])?);
                    replacement.push(Module::close_bracket());
                }
                self.replace_line(&short, replacement)?;
            }
            MutationKind::RotateLine => {
                let orientation = self.random_orientation();
                let replacement = self.modules_of_letters(&[orientation, 'F'])?;
                self.replace_line(&short, replacement)?;
                self.remove_duplicates_of(orientation);
            }
            MutationKind::RemoveLeaf => self.remove_letter_from_random_production('L', 1),
            MutationKind::RemoveSelf => self.remove_letter_from_random_production('A', 1),
            MutationKind::RemoveSize => self.remove_letter_from_random_production('!', 1),
            MutationKind::RemoveLine => self.remove_letter_from_random_production('F', 2),
            MutationKind::RemoveOrientation => {
                let mut letters = ORIENTATION_LETTERS.to_vec();
                letters.shuffle(&mut self.rng);
                if let Some(letter) = letters
                    .into_iter()
                    .find(|o| self.has_production(&usable.with_letter(*o)))
                {
                    self.remove_letter_from_random_production(letter, 1);
                }
            }
            MutationKind::RemoveBranch => {
                self.edit_random_successor(&usable.with_branches(), |_, s| Ok(remove_first_branch(s)))?;
            }
        }
        Ok(())
    }

    // Module creation

    pub fn module_of_letter(&mut self, letter: char) -> Result<Module> {
        let template = self
            .library
            .get(letter)
            .ok_or_else(|| PlantformError::Generation(format!("no template for '{}'", letter)))?;
        Ok(self
            .library
            .create_module(template, false, &mut self.lsystem, &mut self.rng))
    }

    pub fn predecessor_of_letter(&mut self, letter: char) -> Result<Module> {
        let template = self
            .library
            .get(letter)
            .ok_or_else(|| PlantformError::Generation(format!("no template for '{}'", letter)))?;
        Ok(self
            .library
            .create_module(template, true, &mut self.lsystem, &mut self.rng))
    }

    fn modules_of_letters(&mut self, letters: &[char]) -> Result<ParametricString> {
        let mut s = ParametricString::new();
        for letter in letters {
            s.push(self.module_of_letter(*letter)?);
        }
        Ok(s)
    }

    pub fn weighted_random_module(&mut self) -> Result<Module> {
        let weights = self.library.weights();
        let index = weighted_index(&weights, &mut self.rng)
            .ok_or_else(|| PlantformError::Generation("empty template library".to_string()))?;
        let template = &self.library.templates()[index];
        Ok(self
            .library
            .create_module(template, false, &mut self.lsystem, &mut self.rng))
    }

    /// Uniformly random module whose letter differs from `excluded`.
    pub fn random_module_excluding(&mut self, excluded: char) -> Result<Module> {
        let candidates: Vec<usize> = self
            .library
            .templates()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.letter != excluded)
            .map(|(i, _)| i)
            .collect();
        let index = *random_item(&candidates, &mut self.rng)
            .ok_or_else(|| PlantformError::Generation("no replacement template".to_string()))?;
        let template = &self.library.templates()[index];
        Ok(self
            .library
            .create_module(template, false, &mut self.lsystem, &mut self.rng))
    }

    fn random_orientation(&mut self) -> char {
        *random_item(&ORIENTATION_LETTERS, &mut self.rng).unwrap_or(&'+')
    }

    /// A weighted random string of `min..=max` modules with random balanced
    /// branches. When a predecessor is given its formal parameters are bound
    /// into random modules of the string.
    pub fn random_string(
        &mut self,
        min: usize,
        max: usize,
        predecessor: Option<&Module>,
    ) -> Result<ParametricString> {
        let n_modules = self.rng.gen_range(min..=max);
        let branch_probability = self.config.branch_probability;
        let close_probability = self.config.branch_close_probability;
        let mut s = ParametricString::new();
        let mut open_branches = 0;

        for _ in 0..n_modules {
            let module = self.weighted_random_module()?;
            if branch_probability > 0.0 {
                if open_branches > 0 && self.rng.gen::<f64>() < close_probability {
                    s.push(Module::close_bracket());
                    open_branches -= 1;
                }
                if self.rng.gen::<f64>() < branch_probability {
                    s.push(Module::open_bracket());
                    open_branches += 1;
                }
            }
            s.push(module);
        }
        for _ in 0..open_branches {
            s.push(Module::close_bracket());
        }

        if let Some(predecessor) = predecessor {
            self.bind_predecessor_params(&mut s, predecessor);
        }
        Ok(s)
    }

    /// Copy each formal of `predecessor` into a random parameter slot of `s`.
    fn bind_predecessor_params(&mut self, s: &mut ParametricString, predecessor: &Module) {
        if !self.config.parameterized {
            return;
        }
        let candidates: Vec<usize> = s
            .actual_indices()
            .into_iter()
            .filter(|i| !s.modules()[*i].params.is_empty())
            .collect();
        for param in &predecessor.params {
            if let Some(&index) = random_item(&candidates, &mut self.rng) {
                if let Some(module) = s.get_mut(index) {
                    let slot = self.rng.gen_range(0..module.params.len());
                    module.params[slot] = param.clone();
                }
            }
        }
    }

    pub fn append_module_from_predecessor(
        &mut self,
        letter: char,
        mut s: ParametricString,
        predecessor: &Module,
        forced: Option<&str>,
    ) -> Result<ParametricString> {
        s.push(self.module_of_letter(letter)?);
        match forced {
            Some(expression) => s.set_params_of_letter(letter, &Param::parse(expression)),
            None => self.bind_predecessor_params(&mut s, predecessor),
        }
        Ok(s)
    }

    // String edits

    pub fn add_random_module(&mut self, mut s: ParametricString) -> Result<ParametricString> {
        let module = self.weighted_random_module()?;
        let index = self.rng.gen_range(0..=s.len());
        s.insert(index, module);
        Ok(s)
    }

    pub fn insert_module_of_letter_randomly(
        &mut self,
        letter: char,
        mut s: ParametricString,
    ) -> Result<ParametricString> {
        let module = self.module_of_letter(letter)?;
        let index = self.rng.gen_range(0..=s.len());
        s.insert(index, module);
        Ok(s)
    }

    /// Indices of non-bracket modules whose letter belongs to the alphabet.
    fn replaceable_indices(&self, s: &ParametricString) -> Vec<usize> {
        s.actual_indices()
            .into_iter()
            .filter(|i| self.library.contains(s.modules()[*i].letter))
            .collect()
    }

    pub fn remove_random_module(&mut self, s: ParametricString) -> ParametricString {
        let candidates = self.replaceable_indices(&s);
        match random_item(&candidates, &mut self.rng) {
            Some(&index) => remove_module_at(s, index),
            None => s,
        }
    }

    /// Swap a random module for a different letter, keeping parameters by position.
    pub fn change_random_module(&mut self, mut s: ParametricString) -> Result<ParametricString> {
        let candidates = self.replaceable_indices(&s);
        let index = match random_item(&candidates, &mut self.rng) {
            Some(&index) => index,
            None => return Ok(s),
        };
        let old = s.modules()[index].clone();
        let mut replacement = self.random_module_excluding(old.letter)?;
        if self.config.parameterized {
            for (new, old) in replacement.params.iter_mut().zip(old.params.iter()) {
                *new = old.clone();
            }
        }
        s.modules_mut()[index] = replacement;
        Ok(s)
    }

    /// Rewrite a random parameter: either a formal of the predecessor or a new
    /// constant, optionally scaled by a random factor.
    pub fn change_random_parameter(
        &mut self,
        mut s: ParametricString,
        predecessor: Option<&Module>,
    ) -> Result<ParametricString> {
        let candidates: Vec<usize> = s
            .actual_indices()
            .into_iter()
            .filter(|i| !s.modules()[*i].params.is_empty())
            .collect();
        let index = match random_item(&candidates, &mut self.rng) {
            Some(&index) => index,
            None => return Ok(s),
        };
        let letter = s.modules()[index].letter;
        let slot = self.rng.gen_range(0..s.modules()[index].params.len());

        let use_predecessor = match predecessor {
            Some(p) if !p.params.is_empty() => self.rng.gen::<f64>() <= 0.5,
            _ => false,
        };
        let change_to = match (use_predecessor, predecessor) {
            (true, Some(p)) => random_item(&p.params, &mut self.rng)
                .cloned()
                .unwrap_or(Param::Number(1.0)),
            _ => match self.library.get(letter) {
                Some(template) => Param::Number(template.constant(&mut self.rng)),
                None => return Ok(s),
            },
        };
        let change_to = if self.rng.gen::<f64>() <= 0.5 {
            let factor = two_digit_float(&mut self.rng, 0.5, 2.0);
            Param::Symbol(format!("{}*{}", change_to, factor))
        } else {
            change_to
        };

        if let Some(module) = s.get_mut(index) {
            module.params[slot] = change_to;
        }
        Ok(s)
    }

    /// Add, change or remove a module, staying within the successor length bounds.
    fn mutate_successor_randomly(&mut self, s: ParametricString) -> Result<ParametricString> {
        let limits = &self.config.limits;
        let length = s.len_without_brackets();
        let choice = if length <= limits.min_successor_length {
            self.rng.gen_range(0..=1)
        } else if length >= limits.max_successor_length {
            self.rng.gen_range(1..=2)
        } else {
            self.rng.gen_range(0..=2)
        };
        match choice {
            0 => self.add_random_module(s),
            1 => self.change_random_module(s),
            _ => Ok(self.remove_random_module(s)),
        }
    }

    /// Replace a random `F` of a random production with `replacement`.
    /// Same-letter modules of the replacement inherit the parameters of the `F`.
    fn replace_line(&mut self, filter: &ProductionFilter, replacement: ParametricString) -> Result<()> {
        let parameterized = self.config.parameterized;
        self.edit_random_successor(&filter.with_letter('F'), move |g, mut s| {
            let lines: Vec<usize> = s
                .iter()
                .enumerate()
                .filter(|(_, m)| m.letter == 'F')
                .map(|(i, _)| i)
                .collect();
            let index = match random_item(&lines, &mut g.rng) {
                Some(&index) => index,
                None => return Ok(s),
            };
            let from = s.modules()[index].clone();
            let mut replacement = replacement;
            if parameterized {
                for m in replacement.modules_mut().iter_mut() {
                    if m.letter == from.letter {
                        for (to, value) in m.params.iter_mut().zip(from.params.iter()) {
                            *to = value.clone();
                        }
                    }
                }
            }
            s.splice_at(index, replacement);
            Ok(s)
        })?;
        Ok(())
    }

    /// Drop the later of two adjacent same-letter modules, brackets ignored.
    pub fn remove_duplicates_of(&mut self, letter: char) {
        for production in self.lsystem.productions_mut().iter_mut() {
            let successor = &mut production.successor;
            let actual = successor.actual_indices();
            let duplicates: Vec<usize> = (1..actual.len())
                .rev()
                .filter(|k| {
                    let current = &successor.modules()[actual[*k]];
                    let previous = &successor.modules()[actual[*k - 1]];
                    current.letter == letter && previous.letter == letter
                })
                .map(|k| actual[k])
                .collect();
            for index in duplicates {
                successor.remove(index);
            }
        }
    }

    fn remove_letter_from_random_production(&mut self, letter: char, min_count: usize) {
        let filter = self.usable().with_letter(letter).at_least(min_count);
        if let Some(index) = self.random_production(&filter) {
            let successor = self.lsystem.productions()[index].successor.clone();
            if let Some(position) = successor.first_index_of(letter) {
                self.lsystem.productions_mut()[index].successor = remove_module_at(successor, position);
            }
        }
    }

    // Productions

    fn usable(&self) -> ProductionFilter {
        ProductionFilter::default().excluding(self.policy.protected_predecessor())
    }

    pub fn production_indices(&self, filter: &ProductionFilter) -> Vec<usize> {
        self.lsystem
            .productions()
            .iter()
            .enumerate()
            .filter(|(_, p)| filter.accepts(p))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_production(&self, filter: &ProductionFilter) -> bool {
        self.lsystem.productions().iter().any(|p| filter.accepts(p))
    }

    pub fn random_production(&mut self, filter: &ProductionFilter) -> Option<usize> {
        let indices = self.production_indices(filter);
        random_item(&indices, &mut self.rng).copied()
    }

    /// Apply `edit` to the successor of a random production matching `filter`.
    /// Returns the index of the edited production.
    fn edit_random_successor<F>(&mut self, filter: &ProductionFilter, edit: F) -> Result<Option<usize>>
    where
        F: FnOnce(&mut Self, ParametricString) -> Result<ParametricString>,
    {
        let index = match self.random_production(filter) {
            Some(index) => index,
            None => return Ok(None),
        };
        let successor = self.lsystem.productions()[index].successor.clone();
        let successor = edit(self, successor)?;
        self.lsystem.productions_mut()[index].successor = successor;
        Ok(Some(index))
    }

    /// Letters used anywhere in the system that no production rewrites yet.
    pub fn unused_predecessor_letters(&self) -> Vec<char> {
        let mut used: Vec<char> = Vec::new();
        let mut note = |letter: char| {
            if self.library.contains(letter) && !used.contains(&letter) {
                used.push(letter);
            }
        };
        for m in self.lsystem.axiom().iter() {
            note(m.letter);
        }
        for p in self.lsystem.productions() {
            note(p.letter());
            for m in p.successor.iter() {
                note(m.letter);
            }
        }
        used.into_iter()
            .filter(|l| self.lsystem.production_with_predecessor(*l).is_none())
            .collect()
    }

    fn add_production_for_unused_letter(&mut self) -> Result<()> {
        let letters = self.unused_predecessor_letters();
        let letter = match random_item(&letters, &mut self.rng) {
            Some(&letter) => letter,
            None => {
                debug!("No letter left for a new production");
                return Ok(());
            }
        };
        let predecessor = self.predecessor_of_letter(letter)?;
        let limits = self.config.limits.clone();
        let successor = self.random_string(
            limits.min_generated_length,
            limits.max_generated_length,
            Some(&predecessor),
        )?;
        self.lsystem
            .add_production(Production::new(predecessor, Condition::Always, successor));
        Ok(())
    }

    /// Remove a production. With `redistribute`, stochastic siblings are rescaled to sum to one.
    pub fn delete_production(&mut self, index: usize, redistribute: bool) -> Option<Production> {
        let deleted = self.lsystem.remove_production(index)?;
        if redistribute && deleted.condition.is_stochastic() {
            self.normalize_stochastic(deleted.letter(), None);
        }
        Some(deleted)
    }

    /// Rescale the stochastic productions of `letter` so the group sums to one.
    /// The weight of `fixed`, when given, is kept as is.
    fn normalize_stochastic(&mut self, letter: char, fixed: Option<usize>) {
        let productions = self.lsystem.productions();
        let fixed_weight = fixed
            .and_then(|i| productions.get(i))
            .and_then(|p| match p.condition {
                Condition::Stochastic(w) => Some(w),
                _ => None,
            })
            .unwrap_or(0.0);
        let target = (1.0 - fixed_weight).max(0.0);

        let siblings: Vec<(usize, f64)> = productions
            .iter()
            .enumerate()
            .filter(|(i, p)| p.letter() == letter && Some(*i) != fixed)
            .filter_map(|(i, p)| match p.condition {
                Condition::Stochastic(w) => Some((i, w)),
                _ => None,
            })
            .collect();
        if siblings.is_empty() {
            return;
        }
        let total: f64 = siblings.iter().map(|(_, w)| w).sum();
        let count = siblings.len() as f64;

        let productions = self.lsystem.productions_mut();
        for (i, w) in siblings {
            let scaled = if total > 0.0 {
                w / total * target
            } else {
                target / count
            };
            productions[i].condition = Condition::Stochastic(round_two_digits(scaled));
        }
    }

    /// Replace a production by two stochastic variants whose weights sum to its own.
    fn split_production(&mut self, index: usize) -> Result<()> {
        let production = match self.delete_production(index, false) {
            Some(p) => p,
            None => return Ok(()),
        };
        let weight = production.condition.weight().unwrap_or(1.0);
        let split = two_digit_float(&mut self.rng, 0.0, weight);

        for value in [split, round_two_digits(weight - split)] {
            let successor = self.mutate_successor_randomly(production.successor.clone())?;
            self.lsystem.add_production(Production::new(
                production.predecessor.clone(),
                Condition::Stochastic(value),
                successor,
            ));
        }
        Ok(())
    }

    fn change_stochastic_weight(&mut self, index: usize) {
        let (letter, weight) = match self.lsystem.production(index) {
            Some(Production {
                predecessor,
                condition: Condition::Stochastic(w),
                ..
            }) => (predecessor.letter, *w),
            _ => return,
        };
        let delta = self.rng.gen_range(-0.5..0.5);
        let new_weight = round_two_digits((weight + delta).clamp(0.1, 0.9));
        self.lsystem.productions_mut()[index].condition = Condition::Stochastic(new_weight);
        self.normalize_stochastic(letter, Some(index));
    }
}

/// Remove the module at `index`. If it was alone inside a branch, the now empty
/// brackets go too, repeatedly outwards.
pub fn remove_module_at(mut s: ParametricString, index: usize) -> ParametricString {
    if index >= s.len() {
        return s;
    }
    s.remove(index);
    let mut index = index;
    while index > 0
        && index < s.len()
        && s.modules()[index - 1].is_open_bracket()
        && s.modules()[index].is_close_bracket()
    {
        s.remove(index);
        s.remove(index - 1);
        index -= 1;
    }
    s
}

/// Remove the innermost bracket pair that closes first, with its content.
/// A successor that is entirely one branch is left alone.
pub fn remove_first_branch(mut s: ParametricString) -> ParametricString {
    let mut start = None;
    let mut end = None;
    for (i, m) in s.iter().enumerate() {
        if m.is_open_bracket() {
            start = Some(i);
        } else if m.is_close_bracket() {
            end = Some(i + 1);
            break;
        }
    }
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return s,
    };
    if start == 0 && end == s.len() {
        return s;
    }
    s.modules_mut().drain(start..end);
    s
}
