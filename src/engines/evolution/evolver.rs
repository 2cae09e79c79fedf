use super::fitness::{fitness_from_config, FitnessFunction};
use super::instance::GeneticInstance;
use super::operators::{best_selection, roulette_selection, sort_population, switch_strings};
use super::progress::NullProgressCallback;
use super::render_params::RenderParameters;
use crate::config::{AppConfig, EvolverConfig, InitialPopulation};
use crate::engines::generation::Generator;
use crate::engines::grammar::LSystem;
use crate::engines::turtle::Turtle;
use crate::error::{PlantformError, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, population_size: usize);
    fn on_instance_evaluated(&mut self, instance_num: usize, total: usize);
}

/// Genetic search over L-systems and their render parameters.
pub struct GeneticEvolver {
    config: EvolverConfig,
    generator: Generator,
    turtle: Turtle,
    fitness: Box<dyn FitnessFunction>,
    starting_instance: Option<GeneticInstance>,
    current_population: Vec<GeneticInstance>,
    rng: StdRng,
}

impl GeneticEvolver {
    pub fn new(
        config: EvolverConfig,
        generator: Generator,
        turtle: Turtle,
        fitness: Box<dyn FitnessFunction>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            generator,
            turtle,
            fitness,
            starting_instance: None,
            current_population: Vec::new(),
            rng,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.evolver.clone(),
            Generator::new(config.generator.clone()),
            Turtle::new(config.turtle.clone()),
            fitness_from_config(&config.fitness),
        ))
    }

    pub fn config(&self) -> &EvolverConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EvolverConfig {
        &mut self.config
    }

    pub fn generator_mut(&mut self) -> &mut Generator {
        &mut self.generator
    }

    pub fn turtle(&self) -> &Turtle {
        &self.turtle
    }

    pub fn fitness_function(&self) -> &dyn FitnessFunction {
        self.fitness.as_ref()
    }

    pub fn set_fitness_function(&mut self, fitness: Box<dyn FitnessFunction>) {
        self.fitness = fitness;
    }

    /// Start the next populations from copies of `instance`.
    pub fn set_starting_instance(&mut self, instance: GeneticInstance) {
        self.config.initial_population = InitialPopulation::FromInstance;
        self.starting_instance = Some(instance);
    }

    pub fn remove_starting_instance(&mut self) {
        self.config.initial_population = InitialPopulation::Randomized;
        self.starting_instance = None;
    }

    pub fn current_population(&self) -> &[GeneticInstance] {
        &self.current_population
    }

    pub fn best_instance(&self) -> Option<&GeneticInstance> {
        self.current_population.first()
    }

    // ------------------------------------------------------------------
    // Evolution
    // ------------------------------------------------------------------

    /// Generate a fresh population and evolve it.
    pub fn evolve<C: ProgressCallback>(
        &mut self,
        population_size: usize,
        generations: usize,
        target_fitness: f64,
        callback: &mut C,
    ) -> Result<Vec<GeneticInstance>> {
        let population = self.generate_population(population_size)?;
        debug!("Initial population:");
        for instance in &population {
            debug!("{}", instance.short_string());
        }
        self.evolve_population(population, generations, target_fitness, callback)
    }

    /// Evolve for `generations` steps, or until `target_fitness` is reached when it is positive.
    pub fn evolve_population<C: ProgressCallback>(
        &mut self,
        mut population: Vec<GeneticInstance>,
        generations: usize,
        target_fitness: f64,
        callback: &mut C,
    ) -> Result<Vec<GeneticInstance>> {
        let limit = if target_fitness > 0.0 {
            self.config.max_target_iterations
        } else {
            generations
        };

        for generation in 0..limit {
            callback.on_generation_start(generation);
            population = self.evolve_step(&population)?;

            let best = population.first().map(|i| i.score()).unwrap_or(0.0);
            callback.on_generation_complete(generation, best, population.len());

            if target_fitness > 0.0 && best >= target_fitness {
                info!("Target fitness {} reached at generation {}", target_fitness, generation + 1);
                break;
            }
        }

        Ok(population)
    }

    /// One generation: elitism, selection, crossover, mutation, evaluation and truncation.
    pub fn evolve_step(&mut self, population: &[GeneticInstance]) -> Result<Vec<GeneticInstance>> {
        let population_size = population.len();
        if population_size == 0 {
            return Err(PlantformError::Generation(
                "Cannot evolve an empty population".to_string(),
            ));
        }
        let mut new_population = Vec::with_capacity(population_size + 1);
        let mut recap = String::from("Evolve step recap:");

        // Elitism
        let elite = population
            .iter()
            .max_by(|a, b| a.score().partial_cmp(&b.score()).unwrap_or(std::cmp::Ordering::Equal))
            .cloned()
            .ok_or_else(|| PlantformError::Generation("No elite instance".to_string()))?;
        recap.push_str(&format!("\n  elite: {}", elite.short_string()));
        new_population.push(elite);

        for _ in 0..population_size / 2 {
            let parents = self.select(population, 2);
            if parents.len() < 2 {
                break;
            }

            let offspring = if self.rng.gen::<f64>() < self.config.crossover_rate {
                let (first, second) = self.cross_pair(&parents[0], &parents[1])?;
                recap.push_str("\n  crossed");
                vec![first, second]
            } else {
                parents
            };

            for instance in offspring {
                let instance = if self.rng.gen::<f64>() < self.config.mutation_rate {
                    let mutated = self.mutate_instance(&instance)?;
                    recap.push_str(&format!("\n  mutated: {}", mutated.lsystem.to_genome()));
                    mutated
                } else {
                    instance
                };
                new_population.push(instance);
            }
        }

        self.evaluate_population(&mut new_population, &mut NullProgressCallback);
        sort_population(&mut new_population);
        new_population.truncate(population_size);

        info!(
            "Evolved {} instances, best fitness {:.4}",
            new_population.len(),
            new_population.first().map(|i| i.score()).unwrap_or(0.0)
        );
        debug!("{}", recap);

        self.current_population = new_population.clone();
        Ok(new_population)
    }

    /// Score every instance that has no fitness yet.
    pub fn evaluate_population<C: ProgressCallback>(
        &self,
        population: &mut [GeneticInstance],
        callback: &mut C,
    ) {
        let total = population.len();
        let turtle = &self.turtle;
        let fitness = self.fitness.as_ref();

        if self.config.parallel_fitness {
            population
                .par_iter_mut()
                .filter(|instance| !instance.is_evaluated())
                .for_each(|instance| {
                    instance.fitness = Some(score_instance(turtle, fitness, instance));
                });
            callback.on_instance_evaluated(total, total);
        } else {
            for (i, instance) in population.iter_mut().enumerate() {
                if !instance.is_evaluated() {
                    instance.fitness = Some(score_instance(turtle, fitness, instance));
                }
                callback.on_instance_evaluated(i + 1, total);
            }
        }
    }

    // ------------------------------------------------------------------
    // Population generation
    // ------------------------------------------------------------------

    /// Build, evaluate and sort the first population.
    pub fn generate_population(&mut self, population_size: usize) -> Result<Vec<GeneticInstance>> {
        debug!(
            "Generating population of {} with {:?}",
            population_size, self.config.initial_population
        );
        let mut population = match self.config.initial_population {
            InitialPopulation::Randomized => self.generate_random_population(population_size)?,
            InitialPopulation::FromInstance => {
                let instance = self.starting_instance.clone().ok_or_else(|| {
                    PlantformError::Configuration(
                        "Population from instance requires a starting instance".to_string(),
                    )
                })?;
                self.initialise_population_to(&instance, population_size)
            }
            InitialPopulation::FromAutomatedEvolution => {
                self.generate_automated_population(population_size)?
            }
        };

        sort_population(&mut population);
        self.current_population = population.clone();
        Ok(population)
    }

    pub fn generate_random_population(&mut self, population_size: usize) -> Result<Vec<GeneticInstance>> {
        let mut population = Vec::with_capacity(population_size);
        for _ in 0..population_size {
            let mut retries = 0;
            let lsystem = loop {
                self.generator
                    .logically_randomize(self.config.initialisation_complexify_steps)?;
                let mut candidate = self.generator.lsystem().clone();
                if retries < self.config.max_discard_retries && self.should_discard(&mut candidate) {
                    warn!("Discarding generated grammar {}", candidate.to_genome());
                    retries += 1;
                    continue;
                }
                break candidate;
            };
            let instance = self.new_instance(lsystem);
            debug!("Added to population: {}", instance.short_string());
            population.push(instance);
        }
        Ok(population)
    }

    /// Each member is the best of a short evolution towards `good_initial_fitness`.
    pub fn generate_automated_population(&mut self, population_size: usize) -> Result<Vec<GeneticInstance>> {
        let mut population = Vec::with_capacity(population_size);
        for _ in 0..population_size {
            let mut candidates = self.generate_random_population(population_size)?;
            sort_population(&mut candidates);
            let target = self.config.good_initial_fitness;
            let evolved = self.evolve_population(candidates, 0, target, &mut NullProgressCallback)?;
            if let Some(best) = evolved.into_iter().next() {
                debug!("Added to population: {}", best.short_string());
                population.push(best);
            }
        }
        Ok(population)
    }

    /// `population_size` copies of `instance`, sharing one fitness evaluation.
    pub fn initialise_population_to(
        &mut self,
        instance: &GeneticInstance,
        population_size: usize,
    ) -> Vec<GeneticInstance> {
        let mut template = instance.clone();
        template.fitness = Some(score_instance(&self.turtle, self.fitness.as_ref(), &mut template));
        vec![template; population_size]
    }

    fn new_instance(&mut self, lsystem: LSystem) -> GeneticInstance {
        let mut instance = GeneticInstance::new(lsystem);
        if self.config.consider_render_parameters {
            instance.render.randomize(&mut self.rng);
        }
        instance.fitness = Some(score_instance(&self.turtle, self.fitness.as_ref(), &mut instance));
        instance
    }

    // ------------------------------------------------------------------
    // Crossover
    // ------------------------------------------------------------------

    /// Cross consecutive pairs with probability `crossover_rate`. An odd last instance passes through.
    pub fn crossover(&mut self, population: &[GeneticInstance]) -> Result<Vec<GeneticInstance>> {
        let mut crossed = Vec::with_capacity(population.len());
        for pair in population.chunks(2) {
            match pair {
                [first, second] if self.rng.gen::<f64>() < self.config.crossover_rate => {
                    let (a, b) = self.cross_pair(first, second)?;
                    crossed.push(a);
                    crossed.push(b);
                }
                _ => crossed.extend(pair.iter().cloned()),
            }
        }
        Ok(crossed)
    }

    /// Recombine axioms, production lists and one pair of successors.
    pub fn cross_pair(
        &mut self,
        first: &GeneticInstance,
        second: &GeneticInstance,
    ) -> Result<(GeneticInstance, GeneticInstance)> {
        let mut child1 = first.lsystem.clone();
        let mut child2 = second.lsystem.clone();

        let (axiom1, axiom2) = switch_strings(first.lsystem.axiom(), second.lsystem.axiom(), &mut self.rng);
        child1.set_axiom(axiom1);
        child2.set_axiom(axiom2);

        // Production lists swap their tails. Child sizes follow the other parent.
        let productions1 = first.lsystem.productions();
        let productions2 = second.lsystem.productions();
        let switch_point = self
            .rng
            .gen_range(0..=productions1.len().min(productions2.len()));
        child1.clear_productions();
        child2.clear_productions();
        for i in 0..productions2.len() {
            let source = if i < switch_point { &productions1[i] } else { &productions2[i] };
            child1.add_production(source.clone());
        }
        for i in 0..productions1.len() {
            let source = if i < switch_point { &productions2[i] } else { &productions1[i] };
            child2.add_production(source.clone());
        }

        self.cross_successors(&mut child1, &mut child2);

        child1.merge_defines(second.lsystem.defines());
        child2.merge_defines(first.lsystem.defines());

        let mut offspring1 = GeneticInstance::new(child1).with_render(first.render.clone());
        let mut offspring2 = GeneticInstance::new(child2).with_render(second.render.clone());
        if self.config.consider_render_parameters {
            let (render1, render2) = RenderParameters::crossover(&first.render, &second.render, &mut self.rng);
            offspring1.render = render1;
            offspring2.render = render2;
        }
        offspring1.invalidate();
        offspring2.invalidate();

        Ok((offspring1, offspring2))
    }

    /// Point crossover of the successors of one predecessor shared by both children.
    fn cross_successors(&mut self, child1: &mut LSystem, child2: &mut LSystem) {
        if child1.productions().is_empty() {
            return;
        }
        let index1 = self.rng.gen_range(0..child1.productions().len());
        let letter = child1.productions()[index1].letter();
        let Some(index2) = child2.production_with_predecessor(letter) else {
            debug!("No shared predecessor {} for successor crossover", letter);
            return;
        };

        let successor1 = child1.productions()[index1].successor.clone();
        let successor2 = child2.productions()[index2].successor.clone();
        for _ in 0..self.config.crossover_retry_limit {
            let (s1, s2) = switch_strings(&successor1, &successor2, &mut self.rng);
            if s1.is_balanced() && s2.is_balanced() {
                child1.productions_mut()[index1].successor = s1;
                child2.productions_mut()[index2].successor = s2;
                return;
            }
        }
        warn!(
            "Successor crossover on {} found no balanced split after {} tries, keeping parents",
            letter, self.config.crossover_retry_limit
        );
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Mutate each instance with probability `mutation_rate`.
    pub fn mutate(&mut self, population: &[GeneticInstance]) -> Result<Vec<GeneticInstance>> {
        population
            .iter()
            .map(|instance| {
                if self.rng.gen::<f64>() < self.config.mutation_rate {
                    self.mutate_instance(instance)
                } else {
                    Ok(instance.clone())
                }
            })
            .collect()
    }

    /// A mutated copy of `instance`, retrying discarded grammars a bounded number of times.
    pub fn mutate_instance(&mut self, instance: &GeneticInstance) -> Result<GeneticInstance> {
        let mut retries = 0;
        let lsystem = loop {
            let mut candidate = self.generator.mutated(&instance.lsystem)?;
            if retries >= self.config.max_discard_retries {
                debug!("Too many discards, keeping the mutation");
                break candidate;
            }
            if self.should_discard(&mut candidate) {
                debug!("Discarding mutation {}", candidate.to_genome());
                retries += 1;
                continue;
            }
            break candidate;
        };

        let mut mutated = GeneticInstance::new(lsystem).with_render(instance.render.clone());
        if self.config.consider_render_parameters {
            mutated.render.mutate(&mut self.rng);
        }
        mutated.invalidate();
        Ok(mutated)
    }

    /// Steady-state variation: crossover, then mutation, then evaluation.
    pub fn mutate_and_recombine(&mut self, population: &[GeneticInstance]) -> Result<Vec<GeneticInstance>> {
        let crossed = self.crossover(population)?;
        let mut mutated = self.mutate(&crossed)?;
        self.evaluate_population(&mut mutated, &mut NullProgressCallback);
        sort_population(&mut mutated);
        self.current_population = mutated.clone();
        Ok(mutated)
    }

    /// Keep `population[chosen]` and fill the rest with its mutated copies.
    pub fn breed_from_choice(
        &mut self,
        population: &[GeneticInstance],
        chosen: usize,
    ) -> Result<Vec<GeneticInstance>> {
        let parent = population.get(chosen).cloned().ok_or_else(|| {
            PlantformError::Generation(format!(
                "Chosen instance {} is outside a population of {}",
                chosen,
                population.len()
            ))
        })?;

        let mut bred = Vec::with_capacity(population.len());
        for _ in 1..population.len() {
            bred.push(self.mutate_instance(&parent)?);
        }
        bred.insert(0, parent);
        self.evaluate_population(&mut bred, &mut NullProgressCallback);
        self.current_population = bred.clone();
        Ok(bred)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Fitness-proportional selection with replacement.
    pub fn select(&mut self, population: &[GeneticInstance], count: usize) -> Vec<GeneticInstance> {
        roulette_selection(population, count, &mut self.rng)
            .into_iter()
            .map(|i| population[i].clone())
            .collect()
    }

    /// The `count` fittest instances, ties in random order.
    pub fn select_best(&mut self, population: &[GeneticInstance], count: usize) -> Vec<GeneticInstance> {
        best_selection(population, count, &mut self.rng)
            .into_iter()
            .map(|i| population[i].clone())
            .collect()
    }

    /// Whether a grammar should be regenerated: it draws nothing or expands too far.
    pub fn should_discard(&self, lsystem: &mut LSystem) -> bool {
        if !self.config.discard_empty && self.config.discard_larger_than == 0 {
            return false;
        }
        let result = match lsystem.result() {
            Ok(result) => result,
            Err(e) => {
                warn!("Discarding grammar that fails to expand: {}", e);
                return true;
            }
        };

        let empty = self.config.discard_empty && result.count_letter('F') == 0;
        let large = self.config.discard_larger_than > 0 && result.len() > self.config.discard_larger_than;
        if empty || large {
            debug!(
                "Should discard: length {}, forward steps {}",
                result.len(),
                result.count_letter('F')
            );
        }
        empty || large
    }
}

/// Fitness of an instance's expansion. Failures score zero.
fn score_instance(turtle: &Turtle, fitness: &dyn FitnessFunction, instance: &mut GeneticInstance) -> f64 {
    let score = instance
        .lsystem
        .result()
        .and_then(|expanded| fitness.evaluate(expanded, turtle));
    match score {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "Fitness evaluation failed for {}: {}",
                instance.lsystem.to_genome(),
                e
            );
            0.0
        }
    }
}
