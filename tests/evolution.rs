use plantform::config::{AppConfig, GeneratorKind, InitialPopulation};
use plantform::engines::evolution::{
    fitness_from_config, FitnessHistory, GeneticEvolver, GeneticInstance, NullProgressCallback,
    ProgressCallback,
};
use plantform::engines::grammar::{LSystem, ParametricString, Production};

#[derive(Default)]
struct TestProgressCallback {
    started: Vec<usize>,
    best: Vec<f64>,
    sizes: Vec<usize>,
}

impl ProgressCallback for TestProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        self.started.push(generation);
    }

    fn on_generation_complete(&mut self, _generation: usize, best_fitness: f64, population_size: usize) {
        self.best.push(best_fitness);
        self.sizes.push(population_size);
    }

    fn on_instance_evaluated(&mut self, _instance_num: usize, _total: usize) {}
}

fn app_config(seed: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.evolver.seed = Some(seed);
    config.evolver.initialisation_complexify_steps = 3;
    config.generator.seed = Some(seed);
    config.generator.kind = GeneratorKind::Plants;
    config.turtle.seed = Some(seed);
    config
}

fn instance(axiom: &str, productions: &[&str]) -> GeneticInstance {
    let mut lsystem = LSystem::new(ParametricString::parse(axiom).unwrap(), 2);
    for p in productions {
        lsystem.add_production(p.parse::<Production>().unwrap());
    }
    GeneticInstance::new(lsystem)
}

fn assert_sorted(population: &[GeneticInstance]) {
    for pair in population.windows(2) {
        assert!(pair[0].score() >= pair[1].score(), "population is not sorted");
    }
}

#[test]
fn test_crossover_keeps_successors_balanced() {
    let mut evolver = GeneticEvolver::from_config(&app_config(1)).unwrap();
    let parents = [
        instance("A", &["A:*->F[+A][-A]", "F:*->F[&F]F"]),
        instance("FA", &["F:*->[+F]F", "A:*->A[F]"]),
        instance("F", &[]),
        instance("B[A]", &["B:*->[[F]L]", "A:*->F", "F:*->FF", "L:*->[L]"]),
    ];

    for a in &parents {
        for b in &parents {
            for _ in 0..25 {
                let (x, y) = evolver.cross_pair(a, b).unwrap();
                for child in [&x, &y] {
                    for production in child.lsystem.productions() {
                        assert!(
                            production.successor.is_balanced(),
                            "unbalanced child {}",
                            child.lsystem.to_genome()
                        );
                    }
                }
                assert_eq!(
                    x.lsystem.productions().len() + y.lsystem.productions().len(),
                    a.lsystem.productions().len() + b.lsystem.productions().len()
                );
            }
        }
    }
}

#[test]
fn test_default_fitness_is_never_negative() {
    let config = app_config(2);
    let fitness = fitness_from_config(&config.fitness);
    let turtle = plantform::engines::turtle::Turtle::new(config.turtle.clone());

    for structure in ["", "L", "+(90)F(5)&(180)F(20)", "F[+F][-F]FL", "[[[F]]]", "!(0)FFFFFFFF"] {
        let expanded = ParametricString::parse(structure).unwrap();
        let value = fitness.evaluate(&expanded, &turtle).unwrap();
        assert!(value >= 0.0, "{} scored {}", structure, value);
    }
}

#[test]
fn test_evolution_keeps_population_size_and_order() {
    let config = app_config(3);
    let mut evolver = GeneticEvolver::from_config(&config).unwrap();
    let mut callback = TestProgressCallback::default();

    let population = evolver.evolve(8, 4, 0.0, &mut callback).unwrap();

    assert_eq!(population.len(), 8);
    assert_sorted(&population);
    assert!(population.iter().all(|i| i.is_evaluated()));
    assert_eq!(callback.started, vec![0, 1, 2, 3]);
    assert!(callback.sizes.iter().all(|s| *s == 8));
    // elitism never loses the best instance
    for pair in callback.best.windows(2) {
        assert!(pair[1] >= pair[0], "best fitness dropped: {:?}", callback.best);
    }
    assert_eq!(evolver.best_instance().map(|i| i.score()), Some(population[0].score()));
}

#[test]
fn test_fitness_history_tracks_each_generation() {
    let mut evolver = GeneticEvolver::from_config(&app_config(3)).unwrap();
    let mut history = FitnessHistory::new(NullProgressCallback);

    let population = evolver.evolve(6, 3, 0.0, &mut history).unwrap();

    let records = history.records();
    assert_eq!(records.iter().map(|r| r.generation).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(records.iter().all(|r| r.population_size == 6));
    assert_eq!(records.last().map(|r| r.best_fitness), Some(population[0].score()));
}

#[test]
fn test_odd_population_size_is_kept() {
    let mut evolver = GeneticEvolver::from_config(&app_config(4)).unwrap();
    let population = evolver.generate_population(5).unwrap();
    let next = evolver.evolve_step(&population).unwrap();
    assert_eq!(next.len(), 5);
    assert_sorted(&next);
}

#[test]
fn test_parallel_fitness_matches_serial() {
    let mut serial_config = app_config(5);
    serial_config.evolver.parallel_fitness = false;
    let mut parallel_config = app_config(5);
    parallel_config.evolver.parallel_fitness = true;

    let mut serial = GeneticEvolver::from_config(&serial_config).unwrap();
    let mut parallel = GeneticEvolver::from_config(&parallel_config).unwrap();
    let a = serial.evolve(6, 2, 0.0, &mut TestProgressCallback::default()).unwrap();
    let b = parallel.evolve(6, 2, 0.0, &mut TestProgressCallback::default()).unwrap();

    let genomes_a: Vec<String> = a.iter().map(|i| i.short_string()).collect();
    let genomes_b: Vec<String> = b.iter().map(|i| i.short_string()).collect();
    assert_eq!(genomes_a, genomes_b);
}

#[test]
fn test_target_fitness_stops_early() {
    let mut config = app_config(6);
    config.evolver.max_target_iterations = 50;
    let mut evolver = GeneticEvolver::from_config(&config).unwrap();
    let mut callback = TestProgressCallback::default();

    // any drawable tree clears this target
    evolver.evolve(6, 0, 1e-9, &mut callback).unwrap();
    assert!(callback.started.len() <= 50);
    if let Some(last) = callback.best.last() {
        assert!(*last >= 1e-9 || callback.started.len() == 50);
    }
}

#[test]
fn test_automated_initial_population() {
    let mut config = app_config(7);
    config.evolver.initial_population = InitialPopulation::FromAutomatedEvolution;
    config.evolver.good_initial_fitness = 1.0;
    config.evolver.max_target_iterations = 2;
    let mut evolver = GeneticEvolver::from_config(&config).unwrap();

    let population = evolver.generate_population(4).unwrap();
    assert_eq!(population.len(), 4);
    assert_sorted(&population);
}

#[test]
fn test_instance_genome_round_trip_after_evolution() {
    let mut evolver = GeneticEvolver::from_config(&app_config(8)).unwrap();
    let population = evolver.evolve(6, 2, 0.0, &mut TestProgressCallback::default()).unwrap();

    for instance in &population {
        let restored = GeneticInstance::from_genome(&instance.to_genome()).unwrap();
        assert_eq!(restored.lsystem, instance.lsystem);
        assert_eq!(restored.render, instance.render);
        assert!(!restored.is_evaluated());
    }
}

#[test]
fn test_from_instance_population_evolves() {
    let mut evolver = GeneticEvolver::from_config(&app_config(9)).unwrap();
    evolver.set_starting_instance(instance("A(1)", &["A(x):*->F(x)[+(30)A(x)][-(30)A(x)]"]));
    let population = evolver.evolve(4, 2, 0.0, &mut TestProgressCallback::default()).unwrap();
    assert_eq!(population.len(), 4);

    evolver.remove_starting_instance();
    assert_eq!(evolver.config().initial_population, InitialPopulation::Randomized);
}
