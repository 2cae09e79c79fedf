use plantform::config::{GeneratorConfig, GeneratorKind};
use plantform::engines::generation::Generator;
use plantform::engines::grammar::{LSystem, ParametricString, Production};

fn lsystem(axiom: &str, iterations: usize, productions: &[&str]) -> LSystem {
    let mut lsystem = LSystem::new(ParametricString::parse(axiom).unwrap(), iterations);
    for p in productions {
        lsystem.add_production(p.parse::<Production>().unwrap());
    }
    lsystem
}

#[test]
fn test_golden_expansion_length() {
    let lsystem = lsystem("FA", 6, &["F:*->FB", "A:*->AF", "B:*->FAF"]);
    let result = lsystem.iterate(6).unwrap();

    assert_eq!(result.len(), 227, "golden expansion length changed");
    assert_eq!(result.count_letter('F'), 126);
    assert_eq!(result.count_letter('A'), 45);
    assert_eq!(result.count_letter('B'), 56);
}

#[test]
fn test_stochastic_expansion_is_deterministic_for_a_seed() {
    let lsystem = lsystem(
        "A",
        5,
        &["A:0.3->F[+A]A", "A:0.3->F[-A]A", "A:0.4->FA"],
    )
    .with_seed(42);

    let first = lsystem.iterate(5).unwrap();
    for _ in 0..5 {
        assert_eq!(lsystem.iterate(5).unwrap(), first, "same seed must expand identically");
    }
    assert!(first.is_balanced());
}

#[test]
fn test_parametric_growth_with_defines() {
    let mut lsystem = lsystem(
        "A(1)",
        3,
        &["A(x):x<3->F(x)A(x+d0)", "A(x):*->L"],
    );
    lsystem.add_define("d0", 1.0);

    let result = lsystem.iterate(3).unwrap();
    assert_eq!(result.to_string(), "F(1)F(2)L");
}

#[test]
fn test_expression_has_no_precedence() {
    let lsystem = lsystem("A(2)", 1, &["A(x):*->F(x+1*3)"]);
    // (2 + 1) * 3, evaluated left to right
    assert_eq!(lsystem.iterate(1).unwrap().to_string(), "F(9)");
}

#[test]
fn test_genome_round_trip_of_generated_systems() {
    for (seed, kind) in [(1, GeneratorKind::Generic), (2, GeneratorKind::Plants)] {
        let mut generator = Generator::new(GeneratorConfig {
            kind,
            seed: Some(seed),
            ..Default::default()
        });
        for _ in 0..20 {
            generator.randomize().unwrap();
            let original = generator.lsystem().clone();
            let restored = LSystem::from_genome(&original.to_genome()).unwrap();
            assert_eq!(restored, original, "genome {}", original.to_genome());
        }
    }
}

#[test]
fn test_malformed_genomes_are_rejected() {
    assert!(LSystem::from_genome("F||x").is_err());
    assert!(LSystem::from_genome("F(||2").is_err());
    assert!(LSystem::from_genome("F||2||FF;*").is_err());
    assert!(LSystem::from_genome("F||2||FA;*;F").is_err());
}
