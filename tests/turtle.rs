use plantform::config::TurtleConfig;
use plantform::engines::grammar::{LSystem, ParametricString, Production};
use plantform::engines::turtle::{Extents, Turtle};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn turtle(tropism_susceptibility: f64) -> Turtle {
    Turtle::new(TurtleConfig {
        tropism_susceptibility,
        seed: Some(7),
        ..Default::default()
    })
}

#[test]
fn test_rotated_steps_without_tropism() {
    let result = turtle(0.0).draw_str("!!+(39)F(2.2)!F(2)", 0).unwrap();
    let angle = 39f64.to_radians();

    assert_eq!(result.vertices.len(), 3, "origin plus one vertex per step");
    assert_eq!(result.edges, vec![[0, 1], [1, 2]]);

    let tip = result.vertices[1];
    assert!(close(tip.x, 0.0));
    assert!(close(tip.y, -2.2 * angle.sin()));
    assert!(close(tip.z, 2.2 * angle.cos()));

    let end = result.vertices[2];
    assert!(close(end.y, -4.2 * angle.sin()));
    assert!(close(end.z, 4.2 * angle.cos()));
}

#[test]
fn test_final_orientation_keeps_the_rotation() {
    // a leaf at the branch end takes the heading of the last segment
    let result = turtle(0.0).draw_str("!!+(39)F(2.2)!F(2)L", 0).unwrap();
    let leaf = result.leaves[0];
    assert!(close(leaf.orientation.x, 39f64.to_radians()), "{:?}", leaf.orientation);
    assert!(close(leaf.orientation.y, 0.0));
    assert!(close(leaf.orientation.z, 0.0));
}

#[test]
fn test_tropism_pulls_growth_down() {
    let straight = turtle(0.0).draw_str("+(60)FFFF", 0).unwrap();
    let bent = turtle(0.4).draw_str("+(60)FFFF", 0).unwrap();

    let straight_top = straight.vertices.last().unwrap().z;
    let bent_top = bent.vertices.last().unwrap().z;
    assert!(bent_top < straight_top, "{} should be below {}", bent_top, straight_top);
}

#[test]
fn test_draws_an_expanded_grammar() {
    let mut lsystem = LSystem::new(ParametricString::parse("A").unwrap(), 3);
    lsystem.add_production("A:*->F[+A][-A]".parse::<Production>().unwrap());
    let expanded = lsystem.result().unwrap().clone();

    let result = turtle(0.0).draw(&expanded, 0).unwrap();
    // 1 + 2 + 4 forward steps
    assert_eq!(result.edges.len(), 7);
    assert_eq!(result.vertices.len(), 8);

    let extents = Extents::from_vertices(&result.vertices).unwrap();
    let spans = extents.spans();
    assert!(close(spans.balance_y(), 1.0), "symmetric tree should balance: {:?}", spans);
    assert!(result.statistics.trunk_weight > 0.0);
}

#[test]
fn test_noise_is_reproducible_per_instance() {
    let config = TurtleConfig {
        length_noise: 0.3,
        angle_noise: 0.3,
        seed: Some(11),
        ..Default::default()
    };
    let turtle = Turtle::new(config);
    let structure = "F[+F][-F]FF";

    let a = turtle.draw_str(structure, 3).unwrap();
    let b = turtle.draw_str(structure, 3).unwrap();
    let c = turtle.draw_str(structure, 4).unwrap();
    assert_eq!(a.vertices, b.vertices);
    assert_ne!(a.vertices, c.vertices);
}
