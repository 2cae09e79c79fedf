use super::math::{Euler, Quaternion, Vector3};
use super::statistics::{ShapeStatistics, StatisticsCollector};
use crate::config::TurtleConfig;
use crate::engines::grammar::{Module, ParametricString};
use crate::error::{PlantformError, Result};
use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

/// A positioned, oriented detail such as a leaf or a fruit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailQuad {
    pub position: Vector3,
    pub orientation: Euler,
}

/// Geometry produced by one draw.
#[derive(Debug, Clone, Default)]
pub struct TurtleResult {
    pub instance_index: usize,
    pub vertices: Vec<Vector3>,
    pub edges: Vec<[usize; 2]>,
    /// Branch radius at each vertex.
    pub radii: Vec<f64>,
    pub leaves: Vec<DetailQuad>,
    pub bulbs: Vec<DetailQuad>,
    pub flowers: Vec<DetailQuad>,
    pub fruits: Vec<DetailQuad>,
    pub statistics: ShapeStatistics,
}

impl TurtleResult {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Noise values keyed by structural index, so revisiting an index reuses its value.
struct Noise {
    rng: StdRng,
    segments: HashMap<usize, f64>,
    angles: HashMap<usize, f64>,
}

impl Noise {
    fn new(rng: StdRng) -> Self {
        Self {
            rng,
            segments: HashMap::new(),
            angles: HashMap::new(),
        }
    }

    /// Keyed by the vertex a segment starts from.
    fn segment(&mut self, vertex: usize) -> f64 {
        Self::cached(&mut self.segments, &mut self.rng, vertex)
    }

    /// Keyed by the position of the rotation in the string.
    fn angle(&mut self, index: usize) -> f64 {
        Self::cached(&mut self.angles, &mut self.rng, index)
    }

    fn cached(values: &mut HashMap<usize, f64>, rng: &mut StdRng, index: usize) -> f64 {
        *values
            .entry(index)
            .or_insert_with(|| rng.gen_range(-1.0..=1.0))
    }
}

#[derive(Debug, Clone, Copy)]
struct TurtleState {
    position: Vector3,
    orientation: Euler,
    radius: f64,
    vertex: usize,
}

/// Interprets an expanded module string as 3D branch geometry.
#[derive(Debug, Clone, Default)]
pub struct Turtle {
    config: TurtleConfig,
}

impl Turtle {
    pub fn new(config: TurtleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TurtleConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TurtleConfig {
        &mut self.config
    }

    /// Per-instance render parameters override the configured radius and tropism response.
    pub fn with_branch_parameters(mut self, branch_radius: f64, tropism_susceptibility: f64) -> Self {
        self.config.default_radius = branch_radius.max(self.config.min_radius);
        self.config.tropism_susceptibility = tropism_susceptibility;
        self
    }

    /// Parse `structure` and draw it.
    pub fn draw_str(&self, structure: &str, instance_index: usize) -> Result<TurtleResult> {
        self.draw(&ParametricString::parse(structure)?, instance_index)
    }

    /// Draw an expanded string. Parameters must already be numeric.
    pub fn draw(&self, structure: &ParametricString, instance_index: usize) -> Result<TurtleResult> {
        let config = &self.config;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(instance_index as u64)),
            None => StdRng::from_entropy(),
        };
        let mut noise = Noise::new(rng);

        let mut result = TurtleResult {
            instance_index,
            ..Default::default()
        };
        let mut state = TurtleState {
            position: Vector3::ZERO,
            orientation: Euler::IDENTITY,
            radius: config.default_radius,
            vertex: 0,
        };
        let mut stack: Vec<TurtleState> = Vec::new();
        let mut last_branch_orientation = Euler::IDENTITY;
        let mut statistics = StatisticsCollector::new(config.default_radius);
        let tropism = Vector3::from(config.tropism);

        let modules = structure.modules();
        for (i, module) in modules.iter().enumerate() {
            match module.letter {
                '!' => {
                    let scale = parameter(module, 1.0)?;
                    state.radius = (config.default_radius * scale).max(config.min_radius);
                }
                'F' => {
                    let mut length = parameter(module, config.step)?;
                    length += length * noise.segment(state.vertex) * config.length_noise;

                    let mut direction = Vector3::UP.rotated_by_euler(&state.orientation);
                    if config.tropism_susceptibility > 0.0 {
                        let elasticity = if config.elasticity_depends_on_radius {
                            1.0 / state.radius
                        } else {
                            1.0
                        };
                        let bending = Quaternion::between(
                            &direction,
                            &(tropism * (config.tropism_susceptibility * elasticity)),
                        );
                        direction = direction.rotated_by_quaternion(&bending);
                    }
                    state.orientation =
                        Quaternion::between(&Vector3::UP, &direction).to_euler(state.orientation);

                    if result.vertices.is_empty() {
                        result.vertices.push(state.position);
                        result.radii.push(state.radius);
                    }
                    state.position = state.position + direction * length;
                    result.vertices.push(state.position);
                    result.radii.push(state.radius);

                    let next = result.vertices.len() - 1;
                    result.edges.push([state.vertex, next]);
                    state.vertex = next;

                    last_branch_orientation = state.orientation;
                    statistics.forward(state.radius);
                }
                '+' | '-' | '&' | '^' | '\\' | '/' => {
                    let mut angle = parameter(module, config.angle)?;
                    angle += config.angle_noise * noise.angle(i) * angle;
                    state.orientation +=
                        Euler::about_axis(rotation_axis(module.letter), angle.to_radians());
                }
                '[' => {
                    stack.push(state);
                    statistics.open_branch(state.radius);
                }
                ']' => match stack.pop() {
                    Some(saved) => {
                        statistics.close_branch();
                        state = saved;
                    }
                    None => trace!("Ignoring unbalanced ']' at {}", i),
                },
                'L' | 'B' | 'K' => {
                    let at_end = is_end_point(modules, i);
                    let orientation =
                        self.orient_with_branch(state.orientation, last_branch_orientation, at_end);
                    let quad = DetailQuad {
                        position: state.position,
                        orientation,
                    };
                    match module.letter {
                        'L' => result.leaves.push(quad),
                        'B' => result.bulbs.push(quad),
                        _ => result.flowers.push(quad),
                    }
                    statistics.detail(at_end);
                }
                'R' => {
                    let at_end = is_end_point(modules, i);
                    let orientation = if config.heuristic_detail_orientation {
                        Euler::IDENTITY
                    } else {
                        state.orientation
                    };
                    result.fruits.push(DetailQuad {
                        position: state.position,
                        orientation,
                    });
                    statistics.fruit(at_end);
                }
                _ => {}
            }
        }

        result.statistics = statistics.finish(&result.vertices);
        Ok(result)
    }

    /// Details at a branch end follow the branch, others stand perpendicular to it.
    fn orient_with_branch(&self, current: Euler, last_branch: Euler, at_end: bool) -> Euler {
        if !self.config.heuristic_detail_orientation {
            return current;
        }
        if at_end {
            last_branch
        } else {
            last_branch + Euler::new(FRAC_PI_2, 0.0, 0.0)
        }
    }
}

fn rotation_axis(letter: char) -> [f64; 3] {
    match letter {
        '+' => [1.0, 0.0, 0.0],
        '-' => [-1.0, 0.0, 0.0],
        '&' => [0.0, 1.0, 0.0],
        '^' => [0.0, -1.0, 0.0],
        '\\' => [0.0, 0.0, 1.0],
        _ => [0.0, 0.0, -1.0],
    }
}

/// First numeric parameter of `module`, or `default` when it has none.
fn parameter(module: &Module, default: f64) -> Result<f64> {
    match module.params.first() {
        None => Ok(default),
        Some(p) => p.as_number().ok_or_else(|| {
            PlantformError::Evaluation(format!("unresolved parameter '{}' in {}", p, module))
        }),
    }
}

/// A detail ends its branch when no step or new branch follows before the branch closes.
fn is_end_point(modules: &[Module], index: usize) -> bool {
    for m in &modules[index..] {
        if m.letter == 'F' || m.is_open_bracket() {
            return false;
        }
        if m.is_close_bracket() {
            return true;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_turtle() -> Turtle {
        Turtle::new(TurtleConfig {
            tropism_susceptibility: 0.0,
            seed: Some(1),
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_string_draws_nothing() {
        let result = flat_turtle().draw_str("", 0).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.statistics, ShapeStatistics::default());
    }

    #[test]
    fn test_branches_return_to_the_fork() {
        let result = flat_turtle().draw_str("F[+F]F", 0).unwrap();
        assert_eq!(result.vertices.len(), 4);
        assert_eq!(result.edges, vec![[0, 1], [1, 2], [1, 3]]);
        assert!((result.vertices[3].z - 2.0).abs() < 1e-9);
        assert_eq!(result.statistics.trunk_weight, 2.0);
        assert_eq!(result.statistics.max_branch_weight, 1.0);
    }

    #[test]
    fn test_unbalanced_close_is_ignored() {
        let result = flat_turtle().draw_str("F]F", 0).unwrap();
        assert_eq!(result.edges, vec![[0, 1], [1, 2]]);
    }

    #[test]
    fn test_radius_command_scales_default() {
        let result = flat_turtle().draw_str("F!(2)F!(0)F", 0).unwrap();
        assert_eq!(result.radii, vec![0.1, 0.1, 0.2, 0.01]);
    }

    #[test]
    fn test_details_at_branch_ends() {
        let result = flat_turtle().draw_str("FL[+FL]K[FR]", 0).unwrap();
        assert_eq!(result.leaves.len(), 2);
        assert_eq!(result.flowers.len(), 1);
        assert_eq!(result.fruits.len(), 1);
        // only the leaf inside the first branch ends it
        assert!((result.statistics.end_details_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert!((result.statistics.fruits_ratio - 0.25).abs() < 1e-9);
        assert_eq!(result.fruits[0].orientation, Euler::IDENTITY);
    }

    #[test]
    fn test_tropism_bends_down() {
        let turtle = Turtle::new(TurtleConfig {
            tropism_susceptibility: 0.4,
            seed: Some(1),
            ..Default::default()
        });
        let result = turtle.draw_str("+(90)F", 0).unwrap();
        assert!(result.vertices[1].z < 0.0);
        assert!(result.statistics.underground_weight > 0.0);
    }

    #[test]
    fn test_unresolved_parameter_is_an_error() {
        assert!(flat_turtle().draw_str("F(x)", 0).is_err());
    }

    #[test]
    fn test_noise_is_seeded() {
        let turtle = Turtle::new(TurtleConfig {
            length_noise: 0.5,
            angle_noise: 0.5,
            seed: Some(9),
            ..Default::default()
        });
        let a = turtle.draw_str("F+F[-F]F", 3).unwrap();
        let b = turtle.draw_str("F+F[-F]F", 3).unwrap();
        assert_eq!(a.vertices, b.vertices);
    }
}
