use crate::config::{FitnessConfig, FitnessKind, FitnessWeights};
use crate::engines::grammar::ParametricString;
use crate::engines::turtle::{Extents, Spans, Turtle};
use crate::error::Result;
use log::trace;

/// Scores an expanded grammar string. Implementations must be usable from
/// several threads at once.
pub trait FitnessFunction: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, expanded: &ParametricString, turtle: &Turtle) -> Result<f64>;
}

/// Rewards tall, balanced trees with leaves and fruits at the branch ends.
#[derive(Debug, Clone, Default)]
pub struct TreeFitness {
    pub weights: FitnessWeights,
}

impl TreeFitness {
    pub fn new(weights: FitnessWeights) -> Self {
        Self { weights }
    }
}

impl FitnessFunction for TreeFitness {
    fn name(&self) -> &str {
        "tree"
    }

    fn evaluate(&self, expanded: &ParametricString, turtle: &Turtle) -> Result<f64> {
        let w = &self.weights;
        if expanded.is_empty() {
            return Ok(w.empty_fitness);
        }
        let mut fitness = 0.0;

        // grammar terms
        fitness += expanded.count_letter('[') as f64 * w.branches;

        let length = expanded.len_without_brackets();
        if length >= w.length_offset {
            let excess = (length - w.length_offset) as f64;
            fitness += excess * excess * w.length;
        }

        fitness += expanded.count_letter('F') as f64 * w.f_count;
        let rotations = expanded.count_letter('+') + expanded.count_letter('-');
        fitness += rotations as f64 * w.rotations;
        fitness += expanded.count_letter('L') as f64 * w.leaves / expanded.len() as f64;

        // shape terms, all from a single draw
        let drawn = turtle.draw(expanded, 0)?;
        let stats = &drawn.statistics;
        fitness += stats.trunk_weight * w.trunk_weight;
        fitness += stats.max_branch_weight * w.branch_weight;
        fitness += stats.underground_weight * w.underground;
        fitness += stats.end_details_ratio * w.end_details;
        fitness += stats.fruits_ratio * w.fruits;
        fitness += stats.branch_size_ratio * w.branch_size_ratio;

        let (tall, span, balance_x, balance_y) = match Extents::from_vertices(&drawn.vertices) {
            None => (0.0, 0.0, 0.0, 0.0),
            Some(extents) => {
                let height = extents.height();
                let spans = extents.spans();
                fitness += 10.0 - (w.target_height - height).abs();
                fitness += 10.0 - spans.distance_from(w.target_span);

                let (bx, by) = (spans.balance_x(), spans.balance_y());
                (height / drawn.vertices.len() as f64, bx + by, bx, by)
            }
        };
        fitness += tall * w.tall;
        fitness += span * w.span;
        fitness += tall * tall * span * span * w.tall_span;
        fitness += balance_x * balance_y * w.balance;

        trace!("Tree fitness {:.4} for {} modules", fitness, expanded.len());
        Ok(fitness)
    }
}

/// Length penalty and bilateral symmetry reward, normalised by the weight total.
#[derive(Debug, Clone, Copy)]
pub struct OchoaFitness {
    pub length_weight: f64,
    pub phototropism_weight: f64,
    pub symmetry_weight: f64,
}

impl Default for OchoaFitness {
    fn default() -> Self {
        Self {
            length_weight: -0.01,
            phototropism_weight: 0.0,
            symmetry_weight: 10.0,
        }
    }
}

impl FitnessFunction for OchoaFitness {
    fn name(&self) -> &str {
        "ochoa"
    }

    fn evaluate(&self, expanded: &ParametricString, turtle: &Turtle) -> Result<f64> {
        let length = expanded.len() as f64;
        let mut fitness = length * length * self.length_weight;

        let drawn = turtle.draw(expanded, 0)?;
        if let Some(extents) = Extents::from_vertices(&drawn.vertices) {
            let spans = extents.spans();
            fitness += extents.height() * self.phototropism_weight;
            let symmetry = Spans::ratio_balance(spans.x_pos, spans.x_neg)
                + Spans::ratio_balance(spans.y_pos, spans.y_neg);
            fitness += symmetry * self.symmetry_weight;
        }

        Ok(fitness / (self.phototropism_weight + self.symmetry_weight + self.length_weight))
    }
}

/// Clamps another fitness at zero so roulette selection stays well defined.
#[derive(Debug, Clone, Default)]
pub struct NonNegative<F>(pub F);

impl<F: FitnessFunction> FitnessFunction for NonNegative<F> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn evaluate(&self, expanded: &ParametricString, turtle: &Turtle) -> Result<f64> {
        Ok(self.0.evaluate(expanded, turtle)?.max(0.0))
    }
}

pub fn fitness_from_config(config: &FitnessConfig) -> Box<dyn FitnessFunction> {
    match config.kind {
        FitnessKind::Tree => Box::new(NonNegative(TreeFitness::new(config.weights.clone()))),
        FitnessKind::Ochoa => Box::new(NonNegative(OchoaFitness::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurtleConfig;

    fn turtle() -> Turtle {
        Turtle::new(TurtleConfig {
            tropism_susceptibility: 0.0,
            seed: Some(1),
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_string_scores_penalty() {
        let f = TreeFitness::default();
        let empty = ParametricString::new();
        assert_eq!(f.evaluate(&empty, &turtle()).unwrap(), -100.0);
        assert_eq!(NonNegative(f).evaluate(&empty, &turtle()).unwrap(), 0.0);
    }

    #[test]
    fn test_string_without_lines_skips_shape_terms() {
        let f = TreeFitness::default();
        let s = ParametricString::parse("L").unwrap();
        // one leaf over one module, at the end of the plant
        assert_eq!(f.evaluate(&s, &turtle()).unwrap(), 1.0 + 5.0);
    }

    #[test]
    fn test_balanced_tree_beats_lopsided_one() {
        let f = NonNegative(TreeFitness::default());
        let t = turtle();
        let balanced = ParametricString::parse("FF[+(45)FFL][-(45)FFL][&(45)FFL][^(45)FFL]").unwrap();
        let lopsided = ParametricString::parse("FF[+(45)FFL][+(60)FFL]").unwrap();
        let a = f.evaluate(&balanced, &t).unwrap();
        let b = f.evaluate(&lopsided, &t).unwrap();
        assert!(a > b, "{} <= {}", a, b);
    }

    #[test]
    fn test_ochoa_is_normalised() {
        let f = OchoaFitness::default();
        let s = ParametricString::parse("F[+F][-F][&F][^F]").unwrap();
        let value = f.evaluate(&s, &turtle()).unwrap();
        let expected = (-0.01 * 289.0 + 20.0) / 9.99;
        assert!((value - expected).abs() < 1e-9, "{}", value);
    }
}
