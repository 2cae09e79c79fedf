use super::render_params::RenderParameters;
use crate::engines::grammar::LSystem;
use crate::error::{PlantformError, Result};
use rand::Rng;
use std::fmt;

/// Separates the grammar from the render parameters in a full genome.
pub const INSTANCE_SEPARATOR: &str = "||||";

const FILE_STEM_LENGTH: usize = 30;
const NAME_SYLLABLES: [&str; 10] = [
    "al", "inus", "la", "ta", "va", "inc", "cannaba", "ium", "frax", "inus",
];

/// One candidate: a grammar, its render parameters and a cached fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticInstance {
    pub lsystem: LSystem,
    pub render: RenderParameters,
    /// `None` until evaluated.
    pub fitness: Option<f64>,
}

impl GeneticInstance {
    pub fn new(lsystem: LSystem) -> Self {
        Self {
            lsystem,
            render: RenderParameters::default(),
            fitness: None,
        }
    }

    pub fn with_render(mut self, render: RenderParameters) -> Self {
        self.render = render;
        self
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Fitness for ranking. Unevaluated instances rank as zero.
    pub fn score(&self) -> f64 {
        self.fitness.unwrap_or(0.0)
    }

    /// Forget the fitness and the memoised expansion after an edit.
    pub fn invalidate(&mut self) {
        self.fitness = None;
        self.lsystem.clear_result();
    }

    pub fn to_genome(&self) -> String {
        format!(
            "{}{}{}",
            self.lsystem.to_genome(),
            INSTANCE_SEPARATOR,
            self.render.to_genome()
        )
    }

    pub fn from_genome(genome: &str) -> Result<Self> {
        let (lsystem, render) = genome.trim().rsplit_once(INSTANCE_SEPARATOR).ok_or_else(|| {
            PlantformError::InvalidGenome("missing render parameters".to_string())
        })?;
        Ok(Self {
            lsystem: LSystem::from_genome(lsystem)?,
            render: RenderParameters::from_genome(render)?,
            fitness: None,
        })
    }

    /// Fitness and genome on one line.
    pub fn short_string(&self) -> String {
        match self.fitness {
            Some(fitness) => format!("F: {:.4}\t{}", fitness, self.to_genome()),
            None => format!("F: -\t{}", self.to_genome()),
        }
    }

    /// Filesystem-safe name derived from the genome.
    pub fn file_stem(&self) -> String {
        let cleaned: String = self
            .to_genome()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
            .map(|c| if c == ' ' { '_' } else { c })
            .collect();
        format!("inst_{}", cleaned).chars().take(FILE_STEM_LENGTH).collect()
    }
}

impl fmt::Display for GeneticInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fitness {
            Some(fitness) => writeln!(f, "F: {}", fitness)?,
            None => writeln!(f, "F: -")?,
        }
        writeln!(f, "{}", self.lsystem)?;
        write!(f, " [{}]", self.render)
    }
}

/// A made-up botanical name.
pub fn random_plant_name<R: Rng>(rng: &mut R) -> String {
    let mut name = String::new();
    for _ in 0..rng.gen_range(4..=7) {
        name.push_str(NAME_SYLLABLES[rng.gen_range(0..NAME_SYLLABLES.len())]);
        if rng.gen::<f64>() < 0.2 {
            name.push(' ');
        }
    }
    name.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const GENOME: &str = "A(1)||3||A(x);*;F(x)[+(30)A(x*0.5)]||d0=1.5||||0.5|0.1|2|0|1|0|0|0|3|2";

    #[test]
    fn test_genome_round_trip() {
        let instance = GeneticInstance::from_genome(GENOME).unwrap();
        assert_eq!(instance.lsystem.productions().len(), 1);
        assert_eq!(instance.lsystem.defines().get("d0"), Some(&1.5));
        assert_eq!(instance.render.flower_choice, 3);
        assert!(!instance.is_evaluated());
        assert_eq!(instance.to_genome(), GENOME);
    }

    #[test]
    fn test_grammar_without_productions() {
        let genome = "F||2||||1|0.1|2|0|0|0|0|0|0|0";
        let instance = GeneticInstance::from_genome(genome).unwrap();
        assert!(instance.lsystem.productions().is_empty());
        assert_eq!(instance.to_genome(), genome);
    }

    #[test]
    fn test_missing_render_parameters() {
        assert!(GeneticInstance::from_genome("F||2||F;*;FF").is_err());
    }

    #[test]
    fn test_file_stem() {
        let instance = GeneticInstance::from_genome(GENOME).unwrap();
        let stem = instance.file_stem();
        assert!(stem.starts_with("inst_A13AxFx"), "{}", stem);
        assert!(stem.len() <= 30);
        assert!(stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn test_plant_name() {
        let mut rng = StdRng::seed_from_u64(3);
        let name = random_plant_name(&mut rng);
        assert!(!name.is_empty());
        assert!(!name.ends_with(' '));
    }
}
