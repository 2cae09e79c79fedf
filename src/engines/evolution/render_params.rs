use crate::engines::generation::random::two_digit_float;
use crate::error::{PlantformError, Result};
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chance of each render parameter changing in one mutation.
pub const RENDER_MUTATION_PROBABILITY: f64 = 0.1;

const RENDER_FIELDS: usize = 10;

/// Models available to a renderer for each kind of detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    Leaf,
    Bulb,
    Flower,
    Fruit,
    Material,
}

impl DetailKind {
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            DetailKind::Leaf => &["Leaf_Texture"],
            DetailKind::Bulb => &["Leaf_Texture"],
            DetailKind::Flower => &["Flower_Ball", "Flower_Pretty", "Flower_Tulip", "Flower_Gerbera"],
            DetailKind::Fruit => &["Fruit_Apple", "Fruit_Lemon", "Fruit_Banana"],
            DetailKind::Material => &["Material.Leaf", "Material.Trunk"],
        }
    }

    pub fn count(&self) -> usize {
        self.names().len()
    }

    pub fn name_of(&self, index: usize) -> Option<&'static str> {
        self.names().get(index).copied()
    }

    /// Index of `name`, falling back to the first model.
    pub fn index_of(&self, name: &str) -> usize {
        match self.names().iter().position(|n| *n == name) {
            Some(index) => index,
            None => {
                warn!("No {:?} named '{}', using the first one", self, name);
                0
            }
        }
    }

    fn random_index<R: Rng>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.count())
    }
}

/// Non-structural parameters evolved alongside a grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderParameters {
    pub branch_radius: f64,
    pub tropism_susceptibility: f64,
    pub details_scale: f64,
    pub use_canopy: bool,
    pub trunk_material_choice: usize,
    pub leaf_material_choice: usize,
    pub leaf_choice: usize,
    pub bulb_choice: usize,
    pub flower_choice: usize,
    pub fruit_choice: usize,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            branch_radius: 1.0,
            tropism_susceptibility: 0.1,
            details_scale: 2.0,
            use_canopy: false,
            trunk_material_choice: 0,
            leaf_material_choice: 0,
            leaf_choice: 0,
            bulb_choice: 0,
            flower_choice: 0,
            fruit_choice: 0,
        }
    }
}

impl RenderParameters {
    fn random_branch_radius<R: Rng>(rng: &mut R) -> f64 {
        two_digit_float(rng, 0.1, 2.0)
    }

    fn random_tropism<R: Rng>(rng: &mut R) -> f64 {
        two_digit_float(rng, 0.0, 0.2)
    }

    fn random_details_scale<R: Rng>(rng: &mut R) -> f64 {
        two_digit_float(rng, 0.1, 5.0)
    }

    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        self.branch_radius = Self::random_branch_radius(rng);
        self.tropism_susceptibility = Self::random_tropism(rng);
        self.details_scale = Self::random_details_scale(rng);
        self.use_canopy = false;
        self.trunk_material_choice = DetailKind::Material.random_index(rng);
        self.leaf_material_choice = DetailKind::Material.random_index(rng);
        self.leaf_choice = DetailKind::Leaf.random_index(rng);
        self.bulb_choice = DetailKind::Bulb.random_index(rng);
        self.flower_choice = DetailKind::Flower.random_index(rng);
        self.fruit_choice = DetailKind::Fruit.random_index(rng);
    }

    /// Redraw each parameter independently with [`RENDER_MUTATION_PROBABILITY`].
    pub fn mutate<R: Rng>(&mut self, rng: &mut R) {
        let p = RENDER_MUTATION_PROBABILITY;
        if rng.gen::<f64>() < p {
            self.branch_radius = Self::random_branch_radius(rng);
        }
        if rng.gen::<f64>() < p {
            self.tropism_susceptibility = Self::random_tropism(rng);
        }
        if rng.gen::<f64>() < p {
            self.details_scale = Self::random_details_scale(rng);
        }
        if rng.gen::<f64>() < p {
            self.trunk_material_choice = DetailKind::Material.random_index(rng);
        }
        if rng.gen::<f64>() < p {
            self.leaf_material_choice = DetailKind::Material.random_index(rng);
        }
        if rng.gen::<f64>() < p {
            self.leaf_choice = DetailKind::Leaf.random_index(rng);
        }
        if rng.gen::<f64>() < p {
            self.bulb_choice = DetailKind::Bulb.random_index(rng);
        }
        if rng.gen::<f64>() < p {
            self.flower_choice = DetailKind::Flower.random_index(rng);
        }
        if rng.gen::<f64>() < p {
            self.fruit_choice = DetailKind::Fruit.random_index(rng);
        }
    }

    /// Arithmetic crossover, with a fresh blend factor per parameter.
    /// Canopy and leaf material are inherited unchanged.
    pub fn crossover<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self) {
        let mut a = first.clone();
        let mut b = second.clone();

        (a.branch_radius, b.branch_radius) =
            blend_floats(first.branch_radius, second.branch_radius, rng);
        (a.tropism_susceptibility, b.tropism_susceptibility) = blend_floats(
            first.tropism_susceptibility,
            second.tropism_susceptibility,
            rng,
        );
        (a.details_scale, b.details_scale) =
            blend_floats(first.details_scale, second.details_scale, rng);
        (a.trunk_material_choice, b.trunk_material_choice) = blend_choices(
            first.trunk_material_choice,
            second.trunk_material_choice,
            rng,
        );
        (a.leaf_choice, b.leaf_choice) = blend_choices(first.leaf_choice, second.leaf_choice, rng);
        (a.bulb_choice, b.bulb_choice) = blend_choices(first.bulb_choice, second.bulb_choice, rng);
        (a.flower_choice, b.flower_choice) =
            blend_choices(first.flower_choice, second.flower_choice, rng);
        (a.fruit_choice, b.fruit_choice) = blend_choices(first.fruit_choice, second.fruit_choice, rng);
        (a, b)
    }

    /// Ten `|`-separated fields in fixed order.
    pub fn to_genome(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.branch_radius,
            self.tropism_susceptibility,
            self.details_scale,
            u8::from(self.use_canopy),
            self.trunk_material_choice,
            self.leaf_material_choice,
            self.leaf_choice,
            self.bulb_choice,
            self.flower_choice,
            self.fruit_choice
        )
    }

    pub fn from_genome(genome: &str) -> Result<Self> {
        let tokens: Vec<&str> = genome.trim().split('|').collect();
        if tokens.len() != RENDER_FIELDS {
            return Err(PlantformError::InvalidGenome(format!(
                "expected {} render parameters, found {}",
                RENDER_FIELDS,
                tokens.len()
            )));
        }
        Ok(Self {
            branch_radius: parse_field(tokens[0])?,
            tropism_susceptibility: parse_field(tokens[1])?,
            details_scale: parse_field(tokens[2])?,
            use_canopy: parse_field::<u8>(tokens[3])? == 1,
            trunk_material_choice: parse_field(tokens[4])?,
            leaf_material_choice: parse_field(tokens[5])?,
            leaf_choice: parse_field(tokens[6])?,
            bulb_choice: parse_field(tokens[7])?,
            flower_choice: parse_field(tokens[8])?,
            fruit_choice: parse_field(tokens[9])?,
        })
    }
}

impl fmt::Display for RenderParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_genome())
    }
}

fn parse_field<T: std::str::FromStr>(token: &str) -> Result<T> {
    token.trim().parse::<T>().map_err(|_| {
        PlantformError::InvalidGenome(format!("invalid render parameter '{}'", token))
    })
}

fn blend_floats<R: Rng>(x: f64, y: f64, rng: &mut R) -> (f64, f64) {
    let a = rng.gen::<f64>();
    let round = |v: f64| (v * 100.0).floor() / 100.0;
    (round(x * a + y * (1.0 - a)), round(y * a + x * (1.0 - a)))
}

fn blend_choices<R: Rng>(x: usize, y: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen::<f64>();
    let (x, y) = (x as f64, y as f64);
    ((x * a + y * (1.0 - a)) as usize, (y * a + x * (1.0 - a)) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_randomized_choices_stay_in_catalogue() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let mut p = RenderParameters::default();
            p.randomize(&mut rng);
            assert!(p.flower_choice < DetailKind::Flower.count());
            assert!(p.fruit_choice < DetailKind::Fruit.count());
            assert!(p.trunk_material_choice < DetailKind::Material.count());
            assert!((0.1..=2.0).contains(&p.branch_radius));
        }
    }

    #[test]
    fn test_crossover_blends_between_parents() {
        let mut rng = StdRng::seed_from_u64(12);
        let first = RenderParameters {
            branch_radius: 0.5,
            flower_choice: 0,
            ..Default::default()
        };
        let second = RenderParameters {
            branch_radius: 1.5,
            flower_choice: 3,
            ..Default::default()
        };
        let (a, b) = RenderParameters::crossover(&first, &second, &mut rng);
        for child in [&a, &b] {
            assert!(child.branch_radius >= 0.5 && child.branch_radius <= 1.5);
            assert!(child.flower_choice <= 3);
        }
    }

    #[test]
    fn test_genome_field_count_is_checked() {
        assert!(RenderParameters::from_genome("1|0.1|2|0|0|0|0|0|0").is_err());
        let p = RenderParameters::from_genome("1.25|0.1|2|1|1|0|0|0|2|1").unwrap();
        assert!(p.use_canopy);
        assert_eq!(p.flower_choice, 2);
        assert_eq!(p.to_genome(), "1.25|0.1|2|1|1|0|0|0|2|1");
    }

    #[test]
    fn test_catalogue_lookup() {
        assert_eq!(DetailKind::Fruit.index_of("Fruit_Lemon"), 1);
        assert_eq!(DetailKind::Fruit.index_of("Fruit_Kiwi"), 0);
        assert_eq!(DetailKind::Flower.name_of(3), Some("Flower_Gerbera"));
        assert_eq!(DetailKind::Leaf.name_of(1), None);
    }
}
