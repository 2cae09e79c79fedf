use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::PlantformError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessKind {
    /// Tree-shape fitness, clamped at zero.
    Tree,
    /// Length and symmetry only.
    Ochoa,
}

/// Weights of the tree-shape fitness terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub empty_fitness: f64,
    pub branches: f64,
    pub length_offset: usize,
    pub length: f64,
    pub f_count: f64,
    pub rotations: f64,
    pub leaves: f64,
    pub trunk_weight: f64,
    pub branch_weight: f64,
    pub underground: f64,
    pub end_details: f64,
    pub fruits: f64,
    pub branch_size_ratio: f64,
    pub tall: f64,
    pub target_height: f64,
    pub span: f64,
    pub target_span: f64,
    pub tall_span: f64,
    pub balance: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            empty_fitness: -100.0,
            branches: 0.0,
            length_offset: 3,
            length: -0.000001,
            f_count: 0.0,
            rotations: 0.0,
            leaves: 1.0,
            trunk_weight: -0.6,
            branch_weight: -0.6,
            underground: -1.0,
            end_details: 5.0,
            fruits: 2.0,
            branch_size_ratio: 0.0,
            tall: 1.0,
            target_height: 5.0,
            span: 1.0,
            target_span: 3.0,
            tall_span: 0.0,
            balance: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    pub kind: FitnessKind,
    pub weights: FitnessWeights,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            kind: FitnessKind::Tree,
            weights: FitnessWeights::default(),
        }
    }
}

impl ConfigSection for FitnessConfig {
    fn section_name() -> &'static str {
        "fitness"
    }

    fn validate(&self) -> Result<(), PlantformError> {
        let w = &self.weights;
        if w.target_height < 0.0 || w.target_span < 0.0 {
            return Err(PlantformError::Configuration(
                "Fitness targets cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        let defaults = Self::default();
        ConfigManifest {
            section: Self::section_name().to_string(),
            fields: vec![
                FieldManifest::new(
                    "weights.target_height",
                    "float",
                    serde_json::json!(defaults.weights.target_height),
                    Some((0.0, 100.0)),
                    "Preferred height of the tree",
                ),
                FieldManifest::new(
                    "weights.target_span",
                    "float",
                    serde_json::json!(defaults.weights.target_span),
                    Some((0.0, 100.0)),
                    "Preferred horizontal reach in each direction",
                ),
                FieldManifest::new(
                    "weights.end_details",
                    "float",
                    serde_json::json!(defaults.weights.end_details),
                    None,
                    "Reward for leaves and fruits at branch ends",
                ),
            ],
        }
    }
}
