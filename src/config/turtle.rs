use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::PlantformError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurtleConfig {
    /// Default rotation in degrees.
    pub angle: f64,
    /// Default segment length.
    pub step: f64,
    pub length_noise: f64,
    pub angle_noise: f64,
    pub seed: Option<u64>,
    pub default_radius: f64,
    pub min_radius: f64,
    pub tropism: [f64; 3],
    pub tropism_susceptibility: f64,
    /// Thin branches bend more under tropism.
    pub elasticity_depends_on_radius: bool,
    /// Orient leaves and fruits from the branch they end.
    pub heuristic_detail_orientation: bool,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            angle: 30.0,
            step: 1.0,
            length_noise: 0.0,
            angle_noise: 0.0,
            seed: None,
            default_radius: 0.1,
            min_radius: 0.01,
            tropism: [0.0, 0.0, -1.0],
            tropism_susceptibility: 0.4,
            elasticity_depends_on_radius: false,
            heuristic_detail_orientation: true,
        }
    }
}

impl ConfigSection for TurtleConfig {
    fn section_name() -> &'static str {
        "turtle"
    }

    fn validate(&self) -> Result<(), PlantformError> {
        if self.min_radius <= 0.0 {
            return Err(PlantformError::Configuration(
                "Minimum radius must be positive".to_string(),
            ));
        }
        if self.default_radius < self.min_radius {
            return Err(PlantformError::Configuration(
                "Default radius must not be below the minimum radius".to_string(),
            ));
        }
        if self.length_noise < 0.0 || self.angle_noise < 0.0 {
            return Err(PlantformError::Configuration(
                "Noise amounts cannot be negative".to_string(),
            ));
        }
        if self.tropism_susceptibility < 0.0 {
            return Err(PlantformError::Configuration(
                "Tropism susceptibility cannot be negative".to_string(),
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
                    "angle",
                    "float",
                    serde_json::json!(defaults.angle),
                    Some((0.0, 360.0)),
                    "Default rotation in degrees",
                ),
                FieldManifest::new(
                    "step",
                    "float",
                    serde_json::json!(defaults.step),
                    Some((0.0, 100.0)),
                    "Default segment length",
                ),
                FieldManifest::new(
                    "tropism_susceptibility",
                    "float",
                    serde_json::json!(defaults.tropism_susceptibility),
                    Some((0.0, 1.0)),
                    "How strongly segments bend towards the tropism vector",
                ),
            ],
        }
    }
}
