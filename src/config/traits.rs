use crate::error::PlantformError;
use serde::{Deserialize, Serialize};

/// One table of `AppConfig`: `[evolver]`, `[generator]`, `[turtle]` or `[fitness]`.
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    /// TOML table name, also the second segment of `PLANTFORM__<SECTION>__<FIELD>`.
    fn section_name() -> &'static str;
    /// Rejects probabilities outside `0..=1` and inverted min/max limits.
    fn validate(&self) -> Result<(), PlantformError>;
    /// The tunable knobs of the section with their default values, printed by `plantform --describe`.
    fn to_manifest(&self) -> ConfigManifest;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigManifest {
    pub section: String,
    pub fields: Vec<FieldManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldManifest {
    /// Path inside the section, dotted for nested tables such as `weights.balance`.
    pub name: String,
    pub field_type: String,
    pub default: serde_json::Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub description: String,
}

impl FieldManifest {
    pub fn new(
        name: &str,
        field_type: &str,
        default: serde_json::Value,
        range: Option<(f64, f64)>,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            default,
            min: range.map(|r| r.0),
            max: range.map(|r| r.1),
            description: description.to_string(),
        }
    }
}

pub(crate) fn check_probability(name: &str, value: f64) -> Result<(), PlantformError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(PlantformError::Configuration(format!(
            "{} must be between 0 and 1",
            name
        )));
    }
    Ok(())
}
