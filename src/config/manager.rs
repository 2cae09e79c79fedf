use super::{
    evolver::EvolverConfig, fitness::FitnessConfig, generator::GeneratorConfig,
    traits::{ConfigManifest, ConfigSection}, turtle::TurtleConfig,
};
use crate::error::PlantformError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment overrides, e.g. `PLANTFORM__EVOLVER__POPULATION_SIZE=40`.
pub const ENV_PREFIX: &str = "PLANTFORM";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolver: EvolverConfig,
    pub generator: GeneratorConfig,
    pub turtle: TurtleConfig,
    pub fitness: FitnessConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), PlantformError> {
        self.evolver.validate()?;
        self.generator.validate()?;
        self.turtle.validate()?;
        self.fitness.validate()?;
        Ok(())
    }

    pub fn manifests(&self) -> Vec<ConfigManifest> {
        vec![
            self.evolver.to_manifest(),
            self.generator.to_manifest(),
            self.turtle.to_manifest(),
            self.fitness.to_manifest(),
        ]
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PlantformError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlantformError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| PlantformError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write_lock()? = config;
        Ok(())
    }

    /// Defaults, then the optional file, then `PLANTFORM__SECTION__FIELD` variables.
    pub fn load_layered(&self, path: Option<&Path>) -> Result<(), PlantformError> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .map_err(|e| PlantformError::Configuration(format!("Failed to load defaults: {}", e)))?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            debug!("Layering config file {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PlantformError::Configuration(format!("Failed to build config: {}", e)))?;

        config.validate()?;

        *self.write_lock()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PlantformError> {
        let config = self.get()?;
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| PlantformError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| PlantformError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, PlantformError> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|_| PlantformError::Configuration("Config lock poisoned".to_string()))
    }

    /// Apply `f` and keep the result only if it validates.
    pub fn update<F>(&self, f: F) -> Result<(), PlantformError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.write_lock()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>, PlantformError> {
        self.config
            .write()
            .map_err(|_| PlantformError::Configuration("Config lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_invalid() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.evolver.crossover_rate = 2.0);
        assert!(result.is_err());
        assert_eq!(manager.get().unwrap().evolver.crossover_rate, 0.8);

        manager.update(|c| c.evolver.population_size = 40).unwrap();
        assert_eq!(manager.get().unwrap().evolver.population_size, 40);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join("plantform_config_roundtrip.toml");
        let manager = ConfigManager::new();
        manager
            .update(|c| {
                c.generator.branch_probability = 0.3;
                c.turtle.angle = 25.0;
            })
            .unwrap();
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        let config = loaded.get().unwrap();
        assert_eq!(config.generator.branch_probability, 0.3);
        assert_eq!(config.turtle.angle, 25.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_layered_defaults() {
        let manager = ConfigManager::new();
        manager.load_layered(None).unwrap();
        let config = manager.get().unwrap();
        assert_eq!(config.evolver.population_size, 20);
        assert_eq!(config.turtle.tropism, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_manifests_describe_real_fields() {
        let config = AppConfig::default();
        let tree = serde_json::to_value(&config).unwrap();
        let manifests = config.manifests();
        assert_eq!(
            manifests.iter().map(|m| m.section.as_str()).collect::<Vec<_>>(),
            vec!["evolver", "generator", "turtle", "fitness"]
        );

        for manifest in &manifests {
            for field in &manifest.fields {
                let value = field
                    .name
                    .split('.')
                    .fold(&tree[&manifest.section], |node, key| &node[key]);
                assert_eq!(value, &field.default, "{}.{}", manifest.section, field.name);
            }
        }
    }
}
