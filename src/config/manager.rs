use super::{
    data::DataConfig,
    evolution::EvolutionConfig,
    model::ModelConfig,
    traits::ConfigSection,
};
use crate::error::EfrError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub evolution: EvolutionConfig,
    pub data: DataConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EfrError> {
        self.model.validate()?;
        self.evolution.validate()?;
        self.data.validate()?;
        Ok(())
    }
}

/// Loads the application configuration from a TOML file layered with
/// `EFRGEN__<SECTION>__<KEY>` environment overrides.
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: AppConfig,
}

impl ConfigManager {
    pub const ENV_PREFIX: &'static str = "EFRGEN";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EfrError> {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EfrError::Configuration(format!("Failed to load config: {}", e)))?;

        config.validate()?;

        self.config = config;
        Ok(())
    }

    pub fn load_from_str(&mut self, contents: &str) -> Result<(), EfrError> {
        let config: AppConfig = toml::from_str(contents)
            .map_err(|e| EfrError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        self.config = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EfrError> {
        let toml_str = toml::to_string_pretty(&self.config)
            .map_err(|e| EfrError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| EfrError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    pub fn update<F>(&mut self, f: F) -> Result<(), EfrError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.config.clone();
        f(&mut candidate);
        candidate.validate()?;
        self.config = candidate;
        Ok(())
    }
}
