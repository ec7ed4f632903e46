use std::{collections::HashMap, env, fs, path::PathBuf};

use crate::errors::ConfigError;

use super::bridge_config::BridgeConfig;

const CONFIG_DIR_NAME: &str = "service-bridge";
const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "SERVICE_BRIDGE_";

/// Loads [`BridgeConfig`] from a TOML file and the environment.
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Use `<config dir>/service-bridge/config.toml`
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Use an explicit file (for testing or custom deployments)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the file (if any) and apply `SERVICE_BRIDGE_*` overrides.
    pub fn load(&self) -> Result<BridgeConfig, ConfigError> {
        self.load_with_env(&Self::collect_env_vars())
    }

    pub fn load_with_env(&self, env_map: &HashMap<String, String>) -> Result<BridgeConfig, ConfigError> {
        let mut config = self.load_file()?;
        config.apply_env(env_map)?;
        tracing::debug!(?config, "Bridge configuration loaded");
        Ok(config)
    }

    fn config_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// A missing file is not an error; defaults are used instead.
    fn load_file(&self) -> Result<BridgeConfig, ConfigError> {
        let path = self.config_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file found, using defaults");
            return Ok(BridgeConfig::default());
        }

        let path_str = path.display().to_string();
        let content =
            fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path_str.clone(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlParse(path_str, e))
    }

    fn collect_env_vars() -> HashMap<String, String> {
        env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)).collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
