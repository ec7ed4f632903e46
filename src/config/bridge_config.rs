use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ConfigError;
use crate::infrastructure::container::BridgeOptions;
use crate::logging::{LogFormat, LoggingConfig};

pub const ENV_STRICT_RECORDS: &str = "SERVICE_BRIDGE_STRICT_RECORDS";
pub const ENV_LOG_LEVEL: &str = "SERVICE_BRIDGE_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SERVICE_BRIDGE_LOG_FORMAT";

/// Top-level configuration, mirrors the layout of `config.toml`:
///
/// ```toml
/// [bridge]
/// strict_records = false
///
/// [logging]
/// level = "info"
/// format = "pretty"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub bridge: BridgeSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeSection {
    /// Fail on empty registration records instead of ignoring them
    pub strict_records: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            strict_records: self.bridge.strict_records,
        }
    }

    /// Build the logging setup described by the `[logging]` section.
    pub fn logging_config(&self) -> Result<LoggingConfig, ConfigError> {
        let level = self
            .logging
            .level
            .parse::<tracing::Level>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
            })?;
        let format = self.logging.format.parse::<LogFormat>()?;
        Ok(LoggingConfig {
            level,
            format,
            ..LoggingConfig::default()
        })
    }

    /// Environment values take precedence over whatever came from the file.
    pub fn apply_env(&mut self, env_map: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(value) = env_map.get(ENV_STRICT_RECORDS) {
            self.bridge.strict_records = parse_bool(ENV_STRICT_RECORDS, value)?;
        }
        if let Some(level) = env_map.get(ENV_LOG_LEVEL) {
            self.logging.level = level.trim().to_string();
        }
        if let Some(format) = env_map.get(ENV_LOG_FORMAT) {
            self.logging.format = format.trim().to_string();
        }
        Ok(())
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}
