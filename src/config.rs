//! YAML configuration file support for Horaculo.
//!
//! A single file configures the conflict engine and the binary's logging.
//! Every field is optional; missing fields take the engine defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "newsroom"
//!
//! engine:
//!   version: 1
//!   copy_threshold: 0.92
//!   dedupe_threshold: 0.95
//!   use_parallel: true
//!   kernel: auto
//!
//! logging:
//!   level: info
//!   json: false
//! ```

use std::fs;
use std::path::Path;

use conflict::EngineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct HoraculoConfig {
    /// Configuration format version
    #[serde(default = "default_format_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl HoraculoConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: HoraculoConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.engine
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("engine: {err}")))?;
        self.logging.validate()
    }

    /// Engine section, ready for [`conflict::ConflictEngine::new`].
    pub fn engine_config(&self) -> EngineConfig {
        self.engine.clone()
    }
}

impl Default for HoraculoConfig {
    fn default() -> Self {
        Self {
            version: default_format_version(),
            name: None,
            engine: EngineConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Logging section, consumed by the binary when it installs its subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingYamlConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl LoggingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "logging.level must be one of: {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_format_version() -> String {
    "1.0".to_string()
}
fn default_level() -> String {
    "info".to_string()
}
