//! Application configuration (`concord.yml`)

use concord_engine::{ConfigError, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration struct matching the concord.yml schema
///
/// ```yaml
/// engine:
///   max_cascade_depth: 64
///   trace_bindings: false
/// storage:
///   base_url: https://files.example.com
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prefix of generated upload and download URLs
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    String::from("https://storage.local")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}
