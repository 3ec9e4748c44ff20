//! Optional YAML configuration
//!
//! An `aisle.yaml` next to the working directory carries the default
//! provider and model. CLI flags override it; API keys come from the
//! environment only, never from the file.

use crate::error::AisleError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_provider() -> String {
    "claude".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AisleConfig {
    /// Default provider (claude, openai, ollama, mock)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Default model; falls back to the provider's default when unset
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for AisleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
        }
    }
}

impl AisleConfig {
    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self, AisleError> {
        let yaml = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    /// Load from a YAML file, or fall back to defaults if it is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, AisleError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
