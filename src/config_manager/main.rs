use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config_manager::asr::AsrConfig;
use crate::config_manager::models::{ModelEntry, ModelManifest};

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "asr_config")]
    pub asr_config: AsrConfig,

    /// Extra or overriding model manifest entries
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl Config {
    /// Load configuration from a YAML or JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use crate::config_manager::utils::{read_config_file, validate_config};
        let value = read_config_file(path.as_ref())?;
        validate_config(value)
    }

    /// Built-in manifest with this file's `models` applied on top
    pub fn manifest(&self) -> ModelManifest {
        let mut manifest = ModelManifest::builtin();
        manifest.extend(self.models.iter().cloned());
        manifest
    }
}
