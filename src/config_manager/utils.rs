use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::config_manager::main::Config;

/// Read a YAML or JSON configuration file with environment variable substitution
pub fn read_config_file(config_path: &Path) -> Result<Value> {
    if !config_path.exists() {
        anyhow::bail!("Configuration file not found: {}", config_path.display());
    }

    let content = load_text_file_with_guess_encoding(config_path)?;
    if content.trim().is_empty() {
        anyhow::bail!("Configuration file is empty: {}", config_path.display());
    }

    let content = substitute_env_vars(&content)?;

    let is_json = config_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "json" | "jsonld"))
        .unwrap_or(false);

    let value = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", config_path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", config_path.display()))?
    };
    Ok(value)
}

/// Replace `${VAR_NAME}` with the variable's value, leaving unset variables untouched
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let pattern = Regex::new(r"\$\{(\w+)\}")?;
    let replaced = pattern.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    Ok(replaced.into_owned())
}

/// Validate configuration data against the Config model
pub fn validate_config(config_data: Value) -> Result<Config> {
    let config: Config = serde_json::from_value(config_data)?;
    Ok(config)
}

/// Load text file, stripping a UTF-8 BOM and falling back to GBK for legacy files
pub fn load_text_file_with_guess_encoding(file_path: &Path) -> Result<String> {
    let mut bytes = fs::read(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(0..3);
    }

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(err) => {
            debug!("{} is not UTF-8, decoding as GBK", file_path.display());
            let (cow, _, _) = encoding_rs::GBK.decode(err.as_bytes());
            Ok(cow.into_owned())
        }
    }
}
