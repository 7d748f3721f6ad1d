use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asr::factory::ModelRegistry;
use crate::config_manager::asr::{ModelConfig, StreamingConfig};

/// A friendly model name bound to the backend that serves it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,

    /// Backend tag the model runs on
    pub backend: String,

    pub model: ModelConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Model names known to the resolver, matched exactly
#[derive(Debug, Clone, Default)]
pub struct ModelManifest {
    entries: HashMap<String, ModelEntry>,
}

impl ModelManifest {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Manifest of the models shipped with the model server
    pub fn builtin() -> Self {
        let mut manifest = Self::empty();
        for entry in builtin_entries() {
            manifest.insert(entry);
        }
        manifest
    }

    /// Add an entry, replacing any entry with the same name
    pub fn insert(&mut self, entry: ModelEntry) {
        if self.entries.contains_key(&entry.name) {
            debug!("Overriding model manifest entry: {}", entry.name);
        }
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ModelEntry>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.get(name)
    }

    /// Entries sorted by name
    pub fn entries(&self) -> Vec<&ModelEntry> {
        let mut entries: Vec<&ModelEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

impl ModelRegistry for ModelManifest {
    fn lookup(&self, name: &str) -> Option<ModelEntry> {
        self.get(name).cloned()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_entries() -> Vec<ModelEntry> {
    let mut quartznet_vocab = vec![" ".to_string()];
    quartznet_vocab.extend(('a'..='z').map(|c| c.to_string()));
    quartznet_vocab.push("'".to_string());

    let mut matchboxnet = ModelConfig::classification(
        "matchboxnet",
        strings(&[
            "bed", "bird", "cat", "dog", "down", "eight", "five", "four", "go", "happy", "house",
            "left", "marvin", "nine", "no", "off", "on", "one", "right", "seven", "sheila",
            "six", "stop", "three", "tree", "two", "up", "wow", "yes", "zero",
        ]),
    );
    matchboxnet.smoothing_window = 1;

    let mut vad_marblenet =
        ModelConfig::classification("vad_marblenet", strings(&["background", "speech"]));
    vad_marblenet.smoothing_window = 5;

    vec![
        ModelEntry {
            name: "quartznet".to_string(),
            backend: "tensorrt".to_string(),
            model: ModelConfig::transcription("quartznet", quartznet_vocab),
            streaming: StreamingConfig {
                sample_rate: 16000,
                frame_length: 1.0,
            },
        },
        ModelEntry {
            name: "matchboxnet".to_string(),
            backend: "tensorrt".to_string(),
            model: matchboxnet,
            streaming: StreamingConfig {
                sample_rate: 16000,
                frame_length: 1.0,
            },
        },
        ModelEntry {
            name: "vad_marblenet".to_string(),
            backend: "tensorrt".to_string(),
            model: vad_marblenet,
            streaming: StreamingConfig {
                sample_rate: 16000,
                frame_length: 0.1,
            },
        },
    ]
}
