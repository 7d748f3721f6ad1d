use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::asr::classifier::ClassificationEngine;
use crate::asr::engine::AsrEngine;
use crate::asr::error::{AsrError, AsrResult, BackendError};
use crate::asr::interface::AsrService;
use crate::asr::riva::RivaAsrService;
use crate::config_manager::asr::{AsrConfig, ModelKind};
use crate::config_manager::models::{ModelEntry, ModelManifest};
use crate::inference_service::{HttpInferenceClient, InferenceClient};

/// Backend families a resource can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    Riva,
    TensorRt,
    OnnxRuntime,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Riva,
        BackendKind::TensorRt,
        BackendKind::OnnxRuntime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Riva => "riva",
            BackendKind::TensorRt => "tensorrt",
            BackendKind::OnnxRuntime => "onnxruntime",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = AsrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "riva" => Ok(BackendKind::Riva),
            "tensorrt" | "trt" => Ok(BackendKind::TensorRt),
            "onnxruntime" | "onnx" | "ort" => Ok(BackendKind::OnnxRuntime),
            _ => Err(AsrError::UnknownBackend(s.to_string())),
        }
    }
}

/// Secondary lookup for identifiers that are model names rather than backend tags
pub trait ModelRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<ModelEntry>;
}

/// What to resolve: a bare identifier or a config carrying one
#[derive(Debug, Clone)]
pub enum Resource {
    Name(String),
    Config(AsrConfig),
}

impl Resource {
    pub fn identifier(&self) -> &str {
        match self {
            Resource::Name(name) => name,
            Resource::Config(config) => &config.backend,
        }
    }
}

impl From<&str> for Resource {
    fn from(name: &str) -> Self {
        Resource::Name(name.to_string())
    }
}

impl From<String> for Resource {
    fn from(name: String) -> Self {
        Resource::Name(name)
    }
}

impl From<AsrConfig> for Resource {
    fn from(config: AsrConfig) -> Self {
        Resource::Config(config)
    }
}

pub type BackendConstructor =
    Box<dyn Fn(&AsrConfig) -> Result<Box<dyn AsrService>, BackendError> + Send + Sync>;

/// Registry of backend constructors keyed by [`BackendKind`]
pub struct AsrFactory {
    constructors: HashMap<BackendKind, BackendConstructor>,
    models: Box<dyn ModelRegistry>,
}

impl Default for AsrFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AsrFactory {
    /// A factory with no backends registered, resolving model names against the built-in manifest
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            models: Box::new(ModelManifest::builtin()),
        }
    }

    /// A factory with the Riva, TensorRT and ONNX Runtime backends registered
    pub fn with_defaults() -> Self {
        Self::new()
            .register(BackendKind::Riva, |config: &AsrConfig| {
                let service = RivaAsrService::new(config)?;
                Ok(Box::new(service) as Box<dyn AsrService>)
            })
            .register(BackendKind::TensorRt, |config: &AsrConfig| {
                remote_model_backend(BackendKind::TensorRt, config)
            })
            .register(BackendKind::OnnxRuntime, |config: &AsrConfig| {
                remote_model_backend(BackendKind::OnnxRuntime, config)
            })
    }

    pub fn register<F>(mut self, kind: BackendKind, constructor: F) -> Self
    where
        F: Fn(&AsrConfig) -> Result<Box<dyn AsrService>, BackendError> + Send + Sync + 'static,
    {
        debug!("Registering ASR backend: {}", kind);
        self.constructors.insert(kind, Box::new(constructor));
        self
    }

    pub fn with_models(mut self, models: impl ModelRegistry + 'static) -> Self {
        self.models = Box::new(models);
        self
    }

    /// Registered backend kinds, in declaration order
    pub fn kinds(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<BackendKind> = self.constructors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Work out which backend serves `resource` and the config it will be built with.
    ///
    /// The identifier is first read as a backend tag, then looked up by exact
    /// name in the model registry. Nothing is constructed.
    pub fn resolve_config(&self, resource: &Resource) -> AsrResult<(BackendKind, AsrConfig)> {
        let identifier = resource.identifier();
        if identifier.trim().is_empty() {
            return Err(AsrError::UnknownBackend(identifier.to_string()));
        }

        let (kind, config) = match identifier.parse::<BackendKind>() {
            Ok(kind) => {
                let config = match resource {
                    Resource::Name(_) => AsrConfig::new(kind.as_str()),
                    Resource::Config(config) => config.clone(),
                };
                (kind, config)
            }
            Err(_) => {
                let entry = self
                    .models
                    .lookup(identifier)
                    .ok_or_else(|| AsrError::UnknownBackend(identifier.to_string()))?;
                debug!("Model '{}' runs on the {} backend", entry.name, entry.backend);

                let kind = entry.backend.parse::<BackendKind>()?;
                let mut config = match resource {
                    Resource::Name(_) => AsrConfig::new(kind.as_str()),
                    Resource::Config(config) => config.clone(),
                };
                config.backend = kind.as_str().to_string();
                config.model = Some(entry.model);
                config.streaming = entry.streaming;
                (kind, config)
            }
        };

        if !self.constructors.contains_key(&kind) {
            return Err(AsrError::UnknownBackend(identifier.to_string()));
        }
        Ok((kind, config))
    }

    /// Resolve `resource` and construct its backend
    pub fn resolve(&self, resource: impl Into<Resource>) -> AsrResult<Box<dyn AsrService>> {
        let resource = resource.into();
        info!("Resolving ASR resource: {}", resource.identifier());

        let (kind, config) = self.resolve_config(&resource)?;
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| AsrError::UnknownBackend(resource.identifier().to_string()))?;

        info!("Initializing ASR backend: {}", kind);
        constructor(&config).map_err(|source| AsrError::Construction {
            backend: kind.to_string(),
            source,
        })
    }
}

/// Load a streaming ASR service or model with the default backends
pub fn asr(resource: impl Into<Resource>) -> AsrResult<Box<dyn AsrService>> {
    AsrFactory::with_defaults().resolve(resource)
}

/// Build the engine matching the configured model's kind
pub fn model_backend(
    kind: BackendKind,
    config: &AsrConfig,
    client: Arc<dyn InferenceClient>,
) -> AsrResult<Box<dyn AsrService>> {
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| AsrError::Config(format!("{} backend requires a model", kind)))?;

    match model.kind {
        ModelKind::Transcription => Ok(Box::new(AsrEngine::new(kind, config, client)?)),
        ModelKind::Classification => Ok(Box::new(ClassificationEngine::new(kind, config, client)?)),
    }
}

fn remote_model_backend(
    kind: BackendKind,
    config: &AsrConfig,
) -> Result<Box<dyn AsrService>, BackendError> {
    let client = HttpInferenceClient::new(&config.inference_service)?;
    info!("Using model server at {} for {}", client.base_url(), kind);
    Ok(model_backend(kind, config, Arc::new(client))?)
}
