use serde::{Deserialize, Serialize};

use crate::asr::error::{AsrError, AsrResult};
use crate::config_manager::endpointing::EndpointingConfig;

/// What an acoustic model produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Per-frame CTC logits decoded to text
    #[default]
    Transcription,
    /// One class distribution per chunk (VAD, keyword spotting)
    Classification,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Transcription => "transcription",
            ModelKind::Classification => "classification",
        }
    }
}

/// Description of an acoustic model hosted by the model server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "name")]
    pub name: String,

    #[serde(default)]
    pub kind: ModelKind,

    /// CTC symbols; the blank symbol is the index after the last entry
    #[serde(default)]
    pub vocabulary: Vec<String>,

    /// Class labels for classification models
    #[serde(default)]
    pub labels: Vec<String>,

    /// Seconds of audio covered by one output frame
    #[serde(rename = "frame_stride")]
    #[serde(default = "default_frame_stride")]
    pub frame_stride: f32,

    /// Number of chunks averaged before picking a class
    #[serde(rename = "smoothing_window")]
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

fn default_frame_stride() -> f32 {
    0.02
}

fn default_smoothing_window() -> usize {
    1
}

impl ModelConfig {
    pub fn transcription(name: impl Into<String>, vocabulary: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Transcription,
            vocabulary,
            labels: Vec::new(),
            frame_stride: default_frame_stride(),
            smoothing_window: default_smoothing_window(),
        }
    }

    pub fn classification(name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Classification,
            vocabulary: Vec::new(),
            labels,
            frame_stride: default_frame_stride(),
            smoothing_window: default_smoothing_window(),
        }
    }

    pub fn validate(&self) -> AsrResult<()> {
        match self.kind {
            ModelKind::Transcription if self.vocabulary.is_empty() => Err(AsrError::Config(
                format!("model '{}' has an empty vocabulary", self.name),
            )),
            ModelKind::Classification if self.labels.is_empty() => Err(AsrError::Config(
                format!("model '{}' has no class labels", self.name),
            )),
            _ if !(self.frame_stride > 0.0) => Err(AsrError::Config(format!(
                "model '{}' has a non-positive frame_stride",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

/// Rate and framing the service expects its input at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(rename = "sample_rate")]
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Seconds per chunk handed to `transcribe`
    #[serde(rename = "frame_length")]
    #[serde(default = "default_frame_length")]
    pub frame_length: f32,
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_frame_length() -> f32 {
    1.0
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_length: default_frame_length(),
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> AsrResult<()> {
        if self.sample_rate == 0 {
            return Err(AsrError::Config("sample_rate must be positive".to_string()));
        }
        if !(self.frame_length > 0.0) || !self.frame_length.is_finite() {
            return Err(AsrError::Config("frame_length must be positive".to_string()));
        }
        if (self.frame_length * self.sample_rate as f32).round() < 1.0 {
            return Err(AsrError::Config(format!(
                "frame_length {}s is shorter than one sample at {} Hz",
                self.frame_length, self.sample_rate
            )));
        }
        Ok(())
    }
}

/// Configuration for the Riva streaming bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivaConfig {
    #[serde(rename = "server_url")]
    #[serde(default = "default_riva_url")]
    pub server_url: String,

    #[serde(rename = "language_code")]
    #[serde(default = "default_language_code")]
    pub language_code: String,

    #[serde(rename = "automatic_punctuation")]
    #[serde(default = "default_true")]
    pub automatic_punctuation: bool,

    #[serde(rename = "timeout_secs")]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_riva_url() -> String {
    "http://localhost:50051".to_string()
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for RivaConfig {
    fn default() -> Self {
        Self {
            server_url: default_riva_url(),
            language_code: default_language_code(),
            automatic_punctuation: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Model server hosting the TensorRT / ONNX Runtime sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceServiceConfig {
    #[serde(rename = "base_url")]
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    #[serde(rename = "timeout_secs")]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_inference_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for InferenceServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Configuration for Automatic Speech Recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrConfig {
    /// Backend tag ("riva", "tensorrt", "onnxruntime") or a model name
    #[serde(rename = "backend")]
    pub backend: String,

    pub model: Option<ModelConfig>,

    pub riva: Option<RivaConfig>,

    #[serde(rename = "inference_service")]
    #[serde(default)]
    pub inference_service: InferenceServiceConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub endpointing: EndpointingConfig,
}

impl AsrConfig {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            model: None,
            riva: None,
            inference_service: InferenceServiceConfig::default(),
            streaming: StreamingConfig::default(),
            endpointing: EndpointingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let config: AsrConfig = serde_yaml::from_str("backend: riva\n").unwrap();
        assert_eq!(config.backend, "riva");
        assert_eq!(config.streaming, StreamingConfig::default());
        assert_eq!(config.inference_service.base_url, "http://localhost:8000");
        assert!(config.model.is_none());
    }

    #[test]
    fn model_section_parses_kind() {
        let yaml = r#"
backend: onnxruntime
model:
  name: vad
  kind: classification
  labels: [background, speech]
  smoothing_window: 3
"#;
        let config: AsrConfig = serde_yaml::from_str(yaml).unwrap();
        let model = config.model.unwrap();
        assert_eq!(model.kind, ModelKind::Classification);
        assert_eq!(model.kind.as_str(), "classification");
        assert_eq!(model.smoothing_window, 3);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn validation_rejects_unusable_models() {
        assert!(ModelConfig::transcription("ctc", vec![]).validate().is_err());
        assert!(ModelConfig::classification("kws", vec![]).validate().is_err());

        let mut model = ModelConfig::transcription("ctc", vec!["a".to_string()]);
        model.frame_stride = 0.0;
        assert!(model.validate().is_err());
    }

    #[test]
    fn streaming_validation() {
        assert!(StreamingConfig::default().validate().is_ok());
        let zero_rate = StreamingConfig { sample_rate: 0, frame_length: 1.0 };
        assert!(zero_rate.validate().is_err());
        let tiny = StreamingConfig { sample_rate: 16000, frame_length: 1e-6 };
        assert!(tiny.validate().is_err());
    }
}
