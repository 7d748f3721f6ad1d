use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::asr::ctc::argmax;
use crate::asr::error::{AsrError, AsrResult};
use crate::asr::factory::BackendKind;
use crate::asr::interface::{validate_chunk, AsrService, Transcript};
use crate::config_manager::asr::{AsrConfig, ModelConfig, ModelKind, StreamingConfig};
use crate::inference_service::{InferenceClient, InferenceRequest};

/// Detection model (VAD, keyword spotting) behind the streaming interface.
///
/// Emits one record per chunk whose text is the most likely label after
/// averaging class probabilities over the last `smoothing_window` chunks.
/// Every record is complete on its own, so `end` is always true.
pub struct ClassificationEngine {
    runtime: BackendKind,
    model: ModelConfig,
    streaming: StreamingConfig,
    client: Arc<dyn InferenceClient>,
    session_id: String,
    history: VecDeque<Vec<f32>>,
}

impl ClassificationEngine {
    pub fn new(
        runtime: BackendKind,
        config: &AsrConfig,
        client: Arc<dyn InferenceClient>,
    ) -> AsrResult<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| AsrError::Config(format!("{} backend requires a model", runtime)))?;
        if model.kind != ModelKind::Classification {
            return Err(AsrError::Config(format!(
                "model '{}' is not a classification model",
                model.name
            )));
        }
        model.validate()?;
        config.streaming.validate()?;

        info!(
            "Loaded {} classification model '{}' with labels {:?}",
            runtime, model.name, model.labels
        );

        Ok(Self {
            runtime,
            history: VecDeque::with_capacity(model.smoothing_window.max(1)),
            model,
            streaming: config.streaming.clone(),
            client,
            session_id: Uuid::new_v4().to_string(),
        })
    }

    fn smoothed(&self) -> Vec<f32> {
        let mut mean = vec![0.0; self.model.labels.len()];
        for probs in &self.history {
            for (acc, p) in mean.iter_mut().zip(probs) {
                *acc += p;
            }
        }
        let n = self.history.len().max(1) as f32;
        mean.iter_mut().for_each(|v| *v /= n);
        mean
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

impl AsrService for ClassificationEngine {
    fn transcribe(&mut self, samples: &[f32]) -> AsrResult<Vec<Transcript>> {
        let chunk = validate_chunk(samples, self.chunk_size())?;

        let logits = self.client.infer(&InferenceRequest {
            model: &self.model.name,
            runtime: self.runtime.as_str(),
            session_id: &self.session_id,
            sample_rate: self.streaming.sample_rate,
            samples: &chunk,
        })?;

        let row = logits.last().ok_or_else(|| {
            AsrError::Inference(format!("model '{}' returned no output", self.model.name))
        })?;
        if row.len() != self.model.labels.len() {
            return Err(AsrError::Inference(format!(
                "model '{}' returned {} classes, expected {}",
                self.model.name,
                row.len(),
                self.model.labels.len()
            )));
        }

        if self.history.len() == self.model.smoothing_window.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(softmax(row));

        let probs = self.smoothed();
        let Some(best) = argmax(&probs) else {
            return Ok(Vec::new());
        };
        let label = &self.model.labels[best];
        debug!("Classified chunk as '{}' ({:.3})", label, probs[best]);

        let mut transcript = Transcript::ended(label.clone(), Vec::new());
        transcript.confidence = Some(probs[best]);
        Ok(vec![transcript])
    }

    fn finish(&mut self) -> AsrResult<Vec<Transcript>> {
        self.history.clear();
        self.session_id = Uuid::new_v4().to_string();
        Ok(Vec::new())
    }

    fn is_classification(&self) -> bool {
        true
    }

    fn sample_rate(&self) -> u32 {
        self.streaming.sample_rate
    }

    fn frame_length(&self) -> f32 {
        self.streaming.frame_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference_service::mock::ScriptedClient;

    fn vad_config(window: usize) -> AsrConfig {
        let labels = vec!["background".to_string(), "speech".to_string()];
        let mut model = ModelConfig::classification("vad", labels);
        model.smoothing_window = window;
        let mut config = AsrConfig::new("tensorrt");
        config.model = Some(model);
        config.streaming = StreamingConfig {
            sample_rate: 16000,
            frame_length: 0.1,
        };
        config
    }

    fn vad(window: usize, script: Vec<Vec<Vec<f32>>>) -> ClassificationEngine {
        let client = ScriptedClient::new(script.into_iter().map(Ok).collect());
        ClassificationEngine::new(BackendKind::TensorRt, &vad_config(window), Arc::new(client))
            .unwrap()
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn emits_label_with_confidence() {
        let mut engine = vad(1, vec![vec![vec![0.0, 3.0]]]);
        assert!(engine.is_classification());
        assert_eq!(engine.chunk_size(), 1600);

        let out = engine.transcribe(&vec![0.0; 1600]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "speech");
        assert!(out[0].end);
        assert!(out[0].words.is_empty());
        assert!(out[0].confidence.unwrap() > 0.9);
    }

    #[test]
    fn smoothing_holds_label_through_a_blip() {
        let speech = vec![vec![0.0, 4.0]];
        let blip = vec![vec![1.0, 0.0]];
        let mut engine = vad(3, vec![speech.clone(), speech, blip]);
        let chunk = vec![0.0; 1600];
        engine.transcribe(&chunk).unwrap();
        engine.transcribe(&chunk).unwrap();
        let out = engine.transcribe(&chunk).unwrap();
        assert_eq!(out[0].text, "speech");
    }

    #[test]
    fn finish_forgets_history_and_session() {
        let script = vec![vec![vec![0.0, 4.0]], vec![vec![4.0, 0.0]]];
        let client = Arc::new(ScriptedClient::new(script.into_iter().map(Ok).collect()));
        let mut engine =
            ClassificationEngine::new(BackendKind::TensorRt, &vad_config(5), client.clone())
                .unwrap();
        let chunk = vec![0.0; 1600];

        engine.transcribe(&chunk).unwrap();
        assert!(engine.finish().unwrap().is_empty());
        let out = engine.transcribe(&chunk).unwrap();

        assert_eq!(out[0].text, "background");
        let calls = client.calls.lock().unwrap();
        assert_ne!(calls[0], calls[1]);
    }

    #[test]
    fn label_count_mismatch_is_an_inference_error() {
        let mut engine = vad(1, vec![vec![vec![0.1, 0.2, 0.3]]]);
        let err = engine.transcribe(&vec![0.0; 1600]).unwrap_err();
        assert!(matches!(err, AsrError::Inference(_)));
    }

    #[test]
    fn rejects_transcription_models() {
        let mut config = AsrConfig::new("tensorrt");
        config.model = Some(ModelConfig::transcription("ctc", vec!["a".to_string()]));
        let client = Arc::new(ScriptedClient::default());
        assert!(ClassificationEngine::new(BackendKind::TensorRt, &config, client).is_err());
    }
}
