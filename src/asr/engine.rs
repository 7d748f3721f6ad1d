use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::asr::ctc::{assemble_words, CtcDecoder, CtcStep, TimedToken};
use crate::asr::error::{AsrError, AsrResult};
use crate::asr::factory::BackendKind;
use crate::asr::interface::{validate_chunk, AsrService, Transcript};
use crate::asr::phrase::PhraseTracker;
use crate::config_manager::asr::{AsrConfig, ModelConfig, ModelKind, StreamingConfig};
use crate::inference_service::{InferenceClient, InferenceRequest};

/// Streaming CTC transcription on a TensorRT or ONNX Runtime model.
///
/// Each chunk is sent to the model server, the returned frame logits are
/// greedy-decoded and fed through the phrase tracker. A phrase ends after
/// `endpointing.eos_duration` seconds without a new symbol.
pub struct AsrEngine {
    runtime: BackendKind,
    model: ModelConfig,
    streaming: StreamingConfig,
    client: Arc<dyn InferenceClient>,
    session_id: String,
    decoder: CtcDecoder,
    tracker: PhraseTracker<TimedToken>,
    frames_seen: u64,
}

impl AsrEngine {
    pub fn new(
        runtime: BackendKind,
        config: &AsrConfig,
        client: Arc<dyn InferenceClient>,
    ) -> AsrResult<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| AsrError::Config(format!("{} backend requires a model", runtime)))?;
        if model.kind != ModelKind::Transcription {
            return Err(AsrError::Config(format!(
                "model '{}' is not a transcription model",
                model.name
            )));
        }
        model.validate()?;
        config.streaming.validate()?;

        let end_after = config.endpointing.silence_frames(model.frame_stride);
        info!(
            "Loaded {} transcription model '{}' ({} symbols, phrase ends after {} silent frames)",
            runtime,
            model.name,
            model.vocabulary.len(),
            end_after
        );

        Ok(Self {
            runtime,
            decoder: CtcDecoder::new(model.vocabulary.clone()),
            model,
            streaming: config.streaming.clone(),
            client,
            session_id: Uuid::new_v4().to_string(),
            tracker: PhraseTracker::new(end_after),
            frames_seen: 0,
        })
    }

    fn frame_span(&self) -> (f32, f32) {
        let start = self.frames_seen as f32 * self.model.frame_stride;
        (start, start + self.model.frame_stride)
    }

    fn to_transcript(tokens: &[TimedToken], end: bool) -> Transcript {
        let (text, words) = assemble_words(tokens);
        if end {
            Transcript::ended(text, words)
        } else {
            Transcript::partial(text, words)
        }
    }
}

impl AsrService for AsrEngine {
    fn transcribe(&mut self, samples: &[f32]) -> AsrResult<Vec<Transcript>> {
        let chunk = validate_chunk(samples, self.chunk_size())?;

        let logits = self.client.infer(&InferenceRequest {
            model: &self.model.name,
            runtime: self.runtime.as_str(),
            session_id: &self.session_id,
            sample_rate: self.streaming.sample_rate,
            samples: &chunk,
        })?;

        let width = self.decoder.num_classes();
        if let Some(row) = logits.iter().find(|row| row.len() != width) {
            return Err(AsrError::Inference(format!(
                "model '{}' returned {} classes per frame, expected {}",
                self.model.name,
                row.len(),
                width
            )));
        }

        let mut transcripts = Vec::new();
        for row in &logits {
            let (start_time, end_time) = self.frame_span();
            match self.decoder.step(row) {
                CtcStep::Symbol(index) => {
                    let token = TimedToken {
                        text: self.decoder.symbol(index).to_string(),
                        start_time,
                        end_time,
                    };
                    let ended = if self.decoder.is_word_boundary(index) {
                        self.tracker.unvoiced(Some(token))
                    } else {
                        self.tracker.voiced(Some(token));
                        None
                    };
                    if let Some(tokens) = ended {
                        transcripts.push(Self::to_transcript(&tokens, true));
                    }
                }
                CtcStep::Repeat(index) => {
                    if !self.decoder.is_word_boundary(index) {
                        self.tracker.voiced(None);
                        if let Some(token) = self.tracker.last_mut() {
                            token.end_time = end_time;
                        }
                    } else if let Some(tokens) = self.tracker.unvoiced(None) {
                        transcripts.push(Self::to_transcript(&tokens, true));
                    }
                }
                CtcStep::Blank => {
                    if let Some(tokens) = self.tracker.unvoiced(None) {
                        transcripts.push(Self::to_transcript(&tokens, true));
                    }
                }
            }
            self.frames_seen += 1;
        }

        if let Some(tokens) = self.tracker.partial() {
            transcripts.push(Self::to_transcript(tokens, false));
        }

        debug!(
            "{} frames decoded, {} transcripts, state {:?}",
            logits.len(),
            transcripts.len(),
            self.tracker.state()
        );
        Ok(transcripts)
    }

    fn finish(&mut self) -> AsrResult<Vec<Transcript>> {
        self.decoder.reset();
        let transcripts = self
            .tracker
            .finish()
            .map(|tokens| vec![Self::to_transcript(&tokens, true)])
            .unwrap_or_default();

        // next chunk starts a new stream on the model server
        self.session_id = Uuid::new_v4().to_string();
        self.frames_seen = 0;
        Ok(transcripts)
    }

    fn sample_rate(&self) -> u32 {
        self.streaming.sample_rate
    }

    fn frame_length(&self) -> f32 {
        self.streaming.frame_length
    }
}
