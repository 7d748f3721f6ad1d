use std::sync::Arc;

use streaming_asr::asr::error::BackendError;
use streaming_asr::asr::factory::model_backend;
use streaming_asr::config_manager::ModelManifest;
use streaming_asr::inference_service::{InferenceClient, InferenceRequest};
use streaming_asr::{AsrError, AsrFactory, AsrResult, AsrService, BackendKind};

/// Stands in for the model server: loud audio is speech, quiet audio is not.
///
/// Transcription models get one frame per 20 ms: symbol 0 when loud, blank
/// otherwise. Classification models get `[background, speech]` logits.
struct EnergyModel;

impl InferenceClient for EnergyModel {
    fn infer(&self, request: &InferenceRequest<'_>) -> AsrResult<Vec<Vec<f32>>> {
        let frame = (request.sample_rate / 50) as usize;
        let frames: Vec<bool> = request
            .samples
            .chunks(frame)
            .map(|f| f.iter().map(|s| s.abs()).sum::<f32>() / f.len() as f32 > 0.1)
            .collect();

        if request.model == "vad_marblenet" {
            let speech = frames.iter().filter(|loud| **loud).count() * 2 > frames.len();
            return Ok(vec![if speech { vec![0.0, 5.0] } else { vec![5.0, 0.0] }]);
        }

        let width = 29;
        Ok(frames
            .into_iter()
            .map(|loud| {
                let mut row = vec![0.0; width];
                row[if loud { 1 } else { width - 1 }] = 1.0;
                row
            })
            .collect())
    }

    fn health_check(&self) -> AsrResult<bool> {
        Ok(true)
    }
}

fn factory() -> AsrFactory {
    let local = |kind: BackendKind| {
        move |config: &streaming_asr::AsrConfig| -> Result<Box<dyn AsrService>, BackendError> {
            Ok(model_backend(kind, config, Arc::new(EnergyModel))?)
        }
    };
    AsrFactory::new()
        .register(BackendKind::TensorRt, local(BackendKind::TensorRt))
        .register(BackendKind::OnnxRuntime, local(BackendKind::OnnxRuntime))
}

fn tone(samples: usize) -> Vec<f32> {
    (0..samples).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect()
}

#[test]
fn vad_labels_follow_the_audio() {
    let mut vad = factory().resolve("vad_marblenet").unwrap();
    assert!(vad.is_classification());

    let chunk = vad.chunk_size();
    let silence = vec![0.0; chunk];
    let speech = tone(chunk);

    let first = vad.transcribe(&silence).unwrap();
    assert_eq!(first[0].text, "background");

    // the smoothing window lags the switch to speech by a chunk or two
    let labels: Vec<String> = (0..4)
        .map(|_| vad.transcribe(&speech).unwrap()[0].text.clone())
        .collect();
    assert_eq!(labels.last().map(String::as_str), Some("speech"));
}

#[test]
fn one_phrase_then_silence_ends_exactly_once() {
    let mut service = factory().resolve("quartznet").unwrap();
    let chunk = service.chunk_size();
    assert_eq!(chunk, 16000);

    // 0.3 s of speech, then silence
    let mut audio = tone(4800);
    audio.resize(chunk, 0.0);
    let silence = vec![0.0; chunk];

    let mut records = Vec::new();
    records.extend(service.transcribe(&audio).unwrap());
    records.extend(service.transcribe(&silence).unwrap());
    records.extend(service.transcribe(&silence).unwrap());
    records.extend(service.finish().unwrap());

    let ended: Vec<_> = records.iter().filter(|t| t.end).collect();
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].text, "a");
    assert!(records.last().unwrap().end);
}

#[test]
fn phrase_boundary_inside_one_chunk_is_ordered() {
    let mut service = factory().resolve("quartznet").unwrap();
    let chunk = service.chunk_size();

    // speech, 0.6 s of silence (past the 0.5 s endpoint), speech again
    let mut audio = tone(1600);
    audio.extend(vec![0.0; 9600]);
    audio.extend(tone(chunk - audio.len()));

    let records = service.transcribe(&audio).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].end);
    assert!(!records[1].end);
    assert!(records[1].words[0].start_time > records[0].words[0].end_time);
}

#[test]
fn unknown_names_fail_before_construction() {
    let factory = factory().with_models(ModelManifest::empty());
    assert!(matches!(
        factory.resolve("vad_marblenet"),
        Err(AsrError::UnknownBackend(_))
    ));
    assert!(matches!(factory.resolve("riva"), Err(AsrError::UnknownBackend(_))));
}

#[test]
fn oversized_chunks_are_audio_format_errors() {
    let mut service = factory().resolve("vad_marblenet").unwrap();
    let too_long = vec![0.0; service.chunk_size() + 1];
    assert!(matches!(
        service.transcribe(&too_long),
        Err(AsrError::AudioFormat(_))
    ));
}
