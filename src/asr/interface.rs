use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::asr::error::{AsrError, AsrResult};

/// A single recognised word with its position in the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    /// Seconds from the start of the stream
    pub start_time: f32,
    pub end_time: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// The running transcript of one phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub words: Vec<Word>,
    /// True once the phrase has ended (trailing silence or end of stream)
    pub end: bool,
    /// Class probability for classification models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Transcript {
    pub fn partial(text: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            text: text.into(),
            words,
            end: false,
            confidence: None,
        }
    }

    pub fn ended(text: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            text: text.into(),
            words,
            end: true,
            confidence: None,
        }
    }
}

/// Streaming speech recognition service.
///
/// Implementations keep the running phrase between calls: audio must be fed
/// in real-time order, one chunk per `transcribe` call. A phrase is reported
/// with `end == false` while it accumulates and exactly once with
/// `end == true` when trailing silence ends it. When one phrase ends and the
/// next begins inside the same chunk, the ended record comes first.
pub trait AsrService: Send {
    /// Transcribe one chunk of mono samples normalised to `[-1, 1]` at
    /// [`AsrService::sample_rate`], returning the running transcripts
    fn transcribe(&mut self, samples: &[f32]) -> AsrResult<Vec<Transcript>>;

    /// Signal end of input, ending the running phrase if there is one
    fn finish(&mut self) -> AsrResult<Vec<Transcript>> {
        Ok(Vec::new())
    }

    /// True for detection models (VAD, keyword spotting) that emit class labels instead of text
    fn is_classification(&self) -> bool {
        false
    }

    /// Sample rate the model runs at, in Hz; input should be resampled to it
    fn sample_rate(&self) -> u32;

    /// Duration in seconds per chunk
    fn frame_length(&self) -> f32;

    /// Number of samples per chunk, `round(frame_length * sample_rate)`
    fn chunk_size(&self) -> usize {
        chunk_size_for(self.frame_length(), self.sample_rate())
    }
}

pub fn chunk_size_for(frame_length: f32, sample_rate: u32) -> usize {
    (frame_length as f64 * sample_rate as f64).round() as usize
}

/// Check a chunk against the service framing, zero-padding a short final chunk
pub fn validate_chunk(samples: &[f32], chunk_size: usize) -> AsrResult<Cow<'_, [f32]>> {
    if samples.is_empty() {
        return Err(AsrError::AudioFormat("empty audio chunk".to_string()));
    }
    if samples.len() > chunk_size {
        return Err(AsrError::AudioFormat(format!(
            "chunk of {} samples exceeds chunk size {}",
            samples.len(),
            chunk_size
        )));
    }
    if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
        return Err(AsrError::AudioFormat(format!(
            "non-finite sample at index {}",
            pos
        )));
    }

    if samples.len() == chunk_size {
        return Ok(Cow::Borrowed(samples));
    }

    trace!("Padding chunk from {} to {} samples", samples.len(), chunk_size);
    let mut padded = samples.to_vec();
    padded.resize(chunk_size, 0.0);
    Ok(Cow::Owned(padded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_rounds() {
        assert_eq!(chunk_size_for(0.1, 16000), 1600);
        assert_eq!(chunk_size_for(1.0, 16000), 16000);
        assert_eq!(chunk_size_for(0.0333, 22050), 734);
    }

    #[test]
    fn full_chunk_is_borrowed() {
        let samples = vec![0.1; 160];
        assert!(matches!(validate_chunk(&samples, 160).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn short_chunk_is_padded() {
        let samples = vec![0.5; 100];
        let chunk = validate_chunk(&samples, 160).unwrap();
        assert_eq!(chunk.len(), 160);
        assert_eq!(chunk[99], 0.5);
        assert_eq!(chunk[100], 0.0);
    }

    #[test]
    fn malformed_chunks_are_rejected() {
        assert!(matches!(validate_chunk(&[], 160), Err(AsrError::AudioFormat(_))));
        assert!(matches!(
            validate_chunk(&vec![0.0; 161], 160),
            Err(AsrError::AudioFormat(_))
        ));
        assert!(matches!(
            validate_chunk(&[0.0, f32::NAN], 160),
            Err(AsrError::AudioFormat(_))
        ));
    }

    #[test]
    fn transcript_serializes_without_empty_confidence() {
        let json = serde_json::to_value(Transcript::ended("hello", vec![])).unwrap();
        assert_eq!(json["end"], true);
        assert!(json.get("confidence").is_none());
    }
}
