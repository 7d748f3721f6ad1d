use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::asr::error::{AsrError, AsrResult};
use crate::asr::interface::{validate_chunk, AsrService, Transcript, Word};
use crate::asr::phrase::PhraseState;
use crate::audio::f32_to_i16;
use crate::config_manager::asr::{AsrConfig, RivaConfig, StreamingConfig};

#[derive(Debug, Serialize)]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
    enable_word_time_offsets: bool,
}

#[derive(Debug, Serialize)]
struct StreamingRecognizeRequest<'a> {
    session_id: &'a str,
    config: RecognitionConfig<'a>,
    audio: Vec<i16>,
    end_of_stream: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamingRecognizeResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub words: Vec<WordInfo>,
    pub confidence: Option<f32>,
}

/// Word timing from Riva, offsets in milliseconds
#[derive(Debug, Deserialize)]
pub struct WordInfo {
    pub word: String,
    pub start_time: i64,
    pub end_time: i64,
    pub confidence: Option<f32>,
}

/// Phrase bookkeeping for server-side endpointing
#[derive(Debug)]
struct RivaStream {
    state: PhraseState,
    running: Option<Transcript>,
}

impl RivaStream {
    fn new() -> Self {
        Self {
            state: PhraseState::Idle,
            running: None,
        }
    }

    /// Map one response to records: finals first, then the latest interim
    fn apply(&mut self, response: StreamingRecognizeResponse) -> Vec<Transcript> {
        let mut transcripts = Vec::new();
        let mut interim = None;

        for result in response.results {
            let alternative = result.alternatives.into_iter().next();

            if result.is_final {
                // the server closed the phrase whether or not it sent text for it
                let was_idle = self.state == PhraseState::Idle && interim.is_none();
                interim = None;
                self.running = None;
                self.state = PhraseState::Idle;

                let Some(alternative) = alternative else {
                    continue;
                };
                let transcript = to_transcript(alternative, true);
                if was_idle && transcript.text.is_empty() {
                    continue;
                }
                debug!("Riva phrase ended: {}", transcript.text);
                transcripts.push(transcript);
            } else if let Some(alternative) = alternative {
                self.state = PhraseState::Accumulating { trailing_silence: 0 };
                interim = Some(to_transcript(alternative, false));
            }
        }

        if let Some(transcript) = interim {
            self.running = Some(transcript);
        }
        if let Some(running) = &self.running {
            transcripts.push(running.clone());
        }
        transcripts
    }

    fn finish(&mut self) -> Option<Transcript> {
        self.state = PhraseState::Idle;
        self.running.take().map(|mut transcript| {
            transcript.end = true;
            transcript
        })
    }
}

fn to_transcript(alternative: Alternative, end: bool) -> Transcript {
    let words = alternative
        .words
        .into_iter()
        .map(|w| Word {
            text: w.word,
            start_time: w.start_time as f32 / 1000.0,
            end_time: w.end_time as f32 / 1000.0,
            confidence: w.confidence,
        })
        .collect();
    Transcript {
        text: alternative.transcript.trim().to_string(),
        words,
        end,
        confidence: alternative.confidence,
    }
}

/// Streaming client for a Riva speech server reached through its HTTP bridge
pub struct RivaAsrService {
    client: Client,
    riva: RivaConfig,
    streaming: StreamingConfig,
    session_id: String,
    stream: RivaStream,
}

impl RivaAsrService {
    pub fn new(config: &AsrConfig) -> AsrResult<Self> {
        let riva = config.riva.clone().unwrap_or_default();
        if riva.language_code.trim().is_empty() {
            return Err(AsrError::Config("riva.language_code is empty".to_string()));
        }
        config.streaming.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(riva.timeout_secs))
            .build()?;

        info!(
            "Riva ASR service at {} ({}, {} Hz)",
            riva.server_url, riva.language_code, config.streaming.sample_rate
        );

        Ok(Self {
            client,
            riva,
            streaming: config.streaming.clone(),
            session_id: Uuid::new_v4().to_string(),
            stream: RivaStream::new(),
        })
    }

    fn send(&self, audio: Vec<i16>, end_of_stream: bool) -> AsrResult<StreamingRecognizeResponse> {
        let url = format!(
            "{}/v1/asr/streaming_recognize",
            self.riva.server_url.trim_end_matches('/')
        );
        let request = StreamingRecognizeRequest {
            session_id: &self.session_id,
            config: RecognitionConfig {
                encoding: "LINEAR_PCM",
                sample_rate_hertz: self.streaming.sample_rate,
                language_code: &self.riva.language_code,
                enable_automatic_punctuation: self.riva.automatic_punctuation,
                enable_word_time_offsets: true,
            },
            audio,
            end_of_stream,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }
}

impl AsrService for RivaAsrService {
    fn transcribe(&mut self, samples: &[f32]) -> AsrResult<Vec<Transcript>> {
        let chunk = validate_chunk(samples, self.chunk_size())?;
        let audio = chunk.iter().copied().map(f32_to_i16).collect();
        let response = self.send(audio, false)?;
        Ok(self.stream.apply(response))
    }

    fn finish(&mut self) -> AsrResult<Vec<Transcript>> {
        let response = self.send(Vec::new(), true)?;
        let mut transcripts: Vec<Transcript> = self
            .stream
            .apply(response)
            .into_iter()
            .filter(|t| t.end)
            .collect();
        transcripts.extend(self.stream.finish());

        // the bridge has closed this session, later audio opens a new one
        self.session_id = Uuid::new_v4().to_string();
        Ok(transcripts)
    }

    fn sample_rate(&self) -> u32 {
        self.streaming.sample_rate
    }

    fn frame_length(&self) -> f32 {
        self.streaming.frame_length
    }
}
