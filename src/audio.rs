use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::asr::error::{AsrError, AsrResult};
use crate::asr::interface::AsrService;

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Mono audio decoded from a WAV file
#[derive(Debug, Clone)]
pub struct WavSource {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl WavSource {
    /// Decode a WAV file, down-mixing multi-channel audio to mono
    pub fn open(path: impl AsRef<Path>) -> AsrResult<Self> {
        let path = path.as_ref();
        let mut reader = WavReader::open(path).map_err(|e| {
            AsrError::AudioFormat(format!("cannot read {}: {}", path.display(), e))
        })?;
        let spec = reader.spec();
        debug!("Loading WAV file: {:?}, spec: {:?}", path, spec);

        let layout = (spec.sample_format, spec.bits_per_sample);
        let decoded: Result<Vec<f32>, hound::Error> = match layout {
            (SampleFormat::Int, 16) => {
                reader.samples::<i16>().map(|s| s.map(i16_to_f32)).collect()
            }
            (SampleFormat::Int, bits @ (24 | 32)) => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect()
            }
            (SampleFormat::Float, 32) => reader.samples::<f32>().collect(),
            (format, bits) => {
                return Err(AsrError::AudioFormat(format!(
                    "unsupported sample format {:?} at {} bits",
                    format, bits
                )))
            }
        };
        let interleaved = decoded.map_err(|e| AsrError::AudioFormat(e.to_string()))?;

        let channels = spec.channels.max(1) as usize;
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        debug!("Loaded {} samples from WAV file", samples.len());
        Ok(Self {
            sample_rate: spec.sample_rate,
            samples,
        })
    }

    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Split into chunks framed for `service`; the last chunk may be short
    pub fn chunks_for<'a>(
        &'a self,
        service: &dyn AsrService,
    ) -> AsrResult<impl Iterator<Item = &'a [f32]> + 'a> {
        if self.sample_rate != service.sample_rate() {
            return Err(AsrError::AudioFormat(format!(
                "audio is {} Hz but the model expects {} Hz",
                self.sample_rate,
                service.sample_rate()
            )));
        }
        Ok(self.samples.chunks(service.chunk_size().max(1)))
    }
}
