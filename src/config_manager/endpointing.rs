use serde::{Deserialize, Serialize};

/// Configuration for end-of-phrase detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointingConfig {
    /// Seconds of trailing silence after which the running phrase ends
    #[serde(rename = "eos_duration")]
    #[serde(default = "default_eos_duration")]
    pub eos_duration: f32,
}

fn default_eos_duration() -> f32 {
    0.5
}

impl Default for EndpointingConfig {
    fn default() -> Self {
        Self {
            eos_duration: default_eos_duration(),
        }
    }
}

impl EndpointingConfig {
    /// Number of silent model frames that end a phrase, never less than one
    pub fn silence_frames(&self, frame_stride: f32) -> usize {
        if frame_stride <= 0.0 || !self.eos_duration.is_finite() {
            return 1;
        }
        ((self.eos_duration / frame_stride).round() as usize).max(1)
    }
}
