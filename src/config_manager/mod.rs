pub mod asr;
pub mod endpointing;
pub mod main;
pub mod models;
pub mod utils;

pub use asr::{
    AsrConfig, InferenceServiceConfig, ModelConfig, ModelKind, RivaConfig, StreamingConfig,
};
pub use endpointing::EndpointingConfig;
pub use main::Config;
pub use models::{ModelEntry, ModelManifest};
