//! Streaming speech recognition backends behind one resolvable interface.
//!
//! ```no_run
//! use streaming_asr::{asr, AsrService};
//!
//! let mut service = asr("vad_marblenet")?;
//! let chunk = vec![0.0f32; service.chunk_size()];
//! for transcript in service.transcribe(&chunk)? {
//!     println!("{} ({:?})", transcript.text, transcript.confidence);
//! }
//! # Ok::<(), streaming_asr::AsrError>(())
//! ```

pub mod asr;
pub mod audio;
pub mod config_manager;
pub mod inference_service;

pub use asr::{
    asr, AsrError, AsrFactory, AsrResult, AsrService, BackendKind, Resource, Transcript, Word,
};
pub use config_manager::{AsrConfig, Config};
