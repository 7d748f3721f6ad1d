pub mod classifier;
pub mod ctc;
pub mod engine;
pub mod error;
pub mod factory;
pub mod interface;
pub mod phrase;
pub mod riva;

pub use classifier::ClassificationEngine;
pub use engine::AsrEngine;
pub use error::{AsrError, AsrResult, BackendError};
pub use factory::{asr, AsrFactory, BackendKind, ModelRegistry, Resource};
pub use interface::{AsrService, Transcript, Word};
pub use phrase::{PhraseState, PhraseTracker};
pub use riva::RivaAsrService;
