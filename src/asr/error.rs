use thiserror::Error;

/// Error type constructors hand back to the resolver.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while resolving or driving a streaming ASR backend
#[derive(Debug, Error)]
pub enum AsrError {
    /// The identifier is neither a backend tag nor a known model name
    #[error("unknown ASR backend or model: {0}")]
    UnknownBackend(String),

    /// The backend's constructor failed; its error is kept as the source
    #[error("failed to construct {backend} backend: {source}")]
    Construction {
        backend: String,
        #[source]
        source: BackendError,
    },

    /// Input samples violate the service's rate/width/framing assumptions
    #[error("invalid audio: {0}")]
    AudioFormat(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type AsrResult<T> = Result<T, AsrError>;
