use backdrop_storage::SourceError;
use thiserror::Error;

/// Errors produced while turning source bytes into output bytes
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Source image exceeds {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Transform task failed: {0}")]
    Internal(String),
}
