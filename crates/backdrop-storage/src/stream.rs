//! Source byte stream and its error type

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

/// Source resolution errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Photo not found: {0}")]
    NotFound(String),

    #[error("Invalid photo key: {0}")]
    InvalidKey(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Raw encoded image bytes, delivered in chunks.
///
/// Nothing is opened until the stream is first polled. Dropping it releases
/// the underlying file handle or HTTP connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, SourceError>> + Send>>;
