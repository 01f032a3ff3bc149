//! Streaming transform pipeline
//!
//! The source stream is bridged into a blocking reader and decoded on the
//! blocking pool as bytes arrive, then resized and encoded. Encoded output is
//! pushed through a bounded channel and exposed as a [`TransformStream`].
//! Dropping the stream stops the work: the source ends early, and the encoder
//! fails on its next write.

use std::io;
use std::pin::Pin;
use std::time::Instant;

use backdrop_core::TransformSpec;
use backdrop_storage::ByteStream;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::error::TransformError;
use crate::image::ImageTransformer;
use crate::reader::{SourceFailure, SourceReader};
use crate::writer::ChannelWriter;

/// Encoded output chunks. An `Err` item is always the last item.
pub type TransformStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransformError>> + Send>>;

/// Chunks buffered between the encoder and the response body
const OUTPUT_CHANNEL_CAPACITY: usize = 4;

/// Resource caps applied to every transform
#[derive(Clone, Debug)]
pub struct PipelineLimits {
    /// Largest encoded source accepted
    pub max_source_bytes: usize,
    /// Largest decoded width accepted
    pub max_decode_width: u32,
    /// Largest decoded height accepted
    pub max_decode_height: u32,
    /// Decoder allocation ceiling in bytes
    pub max_decode_alloc: u64,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        PipelineLimits {
            max_source_bytes: 25 * 1024 * 1024,
            max_decode_width: 16_384,
            max_decode_height: 16_384,
            max_decode_alloc: 512 * 1024 * 1024,
        }
    }
}

impl PipelineLimits {
    pub fn with_max_source_bytes(max_source_bytes: usize) -> Self {
        PipelineLimits {
            max_source_bytes,
            ..Default::default()
        }
    }

    fn decoder_limits(&self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.max_decode_width);
        limits.max_image_height = Some(self.max_decode_height);
        limits.max_alloc = Some(self.max_decode_alloc);
        limits
    }
}

#[derive(Clone, Debug, Default)]
pub struct TransformPipeline {
    limits: PipelineLimits,
}

impl TransformPipeline {
    pub fn new(limits: PipelineLimits) -> Self {
        TransformPipeline { limits }
    }

    pub fn limits(&self) -> &PipelineLimits {
        &self.limits
    }

    /// Start transforming `source` according to `spec`.
    ///
    /// Must be called from within a Tokio runtime. Work starts immediately in
    /// a background task; the returned stream yields encoded chunks as they
    /// are produced.
    pub fn transform(&self, source: ByteStream, spec: TransformSpec) -> TransformStream {
        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        tokio::spawn(drive(source, spec, self.limits.clone(), tx));

        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }
}

async fn drive(
    source: ByteStream,
    spec: TransformSpec,
    limits: PipelineLimits,
    tx: mpsc::Sender<Result<Bytes, TransformError>>,
) {
    let start = Instant::now();

    // The source ends as soon as the output is dropped
    let closed_tx = tx.clone();
    let source: Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>> = Box::pin(
        source
            .map(|chunk| chunk.map_err(io::Error::other))
            .take_until(async move { closed_tx.closed().await }),
    );
    let bridge = SyncIoBridge::new(StreamReader::new(source));

    let error_tx = tx.clone();
    let decoder_limits = limits.decoder_limits();
    let max_source_bytes = limits.max_source_bytes;

    let result = tokio::task::spawn_blocking(move || {
        let failure = SourceFailure::default();
        let mut reader = SourceReader::new(bridge, max_source_bytes, failure.clone());

        let result = ImageTransformer::transform(
            &mut reader,
            &spec,
            decoder_limits,
            ChannelWriter::new(tx),
        )
        .map_err(|e| failure.take().unwrap_or(e))
        .and_then(|(outcome, writer)| {
            let bytes_sent = writer
                .finish()
                .map_err(|e| TransformError::Encode(format!("Failed to flush output: {}", e)))?;
            Ok((outcome, bytes_sent))
        });
        (reader.consumed(), result)
    })
    .await;

    let (source_bytes, error) = match result {
        Ok((source_bytes, Ok((outcome, bytes_sent)))) => {
            tracing::info!(
                format = %spec.format,
                width = outcome.width,
                height = outcome.height,
                source_bytes,
                output_bytes = bytes_sent,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Image transformed"
            );
            return;
        }
        Ok((source_bytes, Err(e))) => (source_bytes, e),
        Err(join_err) => (0, TransformError::Internal(join_err.to_string())),
    };

    if error_tx.is_closed() {
        tracing::debug!(error = %error, "Transform abandoned after output was dropped");
        return;
    }

    tracing::error!(
        error = %error,
        format = %spec.format,
        source_bytes,
        "Image transform failed"
    );
    let _ = error_tx.send(Err(error)).await;
}
