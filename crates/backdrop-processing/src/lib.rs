//! Backdrop Processing Library
//!
//! Decoding, resizing and re-encoding of source photos. The
//! [`TransformPipeline`] drives the work off the async runtime and hands the
//! encoded output back as a stream of chunks.

pub mod compression;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use compression::ImageCompressor;
pub use crate::image::{ImageResize, ImageTransformer};
pub use error::TransformError;
pub use pipeline::{PipelineLimits, TransformPipeline, TransformStream};
pub use reader::{SourceFailure, SourceReader};
pub use writer::ChannelWriter;
