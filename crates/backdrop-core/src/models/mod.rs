//! Domain models shared across crates

pub mod source;
pub mod transform;

pub use source::{PhotoName, PhotoNameError, SourceRequest};
pub use transform::{OutputFormat, TransformSpec};
