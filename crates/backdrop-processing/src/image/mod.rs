//! Decode, resize and encode a single image

pub mod resize;
pub mod transformer;

pub use resize::ImageResize;
pub use transformer::{ImageTransformer, TransformOutcome};
