//! Backdrop Storage Library
//!
//! Everything that produces raw source bytes: the managed photo directory,
//! on-demand remote fetches, the in-memory photo catalog and the
//! [`SourceResolver`] that picks between them.
//!
//! All sources hand back a [`ByteStream`]. Streams are lazy, so opening a
//! file or connecting to a remote host happens on first poll and any failure
//! surfaces as the first item.

pub mod catalog;
pub mod local;
pub mod remote;
pub mod resolver;
pub mod stream;

// Re-export commonly used types
pub use catalog::PhotoCatalog;
pub use local::LocalPhotoStore;
pub use remote::RemoteFetcher;
pub use resolver::SourceResolver;
pub use stream::{ByteStream, SourceError, SourceResult};
