//! Backdrop Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by every Backdrop component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ImageLimits, LogFormat, PhotoConfig, RemoteSourceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{OutputFormat, PhotoName, PhotoNameError, SourceRequest, TransformSpec};
