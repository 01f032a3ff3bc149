//! Backdrop API Library
//!
//! HTTP handlers, content negotiation, gallery rendering and application setup.

mod handlers;
mod utils;

pub mod error;
pub mod gallery;
pub mod negotiation;
pub mod services;
pub mod setup;
pub mod state;
pub mod validation;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
