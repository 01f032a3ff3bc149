//! Backdrop Infrastructure Library
//!
//! Shared plumbing for the HTTP service:
//! - Middleware (request ID, security headers)
//! - Tracing initialization

pub mod middleware;
pub mod telemetry;

// Re-export commonly used types
pub use middleware::{request_id_middleware, security_headers_middleware, SecurityHeadersConfig};
pub use telemetry::init_telemetry;
