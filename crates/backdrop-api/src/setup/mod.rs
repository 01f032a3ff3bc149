//! Application setup and initialization
//!
//! Everything main.rs needs to go from a [`Config`] to a running router.

pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use std::sync::Arc;

use anyhow::{Context, Result};
use backdrop_core::Config;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    backdrop_infra::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration, before anything is served
    validation::validate_config(&config)
        .await
        .context("Configuration validation failed")?;

    tracing::info!("Configuration loaded and validated successfully");

    let (state, refresh) = services::initialize_services(&config).await?;

    if config.catalog_enabled() {
        refresh.spawn();
    } else {
        tracing::info!("Photo catalog disabled, serving the default photo only");
    }

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
