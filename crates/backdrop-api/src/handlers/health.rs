//! Health check handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct HealthCheckResponse {
    pub status: &'static str,
    /// Photos currently available for random selection
    pub photos: usize,
}

/// Liveness check. The catalog size is reported so a stalled refresh is visible.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: "ok",
            photos: state.catalog().len(),
        }),
    )
}
