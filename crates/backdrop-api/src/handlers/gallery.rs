use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::gallery;
use crate::state::AppState;

/// Render the gallery for the current catalog.
#[tracing::instrument(skip(state), fields(operation = "get_gallery"))]
pub async fn get_gallery(State(state): State<Arc<AppState>>) -> Html<String> {
    render_gallery(&state)
}

pub(crate) fn render_gallery(state: &AppState) -> Html<String> {
    let snapshot = state.catalog().snapshot();
    tracing::debug!(photos = snapshot.len(), "Rendering gallery");
    Html(gallery::render(&snapshot, state.config.gallery_title()))
}
