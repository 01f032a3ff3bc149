//! Application state shared by every handler.

use backdrop_core::Config;
use backdrop_processing::TransformPipeline;
use backdrop_storage::{PhotoCatalog, SourceResolver};

/// Built once at startup and shared as `Arc<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub resolver: SourceResolver,
    pub pipeline: TransformPipeline,
}

impl AppState {
    pub fn catalog(&self) -> &PhotoCatalog {
        self.resolver.catalog()
    }
}
