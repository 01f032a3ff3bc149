//! Build the sources, pipeline and background job behind the router.

use std::sync::Arc;

use anyhow::{Context, Result};
use backdrop_core::{Config, PhotoName};
use backdrop_processing::{PipelineLimits, TransformPipeline};
use backdrop_storage::{LocalPhotoStore, PhotoCatalog, RemoteFetcher, SourceResolver};

use crate::services::catalog_refresh::{CatalogRefreshJob, ManifestPhotoFetcher, PhotoFetcher};
use crate::state::AppState;

/// Initialize application state and the (not yet started) catalog refresh job.
pub async fn initialize_services(config: &Config) -> Result<(Arc<AppState>, CatalogRefreshJob)> {
    let store = LocalPhotoStore::new(config.photos_dir())
        .await
        .context("Failed to open photo directory")?;
    let remote = RemoteFetcher::new(config.remote().fetch_timeout)
        .context("Failed to create remote fetcher")?;

    let default_photo =
        PhotoName::parse(config.default_photo()).context("Invalid DEFAULT_PHOTO")?;
    let catalog = PhotoCatalog::with_default(default_photo.as_str());

    let resolver = SourceResolver::new(store.clone(), remote, catalog.clone(), default_photo);
    let pipeline = TransformPipeline::new(PipelineLimits::with_max_source_bytes(
        config.max_source_bytes(),
    ));

    let fetcher: Option<Arc<dyn PhotoFetcher>> = match config.manifest_path() {
        Some(manifest) => {
            let fetcher = ManifestPhotoFetcher::new(
                manifest,
                config.download_url_template(),
                config.download_concurrency(),
                config.remote().fetch_timeout,
            )?;
            Some(Arc::new(fetcher) as Arc<dyn PhotoFetcher>)
        }
        None => {
            tracing::info!("No photo manifest configured, refresh only rescans the photo directory");
            None
        }
    };
    let refresh = CatalogRefreshJob::new(store, catalog, fetcher);

    tracing::info!(
        photos_dir = %config.photos_dir().display(),
        default_photo = config.default_photo(),
        remote_sources = config.remote_sources_enabled(),
        max_width = config.max_width(),
        max_height = config.max_height(),
        max_source_bytes = config.max_source_bytes(),
        "Services initialized"
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        resolver,
        pipeline,
    });

    Ok((state, refresh))
}
