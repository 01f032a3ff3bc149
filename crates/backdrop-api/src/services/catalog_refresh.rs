//! Background refresh of the photo catalog
//!
//! At startup the catalog only holds the bundled default photo. The refresh
//! job downloads the configured photo set into the photo directory, then
//! swaps the catalog for whatever `.jpg` files are actually on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use backdrop_core::PhotoName;
use backdrop_storage::{LocalPhotoStore, PhotoCatalog};
use futures::{stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

/// Placeholder replaced by the photo id in a download URL template
pub const PHOTO_ID_PLACEHOLDER: &str = "{id}";

/// Outcome of one download batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Photos that had to be downloaded
    pub attempted: usize,
    pub downloaded: usize,
    /// Photos already present on disk
    pub skipped: usize,
}

/// Fills a directory with photos.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    async fn fetch(&self, dir: &Path) -> Result<FetchSummary>;
}

/// Downloads the photos listed in a JSON manifest (an array of photo ids).
pub struct ManifestPhotoFetcher {
    client: reqwest::Client,
    manifest_path: PathBuf,
    url_template: String,
    concurrency: usize,
}

impl ManifestPhotoFetcher {
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        url_template: impl Into<String>,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let url_template = url_template.into();
        if !url_template.contains(PHOTO_ID_PLACEHOLDER) {
            anyhow::bail!(
                "Photo download URL template must contain {}",
                PHOTO_ID_PLACEHOLDER
            );
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for photo downloads")?;

        Ok(ManifestPhotoFetcher {
            client,
            manifest_path: manifest_path.into(),
            url_template,
            concurrency: concurrency.max(1),
        })
    }

    /// Read the manifest. Ids that do not make a valid photo name are skipped.
    async fn read_manifest(&self) -> Result<Vec<(String, PhotoName)>> {
        let raw = tokio::fs::read(&self.manifest_path)
            .await
            .with_context(|| format!("Failed to read manifest {}", self.manifest_path.display()))?;
        let ids: Vec<String> =
            serde_json::from_slice(&raw).context("Manifest must be a JSON array of photo ids")?;

        Ok(ids
            .into_iter()
            .filter_map(|id| match PhotoName::from_id(&id) {
                Ok(name) => Some((id, name)),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Skipping invalid photo id");
                    None
                }
            })
            .collect())
    }

    fn download_url(&self, id: &str) -> String {
        self.url_template.replace(PHOTO_ID_PLACEHOLDER, id)
    }

    /// Stream one photo to `<dest>.part`, then rename it into place.
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let part = part_path(dest);
        let result = self.download_to(url, &part).await;
        match result {
            Ok(()) => tokio::fs::rename(&part, dest)
                .await
                .with_context(|| format!("Failed to move {} into place", part.display())),
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn download_to(&self, url: &str, path: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Request failed")?
            .error_for_status()
            .context("Download rejected")?;

        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk.context("Download interrupted")?).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

#[async_trait]
impl PhotoFetcher for ManifestPhotoFetcher {
    async fn fetch(&self, dir: &Path) -> Result<FetchSummary> {
        let photos = self.read_manifest().await?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create photo directory {}", dir.display()))?;

        let mut missing = Vec::new();
        let mut skipped = 0;
        for (id, name) in photos {
            let dest = dir.join(name.as_str());
            if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
                skipped += 1;
            } else {
                missing.push((id, name, dest));
            }
        }

        let attempted = missing.len();
        tracing::info!(attempted, skipped, "Downloading photos");

        let results: Vec<bool> = stream::iter(missing)
            .map(|(id, name, dest)| async move {
                let url = self.download_url(&id);
                match self.download(&url, &dest).await {
                    Ok(()) => {
                        tracing::debug!(photo = %name, "Photo downloaded");
                        true
                    }
                    Err(e) => {
                        let error = format!("{:#}", e);
                        tracing::warn!(photo = %name, url = %url, error = %error, "Photo download failed");
                        false
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let downloaded = results.into_iter().filter(|ok| *ok).count();
        if attempted > 0 && downloaded == 0 {
            anyhow::bail!("All {} photo downloads failed", attempted);
        }

        Ok(FetchSummary {
            attempted,
            downloaded,
            skipped,
        })
    }
}

/// Downloads photos (when a fetcher is configured) and repopulates the catalog.
pub struct CatalogRefreshJob {
    store: LocalPhotoStore,
    catalog: PhotoCatalog,
    fetcher: Option<Arc<dyn PhotoFetcher>>,
}

impl CatalogRefreshJob {
    pub fn new(
        store: LocalPhotoStore,
        catalog: PhotoCatalog,
        fetcher: Option<Arc<dyn PhotoFetcher>>,
    ) -> Self {
        CatalogRefreshJob {
            store,
            catalog,
            fetcher,
        }
    }

    /// Run once. On any failure the catalog keeps its current contents.
    ///
    /// Returns the size of the new catalog.
    pub async fn run(&self) -> Result<usize> {
        if let Some(fetcher) = &self.fetcher {
            let summary = fetcher
                .fetch(self.store.base_path())
                .await
                .context("Photo download failed")?;
            tracing::info!(
                attempted = summary.attempted,
                downloaded = summary.downloaded,
                skipped = summary.skipped,
                "Photo download finished"
            );
        }

        let photos = self
            .store
            .list_photos()
            .await
            .context("Failed to list photo directory")?;
        if photos.is_empty() {
            anyhow::bail!("Photo directory has no photos");
        }

        let count = photos.len();
        self.catalog.replace(photos);
        Ok(count)
    }

    /// Run in the background. Never blocks startup.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = Instant::now();
            match self.run().await {
                Ok(photos) => tracing::info!(
                    photos,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Photo catalog refreshed"
                ),
                Err(e) => {
                    let error = format!("{:#}", e);
                    tracing::warn!(
                        error = %error,
                        "Photo catalog refresh failed, keeping current catalog"
                    );
                }
            }
        })
    }
}
