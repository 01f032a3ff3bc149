use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use backdrop_core::constants::PHOTO_EXTENSION;
use backdrop_core::PhotoName;
use futures::{stream, TryStreamExt};
use tokio::fs;
use tokio_util::io::ReaderStream;

use crate::stream::{ByteStream, SourceError, SourceResult};

/// The managed photo directory on the local filesystem
#[derive(Clone, Debug)]
pub struct LocalPhotoStore {
    base_path: Arc<PathBuf>,
}

impl LocalPhotoStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> SourceResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            SourceError::ConfigError(format!(
                "Failed to create photo directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_path = fs::canonicalize(&base_path).await.map_err(|e| {
            SourceError::ConfigError(format!(
                "Failed to canonicalize photo directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalPhotoStore {
            base_path: Arc::new(base_path),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path a photo would live at. Does not touch the filesystem.
    pub fn photo_path(&self, name: &PhotoName) -> PathBuf {
        self.base_path.join(name.as_str())
    }

    /// Resolve a photo name to an existing file inside the photo directory.
    ///
    /// `PhotoName` already rules out separators and `..`; the canonical path
    /// check also catches symlinks pointing outside the directory.
    async fn key_to_path(&self, name: &PhotoName) -> SourceResult<PathBuf> {
        let path = self.photo_path(name);

        let canonical = fs::canonicalize(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound(name.to_string()),
            _ => SourceError::ReadFailed(format!("Failed to resolve {}: {}", path.display(), e)),
        })?;

        if canonical.strip_prefix(self.base_path.as_path()).is_err() {
            return Err(SourceError::InvalidKey(
                "Photo resolves outside photo directory".to_string(),
            ));
        }

        Ok(canonical)
    }

    /// Whether a regular file for this photo is present.
    pub async fn exists(&self, name: &PhotoName) -> bool {
        match self.key_to_path(name).await {
            Ok(path) => fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Lazily open a photo as a chunked byte stream.
    pub fn open_stream(&self, name: &PhotoName) -> ByteStream {
        let store = self.clone();
        let name = name.clone();

        let open = async move {
            let path = store.key_to_path(&name).await?;
            let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SourceError::NotFound(name.to_string()),
                _ => SourceError::ReadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )),
            })?;

            tracing::debug!(photo = %name, path = %path.display(), "Opened local photo");

            let chunks = ReaderStream::new(file).map_err(move |e| {
                tracing::error!(photo = %name, error = %e, "Local photo read error");
                SourceError::ReadFailed(format!("Failed to read chunk: {}", e))
            });

            Ok::<_, SourceError>(chunks)
        };

        Box::pin(stream::once(open).try_flatten())
    }

    /// List the `.jpg` files currently on disk whose names are valid photo names.
    ///
    /// In-progress downloads (`*.jpg.part`) and anything that is not a regular
    /// file are skipped.
    pub async fn list_photos(&self) -> SourceResult<BTreeSet<String>> {
        let mut entries = fs::read_dir(self.base_path.as_path()).await.map_err(|e| {
            SourceError::ReadFailed(format!(
                "Failed to read photo directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut photos = BTreeSet::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::ReadFailed(format!("Failed to read directory entry: {}", e)))?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            let has_extension = Path::new(file_name)
                .extension()
                .is_some_and(|ext| ext == PHOTO_EXTENSION);
            if !has_extension {
                continue;
            }

            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }

            match PhotoName::parse(file_name) {
                Ok(name) => {
                    photos.insert(name.into_string());
                }
                Err(e) => {
                    tracing::debug!(file = %file_name, error = %e, "Skipping unservable file");
                }
            }
        }

        Ok(photos)
    }
}
