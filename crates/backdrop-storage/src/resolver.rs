//! Turn a [`SourceRequest`] into a byte stream

use backdrop_core::{PhotoName, SourceRequest};
use bytes::Bytes;
use futures::stream;
use rand::seq::IteratorRandom;

use crate::catalog::PhotoCatalog;
use crate::local::LocalPhotoStore;
use crate::remote::RemoteFetcher;
use crate::stream::{ByteStream, SourceError};

#[derive(Clone, Debug)]
pub struct SourceResolver {
    store: LocalPhotoStore,
    remote: RemoteFetcher,
    catalog: PhotoCatalog,
    default_photo: PhotoName,
}

impl SourceResolver {
    pub fn new(
        store: LocalPhotoStore,
        remote: RemoteFetcher,
        catalog: PhotoCatalog,
        default_photo: PhotoName,
    ) -> Self {
        SourceResolver {
            store,
            remote,
            catalog,
            default_photo,
        }
    }

    pub fn catalog(&self) -> &PhotoCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &LocalPhotoStore {
        &self.store
    }

    /// Build the stream for a request. No I/O happens until it is polled.
    pub fn resolve(&self, request: &SourceRequest) -> ByteStream {
        match request {
            SourceRequest::Named(name) => self.store.open_stream(name),
            SourceRequest::Random => match self.pick_random() {
                Ok(name) => {
                    tracing::debug!(photo = %name, "Selected random photo");
                    self.store.open_stream(&name)
                }
                Err(e) => Box::pin(stream::once(async move { Err::<Bytes, _>(e) })),
            },
            SourceRequest::Remote(url) => self.remote.fetch_stream(url),
            SourceRequest::Default => self.store.open_stream(&self.default_photo),
        }
    }

    /// Pick one photo uniformly from the current catalog snapshot.
    fn pick_random(&self) -> Result<PhotoName, SourceError> {
        let snapshot = self.catalog.snapshot();
        let chosen = snapshot
            .iter()
            .choose(&mut rand::rng())
            .ok_or_else(|| SourceError::NotFound("photo catalog is empty".to_string()))?;

        PhotoName::parse(chosen).map_err(|e| SourceError::InvalidKey(e.to_string()))
    }
}
