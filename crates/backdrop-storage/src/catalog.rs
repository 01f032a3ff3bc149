//! The set of photos currently available for random selection

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

/// Shared, atomically replaceable set of photo filenames.
///
/// Readers take an `Arc` snapshot and never observe a partially updated set.
/// Cloning the catalog shares the same underlying channel.
#[derive(Clone, Debug)]
pub struct PhotoCatalog {
    tx: Arc<watch::Sender<Arc<BTreeSet<String>>>>,
}

impl PhotoCatalog {
    pub fn new(initial: BTreeSet<String>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        PhotoCatalog { tx: Arc::new(tx) }
    }

    /// Catalog holding only the bundled default photo.
    pub fn with_default(default_photo: &str) -> Self {
        Self::new(BTreeSet::from([default_photo.to_string()]))
    }

    pub fn snapshot(&self) -> Arc<BTreeSet<String>> {
        self.tx.borrow().clone()
    }

    /// Swap in a new set in one step.
    pub fn replace(&self, photos: BTreeSet<String>) {
        if photos.is_empty() {
            tracing::warn!("Photo catalog replaced with an empty set");
        }
        let count = photos.len();
        self.tx.send_replace(Arc::new(photos));
        tracing::info!(photos = count, "Photo catalog updated");
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Receive a notification every time the catalog is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Arc<BTreeSet<String>>> {
        self.tx.subscribe()
    }
}
