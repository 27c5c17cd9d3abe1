// Object storage boundary shared by the cursor store and the archiver.
// Upload/download only; everything above this layer is backend-agnostic.

use std::sync::Arc;

use async_trait::async_trait;
use termwatch_common::{Config, CrawlError, StorageBackend};

use crate::backends::{GcsObjectStore, LocalObjectStore};
use crate::error::Result;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download a whole object. Missing objects are `StorageError::NotFound`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Upload a whole object, replacing any existing one. Readers see either
    /// the previous object or the new one, never a partial write.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Build the configured backend.
pub fn store_from_config(config: &Config) -> termwatch_common::Result<Arc<dyn ObjectStore>> {
    match &config.storage_backend {
        StorageBackend::Gcs => {
            let token = config.storage_credentials.clone().ok_or_else(|| {
                CrawlError::Config("STORAGE_TOKEN is required for the gcs backend".to_string())
            })?;
            Ok(Arc::new(GcsObjectStore::new(&config.storage_bucket, token)))
        }
        StorageBackend::Local { root } => Ok(Arc::new(LocalObjectStore::new(
            root.join(&config.storage_bucket),
        ))),
    }
}
