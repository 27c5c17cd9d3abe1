// Google Cloud Storage backend over the XML API.
// Single-request uploads replace the object atomically.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{Result, StorageError};
use crate::object_store::ObjectStore;

const BASE_URL: &str = "https://storage.googleapis.com";

pub struct GcsObjectStore {
    client: reqwest::Client,
    bucket: String,
    token: String,
    base_url: String,
}

impl GcsObjectStore {
    pub fn new(bucket: &str, token: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            bucket: bucket.to_string(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point at a different endpoint (emulators, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn object_url(&self, key: &str) -> Result<Url> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StorageError::InvalidKey(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidKey(format!("cannot-be-a-base: {}", self.base_url)))?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(key)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        debug!(key, bytes = bytes.len(), "gcs: downloaded object");
        Ok(bytes.to_vec())
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.object_url(key)?;
        let len = body.len();
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!(key, bytes = len, "gcs: uploaded object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_keeps_prefix_slashes_and_escapes_the_rest() {
        let store = GcsObjectStore::new("tweets", "t".to_string());
        let url = store
            .object_url("archive/2024-03-05_14-07-09_rust lang.jsonl")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/tweets/archive/2024-03-05_14-07-09_rust%20lang.jsonl"
        );
    }

    #[test]
    fn object_url_rejects_empty_key() {
        let store = GcsObjectStore::new("tweets", "t".to_string());
        assert!(matches!(
            store.object_url(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn base_url_override() {
        let store = GcsObjectStore::new("b", "t".to_string()).with_base_url("http://localhost:4443/");
        assert_eq!(
            store.object_url("terms.json").unwrap().as_str(),
            "http://localhost:4443/b/terms.json"
        );
    }
}
