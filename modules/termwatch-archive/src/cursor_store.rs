// Cursor store: the whole term list as one JSON document in object storage.
// Read once at run start, overwritten once at run end.

use std::collections::HashSet;
use std::sync::Arc;

use termwatch_common::{prioritize, CrawlError, Result, TermRecord};
use tracing::info;

use crate::object_store::ObjectStore;

pub struct ObjectCursorStore {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl ObjectCursorStore {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read every term record, in processing order.
    ///
    /// A missing document counts as unavailable: the term list is owned by an
    /// external editor, and running against an empty list would hide a
    /// misconfigured bucket or key.
    pub async fn load(&self) -> Result<Vec<TermRecord>> {
        let bytes = self
            .store
            .get(&self.key)
            .await
            .map_err(|e| CrawlError::StoreUnavailable(format!("read {}: {e}", self.key)))?;

        let mut records = parse_terms(&bytes)
            .map_err(|e| CrawlError::StoreUnavailable(format!("parse {}: {e}", self.key)))?;

        prioritize(&mut records);
        info!(key = %self.key, count = records.len(), "Loaded term cursors");
        Ok(records)
    }

    /// Replace the stored document with `records`.
    pub async fn save(&self, records: &[TermRecord]) -> Result<()> {
        let body = serde_json::to_vec(records)
            .map_err(|e| CrawlError::StoreUnavailable(format!("encode {}: {e}", self.key)))?;

        self.store
            .put(&self.key, body, "application/json")
            .await
            .map_err(|e| CrawlError::StoreUnavailable(format!("write {}: {e}", self.key)))?;

        info!(key = %self.key, count = records.len(), "Updated term cursors");
        Ok(())
    }
}

fn parse_terms(bytes: &[u8]) -> std::result::Result<Vec<TermRecord>, String> {
    let records: Vec<TermRecord> = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

    let mut seen = HashSet::new();
    for record in &records {
        if !seen.insert(record.term.as_str()) {
            return Err(format!("duplicate term '{}'", record.term));
        }
    }
    Ok(records)
}
