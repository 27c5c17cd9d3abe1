// Batch archiver: one NDJSON object per (term, run), and the cursor derived from it.
//
// Cursor derivation relies on the search API returning results newest first.
// That ordering is checked here before anything is written; a batch that breaks
// it is rejected rather than repaired.

use std::sync::Arc;

use termwatch_common::{CrawlError, ItemId, Result, ResultRecord, RunStamp, TermRecord};
use tracing::{debug, info};

use crate::keys::archive_key;
use crate::object_store::ObjectStore;

const NDJSON: &str = "application/x-ndjson";

pub struct JsonlArchiver {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl JsonlArchiver {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Persist `batch` for `term` and return the cursor the term should move to.
    ///
    /// An empty batch writes nothing and returns the term's current cursor.
    /// Otherwise the returned cursor is the id of the last (oldest) record, and it
    /// is only returned once the archive unit is durably stored.
    pub async fn archive(
        &self,
        term: &TermRecord,
        stamp: &RunStamp,
        batch: &[ResultRecord],
    ) -> Result<Option<ItemId>> {
        check_batch_order(&term.term, term.since_id.as_ref(), batch)?;

        let Some(oldest) = batch.last() else {
            debug!(term = %term.term, "Nothing new, cursor unchanged");
            return Ok(term.since_id.clone());
        };

        let key = archive_key(&self.prefix, stamp, &term.term);
        let body = encode_ndjson(batch).map_err(|e| CrawlError::ArchiveWriteFailed {
            key: key.clone(),
            cause: e.to_string(),
        })?;

        self.store
            .put(&key, body, NDJSON)
            .await
            .map_err(|e| CrawlError::ArchiveWriteFailed {
                key: key.clone(),
                cause: e.to_string(),
            })?;

        info!(term = %term.term, count = batch.len(), key = %key, "Archived results");
        Ok(Some(oldest.id.clone()))
    }
}

/// Check the newest-first precondition: ids strictly descending, and every id
/// newer than the term's current cursor.
pub fn check_batch_order(term: &str, cursor: Option<&ItemId>, batch: &[ResultRecord]) -> Result<()> {
    for (i, pair) in batch.windows(2).enumerate() {
        if pair[1].id >= pair[0].id {
            return Err(CrawlError::UnorderedBatch {
                term: term.to_string(),
                detail: format!(
                    "id {} at position {} is not older than id {} at position {}",
                    pair[1].id,
                    i + 1,
                    pair[0].id,
                    i
                ),
            });
        }
    }

    if let (Some(cursor), Some(oldest)) = (cursor, batch.last()) {
        if oldest.id <= *cursor {
            return Err(CrawlError::UnorderedBatch {
                term: term.to_string(),
                detail: format!("oldest id {} is not newer than cursor {}", oldest.id, cursor),
            });
        }
    }

    Ok(())
}

fn encode_ndjson(batch: &[ResultRecord]) -> serde_json::Result<Vec<u8>> {
    let mut body = Vec::new();
    for record in batch {
        serde_json::to_writer(&mut body, record)?;
        body.push(b'\n');
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryObjectStore;
    use chrono::{TimeZone, Utc};

    fn stamp() -> RunStamp {
        RunStamp::at(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap())
    }

    fn batch(ids: &[&str]) -> Vec<ResultRecord> {
        ids.iter()
            .map(|id| ResultRecord::new(*id).with_field("text", format!("tweet {id}")))
            .collect()
    }

    fn archiver() -> (Arc<MemoryObjectStore>, JsonlArchiver) {
        let objects = Arc::new(MemoryObjectStore::new());
        (objects.clone(), JsonlArchiver::new(objects, ""))
    }

    #[tokio::test]
    async fn cursor_moves_to_oldest_record() {
        let (objects, archiver) = archiver();
        let term = TermRecord::new("a").with_since_id("100");

        let cursor = archiver
            .archive(&term, &stamp(), &batch(&["150", "140", "130"]))
            .await
            .unwrap();

        assert_eq!(cursor, Some(ItemId::from("130")));
        let lines = objects.lines("2024-03-05_14-07-09_a.jsonl");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"id":"150","text":"tweet 150"}"#);
        assert_eq!(lines[2], r#"{"id":"130","text":"tweet 130"}"#);
    }

    #[tokio::test]
    async fn first_search_has_no_lower_bound() {
        let (_, archiver) = archiver();
        let cursor = archiver
            .archive(&TermRecord::new("a"), &stamp(), &batch(&["9", "3"]))
            .await
            .unwrap();
        assert_eq!(cursor, Some(ItemId::from("3")));
    }

    #[tokio::test]
    async fn empty_batch_keeps_cursor_and_writes_nothing() {
        let (objects, archiver) = archiver();
        let term = TermRecord::new("a").with_since_id("100");

        let cursor = archiver.archive(&term, &stamp(), &[]).await.unwrap();

        assert_eq!(cursor, Some(ItemId::from("100")));
        assert!(objects.keys().is_empty());
    }

    #[tokio::test]
    async fn ascending_batch_is_rejected_before_writing() {
        let (objects, archiver) = archiver();
        let term = TermRecord::new("a").with_since_id("100");

        let err = archiver
            .archive(&term, &stamp(), &batch(&["130", "140", "150"]))
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::UnorderedBatch { .. }));
        assert!(objects.keys().is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = check_batch_order("a", None, &batch(&["150", "150"])).unwrap_err();
        assert!(matches!(err, CrawlError::UnorderedBatch { .. }));
    }

    #[test]
    fn records_at_or_below_cursor_are_rejected() {
        let cursor = ItemId::from("140");
        assert!(check_batch_order("a", Some(&cursor), &batch(&["150", "140"])).is_err());
        assert!(check_batch_order("a", Some(&cursor), &batch(&["150", "141"])).is_ok());
    }

    #[test]
    fn ordering_is_numeric_not_lexicographic() {
        assert!(check_batch_order("a", Some(&ItemId::from("98")), &batch(&["1000", "99"])).is_ok());
    }

    #[test]
    fn mixed_numeric_and_textual_ids_must_still_descend() {
        let err = check_batch_order("a", None, &batch(&["1a", "10", "9"])).unwrap_err();
        assert!(matches!(err, CrawlError::UnorderedBatch { .. }));
        assert!(check_batch_order("a", None, &batch(&["9", "10", "1a"])).is_err());
        assert!(check_batch_order("a", None, &batch(&["1b", "1a", "10", "9"])).is_ok());
    }

    #[tokio::test]
    async fn failed_upload_does_not_return_a_cursor() {
        let (objects, archiver) = archiver();
        objects.fail_puts_with_prefix("");
        let term = TermRecord::new("a").with_since_id("100");

        let err = archiver
            .archive(&term, &stamp(), &batch(&["150"]))
            .await
            .unwrap_err();

        match err {
            CrawlError::ArchiveWriteFailed { key, .. } => {
                assert_eq!(key, "2024-03-05_14-07-09_a.jsonl")
            }
            other => panic!("expected ArchiveWriteFailed, got {other:?}"),
        }
    }
}
