// Trait abstractions for the run scheduler's collaborators.
//
// BatchFetcher: one search call per term (search API behind it).
// BatchArchiver: persist a batch, hand back the cursor it implies.
// CursorStore: read the term list once, write it back once.
//
// The scheduler only sees these traits, so the whole cycle runs against
// in-memory doubles in tests: no network, no bucket.

use async_trait::async_trait;

use termwatch_archive::{JsonlArchiver, ObjectCursorStore};
use termwatch_common::{ItemId, Result, ResultRecord, RunStamp, TermRecord};

// ---------------------------------------------------------------------------
// BatchFetcher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BatchFetcher: Send + Sync {
    /// Fetch up to `max_count` results for `term` newer than `cursor`, newest first.
    /// `cursor = None` means no lower bound. Failures are `FetchFailed`; no retries.
    async fn fetch(
        &self,
        term: &str,
        cursor: Option<&ItemId>,
        max_count: u32,
    ) -> Result<Vec<ResultRecord>>;
}

// ---------------------------------------------------------------------------
// BatchArchiver
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BatchArchiver: Send + Sync {
    /// Persist `batch` and return the term's next cursor. Never returns a
    /// cursor for data that was not durably written.
    async fn archive(
        &self,
        term: &TermRecord,
        stamp: &RunStamp,
        batch: &[ResultRecord],
    ) -> Result<Option<ItemId>>;
}

#[async_trait]
impl BatchArchiver for JsonlArchiver {
    async fn archive(
        &self,
        term: &TermRecord,
        stamp: &RunStamp,
        batch: &[ResultRecord],
    ) -> Result<Option<ItemId>> {
        JsonlArchiver::archive(self, term, stamp, batch).await
    }
}

// ---------------------------------------------------------------------------
// CursorStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CursorStore: Send + Sync {
    /// All term records in processing order.
    async fn load(&self) -> Result<Vec<TermRecord>>;

    /// Replace the stored term list.
    async fn save(&self, records: &[TermRecord]) -> Result<()>;
}

#[async_trait]
impl CursorStore for ObjectCursorStore {
    async fn load(&self) -> Result<Vec<TermRecord>> {
        ObjectCursorStore::load(self).await
    }

    async fn save(&self, records: &[TermRecord]) -> Result<()> {
        ObjectCursorStore::save(self, records).await
    }
}
