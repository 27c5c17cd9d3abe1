// Test doubles for the run scheduler.
//
// Three mocks matching the three trait boundaries:
// - MockFetcher (BatchFetcher): scripted per-term responses, records every call
// - MockArchiver (BatchArchiver): keeps batches in memory, same ordering checks as JsonlArchiver
// - MockCursorStore (CursorStore): in-memory term list, counts saves, can fail either side

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use termwatch_archive::check_batch_order;
use termwatch_common::{
    prioritize, CrawlError, ItemId, Result, ResultRecord, RunStamp, TermRecord,
};

use crate::traits::{BatchArchiver, BatchFetcher, CursorStore};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// One recorded `fetch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub term: String,
    pub cursor: Option<String>,
    pub max_count: u32,
}

enum Scripted {
    Batch(Vec<ResultRecord>),
    Fail(String),
}

/// Per-term response queues. Each call pops the next scripted response;
/// a term with nothing queued fails with `FetchFailed`.
/// Builder pattern: `.on_term()`, `.fail_term()`.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_term(self, term: &str, batch: Vec<ResultRecord>) -> Self {
        self.push(term, Scripted::Batch(batch));
        self
    }

    pub fn fail_term(self, term: &str) -> Self {
        self.push(term, Scripted::Fail("429 Too Many Requests".to_string()));
        self
    }

    fn push(&self, term: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .entry(term.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Terms in the order they were fetched.
    pub fn fetched_terms(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.term).collect()
    }
}

#[async_trait]
impl BatchFetcher for MockFetcher {
    async fn fetch(
        &self,
        term: &str,
        cursor: Option<&ItemId>,
        max_count: u32,
    ) -> Result<Vec<ResultRecord>> {
        self.calls.lock().unwrap().push(FetchCall {
            term: term.to_string(),
            cursor: cursor.map(|c| c.as_str().to_string()),
            max_count,
        });

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(term)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Batch(batch)) => Ok(batch),
            Some(Scripted::Fail(cause)) => Err(CrawlError::FetchFailed {
                term: term.to_string(),
                cause,
            }),
            None => Err(CrawlError::FetchFailed {
                term: term.to_string(),
                cause: format!("MockFetcher: no response registered for {term}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MockArchiver
// ---------------------------------------------------------------------------

/// In-memory archiver. Failing terms return `ArchiveWriteFailed`.
#[derive(Default)]
pub struct MockArchiver {
    archived: Mutex<Vec<(String, String, Vec<ResultRecord>)>>,
    failing_terms: Mutex<Vec<String>>,
}

impl MockArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_term(self, term: &str) -> Self {
        self.failing_terms.lock().unwrap().push(term.to_string());
        self
    }

    /// `(term, run stamp, batch)` for every successful non-empty archive.
    pub fn archived(&self) -> Vec<(String, String, Vec<ResultRecord>)> {
        self.archived.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchArchiver for MockArchiver {
    async fn archive(
        &self,
        term: &TermRecord,
        stamp: &RunStamp,
        batch: &[ResultRecord],
    ) -> Result<Option<ItemId>> {
        check_batch_order(&term.term, term.since_id.as_ref(), batch)?;

        let Some(oldest) = batch.last() else {
            return Ok(term.since_id.clone());
        };

        if self.failing_terms.lock().unwrap().contains(&term.term) {
            return Err(CrawlError::ArchiveWriteFailed {
                key: format!("{stamp}_{}", term.term),
                cause: "MockArchiver: injected failure".to_string(),
            });
        }

        self.archived.lock().unwrap().push((
            term.term.clone(),
            stamp.as_str().to_string(),
            batch.to_vec(),
        ));
        Ok(Some(oldest.id.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockCursorStore
// ---------------------------------------------------------------------------

/// In-memory cursor store. `load` returns records in priority order, like the
/// real store; every `save` replaces the contents and is counted.
pub struct MockCursorStore {
    records: Mutex<Vec<TermRecord>>,
    saves: Mutex<usize>,
    fail_load: Mutex<bool>,
    fail_save: Mutex<bool>,
}

impl MockCursorStore {
    pub fn new(records: Vec<TermRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: Mutex::new(0),
            fail_load: Mutex::new(false),
            fail_save: Mutex::new(false),
        }
    }

    pub fn fail_load(self) -> Self {
        *self.fail_load.lock().unwrap() = true;
        self
    }

    pub fn fail_save(self) -> Self {
        *self.fail_save.lock().unwrap() = true;
        self
    }

    /// Current stored records, in stored (not priority) order.
    pub fn records(&self) -> Vec<TermRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn record(&self, term: &str) -> Option<TermRecord> {
        self.records().into_iter().find(|r| r.term == term)
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl CursorStore for MockCursorStore {
    async fn load(&self) -> Result<Vec<TermRecord>> {
        if *self.fail_load.lock().unwrap() {
            return Err(CrawlError::StoreUnavailable(
                "MockCursorStore: injected load failure".to_string(),
            ));
        }
        let mut records = self.records();
        prioritize(&mut records);
        Ok(records)
    }

    async fn save(&self, records: &[TermRecord]) -> Result<()> {
        if *self.fail_save.lock().unwrap() {
            return Err(CrawlError::StoreUnavailable(
                "MockCursorStore: injected save failure".to_string(),
            ));
        }
        *self.records.lock().unwrap() = records.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
