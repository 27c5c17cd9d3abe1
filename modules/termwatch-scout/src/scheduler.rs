use std::sync::Arc;

use tracing::{debug, error, info, warn};

use termwatch_common::{CrawlError, ItemId, Result, RunStamp, TermRecord};

use crate::fetcher::MAX_RESULTS_PER_REQUEST;
use crate::stats::{RunStats, StopInfo};
use crate::traits::{BatchArchiver, BatchFetcher, CursorStore};

/// Where a cycle is. `Processing` carries the index of the term in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Loading,
    Processing(usize),
    Saving,
    Done,
}

/// Result of searching one term. The scheduler inspects it to decide between
/// moving to the next term and going straight to `Saving`.
#[derive(Debug)]
pub enum TermOutcome {
    /// Results were archived; the term moves to `cursor`.
    Advanced { archived: usize, cursor: Option<ItemId> },
    /// The search succeeded with nothing new; the cursor stays at `cursor`.
    NothingNew { cursor: Option<ItemId> },
    /// Fetch or archive failed. The term stays as loaded and the cycle stops.
    Stop(CrawlError),
}

/// Runs one collection cycle: load cursors, search terms in priority order,
/// archive each batch, and write the cursors back exactly once.
///
/// The first fetch or archive failure ends the cycle. Failures from the search API
/// (rate limits, expired auth) usually affect every term, so the remaining terms
/// keep their priority and go first next cycle.
pub struct RunScheduler {
    store: Arc<dyn CursorStore>,
    fetcher: Arc<dyn BatchFetcher>,
    archiver: Arc<dyn BatchArchiver>,
    max_results: u32,
}

impl RunScheduler {
    pub fn new(
        store: Arc<dyn CursorStore>,
        fetcher: Arc<dyn BatchFetcher>,
        archiver: Arc<dyn BatchArchiver>,
    ) -> Self {
        Self {
            store,
            fetcher,
            archiver,
            max_results: MAX_RESULTS_PER_REQUEST,
        }
    }

    /// Request fewer than the API maximum per term. Values above it are capped.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.min(MAX_RESULTS_PER_REQUEST);
        self
    }

    /// Run one cycle stamped with the current time.
    pub async fn run(&self) -> Result<RunStats> {
        self.run_at(RunStamp::now()).await
    }

    /// Run one cycle stamped with `stamp`.
    ///
    /// Errors only when loading or saving the cursor store fails. Per-term
    /// failures end the cycle early and are reported in the returned stats.
    pub async fn run_at(&self, stamp: RunStamp) -> Result<RunStats> {
        let mut phase = RunPhase::Idle;
        let mut stats = RunStats::new(stamp.as_str());

        advance(&mut phase, RunPhase::Loading);
        let mut terms = self.store.load().await.map_err(|e| {
            error!(error = %e, "Could not load term cursors, aborting run");
            e
        })?;
        stats.terms_loaded = terms.len();

        let names: Vec<&str> = terms.iter().map(|t| t.term.as_str()).collect();
        info!(run = %stamp, "{} terms to search: {}", names.len(), names.join(", "));

        for i in 0..terms.len() {
            advance(&mut phase, RunPhase::Processing(i));
            stats.terms_attempted += 1;

            match self.process_term(&terms[i], &stamp).await {
                TermOutcome::Advanced { archived, cursor } => {
                    terms[i].record_search(&stamp, cursor);
                    stats.terms_advanced += 1;
                    stats.results_archived += archived;
                }
                TermOutcome::NothingNew { cursor } => {
                    terms[i].record_search(&stamp, cursor);
                    stats.terms_unchanged += 1;
                }
                TermOutcome::Stop(e) => {
                    warn!(
                        term = %terms[i].term,
                        kind = e.kind(),
                        error = %e,
                        "Stopping run, saving cursors collected so far"
                    );
                    stats.stopped = Some(StopInfo {
                        term: terms[i].term.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        advance(&mut phase, RunPhase::Saving);
        self.store.save(&terms).await.map_err(|e| {
            error!(error = %e, "Could not save term cursors, this run's progress is lost");
            e
        })?;

        advance(&mut phase, RunPhase::Done);
        info!("Run complete. {stats}");
        Ok(stats)
    }

    /// Fetch and archive one term. Never mutates the term.
    pub async fn process_term(&self, term: &TermRecord, stamp: &RunStamp) -> TermOutcome {
        info!(term = %term.term, since_id = ?term.since_id.as_ref().map(ItemId::as_str), "Searching for term");

        let batch = match self
            .fetcher
            .fetch(&term.term, term.since_id.as_ref(), self.max_results)
            .await
        {
            Ok(batch) => batch,
            Err(e) => return TermOutcome::Stop(e),
        };

        match self.archiver.archive(term, stamp, &batch).await {
            Ok(cursor) if batch.is_empty() => TermOutcome::NothingNew { cursor },
            Ok(cursor) => TermOutcome::Advanced {
                archived: batch.len(),
                cursor,
            },
            Err(e) => TermOutcome::Stop(e),
        }
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    debug!(from = ?phase, to = ?next, "Run phase");
    *phase = next;
}
