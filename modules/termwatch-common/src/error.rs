use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// The cursor store could not be read, parsed, or written.
    #[error("Cursor store unavailable: {0}")]
    StoreUnavailable(String),

    /// The search collaborator failed (transport, auth, rate limit).
    #[error("Fetch failed for term '{term}': {cause}")]
    FetchFailed { term: String, cause: String },

    /// An archive unit could not be persisted.
    #[error("Archive write failed for {key}: {cause}")]
    ArchiveWriteFailed { key: String, cause: String },

    /// A fetched batch broke the newest-first ordering the cursor depends on.
    #[error("Batch for term '{term}' is out of order: {detail}")]
    UnorderedBatch { term: String, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CrawlError {
    /// Short machine-friendly label, used in logs and run stats.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::ArchiveWriteFailed { .. } => "archive_write_failed",
            Self::UnorderedBatch { .. } => "unordered_batch",
            Self::Config(_) => "config",
        }
    }
}
