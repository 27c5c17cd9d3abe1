// Search fetcher: wraps SearchClient, returns ResultRecords.
// Always asks for a full page so a lagging term catches up in as few cycles as possible.

use async_trait::async_trait;
use search_client::{SearchClient, SearchQuery, Tweet};
use termwatch_common::{CrawlError, ItemId, Result, ResultRecord};
use tracing::info;

use crate::traits::BatchFetcher;

/// Hard maximum page size of the search API.
pub const MAX_RESULTS_PER_REQUEST: u32 = search_client::MAX_RESULTS;

pub struct SearchFetcher {
    client: SearchClient,
    lang: Option<String>,
}

impl SearchFetcher {
    pub fn new(client: SearchClient, lang: Option<String>) -> Self {
        Self { client, lang }
    }
}

#[async_trait]
impl BatchFetcher for SearchFetcher {
    async fn fetch(
        &self,
        term: &str,
        cursor: Option<&ItemId>,
        max_count: u32,
    ) -> Result<Vec<ResultRecord>> {
        let query = SearchQuery::new(term, max_count.min(MAX_RESULTS_PER_REQUEST))
            .since_id(cursor.map(|c| c.as_str().to_string()))
            .lang(self.lang.clone());

        let page = self
            .client
            .search_recent(&query)
            .await
            .map_err(|e| CrawlError::FetchFailed {
                term: term.to_string(),
                cause: e.to_string(),
            })?;

        let records = page
            .tweets
            .into_iter()
            .map(|t| tweet_to_record(term, t))
            .collect::<Result<Vec<_>>>()?;

        info!(term, count = records.len(), "search: fetched results");
        Ok(records)
    }
}

/// Flatten a tweet into a result record, keeping every field the API sent.
fn tweet_to_record(term: &str, tweet: Tweet) -> Result<ResultRecord> {
    let value = serde_json::to_value(&tweet).map_err(|e| CrawlError::FetchFailed {
        term: term.to_string(),
        cause: format!("re-encode tweet {}: {e}", tweet.id),
    })?;

    ResultRecord::from_value(value).ok_or_else(|| CrawlError::FetchFailed {
        term: term.to_string(),
        cause: format!("tweet {} has no usable id", tweet.id),
    })
}
