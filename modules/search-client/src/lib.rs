pub mod error;
pub mod types;

pub use error::{Result, SearchError};
pub use types::{PublicMetrics, SearchMeta, SearchPage, SearchQuery, Tweet, MAX_RESULTS};

use std::time::Duration;

use types::SearchResponse;

const BASE_URL: &str = "https://api.twitter.com/2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

pub struct SearchClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl SearchClient {
    pub fn new(token: String) -> Self {
        Self {
            client: http_client(REQUEST_TIMEOUT),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request deadline. A request that exceeds it fails with
    /// `SearchError::Network`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    /// Run one recent-search request. Results come back newest first.
    /// No retries here; callers decide what a failure means.
    pub async fn search_recent(&self, query: &SearchQuery) -> Result<SearchPage> {
        tracing::debug!(
            query = %query.query,
            max_results = query.max_results,
            since_id = ?query.since_id,
            "Recent search"
        );

        let url = format!("{}/tweets/search/recent", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query.to_params())
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let reset = resp
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok());
            return Err(SearchError::RateLimited { reset });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)?;
        tracing::debug!(count = parsed.data.len(), "Recent search complete");

        Ok(SearchPage {
            tweets: parsed.data,
            meta: parsed.meta,
        })
    }
}
