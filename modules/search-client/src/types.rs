use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest page size the recent-search endpoint accepts.
pub const MIN_RESULTS: u32 = 10;

/// Hard maximum page size of the recent-search endpoint.
pub const MAX_RESULTS: u32 = 100;

/// Tweet fields requested on every search. Everything returned is archived as-is.
pub const TWEET_FIELDS: &str = "created_at,author_id,lang,conversation_id,public_metrics";

/// One recent-search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: u32,
    /// Only return tweets with an id greater than this one.
    pub since_id: Option<String>,
    /// Restrict to a language via the `lang:` operator.
    pub lang: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: query.into(),
            max_results,
            since_id: None,
            lang: None,
        }
    }

    pub fn since_id(mut self, since_id: Option<String>) -> Self {
        self.since_id = since_id;
        self
    }

    pub fn lang(mut self, lang: Option<String>) -> Self {
        self.lang = lang.filter(|l| !l.is_empty());
        self
    }

    /// Query-string pairs for the request, with `max_results` clamped to the API window.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let query = match &self.lang {
            Some(lang) => format!("{} lang:{}", self.query, lang),
            None => self.query.clone(),
        };

        let mut params = vec![
            ("query", query),
            (
                "max_results",
                self.max_results.clamp(MIN_RESULTS, MAX_RESULTS).to_string(),
            ),
            ("tweet.fields", TWEET_FIELDS.to_string()),
        ];
        if let Some(since_id) = &self.since_id {
            params.push(("since_id", since_id.clone()));
        }
        params
    }
}

/// Public engagement counters nested inside a Tweet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub quote_count: i64,
}

/// A single tweet from a search response.
/// Unrequested or newly added fields are kept in `extra` so nothing is lost on archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<PublicMetrics>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Paging metadata returned alongside results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchMeta {
    #[serde(default)]
    pub result_count: u32,
    pub newest_id: Option<String>,
    pub oldest_id: Option<String>,
    pub next_token: Option<String>,
}

/// Raw response body. `data` is omitted by the API when nothing matched.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Tweet>,
    #[serde(default)]
    pub meta: SearchMeta,
}

/// One page of results, newest first.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub tweets: Vec<Tweet>,
    pub meta: SearchMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_clamp_page_size() {
        let high = SearchQuery::new("rust", 500).to_params();
        assert!(high.contains(&("max_results", "100".to_string())));

        let low = SearchQuery::new("rust", 1).to_params();
        assert!(low.contains(&("max_results", "10".to_string())));
    }

    #[test]
    fn params_include_since_id_and_lang() {
        let params = SearchQuery::new("open source", 100)
            .since_id(Some("1700".to_string()))
            .lang(Some("en".to_string()))
            .to_params();

        assert!(params.contains(&("query", "open source lang:en".to_string())));
        assert!(params.contains(&("since_id", "1700".to_string())));
    }

    #[test]
    fn empty_lang_is_ignored() {
        let params = SearchQuery::new("rust", 100)
            .lang(Some(String::new()))
            .to_params();
        assert!(params.contains(&("query", "rust".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "since_id"));
    }

    #[test]
    fn response_without_data_parses_as_empty() {
        let body = r#"{"meta":{"result_count":0}}"#;
        let resp: SearchResponse = serde_json::from_str(body).unwrap();
        assert!(resp.data.is_empty());
        assert_eq!(resp.meta.result_count, 0);
    }

    #[test]
    fn tweet_keeps_unknown_fields() {
        let body = r#"{
            "data": [
                {"id": "150", "text": "newest", "author_id": "9", "edit_history_tweet_ids": ["150"]},
                {"id": "140", "text": "older"}
            ],
            "meta": {"result_count": 2, "newest_id": "150", "oldest_id": "140"}
        }"#;
        let resp: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[0].author_id.as_deref(), Some("9"));
        assert!(resp.data[0].extra.contains_key("edit_history_tweet_ids"));
        assert_eq!(resp.meta.oldest_id.as_deref(), Some("140"));
    }
}
