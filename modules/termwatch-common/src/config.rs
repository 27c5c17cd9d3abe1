use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::{CrawlError, Result};

/// Where archive units and the cursor document live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Google Cloud Storage, bearer-token auth.
    Gcs,
    /// A directory on local disk: `{root}/{bucket}/{key}`.
    Local { root: PathBuf },
}

/// Application configuration, read once at process start and passed into constructors.
#[derive(Debug, Clone)]
pub struct Config {
    // Search API
    pub search_credentials: String,
    pub search_lang: Option<String>,
    pub search_max_results: u32,

    // Object storage
    pub storage_bucket: String,
    pub storage_credentials: Option<String>,
    pub storage_backend: StorageBackend,
    pub terms_key: String,
    pub archive_prefix: String,

    // Trigger
    pub run_interval_minutes: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. `from_env` is this over the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CrawlError::Config(format!("{key} environment variable is required")))
        };

        let storage_backend = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("gcs") => StorageBackend::Gcs,
            Some("local") => StorageBackend::Local {
                root: PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            },
            Some(other) => {
                return Err(CrawlError::Config(format!(
                    "STORAGE_BACKEND must be 'gcs' or 'local', got '{other}'"
                )))
            }
        };

        let storage_credentials = match storage_backend {
            StorageBackend::Gcs => Some(required("STORAGE_TOKEN")?),
            StorageBackend::Local { .. } => lookup("STORAGE_TOKEN").filter(|v| !v.is_empty()),
        };

        Ok(Self {
            search_credentials: required("SEARCH_BEARER_TOKEN")?,
            search_lang: match lookup("SEARCH_LANG") {
                Some(lang) if lang.is_empty() => None,
                Some(lang) => Some(lang),
                None => Some("en".to_string()),
            },
            search_max_results: parse_or(&lookup, "SEARCH_MAX_RESULTS", 100)?,
            storage_bucket: required("STORAGE_BUCKET")?,
            storage_credentials,
            storage_backend,
            terms_key: lookup("TERMS_KEY").unwrap_or_else(|| "terms.json".to_string()),
            archive_prefix: lookup("ARCHIVE_PREFIX").unwrap_or_default(),
            run_interval_minutes: parse_or(&lookup, "RUN_INTERVAL_MINUTES", 15)?,
        })
    }

    /// Log the configuration with credentials masked.
    pub fn log_redacted(&self) {
        let backend = match &self.storage_backend {
            StorageBackend::Gcs => "gcs".to_string(),
            StorageBackend::Local { root } => format!("local:{}", root.display()),
        };
        info!(
            search_credentials = redact(&self.search_credentials),
            search_lang = ?self.search_lang,
            search_max_results = self.search_max_results,
            storage_bucket = %self.storage_bucket,
            storage_credentials = self.storage_credentials.as_deref().map(redact).unwrap_or("unset"),
            storage_backend = %backend,
            terms_key = %self.terms_key,
            archive_prefix = %self.archive_prefix,
            run_interval_minutes = self.run_interval_minutes,
            "Configuration loaded"
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| CrawlError::Config(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "unset"
    } else {
        "[redacted]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn gcs_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SEARCH_BEARER_TOKEN", "search-token"),
            ("STORAGE_BUCKET", "tweets"),
            ("STORAGE_TOKEN", "gcs-token"),
        ]))
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Gcs);
        assert_eq!(config.terms_key, "terms.json");
        assert_eq!(config.search_lang.as_deref(), Some("en"));
        assert_eq!(config.search_max_results, 100);
        assert_eq!(config.run_interval_minutes, 15);
        assert_eq!(config.storage_credentials.as_deref(), Some("gcs-token"));
    }

    #[test]
    fn gcs_requires_storage_token() {
        let err = Config::from_lookup(lookup(&[
            ("SEARCH_BEARER_TOKEN", "search-token"),
            ("STORAGE_BUCKET", "tweets"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STORAGE_TOKEN"));
    }

    #[test]
    fn local_backend_uses_data_dir() {
        let config = Config::from_lookup(lookup(&[
            ("SEARCH_BEARER_TOKEN", "search-token"),
            ("STORAGE_BUCKET", "tweets"),
            ("STORAGE_BACKEND", "local"),
            ("DATA_DIR", "/var/lib/termwatch"),
            ("SEARCH_LANG", ""),
        ]))
        .unwrap();

        assert_eq!(
            config.storage_backend,
            StorageBackend::Local {
                root: PathBuf::from("/var/lib/termwatch")
            }
        );
        assert_eq!(config.storage_credentials, None);
        assert_eq!(config.search_lang, None);
    }

    #[test]
    fn rejects_bad_numbers_and_backends() {
        let base = [
            ("SEARCH_BEARER_TOKEN", "t"),
            ("STORAGE_BUCKET", "b"),
            ("STORAGE_TOKEN", "s"),
        ];

        let mut bad_interval = base.to_vec();
        bad_interval.push(("RUN_INTERVAL_MINUTES", "soon"));
        assert!(matches!(
            Config::from_lookup(lookup(&bad_interval)),
            Err(CrawlError::Config(_))
        ));

        let mut bad_backend = base.to_vec();
        bad_backend.push(("STORAGE_BACKEND", "ftp"));
        assert!(matches!(
            Config::from_lookup(lookup(&bad_backend)),
            Err(CrawlError::Config(_))
        ));
    }
}
