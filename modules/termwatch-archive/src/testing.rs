// In-memory object store for tests. Records every put and can be told to
// fail uploads under a key prefix.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, StorageError};
use crate::object_store::ObjectStore;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: Mutex<HashMap<String, usize>>,
    failing_prefixes: Mutex<Vec<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, body: impl Into<Vec<u8>>) -> Self {
        self.objects.lock().unwrap().insert(key.to_string(), body.into());
        self
    }

    /// Make every later `put` under `prefix` fail with an I/O error.
    pub fn fail_puts_with_prefix(&self, prefix: &str) {
        self.failing_prefixes.lock().unwrap().push(prefix.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_prefixes.lock().unwrap().clear();
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Object body split into lines, for NDJSON assertions.
    pub fn lines(&self, key: &str) -> Vec<String> {
        self.object(key)
            .map(|bytes| {
                String::from_utf8_lossy(&bytes)
                    .lines()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Successful puts to `key` so far.
    pub fn put_count(&self, key: &str) -> usize {
        self.puts.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        let failing = self
            .failing_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|p| key.starts_with(p.as_str()));
        if failing {
            return Err(StorageError::Io(io::Error::other(format!(
                "injected put failure for {key}"
            ))));
        }

        self.objects.lock().unwrap().insert(key.to_string(), body);
        *self.puts.lock().unwrap().entry(key.to_string()).or_default() += 1;
        Ok(())
    }
}
