use async_trait::async_trait;
use super::StorageSink;
use crate::error::StorageError;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-process object store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: Mutex<Vec<String>>,
    fail_keys: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts to `key` fail with an HTTP 403, as a revoked credential would.
    pub fn failing_on(mut self, key: &str) -> Self {
        self.fail_keys.push(key.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every key `put` was called with, failed attempts included.
    pub fn put_calls(&self) -> Vec<String> {
        self.puts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        if let Ok(mut puts) = self.puts.lock() {
            puts.push(key.to_string());
        }

        if self.fail_keys.iter().any(|k| k == key) {
            return Err(StorageError::Status {
                key: key.to_string(),
                status: 403,
                body: "forbidden".to_string(),
            });
        }

        self.objects
            .lock()
            .map_err(|_| StorageError::Config("memory store poisoned".to_string()))?
            .insert(key.to_string(), body);
        Ok(())
    }
}
