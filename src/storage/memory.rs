//! In-memory blob store for tests. Records every call it receives.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
}

impl MemoryStorage {
    /// Pretend a client finished uploading `key`
    pub fn put(&self, key: &str) {
        self.objects.lock().unwrap().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains(key)
    }

    /// Make every following `delete` fail
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Calls received so far, formatted as `<op> <key>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, key: &str) {
        self.calls.lock().unwrap().push(format!("{} {}", op, key));
    }
}

#[async_trait]
impl BlobStore for MemoryStorage {
    async fn delete(&self, key: &str) -> Result<()> {
        self.record("delete", key);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("delete of {} refused", key)));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.contains(key))
    }

    async fn upload_url(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires: Duration,
    ) -> Result<String> {
        self.record("upload_url", key);
        Ok(format!(
            "memory://upload/{}?content-type={}&content-length={}&expires={}",
            key,
            content_type,
            content_length,
            expires.as_secs()
        ))
    }

    async fn download_url(&self, key: &str, expires: Duration) -> Result<String> {
        self.record("download_url", key);
        Ok(format!(
            "memory://download/{}?expires={}",
            key,
            expires.as_secs()
        ))
    }

    fn storage_type(&self) -> &'static str {
        "memory"
    }
}
