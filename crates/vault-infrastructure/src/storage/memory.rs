//! Blob store kept in a map, with injectable write failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use vault_core::error::DomainError;
use vault_core::ports::{BlobStore, BlobStream};

use super::generate_key;

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
    failures_remaining: AtomicU32,
    put_attempts: AtomicU32,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` puts fail with a retryable upstream error.
    pub fn fail_next_puts(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn put_attempts(&self) -> u32 {
        self.put_attempts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, original_filename: &str, data: Bytes) -> Result<String, DomainError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::Upstream("blob store temporarily unavailable".into()));
        }

        let key = generate_key(original_filename);
        self.blobs.lock().insert(key.clone(), data);
        Ok(key)
    }

    async fn open(&self, key: &str) -> Result<BlobStream, DomainError> {
        let data = self
            .blobs
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Blob", key))?;
        Ok(Box::pin(futures::stream::once(async move { Ok::<Bytes, std::io::Error>(data) })))
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.blobs.lock().remove(key);
        Ok(())
    }
}
