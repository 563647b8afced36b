//! Blob store port

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::DomainError;

pub type BlobStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Opaque byte storage keyed by a generated string.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists `data` and returns the key it can be read back with.
    async fn put(&self, original_filename: &str, data: Bytes) -> Result<String, DomainError>;
    /// `NotFound` when the key is unknown.
    async fn open(&self, key: &str) -> Result<BlobStream, DomainError>;
    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}
