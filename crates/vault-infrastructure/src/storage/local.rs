// ============================================================================
// Vault Infrastructure - Local Disk Blob Store
// File: crates/vault-infrastructure/src/storage/local.rs
// ============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

use vault_core::error::DomainError;
use vault_core::ports::{BlobStore, BlobStream};

use super::generate_key;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Stores each blob as one file under `root`.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            error!("Cannot create upload directory {}: {}", root.display(), e);
            DomainError::Internal(format!("Cannot create upload directory: {}", e))
        })?;
        info!("Blob store rooted at {}", root.display());
        let store = Self { root };
        store.sweep_partials().await;
        Ok(store)
    }

    /// Writes cut short by a timeout leave hidden `.partial` files behind.
    async fn sweep_partials(&self) {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot scan upload directory for partial blobs: {}", e);
                return;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') && name.ends_with(".partial") {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => debug!("Removed partial blob {}", name),
                    Err(e) => warn!("Failed to remove partial blob {}: {}", name, e),
                }
            }
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DomainError> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(DomainError::Validation(format!("Invalid blob key: {}", key)));
        }
        Ok(self.root.join(key))
    }
}

/// Writes under a hidden name and renames into place, so a blob key only ever
/// names a complete file. The hidden file is removed when either step fails.
async fn write_then_rename(partial: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let result = match tokio::fs::write(partial, data).await {
        Ok(()) => tokio::fs::rename(partial, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(partial).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove partial blob {}: {}", partial.display(), e);
            }
        }
    }
    result
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, original_filename: &str, data: Bytes) -> Result<String, DomainError> {
        let key = generate_key(original_filename);
        let path = self.path_for(&key)?;

        let partial = self.root.join(format!(".{}.partial", key));

        write_then_rename(&partial, &path, &data).await.map_err(|e| {
            error!("Failed to write blob {}: {}", key, e);
            DomainError::Upstream(format!("Failed to write blob: {}", e))
        })?;

        debug!("Wrote {} bytes to {}", data.len(), key);
        Ok(key)
    }

    async fn open(&self, key: &str) -> Result<BlobStream, DomainError> {
        let path = self.path_for(key)?;
        let mut file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DomainError::not_found("Blob", key),
            _ => DomainError::Upstream(format!("Failed to open blob: {}", e)),
        })?;

        let stream = async_stream::stream! {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            loop {
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => yield Ok::<Bytes, std::io::Error>(Bytes::copy_from_slice(&buf[..n])),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Upstream(format!("Failed to delete blob: {}", e))),
        }
    }
}
