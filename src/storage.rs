//! Blob storage for rendered documents and uploaded evidence.
//!
//! The core only ever holds blob reference URIs; bytes live behind this
//! trait. The bundled implementation targets the local filesystem,
//! S3-compatible backends slot in behind the same interface.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob reference: {0}")]
    InvalidRef(String),

    #[error("Blob not found: {0}")]
    NotFound(String),
}

/// Hex-encoded SHA-256 of stored bytes, recorded next to every document URI
/// so published files can be checked for tampering.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Storage keys grouped by document family.
pub mod keys {
    pub fn certificate(certificate_number: &str, extension: &str) -> String {
        format!("certificates/{}.{}", certificate_number, extension)
    }

    pub fn field_report(job_order_id: i64, stamp: &str, extension: &str) -> String {
        format!("fir_reports/fir_{}_{}.{}", job_order_id, stamp, extension)
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store binary content, return a reference URI.
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, BlobStoreError>;

    /// Fetch binary content by reference.
    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError>;

    /// Delete binary content. Deleting a missing blob is not an error.
    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError>;

    /// Check if a blob exists.
    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError>;
}

/// Local filesystem store; references are `file://` URIs.
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn path_from_ref(&self, blob_ref: &str) -> Result<PathBuf, BlobStoreError> {
        blob_ref
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| {
                BlobStoreError::InvalidRef(format!("Expected file:// prefix: {}", blob_ref))
            })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<String, BlobStoreError> {
        let path = self.path_for_key(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;

        if !path.exists() {
            return Err(BlobStoreError::NotFound(blob_ref.to_string()));
        }

        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;

        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }

        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        Ok(path.exists())
    }
}

/// In-memory store for tests.
#[cfg(test)]
pub struct InMemoryBlobStore {
    blobs: std::sync::Arc<tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>>,
}

#[cfg(test)]
impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: std::sync::Arc::new(tokio::sync::RwLock::new(std::collections::HashMap::new())),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<String, BlobStoreError> {
        let blob_ref = format!("memory://{}", key);
        let mut blobs = self.blobs.write().await;
        blobs.insert(blob_ref.clone(), content.to_vec());
        Ok(blob_ref)
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        let blobs = self.blobs.read().await;
        blobs
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(blob_ref.to_string()))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(blob_ref);
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.contains_key(blob_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());

        let content = b"certificate body";
        let key = keys::certificate("CERT-202600000001", "html");

        let blob_ref = store.store(&key, content, "text/html").await.unwrap();
        assert!(blob_ref.starts_with("file://"));
        assert!(store.exists(&blob_ref).await.unwrap());

        let fetched = store.fetch(&blob_ref).await.unwrap();
        assert_eq!(fetched, content);

        store.delete(&blob_ref).await.unwrap();
        assert!(!store.exists(&blob_ref).await.unwrap());
    }

    #[tokio::test]
    async fn test_local_store_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());

        let key = keys::field_report(42, "20260823_101500", "html");
        let blob_ref = store.store(&key, b"report body", "text/html").await.unwrap();
        assert_eq!(store.fetch(&blob_ref).await.unwrap(), b"report body");
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryBlobStore::new();

        let blob_ref = store
            .store("test-key", b"data", "application/octet-stream")
            .await
            .unwrap();
        assert!(store.exists(&blob_ref).await.unwrap());
        assert_eq!(store.fetch(&blob_ref).await.unwrap(), b"data");

        store.delete(&blob_ref).await.unwrap();
        assert!(!store.exists(&blob_ref).await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_missing_blob() {
        let store = InMemoryBlobStore::new();
        let result = store.fetch("memory://nonexistent").await;
        assert!(matches!(result, Err(BlobStoreError::NotFound(_))));
    }

    #[test]
    fn test_sha256_hex() {
        // Known digest of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex(b"abc").len(), 64);
    }
}
