//! Storage abstraction trait

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// The upload broker only deals with keys; each backend decides where the
/// bytes physically live.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `storage_key`, replacing any existing object.
    /// Returns the number of bytes written.
    async fn put(&self, storage_key: &str, content_type: &str, data: Bytes) -> StorageResult<u64>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of an existing object
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Whether [`Storage::presigned_put_url`] is available on this backend
    fn supports_presigned_put(&self) -> bool;

    /// Generate a presigned PUT URL for direct uploads.
    ///
    /// Only supported by S3 backends; other backends return a `ConfigError`.
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    fn backend_type(&self) -> StorageBackend;
}
