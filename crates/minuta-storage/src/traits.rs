//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait the rest of the application
//! programs against, so handlers and services never couple to a specific
//! backend client.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage operation {operation} timed out after {attempts} attempts")]
    Timeout { operation: String, attempts: u32 },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage abstraction
///
/// All storage backends must implement this trait. Keys are generated
/// centrally in the `keys` module (`uploads/{uuid}.{ext}`).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an object and return its key.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Fetch an object's bytes by key.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete an object by key.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List object keys under a prefix.
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<String>>;

    /// Generate a presigned URL for temporary direct access (GET).
    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;
}
