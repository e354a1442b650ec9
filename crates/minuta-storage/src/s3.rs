use crate::traits::{ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use minuta_core::retry::{
    self, AttemptFailure, OperationFailed, RetryConfig, TRANSIENT_FAULT_CODES,
};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
use std::time::Duration;

/// S3 storage implementation
///
/// Every operation runs through the retry executor with AWS-style fault
/// codes as the retryable set; puts use the 30s transfer timeout profile,
/// the rest the generic profile.
#[derive(Clone)]
pub struct S3ObjectStorage {
    store: AmazonS3,
    bucket: String,
}

impl S3ObjectStorage {
    /// Create a new S3ObjectStorage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Build AmazonS3 object store from environment and explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3ObjectStorage { store, bucket })
    }
}

/// Retryable classification for raw backend errors: the transient fault-code
/// set plus network-failure markers in the message. Not-found and other
/// definitive rejections are fatal on first occurrence.
fn retryable_store_error(err: &ObjectStoreError) -> bool {
    match err {
        ObjectStoreError::NotFound { .. }
        | ObjectStoreError::AlreadyExists { .. }
        | ObjectStoreError::Precondition { .. }
        | ObjectStoreError::NotModified { .. }
        | ObjectStoreError::InvalidPath { .. }
        | ObjectStoreError::NotSupported { .. } => false,
        other => {
            let message = other.to_string();
            if TRANSIENT_FAULT_CODES
                .iter()
                .any(|code| message.contains(code))
            {
                return true;
            }
            let lowered = message.to_lowercase();
            lowered.contains("network")
                || lowered.contains("connection")
                || lowered.contains("timed out")
        }
    }
}

fn map_failed(
    failed: OperationFailed<ObjectStoreError>,
    key: &str,
    wrap: fn(String) -> StorageError,
) -> StorageError {
    match failed.last_error {
        AttemptFailure::TimedOut { .. } => StorageError::Timeout {
            operation: failed.operation,
            attempts: failed.attempts_made,
        },
        AttemptFailure::Error(ObjectStoreError::NotFound { .. }) => {
            StorageError::NotFound(key.to_string())
        }
        AttemptFailure::Error(err) => wrap(err.to_string()),
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        // Idempotent under discard: re-putting the same key overwrites with
        // identical content.
        let config = RetryConfig::for_transfer("S3 upload");
        retry::execute(
            || async {
                self.store
                    .put(&location, PutPayload::from(bytes.clone()))
                    .await
            },
            &config,
            retryable_store_error,
        )
        .await
        .map_err(|failed| {
            tracing::error!(
                error = %failed,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            map_failed(failed, key, StorageError::UploadFailed)
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let config = RetryConfig::new("S3 get object");
        let result = retry::execute(
            || async { self.store.get(&location).await },
            &config,
            retryable_store_error,
        )
        .await
        .map_err(|failed| map_failed(failed, key, StorageError::DownloadFailed))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let config = RetryConfig::new("S3 delete");
        retry::execute(
            || async { self.store.delete(&location).await },
            &config,
            retryable_store_error,
        )
        .await
        .map_err(|failed| {
            tracing::error!(
                error = %failed,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            map_failed(failed, key, StorageError::DeleteFailed)
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let start = std::time::Instant::now();
        let prefix_path = prefix.map(|p| Path::from(p.to_string()));

        let config = RetryConfig::new("S3 list objects");
        let keys = retry::execute(
            || async {
                let mut stream = self.store.list(prefix_path.as_ref());
                let mut keys = Vec::new();
                while let Some(meta) = stream.next().await {
                    keys.push(meta?.location.to_string());
                }
                Ok::<_, ObjectStoreError>(keys)
            },
            &config,
            retryable_store_error,
        )
        .await
        .map_err(|failed| {
            map_failed(failed, prefix.unwrap_or_default(), StorageError::ListFailed)
        })?;

        tracing::info!(
            bucket = %self.bucket,
            count = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list successful"
        );

        Ok(keys)
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = Path::from(key.to_string());

        let config = RetryConfig::new("S3 generate signed URL");
        let url = retry::execute(
            || async {
                self.store
                    .signed_url(Method::GET, &location, expires_in)
                    .await
            },
            &config,
            retryable_store_error,
        )
        .await
        .map_err(|failed| map_failed(failed, key, StorageError::BackendError))?;

        Ok(url.to_string())
    }
}
