//! Resumable upload client.
//!
//! Chunked transfer with server-acknowledged offsets. Before starting, the
//! client looks for a previous incomplete transfer with the same file
//! fingerprint and resumes from the offset the server reports, never a
//! locally cached guess. Transport failures back off on a growing delay
//! schedule, deliberately more gradual than the generic retry executor
//! because a large in-flight upload must not be hammered.

use minuta_core::AudioValidator;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use uuid::Uuid;

use crate::error::TransferError;
use crate::protocol::{TransferEndpoint, TransferMetadata};
use crate::session::{FileFingerprint, ResumabilityIndex, UploadSession};

/// Growing delay schedule indexed by consecutive-failure count.
pub const RETRY_DELAYS: [Duration; 5] = [
    Duration::from_secs(0),
    Duration::from_secs(3),
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(20),
];

/// Progress report emitted on every acknowledged chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub bytes_total: u64,
    pub percent: u8,
}

/// Result of a completed transfer.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Identifier assigned by the transfer endpoint (last URL segment).
    pub transfer_id: String,
    /// Target object path in storage.
    pub storage_key: String,
}

/// Chunked, resumable file transfer client.
pub struct ResumableUploadClient {
    endpoint: Arc<dyn TransferEndpoint>,
    validator: AudioValidator,
    chunk_size: usize,
    index: Arc<ResumabilityIndex>,
}

impl ResumableUploadClient {
    pub fn new(
        endpoint: Arc<dyn TransferEndpoint>,
        validator: AudioValidator,
        chunk_size: usize,
    ) -> Self {
        Self {
            endpoint,
            validator,
            chunk_size: chunk_size.max(1),
            index: Arc::new(ResumabilityIndex::new()),
        }
    }

    /// Share an existing resumability index (e.g. one kept across uploads).
    pub fn with_index(mut self, index: Arc<ResumabilityIndex>) -> Self {
        self.index = index;
        self
    }

    /// Upload a file, resuming a previous incomplete transfer when one
    /// matches the fingerprint. Progress is sent over `progress` on every
    /// acknowledged chunk; the channel may be dropped by the receiver at any
    /// time without affecting the transfer.
    pub async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
        progress: Option<mpsc::UnboundedSender<UploadProgress>>,
    ) -> Result<UploadOutcome, TransferError> {
        // Rejected before any network call.
        self.validator
            .validate_upload(filename, content_type, data.len())?;

        let total = data.len() as u64;
        let fingerprint = FileFingerprint {
            filename: filename.to_string(),
            size: total,
        };

        let mut session = self.open_session(&fingerprint, content_type, total).await?;
        let storage_key = match self.index.find(&fingerprint) {
            Some((_, object_path)) => object_path,
            None => {
                return Err(TransferError::Protocol(
                    "transfer session vanished from the resumability index".to_string(),
                ))
            }
        };

        let mut consecutive_failures: usize = 0;
        while session.resume_offset < total {
            let start = session.resume_offset as usize;
            let end = (start + self.chunk_size).min(data.len());
            let chunk = &data[start..end];

            match self
                .endpoint
                .write_chunk(&session.transfer_url, session.resume_offset, chunk)
                .await
            {
                Ok(acked_offset) => {
                    consecutive_failures = 0;
                    session.resume_offset = acked_offset;

                    let percent = ((acked_offset * 100) / total) as u8;
                    if let Some(ref tx) = progress {
                        let _ = tx.send(UploadProgress {
                            bytes_uploaded: acked_offset,
                            bytes_total: total,
                            percent,
                        });
                    }
                    self.index.record_progress(&fingerprint, percent);
                }
                Err(err) if err.is_transport() => {
                    if consecutive_failures >= RETRY_DELAYS.len() {
                        tracing::error!(
                            filename = %filename,
                            attempts = consecutive_failures + 1,
                            error = %err,
                            "Transfer retry schedule exhausted"
                        );
                        return Err(TransferError::Exhausted {
                            attempts: (consecutive_failures + 1) as u32,
                            last_error: err.to_string(),
                        });
                    }

                    let delay = RETRY_DELAYS[consecutive_failures];
                    consecutive_failures += 1;
                    tracing::warn!(
                        filename = %filename,
                        offset = session.resume_offset,
                        consecutive_failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Chunk write failed, backing off"
                    );
                    sleep(delay).await;

                    // The server is authoritative for where to resume; local
                    // offset may be stale after a partial failure.
                    if let Ok(server_offset) = self.endpoint.offset(&session.transfer_url).await {
                        session.resume_offset = server_offset;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        session.completed = true;
        self.index.clear(&fingerprint);

        let transfer_id = session
            .transfer_url
            .rsplit('/')
            .next()
            .unwrap_or(session.transfer_url.as_str())
            .to_string();

        tracing::info!(
            filename = %filename,
            transfer_id = %transfer_id,
            storage_key = %storage_key,
            bytes = total,
            "Upload completed"
        );

        Ok(UploadOutcome {
            transfer_id,
            storage_key,
        })
    }

    /// Find or create the transfer session, with the resume offset read from
    /// the server for previous transfers.
    async fn open_session(
        &self,
        fingerprint: &FileFingerprint,
        content_type: &str,
        total: u64,
    ) -> Result<UploadSession, TransferError> {
        if let Some((transfer_url, _object_path)) = self.index.find(fingerprint) {
            let offset = self
                .with_transport_retry("offset probe", || self.endpoint.offset(&transfer_url))
                .await?;
            tracing::info!(
                filename = %fingerprint.filename,
                offset,
                "Resuming previous upload from server-reported offset"
            );
            return Ok(UploadSession {
                fingerprint: fingerprint.clone(),
                transfer_url,
                resume_offset: offset,
                completed: false,
            });
        }

        let object_path = format!("uploads/{}-{}", Uuid::new_v4(), fingerprint.filename);
        let metadata = TransferMetadata {
            filename: fingerprint.filename.clone(),
            content_type: content_type.to_string(),
            object_path: object_path.clone(),
        };

        let transfer_url = self
            .with_transport_retry("transfer creation", || self.endpoint.create(&metadata, total))
            .await?;

        self.index.record(
            fingerprint.clone(),
            transfer_url.clone(),
            object_path.clone(),
        );

        Ok(UploadSession {
            fingerprint: fingerprint.clone(),
            transfer_url,
            resume_offset: 0,
            completed: false,
        })
    }

    async fn with_transport_retry<T, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let mut failures: usize = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transport() => {
                    if failures >= RETRY_DELAYS.len() {
                        return Err(TransferError::Exhausted {
                            attempts: (failures + 1) as u32,
                            last_error: err.to_string(),
                        });
                    }
                    let delay = RETRY_DELAYS[failures];
                    failures += 1;
                    tracing::warn!(
                        operation = label,
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transfer request failed, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EndpointState {
        created: u32,
        server_offset: u64,
        writes: Vec<(u64, usize)>,
        failures_remaining: u32,
    }

    struct MockEndpoint {
        state: Mutex<EndpointState>,
    }

    impl MockEndpoint {
        fn new() -> Self {
            Self {
                state: Mutex::new(EndpointState::default()),
            }
        }

        fn with_server_offset(offset: u64) -> Self {
            let endpoint = Self::new();
            endpoint.state.lock().unwrap().server_offset = offset;
            endpoint
        }

        fn fail_next(&self, count: u32) {
            self.state.lock().unwrap().failures_remaining = count;
        }
    }

    #[async_trait]
    impl TransferEndpoint for MockEndpoint {
        async fn create(
            &self,
            _metadata: &TransferMetadata,
            _total_size: u64,
        ) -> Result<String, TransferError> {
            let mut state = self.state.lock().unwrap();
            state.created += 1;
            Ok("http://tusd/files/t-1".to_string())
        }

        async fn offset(&self, _transfer_url: &str) -> Result<u64, TransferError> {
            Ok(self.state.lock().unwrap().server_offset)
        }

        async fn write_chunk(
            &self,
            _transfer_url: &str,
            offset: u64,
            chunk: &[u8],
        ) -> Result<u64, TransferError> {
            let mut state = self.state.lock().unwrap();
            if state.failures_remaining > 0 {
                state.failures_remaining -= 1;
                return Err(TransferError::Network("connection reset".to_string()));
            }
            assert_eq!(offset, state.server_offset, "client must write at the server offset");
            state.writes.push((offset, chunk.len()));
            state.server_offset += chunk.len() as u64;
            Ok(state.server_offset)
        }
    }

    fn validator() -> AudioValidator {
        AudioValidator::new(
            10 * 1024 * 1024,
            vec!["mp3".to_string()],
            vec!["audio/mpeg".to_string()],
        )
    }

    fn client(endpoint: Arc<MockEndpoint>, chunk_size: usize) -> ResumableUploadClient {
        ResumableUploadClient::new(endpoint, validator(), chunk_size)
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected_before_any_network_call() {
        let endpoint = Arc::new(MockEndpoint::new());
        let client = client(endpoint.clone(), 100);

        let result = client.upload("standup.mp3", "audio/mpeg", &[], None).await;
        assert!(matches!(result, Err(TransferError::Validation(_))));
        assert_eq!(endpoint.state.lock().unwrap().created, 0);
        assert!(endpoint.state.lock().unwrap().writes.is_empty());
    }

    #[tokio::test]
    async fn test_upload_chunks_whole_file_and_reports_progress() {
        let endpoint = Arc::new(MockEndpoint::new());
        let client = client(endpoint.clone(), 100);
        let data = vec![7u8; 250];
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = client
            .upload("standup.mp3", "audio/mpeg", &data, Some(tx))
            .await
            .unwrap();

        assert_eq!(outcome.transfer_id, "t-1");
        assert!(outcome.storage_key.starts_with("uploads/"));
        assert!(outcome.storage_key.ends_with("standup.mp3"));

        let state = endpoint.state.lock().unwrap();
        assert_eq!(state.writes, vec![(0, 100), (100, 100), (200, 50)]);
        drop(state);

        let mut reports = Vec::new();
        while let Ok(report) = rx.try_recv() {
            reports.push(report);
        }
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].percent, 40);
        assert_eq!(reports[2].percent, 100);
        assert_eq!(reports[2].bytes_uploaded, 250);
    }

    #[tokio::test]
    async fn test_resume_sends_no_bytes_before_server_offset() {
        let endpoint = Arc::new(MockEndpoint::with_server_offset(5000));
        let client = client(endpoint.clone(), 1000);
        let data = vec![1u8; 8000];

        // A previous attempt left an incomplete transfer behind.
        client.index.record(
            FileFingerprint {
                filename: "standup.mp3".to_string(),
                size: 8000,
            },
            "http://tusd/files/t-1".to_string(),
            "uploads/prev-standup.mp3".to_string(),
        );

        let outcome = client
            .upload("standup.mp3", "audio/mpeg", &data, None)
            .await
            .unwrap();

        assert_eq!(outcome.storage_key, "uploads/prev-standup.mp3");
        let state = endpoint.state.lock().unwrap();
        assert_eq!(state.created, 0, "resumed transfer must not be re-created");
        assert!(state.writes.iter().all(|(offset, _)| *offset >= 5000));
        assert_eq!(state.writes.first(), Some(&(5000, 1000)));
        assert_eq!(state.server_offset, 8000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_chunk_failures_follow_growing_delays() {
        let endpoint = Arc::new(MockEndpoint::new());
        endpoint.fail_next(2);
        let client = client(endpoint.clone(), 1000);
        let data = vec![2u8; 1000];

        let started = tokio::time::Instant::now();
        client
            .upload("standup.mp3", "audio/mpeg", &data, None)
            .await
            .unwrap();

        // First retry is immediate, second waits 3s.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(endpoint.state.lock().unwrap().writes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_exhaustion_surfaces_error() {
        let endpoint = Arc::new(MockEndpoint::new());
        endpoint.fail_next(u32::MAX);
        let client = client(endpoint.clone(), 1000);
        let data = vec![3u8; 1000];

        let started = tokio::time::Instant::now();
        let result = client.upload("standup.mp3", "audio/mpeg", &data, None).await;

        match result {
            Err(TransferError::Exhausted { attempts, .. }) => assert_eq!(attempts, 6),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        // 0 + 3 + 5 + 10 + 20 seconds of backoff before giving up.
        assert_eq!(started.elapsed(), Duration::from_secs(38));
    }

    #[tokio::test]
    async fn test_index_cleared_on_completion() {
        let endpoint = Arc::new(MockEndpoint::new());
        let client = client(endpoint.clone(), 1000);
        let data = vec![4u8; 500];
        let fingerprint = FileFingerprint {
            filename: "standup.mp3".to_string(),
            size: 500,
        };

        client
            .upload("standup.mp3", "audio/mpeg", &data, None)
            .await
            .unwrap();

        assert!(client.index.find(&fingerprint).is_none());
    }
}
