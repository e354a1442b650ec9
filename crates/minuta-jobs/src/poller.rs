//! Transcription polling state machine.
//!
//! Tracks a job from submission to its terminal state with fixed-interval
//! polling (not exponential): each attempt performs one status fetch;
//! `Completed` and `Failed` short-circuit immediately, `Processing` sleeps
//! the full interval. On every terminal outcome the job record is updated
//! before the result is surfaced, so upstream bookkeeping always sees the
//! captured transcript or error.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use crate::error::PollError;
use crate::status::{TranscriptionState, TranscriptionStatusClient};
use crate::store::JobStore;

#[derive(Clone, Debug)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(3),
        }
    }
}

/// Drives one transcription job to a terminal state.
pub struct TranscriptionPoller {
    status: Arc<dyn TranscriptionStatusClient>,
    store: Arc<dyn JobStore>,
    config: PollConfig,
}

impl TranscriptionPoller {
    pub fn new(
        status: Arc<dyn TranscriptionStatusClient>,
        store: Arc<dyn JobStore>,
        config: PollConfig,
    ) -> Self {
        Self {
            status,
            store,
            config,
        }
    }

    /// Poll until the job reaches a terminal state or the attempt budget runs
    /// out. Returns the transcript on completion; `JobFailed` and
    /// `PollTimeout` are distinct terminal errors, both recorded on the
    /// meeting before being re-raised.
    pub async fn poll(&self, meeting_id: Uuid, file_id: &str) -> Result<String, PollError> {
        for attempt in 1..=self.config.max_attempts {
            tracing::debug!(
                file_id = %file_id,
                attempt,
                max_attempts = self.config.max_attempts,
                "Polling transcription status"
            );

            let result = match self.status.fetch_status(file_id).await {
                Ok(result) => result,
                Err(err) => {
                    let message = err.to_string();
                    self.record_failure(meeting_id, &message, attempt).await;
                    return Err(PollError::Fetch(message));
                }
            };

            match result.status {
                TranscriptionState::Completed => {
                    let transcript = result.text.unwrap_or_default().trim().to_string();
                    tracing::info!(
                        file_id = %file_id,
                        attempt,
                        chars = transcript.len(),
                        "Transcription complete"
                    );
                    if let Err(err) = self
                        .store
                        .complete(meeting_id, transcript.clone(), attempt)
                        .await
                    {
                        tracing::warn!(
                            meeting_id = %meeting_id,
                            error = %err,
                            "Failed to record completed transcription"
                        );
                    }
                    return Ok(transcript);
                }
                TranscriptionState::Failed => {
                    let message = result
                        .error
                        .unwrap_or_else(|| "Unknown transcription error".to_string());
                    tracing::warn!(
                        file_id = %file_id,
                        attempt,
                        error = %message,
                        "Transcription failed"
                    );
                    self.record_failure(meeting_id, &message, attempt).await;
                    return Err(PollError::JobFailed { message });
                }
                TranscriptionState::Processing => {
                    sleep(self.config.interval).await;
                }
            }
        }

        let attempts = self.config.max_attempts;
        tracing::warn!(
            file_id = %file_id,
            attempts,
            "Transcription timed out"
        );
        self.record_failure(meeting_id, "Transcription timed out", attempts)
            .await;
        Err(PollError::PollTimeout { attempts })
    }

    /// Spawn the poll as a background task; the outcome lands in the job
    /// record either way, so fire-and-forget callers only lose the error
    /// propagation, not the bookkeeping.
    pub fn spawn(self: &Arc<Self>, meeting_id: Uuid, file_id: String) {
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = poller.poll(meeting_id, &file_id).await {
                tracing::error!(
                    meeting_id = %meeting_id,
                    file_id = %file_id,
                    error = %err,
                    "Transcription processing failed"
                );
            }
        });
    }

    async fn record_failure(&self, meeting_id: Uuid, message: &str, attempts: u32) {
        if let Err(err) = self
            .store
            .fail(meeting_id, message.to_string(), attempts)
            .await
        {
            tracing::warn!(
                meeting_id = %meeting_id,
                error = %err,
                "Failed to record transcription failure"
            );
        }
    }
}
