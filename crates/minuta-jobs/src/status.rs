//! Transcription status endpoint client.

use async_trait::async_trait;
use minuta_core::retry::{self, default_retryable, AttemptFailure, OperationFailed, RetryConfig};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::StatusError;

/// Job state as reported by the transcription engine.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionState {
    Processing,
    Completed,
    Failed,
}

/// One status fetch: `GET /transcription/{file_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResult {
    pub status: TranscriptionState,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Read-only view of the transcription engine.
#[async_trait]
pub trait TranscriptionStatusClient: Send + Sync {
    async fn fetch_status(&self, file_id: &str) -> Result<TranscriptionResult, StatusError>;
}

/// HTTP implementation against the transcription status endpoint. Each fetch
/// goes through the retry executor with the generic profile; a fetch is
/// read-only and safe to discard on timeout.
#[derive(Clone, Debug)]
pub struct HttpTranscriptionClient {
    client: Client,
    base_url: String,
}

impl HttpTranscriptionClient {
    pub fn new(base_url: String) -> Result<Self, StatusError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StatusError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn try_fetch(&self, file_id: &str) -> Result<TranscriptionResult, StatusError> {
        let url = format!("{}/transcription/{}", self.base_url, file_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StatusError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StatusError::Network(e.to_string()))?;

        if !status.is_success() {
            let code = match status.as_u16() {
                429 => "TooManyRequestsException".to_string(),
                502 | 503 | 504 => "ServiceUnavailable".to_string(),
                500..=599 => "InternalServerError".to_string(),
                code => format!("Http{}", code),
            };
            return Err(StatusError::Upstream {
                code,
                message: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| StatusError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TranscriptionStatusClient for HttpTranscriptionClient {
    async fn fetch_status(&self, file_id: &str) -> Result<TranscriptionResult, StatusError> {
        let config = RetryConfig::new("transcription status fetch");
        retry::execute(|| self.try_fetch(file_id), &config, default_retryable)
            .await
            .map_err(|failed: OperationFailed<StatusError>| match failed.last_error {
                AttemptFailure::Error(err) => err,
                AttemptFailure::TimedOut { .. } => StatusError::Timeout {
                    operation: failed.operation,
                    attempts: failed.attempts_made,
                },
            })
    }
}
