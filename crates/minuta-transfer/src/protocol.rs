//! Offset-based transfer protocol (tus 1.0).
//!
//! `TransferEndpoint` is the seam between the upload client and the wire; the
//! HTTP implementation talks to a tus daemon. The server is authoritative for
//! the resume offset: `offset` re-reads it from the endpoint's own state.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::error::TransferError;

const TUS_VERSION: &str = "1.0.0";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

/// File metadata attached to a new transfer.
#[derive(Debug, Clone)]
pub struct TransferMetadata {
    pub filename: String,
    pub content_type: String,
    /// Target object path in storage, carried through as transfer metadata.
    pub object_path: String,
}

/// Offset-based chunked upload endpoint.
#[async_trait]
pub trait TransferEndpoint: Send + Sync {
    /// Register a new transfer; returns the transfer URL.
    async fn create(
        &self,
        metadata: &TransferMetadata,
        total_size: u64,
    ) -> Result<String, TransferError>;

    /// Read the server-confirmed offset for an existing transfer.
    async fn offset(&self, transfer_url: &str) -> Result<u64, TransferError>;

    /// Append a chunk at `offset`; returns the new server-confirmed offset.
    async fn write_chunk(
        &self,
        transfer_url: &str,
        offset: u64,
        chunk: &[u8],
    ) -> Result<u64, TransferError>;
}

/// HTTP implementation speaking the tus protocol.
#[derive(Clone, Debug)]
pub struct HttpTransferEndpoint {
    client: Client,
    endpoint: String,
}

impl HttpTransferEndpoint {
    pub fn new(endpoint: String) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TransferError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn encode_metadata(metadata: &TransferMetadata) -> String {
        // tus Upload-Metadata: comma-separated "key base64(value)" pairs.
        [
            ("filename", metadata.filename.as_str()),
            ("filetype", metadata.content_type.as_str()),
            ("objectpath", metadata.object_path.as_str()),
        ]
        .iter()
        .map(|(key, value)| format!("{} {}", key, BASE64.encode(value)))
        .collect::<Vec<_>>()
        .join(",")
    }

    async fn rejection(response: Response) -> TransferError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        TransferError::Rejected {
            status,
            message: message.chars().take(200).collect(),
        }
    }

    fn offset_header(response: &Response) -> Result<u64, TransferError> {
        response
            .headers()
            .get("Upload-Offset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                TransferError::Protocol("response missing Upload-Offset header".to_string())
            })
    }
}

#[async_trait]
impl TransferEndpoint for HttpTransferEndpoint {
    async fn create(
        &self,
        metadata: &TransferMetadata,
        total_size: u64,
    ) -> Result<String, TransferError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Length", total_size)
            .header("Upload-Metadata", Self::encode_metadata(metadata))
            .send()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        if response.status() != StatusCode::CREATED {
            return Err(Self::rejection(response).await);
        }

        let location = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                TransferError::Protocol("creation response missing Location header".to_string())
            })?;

        // tus daemons may answer with a relative Location.
        let transfer_url = if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}/{}", self.endpoint, location.trim_start_matches('/'))
        };

        tracing::debug!(transfer_url = %transfer_url, filename = %metadata.filename, "Transfer created");
        Ok(transfer_url)
    }

    async fn offset(&self, transfer_url: &str) -> Result<u64, TransferError> {
        let response = self
            .client
            .head(transfer_url)
            .header("Tus-Resumable", TUS_VERSION)
            .send()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        Self::offset_header(&response)
    }

    async fn write_chunk(
        &self,
        transfer_url: &str,
        offset: u64,
        chunk: &[u8],
    ) -> Result<u64, TransferError> {
        let response = self
            .client
            .patch(transfer_url)
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Offset", offset)
            .header("Content-Type", OFFSET_CONTENT_TYPE)
            .body(chunk.to_vec())
            .send()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(Self::rejection(response).await);
        }

        Self::offset_header(&response)
    }
}
