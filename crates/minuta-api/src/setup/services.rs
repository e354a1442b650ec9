//! Service construction.
//!
//! All upstream clients are built here once and injected into AppState;
//! nothing else in the application constructs a client.

use anyhow::{Context, Result};
use minuta_core::Config;
use minuta_identity::{HttpIdentityClient, IdentityService};
use minuta_jobs::{HttpTranscriptionClient, InMemoryJobStore, JobStore, TranscriptionStatusClient};
use minuta_storage::{ObjectStorage, S3ObjectStorage};
use minuta_transfer::{HttpTransferEndpoint, TransferEndpoint};
use std::sync::Arc;

use crate::state::AppState;

/// Initialize all upstream clients and assemble the application state.
pub fn initialize_services(config: Config) -> Result<Arc<AppState>> {
    let identity: Arc<dyn IdentityService> = Arc::new(
        HttpIdentityClient::new(config.identity_url.clone(), config.identity_api_key.clone())
            .context("Failed to create identity client")?,
    );

    let storage: Arc<dyn ObjectStorage> = Arc::new(
        S3ObjectStorage::new(
            config.s3_bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint.clone(),
        )
        .context("Failed to create storage client")?,
    );

    let transfer: Arc<dyn TransferEndpoint> = Arc::new(
        HttpTransferEndpoint::new(config.transfer_endpoint.clone())
            .context("Failed to create transfer endpoint client")?,
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    let status: Arc<dyn TranscriptionStatusClient> = Arc::new(
        HttpTranscriptionClient::new(config.transcription_api_url.clone())
            .context("Failed to create transcription status client")?,
    );

    tracing::info!(
        identity_url = %config.identity_url,
        s3_bucket = %config.s3_bucket,
        transcription_api = %config.transcription_api_url,
        "Upstream clients initialized"
    );

    Ok(AppState::new(
        config, identity, storage, transfer, store, status,
    ))
}
