//! Application state.
//!
//! Every upstream client is constructed once in setup and injected here as a
//! trait object, so tests swap in doubles and no component reaches for a
//! process-global client.

use minuta_core::{AudioValidator, Config};
use minuta_identity::{IdentityService, TokenLifecycleManager};
use minuta_jobs::{JobStore, PollConfig, TranscriptionPoller, TranscriptionStatusClient};
use minuta_storage::ObjectStorage;
use minuta_transfer::{ResumableUploadClient, TransferEndpoint};
use std::sync::Arc;
use std::time::Duration;

/// Storage proxy and upload validation.
#[derive(Clone)]
pub struct MediaState {
    pub storage: Arc<dyn ObjectStorage>,
    pub validator: AudioValidator,
    pub signed_url_ttl: Duration,
    /// Resumable transfer client for recording uploads.
    pub uploads: Arc<ResumableUploadClient>,
}

/// Meeting records and the transcription poller.
#[derive(Clone)]
pub struct JobState {
    pub store: Arc<dyn JobStore>,
    pub poller: Arc<TranscriptionPoller>,
}

pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityService>,
    pub tokens: TokenLifecycleManager,
    pub media: MediaState,
    pub jobs: JobState,
}

impl AppState {
    /// Wire the state from already-constructed collaborators. Used by setup
    /// with real clients and by tests with doubles.
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityService>,
        storage: Arc<dyn ObjectStorage>,
        transfer: Arc<dyn TransferEndpoint>,
        store: Arc<dyn JobStore>,
        status: Arc<dyn TranscriptionStatusClient>,
    ) -> Arc<Self> {
        let tokens = TokenLifecycleManager::new(identity.clone(), config.is_production());

        let validator = AudioValidator::new(
            config.max_audio_size_bytes,
            config.audio_allowed_extensions.clone(),
            config.audio_allowed_content_types.clone(),
        );

        let uploads = Arc::new(ResumableUploadClient::new(
            transfer,
            validator.clone(),
            config.upload_chunk_size_bytes,
        ));

        let poller = Arc::new(TranscriptionPoller::new(
            status,
            store.clone(),
            PollConfig {
                max_attempts: config.poll_max_attempts,
                interval: Duration::from_secs(config.poll_interval_secs),
            },
        ));

        let signed_url_ttl = Duration::from_secs(config.signed_url_ttl_secs);

        Arc::new(Self {
            config,
            identity,
            tokens,
            media: MediaState {
                storage,
                validator,
                signed_url_ttl,
                uploads,
            },
            jobs: JobState { store, poller },
        })
    }
}
