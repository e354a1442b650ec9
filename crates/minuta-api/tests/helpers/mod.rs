//! Test helpers: build AppState and router with injected doubles.
//!
//! Every upstream backend is an HTTP collaborator, so tests run against
//! scripted doubles instead of containers: a mock identity provider, an
//! in-memory object store, and a scripted transcription status client.

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use minuta_api::constants;
use minuta_api::setup::routes::setup_routes;
use minuta_api::AppState;
use minuta_core::models::{TokenPair, UserProfile};
use minuta_core::{BaseConfig, Config};
use minuta_identity::{IdentityError, IdentityService};
use minuta_jobs::{
    InMemoryJobStore, StatusError, TranscriptionResult, TranscriptionState,
    TranscriptionStatusClient,
};
use minuta_storage::{ObjectStorage, StorageError, StorageResult};
use minuta_transfer::{TransferEndpoint, TransferError, TransferMetadata};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const TEST_EMAIL: &str = "ada@example.com";
pub const TEST_PASSWORD: &str = "Sup3r-secret";
pub const TEST_FULL_NAME: &str = "Ada Lovelace";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Scripted identity provider double.
pub struct MockIdentity {
    pub user: UserProfile,
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    issued: AtomicU32,
    pub sign_up_calls: AtomicU32,
    pub verify_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self {
            user: UserProfile {
                id: Uuid::new_v4(),
                email: TEST_EMAIL.to_string(),
                full_name: TEST_FULL_NAME.to_string(),
            },
            valid_access: Mutex::new(HashSet::new()),
            valid_refresh: Mutex::new(HashSet::new()),
            issued: AtomicU32::new(0),
            sign_up_calls: AtomicU32::new(0),
            verify_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
        }
    }

    fn issue_pair(&self) -> TokenPair {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let pair = TokenPair::new(format!("access-{}", n), format!("refresh-{}", n));
        self.valid_access
            .lock()
            .unwrap()
            .insert(pair.access_token.clone());
        self.valid_refresh
            .lock()
            .unwrap()
            .insert(pair.refresh_token.clone());
        pair
    }

    /// Make an already-issued access token invalid (e.g. expired upstream).
    pub fn expire_access(&self, token: &str) {
        self.valid_access.lock().unwrap().remove(token);
    }

    /// Make an already-issued refresh token invalid (revoked upstream).
    pub fn revoke_refresh(&self, token: &str) {
        self.valid_refresh.lock().unwrap().remove(token);
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        full_name: &str,
    ) -> Result<UserProfile, IdentityError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        if email == TEST_EMAIL && password == TEST_PASSWORD {
            Ok(self.issue_pair())
        } else {
            Err(IdentityError::InvalidCredentials(
                "Invalid login credentials".to_string(),
            ))
        }
    }

    async fn verify_token(&self, access_token: &str) -> Result<UserProfile, IdentityError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.valid_access.lock().unwrap().contains(access_token) {
            Ok(self.user.clone())
        } else {
            Err(IdentityError::SessionInvalid("token expired".to_string()))
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, IdentityError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let known = self.valid_refresh.lock().unwrap().remove(refresh_token);
        if known {
            Ok(self.issue_pair())
        } else {
            Err(IdentityError::SessionInvalid(
                "refresh token revoked".to_string(),
            ))
        }
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

/// In-memory object storage double.
pub struct MockStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(data, _)| Bytes::from(data.clone()))
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let objects = self.objects.lock().unwrap();
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|k| prefix.map(|p| k.starts_with(p)).unwrap_or(true))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn signed_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
        Ok(format!("https://signed.example.com/{}", key))
    }
}

/// In-memory tus endpoint double: stores chunks, tracks offsets.
pub struct MockTransferEndpoint {
    transfers: Mutex<HashMap<String, (TransferMetadata, Vec<u8>)>>,
    counter: AtomicU32,
}

impl MockTransferEndpoint {
    pub fn new() -> Self {
        Self {
            transfers: Mutex::new(HashMap::new()),
            counter: AtomicU32::new(0),
        }
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }
}

#[async_trait]
impl TransferEndpoint for MockTransferEndpoint {
    async fn create(
        &self,
        metadata: &TransferMetadata,
        _total_size: u64,
    ) -> Result<String, TransferError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let url = format!("http://tusd.invalid/files/t-{}", n);
        self.transfers
            .lock()
            .unwrap()
            .insert(url.clone(), (metadata.clone(), Vec::new()));
        Ok(url)
    }

    async fn offset(&self, transfer_url: &str) -> Result<u64, TransferError> {
        self.transfers
            .lock()
            .unwrap()
            .get(transfer_url)
            .map(|(_, data)| data.len() as u64)
            .ok_or_else(|| TransferError::Rejected {
                status: 404,
                message: "unknown transfer".to_string(),
            })
    }

    async fn write_chunk(
        &self,
        transfer_url: &str,
        offset: u64,
        chunk: &[u8],
    ) -> Result<u64, TransferError> {
        let mut transfers = self.transfers.lock().unwrap();
        let (_, data) = transfers
            .get_mut(transfer_url)
            .ok_or_else(|| TransferError::Rejected {
                status: 404,
                message: "unknown transfer".to_string(),
            })?;
        if offset != data.len() as u64 {
            return Err(TransferError::Rejected {
                status: 409,
                message: "offset mismatch".to_string(),
            });
        }
        data.extend_from_slice(chunk);
        Ok(data.len() as u64)
    }
}

/// Scripted transcription status double: pops responses in order, then
/// repeats the final fallback.
pub struct ScriptedStatus {
    responses: Mutex<VecDeque<TranscriptionResult>>,
    fallback: TranscriptionResult,
}

impl ScriptedStatus {
    pub fn completing_with(text: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: TranscriptionResult {
                status: TranscriptionState::Completed,
                text: Some(text.to_string()),
                error: None,
            },
        }
    }

    pub fn failing_with(error: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: TranscriptionResult {
                status: TranscriptionState::Failed,
                text: None,
                error: Some(error.to_string()),
            },
        }
    }
}

#[async_trait]
impl TranscriptionStatusClient for ScriptedStatus {
    async fn fetch_status(&self, _file_id: &str) -> Result<TranscriptionResult, StatusError> {
        let mut responses = self.responses.lock().unwrap();
        Ok(responses.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

pub fn test_config() -> Config {
    Config {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
        },
        identity_url: "http://identity.invalid".to_string(),
        identity_api_key: "anon-key".to_string(),
        s3_bucket: "meetings-audio".to_string(),
        s3_region: "eu-west-1".to_string(),
        s3_endpoint: None,
        transfer_endpoint: "http://tusd.invalid/files/".to_string(),
        transcription_api_url: "http://transcription.invalid".to_string(),
        max_audio_size_bytes: 10 * 1024 * 1024,
        audio_allowed_extensions: vec!["mp3".to_string(), "wav".to_string(), "m4a".to_string()],
        audio_allowed_content_types: vec![
            "audio/mpeg".to_string(),
            "audio/wav".to_string(),
            "audio/mp4".to_string(),
        ],
        upload_chunk_size_bytes: 1024,
        poll_max_attempts: 30,
        // Keep background polling instantaneous in tests.
        poll_interval_secs: 0,
        signed_url_ttl_secs: 3600,
    }
}

/// Test application with handles to all doubles.
pub struct TestApp {
    pub server: TestServer,
    pub identity: Arc<MockIdentity>,
    pub storage: Arc<MockStorage>,
    pub transfer: Arc<MockTransferEndpoint>,
    pub store: Arc<InMemoryJobStore>,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_status(ScriptedStatus::completing_with("hello team")).await
}

pub async fn setup_test_app_with_status(status: ScriptedStatus) -> TestApp {
    let config = test_config();
    let identity = Arc::new(MockIdentity::new());
    let storage = Arc::new(MockStorage::new());
    let transfer = Arc::new(MockTransferEndpoint::new());
    let store = Arc::new(InMemoryJobStore::new());

    let state = AppState::new(
        config.clone(),
        identity.clone(),
        storage.clone(),
        transfer.clone(),
        store.clone(),
        Arc::new(status),
    );

    let router = setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        identity,
        storage,
        transfer,
        store,
    }
}

/// Login with the test account; returns the bearer token and the two
/// Set-Cookie values from the response.
pub async fn login(app: &TestApp) -> (String, Vec<String>) {
    let response = app
        .server
        .post(&api_path("/auth/login"))
        .json(&serde_json::json!({
            "email": TEST_EMAIL,
            "password": TEST_PASSWORD,
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let access_token = body["access_token"].as_str().unwrap().to_string();
    (access_token, set_cookies(&response))
}

/// All Set-Cookie header values on a response.
pub fn set_cookies(response: &axum_test::TestResponse) -> Vec<String> {
    response
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Build a Cookie request header from Set-Cookie values (name=value parts).
pub fn cookie_header(set_cookie_values: &[String]) -> String {
    set_cookie_values
        .iter()
        .filter_map(|c| c.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}
