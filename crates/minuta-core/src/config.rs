//! Configuration module
//!
//! Environment-driven configuration for the API and background services:
//! server settings, upstream endpoints (identity, storage, transfer,
//! transcription), upload limits, and polling cadence.

use std::env;

// Common constants
const DEFAULT_PORT: u16 = 4000;
const MAX_AUDIO_SIZE_MB: usize = 100;
const POLL_MAX_ATTEMPTS: u32 = 30;
const POLL_INTERVAL_SECS: u64 = 3;
const UPLOAD_CHUNK_SIZE_BYTES: usize = 4 * 1024 * 1024;
const SIGNED_URL_TTL_SECS: u64 = 3600;

/// Base configuration shared by the server and workers
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    // Identity service (session + user records)
    pub identity_url: String,
    pub identity_api_key: String,
    // Object storage
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    // Resumable transfer endpoint (tus daemon)
    pub transfer_endpoint: String,
    // Transcription status endpoint
    pub transcription_api_url: String,
    // Upload limits
    pub max_audio_size_bytes: usize,
    pub audio_allowed_extensions: Vec<String>,
    pub audio_allowed_content_types: Vec<String>,
    pub upload_chunk_size_bytes: usize,
    // Transcription polling
    pub poll_max_attempts: u32,
    pub poll_interval_secs: u64,
    // Signed URL lifetime for downloads
    pub signed_url_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
        };

        let config = Config {
            base,
            identity_url: env::var("IDENTITY_URL")
                .map_err(|_| anyhow::anyhow!("IDENTITY_URL must be set"))?,
            identity_api_key: env::var("IDENTITY_API_KEY")
                .map_err(|_| anyhow::anyhow!("IDENTITY_API_KEY must be set"))?,
            s3_bucket: env::var("S3_BUCKET").map_err(|_| anyhow::anyhow!("S3_BUCKET must be set"))?,
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .map_err(|_| anyhow::anyhow!("S3_REGION or AWS_REGION must be set"))?,
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            transfer_endpoint: env::var("TRANSFER_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:1080/files/".to_string()),
            transcription_api_url: env::var("TRANSCRIPTION_API_URL")
                .map_err(|_| anyhow::anyhow!("TRANSCRIPTION_API_URL must be set"))?,
            max_audio_size_bytes: env::var("MAX_AUDIO_SIZE_MB")
                .unwrap_or_else(|_| MAX_AUDIO_SIZE_MB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_AUDIO_SIZE_MB)
                * 1024
                * 1024,
            audio_allowed_extensions: env::var("AUDIO_ALLOWED_EXTENSIONS")
                .unwrap_or_else(|_| "mp3,m4a,wav,flac,ogg".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .collect(),
            audio_allowed_content_types: env::var("AUDIO_ALLOWED_CONTENT_TYPES")
                .unwrap_or_else(|_| {
                    "audio/mpeg,audio/mp4,audio/x-m4a,audio/wav,audio/flac,audio/ogg".to_string()
                })
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .collect(),
            upload_chunk_size_bytes: env::var("UPLOAD_CHUNK_SIZE_BYTES")
                .unwrap_or_else(|_| UPLOAD_CHUNK_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(UPLOAD_CHUNK_SIZE_BYTES),
            poll_max_attempts: env::var("TRANSCRIPTION_POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| POLL_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(POLL_MAX_ATTEMPTS),
            poll_interval_secs: env::var("TRANSCRIPTION_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| POLL_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(POLL_INTERVAL_SECS),
            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .unwrap_or_else(|_| SIGNED_URL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_TTL_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.identity_url.starts_with("http://") && !self.identity_url.starts_with("https://") {
            return Err(anyhow::anyhow!("IDENTITY_URL must be an http(s) URL"));
        }

        if !self.transcription_api_url.starts_with("http://")
            && !self.transcription_api_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!("TRANSCRIPTION_API_URL must be an http(s) URL"));
        }

        if self.s3_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("S3_BUCKET cannot be empty"));
        }

        if self.poll_max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "TRANSCRIPTION_POLL_MAX_ATTEMPTS must be at least 1"
            ));
        }

        if self.upload_chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_CHUNK_SIZE_BYTES must be greater than 0"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }
}
