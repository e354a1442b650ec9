//! Error types module
//!
//! This module provides the core error types used throughout the Minuta
//! application. All errors are unified under the `AppError` enum which can
//! represent upstream identity/storage faults, transfer and transcription
//! failures, validation problems, and session lifecycle errors.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like upstream throttling
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "SESSION_EXPIRED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Identity service error: {0}")]
    Identity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Operation {operation} timed out after {attempts} attempts")]
    Timeout { operation: String, attempts: u32 },

    #[error("Transcription still processing after {attempts} poll attempts")]
    PollTimeout { attempts: u32 },

    #[error("Transcription job failed: {message}")]
    JobFailed { message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Identity(_) => (
            502,
            "IDENTITY_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Transfer(_) => (
            502,
            "TRANSFER_ERROR",
            true,
            Some("Resume the upload; the server keeps the confirmed offset"),
            false,
            LogLevel::Warn,
        ),
        AppError::Transcription(_) => (
            502,
            "TRANSCRIPTION_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size or use the resumable upload endpoint"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check authentication token"),
            false,
            LogLevel::Debug,
        ),
        AppError::SessionExpired(_) => (
            401,
            "SESSION_EXPIRED",
            false,
            Some("Sign in again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Timeout { .. } => (
            504,
            "OPERATION_TIMEOUT",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::PollTimeout { .. } => (
            504,
            "POLL_TIMEOUT",
            true,
            Some("Check the transcription job status again later"),
            false,
            LogLevel::Warn,
        ),
        AppError::JobFailed { .. } => (
            502,
            "JOB_FAILED",
            false,
            Some("Upload the recording again"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Identity(_) => "Identity",
            AppError::Storage(_) => "Storage",
            AppError::Transfer(_) => "Transfer",
            AppError::Transcription(_) => "Transcription",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::SessionExpired(_) => "SessionExpired",
            AppError::Timeout { .. } => "Timeout",
            AppError::PollTimeout { .. } => "PollTimeout",
            AppError::JobFailed { .. } => "JobFailed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Identity(_) => "Failed to reach the identity service".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Transfer(ref msg) => msg.clone(),
            AppError::Transcription(_) => "Failed to reach the transcription service".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::SessionExpired(ref msg) => msg.clone(),
            AppError::Timeout {
                operation,
                attempts,
            } => {
                format!("{} timed out after {} attempts", operation, attempts)
            }
            AppError::PollTimeout { attempts, .. } => {
                format!("Transcription did not finish within {} checks", attempts)
            }
            AppError::JobFailed { message, .. } => {
                format!("Transcription failed: {}", message)
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_identity() {
        let err = AppError::Identity("connection refused".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "IDENTITY_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to reach the identity service");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Meeting not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Meeting not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_session_expired() {
        let err = AppError::SessionExpired("refresh failed".to_string());
        assert_eq!(err.http_status_code(), 401);
        assert_eq!(err.error_code(), "SESSION_EXPIRED");
        assert!(!err.is_recoverable());
        assert_eq!(err.suggested_action(), Some("Sign in again"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_poll_timeout() {
        let err = AppError::PollTimeout { attempts: 30 };
        assert_eq!(err.http_status_code(), 504);
        assert_eq!(err.error_code(), "POLL_TIMEOUT");
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("30"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_job_failed_distinct_from_poll_timeout() {
        let failed = AppError::JobFailed {
            message: "audio unreadable".to_string(),
        };
        let timeout = AppError::PollTimeout { attempts: 30 };
        assert_ne!(failed.error_code(), timeout.error_code());
        assert!(failed.client_message().contains("audio unreadable"));
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("socket closed").context("request aborted");
        let err = AppError::InternalWithSource {
            message: "request aborted".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by:"));
    }
}
