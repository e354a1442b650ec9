//! Transcription job errors.

use uuid::Uuid;

/// Terminal outcomes of the polling loop, distinct from each other: a job
/// that reported failure is not the same as one that never finished.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The attempt budget ran out while the job was still processing.
    #[error("Transcription still processing after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    /// The job reached the `Failed` state upstream.
    #[error("Transcription failed: {message}")]
    JobFailed { message: String },

    /// The status endpoint could not be read.
    #[error("Transcription status fetch failed: {0}")]
    Fetch(String),
}

/// Job store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Meeting not found: {0}")]
    NotFound(Uuid),

    /// A terminal record never transitions again.
    #[error("Meeting {id} is already {status} and cannot change state")]
    TerminalState { id: Uuid, status: String },

    #[error("Job store backend error: {0}")]
    Backend(String),
}

/// Status endpoint errors, classified for the retry executor.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Network failure reaching transcription service: {0}")]
    Network(String),

    #[error("Transcription service fault {code}: {message}")]
    Upstream { code: String, message: String },

    #[error("Unexpected transcription response: {0}")]
    InvalidResponse(String),

    #[error("{operation} timed out after {attempts} attempts")]
    Timeout { operation: String, attempts: u32 },
}

impl minuta_core::retry::FaultClass for StatusError {
    fn fault_code(&self) -> Option<&str> {
        match self {
            StatusError::Upstream { code, .. } => Some(code),
            StatusError::Network(_) => Some("NetworkingError"),
            StatusError::InvalidResponse(_) | StatusError::Timeout { .. } => None,
        }
    }
}
