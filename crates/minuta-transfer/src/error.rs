//! Resumable transfer errors.

use minuta_core::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport-level failure; retried under the growing-delay schedule.
    #[error("Transfer network failure: {0}")]
    Network(String),

    /// The endpoint answered outside the offset protocol (missing headers,
    /// unparseable offset). Fatal.
    #[error("Transfer protocol violation: {0}")]
    Protocol(String),

    /// The endpoint refused the request.
    #[error("Transfer rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The growing-delay schedule was exhausted by consecutive failures.
    #[error("Transfer failed after {attempts} consecutive attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl TransferError {
    /// Whether the transport retry schedule applies. Offset conflicts (409)
    /// are retried because the follow-up probe re-reads the server's offset.
    pub fn is_transport(&self) -> bool {
        match self {
            TransferError::Network(_) => true,
            TransferError::Rejected { status, .. } => {
                *status >= 500 || *status == 429 || *status == 409
            }
            TransferError::Validation(_)
            | TransferError::Protocol(_)
            | TransferError::Exhausted { .. } => false,
        }
    }
}
