//! Identity service errors with transient/fatal classification.

use minuta_core::retry::{AttemptFailure, FaultClass, OperationFailed};

/// Errors from the upstream identity/session provider.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Sign-in or sign-up rejected the supplied credentials. Fatal.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The presented token or refresh token is no longer usable. Fatal.
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Upstream fault with a provider code; classified via the transient set.
    #[error("Identity service fault {code}: {message}")]
    Upstream { code: String, message: String },

    /// Transport-level failure. Transient.
    #[error("Network failure reaching identity service: {0}")]
    Network(String),

    /// Response body did not match the expected shape. Fatal.
    #[error("Unexpected identity response: {0}")]
    InvalidResponse(String),

    /// All retry attempts exceeded their per-attempt budget.
    #[error("{operation} timed out after {attempts} attempts")]
    Timeout { operation: String, attempts: u32 },
}

impl FaultClass for IdentityError {
    fn fault_code(&self) -> Option<&str> {
        match self {
            IdentityError::Upstream { code, .. } => Some(code),
            IdentityError::Network(_) => Some("NetworkingError"),
            IdentityError::InvalidCredentials(_)
            | IdentityError::SessionInvalid(_)
            | IdentityError::InvalidResponse(_)
            | IdentityError::Timeout { .. } => None,
        }
    }
}

impl IdentityError {
    /// Collapse a retry-executor failure back into the provider error,
    /// keeping the timeout case distinguishable.
    pub(crate) fn from_retry(failed: OperationFailed<IdentityError>) -> Self {
        match failed.last_error {
            AttemptFailure::Error(err) => err,
            AttemptFailure::TimedOut { .. } => IdentityError::Timeout {
                operation: failed.operation,
                attempts: failed.attempts_made,
            },
        }
    }
}
