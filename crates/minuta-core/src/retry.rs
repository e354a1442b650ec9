//! Retry executor
//!
//! Generic retry-with-timeout wrapper used by every upstream call (identity,
//! storage, transcription status). Each attempt races the operation against a
//! per-attempt timeout; retryable failures wait a fixed delay before the next
//! attempt, non-retryable failures abort immediately without consuming the
//! remaining budget.
//!
//! The timeout is race-and-discard, not true cancellation: the losing future
//! is dropped and the underlying request may still complete upstream. Wrapped
//! operations must therefore be idempotent or side-effect-tolerant under
//! discard; call sites that are not verified idempotent say so.
//!
//! The resumable transfer client keeps its own growing-delay schedule
//! (`minuta-transfer`), deliberately separate from this fixed-delay executor.

use std::fmt;
use std::time::Duration;

use tokio::time::{sleep, timeout};

/// Upstream fault codes treated as transient by the default classification.
pub const TRANSIENT_FAULT_CODES: [&str; 11] = [
    "ThrottlingException",
    "RequestTimeout",
    "RequestTimeoutException",
    "InternalError",
    "InternalServerError",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "SlowDown",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "NetworkingError",
];

/// Whether an upstream fault code is in the transient set.
pub fn is_transient_fault_code(code: &str) -> bool {
    TRANSIENT_FAULT_CODES.contains(&code)
}

/// Implemented by provider error types that can expose an upstream fault code.
pub trait FaultClass {
    /// The upstream fault code, when the error carries one.
    fn fault_code(&self) -> Option<&str>;
}

/// Default retryable classification: transient fault codes plus any error
/// whose message denotes a network failure. Everything else is fatal on
/// first occurrence.
pub fn default_retryable<E: FaultClass + fmt::Display>(err: &E) -> bool {
    if let Some(code) = err.fault_code() {
        return is_transient_fault_code(code);
    }
    let message = err.to_string().to_lowercase();
    message.contains("network") || message.contains("connection")
}

/// Configuration for one retried operation. Immutable per call.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub timeout_per_attempt: Duration,
    pub delay_between_attempts: Duration,
    /// Label used in log lines, e.g. "identity token verification".
    pub operation_label: String,
}

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DELAY: Duration = Duration::from_secs(1);
/// Per-attempt timeout for large-payload transfers (storage puts).
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

impl RetryConfig {
    /// Generic profile: 3 attempts, 10s per attempt, 1s between attempts.
    pub fn new(operation_label: impl Into<String>) -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_per_attempt: DEFAULT_TIMEOUT,
            delay_between_attempts: DEFAULT_DELAY,
            operation_label: operation_label.into(),
        }
    }

    /// Transfer profile: generic defaults with a 30s per-attempt timeout.
    pub fn for_transfer(operation_label: impl Into<String>) -> Self {
        Self {
            timeout_per_attempt: TRANSFER_TIMEOUT,
            ..Self::new(operation_label)
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_timeout_per_attempt(mut self, timeout: Duration) -> Self {
        self.timeout_per_attempt = timeout;
        self
    }

    pub fn with_delay_between_attempts(mut self, delay: Duration) -> Self {
        self.delay_between_attempts = delay;
        self
    }
}

/// How a single attempt failed.
#[derive(Debug)]
pub enum AttemptFailure<E> {
    /// The attempt exceeded `timeout_per_attempt`; the operation was discarded.
    TimedOut { budget: Duration },
    /// The operation itself returned an error.
    Error(E),
}

impl<E: fmt::Display> fmt::Display for AttemptFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::TimedOut { budget } => {
                write!(f, "operation timed out after {}ms", budget.as_millis())
            }
            AttemptFailure::Error(err) => write!(f, "{}", err),
        }
    }
}

/// Terminal failure of a retried operation: the retry budget was exhausted or
/// a non-retryable error occurred. Carries the last attempt's error and how
/// many attempts were made.
#[derive(Debug)]
pub struct OperationFailed<E> {
    pub operation: String,
    pub attempts_made: u32,
    pub last_error: AttemptFailure<E>,
}

impl<E: fmt::Display> fmt::Display for OperationFailed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.operation, self.attempts_made, self.last_error
        )
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for OperationFailed<E> {}

impl<E> OperationFailed<E> {
    /// The inner operation error, when the last failure was not a timeout.
    pub fn into_inner(self) -> Option<E> {
        match self.last_error {
            AttemptFailure::Error(err) => Some(err),
            AttemptFailure::TimedOut { .. } => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.last_error, AttemptFailure::TimedOut { .. })
    }
}

/// Execute `operation` under `config`, classifying failures with
/// `is_retryable`. Returns the operation's value on the first success, or
/// [`OperationFailed`] once the budget is exhausted or a non-retryable error
/// occurs. Safe to invoke concurrently for independent operations; holds no
/// shared state.
pub async fn execute<T, E, F, Fut, P>(
    mut operation: F,
    config: &RetryConfig,
    is_retryable: P,
) -> Result<T, OperationFailed<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if attempt > 1 {
            tracing::info!(
                operation = %config.operation_label,
                attempt,
                max_attempts = config.max_attempts,
                "Retry attempt"
            );
        }

        match timeout(config.timeout_per_attempt, operation()).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = %config.operation_label,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    operation = %config.operation_label,
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %err,
                    "Operation attempt failed"
                );

                if attempt >= config.max_attempts {
                    tracing::error!(
                        operation = %config.operation_label,
                        attempts = attempt,
                        error = %err,
                        "Operation failed after exhausting retries"
                    );
                    return Err(OperationFailed {
                        operation: config.operation_label.clone(),
                        attempts_made: attempt,
                        last_error: AttemptFailure::Error(err),
                    });
                }

                if !is_retryable(&err) {
                    tracing::info!(
                        operation = %config.operation_label,
                        error = %err,
                        "Operation failed with non-retryable error, not retrying further"
                    );
                    return Err(OperationFailed {
                        operation: config.operation_label.clone(),
                        attempts_made: attempt,
                        last_error: AttemptFailure::Error(err),
                    });
                }

                sleep(config.delay_between_attempts).await;
            }
            Err(_elapsed) => {
                tracing::warn!(
                    operation = %config.operation_label,
                    attempt,
                    max_attempts = config.max_attempts,
                    timeout_ms = config.timeout_per_attempt.as_millis() as u64,
                    "Operation attempt timed out"
                );

                if attempt >= config.max_attempts {
                    tracing::error!(
                        operation = %config.operation_label,
                        attempts = attempt,
                        "Operation timed out after exhausting retries"
                    );
                    return Err(OperationFailed {
                        operation: config.operation_label.clone(),
                        attempts_made: attempt,
                        last_error: AttemptFailure::TimedOut {
                            budget: config.timeout_per_attempt,
                        },
                    });
                }

                // Timeouts are transient by definition; wait and go again.
                sleep(config.delay_between_attempts).await;
            }
        }
    }
}
