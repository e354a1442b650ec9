//! Minuta Core Library
//!
//! This crate provides core domain models, error types, configuration, the
//! retry executor, and upload validation shared across all Minuta components.

pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use retry::{
    default_retryable, AttemptFailure, FaultClass, OperationFailed, RetryConfig,
    TRANSIENT_FAULT_CODES,
};
pub use validation::{AudioValidator, ValidationError};
