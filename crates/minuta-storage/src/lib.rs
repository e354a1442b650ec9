//! Minuta Storage Library
//!
//! Object storage abstraction and the S3 implementation. Every backend call
//! passes through the retry executor with AWS-style fault codes as the
//! retryable set.
//!
//! # Storage key format
//!
//! Keys are `uploads/{uuid}.{ext}`; generation is centralized in the `keys`
//! module so all callers stay consistent.

pub mod keys;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use s3::S3ObjectStorage;
pub use traits::{ObjectStorage, StorageError, StorageResult};
