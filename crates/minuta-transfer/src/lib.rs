//! Minuta Transfer Library
//!
//! Resumable upload client over a tus-style offset protocol: chunked
//! transfer with server-acknowledged offsets, resume-from-previous-attempt,
//! a growing-delay transport retry schedule, and progress reporting over an
//! event channel.

pub mod client;
pub mod error;
pub mod protocol;
pub mod session;

// Re-export commonly used types
pub use client::{ResumableUploadClient, UploadOutcome, UploadProgress, RETRY_DELAYS};
pub use error::TransferError;
pub use protocol::{HttpTransferEndpoint, TransferEndpoint, TransferMetadata};
pub use session::{FileFingerprint, ResumabilityIndex, UploadSession};
