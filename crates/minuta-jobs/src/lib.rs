//! Minuta Jobs Library
//!
//! Transcription job records and the bounded polling state machine that
//! drives each job from submission to its terminal state.

pub mod error;
pub mod poller;
pub mod status;
pub mod store;

// Re-export commonly used types
pub use error::{PollError, StatusError, StoreError};
pub use poller::{PollConfig, TranscriptionPoller};
pub use status::{
    HttpTranscriptionClient, TranscriptionResult, TranscriptionState, TranscriptionStatusClient,
};
pub use store::{InMemoryJobStore, JobStore};
