//! Upload sessions and the local resumability index.
//!
//! The index remembers interrupted transfers by file fingerprint so a later
//! attempt can resume. It only stores the transfer URL and coarse progress;
//! the resume offset itself always comes from the server.

use std::collections::HashMap;
use std::sync::Mutex;

/// Reuse key for resuming an interrupted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileFingerprint {
    pub filename: String,
    pub size: u64,
}

/// One file transfer in flight.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub fingerprint: FileFingerprint,
    pub transfer_url: String,
    /// Server-confirmed offset; never trusted from local cache alone.
    pub resume_offset: u64,
    pub completed: bool,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    transfer_url: String,
    object_path: String,
    percent: u8,
}

/// Local index of incomplete transfers, cleared on completion.
#[derive(Debug, Default)]
pub struct ResumabilityIndex {
    entries: Mutex<HashMap<FileFingerprint, IndexEntry>>,
}

/// Progress is persisted at this granularity to keep index churn low.
const PROGRESS_GRANULARITY_PERCENT: u8 = 5;

impl ResumabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previous incomplete transfer for this fingerprint.
    pub fn find(&self, fingerprint: &FileFingerprint) -> Option<(String, String)> {
        let entries = self.entries.lock().expect("resumability index poisoned");
        entries
            .get(fingerprint)
            .map(|e| (e.transfer_url.clone(), e.object_path.clone()))
    }

    /// Remember a newly created transfer.
    pub fn record(&self, fingerprint: FileFingerprint, transfer_url: String, object_path: String) {
        let mut entries = self.entries.lock().expect("resumability index poisoned");
        entries.insert(
            fingerprint,
            IndexEntry {
                transfer_url,
                object_path,
                percent: 0,
            },
        );
    }

    /// Persist progress at 5% granularity.
    pub fn record_progress(&self, fingerprint: &FileFingerprint, percent: u8) {
        let coarse = percent - (percent % PROGRESS_GRANULARITY_PERCENT);
        let mut entries = self.entries.lock().expect("resumability index poisoned");
        if let Some(entry) = entries.get_mut(fingerprint) {
            if coarse > entry.percent {
                entry.percent = coarse;
                tracing::debug!(
                    filename = %fingerprint.filename,
                    percent = coarse,
                    "Upload progress persisted"
                );
            }
        }
    }

    /// Recorded coarse progress, if any.
    pub fn progress(&self, fingerprint: &FileFingerprint) -> Option<u8> {
        let entries = self.entries.lock().expect("resumability index poisoned");
        entries.get(fingerprint).map(|e| e.percent)
    }

    /// Drop the entry once the transfer completes.
    pub fn clear(&self, fingerprint: &FileFingerprint) {
        let mut entries = self.entries.lock().expect("resumability index poisoned");
        entries.remove(fingerprint);
    }
}
