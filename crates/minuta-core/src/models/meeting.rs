//! Meeting record: one uploaded recording and its transcription job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a transcription job. `Completed` and `Failed` are terminal;
/// a record never transitions out of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Processing,
    Completed,
    Failed,
}

impl MeetingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MeetingStatus::Completed | MeetingStatus::Failed)
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::Processing => write!(f, "processing"),
            MeetingStatus::Completed => write!(f, "completed"),
            MeetingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A meeting recording and the state of its transcription.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Meeting {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub original_filename: String,
    /// Identifier assigned by the transfer endpoint; the transcription engine
    /// keys its jobs by this.
    pub file_id: String,
    pub storage_key: String,
    pub status: MeetingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Poll attempts consumed before the job reached a terminal state.
    pub attempts_made: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a meeting record after a successful upload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewMeeting {
    pub title: String,
    pub original_filename: String,
    pub file_id: String,
    pub storage_key: String,
}

impl Meeting {
    /// A fresh record starts in `Processing`, created when the upload succeeds.
    pub fn create(user_id: Uuid, new: NewMeeting) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: new.title,
            original_filename: new.original_filename,
            file_id: new.file_id,
            storage_key: new.storage_key,
            status: MeetingStatus::Processing,
            transcript: None,
            error_message: None,
            attempts_made: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
