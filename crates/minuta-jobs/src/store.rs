//! Meeting job store.
//!
//! The durable row store is an external collaborator; this module keeps its
//! repository surface as a trait with an in-memory implementation used by the
//! server process and tests. Terminal-state transitions are enforced here:
//! a completed or failed record never changes state again.

use async_trait::async_trait;
use chrono::Utc;
use minuta_core::models::{Meeting, MeetingStatus};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

/// Repository surface for meeting records, keyed by meeting id.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, meeting: Meeting) -> Result<Meeting, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Meeting>, StoreError>;

    /// Meetings owned by one user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Meeting>, StoreError>;

    async fn rename(&self, id: Uuid, user_id: Uuid, title: String) -> Result<Meeting, StoreError>;

    /// Terminal transition to `Completed` with the transcript.
    async fn complete(&self, id: Uuid, transcript: String, attempts: u32)
        -> Result<(), StoreError>;

    /// Terminal transition to `Failed` with the captured error.
    async fn fail(&self, id: Uuid, error_message: String, attempts: u32)
        -> Result<(), StoreError>;

    /// Returns true when a record was removed.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}

/// In-memory job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    meetings: RwLock<HashMap<Uuid, Meeting>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition<F>(&self, id: Uuid, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Meeting),
    {
        let mut meetings = self.meetings.write().expect("job store poisoned");
        let meeting = meetings.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if meeting.status.is_terminal() {
            return Err(StoreError::TerminalState {
                id,
                status: meeting.status.to_string(),
            });
        }

        apply(meeting);
        meeting.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, meeting: Meeting) -> Result<Meeting, StoreError> {
        let mut meetings = self.meetings.write().expect("job store poisoned");
        meetings.insert(meeting.id, meeting.clone());
        Ok(meeting)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Meeting>, StoreError> {
        let meetings = self.meetings.read().expect("job store poisoned");
        Ok(meetings.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Meeting>, StoreError> {
        let meetings = self.meetings.read().expect("job store poisoned");
        let mut owned: Vec<Meeting> = meetings
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn rename(&self, id: Uuid, user_id: Uuid, title: String) -> Result<Meeting, StoreError> {
        let mut meetings = self.meetings.write().expect("job store poisoned");
        let meeting = meetings.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if meeting.user_id != user_id {
            return Err(StoreError::NotFound(id));
        }
        meeting.title = title;
        meeting.updated_at = Utc::now();
        Ok(meeting.clone())
    }

    async fn complete(
        &self,
        id: Uuid,
        transcript: String,
        attempts: u32,
    ) -> Result<(), StoreError> {
        self.transition(id, |meeting| {
            meeting.status = MeetingStatus::Completed;
            meeting.transcript = Some(transcript);
            meeting.attempts_made = attempts;
        })
    }

    async fn fail(&self, id: Uuid, error_message: String, attempts: u32) -> Result<(), StoreError> {
        self.transition(id, |meeting| {
            meeting.status = MeetingStatus::Failed;
            meeting.error_message = Some(error_message);
            meeting.attempts_made = attempts;
        })
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut meetings = self.meetings.write().expect("job store poisoned");
        match meetings.get(&id) {
            Some(meeting) if meeting.user_id == user_id => {
                meetings.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minuta_core::models::NewMeeting;

    fn meeting(user_id: Uuid) -> Meeting {
        Meeting::create(
            user_id,
            NewMeeting {
                title: "standup".to_string(),
                original_filename: "standup.mp3".to_string(),
                file_id: "f-1".to_string(),
                storage_key: "uploads/a.mp3".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryJobStore::new();
        let user = Uuid::new_v4();
        let created = store.create(meeting(user)).await.unwrap();

        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, MeetingStatus::Processing);
        assert_eq!(fetched.user_id, user);
    }

    #[tokio::test]
    async fn test_complete_is_terminal() {
        let store = InMemoryJobStore::new();
        let created = store.create(meeting(Uuid::new_v4())).await.unwrap();

        store
            .complete(created.id, "hello".to_string(), 5)
            .await
            .unwrap();
        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, MeetingStatus::Completed);
        assert_eq!(fetched.transcript.as_deref(), Some("hello"));
        assert_eq!(fetched.attempts_made, 5);

        // No transition out of a terminal state, in either direction.
        let err = store
            .fail(created.id, "late failure".to_string(), 6)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TerminalState { .. }));
        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, MeetingStatus::Completed);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let store = InMemoryJobStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create(meeting(alice)).await.unwrap();
        store.create(meeting(alice)).await.unwrap();
        store.create(meeting(bob)).await.unwrap();

        assert_eq!(store.list_for_user(alice).await.unwrap().len(), 2);
        assert_eq!(store.list_for_user(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_checks_ownership() {
        let store = InMemoryJobStore::new();
        let owner = Uuid::new_v4();
        let created = store.create(meeting(owner)).await.unwrap();

        let err = store
            .rename(created.id, Uuid::new_v4(), "hijacked".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let renamed = store
            .rename(created.id, owner, "sprint review".to_string())
            .await
            .unwrap();
        assert_eq!(renamed.title, "sprint review");
    }

    #[tokio::test]
    async fn test_delete_checks_ownership() {
        let store = InMemoryJobStore::new();
        let owner = Uuid::new_v4();
        let created = store.create(meeting(owner)).await.unwrap();

        assert!(!store.delete(created.id, Uuid::new_v4()).await.unwrap());
        assert!(store.delete(created.id, owner).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
    }
}
