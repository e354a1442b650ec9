//! Meeting handlers: CRUD over the job store plus transcription kickoff.
//!
//! Creating a meeting from a completed upload starts the background polling
//! task that drives the job record to its terminal state.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use minuta_core::models::{Meeting, NewMeeting};
use minuta_core::AppError;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::SessionContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::auth::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMeetingRequest {
    /// Defaults to the filename without its extension.
    #[serde(default)]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "original_filename is required"))]
    pub original_filename: String,
    #[validate(length(min = 1, message = "file_id is required"))]
    pub file_id: String,
    #[validate(length(min = 1, message = "storage_key is required"))]
    pub storage_key: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameMeetingRequest {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/meetings",
    tag = "meetings",
    request_body = CreateMeetingRequest,
    responses(
        (status = 201, description = "Meeting created, transcription started", body = Meeting),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<CreateMeetingRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let title = request.title.unwrap_or_else(|| {
        request
            .original_filename
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| request.original_filename.clone())
    });

    let meeting = state
        .jobs
        .store
        .create(Meeting::create(
            session.user.id,
            NewMeeting {
                title,
                original_filename: request.original_filename,
                file_id: request.file_id.clone(),
                storage_key: request.storage_key,
            },
        ))
        .await?;

    // Fire-and-forget: the poll outcome lands in the job record either way.
    state.jobs.poller.spawn(meeting.id, request.file_id);

    tracing::info!(
        meeting_id = %meeting.id,
        user_id = %session.user.id,
        "Meeting created, transcription in progress"
    );

    Ok((StatusCode::CREATED, Json(meeting)))
}

#[utoipa::path(
    post,
    path = "/api/v1/meetings/upload",
    tag = "meetings",
    responses(
        (status = 201, description = "Recording uploaded, transcription started", body = Meeting),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 502, description = "Transfer failed", body = ErrorResponse)
    )
)]
pub async fn upload_meeting(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|f| f.to_string())
                .ok_or_else(|| AppError::InvalidInput("File field missing a filename".to_string()))?;
            let content_type = field
                .content_type()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
            file = Some((filename, content_type, data.to_vec()));
        }
    }

    let Some((filename, content_type, data)) = file else {
        return Err(HttpAppError::from(AppError::InvalidInput(
            "No file uploaded".to_string(),
        )));
    };

    // Resumable transfer to object storage; validation happens inside the
    // client before any network call.
    let (progress_tx, mut progress_rx) =
        tokio::sync::mpsc::unbounded_channel::<minuta_transfer::UploadProgress>();
    let progress_filename = filename.clone();
    tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            tracing::debug!(
                filename = %progress_filename,
                bytes_uploaded = progress.bytes_uploaded,
                bytes_total = progress.bytes_total,
                percent = progress.percent,
                "Upload progress"
            );
        }
    });

    let outcome = state
        .media
        .uploads
        .upload(&filename, &content_type, &data, Some(progress_tx))
        .await?;

    let title = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem.to_string())
        .unwrap_or_else(|| filename.clone());

    let meeting = state
        .jobs
        .store
        .create(Meeting::create(
            session.user.id,
            NewMeeting {
                title,
                original_filename: filename,
                file_id: outcome.transfer_id.clone(),
                storage_key: outcome.storage_key,
            },
        ))
        .await?;

    state.jobs.poller.spawn(meeting.id, outcome.transfer_id);

    tracing::info!(
        meeting_id = %meeting.id,
        user_id = %session.user.id,
        "Recording uploaded, transcription in progress"
    );

    Ok((StatusCode::CREATED, Json(meeting)))
}

#[utoipa::path(
    get,
    path = "/api/v1/meetings",
    tag = "meetings",
    responses(
        (status = 200, description = "Meetings owned by the current user", body = [Meeting]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn list_meetings(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<Json<Vec<Meeting>>, HttpAppError> {
    let meetings = state.jobs.store.list_for_user(session.user.id).await?;
    Ok(Json(meetings))
}

#[utoipa::path(
    get,
    path = "/api/v1/meetings/{id}",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID")),
    responses(
        (status = 200, description = "Meeting detail", body = Meeting),
        (status = 404, description = "Meeting not found", body = ErrorResponse)
    )
)]
pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Meeting>, HttpAppError> {
    let meeting = state
        .jobs
        .store
        .get(id)
        .await?
        .filter(|m| m.user_id == session.user.id)
        .ok_or_else(|| AppError::NotFound(format!("Meeting not found: {}", id)))?;
    Ok(Json(meeting))
}

#[utoipa::path(
    patch,
    path = "/api/v1/meetings/{id}",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID")),
    request_body = RenameMeetingRequest,
    responses(
        (status = 200, description = "Meeting renamed", body = Meeting),
        (status = 404, description = "Meeting not found", body = ErrorResponse)
    )
)]
pub async fn rename_meeting(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameMeetingRequest>,
) -> Result<Json<Meeting>, HttpAppError> {
    request.validate()?;
    let meeting = state
        .jobs
        .store
        .rename(id, session.user.id, request.title)
        .await?;
    Ok(Json(meeting))
}

#[utoipa::path(
    delete,
    path = "/api/v1/meetings/{id}",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID")),
    responses(
        (status = 200, description = "Meeting deleted", body = MessageResponse),
        (status = 404, description = "Meeting not found", body = ErrorResponse)
    )
)]
pub async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let deleted = state.jobs.store.delete(id, session.user.id).await?;
    if !deleted {
        return Err(HttpAppError::from(AppError::NotFound(format!(
            "Meeting not found: {}",
            id
        ))));
    }
    Ok(Json(MessageResponse {
        message: "Meeting deleted".to_string(),
    }))
}
