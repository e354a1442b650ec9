//! File handlers: storage proxy for recording uploads and downloads.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use minuta_core::AppError;
use minuta_storage::keys;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::SessionContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::auth::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub download: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadFileResponse {
    pub message: String,
    pub key: String,
    /// Presigned URL for temporary access.
    pub url: String,
    pub original_name: String,
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileEntry {
    pub key: String,
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListFilesResponse {
    pub message: String,
    pub files: Vec<FileEntry>,
}

#[utoipa::path(
    post,
    path = "/api/v1/files",
    tag = "files",
    responses(
        (status = 201, description = "File uploaded", body = UploadFileResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
pub async fn upload_file(
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

    // Rejected before any storage call.
    state
        .media
        .validator
        .validate_upload(&filename, &content_type, data.len())
        .map_err(HttpAppError::from)?;

    let key = keys::upload_key(&filename, None);
    state.media.storage.put(&key, data, &content_type).await?;
    let url = state
        .media
        .storage
        .signed_url(&key, state.media.signed_url_ttl)
        .await?;

    tracing::info!(
        key = %key,
        user_id = %session.user.id,
        "File uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadFileResponse {
            message: "File uploaded successfully".to_string(),
            key,
            url,
            original_name: filename,
            content_type,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{key}",
    tag = "files",
    params(
        ("key" = String, Path, description = "Object key"),
        ("download" = Option<bool>, Query, description = "Serve as attachment")
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    _session: SessionContext,
    Path(key): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    let bytes = state.media.storage.get(&key).await?;
    let content_type = keys::content_type_for_key(&key);

    let mut response = (
        [(header::CONTENT_TYPE, content_type.to_string())],
        bytes,
    )
        .into_response();

    if query.download {
        let filename = key.rsplit('/').next().unwrap_or(&key).to_string();
        if let Ok(value) =
            header::HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/{key}",
    tag = "files",
    params(("key" = String, Path, description = "Object key")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    state.media.storage.delete(&key).await?;

    tracing::info!(key = %key, user_id = %session.user.id, "File deleted");

    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "files",
    params(("prefix" = Option<String>, Query, description = "Key prefix filter")),
    responses(
        (status = 200, description = "Files with presigned URLs", body = ListFilesResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    _session: SessionContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListFilesResponse>, HttpAppError> {
    let keys = state.media.storage.list(query.prefix.as_deref()).await?;

    let mut files = Vec::with_capacity(keys.len());
    for key in keys {
        let url = state
            .media
            .storage
            .signed_url(&key, state.media.signed_url_ttl)
            .await?;
        let filename = key.rsplit('/').next().unwrap_or(&key).to_string();
        files.push(FileEntry { key, url, filename });
    }

    Ok(Json(ListFilesResponse {
        message: "Files retrieved successfully".to_string(),
        files,
    }))
}
