//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::auth;
use crate::error;
use crate::handlers;
use minuta_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Minuta API",
        version = "0.1.0",
        description = "Meeting recording API: authentication with cookie-based session refresh, resumable audio uploads to object storage, and background transcription. All endpoints are versioned under /api/v1/."
    ),
    paths(
        // Auth
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::me,
        // Meetings
        handlers::meetings::create_meeting,
        handlers::meetings::upload_meeting,
        handlers::meetings::list_meetings,
        handlers::meetings::get_meeting,
        handlers::meetings::rename_meeting,
        handlers::meetings::delete_meeting,
        // Files
        handlers::files::upload_file,
        handlers::files::get_file,
        handlers::files::delete_file,
        handlers::files::list_files,
    ),
    components(schemas(
        models::Meeting,
        models::MeetingStatus,
        models::UserProfile,
        auth::AuthChallenge,
        error::ErrorResponse,
        handlers::auth::SignupRequest,
        handlers::auth::LoginRequest,
        handlers::auth::SignupResponse,
        handlers::auth::LoginResponse,
        handlers::auth::MessageResponse,
        handlers::meetings::CreateMeetingRequest,
        handlers::meetings::RenameMeetingRequest,
        handlers::files::UploadFileResponse,
        handlers::files::FileEntry,
        handlers::files::ListFilesResponse,
    )),
    tags(
        (name = "auth", description = "Authentication and session lifecycle"),
        (name = "meetings", description = "Meeting records and transcription"),
        (name = "files", description = "Recording storage proxy")
    )
)]
pub struct ApiDoc;
