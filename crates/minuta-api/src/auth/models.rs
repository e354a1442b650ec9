//! Session context attached to authenticated requests.

use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use minuta_core::models::UserProfile;

/// Principal and bearer token resolved by the auth gate, carried through the
/// request pipeline as an explicit value rather than re-read from request
/// internals.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: UserProfile,
    pub access_token: String,
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Missing session context".to_string(),
                        details: None,
                        error_type: None,
                        code: "MISSING_SESSION_CONTEXT".to_string(),
                        recoverable: false,
                        suggested_action: Some("Check authentication token".to_string()),
                    }),
                )
            })
    }
}
