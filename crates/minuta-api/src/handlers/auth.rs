//! Authentication handlers: signup, login, refresh, logout, current user.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use minuta_core::models::UserProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::SessionContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "Password must be 8-72 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    /// Short-lived bearer token for the Authorization header. Not persisted
    /// server-side; the refresh token travels only in the cookie.
    pub access_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Password strength rule: upper, lower, digit, and special character.
fn password_strength_ok(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User signed up", body = SignupResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Rejected by identity service", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    if !password_strength_ok(&request.password) {
        return Err(HttpAppError::from(minuta_core::AppError::InvalidInput(
            "Password must contain upper and lower case letters, a digit, and a special character"
                .to_string(),
        )));
    }

    let user = state
        .identity
        .sign_up(&request.email, &request.password, &request.full_name)
        .await?;

    tracing::info!(user = %user.email, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User signed up successfully!".to_string(),
            user,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; auth cookies set", body = LoginResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, HttpAppError> {
    request.validate()?;

    let pair = state
        .identity
        .sign_in(&request.email, &request.password)
        .await?;

    let mut response = Json(LoginResponse {
        message: "Login successful!".to_string(),
        access_token: pair.access_token.clone(),
    })
    .into_response();
    state.tokens.issue(response.headers_mut(), &pair);

    tracing::debug!(email = %request.email, "User logged in");
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Tokens refreshed; cookies re-issued", body = MessageResponse),
        (status = 401, description = "Refresh failed; cookies cleared", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let mut cookies = HeaderMap::new();
    let refreshed = state.tokens.refresh(&headers, &mut cookies).await;

    let mut response = if refreshed {
        Json(MessageResponse {
            message: "Tokens refreshed successfully".to_string(),
        })
        .into_response()
    } else {
        HttpAppError::from(minuta_core::AppError::SessionExpired(
            "Unable to refresh session. Please sign in again.".to_string(),
        ))
        .into_response()
    };
    response.headers_mut().extend(cookies);
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out; cookies cleared", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<Response, HttpAppError> {
    // Upstream invalidation is separate from cookie revocation; a failed
    // upstream sign-out still clears the local session.
    if let Err(err) = state.identity.sign_out(&session.access_token).await {
        tracing::warn!(error = %err, "Upstream sign-out failed");
    }

    let mut response = Json(MessageResponse {
        message: "Logout successful".to_string(),
    })
    .into_response();
    state.tokens.revoke(response.headers_mut());

    tracing::debug!(user = %session.user.email, "User logged out");
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = UserProfile),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn me(session: SessionContext) -> Json<UserProfile> {
    Json(session.user)
}
