//! Auth gate middleware.
//!
//! Per-request authorization state machine. Token extraction strictly
//! precedes verification, which strictly precedes the single permitted
//! refresh fallback; refresh is attempted at most once per request to bound
//! latency and avoid refresh loops.
//!
//! After a successful refresh the gate answers 401 with `token_refreshed:
//! true`, instructing the caller to re-issue the same request with the new
//! credentials. The gate never buffers or replays the original request.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use minuta_identity::{TokenExtraction, TokenLifecycleManager};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::models::SessionContext;
use crate::state::AppState;

/// 401 body shape: `token_refreshed = true` means the cookies now carry a
/// fresh session and the caller should retry the same request.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthChallenge {
    pub message: String,
    pub token_refreshed: bool,
}

fn unauthorized(message: &str, token_refreshed: bool, cookies: HeaderMap) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(AuthChallenge {
            message: message.to_string(),
            token_refreshed,
        }),
    )
        .into_response();
    response.headers_mut().extend(cookies);
    response
}

pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match TokenLifecycleManager::extract(request.headers()) {
        TokenExtraction::Token(access_token) => {
            match state.identity.verify_token(&access_token).await {
                Ok(user) => {
                    tracing::debug!(user = %user.email, "User authenticated");
                    request.extensions_mut().insert(SessionContext {
                        user,
                        access_token,
                    });
                    next.run(request).await
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Token verification failed");
                    // One refresh fallback before failing terminally.
                    let mut cookies = HeaderMap::new();
                    if state.tokens.refresh(request.headers(), &mut cookies).await {
                        unauthorized("Access token refreshed. Retry the request.", true, cookies)
                    } else {
                        unauthorized("Invalid or expired token.", false, cookies)
                    }
                }
            }
        }
        TokenExtraction::RefreshNeeded => {
            let mut cookies = HeaderMap::new();
            if state.tokens.refresh(request.headers(), &mut cookies).await {
                unauthorized("Access token refreshed. Retry the request.", true, cookies)
            } else {
                unauthorized("Session expired. Please sign in again.", false, cookies)
            }
        }
        TokenExtraction::Missing => {
            tracing::debug!("Authentication failed: no credentials attached");
            unauthorized("Authorization header missing", false, HeaderMap::new())
        }
    }
}
