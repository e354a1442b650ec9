//! Token pair and session marker models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair returned by the identity service.
///
/// The access token is short-lived and handed back to the caller for bearer
/// use; it is never persisted server-side beyond the response. The refresh
/// token is long-lived and lives only in an HTTP-only cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Non-sensitive cookie payload indicating a logged-in session exists without
/// carrying the access token itself.
///
/// A marker with `logged_in = true` on a request that carries no usable
/// access token means a refresh must be attempted before the request can
/// proceed. `expires_at` is epoch milliseconds and advisory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMarker {
    pub expires_at: i64,
    pub logged_in: bool,
}

impl SessionMarker {
    /// Marker for a freshly issued access token (one hour client-side hint).
    pub fn active() -> Self {
        Self {
            expires_at: Utc::now().timestamp_millis() + 3600 * 1000,
            logged_in: true,
        }
    }
}
