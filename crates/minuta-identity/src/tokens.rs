//! Token lifecycle management.
//!
//! Issues, extracts, refreshes, and revokes the access/refresh token pair
//! persisted in cookies. The refresh token lives in an HTTP-only cookie; a
//! companion session-marker cookie distinguishes "no session" from "session
//! present but access token not attached to this request".
//!
//! The two cookies are always written or cleared together. A failed refresh
//! leaves no residual cookies, so a "logged in but no token" state cannot
//! persist.

use http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use minuta_core::models::{SessionMarker, TokenPair};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::sync::Arc;

use crate::client::IdentityService;

/// Cookie holding the long-lived refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
/// Cookie holding the non-sensitive session marker JSON.
pub const SESSION_COOKIE: &str = "session";

const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60; // 30 days
const SESSION_MAX_AGE_SECS: i64 = 4 * 60 * 60; // 4 hours

/// Result of looking for credentials on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenExtraction {
    /// A bearer access token was attached.
    Token(String),
    /// A logged-in session marker exists but no access token was attached;
    /// the token must be re-obtained before the request can proceed.
    RefreshNeeded,
    /// No session at all (or an unreadable session cookie).
    Missing,
}

/// Rotates the access/refresh token pair through cookies.
#[derive(Clone)]
pub struct TokenLifecycleManager {
    identity: Arc<dyn IdentityService>,
    secure_cookies: bool,
}

impl TokenLifecycleManager {
    /// `secure_cookies` adds the `Secure` attribute; enabled in production.
    pub fn new(identity: Arc<dyn IdentityService>, secure_cookies: bool) -> Self {
        Self {
            identity,
            secure_cookies,
        }
    }

    /// Set both auth cookies on successful login/signup or refresh.
    pub fn issue(&self, response_headers: &mut HeaderMap, pair: &TokenPair) {
        let refresh_cookie = format!(
            "{}={}; {}",
            REFRESH_TOKEN_COOKIE,
            pair.refresh_token,
            cookie_attributes(self.secure_cookies, REFRESH_TOKEN_MAX_AGE_SECS)
        );

        let marker = serde_json::to_string(&SessionMarker::active())
            .expect("session marker serialization cannot fail");
        let session_cookie = format!(
            "{}={}; {}",
            SESSION_COOKIE,
            utf8_percent_encode(&marker, NON_ALPHANUMERIC),
            cookie_attributes(self.secure_cookies, SESSION_MAX_AGE_SECS)
        );

        let refresh_value = match HeaderValue::from_str(&refresh_cookie) {
            Ok(value) => value,
            Err(_) => {
                // Neither cookie is written if the refresh token cannot be
                // represented; the pair is never set one-sided.
                tracing::error!("Refresh token not representable as a cookie value");
                return;
            }
        };
        let session_value = match HeaderValue::from_str(&session_cookie) {
            Ok(value) => value,
            Err(_) => {
                tracing::error!("Session marker not representable as a cookie value");
                return;
            }
        };

        response_headers.append(SET_COOKIE, refresh_value);
        response_headers.append(SET_COOKIE, session_value);
        tracing::debug!("Auth cookies set");
    }

    /// Extract the current credentials from a request.
    ///
    /// The bearer Authorization header wins; otherwise a logged-in session
    /// marker signals that a refresh is needed. A malformed session cookie
    /// counts as no session.
    pub fn extract(request_headers: &HeaderMap) -> TokenExtraction {
        if let Some(auth) = request_headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                if !token.is_empty() {
                    return TokenExtraction::Token(token.to_string());
                }
            }
        }

        let Some(raw) = cookie_value(request_headers, SESSION_COOKIE) else {
            return TokenExtraction::Missing;
        };

        let decoded = percent_decode_str(&raw).decode_utf8_lossy();
        match serde_json::from_str::<SessionMarker>(&decoded) {
            Ok(marker) if marker.logged_in => TokenExtraction::RefreshNeeded,
            Ok(_) => TokenExtraction::Missing,
            Err(_) => TokenExtraction::Missing,
        }
    }

    /// Exchange the refresh-token cookie for a new pair.
    ///
    /// Returns `false` and touches nothing when no refresh cookie is present.
    /// On upstream failure both cookies are cleared. On success both cookies
    /// are re-issued with the new pair.
    pub async fn refresh(
        &self,
        request_headers: &HeaderMap,
        response_headers: &mut HeaderMap,
    ) -> bool {
        let Some(refresh_token) = cookie_value(request_headers, REFRESH_TOKEN_COOKIE) else {
            tracing::debug!("No refresh token found in cookies");
            return false;
        };

        match self.identity.refresh_session(&refresh_token).await {
            Ok(pair) => {
                self.issue(response_headers, &pair);
                tracing::debug!("Tokens refreshed");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to refresh tokens");
                self.revoke(response_headers);
                false
            }
        }
    }

    /// Clear both auth cookies. Does not contact the identity service;
    /// callers invalidate the upstream session separately.
    pub fn revoke(&self, response_headers: &mut HeaderMap) {
        for name in [REFRESH_TOKEN_COOKIE, SESSION_COOKIE] {
            let cleared = format!("{}=; {}", name, cookie_attributes(self.secure_cookies, 0));
            if let Ok(value) = HeaderValue::from_str(&cleared) {
                response_headers.append(SET_COOKIE, value);
            }
        }
        tracing::debug!("Auth cookies cleared");
    }
}

fn cookie_attributes(secure: bool, max_age_secs: i64) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "Path=/; SameSite=Strict; HttpOnly; Max-Age={}{}",
        max_age_secs, secure_flag
    )
}

/// Read a single cookie value from the Cookie request header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|value| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdentityError;
    use async_trait::async_trait;
    use minuta_core::models::UserProfile;

    struct ScriptedIdentity {
        refresh_result: Result<TokenPair, ()>,
    }

    #[async_trait]
    impl IdentityService for ScriptedIdentity {
        async fn sign_up(
            &self,
            _email: &str,
            _password: &str,
            _full_name: &str,
        ) -> Result<UserProfile, IdentityError> {
            unimplemented!("not exercised")
        }

        async fn sign_in(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<TokenPair, IdentityError> {
            unimplemented!("not exercised")
        }

        async fn verify_token(&self, _access_token: &str) -> Result<UserProfile, IdentityError> {
            unimplemented!("not exercised")
        }

        async fn refresh_session(&self, _refresh_token: &str) -> Result<TokenPair, IdentityError> {
            self.refresh_result
                .clone()
                .map_err(|_| IdentityError::SessionInvalid("refresh token revoked".to_string()))
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> {
            unimplemented!("not exercised")
        }
    }

    fn manager(refresh_result: Result<TokenPair, ()>) -> TokenLifecycleManager {
        TokenLifecycleManager::new(Arc::new(ScriptedIdentity { refresh_result }), false)
    }

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_issue_sets_both_cookies_with_attributes() {
        let mgr = manager(Err(()));
        let mut headers = HeaderMap::new();
        mgr.issue(&mut headers, &TokenPair::new("acc-1", "ref-1"));

        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("refresh_token=ref-1;"));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[0].contains("SameSite=Strict"));
        assert!(cookies[0].contains(&format!("Max-Age={}", REFRESH_TOKEN_MAX_AGE_SECS)));
        assert!(cookies[1].starts_with("session="));
        assert!(cookies[1].contains(&format!("Max-Age={}", SESSION_MAX_AGE_SECS)));
        // Development manager omits the Secure attribute.
        assert!(!cookies[0].contains("Secure"));
    }

    #[test]
    fn test_extract_prefers_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer acc-42"));
        assert_eq!(
            TokenLifecycleManager::extract(&headers),
            TokenExtraction::Token("acc-42".to_string())
        );
    }

    #[test]
    fn test_extract_issued_marker_yields_refresh_needed() {
        let mgr = manager(Err(()));
        let mut response = HeaderMap::new();
        mgr.issue(&mut response, &TokenPair::new("acc", "ref"));

        // Replay the issued session cookie on a new request without a header.
        let session = set_cookies(&response)
            .into_iter()
            .find(|c| c.starts_with("session="))
            .unwrap();
        let cookie_pair = session.split(';').next().unwrap().to_string();
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_str(&cookie_pair).unwrap());

        assert_eq!(
            TokenLifecycleManager::extract(&request),
            TokenExtraction::RefreshNeeded
        );
    }

    #[test]
    fn test_extract_without_credentials_is_missing() {
        assert_eq!(
            TokenLifecycleManager::extract(&HeaderMap::new()),
            TokenExtraction::Missing
        );
    }

    #[test]
    fn test_extract_malformed_session_cookie_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session=not-json"));
        assert_eq!(
            TokenLifecycleManager::extract(&headers),
            TokenExtraction::Missing
        );
    }

    #[test]
    fn test_extract_logged_out_marker_is_missing() {
        let marker = "%7B%22expires_at%22%3A0%2C%22logged_in%22%3Afalse%7D";
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("session={}", marker)).unwrap(),
        );
        assert_eq!(
            TokenLifecycleManager::extract(&headers),
            TokenExtraction::Missing
        );
    }

    #[tokio::test]
    async fn test_refresh_without_cookie_leaves_headers_untouched() {
        let mgr = manager(Ok(TokenPair::new("acc-2", "ref-2")));
        let request = HeaderMap::new();
        let mut response = HeaderMap::new();

        assert!(!mgr.refresh(&request, &mut response).await);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_both_cookies() {
        let mgr = manager(Err(()));
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_static("refresh_token=stale"));
        let mut response = HeaderMap::new();

        assert!(!mgr.refresh(&request, &mut response).await);

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=;")));
        assert!(cookies.iter().any(|c| c.starts_with("session=;")));
    }

    #[tokio::test]
    async fn test_refresh_success_reissues_both_cookies() {
        let mgr = manager(Ok(TokenPair::new("acc-2", "ref-2")));
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_static("refresh_token=ref-1"));
        let mut response = HeaderMap::new();

        assert!(mgr.refresh(&request, &mut response).await);

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=ref-2;")));
    }

    #[test]
    fn test_secure_manager_marks_cookies_secure() {
        let mgr = TokenLifecycleManager::new(
            Arc::new(ScriptedIdentity { refresh_result: Err(()) }),
            true,
        );
        let mut headers = HeaderMap::new();
        mgr.issue(&mut headers, &TokenPair::new("a", "r"));
        assert!(set_cookies(&headers).iter().all(|c| c.contains("Secure")));
    }
}
