//! Identity provider client.
//!
//! `IdentityService` is the seam every caller programs against; the HTTP
//! implementation speaks a GoTrue-style REST API (password grant, refresh
//! grant, user lookup, logout). Every call goes through the retry executor
//! with the default transient/fatal classification.

use async_trait::async_trait;
use minuta_core::models::{TokenPair, UserProfile};
use minuta_core::retry::{self, default_retryable, RetryConfig};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::error::IdentityError;

/// Upstream identity/session provider operations.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<UserProfile, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError>;

    async fn verify_token(&self, access_token: &str) -> Result<UserProfile, IdentityError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, IdentityError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: Uuid,
    email: String,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "message", alias = "error_description", alias = "msg")]
    error: Option<String>,
}

impl From<UserBody> for UserProfile {
    fn from(body: UserBody) -> Self {
        UserProfile {
            id: body.id,
            email: body.email,
            full_name: body.user_metadata.full_name,
        }
    }
}

/// HTTP client for the identity provider. Constructed once in setup and
/// injected wherever sessions are needed; no process-global instance.
#[derive(Clone, Debug)]
pub struct HttpIdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    /// Map a non-success response to an error. `session_bound` marks calls
    /// whose 4xx means "this session is no longer usable" rather than
    /// "these credentials are wrong".
    fn map_status(status: StatusCode, body: &str, session_bound: bool) -> IdentityError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| body.chars().take(200).collect());

        match status.as_u16() {
            429 => IdentityError::Upstream {
                code: "TooManyRequestsException".to_string(),
                message,
            },
            502 | 503 | 504 => IdentityError::Upstream {
                code: "ServiceUnavailable".to_string(),
                message,
            },
            500..=599 => IdentityError::Upstream {
                code: "InternalServerError".to_string(),
                message,
            },
            400 | 401 | 403 | 422 if session_bound => IdentityError::SessionInvalid(message),
            400 | 401 | 403 | 422 => IdentityError::InvalidCredentials(message),
            code => IdentityError::Upstream {
                code: format!("Http{}", code),
                message,
            },
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        session_bound: bool,
    ) -> Result<T, IdentityError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_status(status, &body, session_bound));
        }

        serde_json::from_str(&body).map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }

    async fn try_sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<UserProfile, IdentityError> {
        let response = self
            .client
            .post(self.auth_url("/signup"))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let user: UserBody = Self::read_json(response, false).await?;
        Ok(user.into())
    }

    async fn try_sign_in(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        let response = self
            .client
            .post(self.auth_url("/token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let session: SessionBody = Self::read_json(response, false).await?;
        Ok(TokenPair::new(session.access_token, session.refresh_token))
    }

    async fn try_verify(&self, access_token: &str) -> Result<UserProfile, IdentityError> {
        let response = self
            .client
            .get(self.auth_url("/user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let user: UserBody = Self::read_json(response, true).await?;
        Ok(user.into())
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<TokenPair, IdentityError> {
        let response = self
            .client
            .post(self.auth_url("/token?grant_type=refresh_token"))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let session: SessionBody = Self::read_json(response, true).await?;
        Ok(TokenPair::new(session.access_token, session.refresh_token))
    }

    async fn try_sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.auth_url("/logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::map_status(status, &body, true))
    }
}

#[async_trait]
impl IdentityService for HttpIdentityClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<UserProfile, IdentityError> {
        // Not verified idempotent under the executor's discard semantics: a
        // timed-out attempt may still create the user upstream, in which case
        // the retry surfaces the provider's duplicate-account error.
        let config = RetryConfig::new("identity sign-up");
        retry::execute(
            || self.try_sign_up(email, password, full_name),
            &config,
            default_retryable,
        )
        .await
        .map_err(IdentityError::from_retry)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        let config = RetryConfig::new("identity sign-in");
        retry::execute(
            || self.try_sign_in(email, password),
            &config,
            default_retryable,
        )
        .await
        .map_err(IdentityError::from_retry)
    }

    async fn verify_token(&self, access_token: &str) -> Result<UserProfile, IdentityError> {
        let config = RetryConfig::new("identity token verification");
        retry::execute(|| self.try_verify(access_token), &config, default_retryable)
            .await
            .map_err(IdentityError::from_retry)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, IdentityError> {
        let config = RetryConfig::new("identity session refresh");
        retry::execute(
            || self.try_refresh(refresh_token),
            &config,
            default_retryable,
        )
        .await
        .map_err(IdentityError::from_retry)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let config = RetryConfig::new("identity sign-out");
        retry::execute(
            || self.try_sign_out(access_token),
            &config,
            default_retryable,
        )
        .await
        .map_err(IdentityError::from_retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_status_throttled_is_upstream_code() {
        let err = HttpIdentityClient::map_status(
            StatusCode::TOO_MANY_REQUESTS,
            "{\"msg\":\"over quota\"}",
            false,
        );
        match err {
            IdentityError::Upstream { code, message } => {
                assert_eq!(code, "TooManyRequestsException");
                assert_eq!(message, "over quota");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_status_credentials_vs_session() {
        let login = HttpIdentityClient::map_status(
            StatusCode::BAD_REQUEST,
            "{\"error_description\":\"Invalid login credentials\"}",
            false,
        );
        assert!(matches!(login, IdentityError::InvalidCredentials(_)));

        let verify = HttpIdentityClient::map_status(
            StatusCode::UNAUTHORIZED,
            "{\"msg\":\"token expired\"}",
            true,
        );
        assert!(matches!(verify, IdentityError::SessionInvalid(_)));
    }

    #[test]
    fn test_map_status_unparseable_body_is_truncated() {
        let long_body = "x".repeat(500);
        let err = HttpIdentityClient::map_status(StatusCode::BAD_GATEWAY, &long_body, false);
        match err {
            IdentityError::Upstream { code, message } => {
                assert_eq!(code, "ServiceUnavailable");
                assert_eq!(message.len(), 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
