//! REST client for the social backend.
//!
//! Covers the auth endpoints (login, logout, refresh, password change, push
//! token registration) and the state-changing social actions (follow,
//! unfollow, report). Requests that need a session carry a bearer token read
//! from the [`CredentialStore`] at call time. Nothing here retries; callers
//! decide what a failure means.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::credentials::{Credential, CredentialStore};
use super::jwt;
use crate::error::{AuthError, NetworkError, TetherError, TetherResult};
use crate::models::{deserialize_opt_id, FollowEdge, ReportReason, ReportTarget};
use crate::traits::{Clock, Headers, HttpClient, Response, SystemClock, TokenRefresher};

/// Lifetime assumed for an access token when neither the response nor the
/// token itself says when it expires.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 900;

/// Body returned by the login and refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires. Not every deployment sends it.
    #[serde(default, alias = "expiresIn")]
    pub expires_in: Option<i64>,
    #[serde(default, alias = "userId", deserialize_with = "deserialize_opt_id")]
    pub user_id: Option<String>,
}

impl TokenResponse {
    /// Build the credential to persist.
    ///
    /// Expiry comes from `expires_in`, else the JWT `exp` claim, else
    /// [`DEFAULT_TOKEN_LIFETIME_SECS`]. When the server did not rotate the
    /// refresh token, `previous_refresh` is kept.
    pub fn into_credential(
        self,
        now: DateTime<Utc>,
        previous_refresh: Option<String>,
    ) -> Credential {
        // Out-of-range lifetimes from the server fall through to the fallbacks
        let from_expires_in = self
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));
        let expires_at = from_expires_in
            .or_else(|| jwt::expires_at(&self.access_token))
            .unwrap_or_else(|| now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

        Credential {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(previous_refresh),
            expires_at,
            user_id: self.user_id,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    device: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

#[derive(Serialize)]
struct PushTokenRequest<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct ReportRequest<'a> {
    #[serde(flatten)]
    target: &'a ReportTarget,
    reason: &'a ReportReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

/// Client for the social backend's REST API.
#[derive(Clone)]
pub struct ApiClient {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP transport
    http: Arc<dyn HttpClient>,
    /// Session secrets
    credentials: CredentialStore,
    /// Time source for expiry calculation
    clock: Arc<dyn Clock>,
}

impl ApiClient {
    /// Create a client for `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        http: Arc<dyn HttpClient>,
        credentials: CredentialStore,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http,
            credentials,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn json_headers() -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    /// JSON headers plus `Authorization: Bearer <access token>`.
    async fn auth_headers(&self) -> TetherResult<Headers> {
        let token = self
            .credentials
            .access_token()
            .await?
            .ok_or(AuthError::NotAuthenticated)?;
        let mut headers = Self::json_headers();
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        Ok(headers)
    }

    async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        headers: &Headers,
    ) -> TetherResult<Response> {
        let url = self.url(path);
        let body = serde_json::to_string(body)?;
        self.http
            .post(&url, &body, headers)
            .await
            .map_err(|e| NetworkError::from_http(e, &url).into())
    }

    /// Log in with email and password and persist the resulting session.
    ///
    /// POST /auth/login
    pub async fn login(&self, email: &str, password: &str) -> TetherResult<Credential> {
        let device = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let request = LoginRequest {
            email,
            password,
            device,
        };
        let response = self
            .post_json("/auth/login", &request, &Self::json_headers())
            .await?;

        match response.status {
            400 | 401 | 422 => {
                return Err(AuthError::InvalidCredentials {
                    message: server_message(&response).unwrap_or_default(),
                }
                .into())
            }
            _ => check_status(&response)?,
        }

        let tokens: TokenResponse = response.json()?;
        let credential = tokens.into_credential(self.clock.now(), None);
        self.credentials.save_credential(&credential).await?;

        info!(user_id = ?credential.user_id, "Logged in");
        Ok(credential)
    }

    /// End the session.
    ///
    /// The server call is best-effort; local credentials are cleared even
    /// when it fails.
    ///
    /// POST /auth/logout
    pub async fn logout(&self) -> TetherResult<()> {
        if let Ok(headers) = self.auth_headers().await {
            let refresh = self
                .credentials
                .get_token(super::credentials::keys::REFRESH_TOKEN)
                .await
                .ok()
                .flatten();
            let body = serde_json::json!({ "refresh_token": refresh });
            match self.post_json("/auth/logout", &body, &headers).await {
                Ok(response) if !response.is_success() => {
                    warn!(status = response.status, "Server logout rejected");
                }
                Err(e) => warn!(error = %e, "Server logout failed"),
                Ok(_) => {}
            }
        }

        self.credentials.clear().await?;
        info!("Logged out");
        Ok(())
    }

    /// Exchange `refresh_token` for a new credential. Does not persist it.
    ///
    /// 401 and 403 mean the refresh token is no longer valid. Everything
    /// else is treated as transient.
    ///
    /// POST /auth/refresh
    pub async fn refresh(&self, refresh_token: &str) -> TetherResult<Credential> {
        let url = self.url("/auth/refresh");
        let body = serde_json::to_string(&RefreshRequest { refresh_token })?;

        let response = self
            .http
            .post(&url, &body, &Self::json_headers())
            .await
            .map_err(|e| AuthError::RefreshFailed {
                message: e.to_string(),
            })?;

        match response.status {
            401 | 403 => {
                return Err(AuthError::RefreshTokenInvalid {
                    message: server_message(&response)
                        .unwrap_or_else(|| format!("HTTP {}", response.status)),
                }
                .into())
            }
            s if !(200..300).contains(&s) => {
                return Err(AuthError::RefreshFailed {
                    message: server_message(&response).unwrap_or_else(|| format!("HTTP {}", s)),
                }
                .into())
            }
            _ => {}
        }

        let tokens: TokenResponse = response.json().map_err(|e| AuthError::RefreshFailed {
            message: format!("Invalid refresh response: {}", e),
        })?;
        debug!("Access token refreshed");
        Ok(tokens.into_credential(self.clock.now(), Some(refresh_token.to_string())))
    }

    /// Change the signed-in user's password.
    ///
    /// POST /auth/change-password
    pub async fn change_password(&self, current: &str, new: &str) -> TetherResult<()> {
        let headers = self.auth_headers().await?;
        let request = ChangePasswordRequest {
            current_password: current,
            new_password: new,
        };
        let response = self
            .post_json("/auth/change-password", &request, &headers)
            .await?;

        if matches!(response.status, 400 | 422) {
            return Err(AuthError::InvalidCredentials {
                message: server_message(&response).unwrap_or_default(),
            }
            .into());
        }
        check_status(&response)
    }

    /// Register this device's push-notification token and cache it locally.
    ///
    /// POST /notifications/push-token
    pub async fn register_push_token(&self, token: &str) -> TetherResult<()> {
        let headers = self.auth_headers().await?;
        let response = self
            .post_json("/notifications/push-token", &PushTokenRequest { token }, &headers)
            .await?;
        check_status(&response)?;
        self.credentials.set_push_token(token).await?;
        Ok(())
    }

    /// POST /{users|teams}/{id}/follow
    pub async fn follow(&self, edge: &FollowEdge) -> TetherResult<()> {
        let headers = self.auth_headers().await?;
        let response = self
            .post_json(&follow_path(edge), &serde_json::json!({}), &headers)
            .await?;
        check_status(&response)
    }

    /// DELETE /{users|teams}/{id}/follow
    pub async fn unfollow(&self, edge: &FollowEdge) -> TetherResult<()> {
        let headers = self.auth_headers().await?;
        let url = self.url(&follow_path(edge));
        let response = self
            .http
            .delete(&url, &headers)
            .await
            .map_err(|e| NetworkError::from_http(e, &url))?;
        check_status(&response)
    }

    /// File a moderation report.
    ///
    /// POST /reports
    pub async fn report(
        &self,
        target: &ReportTarget,
        reason: &ReportReason,
        details: Option<&str>,
    ) -> TetherResult<()> {
        let headers = self.auth_headers().await?;
        let request = ReportRequest {
            target,
            reason,
            details,
        };
        let response = self.post_json("/reports", &request, &headers).await?;
        check_status(&response)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenRefresher for ApiClient {
    async fn refresh(&self, refresh_token: &str) -> TetherResult<Credential> {
        ApiClient::refresh(self, refresh_token).await
    }
}

fn follow_path(edge: &FollowEdge) -> String {
    format!(
        "/{}/{}/follow",
        edge.following_type.path_segment(),
        urlencoding::encode(&edge.following_id)
    )
}

/// Turn a non-2xx response into an error.
fn check_status(response: &Response) -> TetherResult<()> {
    if response.is_success() {
        return Ok(());
    }

    if response.status == 429 {
        let retry_after_secs = response
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("retry-after"))
            .and_then(|(_, v)| v.trim().parse().ok());
        return Err(NetworkError::RateLimited { retry_after_secs }.into());
    }

    Err(TetherError::Network(NetworkError::HttpStatus {
        status: response.status,
        message: server_message(response).unwrap_or_else(|| "Unknown error".to_string()),
    }))
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"message": ..}`, `{"error": ..}` or plain text.
fn server_message(response: &Response) -> Option<String> {
    if let Ok(value) = response.json::<serde_json::Value>() {
        for field in ["message", "error", "detail"] {
            if let Some(msg) = value.get(field).and_then(|m| m.as_str()) {
                return Some(msg.to_string());
            }
        }
    }
    let text = response.text().ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(200).collect())
    }
}
