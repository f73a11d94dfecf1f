//! Admin authentication.
//!
//! A session token (bearer header or `sb-access-token` cookie) is resolved
//! to a user by the auth provider, and the user must have an active row in
//! `admin_users`. Nothing is cached; every gated request checks both.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use database::{admin_user, AdminUser};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Cookie holding the provider access token.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Errors talking to the auth provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid or expired session")]
    InvalidToken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("auth provider error {status}: {body}")]
    Api { status: u16, body: String },
}

/// A user as returned by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of a password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    pub user: AuthUser,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for GoTrue-style `/auth/v1` endpoints.
#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, AuthError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    /// Resolve an access token to its user.
    pub async fn get_user(&self, token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidToken),
            status => Err(AuthError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Exchange email and password for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            status => Err(AuthError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// The authenticated admin, available to gated handlers as an extension.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user: AuthUser,
    pub admin: AdminUser,
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve a token to an active admin.
pub async fn resolve_admin(state: &AppState, token: &str) -> Result<AdminSession, ApiError> {
    let user = state.auth.get_user(token).await.map_err(|err| match err {
        AuthError::InvalidToken => ApiError::Forbidden("Invalid or expired session".to_string()),
        other => ApiError::Internal(format!("Auth provider unavailable: {}", other)),
    })?;

    let admin = admin_user::get_active_by_auth_user_id(state.db.pool(), &user.id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Admin access required".to_string()))?;

    Ok(AdminSession { user, admin })
}

/// Gate for `/admin` pages and admin APIs.
///
/// Pages redirect to `/login`; API calls get a 403 envelope.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let is_api = request.uri().path().contains("/api/");

    let Some(token) = session_token(request.headers()) else {
        debug!(path = %request.uri().path(), "No session token");
        return reject(is_api, ApiError::Forbidden("Authentication required".to_string()));
    };

    match resolve_admin(&state, &token).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(err) => {
            warn!(path = %request.uri().path(), error = %err, "Admin check failed");
            reject(is_api, err)
        }
    }
}

fn reject(is_api: bool, err: ApiError) -> Response {
    if !is_api {
        return Redirect::to("/login").into_response();
    }
    match err {
        ApiError::Internal(_) | ApiError::Database(_) => err.into_response(),
        other => ApiError::Forbidden(other.to_string()).into_response(),
    }
}

/// `Set-Cookie` value storing a session token.
pub fn session_cookie(token: &str, max_age: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

/// `Set-Cookie` value removing the session.
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("sb-access-token=cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=xyz; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sb-access-token="));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_values() {
        assert_eq!(
            session_cookie("t", 60),
            "sb-access-token=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
