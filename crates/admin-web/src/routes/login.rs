//! Login and logout.

use askama::Template;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use database::admin_user;
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{self, AuthError};
use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Template, Default)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
}

pub async fn login_page() -> LoginTemplate {
    LoginTemplate::default()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign in with email and password; only active admins get a session.
pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response> {
    let rejected = |status: StatusCode, message: &str| {
        let page = LoginTemplate {
            error: Some(message.to_string()),
            email: form.email.clone(),
        };
        (status, page).into_response()
    };

    let session = match state.auth.sign_in(form.email.trim(), &form.password).await {
        Ok(session) => session,
        Err(AuthError::InvalidCredentials) => {
            warn!(email = %form.email, "Failed login");
            return Ok(rejected(StatusCode::UNAUTHORIZED, "Invalid email or password"));
        }
        Err(err) => return Err(ApiError::Internal(format!("Auth provider unavailable: {}", err))),
    };

    let admin = admin_user::get_active_by_auth_user_id(state.db.pool(), &session.user.id).await?;
    if admin.is_none() {
        warn!(user_id = %session.user.id, "Login by non-admin user");
        return Ok(rejected(StatusCode::FORBIDDEN, "Admin access required"));
    }

    info!(user_id = %session.user.id, "Admin logged in");
    let cookie = auth::session_cookie(&session.access_token, session.expires_in);
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/admin")).into_response())
}

pub async fn logout() -> Response {
    ([(SET_COOKIE, auth::clear_session_cookie())], Redirect::to("/login")).into_response()
}
