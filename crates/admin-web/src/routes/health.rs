//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub database: String,
    pub wasender: bool,
    pub agent: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let (code, database) = match state.db.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            warn!(error = %err, "Database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let status = if code.is_success() { "ok" } else { "degraded" };
    (
        code,
        Json(Health {
            status: status.to_string(),
            database: database.to_string(),
            wasender: state.wasender.is_some(),
            agent: state.agent.is_some(),
        }),
    )
}
