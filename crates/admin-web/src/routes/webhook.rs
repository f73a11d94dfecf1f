//! WASender webhook endpoint.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};
use wasender::WebhookPayload;

use crate::error::{ApiError, Result};
use crate::services::webhook::process_webhook;
use crate::state::AppState;

/// Header carrying the shared webhook secret.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Compares in constant time for equal lengths.
fn signature_matches(provided: Option<&str>, secret: &str) -> bool {
    provided.is_some_and(|sig| bool::from(sig.as_bytes().ct_eq(secret.as_bytes())))
}

/// Receive a webhook delivery.
///
/// When a secret is configured the signature header must be present and
/// equal to it.
pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    if !is_json {
        return Err(ApiError::BadRequest("Invalid content type".to_string()));
    }

    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if !signature_matches(signature, secret) {
            warn!("Rejected webhook with invalid signature");
            return Err(ApiError::Unauthorized("Invalid signature".to_string()));
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|err| {
        debug!(error = %err, "Undecodable webhook body");
        ApiError::BadRequest("Invalid JSON payload".to_string())
    })?;

    let outcome = process_webhook(&state, &payload).await.map_err(|err| {
        error!(event = %payload.event, error = %err, "Webhook processing failed");
        ApiError::Internal("Failed to process webhook".to_string())
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Webhook processed successfully",
        "received": true,
        "data": outcome,
    }))
    .into_response())
}

/// Subscription handshake: echo `hub.challenge` when the token matches.
pub async fn verify(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let expected = state.config.webhook_verify_token.as_deref();

    match (mode, token, params.get("hub.challenge")) {
        (Some("subscribe"), Some(token), Some(challenge)) if Some(token) == expected => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain")],
            challenge.clone(),
        )
            .into_response(),
        _ => ApiError::Forbidden("Verification failed".to_string()).into_response(),
    }
}

/// Liveness check used by WASender.
pub async fn head() -> StatusCode {
    StatusCode::OK
}
