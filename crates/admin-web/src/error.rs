//! Error type for route handlers.
//!
//! Every failure renders as `{ "success": false, "error": .., "details"?: .. }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::{DatabaseError, ValidationError};
use langgraph::LangGraphError;
use serde_json::{json, Value};
use thiserror::Error;
use wasender::WaSenderError;

/// Errors returned by admin handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A required external service has no credentials.
    #[error("{0}")]
    NotConfigured(String),

    /// An external service rejected the call; its status and body are passed through.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Database(err) => match err {
                DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
                DatabaseError::AlreadyExists { .. } => StatusCode::CONFLICT,
                DatabaseError::Invalid(_) => StatusCode::BAD_REQUEST,
                DatabaseError::AssistantColumnsMissing => StatusCode::NOT_IMPLEMENTED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wrap a WASender failure with a route-specific message.
    pub fn wasender(message: impl Into<String>, err: WaSenderError) -> Self {
        match err {
            WaSenderError::Api { status, body } => ApiError::Upstream {
                status,
                message: message.into(),
                details: body,
            },
            other => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: message.into(),
                details: Value::String(other.to_string()),
            },
        }
    }

    /// Wrap an agent runtime failure with a route-specific message.
    pub fn agent(message: impl Into<String>, err: LangGraphError) -> Self {
        match err {
            LangGraphError::Api { status, body } => ApiError::Upstream {
                status,
                message: message.into(),
                details: serde_json::from_str(&body).unwrap_or(Value::String(body)),
            },
            other => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: message.into(),
                details: Value::String(other.to_string()),
            },
        }
    }
}

impl From<WaSenderError> for ApiError {
    fn from(err: WaSenderError) -> Self {
        ApiError::wasender("WASender API request failed", err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<LangGraphError> for ApiError {
    fn from(err: LangGraphError) -> Self {
        ApiError::agent("AI agent request failed", err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        match self {
            ApiError::Upstream { details, .. } => {
                body["details"] = details;
            }
            ApiError::Database(DatabaseError::DeleteStep { step, .. }) => {
                body["details"] = json!({ "step": step });
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for admin handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
