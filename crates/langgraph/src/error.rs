//! Error types for the agent runtime client.

use thiserror::Error;

/// Errors returned by [`crate::LangGraphClient`].
#[derive(Debug, Error)]
pub enum LangGraphError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the runtime.
    #[error("LangGraph API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LangGraphError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LangGraphError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 404 from the runtime.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
