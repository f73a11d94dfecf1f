//! Error types for the WASender client.

use thiserror::Error;

/// Errors that can occur when calling the WASender API.
#[derive(Debug, Error)]
pub enum WaSenderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response; `body` is the provider's JSON (or its text as a JSON string).
    #[error("WASender API error {status}: {body}")]
    Api {
        status: u16,
        body: serde_json::Value,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl WaSenderError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            WaSenderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
