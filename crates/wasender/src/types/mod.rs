//! Request, response and webhook types for the WASender API.

mod contact;
mod send;
mod webhook;

pub use contact::*;
pub use send::*;
pub use webhook::*;

use serde::Deserialize;

/// The `{ success, data }` wrapper WASender puts around most responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}
