//! Configuration for the WASender client.

use std::env;

use crate::error::WaSenderError;

/// Default WASender API host.
pub const DEFAULT_API_URL: &str = "https://www.wasenderapi.com";

/// Configuration for talking to the WASender API.
#[derive(Clone)]
pub struct WaSenderConfig {
    /// Base URL of the API (e.g., "https://www.wasenderapi.com").
    pub base_url: String,
    /// Bearer token for the WhatsApp session.
    pub api_key: String,
}

impl WaSenderConfig {
    /// Create a configuration with the given base URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `WASENDER_API_KEY` (required)
    /// - `WASENDER_API_URL` (default: `https://www.wasenderapi.com`)
    pub fn from_env() -> Result<Self, WaSenderError> {
        let api_key = env::var("WASENDER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| WaSenderError::Config("WASENDER_API_KEY is not set".to_string()))?;
        let base_url = env::var("WASENDER_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Ok(Self::new(base_url, api_key))
    }

    /// Send-message endpoint.
    pub fn send_message_url(&self) -> String {
        format!("{}/api/send-message", self.base_url)
    }

    /// Registration check endpoint for a JID (`<digits>@s.whatsapp.net`).
    pub fn on_whatsapp_url(&self, jid: &str) -> String {
        format!("{}/api/on-whatsapp/{}", self.base_url, jid)
    }

    /// Contact list endpoint.
    pub fn contacts_url(&self) -> String {
        format!("{}/api/contacts", self.base_url)
    }

    /// Single contact endpoint.
    pub fn contact_url(&self, phone: &str) -> String {
        format!("{}/api/contacts/{}", self.base_url, urlencoding::encode(phone))
    }

    /// Contact profile picture endpoint.
    pub fn contact_picture_url(&self, phone: &str) -> String {
        format!("{}/picture", self.contact_url(phone))
    }
}

impl Default for WaSenderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, "")
    }
}

impl std::fmt::Debug for WaSenderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaSenderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .finish()
    }
}
