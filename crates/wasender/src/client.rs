//! WASender HTTP client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::WaSenderConfig;
use crate::error::WaSenderError;
use crate::types::{
    ApiEnvelope, OnWhatsappData, PictureData, SendMessageRequest, SendMessageResponse, WaContact,
};

/// Client for the WASender API.
#[derive(Clone)]
pub struct WaSenderClient {
    http: Client,
    config: WaSenderConfig,
}

impl WaSenderClient {
    /// Build a client for the given configuration.
    pub fn new(config: WaSenderConfig) -> Result<Self, WaSenderError> {
        if config.api_key.trim().is_empty() {
            return Err(WaSenderError::Config("API key is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(WaSenderError::Http)?;

        Ok(Self { http, config })
    }

    /// Build a client from `WASENDER_API_KEY` / `WASENDER_API_URL`.
    pub fn from_env() -> Result<Self, WaSenderError> {
        Self::new(WaSenderConfig::from_env()?)
    }

    /// Send a text or media message.
    pub async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, WaSenderError> {
        if request.to.trim().is_empty() || !request.has_content() {
            return Err(WaSenderError::Config(
                "send-message needs a recipient and content".to_string(),
            ));
        }

        debug!(to = %request.to, "Sending WhatsApp message");
        let builder = self.http.post(self.config.send_message_url()).json(request);
        self.execute(builder).await
    }

    /// Send a plain text message.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<SendMessageResponse, WaSenderError> {
        self.send_message(&SendMessageRequest::text(to, text)).await
    }

    /// Check whether a JID is registered on WhatsApp.
    pub async fn on_whatsapp(&self, jid: &str) -> Result<bool, WaSenderError> {
        let builder = self.http.get(self.config.on_whatsapp_url(jid));
        let envelope: ApiEnvelope<OnWhatsappData> = self.execute(builder).await?;
        Ok(envelope.data.map(|d| d.exists).unwrap_or(false))
    }

    /// List the session's contacts.
    pub async fn get_contacts(&self) -> Result<Vec<WaContact>, WaSenderError> {
        let builder = self.http.get(self.config.contacts_url());
        let envelope: ApiEnvelope<Vec<WaContact>> = self.execute(builder).await?;

        if !envelope.success {
            warn!("WASender returned an unsuccessful contacts response");
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// Look up one contact; `None` when WASender does not know it.
    pub async fn get_contact_info(&self, phone: &str) -> Result<Option<WaContact>, WaSenderError> {
        let builder = self.http.get(self.config.contact_url(phone));
        let envelope: ApiEnvelope<WaContact> = self.execute(builder).await?;
        Ok(envelope.data.filter(|_| envelope.success))
    }

    /// Profile picture URL of a contact, if one is visible.
    pub async fn get_contact_picture(&self, phone: &str) -> Result<Option<String>, WaSenderError> {
        let builder = self.http.get(self.config.contact_picture_url(phone));
        let envelope: ApiEnvelope<PictureData> = self.execute(builder).await?;
        Ok(envelope.data.and_then(|d| d.img_url))
    }

    /// Get the configuration.
    pub fn config(&self) -> &WaSenderConfig {
        &self.config
    }

    async fn execute<R: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<R, WaSenderError> {
        let response = builder
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(WaSenderError::Http)?;

        let response = Self::check_status(response).await?;
        response.json::<R>().await.map_err(WaSenderError::Http)
    }

    /// Turn a non-success response into `WaSenderError::Api`, keeping the body.
    async fn check_status(response: Response) -> Result<Response, WaSenderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        warn!(status = status.as_u16(), %body, "WASender API error");

        Err(WaSenderError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for WaSenderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaSenderClient")
            .field("config", &self.config)
            .finish()
    }
}
