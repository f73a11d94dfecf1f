//! HTTP client for the agent runtime.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::LangGraphConfig;
use crate::error::LangGraphError;
use crate::types::{
    Assistant, AssistantSearch, AssistantUpdate, CreateThreadRequest, NewAssistant, RunRequest,
    RunResponse, ThreadMetadata, ThreadResponse,
};

/// Reply used when a run finishes without any message.
pub const NO_RESPONSE: &str = "No response available";

/// Client for threads, runs and assistants.
#[derive(Clone)]
pub struct LangGraphClient {
    http: Client,
    config: LangGraphConfig,
}

impl LangGraphClient {
    pub fn new(config: LangGraphConfig) -> Result<Self, LangGraphError> {
        if config.api_key.trim().is_empty() {
            return Err(LangGraphError::Config("API key is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(LangGraphError::Http)?;

        info!(api_url = %config.api_url, "LangGraph client initialized");
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, LangGraphError> {
        Self::new(LangGraphConfig::from_env()?)
    }

    pub fn config(&self) -> &LangGraphConfig {
        &self.config
    }

    /// Create a thread and return its id.
    pub async fn create_thread(&self, metadata: &ThreadMetadata) -> Result<String, LangGraphError> {
        let builder = self
            .http
            .post(self.config.threads_url())
            .json(&CreateThreadRequest { metadata });
        let thread: ThreadResponse = self.execute(builder).await?;
        debug!(thread_id = %thread.thread_id, user_id = %metadata.user_id, "Created thread");
        Ok(thread.thread_id)
    }

    /// Run the assistant on a thread and wait for the final state.
    ///
    /// Returns the content of the last message, or [`NO_RESPONSE`].
    pub async fn run_wait(
        &self,
        thread_id: &str,
        request: &RunRequest,
    ) -> Result<String, LangGraphError> {
        let response = self.run_wait_raw(thread_id, request).await?;
        Ok(response
            .last_message_text()
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }

    /// Like [`Self::run_wait`] but returns the whole thread state.
    pub async fn run_wait_raw(
        &self,
        thread_id: &str,
        request: &RunRequest,
    ) -> Result<RunResponse, LangGraphError> {
        debug!(thread_id, assistant_id = %request.assistant_id, "Starting run");
        let builder = self
            .http
            .post(self.config.run_wait_url(thread_id))
            .json(request);
        self.execute(builder).await
    }

    pub async fn create_assistant(&self, assistant: &NewAssistant) -> Result<Assistant, LangGraphError> {
        let builder = self.http.post(self.config.assistants_url()).json(assistant);
        let created: Assistant = self.execute(builder).await?;
        info!(assistant_id = %created.assistant_id, name = %assistant.name, "Created assistant");
        Ok(created)
    }

    pub async fn get_assistant(&self, assistant_id: &str) -> Result<Assistant, LangGraphError> {
        let builder = self.http.get(self.config.assistant_url(assistant_id));
        self.execute(builder).await
    }

    pub async fn update_assistant(
        &self,
        assistant_id: &str,
        update: &AssistantUpdate,
    ) -> Result<Assistant, LangGraphError> {
        let builder = self
            .http
            .patch(self.config.assistant_url(assistant_id))
            .json(update);
        self.execute(builder).await
    }

    pub async fn delete_assistant(&self, assistant_id: &str) -> Result<(), LangGraphError> {
        let response = self
            .http
            .delete(self.config.assistant_url(assistant_id))
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await?;
        Self::check_status(response).await?;
        info!(assistant_id, "Deleted assistant");
        Ok(())
    }

    pub async fn search_assistants(
        &self,
        search: &AssistantSearch,
    ) -> Result<Vec<Assistant>, LangGraphError> {
        let builder = self
            .http
            .post(self.config.assistant_search_url())
            .json(search);
        self.execute(builder).await
    }

    async fn execute<R: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<R, LangGraphError> {
        let response = builder
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<R>().await?)
    }

    async fn check_status(response: Response) -> Result<Response, LangGraphError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "LangGraph API error");
        Err(LangGraphError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for LangGraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangGraphClient")
            .field("config", &self.config)
            .finish()
    }
}
