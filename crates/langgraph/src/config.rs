//! Configuration for the agent runtime client.

use std::env;

use crate::error::LangGraphError;

/// Graph that backs BargainB assistants.
pub const DEFAULT_GRAPH_ID: &str = "chatbot_agent";

/// Connection settings for the agent runtime.
#[derive(Clone)]
pub struct LangGraphConfig {
    /// Deployment URL, without trailing slash.
    pub api_url: String,
    /// Sent as `X-Api-Key`.
    pub api_key: String,
    /// Assistant used for runs when a conversation has none of its own.
    pub assistant_id: String,
    /// Graph new assistants are created from.
    pub graph_id: String,
}

impl LangGraphConfig {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            graph_id: DEFAULT_GRAPH_ID.to_string(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `LANGGRAPH_API_URL` - deployment URL
    /// - `LANGSMITH_API_KEY` - API key
    /// - `BARGAINB_ASSISTANT_ID` - default assistant for runs
    ///
    /// Optional:
    /// - `LANGGRAPH_GRAPH_ID` - graph for new assistants (default: chatbot_agent)
    pub fn from_env() -> Result<Self, LangGraphError> {
        let api_url = required("LANGGRAPH_API_URL")?;
        let api_key = required("LANGSMITH_API_KEY")?;
        let assistant_id = required("BARGAINB_ASSISTANT_ID")?;

        let mut config = Self::new(api_url, api_key, assistant_id);
        if let Ok(graph_id) = env::var("LANGGRAPH_GRAPH_ID") {
            config.graph_id = graph_id;
        }
        Ok(config)
    }

    pub fn threads_url(&self) -> String {
        format!("{}/threads", self.api_url)
    }

    pub fn run_wait_url(&self, thread_id: &str) -> String {
        format!("{}/threads/{}/runs/wait", self.api_url, thread_id)
    }

    pub fn assistants_url(&self) -> String {
        format!("{}/assistants", self.api_url)
    }

    pub fn assistant_url(&self, assistant_id: &str) -> String {
        format!("{}/assistants/{}", self.api_url, assistant_id)
    }

    pub fn assistant_search_url(&self) -> String {
        format!("{}/assistants/search", self.api_url)
    }
}

fn required(name: &str) -> Result<String, LangGraphError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LangGraphError::Config(format!("{} not set", name)))
}

impl std::fmt::Debug for LangGraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangGraphConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("assistant_id", &self.assistant_id)
            .field("graph_id", &self.graph_id)
            .finish()
    }
}
