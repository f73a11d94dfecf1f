//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use langgraph::LangGraphClient;
use wasender::WaSenderClient;

use crate::auth::AuthClient;
use crate::config::Config;
use crate::error::ApiError;

/// Shared application state.
///
/// External clients are optional so the inbox keeps working without
/// WhatsApp or AI credentials; handlers that need them answer 500.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Auth provider client.
    pub auth: AuthClient,
    pub wasender: Option<WaSenderClient>,
    pub agent: Option<LangGraphClient>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        db: Database,
        auth: AuthClient,
        wasender: Option<WaSenderClient>,
        agent: Option<LangGraphClient>,
        config: Config,
    ) -> Self {
        Self {
            db,
            auth,
            wasender,
            agent,
            config: Arc::new(config),
        }
    }

    /// The WASender client, or a 500 when no API key is configured.
    pub fn wasender(&self) -> Result<&WaSenderClient, ApiError> {
        self.wasender
            .as_ref()
            .ok_or_else(|| ApiError::NotConfigured("WASender API key not configured".to_string()))
    }

    /// The agent runtime client, or a 500 when it is not configured.
    pub fn agent(&self) -> Result<&LangGraphClient, ApiError> {
        self.agent
            .as_ref()
            .ok_or_else(|| ApiError::NotConfigured("AI agent not configured".to_string()))
    }
}
