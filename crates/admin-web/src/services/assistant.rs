//! Per-conversation assistants hosted by the agent runtime.

use database::assistant::{self, AssistantAssignment};
use database::{conversation, ConversationAssistant, Database, DatabaseError};
use langgraph::{Assistant, AssistantConfig, AssistantUpdate, LangGraphClient, NewAssistant};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;

/// Input for [`create_user_assistant`].
#[derive(Debug, Clone, Default)]
pub struct AssistantRequest {
    pub conversation_id: String,
    pub phone_number: String,
    pub contact_name: Option<String>,
    /// Optional `{ user_preferences, ai_behavior }` overrides.
    pub preferences: Option<Value>,
}

/// Display name of a user's assistant.
pub fn assistant_name(contact_name: Option<&str>, phone_number: &str) -> String {
    let who = contact_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(phone_number);
    format!("BargainB Assistant for {}", who)
}

/// Create an assistant for one conversation and store it on the row.
///
/// The conversation and the assistant columns are checked before anything
/// is created remotely.
pub async fn create_user_assistant(
    db: &Database,
    agent: &LangGraphClient,
    request: &AssistantRequest,
) -> Result<ConversationAssistant, ApiError> {
    let pool = db.pool();
    if !assistant::columns_exist(pool).await? {
        return Err(DatabaseError::AssistantColumnsMissing.into());
    }
    conversation::get_conversation(pool, &request.conversation_id).await?;

    let name = assistant_name(request.contact_name.as_deref(), &request.phone_number);
    let preferences = request.preferences.as_ref();
    let config = AssistantConfig::for_user(
        preferences.and_then(|p| p.get("user_preferences")),
        preferences.and_then(|p| p.get("ai_behavior")),
    );
    let metadata = json!({
        "conversation_id": request.conversation_id,
        "phone_number": request.phone_number,
        "contact_name": request.contact_name,
        "created_for": "bargainb_user",
        "region": "netherlands",
        "created_by": "admin",
    });

    let created = agent
        .create_assistant(&NewAssistant {
            graph_id: agent.config().graph_id.clone(),
            config: config.clone(),
            metadata: metadata.clone(),
            name: name.clone(),
        })
        .await
        .map_err(|err| ApiError::agent("Failed to create personal assistant", err))?;

    let stored = assistant::set_conversation_assistant(
        pool,
        &request.conversation_id,
        &AssistantAssignment {
            assistant_id: created.assistant_id.clone(),
            assistant_name: name,
            config: config.to_value(),
            metadata,
        },
    )
    .await?;

    info!(
        conversation_id = %request.conversation_id,
        assistant_id = %created.assistant_id,
        "Personal assistant created"
    );
    Ok(stored)
}

/// Delete an assistant remotely and detach it from its conversations.
///
/// An assistant the runtime no longer knows is still detached locally.
pub async fn delete_user_assistant(
    db: &Database,
    agent: &LangGraphClient,
    assistant_id: &str,
) -> Result<u64, ApiError> {
    match agent.delete_assistant(assistant_id).await {
        Ok(()) => {}
        Err(err) if err.is_not_found() => {
            warn!(assistant_id, "Assistant already gone from the runtime");
        }
        Err(err) => return Err(ApiError::agent("Failed to delete assistant", err)),
    }

    match assistant::clear_assistant(db.pool(), assistant_id).await {
        Ok(cleared) => Ok(cleared),
        Err(DatabaseError::AssistantColumnsMissing) => Ok(0),
        Err(err) => Err(err.into()),
    }
}

/// Re-apply the tool-enabled default configuration, plus an optional patch.
pub async fn fix_tool_access(
    db: &Database,
    agent: &LangGraphClient,
    assistant_id: &str,
    patch: Option<&Value>,
) -> Result<Assistant, ApiError> {
    let mut config = AssistantConfig::default_for_bargainb();
    if let Some(patch) = patch {
        config = config.merged_with(patch);
    }

    let updated = agent
        .update_assistant(
            assistant_id,
            &AssistantUpdate {
                config: Some(config.clone()),
                ..Default::default()
            },
        )
        .await
        .map_err(|err| ApiError::agent("Failed to update assistant", err))?;

    match assistant::update_assistant_config_for(db.pool(), assistant_id, &config.to_value()).await {
        Ok(_) | Err(DatabaseError::AssistantColumnsMissing) => {}
        Err(err) => return Err(err.into()),
    }

    info!(assistant_id, "Assistant configuration updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_prefers_contact() {
        assert_eq!(
            assistant_name(Some("Sanne"), "+31612345678"),
            "BargainB Assistant for Sanne"
        );
        assert_eq!(
            assistant_name(Some("  "), "+31612345678"),
            "BargainB Assistant for +31612345678"
        );
        assert_eq!(
            assistant_name(None, "+31612345678"),
            "BargainB Assistant for +31612345678"
        );
    }
}
