//! Per-user assistant endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use database::{assistant, DatabaseError};
use langgraph::AssistantSearch;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::routes::whatsapp::non_empty;
use crate::services::assistant::{self as service, AssistantRequest};
use crate::state::AppState;

/// Whether the assistant columns are in place.
pub async fn migration_status(State(state): State<AppState>) -> Result<Json<Value>> {
    let pool = state.db.pool();
    let missing = assistant::missing_columns(pool).await?;
    if !missing.is_empty() {
        return Ok(Json(json!({
            "migrated": false,
            "reason": "Columns do not exist",
            "missing_columns": missing,
        })));
    }

    let conversations_with_assistants = assistant::count_conversations_with_assistant(pool).await?;
    Ok(Json(json!({
        "migrated": true,
        "assistant_columns_exist": true,
        "conversations_with_assistants": conversations_with_assistants,
        "ready_for_per_user_assistants": true,
    })))
}

/// Add the assistant columns.
pub async fn apply_migration(State(state): State<AppState>) -> Result<Json<Value>> {
    let added = assistant::apply_assistant_columns(state.db.pool()).await?;
    info!(added, "Per-user assistant migration applied");
    Ok(Json(json!({
        "success": true,
        "message": "Per-user assistant migration applied",
        "columns_added": added,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssistantBody {
    pub conversation_id: Option<String>,
    pub phone_number: Option<String>,
    pub contact_name: Option<String>,
    pub preferences: Option<Value>,
}

pub async fn create_assistant(
    State(state): State<AppState>,
    Json(body): Json<CreateAssistantBody>,
) -> Result<Json<Value>> {
    let (Some(conversation_id), Some(phone_number)) =
        (non_empty(body.conversation_id), non_empty(body.phone_number))
    else {
        return Err(ApiError::BadRequest(
            "Missing required fields: conversationId and phoneNumber".to_string(),
        ));
    };

    let request = AssistantRequest {
        conversation_id,
        phone_number,
        contact_name: non_empty(body.contact_name),
        preferences: body.preferences,
    };
    let stored = service::create_user_assistant(&state.db, state.agent()?, &request).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "assistant_id": stored.assistant_id,
            "conversation_id": request.conversation_id,
            "phone_number": request.phone_number,
            "contact_name": request.contact_name,
        },
        "message": "Personal assistant created successfully",
    })))
}

/// Remote assistant plus the conversation it is assigned to, if any.
pub async fn get_assistant(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
) -> Result<Json<Value>> {
    let remote = state
        .agent()?
        .get_assistant(&assistant_id)
        .await
        .map_err(|err| ApiError::agent("Failed to fetch assistant", err))?;

    let assignment = match assistant::find_by_assistant_id(state.db.pool(), &assistant_id).await {
        Ok(found) => found,
        Err(DatabaseError::AssistantColumnsMissing) => None,
        Err(err) => return Err(err.into()),
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "assistant": remote,
            "conversation": assignment,
        },
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAssistantBody {
    /// Merged over the default tool-enabled configuration.
    pub config: Option<Value>,
}

/// Re-apply the default configuration, with optional overrides.
pub async fn update_assistant(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
    body: Option<Json<UpdateAssistantBody>>,
) -> Result<Json<Value>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let updated =
        service::fix_tool_access(&state.db, state.agent()?, &assistant_id, body.config.as_ref()).await?;

    Ok(Json(json!({
        "success": true,
        "data": updated,
        "message": "Assistant updated successfully",
    })))
}

pub async fn delete_assistant(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
) -> Result<Json<Value>> {
    let cleared = service::delete_user_assistant(&state.db, state.agent()?, &assistant_id).await?;
    info!(%assistant_id, cleared, "Assistant deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Assistant deleted successfully",
        "conversations_cleared": cleared,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub graph_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn search_assistants(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    let defaults = AssistantSearch::default();
    let search = AssistantSearch {
        graph_id: query.graph_id,
        limit: query.limit.unwrap_or(defaults.limit),
        offset: query.offset.unwrap_or(defaults.offset),
        ..defaults
    };

    let assistants = state
        .agent()?
        .search_assistants(&search)
        .await
        .map_err(|err| ApiError::agent("Failed to search assistants", err))?;

    Ok(Json(json!({
        "success": true,
        "data": { "assistants": assistants },
    })))
}
