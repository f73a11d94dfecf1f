//! Run a chat message through the agent runtime and record the reply.

use std::time::Instant;

use database::ai_interaction::{self, NewAiInteraction};
use database::message::{self, NewMessage};
use database::{assistant, conversation, customer, Database, DatabaseError, Message, SenderType};
use langgraph::{LangGraphClient, LangGraphError, RunRequest, ThreadMetadata};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::services::mention::strip_bb_tag;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI not enabled for this chat")]
    Disabled,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("AI processing failed: {0}")]
    Agent(#[from] LangGraphError),
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Disabled => ApiError::BadRequest(err.to_string()),
            AiError::Database(db) => ApiError::Database(db),
            AiError::Agent(agent) => ApiError::agent("AI processing failed", agent),
        }
    }
}

/// Outcome of a processed message.
#[derive(Debug, Clone)]
pub struct AiReply {
    pub ai_response: String,
    pub thread_id: String,
    /// The stored outbound message.
    pub message: Message,
    pub processing_time_ms: i64,
}

/// Ask the agent about `message` in the context of chat `chat_id`.
///
/// `chat_id` is a conversation id or remote JID. The conversation's thread
/// is created on first use. The reply is stored as an outbound `ai` message
/// and the exchange is logged to `ai_interactions`.
pub async fn process_ai_message(
    db: &Database,
    agent: &LangGraphClient,
    chat_id: &str,
    message: &str,
    user_id: &str,
) -> Result<AiReply, AiError> {
    let pool = db.pool();
    let settings = conversation::get_ai_settings(pool, chat_id).await?;
    if !settings.ai_enabled {
        return Err(AiError::Disabled);
    }

    let thread_id = match settings.ai_thread_id.clone() {
        Some(thread_id) => thread_id,
        None => {
            let thread_id = agent.create_thread(&ThreadMetadata::whatsapp(user_id)).await?;
            conversation::set_ai_thread(pool, &settings.id, &thread_id).await?;
            thread_id
        }
    };

    let clean_message = strip_bb_tag(message);
    let profile = customer::get_crm_profile(pool, user_id)
        .await?
        .map(|p| serde_json::to_value(p).unwrap_or(Value::Null))
        .unwrap_or(Value::Null);
    let assistant_id = assistant_for(db, &settings.id)
        .await?
        .unwrap_or_else(|| agent.config().assistant_id.clone());

    let mut request = RunRequest::user_message(&assistant_id, &clean_message);
    request.config.configurable = run_configurable(user_id, profile, &settings.config_value());

    debug!(chat_id, %thread_id, %assistant_id, "Running agent");
    let started = Instant::now();
    let ai_response = agent.run_wait(&thread_id, &request).await?;
    let processing_time_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    let stored = message::create_message(
        pool,
        &NewMessage::outbound(&settings.id, &ai_response, SenderType::Ai).with_ai_thread(&thread_id),
    )
    .await?;

    let interaction = NewAiInteraction {
        conversation_id: settings.id.clone(),
        user_id: user_id.to_string(),
        user_message: clean_message,
        ai_response: ai_response.clone(),
        thread_id: Some(thread_id.clone()),
        processing_time_ms,
        tokens_used: ai_response.chars().count() as i64,
    };
    if let Err(err) = ai_interaction::log_interaction(pool, &interaction).await {
        warn!(conversation_id = %settings.id, error = %err, "Failed to log AI interaction");
    }

    info!(conversation_id = %settings.id, processing_time_ms, "AI reply stored");
    Ok(AiReply {
        ai_response,
        thread_id,
        message: stored,
        processing_time_ms,
    })
}

/// The conversation's own assistant, when per-user assistants are set up.
async fn assistant_for(db: &Database, conversation_id: &str) -> Result<Option<String>, DatabaseError> {
    match assistant::get_conversation_assistant(db.pool(), conversation_id).await {
        Ok(found) => Ok(found.assistant_id),
        Err(DatabaseError::AssistantColumnsMissing) => Ok(None),
        Err(err) => Err(err),
    }
}

/// `configurable` keys for a run, from the chat's `ai_config` with defaults.
pub fn run_configurable(user_id: &str, user_profile: Value, ai_config: &Value) -> Map<String, Value> {
    let setting = |key: &str, default: Value| -> Value {
        ai_config
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or(default)
    };

    let configurable = json!({
        "user_id": user_id,
        "source": "whatsapp",
        "user_profile": user_profile,
        "ENABLE_GUARD_RAILS": setting("guard_rails_enabled", json!(true)),
        "MAX_MESSAGE_LENGTH": setting("max_message_length", json!(500)),
        "ENABLE_SPAM_DETECTION": setting("spam_detection", json!(true)),
        "MAX_TOKENS_PER_REQUEST": setting("max_tokens_per_request", json!(4000)),
        "REQUEST_TIMEOUT_SECONDS": setting("request_timeout", json!(30)),
        "ENABLE_CONTENT_FILTERING": setting("content_filtering", json!(true)),
        "MAX_TOKENS_PER_USER_HOUR": setting("max_tokens_per_hour", json!(20000)),
        "ENABLE_FALLBACK_RESPONSES": setting("fallback_responses", json!(true)),
        "MAX_TOOL_CALLS_PER_REQUEST": setting("max_tool_calls", json!(5)),
        "CUSTOM_INSTRUCTIONS": setting("custom_instructions", json!("")),
        "TEMPERATURE": setting("temperature", json!(0.7)),
        "RESPONSE_STYLE": setting("response_style", json!("helpful")),
    });

    match configurable {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Normalised `ai_config` stored by the chat settings endpoint.
///
/// Missing or falsy values fall back to the defaults.
pub fn normalize_ai_config(body: &Value) -> (bool, Value) {
    let enabled = body.get("enabled").and_then(Value::as_bool).unwrap_or(false);
    let flag = |key: &str| body.get(key).and_then(Value::as_bool).unwrap_or(true);
    let or = |key: &str, default: Value| -> Value {
        match body.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => default,
            Some(Value::String(s)) if s.is_empty() => default,
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => default,
            Some(v) => v.clone(),
        }
    };

    let config = json!({
        "enabled": enabled,
        "response_style": or("response_style", json!("helpful")),
        "auto_respond": or("auto_respond", json!(false)),
        "keywords": or("keywords", json!([])),
        "guard_rails_enabled": flag("guard_rails_enabled"),
        "max_message_length": or("max_message_length", json!(500)),
        "spam_detection": flag("spam_detection"),
        "content_filtering": flag("content_filtering"),
        "max_tokens_per_request": or("max_tokens_per_request", json!(4000)),
        "request_timeout": or("request_timeout", json!(30)),
        "max_tool_calls": or("max_tool_calls", json!(5)),
        "fallback_responses": flag("fallback_responses"),
        "custom_instructions": or("custom_instructions", json!("")),
        "temperature": or("temperature", json!(0.7)),
        "max_tokens_per_hour": or("max_tokens_per_hour", json!(20000)),
    });
    (enabled, config)
}
