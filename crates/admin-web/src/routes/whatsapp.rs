//! Public WhatsApp endpoints: direct send, AI replies and chat AI settings.

use axum::extract::{Path, State};
use axum::Json;
use database::conversation::{self, AiSettings};
use database::{ai_interaction, phone, AiInteraction};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use wasender::SendMessageRequest;

use crate::error::{ApiError, Result};
use crate::services::ai;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub to: Option<String>,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
    pub document_url: Option<String>,
    pub sticker_url: Option<String>,
}

impl SendMessageBody {
    /// Provider request; `None` without a recipient and a text.
    fn into_request(self) -> Option<SendMessageRequest> {
        let to = non_empty(self.to)?;
        let text = non_empty(self.text)?;
        Some(SendMessageRequest {
            image_url: non_empty(self.image_url),
            video_url: non_empty(self.video_url),
            audio_url: non_empty(self.audio_url),
            document_url: non_empty(self.document_url),
            sticker_url: non_empty(self.sticker_url),
            ..SendMessageRequest::text(to, text)
        })
    }
}

/// Send a message through WASender, with optional media attached.
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<Value>> {
    let Some(request) = body.into_request() else {
        return Err(ApiError::BadRequest(
            "Missing required fields: to and text are required".to_string(),
        ));
    };

    let sent = state
        .wasender()?
        .send_message(&request)
        .await
        .map_err(|err| ApiError::wasender("Failed to send message via WASender API", err))?;

    info!(to = %request.to, "Message sent via WASender");
    Ok(Json(json!({
        "success": true,
        "data": sent,
        "message": "Message sent successfully",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiBody {
    pub chat_id: Option<String>,
    pub message: Option<String>,
    pub user_id: Option<String>,
}

/// Run a chat message through the agent and return its reply.
pub async fn ai_reply(State(state): State<AppState>, Json(body): Json<AiBody>) -> Result<Json<Value>> {
    let (Some(chat_id), Some(message), Some(user_id)) = (
        non_empty(body.chat_id),
        non_empty(body.message),
        non_empty(body.user_id),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing required fields: chatId, message, userId".to_string(),
        ));
    };

    let agent = state.agent()?;
    let reply = ai::process_ai_message(&state.db, agent, &chat_id, &message, &user_id).await?;

    Ok(Json(json!({
        "aiResponse": reply.ai_response,
        "success": true,
    })))
}

#[derive(Debug, Serialize)]
pub struct AiConfigView {
    pub chat_id: String,
    pub conversation_id: String,
    pub ai_enabled: bool,
    pub ai_config: Value,
    pub ai_thread_id: Option<String>,
}

impl From<AiSettings> for AiConfigView {
    fn from(settings: AiSettings) -> Self {
        Self {
            ai_config: settings.config_value(),
            chat_id: settings.whatsapp_conversation_id,
            conversation_id: settings.id,
            ai_enabled: settings.ai_enabled,
            ai_thread_id: settings.ai_thread_id,
        }
    }
}

/// AI settings of a chat, by conversation id or remote JID.
pub async fn get_ai_config(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<Value>> {
    let settings = conversation::get_ai_settings(state.db.pool(), &chat_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": AiConfigView::from(settings),
    })))
}

/// Replace the AI settings of a chat.
pub async fn update_ai_config(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let (enabled, config) = ai::normalize_ai_config(&body);
    let settings = conversation::update_ai_settings(state.db.pool(), &chat_id, enabled, &config).await?;

    info!(%chat_id, enabled, "AI settings updated");
    Ok(Json(json!({
        "success": true,
        "data": AiConfigView::from(settings),
        "message": "AI settings updated successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ValidatePhoneBody {
    pub phone: Option<String>,
}

/// Check whether a phone number is registered on WhatsApp.
pub async fn validate_phone(
    State(state): State<AppState>,
    Json(body): Json<ValidatePhoneBody>,
) -> Result<Json<Value>> {
    let digits = non_empty(body.phone)
        .map(|raw| phone::clean_digits(&raw))
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Phone number is required".to_string()))?;

    let exists = state
        .wasender()?
        .on_whatsapp(&phone::to_whatsapp_jid(&digits))
        .await
        .map_err(|err| ApiError::wasender("Failed to validate phone number", err))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "phone": format!("+{}", digits),
            "exists": exists,
            "formatted": phone::format_grouped(&digits),
        },
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStats {
    pub total_interactions: i64,
    /// Milliseconds, rounded.
    pub avg_processing_time: i64,
    #[serde(rename = "totalChatsWithAI")]
    pub total_chats_with_ai: i64,
    pub recent_interactions: Vec<AiInteraction>,
}

/// Usage figures for the AI dashboard card.
pub async fn ai_stats(State(state): State<AppState>) -> Result<Json<AiStats>> {
    let pool = state.db.pool();
    let usage = ai_interaction::usage_stats(pool).await?;
    let recent_interactions = ai_interaction::recent_interactions(pool, 10).await?;

    Ok(Json(AiStats {
        total_interactions: usage.total_interactions,
        avg_processing_time: usage.average_processing_time_ms.round() as i64,
        total_chats_with_ai: usage.ai_enabled_conversations,
        recent_interactions,
    }))
}

/// Trimmed value, `None` when blank.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(" +31 ".to_string())).as_deref(), Some("+31"));
    }

    #[test]
    fn send_body_keeps_media_urls() {
        let body: SendMessageBody = serde_json::from_value(json!({
            "to": "+31612345678",
            "text": "Kijk",
            "imageUrl": "https://cdn.bargainb.nl/a.jpg",
            "documentUrl": " ",
        }))
        .unwrap();
        let request = body.into_request().unwrap();
        assert_eq!(request.image_url.as_deref(), Some("https://cdn.bargainb.nl/a.jpg"));
        assert_eq!(request.document_url, None);
        assert_eq!(request.text.as_deref(), Some("Kijk"));

        let no_text: SendMessageBody =
            serde_json::from_value(json!({"to": "+31612345678", "imageUrl": "https://x/a.jpg"})).unwrap();
        assert!(no_text.into_request().is_none());
    }

    #[test]
    fn ai_stats_serialize_camel_case() {
        let stats = AiStats {
            total_interactions: 3,
            avg_processing_time: 1200,
            total_chats_with_ai: 2,
            recent_interactions: Vec::new(),
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["totalInteractions"], 3);
        assert_eq!(value["avgProcessingTime"], 1200);
        assert_eq!(value["totalChatsWithAI"], 2);
        assert!(value["recentInteractions"].as_array().unwrap().is_empty());
    }
}
