//! Conversation and message endpoints of the admin inbox.

use axum::extract::{Path, Query, State};
use axum::Json;
use database::contact::{self, NewContact};
use database::conversation::{
    self, ConversationFilters, ConversationUpdate, NewConversation, StatusFilter,
};
use database::message::{self, NewMessage};
use database::{MessageStatus, MessageType, SenderType};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use wasender::SendMessageRequest;

use crate::error::{ApiError, Result};
use crate::routes::whatsapp::non_empty;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ConversationQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ConversationQuery {
    fn into_filters(self) -> Result<ConversationFilters> {
        let status = match self.status.as_deref() {
            Some(raw) => raw
                .parse::<StatusFilter>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid status filter: {}", raw)))?,
            None => StatusFilter::All,
        };
        Ok(ConversationFilters {
            search: self.search,
            status,
            start: self.start,
            end: self.end,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Value>> {
    let page = conversation::get_conversations(state.db.pool(), &query.into_filters()?).await?;
    Ok(Json(json!({ "success": true, "data": page })))
}

#[derive(Debug, Deserialize)]
pub struct ContactInput {
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub push_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationBody {
    pub contact: Option<ContactInput>,
    pub title: Option<String>,
    #[serde(default)]
    pub ai_enabled: bool,
}

/// Start a conversation with a phone number, creating the contact if needed.
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationBody>,
) -> Result<Json<Value>> {
    let pool = state.db.pool();
    let input = body
        .contact
        .ok_or_else(|| ApiError::BadRequest("Contact phone number is required".to_string()))?;
    let phone = non_empty(input.phone_number)
        .ok_or_else(|| ApiError::BadRequest("Contact phone number is required".to_string()))?;

    let mut new_contact = NewContact::from_phone(&phone)?;
    new_contact.display_name = non_empty(input.display_name);
    new_contact.push_name = non_empty(input.push_name);
    let contact = contact::upsert_contact(pool, &new_contact).await?;

    if let Some(existing) = conversation::get_conversation_by_whatsapp_id(pool, &contact.whatsapp_jid).await? {
        let conversation = conversation::get_conversation(pool, &existing.id).await?;
        return Ok(Json(json!({
            "success": true,
            "data": {
                "conversation": conversation,
                "contact": contact,
                "message": "Conversation already exists",
            },
        })));
    }

    let created = conversation::create_conversation(
        pool,
        &NewConversation {
            whatsapp_contact_id: contact.id.clone(),
            whatsapp_conversation_id: contact.whatsapp_jid.clone(),
            title: non_empty(body.title).or_else(|| Some(contact.name().to_string())),
            ai_enabled: body.ai_enabled,
        },
    )
    .await?;
    let conversation = conversation::get_conversation(pool, &created.id).await?;

    info!(conversation_id = %created.id, phone = %contact.phone_number, "Conversation created");
    Ok(Json(json!({
        "success": true,
        "data": {
            "conversation": conversation,
            "contact": contact,
        },
    })))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let conversation = conversation::get_conversation(state.db.pool(), &id).await?;
    Ok(Json(json!({ "success": true, "data": conversation })))
}

pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ConversationUpdate>,
) -> Result<Json<Value>> {
    let conversation = conversation::update_conversation(state.db.pool(), &id, &update).await?;
    Ok(Json(json!({ "success": true, "data": conversation })))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    conversation::delete_conversation(state.db.pool(), &id).await?;
    info!(conversation_id = %id, "Conversation deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Conversation deleted successfully",
    })))
}

/// Zero a conversation's unread counter.
pub async fn mark_as_read(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let read_at = conversation::mark_conversation_as_read(state.db.pool(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Conversation marked as read",
        "conversationId": id,
        "readAt": read_at,
    })))
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub conversation_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Value>> {
    let conversation_id = non_empty(query.conversation_id)
        .ok_or_else(|| ApiError::BadRequest("conversation_id is required".to_string()))?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);

    let page = message::get_messages_by_conversation(state.db.pool(), &conversation_id, limit, offset).await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "conversationId": conversation_id,
            "messages": page.messages,
            "total_count": page.total_count,
            "conversation": page.conversation,
        },
    })))
}

/// Record a message without sending it.
pub async fn create_message(
    State(state): State<AppState>,
    Json(new): Json<NewMessage>,
) -> Result<Json<Value>> {
    let message = message::create_message(state.db.pool(), &new).await?;
    Ok(Json(json!({ "success": true, "data": message })))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: MessageStatus,
}

pub async fn update_message_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Value>> {
    let message = message::update_message_status(state.db.pool(), &id, body.status).await?;
    Ok(Json(json!({ "success": true, "data": message })))
}

pub async fn delete_message(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    message::delete_message(state.db.pool(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Message deleted successfully",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundBody {
    pub conversation_id: Option<String>,
    pub phone_number: Option<String>,
    pub message: Option<String>,
    pub message_type: Option<String>,
    pub media_url: Option<String>,
}

/// Send an admin message through WASender and record it on the conversation.
pub async fn send_outbound(
    State(state): State<AppState>,
    Json(body): Json<OutboundBody>,
) -> Result<Json<Value>> {
    let (Some(conversation_id), Some(phone_number), Some(text)) = (
        non_empty(body.conversation_id),
        non_empty(body.phone_number),
        non_empty(body.message),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing required fields: conversationId, phoneNumber, and message are required"
                .to_string(),
        ));
    };
    let message_type = body
        .message_type
        .as_deref()
        .and_then(|t| t.parse::<MessageType>().ok())
        .unwrap_or(MessageType::Text);
    let media_url = non_empty(body.media_url);

    let pool = state.db.pool();
    let wasender = state.wasender()?;
    conversation::get_conversation(pool, &conversation_id).await?;

    let request = outbound_request(&phone_number, &text, message_type, media_url.as_deref());
    let sent = wasender
        .send_message(&request)
        .await
        .map_err(|err| ApiError::wasender("Failed to send message via WASender API", err))?;
    let wasender_message_id = sent.data.as_ref().and_then(|d| d.msg_id);
    let provider_status = sent
        .data
        .as_ref()
        .and_then(|d| d.status.as_deref())
        .and_then(sent_status);

    let mut new = NewMessage::outbound(&conversation_id, &text, SenderType::Admin)
        .with_type(message_type, media_url);
    if let Some(id) = wasender_message_id {
        new = new.with_whatsapp_id(id.to_string());
    }
    if let Some(status) = provider_status {
        new = new.with_status(status);
    }
    let stored = message::create_message(pool, &new).await?;

    info!(%conversation_id, ?wasender_message_id, "Outbound message sent");
    Ok(Json(json!({
        "success": true,
        "data": {
            "message": stored,
            "wasender_message_id": wasender_message_id,
        },
        "message": "Message sent successfully",
    })))
}

/// Stored status for the state WASender reports right after a send.
fn sent_status(reported: &str) -> Option<MessageStatus> {
    match reported {
        "in_progress" | "queued" => Some(MessageStatus::Pending),
        other => other.parse().ok(),
    }
}

/// Provider request for an outbound message; media without a URL is sent as text.
fn outbound_request(
    to: &str,
    text: &str,
    message_type: MessageType,
    media_url: Option<&str>,
) -> SendMessageRequest {
    let Some(url) = media_url else {
        return SendMessageRequest::text(to, text);
    };
    let mut request = SendMessageRequest::text(to, text);
    match message_type {
        MessageType::Image => request = SendMessageRequest::image(to, url).with_text(text),
        MessageType::Video => request.video_url = Some(url.to_string()),
        MessageType::Audio => request.audio_url = Some(url.to_string()),
        MessageType::Document => request = request.with_document(url),
        MessageType::Sticker => request.sticker_url = Some(url.to_string()),
        _ => {}
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_filter_is_rejected() {
        let query = ConversationQuery {
            status: Some("closed".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.into_filters(), Err(ApiError::BadRequest(_))));

        let query = ConversationQuery {
            status: Some("unread".to_string()),
            ..Default::default()
        };
        assert_eq!(query.into_filters().unwrap().status, StatusFilter::Unread);
    }

    #[test]
    fn media_messages_carry_their_url() {
        let image = outbound_request("+31612345678", "look", MessageType::Image, Some("https://x/a.jpg"));
        assert_eq!(image.image_url.as_deref(), Some("https://x/a.jpg"));
        assert_eq!(image.text.as_deref(), Some("look"));

        let doc = outbound_request("+31612345678", "list", MessageType::Document, Some("https://x/l.pdf"));
        assert_eq!(doc.document_url.as_deref(), Some("https://x/l.pdf"));

        let plain = outbound_request("+31612345678", "hi", MessageType::Image, None);
        assert!(plain.image_url.is_none());
        assert_eq!(plain.text.as_deref(), Some("hi"));
    }

    #[test]
    fn reported_send_state_maps_to_status() {
        assert_eq!(sent_status("in_progress"), Some(MessageStatus::Pending));
        assert_eq!(sent_status("delivered"), Some(MessageStatus::Delivered));
        assert_eq!(sent_status("bounced"), None);
    }
}
