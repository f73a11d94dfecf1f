//! Ingestion of WASender webhook events.

use chrono::{DateTime, SecondsFormat};
use database::contact::{self, NewContact};
use database::message::{self, NewMessage};
use database::{
    conversation, Contact, Conversation, DatabaseError, MessageStatus, MessageType, SenderType,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use wasender::{ContentKind, DeliveryStatus, WebhookMessage, WebhookPayload};

use crate::services::{ai, mention};
use crate::state::AppState;

/// Counts for one webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookOutcome {
    pub stored: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub ai_triggered: usize,
    pub updated: usize,
}

/// Apply a webhook event.
///
/// `messages.upsert` stores messages. Group chats and empty text are
/// skipped. A provider message id already on file is counted as a
/// duplicate and not stored again. Inbound text mentioning the assistant
/// starts an AI reply in the background.
///
/// `messages.update` moves the delivery status of a stored message.
pub async fn process_webhook(
    state: &AppState,
    payload: &WebhookPayload,
) -> Result<WebhookOutcome, DatabaseError> {
    let mut outcome = WebhookOutcome::default();
    if payload.is_message_update() {
        if apply_status_update(state, payload).await? {
            outcome.updated += 1;
        }
        return Ok(outcome);
    }
    if !payload.is_message_upsert() {
        debug!(event = %payload.event, "Ignoring webhook event");
        return Ok(outcome);
    }

    for msg in &payload.data.messages {
        match store_message(state, msg).await? {
            Stored::Skipped => outcome.skipped += 1,
            Stored::Duplicate => outcome.duplicates += 1,
            Stored::New { ai_triggered } => {
                outcome.stored += 1;
                if ai_triggered {
                    outcome.ai_triggered += 1;
                }
            }
        }
    }

    info!(
        stored = outcome.stored,
        skipped = outcome.skipped,
        duplicates = outcome.duplicates,
        "Webhook processed"
    );
    Ok(outcome)
}

async fn apply_status_update(
    state: &AppState,
    payload: &WebhookPayload,
) -> Result<bool, DatabaseError> {
    let Some((id, delivery)) = payload.status_update() else {
        debug!("Status update without message id or known status");
        return Ok(false);
    };
    let status = delivery_status(delivery);
    let updated = message::update_status_by_whatsapp_id(state.db.pool(), id, status).await?;
    if updated {
        info!(id, status = %status, "Message status updated");
    } else {
        debug!(id, "Status update for unknown message");
    }
    Ok(updated)
}

fn delivery_status(status: DeliveryStatus) -> MessageStatus {
    match status {
        DeliveryStatus::Error => MessageStatus::Error,
        DeliveryStatus::Pending => MessageStatus::Pending,
        DeliveryStatus::Sent => MessageStatus::Sent,
        DeliveryStatus::Delivered => MessageStatus::Delivered,
        DeliveryStatus::Read => MessageStatus::Read,
        DeliveryStatus::Played => MessageStatus::Played,
    }
}

enum Stored {
    Skipped,
    Duplicate,
    New { ai_triggered: bool },
}

async fn store_message(state: &AppState, msg: &WebhookMessage) -> Result<Stored, DatabaseError> {
    let pool = state.db.pool();

    if msg.is_group() {
        debug!(jid = %msg.key.remote_jid, "Skipping group message");
        return Ok(Stored::Skipped);
    }
    let content = msg.content();
    if content.is_empty_text() {
        debug!(id = %msg.key.id, "Skipping empty message");
        return Ok(Stored::Skipped);
    }
    if message::get_message_by_whatsapp_id(pool, &msg.key.id).await?.is_some() {
        debug!(id = %msg.key.id, "Duplicate webhook delivery");
        return Ok(Stored::Duplicate);
    }

    let mut new_contact = NewContact::from_jid(&msg.key.remote_jid);
    if !msg.key.from_me {
        new_contact.push_name = msg.push_name.clone().filter(|n| !n.trim().is_empty());
    }
    let contact = contact::upsert_contact(pool, &new_contact).await?;
    let chat = conversation::find_or_create_for_contact(pool, &contact).await?;

    let mut new_message = if msg.key.from_me {
        NewMessage::outbound(&chat.id, &content.text, SenderType::Admin)
    } else {
        NewMessage::inbound(&chat.id, &content.text)
    }
    .with_whatsapp_id(&msg.key.id)
    .with_type(message_type(content.kind), content.media_url.clone());
    if let Ok(raw) = serde_json::to_value(msg) {
        new_message = new_message.with_raw(raw);
    }
    if let Some(stamp) = timestamp(msg.message_timestamp) {
        new_message = new_message.with_created_at(stamp);
    }

    match message::create_message(pool, &new_message).await {
        Ok(_) => {}
        Err(DatabaseError::AlreadyExists { .. }) => return Ok(Stored::Duplicate),
        Err(err) => return Err(err),
    }

    if msg.key.from_me {
        return Ok(Stored::New { ai_triggered: false });
    }

    if let Err(err) = contact::update_last_seen(pool, &contact.id, &database::now()).await {
        warn!(contact_id = %contact.id, error = %err, "Failed to update last seen");
    }

    let ai_triggered = content.kind == ContentKind::Text && trigger_ai(state, &chat, &contact, &content.text);
    Ok(Stored::New { ai_triggered })
}

/// Start an AI reply when the text mentions the assistant and AI is on.
fn trigger_ai(state: &AppState, chat: &Conversation, contact: &Contact, text: &str) -> bool {
    let detection = mention::detect_bb_mention(text);
    if !detection.is_bb_mention || !chat.ai_enabled || state.agent.is_none() {
        return false;
    }

    let state = state.clone();
    let chat_id = chat.id.clone();
    let contact_id = contact.id.clone();
    let phone_number = contact.phone_number.clone();
    let query = detection.user_query;

    tokio::spawn(async move {
        let Some(agent) = state.agent.as_ref() else {
            return;
        };
        let reply = match ai::process_ai_message(&state.db, agent, &chat_id, &query, &contact_id).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(conversation_id = %chat_id, error = %err, "AI reply failed");
                return;
            }
        };

        let Some(wasender) = state.wasender.as_ref() else {
            warn!(conversation_id = %chat_id, "AI reply stored but WASender is not configured");
            return;
        };
        if let Err(err) = wasender.send_text(&phone_number, &reply.ai_response).await {
            warn!(conversation_id = %chat_id, error = %err, "Failed to deliver AI reply");
        }
    });

    true
}

fn message_type(kind: ContentKind) -> MessageType {
    match kind {
        ContentKind::Text => MessageType::Text,
        ContentKind::Image => MessageType::Image,
        ContentKind::Video => MessageType::Video,
        ContentKind::Audio => MessageType::Audio,
        ContentKind::Document => MessageType::Document,
        ContentKind::Sticker => MessageType::Sticker,
    }
}

/// RFC 3339 form of a WhatsApp unix timestamp; `None` when unset.
fn timestamp(seconds: i64) -> Option<String> {
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0).map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_matches_database_format() {
        assert_eq!(timestamp(1_735_689_600).as_deref(), Some("2025-01-01T00:00:00.000Z"));
        assert_eq!(timestamp(0), None);
    }

    #[test]
    fn media_kinds_map_to_message_types() {
        assert_eq!(message_type(ContentKind::Sticker), MessageType::Sticker);
        assert_eq!(message_type(ContentKind::Text), MessageType::Text);
    }

    #[test]
    fn receipts_map_to_stored_statuses() {
        assert_eq!(delivery_status(DeliveryStatus::Read), MessageStatus::Read);
        assert_eq!(delivery_status(DeliveryStatus::Played), MessageStatus::Played);
        assert_eq!(delivery_status(DeliveryStatus::Error), MessageStatus::Error);
    }
}
