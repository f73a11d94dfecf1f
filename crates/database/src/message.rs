//! Message operations.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::conversation;
use crate::error::{DatabaseError, Result};
use crate::models::{
    ConversationWithContact, Message, MessageDirection, MessageStatus, MessageType, SenderType,
};
use crate::validation;
use crate::{new_id, now};

/// Message columns plus the derived `sender_name`.
const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.conversation_id, m.content, m.direction, m.from_me, m.message_type,
           m.sender_type, m.whatsapp_message_id, m.whatsapp_status, m.media_url,
           m.is_ai_triggered, m.ai_thread_id, m.created_at,
           CASE m.sender_type
               WHEN 'ai' THEN 'AI Assistant'
               WHEN 'admin' THEN 'BargainB'
               ELSE COALESCE(ct.display_name, ct.push_name, ct.phone_number)
           END AS sender_name
    FROM messages m
    JOIN conversations cv ON cv.id = m.conversation_id
    JOIN whatsapp_contacts ct ON ct.id = cv.whatsapp_contact_id
"#;

/// Fields for a new message.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub content: String,
    pub direction: MessageDirection,
    pub sender_type: SenderType,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    pub whatsapp_message_id: Option<String>,
    #[serde(default = "default_status")]
    pub whatsapp_status: MessageStatus,
    pub media_url: Option<String>,
    #[serde(default)]
    pub is_ai_triggered: bool,
    pub ai_thread_id: Option<String>,
    /// Provider payload kept for debugging
    #[serde(default)]
    pub raw_message_data: Option<serde_json::Value>,
    /// Defaults to now
    pub created_at: Option<String>,
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

fn default_status() -> MessageStatus {
    MessageStatus::Sent
}

impl NewMessage {
    /// A text message received from the contact.
    pub fn inbound(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            direction: MessageDirection::Inbound,
            sender_type: SenderType::User,
            message_type: MessageType::Text,
            whatsapp_message_id: None,
            whatsapp_status: MessageStatus::Delivered,
            media_url: None,
            is_ai_triggered: false,
            ai_thread_id: None,
            raw_message_data: None,
            created_at: None,
        }
    }

    /// A text message sent to the contact by an admin or the assistant.
    pub fn outbound(
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        sender_type: SenderType,
    ) -> Self {
        Self {
            direction: MessageDirection::Outbound,
            sender_type,
            whatsapp_status: MessageStatus::Sent,
            ..Self::inbound(conversation_id, content)
        }
    }

    pub fn with_whatsapp_id(mut self, id: impl Into<String>) -> Self {
        self.whatsapp_message_id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.whatsapp_status = status;
        self
    }

    pub fn with_type(mut self, message_type: MessageType, media_url: Option<String>) -> Self {
        self.message_type = message_type;
        self.media_url = media_url;
        self
    }

    pub fn with_ai_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.is_ai_triggered = true;
        self.ai_thread_id = Some(thread_id.into());
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw_message_data = Some(raw);
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }
}

/// A page of messages for one conversation.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total_count: i64,
    pub conversation: ConversationWithContact,
}

/// Insert a message and bump its conversation.
///
/// The parent's `last_message_at` moves forward to the message timestamp and
/// inbound messages increment `unread_count`. Both writes share a transaction.
pub async fn create_message(pool: &SqlitePool, new: &NewMessage) -> Result<Message> {
    validation::require("conversation_id", &new.conversation_id)?;
    validation::validate_message_content(&new.content)?;

    let id = new_id();
    let created_at = new.created_at.clone().unwrap_or_else(now);
    let unread_increment: i64 = match new.direction {
        MessageDirection::Inbound => 1,
        MessageDirection::Outbound => 0,
    };

    let mut tx = pool.begin().await?;

    let bumped = sqlx::query(
        r#"
        UPDATE conversations
        SET last_message_at = CASE
                WHEN last_message_at IS NULL OR last_message_at < ? THEN ?
                ELSE last_message_at
            END,
            unread_count = unread_count + ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&created_at)
    .bind(&created_at)
    .bind(unread_increment)
    .bind(now())
    .bind(&new.conversation_id)
    .execute(&mut *tx)
    .await?;

    if bumped.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: new.conversation_id.clone(),
        });
    }

    sqlx::query(
        r#"
        INSERT INTO messages
            (id, conversation_id, content, direction, from_me, message_type, sender_type,
             whatsapp_message_id, whatsapp_status, media_url, is_ai_triggered, ai_thread_id,
             raw_message_data, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.conversation_id)
    .bind(&new.content)
    .bind(new.direction)
    .bind(new.direction == MessageDirection::Outbound)
    .bind(new.message_type)
    .bind(new.sender_type)
    .bind(&new.whatsapp_message_id)
    .bind(new.whatsapp_status)
    .bind(&new.media_url)
    .bind(new.is_ai_triggered)
    .bind(&new.ai_thread_id)
    .bind(new.raw_message_data.as_ref().map(|v| v.to_string()))
    .bind(&created_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        let key = new.whatsapp_message_id.as_deref().unwrap_or(&id);
        DatabaseError::from_insert(e, "Message", key)
    })?;

    tx.commit().await?;

    tracing::debug!(
        message_id = %id,
        conversation_id = %new.conversation_id,
        direction = %new.direction,
        "Created message"
    );

    get_message(pool, &id).await
}

/// Get a message by ID.
pub async fn get_message(pool: &SqlitePool, id: &str) -> Result<Message> {
    sqlx::query_as::<_, Message>(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        })
}

/// Look up a message by its provider id, used to drop duplicate webhook deliveries.
pub async fn get_message_by_whatsapp_id(
    pool: &SqlitePool,
    whatsapp_message_id: &str,
) -> Result<Option<Message>> {
    let message = sqlx::query_as::<_, Message>(&format!(
        "{MESSAGE_SELECT} WHERE m.whatsapp_message_id = ?"
    ))
    .bind(whatsapp_message_id)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}

/// Messages of a conversation.
///
/// With `offset == 0` this returns the newest `limit` messages in
/// chronological order. A non-zero offset returns the ascending window
/// starting at `offset`.
pub async fn get_messages_by_conversation(
    pool: &SqlitePool,
    conversation_id: &str,
    limit: i64,
    offset: i64,
) -> Result<MessagePage> {
    let conversation = conversation::get_conversation(pool, conversation_id).await?;
    let limit = limit.clamp(1, 500);

    let messages = if offset <= 0 {
        let mut newest = sqlx::query_as::<_, Message>(&format!(
            "{MESSAGE_SELECT} WHERE m.conversation_id = ? ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?"
        ))
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        newest.reverse();
        newest
    } else {
        sqlx::query_as::<_, Message>(&format!(
            "{MESSAGE_SELECT} WHERE m.conversation_id = ? ORDER BY m.created_at ASC, m.rowid ASC LIMIT ? OFFSET ?"
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    };

    let total_count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM messages WHERE conversation_id = ?
        "#,
    )
    .bind(conversation_id)
    .fetch_one(pool)
    .await?;

    Ok(MessagePage {
        messages,
        total_count,
        conversation,
    })
}

/// Update the delivery status of a message.
pub async fn update_message_status(
    pool: &SqlitePool,
    id: &str,
    status: MessageStatus,
) -> Result<Message> {
    let result = sqlx::query(
        r#"
        UPDATE messages
        SET whatsapp_status = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        });
    }

    get_message(pool, id).await
}

/// Update the status of a message identified by its provider id.
///
/// Returns `false` when no such message is stored.
pub async fn update_status_by_whatsapp_id(
    pool: &SqlitePool,
    whatsapp_message_id: &str,
    status: MessageStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE messages
        SET whatsapp_status = ?
        WHERE whatsapp_message_id = ?
        "#,
    )
    .bind(status)
    .bind(whatsapp_message_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a message by ID.
pub async fn delete_message(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM messages
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_conversation, seed_message, test_db};

    #[tokio::test]
    async fn inbound_increments_unread_and_outbound_does_not() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;

        let inbound = create_message(
            db.pool(),
            &NewMessage::inbound(&chat.id, "Hebben jullie korting op koffie?")
                .with_created_at("2025-03-01T10:00:00.000Z"),
        )
        .await
        .unwrap();
        assert_eq!(inbound.sender_name, "Sanne");
        assert!(!inbound.from_me);
        assert_eq!(inbound.whatsapp_status, MessageStatus::Delivered);

        let reply = create_message(
            db.pool(),
            &NewMessage::outbound(&chat.id, "Ja, bij Jumbo!", SenderType::Admin)
                .with_created_at("2025-03-01T10:05:00.000Z"),
        )
        .await
        .unwrap();
        assert!(reply.from_me);
        assert_eq!(reply.sender_name, "BargainB");

        let after = conversation::get_conversation(db.pool(), &chat.id).await.unwrap();
        assert_eq!(after.conversation.unread_count, 1);
        assert_eq!(
            after.conversation.last_message_at.as_deref(),
            Some("2025-03-01T10:05:00.000Z")
        );
    }

    #[tokio::test]
    async fn last_message_at_never_moves_backwards() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        seed_message(&db, &chat.id, "nieuw", MessageDirection::Inbound, "2025-03-02T10:00:00.000Z").await;
        seed_message(&db, &chat.id, "oud", MessageDirection::Inbound, "2025-03-01T10:00:00.000Z").await;

        let after = conversation::get_conversation(db.pool(), &chat.id).await.unwrap();
        assert_eq!(
            after.conversation.last_message_at.as_deref(),
            Some("2025-03-02T10:00:00.000Z")
        );
        assert_eq!(after.conversation.unread_count, 2);
    }

    #[tokio::test]
    async fn rejects_missing_fields_and_unknown_conversation() {
        let db = test_db().await;
        let empty = create_message(db.pool(), &NewMessage::inbound("", "hoi")).await;
        assert!(matches!(empty, Err(DatabaseError::Invalid(_))));

        let blank = create_message(db.pool(), &NewMessage::inbound("c1", "  ")).await;
        assert!(matches!(blank, Err(DatabaseError::Invalid(_))));

        let orphan = create_message(db.pool(), &NewMessage::inbound("missing", "hoi")).await;
        assert!(matches!(orphan, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn duplicate_provider_id_is_rejected_without_side_effects() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;

        let first = NewMessage::inbound(&chat.id, "hoi").with_whatsapp_id("3EB0ABC");
        create_message(db.pool(), &first).await.unwrap();

        let second = create_message(db.pool(), &first).await;
        assert!(matches!(second, Err(DatabaseError::AlreadyExists { .. })));

        let found = get_message_by_whatsapp_id(db.pool(), "3EB0ABC").await.unwrap();
        assert!(found.is_some());
        assert!(get_message_by_whatsapp_id(db.pool(), "other").await.unwrap().is_none());

        // The rolled-back counter bump leaves a single unread message.
        let after = conversation::get_conversation(db.pool(), &chat.id).await.unwrap();
        assert_eq!(after.conversation.unread_count, 1);
    }

    #[tokio::test]
    async fn pagination_quirk() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        for i in 0..5 {
            seed_message(
                &db,
                &chat.id,
                &format!("m{}", i),
                MessageDirection::Inbound,
                &format!("2025-03-01T10:0{}:00.000Z", i),
            )
            .await;
        }

        let newest = get_messages_by_conversation(db.pool(), &chat.id, 2, 0).await.unwrap();
        let contents: Vec<&str> = newest.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
        assert_eq!(newest.total_count, 5);
        assert_eq!(newest.conversation.contact.push_name.as_deref(), Some("Sanne"));

        let window = get_messages_by_conversation(db.pool(), &chat.id, 2, 1).await.unwrap();
        let contents: Vec<&str> = window.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);

        let missing = get_messages_by_conversation(db.pool(), "nope", 10, 0).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn status_update_and_delete() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        let msg = create_message(
            db.pool(),
            &NewMessage::outbound(&chat.id, "Hier is je lijstje", SenderType::Ai)
                .with_whatsapp_id("ai_1")
                .with_ai_thread("thread-1"),
        )
        .await
        .unwrap();
        assert_eq!(msg.sender_name, "AI Assistant");
        assert!(msg.is_ai_triggered);

        let read = update_message_status(db.pool(), &msg.id, MessageStatus::Read)
            .await
            .unwrap();
        assert_eq!(read.whatsapp_status, MessageStatus::Read);

        assert!(update_status_by_whatsapp_id(db.pool(), "ai_1", MessageStatus::Delivered)
            .await
            .unwrap());
        assert!(!update_status_by_whatsapp_id(db.pool(), "nope", MessageStatus::Delivered)
            .await
            .unwrap());

        delete_message(db.pool(), &msg.id).await.unwrap();
        assert!(matches!(
            get_message(db.pool(), &msg.id).await,
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            update_message_status(db.pool(), &msg.id, MessageStatus::Read).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
