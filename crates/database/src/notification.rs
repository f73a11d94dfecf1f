//! Unread-message aggregation for the admin notification bell.

use futures::future::join_all;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;
use crate::models::SenderType;
use crate::now;

/// Unread totals plus the newest unread message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    pub total_unread: i64,
    pub conversations_with_unread: i64,
    pub latest_message: Option<LatestMessage>,
}

/// The newest message in a conversation with unread messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct LatestMessage {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub contact_name: String,
    pub created_at: String,
}

/// A conversation with unread messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UnreadConversation {
    pub conversation_id: String,
    pub contact_name: String,
    pub unread_count: i64,
    /// Content of the newest message, "No messages" when there is none
    pub last_message: String,
    pub last_message_at: Option<String>,
}

/// Dashboard-level counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationSummary {
    pub total_unread_messages: i64,
    pub unread_conversations: i64,
    pub total_conversations: i64,
    pub active_contacts: i64,
}

/// Latest message of an unread conversation, for the recent-messages feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentMessage {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub sender_name: String,
    pub created_at: String,
    pub unread_count: i64,
    pub contact_name: String,
    pub phone_number: String,
}

/// Contact name with the fallback chain used by notifications.
const NOTIFICATION_CONTACT_NAME: &str =
    "COALESCE(ct.display_name, ct.push_name, ct.verified_name, ct.phone_number, 'Unknown')";

/// Totals over conversations with unread messages.
pub async fn get_notification_data(pool: &SqlitePool) -> Result<NotificationData> {
    let (total_unread, conversations_with_unread) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COALESCE(SUM(unread_count), 0), COUNT(*)
        FROM conversations
        WHERE unread_count > 0
        "#,
    )
    .fetch_one(pool)
    .await?;

    let latest_message = sqlx::query_as::<_, LatestMessage>(&format!(
        r#"
        SELECT m.id, m.conversation_id, m.content,
               {NOTIFICATION_CONTACT_NAME} AS contact_name, m.created_at
        FROM messages m
        JOIN conversations cv ON cv.id = m.conversation_id
        JOIN whatsapp_contacts ct ON ct.id = cv.whatsapp_contact_id
        WHERE cv.unread_count > 0 AND m.direction = 'inbound'
        ORDER BY m.created_at DESC, m.rowid DESC
        LIMIT 1
        "#
    ))
    .fetch_optional(pool)
    .await?;

    Ok(NotificationData {
        total_unread,
        conversations_with_unread,
        latest_message,
    })
}

/// Conversations with unread messages, most recent activity first.
pub async fn get_unread_conversations(pool: &SqlitePool, limit: i64) -> Result<Vec<UnreadConversation>> {
    let rows = sqlx::query_as::<_, UnreadConversation>(&format!(
        r#"
        SELECT cv.id AS conversation_id,
               {NOTIFICATION_CONTACT_NAME} AS contact_name,
               cv.unread_count,
               COALESCE(
                   (SELECT m.content FROM messages m
                    WHERE m.conversation_id = cv.id
                    ORDER BY m.created_at DESC, m.rowid DESC
                    LIMIT 1),
                   'No messages'
               ) AS last_message,
               cv.last_message_at
        FROM conversations cv
        JOIN whatsapp_contacts ct ON ct.id = cv.whatsapp_contact_id
        WHERE cv.unread_count > 0
        ORDER BY cv.last_message_at DESC
        LIMIT ?
        "#
    ))
    .bind(limit.max(1))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counters for the dashboard header.
pub async fn get_notification_summary(pool: &SqlitePool) -> Result<NotificationSummary> {
    let (total_unread_messages, unread_conversations, total_conversations) =
        sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COALESCE(SUM(unread_count), 0),
                   COALESCE(SUM(CASE WHEN unread_count > 0 THEN 1 ELSE 0 END), 0),
                   COUNT(*)
            FROM conversations
            "#,
        )
        .fetch_one(pool)
        .await?;

    let active_contacts = crate::contact::count_active_contacts(pool).await?;

    Ok(NotificationSummary {
        total_unread_messages,
        unread_conversations,
        total_conversations,
        active_contacts,
    })
}

/// Zero every unread counter. Returns the number of conversations changed.
pub async fn mark_all_conversations_as_read(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET unread_count = 0, updated_at = ?
        WHERE unread_count > 0
        "#,
    )
    .bind(now())
    .execute(pool)
    .await?;

    tracing::info!(conversations = result.rows_affected(), "Marked all conversations as read");
    Ok(result.rows_affected())
}

/// Increment one conversation's unread counter.
pub async fn increment_unread_count(pool: &SqlitePool, conversation_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET unread_count = unread_count + 1, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now())
    .bind(conversation_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(crate::DatabaseError::NotFound {
            entity: "Conversation",
            id: conversation_id.to_string(),
        });
    }

    Ok(())
}

#[derive(FromRow)]
struct UnreadHead {
    id: String,
    unread_count: i64,
    display_name: Option<String>,
    push_name: Option<String>,
    phone_number: String,
}

#[derive(FromRow)]
struct NewestMessage {
    id: String,
    content: String,
    sender_type: SenderType,
    created_at: String,
}

async fn newest_message(pool: &SqlitePool, conversation_id: &str) -> Result<Option<NewestMessage>> {
    let message = sqlx::query_as::<_, NewestMessage>(
        r#"
        SELECT id, content, sender_type, created_at
        FROM messages
        WHERE conversation_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}

/// Latest message of each of the top `limit` unread conversations, newest first.
///
/// One lookup per conversation, all issued concurrently. Conversations whose
/// lookup fails or that have no messages are left out.
pub async fn get_recent_messages(pool: &SqlitePool, limit: i64) -> Result<Vec<RecentMessage>> {
    let heads = sqlx::query_as::<_, UnreadHead>(
        r#"
        SELECT cv.id, cv.unread_count, ct.display_name, ct.push_name, ct.phone_number
        FROM conversations cv
        JOIN whatsapp_contacts ct ON ct.id = cv.whatsapp_contact_id
        WHERE cv.unread_count > 0
        ORDER BY cv.last_message_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit.max(1))
    .fetch_all(pool)
    .await?;

    let lookups = heads.iter().map(|head| newest_message(pool, &head.id));
    let results = join_all(lookups).await;

    let mut recent: Vec<RecentMessage> = heads
        .into_iter()
        .zip(results)
        .filter_map(|(head, result)| {
            let message = match result {
                Ok(Some(message)) => message,
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!(conversation_id = %head.id, error = %e, "Skipping conversation in recent messages");
                    return None;
                }
            };
            let contact_name = head
                .display_name
                .or(head.push_name)
                .unwrap_or_else(|| "Unknown Contact".to_string());
            let sender_name = match message.sender_type {
                SenderType::User => contact_name.clone(),
                SenderType::Admin | SenderType::Ai => "AI Assistant".to_string(),
            };
            Some(RecentMessage {
                id: message.id,
                conversation_id: head.id,
                content: message.content,
                sender_name,
                created_at: message.created_at,
                unread_count: head.unread_count,
                contact_name,
                phone_number: head.phone_number,
            })
        })
        .collect();

    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(recent)
}
