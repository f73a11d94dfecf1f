//! Conversation operations.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{Contact, Conversation, ConversationStatus, ConversationWithContact};
use crate::{new_id, now};

const CONVERSATION_COLUMNS: &str = r#"
    id, whatsapp_contact_id, whatsapp_conversation_id, title, status, unread_count,
    last_message_at, ai_enabled, ai_config, ai_thread_id, created_at, updated_at
"#;

const CONVERSATION_WITH_CONTACT_SELECT: &str = r#"
    SELECT cv.id, cv.whatsapp_contact_id, cv.whatsapp_conversation_id, cv.title, cv.status,
           cv.unread_count, cv.last_message_at, cv.ai_enabled, cv.ai_config, cv.ai_thread_id,
           cv.created_at, cv.updated_at,
           (SELECT m.content FROM messages m
            WHERE m.conversation_id = cv.id
            ORDER BY m.created_at DESC, m.rowid DESC
            LIMIT 1) AS last_message,
           ct.phone_number AS contact_phone_number,
           ct.whatsapp_jid AS contact_whatsapp_jid,
           ct.display_name AS contact_display_name,
           ct.push_name AS contact_push_name,
           ct.verified_name AS contact_verified_name,
           ct.profile_picture_url AS contact_profile_picture_url,
           ct.is_active AS contact_is_active,
           ct.last_seen_at AS contact_last_seen_at,
           ct.created_at AS contact_created_at,
           ct.updated_at AS contact_updated_at
    FROM conversations cv
    JOIN whatsapp_contacts ct ON ct.id = cv.whatsapp_contact_id
"#;

/// Flat row of the conversation/contact join.
#[derive(FromRow)]
struct ConversationJoinRow {
    #[sqlx(flatten)]
    conversation: Conversation,
    last_message: Option<String>,
    contact_phone_number: String,
    contact_whatsapp_jid: String,
    contact_display_name: Option<String>,
    contact_push_name: Option<String>,
    contact_verified_name: Option<String>,
    contact_profile_picture_url: Option<String>,
    contact_is_active: bool,
    contact_last_seen_at: Option<String>,
    contact_created_at: String,
    contact_updated_at: String,
}

impl From<ConversationJoinRow> for ConversationWithContact {
    fn from(row: ConversationJoinRow) -> Self {
        let contact = Contact {
            id: row.conversation.whatsapp_contact_id.clone(),
            phone_number: row.contact_phone_number,
            whatsapp_jid: row.contact_whatsapp_jid,
            display_name: row.contact_display_name,
            push_name: row.contact_push_name,
            verified_name: row.contact_verified_name,
            profile_picture_url: row.contact_profile_picture_url,
            is_active: row.contact_is_active,
            last_seen_at: row.contact_last_seen_at,
            created_at: row.contact_created_at,
            updated_at: row.contact_updated_at,
        };
        Self {
            conversation: row.conversation,
            last_message: row.last_message,
            contact,
        }
    }
}

/// Status filter for conversation listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Conversations with `unread_count > 0`
    Unread,
    Is(ConversationStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(Self::All),
            "unread" => Ok(Self::Unread),
            other => other.parse().map(Self::Is),
        }
    }
}

/// Filters for [`get_conversations`].
#[derive(Debug, Clone, Default)]
pub struct ConversationFilters {
    /// Case-insensitive substring over title, contact names and phone number
    pub search: Option<String>,
    pub status: StatusFilter,
    /// Inclusive lower bound on `last_message_at`
    pub start: Option<String>,
    /// Inclusive upper bound on `last_message_at`
    pub end: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One page of conversations.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationPage {
    pub conversations: Vec<ConversationWithContact>,
    /// Rows matching the filters, ignoring pagination
    pub total_count: i64,
    /// Sum of `unread_count` over the returned rows
    pub unread_count: i64,
}

/// Fields for a new conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConversation {
    pub whatsapp_contact_id: String,
    pub whatsapp_conversation_id: String,
    pub title: Option<String>,
    #[serde(default)]
    pub ai_enabled: bool,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub status: Option<ConversationStatus>,
    pub ai_enabled: Option<bool>,
    pub ai_config: Option<serde_json::Value>,
}

/// AI settings stored on a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct AiSettings {
    pub id: String,
    pub whatsapp_conversation_id: String,
    pub ai_enabled: bool,
    pub ai_config: Option<String>,
    pub ai_thread_id: Option<String>,
}

impl AiSettings {
    /// Parsed `ai_config`, or `Value::Null` when unset or malformed.
    pub fn config_value(&self) -> serde_json::Value {
        self.ai_config
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

fn push_conversation_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &ConversationFilters) {
    qb.push(" WHERE 1 = 1");

    match filters.status {
        StatusFilter::All => {}
        StatusFilter::Unread => {
            qb.push(" AND cv.unread_count > 0");
        }
        StatusFilter::Is(status) => {
            qb.push(" AND cv.status = ").push_bind(status.as_str());
        }
    }

    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term.to_lowercase());
        qb.push(" AND (LOWER(COALESCE(cv.title, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(ct.display_name, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(ct.push_name, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR ct.phone_number LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(start) = &filters.start {
        qb.push(" AND cv.last_message_at >= ").push_bind(start.clone());
    }
    if let Some(end) = &filters.end {
        qb.push(" AND cv.last_message_at <= ").push_bind(end.clone());
    }
}

/// List conversations with their contact and latest message, most recent activity first.
pub async fn get_conversations(
    pool: &SqlitePool,
    filters: &ConversationFilters,
) -> Result<ConversationPage> {
    let limit = filters.limit.unwrap_or(50).clamp(1, 500);
    let offset = filters.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::<Sqlite>::new(CONVERSATION_WITH_CONTACT_SELECT);
    push_conversation_filters(&mut qb, filters);
    qb.push(" ORDER BY cv.last_message_at IS NULL, cv.last_message_at DESC, cv.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build_query_as::<ConversationJoinRow>().fetch_all(pool).await?;
    let conversations: Vec<ConversationWithContact> = rows.into_iter().map(Into::into).collect();

    let mut count = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM conversations cv JOIN whatsapp_contacts ct ON ct.id = cv.whatsapp_contact_id",
    );
    push_conversation_filters(&mut count, filters);
    let total_count = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let unread_count = conversations
        .iter()
        .map(|c| c.conversation.unread_count)
        .sum();

    Ok(ConversationPage {
        conversations,
        total_count,
        unread_count,
    })
}

/// Get a conversation with its contact and latest message.
pub async fn get_conversation(pool: &SqlitePool, id: &str) -> Result<ConversationWithContact> {
    sqlx::query_as::<_, ConversationJoinRow>(&format!(
        "{CONVERSATION_WITH_CONTACT_SELECT} WHERE cv.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(Into::into)
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })
}

/// Find a conversation by the remote chat JID.
pub async fn get_conversation_by_whatsapp_id(
    pool: &SqlitePool,
    remote_jid: &str,
) -> Result<Option<Conversation>> {
    let conversation = sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE whatsapp_conversation_id = ?"
    ))
    .bind(remote_jid)
    .fetch_optional(pool)
    .await?;

    Ok(conversation)
}

async fn get_conversation_row(pool: &SqlitePool, id: &str) -> Result<Conversation> {
    sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })
}

/// Create a conversation.
pub async fn create_conversation(pool: &SqlitePool, new: &NewConversation) -> Result<Conversation> {
    crate::validation::require("whatsapp_contact_id", &new.whatsapp_contact_id)?;
    crate::validation::require("whatsapp_conversation_id", &new.whatsapp_conversation_id)?;

    let id = new_id();
    let stamp = now();

    sqlx::query(
        r#"
        INSERT INTO conversations
            (id, whatsapp_contact_id, whatsapp_conversation_id, title, status,
             unread_count, ai_enabled, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'active', 0, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.whatsapp_contact_id)
    .bind(&new.whatsapp_conversation_id)
    .bind(&new.title)
    .bind(new.ai_enabled)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Conversation", &new.whatsapp_conversation_id))?;

    tracing::debug!(conversation_id = %id, remote_jid = %new.whatsapp_conversation_id, "Created conversation");
    get_conversation_row(pool, &id).await
}

/// Return the contact's conversation, creating it on first contact.
pub async fn find_or_create_for_contact(pool: &SqlitePool, contact: &Contact) -> Result<Conversation> {
    if let Some(existing) = get_conversation_by_whatsapp_id(pool, &contact.whatsapp_jid).await? {
        return Ok(existing);
    }

    let new = NewConversation {
        whatsapp_contact_id: contact.id.clone(),
        whatsapp_conversation_id: contact.whatsapp_jid.clone(),
        title: Some(contact.name().to_string()),
        ai_enabled: false,
    };

    match create_conversation(pool, &new).await {
        Ok(conversation) => Ok(conversation),
        // Lost a race with a concurrent webhook delivery.
        Err(DatabaseError::AlreadyExists { .. }) => get_conversation_by_whatsapp_id(pool, &contact.whatsapp_jid)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "Conversation",
                id: contact.whatsapp_jid.clone(),
            }),
        Err(e) => Err(e),
    }
}

/// Apply a partial update and stamp `updated_at`.
pub async fn update_conversation(
    pool: &SqlitePool,
    id: &str,
    update: &ConversationUpdate,
) -> Result<ConversationWithContact> {
    let ai_config = update.ai_config.as_ref().map(|v| v.to_string());

    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET title = COALESCE(?, title),
            status = COALESCE(?, status),
            ai_enabled = COALESCE(?, ai_enabled),
            ai_config = COALESCE(?, ai_config),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.title)
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.ai_enabled)
    .bind(ai_config)
    .bind(now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    get_conversation(pool, id).await
}

/// Delete a conversation and its messages.
pub async fn delete_conversation(pool: &SqlitePool, id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    tx.commit().await?;
    Ok(())
}

/// Zero the unread counter and return the `updated_at` stamp written.
pub async fn mark_conversation_as_read(pool: &SqlitePool, id: &str) -> Result<String> {
    let read_at = now();

    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET unread_count = 0, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&read_at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    tracing::debug!(conversation_id = %id, "Marked conversation as read");
    Ok(read_at)
}

/// Sum of `unread_count` across all conversations.
pub async fn get_total_unread_count(pool: &SqlitePool) -> Result<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(unread_count), 0) FROM conversations
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Read the AI settings of a chat, addressed by conversation id or remote JID.
pub async fn get_ai_settings(pool: &SqlitePool, chat_id: &str) -> Result<AiSettings> {
    sqlx::query_as::<_, AiSettings>(
        r#"
        SELECT id, whatsapp_conversation_id, ai_enabled, ai_config, ai_thread_id
        FROM conversations
        WHERE id = ? OR whatsapp_conversation_id = ?
        "#,
    )
    .bind(chat_id)
    .bind(chat_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: chat_id.to_string(),
    })
}

/// Replace the AI flag and config of a chat, addressed by conversation id or remote JID.
pub async fn update_ai_settings(
    pool: &SqlitePool,
    chat_id: &str,
    enabled: bool,
    config: &serde_json::Value,
) -> Result<AiSettings> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET ai_enabled = ?, ai_config = ?, updated_at = ?
        WHERE id = ? OR whatsapp_conversation_id = ?
        "#,
    )
    .bind(enabled)
    .bind(config.to_string())
    .bind(now())
    .bind(chat_id)
    .bind(chat_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: chat_id.to_string(),
        });
    }

    get_ai_settings(pool, chat_id).await
}

/// Bind an agent runtime thread to a conversation.
pub async fn set_ai_thread(pool: &SqlitePool, id: &str, thread_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET ai_thread_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(thread_id)
    .bind(now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Number of conversations.
pub async fn count_conversations(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversations")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageDirection;
    use crate::test_support::{seed_conversation, seed_message, test_db};

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let db = test_db().await;
        let first = seed_conversation(&db, "+31612345678", "Sanne").await;
        assert_eq!(first.whatsapp_conversation_id, "31612345678@s.whatsapp.net");
        assert_eq!(first.title.as_deref(), Some("Sanne"));
        assert_eq!(first.status, ConversationStatus::Active);

        let contact = crate::contact::get_contact(db.pool(), &first.whatsapp_contact_id)
            .await
            .unwrap();
        let again = find_or_create_for_contact(db.pool(), &contact).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(count_conversations(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_orders_by_last_message_with_nulls_last() {
        let db = test_db().await;
        let quiet = seed_conversation(&db, "+31600000001", "Quiet").await;
        let older = seed_conversation(&db, "+31600000002", "Older").await;
        let newer = seed_conversation(&db, "+31600000003", "Newer").await;

        seed_message(&db, &older.id, "eerste", MessageDirection::Inbound, "2025-03-01T10:00:00.000Z").await;
        seed_message(&db, &newer.id, "tweede", MessageDirection::Inbound, "2025-03-02T10:00:00.000Z").await;
        seed_message(&db, &newer.id, "derde", MessageDirection::Outbound, "2025-03-02T11:00:00.000Z").await;

        let page = get_conversations(db.pool(), &ConversationFilters::default())
            .await
            .unwrap();
        let ids: Vec<&str> = page
            .conversations
            .iter()
            .map(|c| c.conversation.id.as_str())
            .collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str(), quiet.id.as_str()]);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.unread_count, 2);
        assert_eq!(page.conversations[0].last_message.as_deref(), Some("derde"));
        assert_eq!(page.conversations[0].contact.push_name.as_deref(), Some("Newer"));
        assert_eq!(page.conversations[2].last_message, None);
    }

    #[tokio::test]
    async fn filters_apply() {
        let db = test_db().await;
        let sanne = seed_conversation(&db, "+31612345678", "Sanne").await;
        let pieter = seed_conversation(&db, "+31687654321", "Pieter").await;
        seed_message(&db, &sanne.id, "hoi", MessageDirection::Inbound, "2025-03-01T10:00:00.000Z").await;
        seed_message(&db, &pieter.id, "dag", MessageDirection::Outbound, "2025-04-01T10:00:00.000Z").await;

        let unread = get_conversations(
            db.pool(),
            &ConversationFilters {
                status: StatusFilter::Unread,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(unread.conversations.len(), 1);
        assert_eq!(unread.conversations[0].conversation.id, sanne.id);

        let search = get_conversations(
            db.pool(),
            &ConversationFilters {
                search: Some("piet".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(search.total_count, 1);
        assert_eq!(search.conversations[0].conversation.id, pieter.id);

        let april = get_conversations(
            db.pool(),
            &ConversationFilters {
                start: Some("2025-03-15T00:00:00.000Z".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(april.total_count, 1);

        let paged = get_conversations(
            db.pool(),
            &ConversationFilters {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(paged.conversations.len(), 1);
        assert_eq!(paged.total_count, 2);
        assert_eq!(paged.conversations[0].conversation.id, sanne.id);
    }

    #[tokio::test]
    async fn mark_as_read_zeroes_counter() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        seed_message(&db, &chat.id, "een", MessageDirection::Inbound, "2025-03-01T10:00:00.000Z").await;
        seed_message(&db, &chat.id, "twee", MessageDirection::Inbound, "2025-03-01T10:01:00.000Z").await;
        assert_eq!(get_total_unread_count(db.pool()).await.unwrap(), 2);

        let read_at = mark_conversation_as_read(db.pool(), &chat.id).await.unwrap();
        let after = get_conversation(db.pool(), &chat.id).await.unwrap();
        assert_eq!(after.conversation.unread_count, 0);
        assert_eq!(after.conversation.updated_at, read_at);
        assert_eq!(get_total_unread_count(db.pool()).await.unwrap(), 0);

        let missing = mark_conversation_as_read(db.pool(), "nope").await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn update_and_delete() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        seed_message(&db, &chat.id, "hoi", MessageDirection::Inbound, "2025-03-01T10:00:00.000Z").await;

        let updated = update_conversation(
            db.pool(),
            &chat.id,
            &ConversationUpdate {
                status: Some(ConversationStatus::Escalated),
                ai_enabled: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.conversation.status, ConversationStatus::Escalated);
        assert!(updated.conversation.ai_enabled);
        assert_eq!(updated.conversation.title.as_deref(), Some("Sanne"));

        delete_conversation(db.pool(), &chat.id).await.unwrap();
        assert!(matches!(
            get_conversation(db.pool(), &chat.id).await,
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            delete_conversation(db.pool(), &chat.id).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn ai_settings_round_trip() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        let jid = chat.whatsapp_conversation_id.clone();

        let before = get_ai_settings(db.pool(), &jid).await.unwrap();
        assert!(!before.ai_enabled);
        assert_eq!(before.config_value(), serde_json::Value::Null);

        let config = serde_json::json!({ "response_style": "concise" });
        let after = update_ai_settings(db.pool(), &jid, true, &config).await.unwrap();
        assert!(after.ai_enabled);
        assert_eq!(after.config_value()["response_style"], "concise");

        set_ai_thread(db.pool(), &chat.id, "thread-1").await.unwrap();
        let with_thread = get_ai_settings(db.pool(), &jid).await.unwrap();
        assert_eq!(with_thread.ai_thread_id.as_deref(), Some("thread-1"));

        let by_id = get_ai_settings(db.pool(), &chat.id).await.unwrap();
        assert_eq!(by_id.whatsapp_conversation_id, jid);

        assert!(matches!(
            get_ai_settings(db.pool(), "unknown@s.whatsapp.net").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn status_filter_parses() {
        assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("unread".parse::<StatusFilter>(), Ok(StatusFilter::Unread));
        assert_eq!(
            "archived".parse::<StatusFilter>(),
            Ok(StatusFilter::Is(ConversationStatus::Archived))
        );
        assert!("bogus".parse::<StatusFilter>().is_err());
    }
}
