//! Per-conversation assistant columns and assignment.
//!
//! The assistant columns are not part of the base schema; they are added at
//! runtime by [`apply_assistant_columns`] when an admin runs the per-user
//! assistants migration. Every read or write here first checks they exist.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::ConversationAssistant;
use crate::now;

/// Columns added to `conversations` by the per-user assistants migration.
pub const ASSISTANT_COLUMNS: [(&str, &str); 5] = [
    ("assistant_id", "TEXT"),
    ("assistant_name", "TEXT"),
    ("assistant_config", "TEXT"),
    ("assistant_metadata", "TEXT"),
    ("assistant_created_at", "TEXT"),
];

/// An assistant to store on a conversation.
#[derive(Debug, Clone)]
pub struct AssistantAssignment {
    pub assistant_id: String,
    pub assistant_name: String,
    pub config: serde_json::Value,
    pub metadata: serde_json::Value,
}

async fn conversation_columns(pool: &SqlitePool) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT name FROM pragma_table_info('conversations')
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(names)
}

/// Names of the assistant columns not yet present.
pub async fn missing_columns(pool: &SqlitePool) -> Result<Vec<&'static str>> {
    let existing = conversation_columns(pool).await?;
    Ok(ASSISTANT_COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !existing.iter().any(|col| col.as_str() == *name))
        .collect())
}

/// True once every assistant column exists.
pub async fn columns_exist(pool: &SqlitePool) -> Result<bool> {
    Ok(missing_columns(pool).await?.is_empty())
}

async fn ensure_columns(pool: &SqlitePool) -> Result<()> {
    if columns_exist(pool).await? {
        Ok(())
    } else {
        Err(DatabaseError::AssistantColumnsMissing)
    }
}

/// Add whichever assistant columns are missing. Returns how many were added.
pub async fn apply_assistant_columns(pool: &SqlitePool) -> Result<usize> {
    let missing = missing_columns(pool).await?;

    for name in &missing {
        let ty = ASSISTANT_COLUMNS
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, ty)| *ty)
            .unwrap_or("TEXT");
        // Column names come from ASSISTANT_COLUMNS, never from input.
        sqlx::query(&format!("ALTER TABLE conversations ADD COLUMN {} {}", name, ty))
            .execute(pool)
            .await?;
        tracing::info!(column = %name, "Added assistant column to conversations");
    }

    Ok(missing.len())
}

/// Assistant fields of one conversation.
pub async fn get_conversation_assistant(
    pool: &SqlitePool,
    conversation_id: &str,
) -> Result<ConversationAssistant> {
    ensure_columns(pool).await?;

    sqlx::query_as::<_, ConversationAssistant>(
        r#"
        SELECT id AS conversation_id, assistant_id, assistant_name, assistant_config,
               assistant_metadata, assistant_created_at, ai_enabled
        FROM conversations
        WHERE id = ?
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: conversation_id.to_string(),
    })
}

/// Conversation currently holding an assistant.
pub async fn find_by_assistant_id(
    pool: &SqlitePool,
    assistant_id: &str,
) -> Result<Option<ConversationAssistant>> {
    ensure_columns(pool).await?;

    let row = sqlx::query_as::<_, ConversationAssistant>(
        r#"
        SELECT id AS conversation_id, assistant_id, assistant_name, assistant_config,
               assistant_metadata, assistant_created_at, ai_enabled
        FROM conversations
        WHERE assistant_id = ?
        "#,
    )
    .bind(assistant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Store an assistant on a conversation and enable AI for it.
pub async fn set_conversation_assistant(
    pool: &SqlitePool,
    conversation_id: &str,
    assignment: &AssistantAssignment,
) -> Result<ConversationAssistant> {
    ensure_columns(pool).await?;

    let stamp = now();
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET assistant_id = ?, assistant_name = ?, assistant_config = ?,
            assistant_metadata = ?, assistant_created_at = ?, ai_enabled = 1,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&assignment.assistant_id)
    .bind(&assignment.assistant_name)
    .bind(assignment.config.to_string())
    .bind(assignment.metadata.to_string())
    .bind(&stamp)
    .bind(&stamp)
    .bind(conversation_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: conversation_id.to_string(),
        });
    }

    tracing::info!(
        conversation_id,
        assistant_id = %assignment.assistant_id,
        "Assigned assistant to conversation"
    );
    get_conversation_assistant(pool, conversation_id).await
}

/// Clear an assistant from every conversation holding it. Returns rows changed.
pub async fn clear_assistant(pool: &SqlitePool, assistant_id: &str) -> Result<u64> {
    ensure_columns(pool).await?;

    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET assistant_id = NULL, assistant_name = NULL, assistant_config = NULL,
            assistant_metadata = NULL, assistant_created_at = NULL, updated_at = ?
        WHERE assistant_id = ?
        "#,
    )
    .bind(now())
    .bind(assistant_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Replace the stored config for an assistant. Returns rows changed.
pub async fn update_assistant_config_for(
    pool: &SqlitePool,
    assistant_id: &str,
    config: &serde_json::Value,
) -> Result<u64> {
    ensure_columns(pool).await?;

    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET assistant_config = ?, updated_at = ?
        WHERE assistant_id = ?
        "#,
    )
    .bind(config.to_string())
    .bind(now())
    .bind(assistant_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Number of conversations with an assistant assigned.
pub async fn count_conversations_with_assistant(pool: &SqlitePool) -> Result<i64> {
    ensure_columns(pool).await?;

    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM conversations WHERE assistant_id IS NOT NULL
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_conversation, test_db};
    use serde_json::json;

    fn assignment(id: &str) -> AssistantAssignment {
        AssistantAssignment {
            assistant_id: id.to_string(),
            assistant_name: "BargainB Assistant for Sanne".to_string(),
            config: json!({ "configurable": { "TEMPERATURE": 0.7 } }),
            metadata: json!({ "region": "netherlands" }),
        }
    }

    #[tokio::test]
    async fn columns_absent_until_applied() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;

        assert!(!columns_exist(db.pool()).await.unwrap());
        assert_eq!(missing_columns(db.pool()).await.unwrap().len(), 5);
        assert!(matches!(
            get_conversation_assistant(db.pool(), &chat.id).await,
            Err(DatabaseError::AssistantColumnsMissing)
        ));
        assert!(matches!(
            count_conversations_with_assistant(db.pool()).await,
            Err(DatabaseError::AssistantColumnsMissing)
        ));

        assert_eq!(apply_assistant_columns(db.pool()).await.unwrap(), 5);
        assert!(columns_exist(db.pool()).await.unwrap());
        assert_eq!(apply_assistant_columns(db.pool()).await.unwrap(), 0);
        assert_eq!(count_conversations_with_assistant(db.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn assign_update_and_clear() {
        let db = test_db().await;
        apply_assistant_columns(db.pool()).await.unwrap();
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;

        let empty = get_conversation_assistant(db.pool(), &chat.id).await.unwrap();
        assert!(!empty.has_assistant());

        let assigned = set_conversation_assistant(db.pool(), &chat.id, &assignment("asst-1"))
            .await
            .unwrap();
        assert!(assigned.has_assistant());
        assert_eq!(assigned.assistant_id.as_deref(), Some("asst-1"));
        assert_eq!(count_conversations_with_assistant(db.pool()).await.unwrap(), 1);

        let found = find_by_assistant_id(db.pool(), "asst-1").await.unwrap().unwrap();
        assert_eq!(found.conversation_id, chat.id);

        let changed = update_assistant_config_for(db.pool(), "asst-1", &json!({ "tags": ["bargainb"] }))
            .await
            .unwrap();
        assert_eq!(changed, 1);
        let refreshed = get_conversation_assistant(db.pool(), &chat.id).await.unwrap();
        assert!(refreshed.assistant_config.unwrap().contains("bargainb"));

        assert_eq!(clear_assistant(db.pool(), "asst-1").await.unwrap(), 1);
        assert!(find_by_assistant_id(db.pool(), "asst-1").await.unwrap().is_none());
        assert_eq!(count_conversations_with_assistant(db.pool()).await.unwrap(), 0);

        assert!(matches!(
            set_conversation_assistant(db.pool(), "missing", &assignment("asst-2")).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
