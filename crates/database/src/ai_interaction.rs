//! Log of exchanges with the agent runtime.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::AiInteraction;
use crate::{new_id, now};

/// Fields for a new interaction record.
#[derive(Debug, Clone)]
pub struct NewAiInteraction {
    pub conversation_id: String,
    pub user_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub thread_id: Option<String>,
    pub processing_time_ms: i64,
    pub tokens_used: i64,
}

/// Aggregate usage figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiUsageStats {
    pub total_interactions: i64,
    pub conversations_with_ai: i64,
    pub ai_enabled_conversations: i64,
    pub average_processing_time_ms: f64,
    pub total_tokens_used: i64,
}

/// Record an interaction.
pub async fn log_interaction(pool: &SqlitePool, new: &NewAiInteraction) -> Result<AiInteraction> {
    let id = new_id();

    sqlx::query(
        r#"
        INSERT INTO ai_interactions
            (id, conversation_id, user_id, user_message, ai_response, thread_id,
             processing_time_ms, tokens_used, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.conversation_id)
    .bind(&new.user_id)
    .bind(&new.user_message)
    .bind(&new.ai_response)
    .bind(&new.thread_id)
    .bind(new.processing_time_ms)
    .bind(new.tokens_used)
    .bind(now())
    .execute(pool)
    .await?;

    sqlx::query_as::<_, AiInteraction>(
        r#"
        SELECT id, conversation_id, user_id, user_message, ai_response, thread_id,
               processing_time_ms, tokens_used, created_at
        FROM ai_interactions
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "AiInteraction",
        id,
    })
}

/// Most recent interactions across all conversations.
pub async fn recent_interactions(pool: &SqlitePool, limit: i64) -> Result<Vec<AiInteraction>> {
    let rows = sqlx::query_as::<_, AiInteraction>(
        r#"
        SELECT id, conversation_id, user_id, user_message, ai_response, thread_id,
               processing_time_ms, tokens_used, created_at
        FROM ai_interactions
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(limit.max(1))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Usage totals for the AI stats endpoint.
pub async fn usage_stats(pool: &SqlitePool) -> Result<AiUsageStats> {
    let (total_interactions, conversations_with_ai, average_processing_time_ms, total_tokens_used) =
        sqlx::query_as::<_, (i64, i64, f64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(DISTINCT conversation_id),
                   COALESCE(AVG(processing_time_ms), 0.0),
                   COALESCE(SUM(tokens_used), 0)
            FROM ai_interactions
            "#,
        )
        .fetch_one(pool)
        .await?;

    let ai_enabled_conversations = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM conversations WHERE ai_enabled = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(AiUsageStats {
        total_interactions,
        conversations_with_ai,
        ai_enabled_conversations,
        average_processing_time_ms,
        total_tokens_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_conversation, test_db};

    #[tokio::test]
    async fn log_and_aggregate() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;

        let empty = usage_stats(db.pool()).await.unwrap();
        assert_eq!(empty.total_interactions, 0);
        assert_eq!(empty.average_processing_time_ms, 0.0);

        for (ms, reply) in [(100, "Melk is goedkoper bij Dirk."), (300, "Probeer Jumbo.")] {
            log_interaction(
                db.pool(),
                &NewAiInteraction {
                    conversation_id: chat.id.clone(),
                    user_id: "user-1".to_string(),
                    user_message: "Waar is melk goedkoop?".to_string(),
                    ai_response: reply.to_string(),
                    thread_id: Some("thread-1".to_string()),
                    processing_time_ms: ms,
                    tokens_used: reply.len() as i64,
                },
            )
            .await
            .unwrap();
        }

        let stats = usage_stats(db.pool()).await.unwrap();
        assert_eq!(stats.total_interactions, 2);
        assert_eq!(stats.conversations_with_ai, 1);
        assert_eq!(stats.average_processing_time_ms, 200.0);
        assert_eq!(stats.ai_enabled_conversations, 0);

        let recent = recent_interactions(db.pool(), 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].ai_response, "Probeer Jumbo.");
    }
}
