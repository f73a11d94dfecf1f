//! Unread counters and the recent-messages feed.

use axum::extract::{Query, State};
use axum::Json;
use database::notification;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    fn limit(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, 100)
    }
}

/// Newest message of each unread conversation.
pub async fn recent_messages(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Value>> {
    let messages = notification::get_recent_messages(state.db.pool(), query.limit(10)).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

/// Unread totals, the latest unread message and the unread conversations.
pub async fn notifications(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Value>> {
    let pool = state.db.pool();
    let data = notification::get_notification_data(pool).await?;
    let conversations = notification::get_unread_conversations(pool, query.limit(20)).await?;
    let summary = notification::get_notification_summary(pool).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "total_unread": data.total_unread,
            "conversations_with_unread": data.conversations_with_unread,
            "latest_message": data.latest_message,
            "unread_conversations": conversations,
            "summary": summary,
        },
    })))
}

pub async fn mark_all_read(State(state): State<AppState>) -> Result<Json<Value>> {
    let updated = notification::mark_all_conversations_as_read(state.db.pool()).await?;
    info!(updated, "Marked all conversations as read");
    Ok(Json(json!({
        "success": true,
        "message": "All conversations marked as read",
        "updated": updated,
    })))
}
