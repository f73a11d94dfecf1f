//! Dashboard routes.

use askama::Template;
use axum::extract::State;
use axum::Extension;
use database::ai_interaction::{self, AiUsageStats};
use database::notification::{self, NotificationSummary, UnreadConversation};

use crate::auth::AdminSession;
use crate::error::Result;
use crate::state::AppState;

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_email: String,
    pub summary: NotificationSummary,
    pub unread: Vec<UnreadConversation>,
    pub ai: AiUsageStats,
    pub avg_processing_ms: i64,
    pub wasender_configured: bool,
    pub agent_configured: bool,
}

/// Render the dashboard page.
pub async fn dashboard_page(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> Result<DashboardTemplate> {
    let pool = state.db.pool();
    let summary = notification::get_notification_summary(pool).await?;
    let unread = notification::get_unread_conversations(pool, 10).await?;
    let ai = ai_interaction::usage_stats(pool).await?;

    Ok(DashboardTemplate {
        admin_email: session.admin.email,
        avg_processing_ms: ai.average_processing_time_ms.round() as i64,
        summary,
        unread,
        ai,
        wasender_configured: state.wasender.is_some(),
        agent_configured: state.agent.is_some(),
    })
}
