//! Route handlers for the admin backend.

pub mod assistants;
pub mod contacts;
pub mod conversations;
pub mod dashboard;
pub mod health;
pub mod login;
pub mod notifications;
pub mod settings;
pub mod webhook;
pub mod whatsapp;

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::state::AppState;

/// Routes reachable without an admin session.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/login", get(login::login_page).post(login::login_submit))
        .route("/logout", post(login::logout))
        // Public API
        .route("/api/whatsapp/send-message", post(whatsapp::send_message))
        .route("/api/whatsapp/ai", post(whatsapp::ai_reply))
        .route(
            "/api/whatsapp/chats/:chat_id/ai-config",
            get(whatsapp::get_ai_config).patch(whatsapp::update_ai_config),
        )
        .route("/api/onboarding/validate-phone", post(whatsapp::validate_phone))
        .route("/api/ai/stats", get(whatsapp::ai_stats))
        // WASender webhook
        .route(
            "/admin/chat-v2/api/webhook",
            post(webhook::receive).get(webhook::verify).head(webhook::head),
        )
}

/// Routes behind the admin gate.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        // HTML pages
        .route("/admin", get(dashboard::dashboard_page))
        // Conversations and messages
        .route(
            "/admin/chat/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/admin/chat/api/conversations/:id",
            get(conversations::get_conversation)
                .patch(conversations::update_conversation)
                .delete(conversations::delete_conversation),
        )
        .route("/admin/chat/api/conversations/:id/read", post(conversations::mark_as_read))
        .route(
            "/admin/chat/api/messages",
            get(conversations::list_messages).post(conversations::create_message),
        )
        .route("/admin/chat/api/messages/:id", delete(conversations::delete_message))
        .route("/admin/chat/api/messages/:id/status", patch(conversations::update_message_status))
        .route("/admin/chat-v2/api/send-message", post(conversations::send_outbound))
        // Notifications
        .route("/admin/chat/api/recent-messages", get(notifications::recent_messages))
        .route("/admin/chat/api/notifications", get(notifications::notifications))
        .route("/admin/chat/api/notifications/read-all", post(notifications::mark_all_read))
        // Contacts and customers
        .route(
            "/admin/chat/api/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/admin/chat/api/contacts/sync", post(contacts::sync_contacts))
        .route(
            "/admin/chat/api/contacts/:id",
            get(contacts::get_contact).patch(contacts::update_contact),
        )
        .route("/admin/chat/api/contacts/:id/info", get(contacts::contact_info))
        .route("/admin/users/api/:contact_id", delete(contacts::delete_customer))
        // Per-user assistants
        .route("/admin/chat/api/assistants", get(assistants::search_assistants))
        .route(
            "/admin/chat/api/assistants/migrate",
            get(assistants::migration_status).post(assistants::apply_migration),
        )
        .route("/admin/chat/api/assistants/create", post(assistants::create_assistant))
        .route(
            "/admin/chat/api/assistants/:assistant_id",
            get(assistants::get_assistant)
                .patch(assistants::update_assistant)
                .delete(assistants::delete_assistant),
        )
        // Settings and diagnostics
        .route("/admin/settings/api/admin-users", get(settings::admin_users))
        .route("/admin/testing/api/health-check", get(settings::health_check))
}
