//! Admin backend for the BargainB WhatsApp assistant.
//!
//! Serves the admin inbox APIs (conversations, messages, notifications,
//! contacts, per-user assistants), the WASender webhook and two
//! server-rendered pages.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

use axum::{middleware, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application.
pub fn app(state: AppState) -> Router {
    let admin = routes::admin_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_admin,
    ));

    routes::public_router()
        .merge(admin)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
