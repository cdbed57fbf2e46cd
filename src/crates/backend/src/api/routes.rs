//! Route definitions.

use axum::routing::{get, post, put};
use axum::Router;

use crate::api::handlers;
use crate::app::AppState;
use crate::ws;

/// Build the complete router: management API plus the push channel.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/sessions",
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route("/sessions/stats", get(handlers::session_stats))
        .route(
            "/sessions/:id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route("/sessions/:id/config", put(handlers::update_session_config))
        .route("/sessions/:id/ui-settings", put(handlers::update_ui_settings))
        .route(
            "/sessions/:id/history",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/sessions/:id/history/export", post(handlers::export_history))
        .route("/sessions/:id/cleanup", post(handlers::cleanup_session))
        .route(
            "/maintenance/cleanup-inactive",
            post(handlers::cleanup_inactive),
        )
        .route("/flashcards/status", get(handlers::flashcards_status))
        .route("/flashcards/decks", get(handlers::flashcards_decks))
        .route("/ws/:session_id", get(ws::websocket_handler))
        .with_state(state)
}
