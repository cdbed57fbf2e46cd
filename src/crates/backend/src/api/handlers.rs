//! API handler functions.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use dialog_checkpoint::CheckpointSaver;
use kotori_bot::TutorConfig;

use crate::api::error::{ApiError, ApiResult};
use crate::app::AppState;
use crate::models::{ExportRequest, HealthResponse, UiSettings};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut services = HashMap::new();

    services.insert(
        "anki".to_string(),
        match state.anki.version().await {
            Ok(_) => "connected".to_string(),
            Err(err) if err.is_retryable() => "disconnected".to_string(),
            Err(_) => "error".to_string(),
        },
    );
    services.insert(
        "llm".to_string(),
        match state.model.is_available().await {
            Ok(true) => "available".to_string(),
            Ok(false) => "unavailable".to_string(),
            Err(_) => "error".to_string(),
        },
    );
    services.insert("session_manager".to_string(), "active".to_string());
    services.insert("conversation_store".to_string(), "active".to_string());

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        services,
    })
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<TutorConfig>>,
) -> ApiResult<Json<Value>> {
    let config = body.map(|Json(config)| config);
    if let Some(config) = &config {
        config.validate().map_err(ApiError::BadRequest)?;
    }

    let session_id = state.sessions.create_session(config).await;
    let record = state
        .sessions
        .get_session(&session_id)
        .await
        .ok_or_else(|| ApiError::Internal("Session not found after creation".to_string()))?;

    Ok(Json(json!({
        "session_id": session_id,
        "message": "Session created successfully",
        "timestamp": Utc::now(),
        "config": record.config,
    })))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state
        .sessions
        .get_session(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    Ok(Json(json!({
        "session": record,
        "timestamp": Utc::now(),
    })))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let active = state.sessions.active_sessions().await;
    let total = state.sessions.session_count().await;

    Json(json!({
        "active_sessions": active,
        "active_count": active.len(),
        "total_sessions": total,
        "timestamp": Utc::now(),
    }))
}

/// GET /sessions/stats
pub async fn session_stats(State(state): State<AppState>) -> Json<Value> {
    let total = state.sessions.session_count().await;
    let active = state.sessions.active_session_count().await;

    Json(json!({
        "total_sessions": total,
        "active_sessions": active,
        "inactive_sessions": total - active,
        "timestamp": Utc::now(),
    }))
}

/// PUT /sessions/:id/config
pub async fn update_session_config(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(config): Json<TutorConfig>,
) -> ApiResult<Json<Value>> {
    config.validate().map_err(ApiError::BadRequest)?;
    if !state.sessions.update_config(&session_id, config).await {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    Ok(Json(json!({
        "message": "Configuration updated successfully",
        "session_id": session_id,
        "timestamp": Utc::now(),
    })))
}

/// PUT /sessions/:id/ui-settings
pub async fn update_ui_settings(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(settings): Json<UiSettings>,
) -> ApiResult<Json<Value>> {
    if !state.sessions.update_ui_settings(&session_id, settings).await {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    Ok(Json(json!({
        "message": "UI settings updated successfully",
        "session_id": session_id,
        "timestamp": Utc::now(),
    })))
}

/// DELETE /sessions/:id
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.sessions.deactivate(&session_id).await {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    Ok(Json(json!({
        "message": "Session closed successfully",
        "session_id": session_id,
        "timestamp": Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /sessions/:id/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<Value> {
    let messages = match query.limit {
        Some(limit) => state.conversations.get_recent(&session_id, limit).await,
        None => state.conversations.get_conversation(&session_id).await,
    };
    let session = state.sessions.get_session(&session_id).await;

    Json(json!({
        "session_id": session_id,
        "message_count": messages.len(),
        "messages": messages,
        "session_info": session,
        "timestamp": Utc::now(),
    }))
}

/// POST /sessions/:id/history/export
pub async fn export_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Json<Value>> {
    let data = state
        .conversations
        .export(&session_id, request.format)
        .await
        .ok_or_else(|| ApiError::BadRequest("Invalid export format or no data".to_string()))?;

    Ok(Json(json!({
        "session_id": session_id,
        "format": request.format,
        "data": data,
        "exported_at": Utc::now(),
    })))
}

/// DELETE /sessions/:id/history
pub async fn clear_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.conversations.clear(&session_id).await {
        return Err(ApiError::NotFound("Session not found or no history".to_string()));
    }

    Ok(Json(json!({
        "message": "Conversation history cleared successfully",
        "session_id": session_id,
        "timestamp": Utc::now(),
    })))
}

/// POST /sessions/:id/cleanup
pub async fn cleanup_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if let Some(orchestrator) = state.connections.orchestrator(&session_id) {
        orchestrator.stop().await;
        state.connections.remove_orchestrator(&session_id);
    }
    state.sessions.deactivate(&session_id).await;
    state.conversations.clear(&session_id).await;

    Ok(Json(json!({
        "message": "Session data cleaned up successfully",
        "session_id": session_id,
        "timestamp": Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub max_age_hours: Option<f64>,
}

/// POST /maintenance/cleanup-inactive
pub async fn cleanup_inactive(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Json<Value> {
    let max_age_hours = query.max_age_hours.unwrap_or(24.0);
    let removed = state.sessions.cleanup_inactive_sessions(max_age_hours).await;

    // Reaped sessions take their history and checkpoints with them.
    for session_id in &removed {
        state.conversations.remove(session_id).await;
        if let Err(err) = state.checkpoints.delete_thread(session_id).await {
            tracing::warn!(session = %session_id, error = %err, "failed to drop checkpoint");
        }
    }

    Json(json!({
        "message": format!("Cleaned up {} inactive sessions", removed.len()),
        "cleaned_sessions": removed.len(),
        "max_age_hours": max_age_hours,
        "timestamp": Utc::now(),
    }))
}

/// GET /flashcards/status
pub async fn flashcards_status(State(state): State<AppState>) -> Json<Value> {
    match state.anki.check_connection().await {
        Ok(message) => Json(json!({
            "status": "connected",
            "message": message,
            "timestamp": Utc::now(),
        })),
        Err(err) => Json(json!({
            "status": if err.is_retryable() { "disconnected" } else { "error" },
            "message": err.to_string(),
            "timestamp": Utc::now(),
        })),
    }
}

/// GET /flashcards/decks
pub async fn flashcards_decks(State(state): State<AppState>) -> Json<Value> {
    match state.anki.get_decks().await {
        Ok(message) => Json(json!({
            "status": "success",
            "message": message,
            "timestamp": Utc::now(),
        })),
        Err(err) => Json(json!({
            "status": "error",
            "message": err.to_string(),
            "timestamp": Utc::now(),
        })),
    }
}
