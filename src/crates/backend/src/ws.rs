//! The WebSocket push channel.
//!
//! One full-duplex channel per session, keyed by session id. The session
//! must already exist (created over HTTP); an unknown id is closed with a
//! policy-violation frame, and a second attach for a connected session is
//! rejected the same way. A normal disconnect keeps the session active so a
//! later reattach resumes the suspended conversation from its checkpoint.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use kotori_bot::{BotEvent, KotoriBot, SessionOrchestrator};

use crate::app::AppState;
use crate::models::WebSocketEvent;

/// Process-wide map of attached channels and running orchestrators.
#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<String, mpsc::UnboundedSender<String>>,
    orchestrators: DashMap<String, Arc<SessionOrchestrator>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a channel is attached for this session.
    pub fn is_connected(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }

    /// Number of attached channels.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn attach(&self, session_id: &str, sender: mpsc::UnboundedSender<String>) {
        self.connections.insert(session_id.to_string(), sender);
    }

    fn detach(&self, session_id: &str) {
        self.connections.remove(session_id);
    }

    /// The session's running orchestrator, if any.
    pub fn orchestrator(&self, session_id: &str) -> Option<Arc<SessionOrchestrator>> {
        self.orchestrators
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn set_orchestrator(&self, session_id: &str, orchestrator: Arc<SessionOrchestrator>) {
        self.orchestrators.insert(session_id.to_string(), orchestrator);
    }

    /// Drop the session's orchestrator handle.
    pub fn remove_orchestrator(&self, session_id: &str) {
        self.orchestrators.remove(session_id);
    }

    /// Push an event envelope to the session's channel, if attached.
    pub fn send_event(&self, session_id: &str, event_type: &str, data: Value) -> bool {
        let Some(sender) = self.connections.get(session_id) else {
            return false;
        };
        let envelope = WebSocketEvent::new(event_type, session_id, data);
        match serde_json::to_string(&envelope) {
            Ok(text) => sender.send(text).is_ok(),
            Err(err) => {
                tracing::error!(session = %session_id, error = %err, "failed to encode event");
                false
            }
        }
    }
}

/// GET /ws/:session_id - upgrade to the push channel.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

async fn close_with_policy(mut socket: WebSocket, reason: &'static str) {
    let _ = socket
        .send(WsMessage::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: reason.into(),
        })))
        .await;
}

async fn handle_socket(socket: WebSocket, session_id: String, state: AppState) {
    if session_id.trim().is_empty() {
        close_with_policy(socket, "Invalid session ID").await;
        return;
    }
    if !state.sessions.session_exists(&session_id).await {
        tracing::warn!(session = %session_id, "push attach for unknown session");
        close_with_policy(socket, "Session not found").await;
        return;
    }
    if state.connections.is_connected(&session_id) {
        tracing::warn!(session = %session_id, "second push attach rejected");
        close_with_policy(socket, "Session already connected").await;
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Outbound pump: everything goes through one ordered channel.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if ws_tx.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });
    state.connections.attach(&session_id, out_tx);

    // Reactivate on reattach.
    let record = match state.sessions.get_session(&session_id).await {
        Some(record) => record,
        None => {
            state.connections.detach(&session_id);
            writer.abort();
            return;
        }
    };
    if !record.is_active {
        tracing::info!(session = %session_id, "reactivating session for reconnection");
        state.sessions.reactivate(&session_id).await;
    }
    state.sessions.update_activity(&session_id).await;

    // A leftover orchestrator from a previous attach is stopped first.
    if let Some(previous) = state.connections.orchestrator(&session_id) {
        previous.stop().await;
        state.connections.remove_orchestrator(&session_id);
    }

    match KotoriBot::new(
        state.model.clone(),
        state.anki.clone(),
        record.config.clone(),
        state.checkpoints.clone(),
    ) {
        Ok(bot) => {
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let orchestrator = SessionOrchestrator::new(Arc::new(bot), &session_id, event_tx);
            state.connections.set_orchestrator(&session_id, orchestrator.clone());

            tokio::spawn(pump_events(session_id.clone(), state.clone(), event_rx));

            if let Err(err) = orchestrator.start(None).await {
                tracing::error!(session = %session_id, error = %err, "failed to start conversation");
                state.connections.send_event(
                    &session_id,
                    "error",
                    json!({"error": format!("Failed to start conversation: {err}"), "session_id": session_id}),
                );
            }
        }
        Err(err) => {
            tracing::error!(session = %session_id, error = %err, "failed to build tutor");
            state.connections.send_event(
                &session_id,
                "error",
                json!({"error": err.to_string(), "session_id": session_id}),
            );
        }
    }

    state.connections.send_event(
        &session_id,
        "connection_established",
        json!({
            "session_id": session_id,
            "timestamp": Utc::now(),
            "config": record.config,
        }),
    );
    tracing::info!(session = %session_id, "push channel established");

    // Inbound loop.
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            WsMessage::Text(text) => handle_inbound(&session_id, &state, &text).await,
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    disconnect(&session_id, &state).await;
    writer.abort();
}

async fn handle_inbound(session_id: &str, state: &AppState, text: &str) {
    let parsed: Result<Value, _> = serde_json::from_str(text);
    let Ok(value) = parsed else {
        state.connections.send_event(
            session_id,
            "error",
            json!({"error": "Invalid JSON format", "session_id": session_id}),
        );
        return;
    };

    let event_type = value["event_type"].as_str().unwrap_or_default();
    let payload = value["data"].clone();

    match event_type {
        "user_message" => {
            let content = payload["message"].as_str().unwrap_or_default().to_string();
            let Some(orchestrator) = state.connections.orchestrator(session_id) else {
                state.connections.send_event(
                    session_id,
                    "error",
                    json!({"error": "No active conversation", "session_id": session_id}),
                );
                return;
            };

            if orchestrator.send_user_message(content.clone()).await {
                state.sessions.update_activity(session_id).await;
                state.connections.send_event(
                    session_id,
                    "message_sent",
                    json!({"message": content, "session_id": session_id}),
                );
            } else {
                state.connections.send_event(
                    session_id,
                    "error",
                    json!({
                        "error": "Failed to send message - bot is not waiting for input",
                        "session_id": session_id,
                    }),
                );
            }
        }
        "get_history" => {
            let messages = state.conversations.get_conversation(session_id).await;
            let session = state.sessions.get_session(session_id).await;
            state.connections.send_event(
                session_id,
                "conversation_history",
                json!({
                    "session_id": session_id,
                    "messages": messages,
                    "session_info": session,
                }),
            );
        }
        "ping" => {
            state
                .connections
                .send_event(session_id, "pong", json!({"timestamp": Utc::now()}));
        }
        other => {
            state.connections.send_event(
                session_id,
                "error",
                json!({"error": format!("Unknown event type: {other}"), "session_id": session_id}),
            );
        }
    }
}

/// Events from the orchestrator, fanned out to the channel and folded into
/// the conversation store.
async fn pump_events(session_id: String, state: AppState, mut events: mpsc::UnboundedReceiver<BotEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            BotEvent::AiResponse { message } => {
                state.conversations.add_message(&session_id, message.clone()).await;
                state.connections.send_event(
                    &session_id,
                    "ai_response",
                    json!({"message": message, "session_id": session_id}),
                );
            }
            BotEvent::UserMessage { message } => {
                state.conversations.add_message(&session_id, message).await;
                state.sessions.update_activity(&session_id).await;
            }
            BotEvent::StateChange { state: info } => {
                state.sessions.update_state_info(&session_id, info.clone()).await;
                state.connections.send_event(
                    &session_id,
                    "state_change",
                    json!({"state": info, "session_id": session_id}),
                );
            }
            BotEvent::ToolCall { tool } => {
                state.connections.send_event(
                    &session_id,
                    "tool_call",
                    json!({"tool": tool, "session_id": session_id}),
                );
            }
            BotEvent::ToolMessage { message } => {
                state.conversations.add_message(&session_id, message.clone()).await;
                state.connections.send_event(
                    &session_id,
                    "ai_response",
                    json!({"message": message, "session_id": session_id}),
                );
            }
            BotEvent::AssessmentUpdate { metrics } => {
                state.connections.send_event(
                    &session_id,
                    "assessment_update",
                    json!({"metrics": metrics, "session_id": session_id}),
                );
            }
            BotEvent::ConversationEnd { reason } => {
                state.connections.send_event(
                    &session_id,
                    "conversation_end",
                    json!({"data": {"reason": reason}, "session_id": session_id}),
                );
            }
            BotEvent::Error { message } => {
                state.connections.send_event(
                    &session_id,
                    "error",
                    json!({"error": message, "session_id": session_id}),
                );
            }
        }
    }
}

async fn disconnect(session_id: &str, state: &AppState) {
    state.connections.detach(session_id);
    if let Some(orchestrator) = state.connections.orchestrator(session_id) {
        orchestrator.stop().await;
        state.connections.remove_orchestrator(session_id);
    }
    // The session stays active so a reattach can resume the thread.
    tracing::info!(session = %session_id, "push channel closed, session kept for reconnection");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_event_without_connection_reports_false() {
        let manager = ConnectionManager::new();
        assert!(!manager.send_event("ghost", "pong", json!({})));
    }

    #[test]
    fn attach_detach_round_trip() {
        let manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.attach("s-1", tx);

        assert!(manager.is_connected("s-1"));
        assert_eq!(manager.connection_count(), 1);
        assert!(manager.send_event("s-1", "pong", json!({"ok": true})));

        let text = rx.try_recv().unwrap();
        let envelope: WebSocketEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope.event_type, "pong");
        assert_eq!(envelope.session_id, "s-1");

        manager.detach("s-1");
        assert!(!manager.is_connected("s-1"));
    }
}
