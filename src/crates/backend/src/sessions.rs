//! The session registry and the conversation store.
//!
//! Creation is globally serialized through a creation mutex, with an
//! in-flight set guarding against double-publish on id collision. Reads
//! (`session_exists`, `get_session`) take no creation lock; per-session
//! mutations take the session's own mutex. The conversation store is
//! append-only per session with two dedup rules: identical ids are rejected,
//! and so is a message whose normalized content equals any of the last five
//! messages of the same kind.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use kotori_bot::{MessageKind, OutboundMessage, StateInfo, TutorConfig};

use crate::models::{ExportFormat, SessionRecord, UiSettings};

/// Process-wide session registry.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionRecord>>>>,
    creation_lock: Mutex<()>,
    creating: Mutex<HashSet<String>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return its id. Serialized across the process;
    /// an id collision (however unlikely) regenerates rather than
    /// double-publishing.
    pub async fn create_session(&self, config: Option<TutorConfig>) -> String {
        let _guard = self.creation_lock.lock().await;

        let mut session_id = Uuid::new_v4().to_string();
        loop {
            let exists = self.sessions.read().await.contains_key(&session_id);
            let creating = self.creating.lock().await.contains(&session_id);
            if !exists && !creating {
                break;
            }
            session_id = Uuid::new_v4().to_string();
        }
        self.creating.lock().await.insert(session_id.clone());

        let record = SessionRecord::new(&session_id, config.unwrap_or_default());
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(record)));

        self.creating.lock().await.remove(&session_id);
        tracing::info!(session = %session_id, "session created");
        session_id
    }

    /// Whether a session exists (active or not).
    pub async fn session_exists(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Snapshot of a session record.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionRecord> {
        let handle = self.sessions.read().await.get(session_id).cloned()?;
        let record = handle.lock().await;
        Some(record.clone())
    }

    /// Total session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of active sessions.
    pub async fn active_session_count(&self) -> usize {
        self.active_sessions().await.len()
    }

    /// Ids of active sessions.
    pub async fn active_sessions(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut active = Vec::new();
        for (id, handle) in sessions.iter() {
            if handle.lock().await.is_active {
                active.push(id.clone());
            }
        }
        active
    }

    /// Touch a session's last-activity timestamp.
    pub async fn update_activity(&self, session_id: &str) {
        if let Some(handle) = self.sessions.read().await.get(session_id).cloned() {
            handle.lock().await.last_activity = Utc::now();
        }
    }

    /// Replace a session's config.
    pub async fn update_config(&self, session_id: &str, config: TutorConfig) -> bool {
        self.mutate(session_id, |record| record.config = config).await
    }

    /// Replace a session's UI settings.
    pub async fn update_ui_settings(&self, session_id: &str, ui_settings: UiSettings) -> bool {
        self.mutate(session_id, |record| record.ui_settings = ui_settings).await
    }

    /// Store the latest graph state snapshot.
    pub async fn update_state_info(&self, session_id: &str, state: StateInfo) -> bool {
        self.mutate(session_id, |record| record.current_state = Some(state)).await
    }

    /// Reactivate an inactive session (push-channel reattach).
    pub async fn reactivate(&self, session_id: &str) -> bool {
        self.mutate(session_id, |record| record.is_active = true).await
    }

    /// Deactivate a session (explicit close).
    pub async fn deactivate(&self, session_id: &str) -> bool {
        self.mutate(session_id, |record| record.is_active = false).await
    }

    async fn mutate(&self, session_id: &str, apply: impl FnOnce(&mut SessionRecord)) -> bool {
        let Some(handle) = self.sessions.read().await.get(session_id).cloned() else {
            return false;
        };
        let mut record = handle.lock().await;
        apply(&mut record);
        record.last_activity = Utc::now();
        true
    }

    /// Delete inactive sessions idle for more than `max_age_hours`. Returns
    /// the removed session ids so callers can clean up their conversation
    /// history and checkpoints too.
    pub async fn cleanup_inactive_sessions(&self, max_age_hours: f64) -> Vec<String> {
        let now = Utc::now();
        let mut to_remove = Vec::new();

        {
            let sessions = self.sessions.read().await;
            for (id, handle) in sessions.iter() {
                let record = handle.lock().await;
                if record.is_active {
                    continue;
                }
                let age_hours =
                    (now - record.last_activity).num_milliseconds() as f64 / 3_600_000.0;
                if age_hours > max_age_hours {
                    to_remove.push(id.clone());
                }
            }
        }

        let mut sessions = self.sessions.write().await;
        for id in &to_remove {
            sessions.remove(id);
            tracing::info!(session = %id, "reaped inactive session");
        }
        to_remove
    }
}

fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::User => "USER",
        MessageKind::Ai => "AI",
        MessageKind::System => "SYSTEM",
        MessageKind::Tool => "TOOL",
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Append-only conversation history, one mutex per session.
#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Mutex<Vec<OutboundMessage>>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, session_id: &str) -> Arc<Mutex<Vec<OutboundMessage>>> {
        if let Some(existing) = self.conversations.read().await.get(session_id).cloned() {
            return existing;
        }
        self.conversations
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Append a message unless it duplicates history. Returns whether it was
    /// stored.
    pub async fn add_message(&self, session_id: &str, message: OutboundMessage) -> bool {
        let entry = self.entry(session_id).await;
        let mut messages = entry.lock().await;

        if messages.iter().any(|existing| existing.id == message.id) {
            tracing::debug!(session = %session_id, id = %message.id, "duplicate message id rejected");
            return false;
        }

        let normalized = message.content.trim().to_lowercase();
        let recent_start = messages.len().saturating_sub(5);
        for recent in &messages[recent_start..] {
            if recent.message_type == message.message_type
                && recent.content.trim().to_lowercase() == normalized
            {
                tracing::debug!(session = %session_id, "duplicate message content rejected");
                return false;
            }
        }

        messages.push(message);
        true
    }

    /// Full history of a session.
    pub async fn get_conversation(&self, session_id: &str) -> Vec<OutboundMessage> {
        match self.conversations.read().await.get(session_id) {
            Some(entry) => entry.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Last `limit` messages.
    pub async fn get_recent(&self, session_id: &str, limit: usize) -> Vec<OutboundMessage> {
        let messages = self.get_conversation(session_id).await;
        let start = messages.len().saturating_sub(limit);
        messages[start..].to_vec()
    }

    /// Clear a session's history. Returns whether the session had any.
    pub async fn clear(&self, session_id: &str) -> bool {
        match self.conversations.read().await.get(session_id) {
            Some(entry) => {
                entry.lock().await.clear();
                true
            }
            None => false,
        }
    }

    /// Drop a session's history entirely (session reaped).
    pub async fn remove(&self, session_id: &str) {
        self.conversations.write().await.remove(session_id);
    }

    /// Export a session's history. JSON export is lossless for content,
    /// kind, timestamp, and metadata.
    pub async fn export(&self, session_id: &str, format: ExportFormat) -> Option<String> {
        let messages = self.get_conversation(session_id).await;

        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&messages).ok(),
            ExportFormat::Txt => {
                let lines: Vec<String> = messages
                    .iter()
                    .map(|msg| {
                        format!(
                            "[{}] {}: {}",
                            msg.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            kind_label(msg.message_type),
                            msg.content
                        )
                    })
                    .collect();
                Some(lines.join("\n"))
            }
            ExportFormat::Csv => {
                let mut rows = vec!["timestamp,type,content,metadata".to_string()];
                for msg in &messages {
                    let metadata = msg
                        .metadata
                        .as_ref()
                        .map(|value| value.to_string())
                        .unwrap_or_default();
                    rows.push(format!(
                        "{},{},{},{}",
                        msg.timestamp.to_rfc3339(),
                        kind_label(msg.message_type).to_lowercase(),
                        csv_escape(&msg.content),
                        csv_escape(&metadata)
                    ));
                }
                Some(rows.join("\n"))
            }
        }
    }
}
