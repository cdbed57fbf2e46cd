//! Shared application state and server configuration.

use std::sync::Arc;

use anki::AnkiClient;
use dialog_checkpoint::MemorySaver;
use dialog_graph::llm::ChatModel;

use crate::sessions::{ConversationStore, SessionManager};
use crate::ws::ConnectionManager;

/// Everything the handlers share. Cloning is cheap - all members are
/// `Arc`s over process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub conversations: Arc<ConversationStore>,
    pub connections: Arc<ConnectionManager>,
    pub model: Arc<dyn ChatModel>,
    pub anki: Arc<AnkiClient>,
    pub checkpoints: Arc<MemorySaver>,
}

impl AppState {
    /// Fresh state around the given model and flashcard clients. One
    /// checkpointer serves every session so reconnects can resume threads.
    pub fn new(model: Arc<dyn ChatModel>, anki: Arc<AnkiClient>) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new()),
            conversations: Arc::new(ConversationStore::new()),
            connections: Arc::new(ConnectionManager::new()),
            model,
            anki,
            checkpoints: Arc::new(MemorySaver::new()),
        }
    }
}

/// Server configuration from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host (`KOTORI_HOST`, default 127.0.0.1).
    pub host: String,
    /// Bind port (`KOTORI_PORT`, default 8000).
    pub port: u16,
    /// AnkiConnect endpoint (`ANKI_CONNECT_URL`).
    pub anki_url: String,
    /// Chat-completions base URL (`KOTORI_LLM_BASE_URL`).
    pub llm_base_url: String,
    /// Model or deployment name (`KOTORI_LLM_MODEL`).
    pub llm_model: String,
    /// Environment variable holding the gateway API key.
    pub llm_api_key_var: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let env_or = |key: &str, fallback: &str| std::env::var(key).unwrap_or_else(|_| fallback.to_string());
        Self {
            host: env_or("KOTORI_HOST", "127.0.0.1"),
            port: env_or("KOTORI_PORT", "8000").parse().unwrap_or(8000),
            anki_url: env_or("ANKI_CONNECT_URL", anki::client::DEFAULT_URL),
            llm_base_url: env_or("KOTORI_LLM_BASE_URL", "https://api.openai.com/v1"),
            llm_model: env_or("KOTORI_LLM_MODEL", "gpt-4o-mini"),
            llm_api_key_var: env_or("KOTORI_LLM_API_KEY_VAR", "OPENAI_API_KEY"),
        }
    }
}
