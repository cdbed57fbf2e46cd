//! # backend - Management API and push channel for kotori
//!
//! The process-wide surface around the tutor: an axum HTTP API for session
//! CRUD, history, and maintenance, plus one WebSocket push channel per
//! session for the conversation itself.
//!
//! Sessions are created over HTTP first; attaching the push channel
//! activates them and starts (or resumes) the session's orchestrator. A
//! second attach for the same session is rejected, and an attach for an
//! unknown session is closed with a policy-violation frame. Disconnecting
//! keeps the session alive for reconnection; a maintenance sweep reaps
//! sessions idle beyond a configurable age.
//!
//! Nothing here is durable across a process restart by design - state lives
//! in the shared in-memory checkpointer and the conversation store.

pub mod api;
pub mod app;
pub mod models;
pub mod sessions;
pub mod ws;

pub use app::AppState;
pub use models::{ErrorBody, SessionRecord, UiSettings, WebSocketEvent};
pub use sessions::{ConversationStore, SessionManager};
