//! # kotori-bot - The language-learning tutor itself
//!
//! This crate assembles the conversational control plane on top of
//! `dialog-graph`: the tutor's node catalogue (greeting, mode selection,
//! guided and free conversation, assessment, tools), the prompts each node
//! speaks with, the card-grading post-processing, and the per-session
//! orchestrator that adapts graph interrupts to an async request/reply
//! channel.
//!
//! The conversation flow, per round:
//!
//! ```text
//! greeting -> mode_selection_prompt -> mode_selection
//!     study: retrieve_cards -> conversation <-> assessment -> retrieve_cards
//!     chat:  free_conversation <-> free_conversation_eval
//! tool calls from any tool-capable node detour through `tools` and return
//! to the calling node.
//! ```
//!
//! [`session::SessionOrchestrator`] drives one session: it streams graph
//! steps, converts accepted interrupts into `ai_response` events, awaits the
//! next user reply on a depth-1 queue, and resumes. Its duplicate-interrupt
//! filter ([`dedup::InterruptFilter`]) guarantees an interrupt is delivered
//! to the push channel at most once, even when the runtime observes the same
//! logical interrupt across stream iterations.

pub mod bot;
pub mod config;
pub mod dedup;
pub mod events;
pub mod grading;
pub mod prompts;
pub mod session;
pub mod state;

pub use bot::KotoriBot;
pub use config::{Language, TutorConfig};
pub use events::{AssessmentMetrics, BotEvent, MessageKind, OutboundMessage, StateInfo, ToolCallInfo};
pub use session::SessionOrchestrator;
pub use state::TutorState;
