//! # anki - Flashcard service client for kotori
//!
//! A typed wrapper over the AnkiConnect protocol: every call is a POST of
//! `{action, version: 6, params}` to one local endpoint, answered by
//! `{result, error}`. The [`AnkiClient`] owns the envelope and the error
//! taxonomy; the [`notes`], [`decks`], and [`cards`] modules implement the
//! domain operations on top of it, producing the human/model-readable
//! strings the conversation works with.
//!
//! Transport failures (connection refused, timeout) are retriable and
//! distinct from protocol errors (a non-null `error` field), which carry the
//! server's message verbatim and are fatal for the call. An empty `result`
//! is meaningful per action - no decks is an empty list, not an error.
//!
//! [`tools`] packages the operations as the tool set bound to the LLM:
//! `add_flashcard`, `find_cards_for_study`, `answer_card`, and friends.

pub mod cards;
pub mod client;
pub mod decks;
pub mod error;
pub mod notes;
pub mod tools;

pub use client::AnkiClient;
pub use error::{AnkiError, Result};
pub use tools::build_tool_registry;
