//! LLM integration traits and types.
//!
//! The graph runtime is an orchestration layer, not an LLM client: this
//! module defines the [`ChatModel`] trait that nodes program against, plus
//! the request/response types. Concrete clients live in the `llm` crate and
//! are handed to the graph as `Arc<dyn ChatModel>`.

pub mod config;
pub mod tools;
pub mod traits;

pub use config::ChatRequest;
pub use tools::ToolDefinition;
pub use traits::{ChatModel, ChatResponse, UsageMetadata};
