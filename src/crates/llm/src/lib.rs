//! LLM gateway client for kotori.
//!
//! This crate provides the concrete implementation of the
//! [`ChatModel`](dialog_graph::llm::ChatModel) trait the dialog graph
//! programs against. The tutor talks to one gateway: any
//! chat-completions-compatible endpoint (OpenAI, Azure OpenAI deployments,
//! or a local proxy), with tool binding and a per-session temperature
//! override.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{config::RemoteLlmConfig, remote::OpenAiClient};
//! use dialog_graph::llm::{ChatModel, ChatRequest};
//! use dialog_graph::Message;
//!
//! let config = RemoteLlmConfig::from_env(
//!     "OPENAI_API_KEY",
//!     "https://api.openai.com/v1",
//!     "gpt-4o-mini",
//! )?;
//! let client = OpenAiClient::new(config);
//!
//! let request = ChatRequest::new(vec![Message::human("Hello!")])
//!     .with_temperature(0.7);
//! let response = client.chat(request).await?;
//! ```
//!
//! Transient failures (network errors, timeouts, rate limits) are retried
//! inside the client with exponential backoff, capped at three attempts;
//! everything else surfaces immediately as an [`error::LlmError`].

pub mod config;
pub mod error;
pub mod remote;

pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use remote::OpenAiClient;
