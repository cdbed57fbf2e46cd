//! The core chat-model trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::config::ChatRequest;
use crate::messages::Message;

/// Token accounting returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Prompt tokens consumed.
    pub input_tokens: u64,
    /// Completion tokens generated.
    pub output_tokens: u64,
    /// Total tokens billed.
    pub total_tokens: u64,
}

/// A complete chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant's message. May carry pending tool calls when tools were
    /// bound to the request.
    pub message: Message,

    /// Token usage, when the provider reports it.
    pub usage: Option<UsageMetadata>,
}

/// Provider-agnostic interface for chat-based language models.
///
/// Implementations must be `Send + Sync`; graphs hold models as
/// `Arc<dyn ChatModel>` shared across nodes. A model that supports tool
/// calling returns the requested calls in `response.message.tool_calls`; the
/// runtime routes them to the tools node and feeds the results back as tool
/// messages in a subsequent request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete response for the request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Whether the provider is reachable and healthy. Defaults to available.
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    /// Clone this model into a boxed trait object.
    fn clone_box(&self) -> Box<dyn ChatModel>;
}

impl Clone for Box<dyn ChatModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockModel {
        response_text: String,
    }

    #[async_trait]
    impl ChatModel for MockModel {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse {
                message: Message::assistant(self.response_text.clone()),
                usage: Some(UsageMetadata {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }

        fn clone_box(&self) -> Box<dyn ChatModel> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn trait_object_round_trip() {
        let model: Arc<dyn ChatModel> = Arc::new(MockModel {
            response_text: "Hello!".to_string(),
        });

        let response = model
            .chat(ChatRequest::new(vec![Message::human("Hi")]))
            .await
            .unwrap();

        assert_eq!(response.message.content, "Hello!");
        assert!(model.is_available().await.unwrap());
    }
}
