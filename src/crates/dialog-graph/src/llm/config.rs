//! Chat request configuration.

use crate::llm::tools::ToolDefinition;
use crate::messages::Message;

/// A chat request: the message list plus per-call configuration.
///
/// Built with the builder methods; only `messages` is required.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation to send, in order.
    pub messages: Vec<Message>,

    /// Sampling temperature override for this call.
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    pub max_tokens: Option<usize>,

    /// Tools bound to this call. Empty means no tool calling.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    /// Create a request from a message list.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generation cap.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Bind tools to this call.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Whether this request binds any tools.
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_composes() {
        let request = ChatRequest::new(vec![Message::human("hi")])
            .with_temperature(0.7)
            .with_tools(vec![ToolDefinition::new("add_flashcard", "Add a card")]);

        assert_eq!(request.temperature, Some(0.7));
        assert!(request.has_tools());
        assert_eq!(request.messages.len(), 1);
    }
}
