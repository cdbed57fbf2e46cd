//! Message types for conversational state.
//!
//! Every conversation item in a session is a [`Message`]: user input,
//! assistant output, system prompts, and tool traffic. Assistant messages may
//! carry pending [`ToolCall`]s requested by the model; tool messages carry
//! the matching `tool_call_id` so results stay addressable.
//!
//! Messages are plain text in this system - there is no multimodal content.
//! Identity (`id`) is preserved end to end so the conversation store can
//! reject duplicates.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::tool::ToolCall;

/// Role of a message's sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions or context for the model.
    System,
    /// End-user input.
    Human,
    /// Model output.
    Assistant,
    /// Result of a tool execution.
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, used for de-duplication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Who produced this message.
    pub role: MessageRole,

    /// Text content.
    pub content: String,

    /// Optional name (tool name on tool messages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tool calls requested by the model (assistant messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Id of the tool call this message answers (tool messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Additional metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// Create a new message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
            metadata: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Alias for [`Message::assistant`].
    pub fn ai(content: impl Into<String>) -> Self {
        Self::assistant(content)
    }

    /// Alias for [`Message::human`].
    pub fn user(content: impl Into<String>) -> Self {
        Self::human(content)
    }

    /// Create a tool-result message answering `tool_call_id`.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            role: MessageRole::Tool,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            metadata: None,
        }
    }

    /// Set the message id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the message name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach tool calls (assistant messages).
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether this message carries pending tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    /// Generate an id if the message is missing one.
    pub fn ensure_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(Uuid::new_v4().to_string());
        }
    }
}

/// Whether the latest message is an assistant message with pending tool
/// calls. This is the standard post-node routing test for the tools node.
pub fn has_pending_tool_calls(messages: &[Message]) -> bool {
    messages
        .last()
        .is_some_and(|msg| msg.role == MessageRole::Assistant && msg.has_tool_calls())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_assign_ids() {
        let msg = Message::human("hello");
        assert!(msg.id.is_some());
        assert_eq!(msg.role, MessageRole::Human);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn tool_message_carries_call_id() {
        let msg = Message::tool("done", "call_42").with_name("add_flashcard");
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_42"));
        assert_eq!(msg.name.as_deref(), Some("add_flashcard"));
    }

    #[test]
    fn pending_tool_calls_requires_assistant_last() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "check_service".into(),
            args: json!({}),
        };

        let mut messages = vec![Message::human("hi")];
        assert!(!has_pending_tool_calls(&messages));

        messages.push(Message::assistant("").with_tool_calls(vec![call]));
        assert!(has_pending_tool_calls(&messages));

        messages.push(Message::tool("ok", "call_1"));
        assert!(!has_pending_tool_calls(&messages));
    }

    #[test]
    fn empty_tool_call_list_is_not_pending() {
        let msg = Message::assistant("plain").with_tool_calls(vec![]);
        assert!(!has_pending_tool_calls(&[msg]));
    }

    #[test]
    fn serde_round_trip_preserves_identity() {
        let msg = Message::assistant("reply").with_id("fixed-id");
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id.as_deref(), Some("fixed-id"));
        assert_eq!(decoded.content, "reply");
    }
}
