//! Events a session orchestrator emits toward the push channel.
//!
//! The backend subscribes to one event stream per session and fans the
//! events out over its WebSocket; the payload types here are already in the
//! wire-friendly shape (string kinds, UTC timestamps, JSON metadata).

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a conversation item as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai,
    System,
    Tool,
}

/// A conversation item in client-facing shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: String,
    pub content: String,
    pub message_type: MessageKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl OutboundMessage {
    /// New message of a kind with fresh id and timestamp.
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            message_type: kind,
            timestamp: Utc::now(),
            tool_calls: None,
            metadata: None,
        }
    }

    /// Attach tool-call details.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallInfo>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A tool invocation as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallInfo {
    pub tool_name: String,
    pub parameters: Value,
    /// "pending", "success", or "error".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Snapshot of the graph position and learning state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateInfo {
    pub current_node: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_node: Option<String>,
    pub learning_goals: String,
    pub active_card: String,
    pub assessment_history: Vec<String>,
    pub counter: u64,
}

/// Rubric scores parsed out of an assessment text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_understanding: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_accuracy: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub naturalness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_mastery: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,
}

impl AssessmentMetrics {
    /// Best-effort extraction of rubric scores from assessment text.
    /// Unparseable axes stay `None`; nothing is guessed.
    pub fn parse(assessment: &str) -> Self {
        let score = |axis: &str| -> Option<u8> {
            let pattern = Regex::new(&format!(r"{axis}: (\d)")).ok()?;
            pattern
                .captures(assessment)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .filter(|value| (1..=5).contains(value))
        };

        let next_steps = assessment
            .lines()
            .find_map(|line| line.strip_prefix("NEXT_STEPS:"))
            .map(|rest| rest.trim().to_string())
            .filter(|rest| !rest.is_empty());

        Self {
            meaning_understanding: score("MEANING_UNDERSTANDING"),
            usage_accuracy: score("USAGE_ACCURACY"),
            naturalness: score("NATURALNESS"),
            overall_mastery: score("OVERALL_MASTERY"),
            next_steps,
        }
    }
}

/// Everything a session can tell the outside world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BotEvent {
    /// The assistant asked something (an accepted interrupt).
    AiResponse { message: OutboundMessage },
    /// A user message was accepted into the conversation.
    UserMessage { message: OutboundMessage },
    /// A node completed; the session moved.
    StateChange { state: StateInfo },
    /// A tool call was requested or completed.
    ToolCall { tool: ToolCallInfo },
    /// A synthesized message describing tool traffic.
    ToolMessage { message: OutboundMessage },
    /// A new assessment was produced.
    AssessmentUpdate { metrics: AssessmentMetrics },
    /// The conversation ended.
    ConversationEnd { reason: String },
    /// A recoverable or fatal session error.
    Error { message: String },
}
