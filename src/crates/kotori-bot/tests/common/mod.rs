//! Shared fixtures: a scripted chat model and bot construction helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use anki::AnkiClient;
use dialog_checkpoint::MemorySaver;
use dialog_graph::llm::{ChatModel, ChatRequest, ChatResponse};
use dialog_graph::{Message, Result, ToolCall};
use kotori_bot::{KotoriBot, TutorConfig};

/// A model that replays a fixed script of assistant messages, one per call.
/// Runs of the same conversation re-execute interrupted nodes, so scripts
/// must include those repeat calls. An exhausted script answers "Okay!".
#[derive(Clone)]
pub struct ScriptedModel {
    script: Arc<Mutex<VecDeque<Message>>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Message>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        let message = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Message::assistant("Okay!"));
        Ok(ChatResponse {
            message,
            usage: None,
        })
    }

    fn clone_box(&self) -> Box<dyn ChatModel> {
        Box::new(self.clone())
    }
}

/// An assistant message requesting one `add_flashcard` call.
pub fn add_flashcard_call(front: &str, back: &str) -> Message {
    Message::assistant("").with_tool_calls(vec![ToolCall {
        id: "call_1".to_string(),
        name: "add_flashcard".to_string(),
        args: json!({"front": front, "back": back, "deck": "Kotori"}),
    }])
}

/// Bot with a scripted model, an unreachable flashcard service (port 1 never
/// listens), and a fresh in-memory checkpointer.
pub fn build_bot(script: Vec<Message>) -> (Arc<KotoriBot>, Arc<MemorySaver>) {
    let saver = Arc::new(MemorySaver::new());
    let bot = KotoriBot::new(
        Arc::new(ScriptedModel::new(script)),
        Arc::new(AnkiClient::with_url("http://127.0.0.1:1").expect("client")),
        TutorConfig::default(),
        saver.clone(),
    )
    .expect("bot compiles");
    (Arc::new(bot), saver)
}
