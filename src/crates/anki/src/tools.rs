//! The model-facing tool set.
//!
//! [`build_tool_registry`] wraps an [`AnkiClient`] into the registry of
//! callable tools bound to the LLM. Service failures - transport or protocol
//! alike - become tool-result errors the model can read and react to; they
//! never abort the node that requested the call.

use std::sync::Arc;

use serde_json::{json, Value};

use dialog_graph::{Tool, ToolError, ToolRegistry};

use crate::cards::CardAnswer;
use crate::client::AnkiClient;
use crate::error::AnkiError;
use crate::notes::NewNote;

fn execution_error(tool: &str, err: AnkiError) -> ToolError {
    ToolError::ExecutionFailed {
        tool: tool.to_string(),
        error: err.to_string(),
    }
}

fn missing_argument(tool: &str, argument: &str) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        error: format!("required argument '{argument}' is missing"),
    }
}

fn string_arg(args: &Value, key: &str) -> Option<String> {
    args[key].as_str().map(str::to_string).filter(|s| !s.is_empty())
}

fn string_list(args: &Value, key: &str) -> Vec<String> {
    args[key]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn id_list(args: &Value, key: &str) -> Vec<i64> {
    args[key]
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

fn limit_arg(args: &Value, default: usize) -> usize {
    args["limit"].as_u64().map(|n| n as usize).unwrap_or(default)
}

/// Build the full tool registry over one flashcard client.
pub fn build_tool_registry(client: Arc<AnkiClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "add_flashcard",
            "Add a flashcard note with a front and back to an Anki deck. \
             Optionally attach tags or an audio file by URL.",
            json!({
                "type": "object",
                "properties": {
                    "front": {"type": "string", "description": "Front side (question/prompt)"},
                    "back": {"type": "string", "description": "Back side (answer/explanation)"},
                    "deck": {"type": "string", "description": "Deck to add the note to"},
                    "note_type": {"type": "string", "description": "Note template, defaults to Basic"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "audio_url": {"type": "string", "description": "URL of an audio file to attach"}
                },
                "required": ["front", "back"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let front = string_arg(&args, "front")
                        .ok_or_else(|| missing_argument("add_flashcard", "front"))?;
                    let back = string_arg(&args, "back")
                        .ok_or_else(|| missing_argument("add_flashcard", "back"))?;
                    let note = NewNote {
                        front,
                        back,
                        deck_name: string_arg(&args, "deck").unwrap_or_else(|| "Kotori".to_string()),
                        note_type: string_arg(&args, "note_type").unwrap_or_else(|| "Basic".to_string()),
                        tags: string_list(&args, "tags"),
                        audio_url: string_arg(&args, "audio_url"),
                    };
                    client
                        .add_note(&note)
                        .await
                        .map_err(|err| execution_error("add_flashcard", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "get_decks",
            "List all available Anki decks.",
            json!({"type": "object", "properties": {}}),
            Arc::new(move |_args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    client.get_decks().await.map_err(|err| execution_error("get_decks", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "check_service",
            "Check whether the flashcard service is reachable and working.",
            json!({"type": "object", "properties": {}}),
            Arc::new(move |_args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    client
                        .check_connection()
                        .await
                        .map_err(|err| execution_error("check_service", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "query_notes",
            "Search notes with optional deck, note-type, and tag filters.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "deck": {"type": "string"},
                    "note_type": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "limit": {"type": "integer", "default": 20}
                }
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let query = string_arg(&args, "query").unwrap_or_default();
                    let deck = string_arg(&args, "deck");
                    let note_type = string_arg(&args, "note_type");
                    let tags = string_list(&args, "tags");
                    client
                        .query_notes(&query, deck.as_deref(), note_type.as_deref(), &tags, limit_arg(&args, 20))
                        .await
                        .map_err(|err| execution_error("query_notes", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "get_note",
            "Get a note's full details by its ID.",
            json!({
                "type": "object",
                "properties": {"id": {"type": "integer"}},
                "required": ["id"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let id = args["id"].as_i64().ok_or_else(|| missing_argument("get_note", "id"))?;
                    client
                        .get_note_by_id(id)
                        .await
                        .map_err(|err| execution_error("get_note", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "search_notes",
            "Search notes containing specific text in any field.",
            json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string"},
                    "limit": {"type": "integer", "default": 10}
                },
                "required": ["content"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let content = string_arg(&args, "content")
                        .ok_or_else(|| missing_argument("search_notes", "content"))?;
                    client
                        .search_notes_by_content(&content, limit_arg(&args, 10))
                        .await
                        .map_err(|err| execution_error("search_notes", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "delete_notes",
            "Delete notes by their IDs.",
            json!({
                "type": "object",
                "properties": {"ids": {"type": "array", "items": {"type": "integer"}}},
                "required": ["ids"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let ids = id_list(&args, "ids");
                    client
                        .delete_notes(&ids)
                        .await
                        .map_err(|err| execution_error("delete_notes", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "create_deck",
            "Create a new deck.",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let name = string_arg(&args, "name")
                        .ok_or_else(|| missing_argument("create_deck", "name"))?;
                    client
                        .create_deck(&name)
                        .await
                        .map_err(|err| execution_error("create_deck", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "delete_deck",
            "Delete a deck; optionally delete its cards too.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "cards_too": {"type": "boolean", "default": false}
                },
                "required": ["name"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let name = string_arg(&args, "name")
                        .ok_or_else(|| missing_argument("delete_deck", "name"))?;
                    let cards_too = args["cards_too"].as_bool().unwrap_or(false);
                    client
                        .delete_deck(&name, cards_too)
                        .await
                        .map_err(|err| execution_error("delete_deck", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "deck_stats",
            "Get statistics for a deck.",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let name = string_arg(&args, "name")
                        .ok_or_else(|| missing_argument("deck_stats", "name"))?;
                    client
                        .deck_stats(&name)
                        .await
                        .map_err(|err| execution_error("deck_stats", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "find_cards_for_study",
            "Find flashcards worth studying, preferring due and learning cards.",
            json!({
                "type": "object",
                "properties": {
                    "deck": {"type": "string"},
                    "limit": {"type": "integer", "default": 1}
                }
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let deck = string_arg(&args, "deck");
                    client
                        .find_cards_for_study(deck.as_deref(), limit_arg(&args, 1))
                        .await
                        .map_err(|err| execution_error("find_cards_for_study", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "answer_card",
            "Grade a card: ease 1 (Again), 2 (Hard), 3 (Good), or 4 (Easy).",
            json!({
                "type": "object",
                "properties": {
                    "card_id": {"type": "integer"},
                    "ease": {"type": "integer", "minimum": 1, "maximum": 4}
                },
                "required": ["card_id", "ease"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let card_id = args["card_id"]
                        .as_i64()
                        .ok_or_else(|| missing_argument("answer_card", "card_id"))?;
                    let ease = args["ease"]
                        .as_u64()
                        .ok_or_else(|| missing_argument("answer_card", "ease"))?
                        as u8;
                    client
                        .answer_card(card_id, ease)
                        .await
                        .map_err(|err| execution_error("answer_card", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "answer_cards",
            "Grade several cards at once.",
            json!({
                "type": "object",
                "properties": {
                    "answers": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "card_id": {"type": "integer"},
                                "ease": {"type": "integer", "minimum": 1, "maximum": 4}
                            },
                            "required": ["card_id", "ease"]
                        }
                    }
                },
                "required": ["answers"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let answers: Vec<CardAnswer> = args["answers"]
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|item| {
                                    Some(CardAnswer {
                                        card_id: item["card_id"].as_i64()?,
                                        ease: item["ease"].as_u64()? as u8,
                                    })
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    client
                        .answer_cards(&answers)
                        .await
                        .map_err(|err| execution_error("answer_cards", err))
                })
            }),
        ));
    }

    {
        let client = Arc::clone(&client);
        registry.register(Tool::new(
            "relearn_cards",
            "Put cards back into the learning queue.",
            json!({
                "type": "object",
                "properties": {"ids": {"type": "array", "items": {"type": "integer"}}},
                "required": ["ids"]
            }),
            Arc::new(move |args: Value| {
                let client = Arc::clone(&client);
                Box::pin(async move {
                    let ids = id_list(&args, "ids");
                    client
                        .relearn_cards(&ids)
                        .await
                        .map_err(|err| execution_error("relearn_cards", err))
                })
            }),
        ));
    }

    registry
}
