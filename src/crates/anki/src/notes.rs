//! Note operations: add, query, fetch, search, delete.

use serde_json::{json, Value};

use crate::client::AnkiClient;
use crate::error::{AnkiError, Result};

/// Parameters for adding a note.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub front: String,
    pub back: String,
    pub deck_name: String,
    pub note_type: String,
    pub tags: Vec<String>,
    pub audio_url: Option<String>,
}

impl NewNote {
    /// A basic front/back note for the given deck.
    pub fn basic(front: impl Into<String>, back: impl Into<String>, deck: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            deck_name: deck.into(),
            note_type: "Basic".to_string(),
            tags: Vec::new(),
            audio_url: None,
        }
    }
}

impl AnkiClient {
    /// Add a note; optionally attach audio afterwards. Audio failure does not
    /// fail the add.
    pub async fn add_note(&self, note: &NewNote) -> Result<String> {
        let mut note_data = json!({
            "deckName": note.deck_name,
            "modelName": note.note_type,
            "fields": {
                "Front": note.front,
                "Back": note.back,
            },
            "options": {
                "allowDuplicate": false,
                "duplicateScope": "deck",
            },
        });
        if !note.tags.is_empty() {
            note_data["tags"] = json!(note.tags);
        }

        let result = self.invoke("addNote", Some(json!({"note": note_data}))).await?;
        let note_id = result.as_i64().unwrap_or_default();

        if let Some(audio_url) = &note.audio_url {
            if note_id != 0 {
                if let Err(err) = self.attach_audio(note_id, audio_url).await {
                    return Ok(format!(
                        "Note added successfully (ID: {note_id}), but failed to add audio: {err}"
                    ));
                }
            }
        }

        Ok(format!(
            "Successfully added note to Anki deck '{}' with ID: {note_id}",
            note.deck_name
        ))
    }

    async fn attach_audio(&self, note_id: i64, audio_url: &str) -> Result<()> {
        let stored = self
            .invoke(
                "storeMediaFile",
                Some(json!({
                    "filename": format!("audio_{note_id}.mp3"),
                    "url": audio_url,
                })),
            )
            .await?;

        let filename = stored
            .as_str()
            .ok_or_else(|| AnkiError::InvalidResponse("no filename returned from audio storage".to_string()))?;

        self.invoke(
            "updateNoteFields",
            Some(json!({
                "note": {
                    "id": note_id,
                    "fields": {"Back": format!("[sound:{filename}]")},
                }
            })),
        )
        .await?;

        Ok(())
    }

    /// Query notes with content/deck/type/tag filters.
    pub async fn query_notes(
        &self,
        query: &str,
        deck_name: Option<&str>,
        note_type: Option<&str>,
        tags: &[String],
        limit: usize,
    ) -> Result<String> {
        let mut search_parts = Vec::new();
        if !query.is_empty() {
            search_parts.push(format!("\"{query}\""));
        }
        if let Some(deck) = deck_name {
            search_parts.push(format!("deck:\"{deck}\""));
        }
        if let Some(model) = note_type {
            search_parts.push(format!("note:\"{model}\""));
        }
        for tag in tags {
            search_parts.push(format!("tag:{tag}"));
        }
        let search_query = if search_parts.is_empty() {
            "*".to_string()
        } else {
            search_parts.join(" ")
        };

        let note_ids = self.find_notes(&search_query).await?;
        if note_ids.is_empty() {
            return Ok(format!(
                "No notes found matching the search criteria: {search_query}"
            ));
        }

        let note_ids: Vec<i64> = note_ids.into_iter().take(limit).collect();
        let notes = self.notes_info(&note_ids).await?;
        if notes.is_empty() {
            return Ok("No note details found".to_string());
        }

        let formatted: Vec<String> = notes.iter().map(|note| format_note(note, 100)).collect();
        let divider = format!("\n{}\n", "=".repeat(50));
        Ok(format!(
            "Found {} notes (showing up to {limit}):\n\n{}",
            notes.len(),
            formatted.join(divider.as_str())
        ))
    }

    /// Fetch one note by id.
    pub async fn get_note_by_id(&self, note_id: i64) -> Result<String> {
        let notes = self.notes_info(&[note_id]).await?;
        let Some(note) = notes.first().filter(|note| !note.is_null()) else {
            return Ok(format!("No note found with ID: {note_id}"));
        };

        let mut details = vec![
            format!("Note ID: {}", field_or_unknown(note, "noteId")),
            format!("Deck: {}", field_or_unknown(note, "deckName")),
            format!("Model: {}", field_or_unknown(note, "modelName")),
            String::new(),
            "Fields:".to_string(),
        ];
        if let Some(fields) = note["fields"].as_object() {
            for (name, data) in fields {
                details.push(format!("  {name}: {}", data["value"].as_str().unwrap_or("").trim()));
            }
        }
        if let Some(tags) = note["tags"].as_array() {
            if !tags.is_empty() {
                let joined: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
                details.push(format!("\nTags: {}", joined.join(", ")));
            }
        }
        Ok(details.join("\n"))
    }

    /// Search notes whose fields contain `content`.
    pub async fn search_notes_by_content(&self, content: &str, limit: usize) -> Result<String> {
        let note_ids = self.find_notes(&format!("\"{content}\"")).await?;
        if note_ids.is_empty() {
            return Ok(format!("No notes found containing: \"{content}\""));
        }

        let note_ids: Vec<i64> = note_ids.into_iter().take(limit).collect();
        let notes = self.notes_info(&note_ids).await?;

        let formatted: Vec<String> = notes
            .iter()
            .map(|note| {
                let mut summary = vec![format!(
                    "ID: {} | Deck: {}",
                    field_or_unknown(note, "noteId"),
                    field_or_unknown(note, "deckName")
                )];
                if let Some(fields) = note["fields"].as_object() {
                    for (name, data) in fields {
                        let value = data["value"].as_str().unwrap_or("").trim();
                        if value.to_lowercase().contains(&content.to_lowercase()) {
                            summary.push(format!("  {name}: {}", truncate(value, 80)));
                        }
                    }
                }
                summary.join("\n")
            })
            .collect();

        let divider = format!("\n{}\n", "-".repeat(40));
        Ok(format!(
            "Found {} notes containing \"{content}\":\n\n{}",
            notes.len(),
            formatted.join(divider.as_str())
        ))
    }

    /// Delete notes by id.
    pub async fn delete_notes(&self, note_ids: &[i64]) -> Result<String> {
        if note_ids.is_empty() {
            return Err(AnkiError::InvalidInput("Error: No note IDs provided".to_string()));
        }
        self.invoke("deleteNotes", Some(json!({"notes": note_ids}))).await?;
        Ok(format!("Successfully deleted {} note(s)", note_ids.len()))
    }

    pub(crate) async fn find_notes(&self, query: &str) -> Result<Vec<i64>> {
        let result = self.invoke("findNotes", Some(json!({"query": query}))).await?;
        Ok(result
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default())
    }

    pub(crate) async fn notes_info(&self, note_ids: &[i64]) -> Result<Vec<Value>> {
        let result = self.invoke("notesInfo", Some(json!({"notes": note_ids}))).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }
}

fn field_or_unknown(note: &Value, key: &str) -> String {
    match &note[key] {
        Value::Null => "Unknown".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let prefix: String = text.chars().take(max).collect();
        format!("{prefix}...")
    } else {
        text.to_string()
    }
}

fn format_note(note: &Value, field_max: usize) -> String {
    let mut info = vec![
        format!("Note ID: {}", field_or_unknown(note, "noteId")),
        format!("Deck: {}", field_or_unknown(note, "deckName")),
        format!("Model: {}", field_or_unknown(note, "modelName")),
    ];
    if let Some(fields) = note["fields"].as_object() {
        for (name, data) in fields {
            let value = data["value"].as_str().unwrap_or("").trim();
            if !value.is_empty() {
                info.push(format!("{name}: {}", truncate(value, field_max)));
            }
        }
    }
    if let Some(tags) = note["tags"].as_array() {
        if !tags.is_empty() {
            let joined: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
            info.push(format!("Tags: {}", joined.join(", ")));
        }
    }
    info.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_note_includes_fields_and_tags() {
        let note = json!({
            "noteId": 42,
            "deckName": "Kotori",
            "modelName": "Basic",
            "fields": {
                "Front": {"value": "tree"},
                "Back": {"value": "a tall plant"},
            },
            "tags": ["vocab"],
        });
        let text = format_note(&note, 100);
        assert!(text.contains("Note ID: 42"));
        assert!(text.contains("Front: tree"));
        assert!(text.contains("Tags: vocab"));
    }

    #[test]
    fn truncate_caps_long_values() {
        assert_eq!(truncate("short", 80), "short");
        let long = "x".repeat(120);
        let cut = truncate(&long, 80);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 83);
    }

    #[test]
    fn new_note_basic_defaults() {
        let note = NewNote::basic("tree", "a tall plant", "Kotori");
        assert_eq!(note.note_type, "Basic");
        assert!(note.tags.is_empty());
        assert!(note.audio_url.is_none());
    }
}
