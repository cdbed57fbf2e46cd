//! Deck operations.

use serde_json::{json, Value};

use crate::client::AnkiClient;
use crate::error::Result;

impl AnkiClient {
    /// List deck names.
    pub async fn get_decks(&self) -> Result<String> {
        let result = self.invoke("deckNames", None).await?;
        let decks: Vec<&str> = result
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if decks.is_empty() {
            return Ok("No decks found in Anki".to_string());
        }
        Ok(format!("Available Anki decks: {}", decks.join(", ")))
    }

    /// Raw deck name list, for the management API.
    pub async fn deck_names(&self) -> Result<Vec<String>> {
        let result = self.invoke("deckNames", None).await?;
        Ok(result
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Create a deck. Creating an existing deck is a no-op on the service
    /// side.
    pub async fn create_deck(&self, deck_name: &str) -> Result<String> {
        let result = self.invoke("createDeck", Some(json!({"deck": deck_name}))).await?;
        Ok(format!(
            "Successfully created deck '{deck_name}' with ID: {}",
            result.as_i64().unwrap_or_default()
        ))
    }

    /// Delete a deck; `cards_too` also removes its cards.
    pub async fn delete_deck(&self, deck_name: &str, cards_too: bool) -> Result<String> {
        self.invoke(
            "deleteDecks",
            Some(json!({"decks": [deck_name], "cardsToo": cards_too})),
        )
        .await?;
        Ok(format!("Successfully deleted deck '{deck_name}'"))
    }

    /// Summarize a deck's statistics.
    pub async fn deck_stats(&self, deck_name: &str) -> Result<String> {
        let result = self.invoke("getDeckStats", Some(json!({"decks": [deck_name]}))).await?;

        // Stats are keyed by deck id; match on the embedded name.
        let stats = result
            .as_object()
            .and_then(|by_id| by_id.values().find(|stats| stats["name"] == deck_name));

        let Some(stats) = stats else {
            return Ok(format!("No statistics found for deck '{deck_name}'"));
        };

        Ok(format!(
            "Statistics for deck '{deck_name}':\nTotal notes: {}\nNew cards: {}\nLearning cards: {}\nReview cards: {}",
            stat(stats, "total_in_deck"),
            stat(stats, "new_count"),
            stat(stats, "learn_count"),
            stat(stats, "review_count"),
        ))
    }
}

fn stat(stats: &Value, key: &str) -> String {
    match &stats[key] {
        Value::Null => "Unknown".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_renders_numbers_and_unknowns() {
        let stats = json!({"new_count": 12});
        assert_eq!(stat(&stats, "new_count"), "12");
        assert_eq!(stat(&stats, "review_count"), "Unknown");
    }
}
