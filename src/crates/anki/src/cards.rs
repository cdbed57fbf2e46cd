//! Card-study operations: retrieval tiering, grading, relearning.
//!
//! Retrieval walks a fixed priority of search tiers - due, learning, review,
//! then any card - and reports which tier matched, so the conversation can
//! prefer cards the scheduler actually wants reviewed. Card fronts/backs are
//! stripped of HTML before they reach a prompt.

use serde_json::{json, Value};

use crate::client::AnkiClient;
use crate::error::{AnkiError, Result};

/// Ease grades accepted by the scheduler.
pub const EASE_NAMES: [(u8, &str); 4] = [(1, "Again"), (2, "Hard"), (3, "Good"), (4, "Easy")];

/// Human name of an ease grade.
pub fn ease_name(ease: u8) -> Option<&'static str> {
    EASE_NAMES
        .iter()
        .find(|(value, _)| *value == ease)
        .map(|(_, name)| *name)
}

const INVALID_EASE: &str = "Error: Ease must be 1 (Again), 2 (Hard), 3 (Good), or 4 (Easy)";

/// A card answer for batch grading.
#[derive(Debug, Clone)]
pub struct CardAnswer {
    pub card_id: i64,
    pub ease: u8,
}

struct Tier {
    query: &'static str,
    description: &'static str,
    category: &'static str,
}

const TIERS: [Tier; 4] = [
    Tier {
        query: "is:due",
        description: "cards that are due for review",
        category: "due",
    },
    Tier {
        query: "is:learn",
        description: "cards that are currently being learned",
        category: "learning",
    },
    Tier {
        query: "is:review",
        description: "cards in the review queue",
        category: "review",
    },
    Tier {
        query: "",
        description: "available cards",
        category: "any",
    },
];

impl AnkiClient {
    /// Find cards worth anchoring a study round on, walking the tier
    /// priority. Returns a formatted description including each card's
    /// `ID:` line, or a "No cards found" message.
    pub async fn find_cards_for_study(&self, deck_name: Option<&str>, limit: usize) -> Result<String> {
        for tier in &TIERS {
            let query = match (deck_name, tier.query.is_empty()) {
                (Some(deck), false) => format!("deck:\"{deck}\" {}", tier.query),
                (Some(deck), true) => format!("deck:\"{deck}\""),
                (None, false) => tier.query.to_string(),
                (None, true) => String::new(),
            };

            let card_ids = self.find_cards(&query, limit).await?;
            if card_ids.is_empty() {
                continue;
            }

            let cards = self.cards_info(&card_ids).await?;
            if cards.is_empty() {
                return Ok("Error: Could not retrieve card details".to_string());
            }

            let scope = match deck_name {
                Some(deck) => format!("Found {} {} from deck '{deck}' to discuss:", cards.len(), tier.description),
                None => format!("Found {} {} to discuss:", cards.len(), tier.description),
            };

            let formatted: Vec<String> = cards.iter().map(format_card).collect();
            return Ok(format!(
                "{scope}\n\n{}\n\nThese cards are categorized as '{}'.",
                formatted.join("\n\n"),
                tier.category
            ));
        }

        Ok(match deck_name {
            Some(deck) => format!("No cards found in deck '{deck}' to talk about"),
            None => "No cards found to talk about".to_string(),
        })
    }

    /// Grade a single card.
    pub async fn answer_card(&self, card_id: i64, ease: u8) -> Result<String> {
        let Some(name) = ease_name(ease) else {
            return Err(AnkiError::InvalidInput(INVALID_EASE.to_string()));
        };

        let result = self
            .invoke(
                "answerCards",
                Some(json!({"answers": [{"cardId": card_id, "ease": ease}]})),
            )
            .await?;

        let answered = result
            .as_array()
            .and_then(|values| values.first())
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if answered {
            Ok(format!("Successfully answered card {card_id} with ease: {name}"))
        } else {
            Ok(format!(
                "Failed to answer card {card_id}. Card may not exist or may not be in review mode."
            ))
        }
    }

    /// Grade several cards in one call.
    pub async fn answer_cards(&self, answers: &[CardAnswer]) -> Result<String> {
        if answers.is_empty() {
            return Err(AnkiError::InvalidInput("Error: No card answers provided".to_string()));
        }
        for answer in answers {
            if ease_name(answer.ease).is_none() {
                return Err(AnkiError::InvalidInput(format!(
                    "Error: Ease for card {} must be 1 (Again), 2 (Hard), 3 (Good), or 4 (Easy)",
                    answer.card_id
                )));
            }
        }

        let payload: Vec<Value> = answers
            .iter()
            .map(|answer| json!({"cardId": answer.card_id, "ease": answer.ease}))
            .collect();
        let result = self.invoke("answerCards", Some(json!({"answers": payload}))).await?;

        let outcomes: Vec<bool> = result
            .as_array()
            .map(|values| values.iter().map(|v| v.as_bool().unwrap_or(false)).collect())
            .unwrap_or_default();

        let mut lines = Vec::with_capacity(answers.len());
        let mut succeeded = 0usize;
        for (index, answer) in answers.iter().enumerate() {
            if outcomes.get(index).copied().unwrap_or(false) {
                succeeded += 1;
                lines.push(format!(
                    "\u{2713} Card {}: {}",
                    answer.card_id,
                    ease_name(answer.ease).unwrap_or("?")
                ));
            } else {
                lines.push(format!("\u{2717} Card {}: Failed to answer", answer.card_id));
            }
        }

        Ok(format!(
            "Answered {succeeded}/{} cards successfully:\n{}",
            answers.len(),
            lines.join("\n")
        ))
    }

    /// Put cards back into the learning queue so they can be graded again.
    pub async fn relearn_cards(&self, card_ids: &[i64]) -> Result<String> {
        if card_ids.is_empty() {
            return Err(AnkiError::InvalidInput("Error: No card IDs provided".to_string()));
        }
        self.invoke("relearnCards", Some(json!({"cards": card_ids}))).await?;
        Ok(format!("Marked {} card(s) for relearning", card_ids.len()))
    }

    /// Probe the service. Returns a status string either way.
    pub async fn check_connection(&self) -> Result<String> {
        let version = self.version().await?;
        Ok(format!("AnkiConnect is working! Version: {version}"))
    }

    async fn find_cards(&self, query: &str, limit: usize) -> Result<Vec<i64>> {
        let result = self.invoke("findCards", Some(json!({"query": query}))).await?;
        Ok(result
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_i64).take(limit).collect())
            .unwrap_or_default())
    }

    async fn cards_info(&self, card_ids: &[i64]) -> Result<Vec<Value>> {
        let result = self.invoke("cardsInfo", Some(json!({"cards": card_ids}))).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }
}

fn format_card(card: &Value) -> String {
    format!(
        "ID: {}\nDeck: {}\nQuestion: {}\nAnswer: {}",
        card["cardId"].as_i64().unwrap_or_default(),
        card["deckName"].as_str().unwrap_or("Unknown"),
        clean_html(card["question"].as_str().unwrap_or("")),
        clean_html(card["answer"].as_str().unwrap_or("")),
    )
}

/// Strip HTML tags and collapse entity/whitespace noise from card content.
pub fn clean_html(text: &str) -> String {
    let tags = regex::Regex::new(r"<[^>]+>").expect("static regex");
    let stripped = tags.replace_all(text, " ");
    let stripped = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
