//! Card-grading post-processing.
//!
//! After an assessment, the active card is graded against the
//! spaced-repetition scheduler: parse the card id out of the stored card
//! text and the overall mastery out of the assessment, clamp mastery >= 4
//! to ease 4, relearn the card to bring it into the learning queue, then
//! answer it. Extraction is best-effort: a malformed assessment is ignored,
//! never guessed.

use regex::Regex;

use anki::AnkiClient;
use dialog_graph::Message;

use crate::state::TutorState;

/// Extract the card id from an active-card description (`ID: <digits>`).
pub fn extract_card_id(card: &str) -> Option<i64> {
    let pattern = Regex::new(r"ID: (\d+)").expect("static regex");
    pattern
        .captures(card)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract the overall mastery score (`OVERALL_MASTERY: <1..5>`).
pub fn extract_overall_mastery(assessment: &str) -> Option<u8> {
    let pattern = Regex::new(r"OVERALL_MASTERY: (\d)").expect("static regex");
    pattern
        .captures(assessment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|score| (1..=5).contains(score))
}

/// Mastery-to-ease mapping: 4 and 5 both grade as Easy.
pub fn mastery_to_ease(mastery: u8) -> u8 {
    mastery.min(4)
}

/// Grade the active card from an assessment, appending a synthesized
/// tool-result message describing the outcome. No-ops when either pattern
/// is missing.
pub async fn grade_active_card(client: &AnkiClient, state: &mut TutorState, assessment: &str) {
    if state.active_card.is_empty() || assessment.is_empty() {
        return;
    }

    let Some(card_id) = extract_card_id(&state.active_card) else {
        tracing::debug!("active card carries no ID pattern, skipping grade");
        return;
    };
    let Some(mastery) = extract_overall_mastery(assessment) else {
        tracing::debug!(card_id, "assessment carries no OVERALL_MASTERY pattern, skipping grade");
        return;
    };
    let ease = mastery_to_ease(mastery);

    let relearn_result = match client.relearn_cards(&[card_id]).await {
        Ok(text) => text,
        Err(err) => err.to_string(),
    };
    let answer_result = match client.answer_card(card_id, ease).await {
        Ok(text) => text,
        Err(err) => err.to_string(),
    };

    tracing::info!(card_id, ease, "graded active card");

    let content = format!(
        "Card call for ID: {card_id} with ease: {ease}: {relearn_result}, {answer_result}"
    );
    state.messages.push(
        Message::tool(content, format!("answer_card_{card_id}")).with_name("answer_card"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::init_tutor_state;

    const CARD: &str = "ID: 1234567890\nDeck: Kotori\nQuestion: tree\nAnswer: a tall plant";

    #[test]
    fn extracts_card_id() {
        assert_eq!(extract_card_id(CARD), Some(1234567890));
        assert_eq!(extract_card_id("no id here"), None);
    }

    #[test]
    fn extracts_mastery_in_range() {
        assert_eq!(extract_overall_mastery("OVERALL_MASTERY: 4 - solid"), Some(4));
        assert_eq!(extract_overall_mastery("OVERALL_MASTERY: 1"), Some(1));
        // Out-of-range and missing patterns are ignored.
        assert_eq!(extract_overall_mastery("OVERALL_MASTERY: 0"), None);
        assert_eq!(extract_overall_mastery("great job overall"), None);
    }

    #[test]
    fn mastery_five_clamps_to_ease_four() {
        assert_eq!(mastery_to_ease(5), 4);
        assert_eq!(mastery_to_ease(4), 4);
        assert_eq!(mastery_to_ease(3), 3);
        assert_eq!(mastery_to_ease(1), 1);
    }

    #[tokio::test]
    async fn malformed_assessment_does_not_grade() {
        let client = AnkiClient::with_url("http://127.0.0.1:1").unwrap();
        let mut state = init_tutor_state();
        state.active_card = CARD.to_string();

        grade_active_card(&client, &mut state, "no mastery line in sight").await;

        // No tool message appended: the grade was skipped entirely.
        assert!(state.messages.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_still_records_the_attempt() {
        let client = AnkiClient::with_url("http://127.0.0.1:1").unwrap();
        let mut state = init_tutor_state();
        state.active_card = CARD.to_string();

        grade_active_card(&client, &mut state, "OVERALL_MASTERY: 5 - excellent").await;

        assert_eq!(state.messages.len(), 1);
        let msg = &state.messages[0];
        assert_eq!(msg.name.as_deref(), Some("answer_card"));
        assert_eq!(msg.tool_call_id.as_deref(), Some("answer_card_1234567890"));
        assert!(msg.content.contains("ease: 4"));
    }
}
