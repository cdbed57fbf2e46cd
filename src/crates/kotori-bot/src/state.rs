//! The tutor's per-session graph state.

use serde::{Deserialize, Serialize};

use dialog_graph::{Message, MessageRole};

/// Checkpointed state of one tutoring session.
///
/// `messages` is append-only within a session; `round_start_idx` marks where
/// the current topical round began and is reset on every mode change, so
/// classifiers and assessments only look at the round at hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorState {
    /// Full conversation, in order.
    pub messages: Vec<Message>,

    /// Index into `messages` where the current round started.
    pub round_start_idx: usize,

    /// Free-text level/goal captured during greeting.
    pub learning_goals: String,

    /// Name of the next node to run; empty means terminal.
    pub next: String,

    /// The flashcard anchoring the current study round (id + front/back +
    /// metadata as one formatted string), or empty.
    pub active_card: String,

    /// Past assessments, oldest first.
    pub assessment_history: Vec<String>,

    /// Node that requested tool execution; the tools node routes back here.
    pub calling_node: String,

    /// Turn counter.
    pub counter: u64,

    /// An assessment has been produced and should drive a card grade.
    pub need_card_answer: bool,
}

/// Initial state for a fresh session.
pub fn init_tutor_state() -> TutorState {
    TutorState::default()
}

impl TutorState {
    /// Last `count` messages of the current round.
    pub fn recent_messages(&self, count: usize) -> &[Message] {
        let start = self.round_start_idx.min(self.messages.len());
        let round = &self.messages[start..];
        if round.len() <= count {
            round
        } else {
            &round[round.len() - count..]
        }
    }

    /// Number of messages in the current round.
    pub fn round_len(&self) -> usize {
        self.messages.len().saturating_sub(self.round_start_idx)
    }

    /// Render recent round messages for a classifier prompt.
    pub fn render_recent(&self, count: usize) -> String {
        self.recent_messages(count)
            .iter()
            .map(|msg| {
                let label = match msg.role {
                    MessageRole::System => "System",
                    MessageRole::Human => "Human",
                    MessageRole::Assistant => "Assistant",
                    MessageRole::Tool => "Tool",
                };
                format!("[{label}] {}", msg.content)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Last human message of the session, if any.
    pub fn last_human_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|msg| msg.role == MessageRole::Human)
    }

    /// Reset round-scoped learning state for a new topic. Clears the active
    /// card and goals, zeroes the counter, and moves `round_start_idx` to
    /// the current end of the conversation.
    pub fn reset_learning_state(&mut self) {
        self.active_card.clear();
        self.learning_goals.clear();
        self.counter = 0;
        self.round_start_idx = self.messages.len();
        self.need_card_answer = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_messages(count: usize) -> TutorState {
        let mut state = init_tutor_state();
        for i in 0..count {
            state.messages.push(Message::human(format!("msg {i}")));
        }
        state
    }

    #[test]
    fn recent_messages_respects_round_start() {
        let mut state = state_with_messages(6);
        state.round_start_idx = 4;
        let recent = state.recent_messages(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "msg 4");
    }

    #[test]
    fn recent_messages_caps_at_count() {
        let state = state_with_messages(10);
        let recent = state.recent_messages(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "msg 7");
    }

    #[test]
    fn recent_messages_handles_stale_round_index() {
        let mut state = state_with_messages(2);
        state.round_start_idx = 5;
        assert!(state.recent_messages(4).is_empty());
    }

    #[test]
    fn reset_moves_round_start_to_end() {
        let mut state = state_with_messages(4);
        state.active_card = "ID: 1\ntree".to_string();
        state.learning_goals = "beginner".to_string();
        state.counter = 7;
        state.need_card_answer = true;

        state.reset_learning_state();

        assert!(state.active_card.is_empty());
        assert!(state.learning_goals.is_empty());
        assert_eq!(state.counter, 0);
        assert_eq!(state.round_start_idx, 4);
        assert!(!state.need_card_answer);
        // round_start_idx never exceeds the message count
        assert!(state.round_start_idx <= state.messages.len());
    }

    #[test]
    fn render_recent_labels_roles() {
        let mut state = init_tutor_state();
        state.messages.push(Message::assistant("hello"));
        state.messages.push(Message::human("hi"));
        let rendered = state.render_recent(6);
        assert_eq!(rendered, "[Assistant] hello [Human] hi");
    }
}
