//! Graph-level flow tests: greeting, mode selection, the tool detour, and
//! assessment-driven grading - all against a scripted model and an
//! unreachable flashcard service.

mod common;

use futures::{pin_mut, StreamExt};

use common::{add_flashcard_call, build_bot};
use dialog_checkpoint::{Checkpoint, CheckpointSaver};
use dialog_graph::{Message, MessageRole, RunConfig, StreamChunk};
use kotori_bot::state::init_tutor_state;
use kotori_bot::TutorState;

enum Step {
    Node(String),
    Interrupt(String),
}

async fn run(
    stream: impl futures::Stream<Item = dialog_graph::Result<StreamChunk<TutorState>>>,
) -> Vec<Step> {
    pin_mut!(stream);
    let mut steps = Vec::new();
    while let Some(chunk) = stream.next().await {
        match chunk.expect("stream chunk") {
            StreamChunk::Node { node, .. } => steps.push(Step::Node(node)),
            StreamChunk::Interrupt { value, .. } => steps.push(Step::Interrupt(value)),
        }
    }
    steps
}

fn nodes(steps: &[Step]) -> Vec<&str> {
    steps
        .iter()
        .filter_map(|step| match step {
            Step::Node(node) => Some(node.as_str()),
            Step::Interrupt(_) => None,
        })
        .collect()
}

fn last_interrupt(steps: &[Step]) -> Option<&str> {
    steps.iter().rev().find_map(|step| match step {
        Step::Interrupt(value) => Some(value.as_str()),
        Step::Node(_) => None,
    })
}

#[tokio::test]
async fn chat_flow_detours_through_tools_and_returns() {
    let script = vec![
        // mode_selection classifier
        Message::assistant("1"),
        // free_conversation, first execution (interrupted)
        Message::assistant("So, what's up today?"),
        // free_conversation re-execution on resume
        Message::assistant("So, what's up today?"),
        // free_conversation_eval router: keep chatting
        Message::assistant("2"),
        // naturalness check: nothing to report
        Message::assistant("NO_ASSESSMENT"),
        // free_conversation asks for a tool call
        add_flashcard_call("tree", "a tall plant"),
        // free_conversation after the tool result
        Message::assistant("Added! Anything else?"),
    ];
    let (bot, _saver) = build_bot(script);
    let config = RunConfig::new("chat-flow");

    let steps = run(bot.app().stream(Some(init_tutor_state()), &config)).await;
    assert!(last_interrupt(&steps).unwrap().starts_with("Hey! I'm Kotori"));

    let steps = run(bot.app().stream_resume("beginner, daily chat", &config)).await;
    assert_eq!(nodes(&steps), vec!["greeting"]);
    assert!(last_interrupt(&steps).unwrap().contains("Study mode"));

    let steps = run(bot.app().stream_resume("chat mode please", &config)).await;
    assert_eq!(nodes(&steps), vec!["mode_selection_prompt", "mode_selection"]);
    assert_eq!(last_interrupt(&steps), Some("So, what's up today?"));

    let steps = run(
        bot.app()
            .stream_resume("i saw a tree today, can you add 'tree' to my flashcards?", &config),
    )
    .await;
    // The tool detour returns to the calling node.
    assert_eq!(
        nodes(&steps),
        vec![
            "free_conversation",
            "free_conversation_eval",
            "free_conversation",
            "tools",
        ]
    );
    assert_eq!(last_interrupt(&steps), Some("Added! Anything else?"));

    let state = bot.app().get_state("chat-flow").await.unwrap().unwrap();
    // The tool result is in the conversation, carrying the failure message
    // from the unreachable service; the session survived it.
    let tool_msg = state
        .messages
        .iter()
        .find(|msg| msg.role == MessageRole::Tool)
        .expect("tool result message");
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_msg.content.contains("AnkiConnect"));
    assert!(state.round_start_idx <= state.messages.len());
    assert_eq!(state.counter, 1);
}

#[tokio::test]
async fn study_request_without_cards_falls_back_to_free_chat() {
    let script = vec![
        // mode_selection classifier: study mode
        Message::assistant("2"),
        // free_conversation opener after the fallback
        Message::assistant("Let's chat instead!"),
    ];
    let (bot, _saver) = build_bot(script);
    let config = RunConfig::new("study-fallback");

    let _ = run(bot.app().stream(Some(init_tutor_state()), &config)).await;
    let _ = run(bot.app().stream_resume("beginner, vocabulary", &config)).await;
    let steps = run(bot.app().stream_resume("study mode", &config)).await;

    // Card retrieval fails (service unreachable) and routes to free chat.
    assert_eq!(
        nodes(&steps),
        vec!["mode_selection_prompt", "mode_selection", "retrieve_cards"]
    );
    assert_eq!(last_interrupt(&steps), Some("Let's chat instead!"));
}

#[tokio::test]
async fn assessment_grades_card_and_moves_to_next_round() {
    let script = vec![
        // conversation, first execution (interrupted)
        Message::assistant("Great use of 'tree'! Can you make another sentence?"),
        // conversation re-execution on resume
        Message::assistant("Great use of 'tree'! Can you make another sentence?"),
        // assessment router: switch card
        Message::assistant("2"),
        // rubric assessment
        Message::assistant(
            "== Assessment for [[tree]]\nMEANING_UNDERSTANDING: 4 - solid\nUSAGE_ACCURACY: 4 - accurate\nNATURALNESS: 4 - natural\n\nOVERALL_MASTERY: 4 - good competency\n\nNEXT_STEPS: Try past tense.",
        ),
        // free_conversation opener after retrieve_cards falls back
        Message::assistant("New round then!"),
    ];
    let (bot, saver) = build_bot(script);
    let config = RunConfig::new("study-grading");

    // Seed a thread already in guided conversation with an active card.
    let mut state = init_tutor_state();
    state.messages.push(Message::assistant("Let's practice 'tree'."));
    state.messages.push(Message::human("I love trees"));
    state.active_card = "ID: 1234567890\nDeck: Kotori\nQuestion: tree\nAnswer: a tall plant".to_string();
    state.next = "conversation".to_string();
    let checkpoint = Checkpoint::new("study-grading", &state, 1)
        .unwrap()
        .with_next_node("conversation");
    saver.put(checkpoint).await.unwrap();

    let steps = run(bot.app().stream(None, &config)).await;
    assert!(last_interrupt(&steps).unwrap().contains("Great use of 'tree'"));

    let steps = run(bot.app().stream_resume("can we switch to another card?", &config)).await;
    assert_eq!(
        nodes(&steps),
        vec!["conversation", "assessment", "retrieve_cards"]
    );

    let state = bot.app().get_state("study-grading").await.unwrap().unwrap();
    assert_eq!(state.assessment_history.len(), 1);
    assert!(state.assessment_history[0].contains("OVERALL_MASTERY: 4"));

    // Mastery 4 graded as ease 4, recorded as a synthesized tool message.
    let grade_msg = state
        .messages
        .iter()
        .find(|msg| msg.name.as_deref() == Some("answer_card"))
        .expect("grading tool message");
    assert!(grade_msg.content.contains("ID: 1234567890"));
    assert!(grade_msg.content.contains("ease: 4"));

    // The round was reset after grading.
    assert!(state.active_card.is_empty());
    assert_eq!(state.round_start_idx, state.messages.len());
}
