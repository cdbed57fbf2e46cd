//! Orchestrator-level tests: single delivery of interrupts, input
//! backpressure, reattach without replay, and the resume timeout.

mod common;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use common::build_bot;
use dialog_graph::Message;
use kotori_bot::{BotEvent, SessionOrchestrator};

const EVENT_WAIT: Duration = Duration::from_secs(5);

/// Receive events until `pred` matches, returning the matching event.
/// Panics when the stream goes quiet first.
async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<BotEvent>,
    pred: impl Fn(&BotEvent) -> bool,
) -> BotEvent {
    loop {
        let event = timeout(EVENT_WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

fn ai_content(event: &BotEvent) -> Option<&str> {
    match event {
        BotEvent::AiResponse { message } => Some(message.content.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn delivers_each_interrupt_once_and_rejects_extra_input() {
    let script = vec![
        Message::assistant("1"),
        Message::assistant("So, what's up today?"),
    ];
    let (bot, _saver) = build_bot(script);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = SessionOrchestrator::with_settings(
        bot,
        "session-once",
        tx,
        Duration::from_secs(5),
        Duration::ZERO,
    );
    orchestrator.start(None).await.unwrap();

    let greeting = wait_for(&mut rx, |e| matches!(e, BotEvent::AiResponse { .. })).await;
    assert!(ai_content(&greeting).unwrap().starts_with("Hey! I'm Kotori"));

    assert!(orchestrator.send_user_message("beginner, daily chat").await);

    let mode = wait_for(&mut rx, |e| matches!(e, BotEvent::AiResponse { .. })).await;
    assert!(ai_content(&mode).unwrap().contains("Study mode"));

    // One reply per interrupt: the second send finds no pending interrupt.
    assert!(orchestrator.send_user_message("chat mode please").await);
    assert!(!orchestrator.send_user_message("and another thing").await);

    let opener = wait_for(&mut rx, |e| matches!(e, BotEvent::AiResponse { .. })).await;
    assert_eq!(ai_content(&opener), Some("So, what's up today?"));

    orchestrator.stop().await;
}

#[tokio::test]
async fn input_is_rejected_before_any_interrupt() {
    let (bot, _saver) = build_bot(vec![]);
    let (tx, _rx) = mpsc::unbounded_channel();
    let orchestrator = SessionOrchestrator::with_settings(
        bot,
        "session-early",
        tx,
        Duration::from_secs(5),
        Duration::ZERO,
    );

    // Not started, nothing pending: the reply must be rejected.
    assert!(!orchestrator.send_user_message("hello?").await);
}

#[tokio::test]
async fn reattach_resumes_without_replaying_the_greeting() {
    let script = vec![
        Message::assistant("1"),
        Message::assistant("So, what's up today?"),
    ];
    let (bot, _saver) = build_bot(script);

    // First attach: greeting is delivered, then the client goes away.
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let first = SessionOrchestrator::with_settings(
        bot.clone(),
        "session-reattach",
        tx_a,
        Duration::from_secs(5),
        Duration::ZERO,
    );
    first.start(None).await.unwrap();
    let greeting = wait_for(&mut rx_a, |e| matches!(e, BotEvent::AiResponse { .. })).await;
    assert!(ai_content(&greeting).unwrap().starts_with("Hey! I'm Kotori"));
    first.stop().await;

    // Reattach: no new greeting; the next reply resumes where it paused.
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let second = SessionOrchestrator::with_settings(
        bot,
        "session-reattach",
        tx_b,
        Duration::from_secs(5),
        Duration::ZERO,
    );
    second.start(None).await.unwrap();

    assert!(
        timeout(Duration::from_millis(300), rx_b.recv()).await.is_err(),
        "reattach must not emit events before user input"
    );
    assert!(second.is_waiting_for_input().await);

    assert!(second.send_user_message("beginner, daily chat").await);
    let next = wait_for(&mut rx_b, |e| matches!(e, BotEvent::AiResponse { .. })).await;
    assert!(ai_content(&next).unwrap().contains("Study mode"));

    second.stop().await;
}

#[tokio::test]
async fn resume_timeout_ends_the_conversation() {
    let (bot, _saver) = build_bot(vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = SessionOrchestrator::with_settings(
        bot,
        "session-timeout",
        tx,
        Duration::from_millis(100),
        Duration::ZERO,
    );
    orchestrator.start(None).await.unwrap();

    let _greeting = wait_for(&mut rx, |e| matches!(e, BotEvent::AiResponse { .. })).await;
    let end = wait_for(&mut rx, |e| matches!(e, BotEvent::ConversationEnd { .. })).await;
    match end {
        BotEvent::ConversationEnd { reason } => assert_eq!(reason, "timeout"),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn exit_keyword_stops_the_session() {
    let (bot, _saver) = build_bot(vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = SessionOrchestrator::with_settings(
        bot,
        "session-exit",
        tx,
        Duration::from_secs(5),
        Duration::ZERO,
    );
    orchestrator.start(None).await.unwrap();

    let _greeting = wait_for(&mut rx, |e| matches!(e, BotEvent::AiResponse { .. })).await;
    assert!(orchestrator.send_user_message("exit").await);

    let end = wait_for(&mut rx, |e| matches!(e, BotEvent::ConversationEnd { .. })).await;
    match end {
        BotEvent::ConversationEnd { reason } => assert_eq!(reason, "exit"),
        _ => unreachable!(),
    }
}
