//! The per-session orchestrator.
//!
//! One orchestrator drives one session: it streams graph steps, converts
//! accepted interrupts into [`BotEvent::AiResponse`] events, awaits the next
//! user reply on a depth-1 input queue, and resumes the graph with it.
//!
//! Correctness properties enforced here:
//! - every accepted interrupt is followed by exactly one consumed resume
//!   before the next interrupt can be accepted (the filter's waiting flag
//!   plus the bounded queue);
//! - duplicate observations of the same logical interrupt reach the push
//!   channel at most once (the [`InterruptFilter`]);
//! - a reply sent while no interrupt is pending is rejected, not queued;
//! - node failures are retried from the last checkpoint after a short
//!   backoff unless they are fatal to the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{pin_mut, Stream, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;

use dialog_graph::{GraphError, MessageRole, RunConfig, StreamChunk, END};

use crate::bot::KotoriBot;
use crate::dedup::InterruptFilter;
use crate::events::{
    AssessmentMetrics, BotEvent, MessageKind, OutboundMessage, StateInfo, ToolCallInfo,
};
use crate::state::{init_tutor_state, TutorState};

/// Default time to wait for a user reply before ending the conversation.
pub const DEFAULT_RESUME_TIMEOUT: Duration = Duration::from_secs(300);

enum Outcome {
    Interrupted,
    Ended(String),
    Failed(GraphError),
    Stopped,
}

/// State shared between the orchestrator handle and its drive-loop task.
struct Shared {
    session_id: String,
    bot: Arc<KotoriBot>,
    events: mpsc::UnboundedSender<BotEvent>,
    filter: Mutex<InterruptFilter>,
    active: AtomicBool,
    shutdown: Notify,
    resume_timeout: Duration,
}

/// Drives a single session's graph execution.
pub struct SessionOrchestrator {
    shared: Arc<Shared>,
    input_tx: mpsc::Sender<String>,
    input_rx: Mutex<Option<mpsc::Receiver<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionOrchestrator {
    /// Create an orchestrator for a session. Events flow to `events` in
    /// node-boundary order.
    pub fn new(
        bot: Arc<KotoriBot>,
        session_id: impl Into<String>,
        events: mpsc::UnboundedSender<BotEvent>,
    ) -> Arc<Self> {
        Self::with_resume_timeout(bot, session_id, events, DEFAULT_RESUME_TIMEOUT)
    }

    /// Create an orchestrator with a custom resume timeout.
    pub fn with_resume_timeout(
        bot: Arc<KotoriBot>,
        session_id: impl Into<String>,
        events: mpsc::UnboundedSender<BotEvent>,
        resume_timeout: Duration,
    ) -> Arc<Self> {
        Self::with_settings(bot, session_id, events, resume_timeout, Duration::from_millis(500))
    }

    /// Create an orchestrator with custom timeouts. `interrupt_cooldown` is
    /// the duplicate filter's minimum spacing between accepted interrupts.
    pub fn with_settings(
        bot: Arc<KotoriBot>,
        session_id: impl Into<String>,
        events: mpsc::UnboundedSender<BotEvent>,
        resume_timeout: Duration,
        interrupt_cooldown: Duration,
    ) -> Arc<Self> {
        let (input_tx, input_rx) = mpsc::channel(1);
        Arc::new(Self {
            shared: Arc::new(Shared {
                session_id: session_id.into(),
                bot,
                events,
                filter: Mutex::new(InterruptFilter::with_cooldown(interrupt_cooldown)),
                active: AtomicBool::new(false),
                shutdown: Notify::new(),
                resume_timeout,
            }),
            input_tx,
            input_rx: Mutex::new(Some(input_rx)),
            task: Mutex::new(None),
        })
    }

    /// The session this orchestrator drives.
    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Whether the drive loop is running.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Whether the session is waiting for a user reply.
    pub async fn is_waiting_for_input(&self) -> bool {
        self.shared.filter.lock().await.is_waiting()
    }

    /// Start the drive loop.
    ///
    /// `initial_state` seeds a brand-new thread; a thread with an existing
    /// checkpoint resumes from it instead. If the thread is suspended on an
    /// already-delivered interrupt (a reattach), no new `ai_response` is
    /// emitted - the loop waits directly for the user's reply.
    pub async fn start(&self, initial_state: Option<TutorState>) -> Result<(), GraphError> {
        let receiver = self
            .input_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| GraphError::Execution("orchestrator already started".to_string()))?;

        let shared = Arc::clone(&self.shared);
        let pending = shared.bot.app().pending_interrupt(&shared.session_id).await?;
        let has_checkpoint = shared.bot.app().get_state(&shared.session_id).await?.is_some();

        let start_in_resume = pending.is_some();
        if start_in_resume {
            // The interrupt was delivered before the reattach; do not emit it
            // again, just wait for the reply.
            shared.filter.lock().await.set_waiting();
            tracing::info!(session = %shared.session_id, node = ?pending, "reattached to suspended session");
        }

        let initial = if has_checkpoint {
            None
        } else {
            Some(initial_state.unwrap_or_else(init_tutor_state))
        };

        shared.active.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(async move {
            shared.drive_loop(receiver, initial, start_in_resume).await;
            shared.active.store(false, Ordering::SeqCst);
        });
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Offer a user reply to the session.
    ///
    /// Returns `false` when no interrupt is pending or the (depth-1) input
    /// queue is full; the message is not stored in either case.
    pub async fn send_user_message(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        let mut filter = self.shared.filter.lock().await;
        if !filter.is_waiting() {
            tracing::debug!(session = %self.shared.session_id, "reply rejected: no interrupt pending");
            return false;
        }
        if self.input_tx.try_send(text.clone()).is_err() {
            tracing::debug!(session = %self.shared.session_id, "reply rejected: input queue full");
            return false;
        }
        filter.mark_answered();
        drop(filter);

        self.shared.emit(BotEvent::UserMessage {
            message: OutboundMessage::new(MessageKind::User, text),
        });
        true
    }

    /// Stop the drive loop at its next boundary and drain pending input.
    pub async fn stop(&self) {
        self.shared.active.store(false, Ordering::SeqCst);
        self.shared.shutdown.notify_waiters();
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }

    /// Latest checkpointed state of this session.
    pub async fn current_state(&self) -> Result<Option<TutorState>, GraphError> {
        self.shared.bot.app().get_state(&self.shared.session_id).await
    }
}

impl Shared {
    async fn drive_loop(
        &self,
        mut input: mpsc::Receiver<String>,
        mut initial: Option<TutorState>,
        mut resume_mode: bool,
    ) {
        let config = RunConfig::new(self.session_id.clone());
        let mut consecutive_failures = 0u32;

        while self.active.load(Ordering::SeqCst) {
            if !resume_mode {
                let outcome = {
                    let stream = self.bot.app().stream(initial.take(), &config);
                    self.consume_stream(stream).await
                };
                match outcome {
                    Outcome::Interrupted => {
                        resume_mode = true;
                        consecutive_failures = 0;
                    }
                    Outcome::Ended(reason) => {
                        self.emit(BotEvent::ConversationEnd { reason });
                        break;
                    }
                    Outcome::Failed(err) => {
                        if !self.handle_failure(&err, &mut consecutive_failures).await {
                            break;
                        }
                    }
                    Outcome::Stopped => break,
                }
            } else {
                tokio::select! {
                    _ = self.shutdown.notified() => break,
                    received = tokio::time::timeout(self.resume_timeout, input.recv()) => {
                        match received {
                            Err(_elapsed) => {
                                tracing::info!(session = %self.session_id, "resume wait timed out");
                                self.emit(BotEvent::ConversationEnd { reason: "timeout".to_string() });
                                break;
                            }
                            Ok(None) => break,
                            Ok(Some(text)) => {
                                let trimmed = text.trim().to_lowercase();
                                if trimmed == "exit" || trimmed == "quit" {
                                    self.emit(BotEvent::ConversationEnd { reason: "exit".to_string() });
                                    break;
                                }
                                let outcome = {
                                    let stream = self.bot.app().stream_resume(text, &config);
                                    self.consume_stream(stream).await
                                };
                                match outcome {
                                    Outcome::Interrupted => {
                                        resume_mode = true;
                                        consecutive_failures = 0;
                                    }
                                    Outcome::Ended(reason) => {
                                        self.emit(BotEvent::ConversationEnd { reason });
                                        break;
                                    }
                                    Outcome::Failed(err) => {
                                        // Retry from the checkpoint; the thread
                                        // is still suspended there.
                                        resume_mode = false;
                                        if !self.handle_failure(&err, &mut consecutive_failures).await {
                                            break;
                                        }
                                    }
                                    Outcome::Stopped => break,
                                }
                            }
                        }
                    }
                }
            }
        }

        tracing::debug!(session = %self.session_id, "drive loop exited");
    }

    /// Emit the error; decide whether the loop may continue. Fatal errors
    /// and repeated failures end the conversation.
    async fn handle_failure(&self, err: &GraphError, consecutive_failures: &mut u32) -> bool {
        tracing::warn!(session = %self.session_id, error = %err, "graph execution failed");
        self.emit(BotEvent::Error {
            message: err.to_string(),
        });

        let fatal = matches!(
            err,
            GraphError::Checkpoint(_)
                | GraphError::Serialization(_)
                | GraphError::State(_)
                | GraphError::Validation(_)
        );
        if fatal || *consecutive_failures >= 2 {
            self.emit(BotEvent::ConversationEnd {
                reason: "error".to_string(),
            });
            return false;
        }

        *consecutive_failures += 1;
        tokio::time::sleep(Duration::from_secs(1)).await;
        true
    }

    async fn consume_stream(
        &self,
        stream: impl Stream<Item = Result<StreamChunk<TutorState>, GraphError>>,
    ) -> Outcome {
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            if !self.active.load(Ordering::SeqCst) {
                return Outcome::Stopped;
            }
            match chunk {
                Ok(StreamChunk::Interrupt { node, value }) => {
                    self.handle_interrupt(&node, value).await;
                    return Outcome::Interrupted;
                }
                Ok(StreamChunk::Node { node, state }) => {
                    self.handle_state_update(&node, &state).await;
                    if KotoriBot::route_next(&state) == END {
                        return Outcome::Ended("completed".to_string());
                    }
                }
                Err(err) => return Outcome::Failed(err),
            }
        }
        Outcome::Ended("completed".to_string())
    }

    async fn handle_interrupt(&self, node: &str, value: String) {
        let mut filter = self.filter.lock().await;
        match filter.try_accept(&value) {
            Ok(()) => {
                drop(filter);
                tracing::info!(session = %self.session_id, node, "interrupt accepted");
                self.emit(BotEvent::AiResponse {
                    message: OutboundMessage::new(MessageKind::Ai, value),
                });
            }
            Err(reason) => {
                tracing::debug!(session = %self.session_id, node, ?reason, "interrupt suppressed");
            }
        }
    }

    async fn handle_state_update(&self, node: &str, state: &TutorState) {
        self.emit(BotEvent::StateChange {
            state: StateInfo {
                current_node: node.to_string(),
                next_node: if state.next.is_empty() {
                    None
                } else {
                    Some(state.next.clone())
                },
                learning_goals: state.learning_goals.clone(),
                active_card: state.active_card.clone(),
                assessment_history: state.assessment_history.clone(),
                counter: state.counter,
            },
        });

        let mut extracted: Vec<ToolCallInfo> = Vec::new();
        if let Some(last) = state.messages.last() {
            if last.role == MessageRole::Tool {
                extracted.push(ToolCallInfo {
                    tool_name: last.name.clone().unwrap_or_else(|| "unknown_tool".to_string()),
                    parameters: json!({}),
                    status: "success".to_string(),
                    result: Some(last.content.clone()),
                });
            } else if let Some(calls) = &last.tool_calls {
                for call in calls {
                    extracted.push(ToolCallInfo {
                        tool_name: call.name.clone(),
                        parameters: call.args.clone(),
                        status: "pending".to_string(),
                        result: None,
                    });
                }
            }
        }

        if !extracted.is_empty() {
            for tool in &extracted {
                self.emit(BotEvent::ToolCall { tool: tool.clone() });
            }

            let summary = extracted
                .iter()
                .map(|tool| format!("{} ({})", tool.tool_name, tool.status))
                .collect::<Vec<_>>()
                .join(", ");
            let completed = extracted.iter().filter(|t| t.status == "success").count();
            let metadata = json!({
                "tool_count": extracted.len(),
                "tool_names": extracted.iter().map(|t| t.tool_name.clone()).collect::<Vec<_>>(),
                "completed_count": completed,
                "pending_count": extracted.len() - completed,
            });
            self.emit(BotEvent::ToolMessage {
                message: OutboundMessage::new(
                    MessageKind::Tool,
                    format!("Tool calls processed: {summary}"),
                )
                .with_tool_calls(extracted)
                .with_metadata(metadata),
            });
        }

        if node == "assessment" {
            if let Some(latest) = state.assessment_history.last() {
                self.emit(BotEvent::AssessmentUpdate {
                    metrics: AssessmentMetrics::parse(latest),
                });
            }
        }
    }

    fn emit(&self, event: BotEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.events.send(event);
    }
}
