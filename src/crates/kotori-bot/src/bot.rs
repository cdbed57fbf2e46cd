//! Graph assembly: the tutor's nodes, edges, and routing.

use std::sync::Arc;

use anki::{build_tool_registry, AnkiClient};
use dialog_checkpoint::CheckpointSaver;
use dialog_graph::llm::{ChatModel, ChatRequest};
use dialog_graph::{
    has_pending_tool_calls, CompiledGraph, GraphError, Message, NodeKind, Result, StateGraph,
    ToolRegistry, END, START,
};

use crate::config::TutorConfig;
use crate::grading;
use crate::prompts;
use crate::state::TutorState;

/// Nodes the tools node may route back to; anything else falls back to the
/// mode-selection prompt.
const TOOL_RETURN_NODES: [&str; 4] = [
    "conversation",
    "assessment",
    "mode_selection",
    "free_conversation",
];

/// The tutor: a compiled conversation graph plus its session config.
pub struct KotoriBot {
    app: CompiledGraph<TutorState>,
    config: TutorConfig,
}

impl KotoriBot {
    /// Build and compile the conversation graph.
    pub fn new(
        model: Arc<dyn ChatModel>,
        anki_client: Arc<AnkiClient>,
        config: TutorConfig,
        checkpointer: Arc<dyn CheckpointSaver>,
    ) -> Result<Self> {
        config.validate().map_err(GraphError::Validation)?;

        let registry = Arc::new(build_tool_registry(Arc::clone(&anki_client)));
        let mut graph = StateGraph::new();

        // greeting (interactive): emit the locale greeting, capture
        // level/goals.
        {
            let config = config.clone();
            graph.add_node("greeting", NodeKind::Interactive, move |mut state: TutorState, mut ctx| {
                let config = config.clone();
                Box::pin(async move {
                    if state.messages.is_empty() {
                        let prompt = prompts::greeting_text(config.language);
                        let reply = ctx.interrupt(prompt.clone())?;
                        state.messages.push(Message::assistant(prompt));
                        state.messages.push(Message::human(reply.clone()));
                        state.learning_goals = reply;
                    }
                    state.next = "mode_selection_prompt".to_string();
                    Ok(state)
                })
            });
        }

        // mode_selection_prompt (interactive): ask study vs chat.
        {
            let config = config.clone();
            graph.add_node(
                "mode_selection_prompt",
                NodeKind::Interactive,
                move |mut state: TutorState, mut ctx| {
                    let config = config.clone();
                    Box::pin(async move {
                        let prompt = prompts::mode_selection_text(config.language);
                        let reply = ctx.interrupt(prompt.clone())?;
                        state.messages.push(Message::assistant(prompt));
                        state.messages.push(Message::human(reply));
                        state.next = "mode_selection".to_string();
                        Ok(state)
                    })
                },
            );
        }

        // mode_selection (internal): 2-way classification over the last
        // round messages.
        {
            let model = Arc::clone(&model);
            let config = config.clone();
            graph.add_node("mode_selection", NodeKind::Internal, move |mut state: TutorState, _ctx| {
                let model = Arc::clone(&model);
                let config = config.clone();
                Box::pin(async move {
                    let decision = classify(
                        &model,
                        config.temperature,
                        prompts::mode_classifier_prompt(),
                        prompts::classifier_user_input(&state.render_recent(6)),
                    )
                    .await?;

                    state.reset_learning_state();
                    state.next = if decision.contains('1') {
                        "free_conversation".to_string()
                    } else {
                        "retrieve_cards".to_string()
                    };
                    tracing::debug!(decision = %decision, next = %state.next, "mode selected");
                    Ok(state)
                })
            });
        }

        // retrieve_cards (internal): one candidate card, or fall back to
        // free conversation.
        {
            let anki_client = Arc::clone(&anki_client);
            let config = config.clone();
            graph.add_node("retrieve_cards", NodeKind::Internal, move |mut state: TutorState, _ctx| {
                let anki_client = Arc::clone(&anki_client);
                let config = config.clone();
                Box::pin(async move {
                    // One card at a time keeps the round focused.
                    match anki_client.find_cards_for_study(Some(&config.deck_name), 1).await {
                        Ok(text) if text.contains("Error") || text.contains("No cards found") => {
                            tracing::debug!("no usable cards, switching to free conversation");
                            state.next = "free_conversation".to_string();
                        }
                        Ok(text) => {
                            state.active_card = text;
                            state.next = "conversation".to_string();
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "card retrieval failed, falling back to free conversation");
                            state.next = "free_conversation".to_string();
                        }
                    }
                    Ok(state)
                })
            });
        }

        // conversation (interactive, tool-capable): guided dialogue anchored
        // on the active card.
        {
            let model = Arc::clone(&model);
            let registry = Arc::clone(&registry);
            let config = config.clone();
            graph.add_node("conversation", NodeKind::Interactive, move |mut state: TutorState, mut ctx| {
                let model = Arc::clone(&model);
                let registry = Arc::clone(&registry);
                let config = config.clone();
                Box::pin(async move {
                    state.calling_node = "conversation".to_string();

                    let system = prompts::conversation_system_prompt(
                        config.language,
                        &state.active_card,
                        &state.learning_goals,
                    );
                    let mut request_messages = vec![Message::system(system)];
                    request_messages.extend(state.recent_messages(10).iter().cloned());

                    let request = ChatRequest::new(request_messages)
                        .with_temperature(config.temperature)
                        .with_tools(registry.definitions_for(&["add_flashcard", "check_service"]));
                    let response = model.chat(request).await?;

                    let content = response.message.content.clone();
                    state.messages.push(response.message);

                    if has_pending_tool_calls(&state.messages) {
                        state.next = "tools".to_string();
                        return Ok(state);
                    }

                    let reply = ctx.interrupt(content)?;
                    state.messages.push(Message::human(reply));
                    state.next = "assessment".to_string();
                    Ok(state)
                })
            });
        }

        // assessment (internal): route among continue/switch/free-talk;
        // produce the rubric assessment and grade the card when leaving the
        // round.
        {
            let model = Arc::clone(&model);
            let anki_client = Arc::clone(&anki_client);
            let config = config.clone();
            graph.add_node("assessment", NodeKind::Internal, move |mut state: TutorState, _ctx| {
                let model = Arc::clone(&model);
                let anki_client = Arc::clone(&anki_client);
                let config = config.clone();
                Box::pin(async move {
                    let round_count = state.round_len();
                    let decision = classify(
                        &model,
                        config.temperature,
                        prompts::assessment_router_prompt(config.language, &state.active_card, round_count),
                        prompts::classifier_user_input(&state.render_recent(10)),
                    )
                    .await?;

                    let leaving_round = decision.contains('1') || decision.contains('2');
                    if leaving_round && round_count > 0 && !state.active_card.is_empty() {
                        let assessment = classify(
                            &model,
                            config.temperature,
                            prompts::assessment_rubric_prompt(config.language, &state.active_card),
                            prompts::assessment_user_input(&state.render_recent(round_count.min(10))),
                        )
                        .await?;
                        state.assessment_history.push(assessment.clone());
                        state.need_card_answer = true;
                        grading::grade_active_card(&anki_client, &mut state, &assessment).await;
                        state.need_card_answer = false;
                    }

                    if decision.contains('1') {
                        state.reset_learning_state();
                        state.next = "free_conversation".to_string();
                    } else if decision.contains('2') {
                        state.reset_learning_state();
                        state.next = "retrieve_cards".to_string();
                    } else {
                        state.next = "conversation".to_string();
                    }
                    tracing::debug!(decision = %decision, next = %state.next, "assessment routed");
                    Ok(state)
                })
            });
        }

        // free_conversation (interactive, tool-capable): casual chat, no
        // unsolicited corrections.
        {
            let model = Arc::clone(&model);
            let registry = Arc::clone(&registry);
            let config = config.clone();
            graph.add_node("free_conversation", NodeKind::Interactive, move |mut state: TutorState, mut ctx| {
                let model = Arc::clone(&model);
                let registry = Arc::clone(&registry);
                let config = config.clone();
                Box::pin(async move {
                    state.calling_node = "free_conversation".to_string();

                    let system = prompts::free_conversation_system_prompt(config.language, &state.learning_goals);
                    let mut request_messages = vec![Message::system(system)];
                    request_messages.extend(state.messages.iter().cloned());

                    let request = ChatRequest::new(request_messages)
                        .with_temperature(config.temperature)
                        .with_tools(registry.definitions_for(&["add_flashcard", "check_service"]));
                    let response = model.chat(request).await?;

                    let content = response.message.content.clone();
                    state.messages.push(response.message);

                    if has_pending_tool_calls(&state.messages) {
                        state.next = "tools".to_string();
                        return Ok(state);
                    }

                    let reply = ctx.interrupt(content)?;
                    state.messages.push(Message::human(reply));
                    state.counter += 1;
                    state.next = "free_conversation_eval".to_string();
                    Ok(state)
                })
            });
        }

        // free_conversation_eval (internal): keep chatting (with optional
        // naturalness feedback) or switch to card study.
        {
            let model = Arc::clone(&model);
            let config = config.clone();
            graph.add_node("free_conversation_eval", NodeKind::Internal, move |mut state: TutorState, _ctx| {
                let model = Arc::clone(&model);
                let config = config.clone();
                Box::pin(async move {
                    let Some(last_human) = state.last_human_message().cloned() else {
                        state.next = "mode_selection_prompt".to_string();
                        return Ok(state);
                    };

                    let decision = classify(
                        &model,
                        config.temperature,
                        prompts::free_eval_router_prompt(config.language, &state.learning_goals),
                        prompts::classifier_user_input(&state.render_recent(10)),
                    )
                    .await?;

                    if decision.contains('1') {
                        state.reset_learning_state();
                        state.next = "retrieve_cards".to_string();
                        return Ok(state);
                    }

                    let feedback = classify(
                        &model,
                        config.temperature,
                        prompts::naturalness_prompt(config.language, &state.learning_goals),
                        prompts::naturalness_user_input(&state.render_recent(10), &last_human.content),
                    )
                    .await?;

                    if !feedback.to_lowercase().contains("no_assessment") {
                        let excerpt: String = last_human.content.chars().take(30).collect();
                        state
                            .assessment_history
                            .push(format!("Free Conversation Assessment - {excerpt}...: {feedback}"));
                    }
                    state.next = "free_conversation".to_string();
                    Ok(state)
                })
            });
        }

        // tools: execute pending tool calls, append their results.
        {
            let registry = Arc::clone(&registry);
            graph.add_node("tools", NodeKind::Tools, move |mut state: TutorState, _ctx| {
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    let calls = state
                        .messages
                        .last()
                        .and_then(|msg| msg.tool_calls.clone())
                        .unwrap_or_default();

                    let results = run_tool_calls(&registry, &calls).await;
                    for result in results {
                        state.messages.push(
                            Message::tool(result.content().to_string(), result.id.clone())
                                .with_name(result.name.clone()),
                        );
                    }
                    Ok(state)
                })
            });
        }

        graph.add_edge(START, "greeting");
        graph.add_conditional_edges("greeting", Self::route_next, vec!["mode_selection_prompt", "greeting"]);
        graph.add_conditional_edges("mode_selection_prompt", Self::route_next, vec!["mode_selection"]);
        graph.add_conditional_edges(
            "mode_selection",
            Self::route_next,
            vec!["retrieve_cards", "free_conversation"],
        );
        graph.add_conditional_edges(
            "retrieve_cards",
            Self::route_next,
            vec!["conversation", "free_conversation"],
        );
        graph.add_conditional_edges(
            "conversation",
            Self::route_next,
            vec!["assessment", "conversation", "mode_selection_prompt", "tools"],
        );
        graph.add_conditional_edges(
            "free_conversation",
            Self::route_next,
            vec!["free_conversation_eval", "tools"],
        );
        graph.add_conditional_edges(
            "assessment",
            Self::route_next,
            vec!["conversation", "free_conversation", "retrieve_cards"],
        );
        graph.add_conditional_edges(
            "free_conversation_eval",
            Self::route_next,
            vec!["mode_selection_prompt", "free_conversation", "retrieve_cards"],
        );
        graph.add_conditional_edges(
            "tools",
            Self::route_after_tools,
            vec![
                "conversation",
                "assessment",
                "mode_selection",
                "free_conversation",
                "mode_selection_prompt",
            ],
        );

        let app = graph.compile()?.with_checkpointer(checkpointer);
        Ok(Self { app, config })
    }

    /// The compiled graph.
    pub fn app(&self) -> &CompiledGraph<TutorState> {
        &self.app
    }

    /// This session's configuration.
    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    /// Standard post-node routing: pending tool calls go to the tools node,
    /// otherwise follow `state.next` (empty means terminal).
    pub fn route_next(state: &TutorState) -> String {
        if has_pending_tool_calls(&state.messages) {
            return "tools".to_string();
        }
        if state.next.is_empty() {
            END.to_string()
        } else {
            state.next.clone()
        }
    }

    /// Post-tools routing: return to the recorded calling node, or fall back
    /// to the mode-selection prompt.
    pub fn route_after_tools(state: &TutorState) -> String {
        if TOOL_RETURN_NODES.contains(&state.calling_node.as_str()) {
            state.calling_node.clone()
        } else {
            "mode_selection_prompt".to_string()
        }
    }
}

async fn classify(
    model: &Arc<dyn ChatModel>,
    temperature: f32,
    system: String,
    user: String,
) -> Result<String> {
    let request = ChatRequest::new(vec![Message::system(system), Message::human(user)])
        .with_temperature(temperature);
    let response = model.chat(request).await?;
    Ok(response.message.content.trim().to_string())
}

async fn run_tool_calls(
    registry: &ToolRegistry,
    calls: &[dialog_graph::ToolCall],
) -> Vec<dialog_graph::ToolCallResult> {
    if calls.is_empty() {
        return Vec::new();
    }
    registry.execute_tool_calls(calls).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::init_tutor_state;
    use dialog_graph::ToolCall;
    use serde_json::json;

    #[test]
    fn route_next_prefers_pending_tool_calls() {
        let mut state = init_tutor_state();
        state.next = "assessment".to_string();
        state.messages.push(Message::assistant("").with_tool_calls(vec![ToolCall {
            id: "call_1".into(),
            name: "add_flashcard".into(),
            args: json!({}),
        }]));
        assert_eq!(KotoriBot::route_next(&state), "tools");
    }

    #[test]
    fn route_next_follows_state_next() {
        let mut state = init_tutor_state();
        state.next = "assessment".to_string();
        state.messages.push(Message::assistant("plain reply"));
        assert_eq!(KotoriBot::route_next(&state), "assessment");
    }

    #[test]
    fn route_next_empty_is_terminal() {
        let state = init_tutor_state();
        assert_eq!(KotoriBot::route_next(&state), END);
    }

    #[test]
    fn route_after_tools_returns_to_calling_node() {
        let mut state = init_tutor_state();
        state.calling_node = "free_conversation".to_string();
        assert_eq!(KotoriBot::route_after_tools(&state), "free_conversation");
    }

    #[test]
    fn route_after_tools_falls_back_on_unknown_caller() {
        let mut state = init_tutor_state();
        state.calling_node = "greeting".to_string();
        assert_eq!(KotoriBot::route_after_tools(&state), "mode_selection_prompt");
        state.calling_node.clear();
        assert_eq!(KotoriBot::route_after_tools(&state), "mode_selection_prompt");
    }
}
