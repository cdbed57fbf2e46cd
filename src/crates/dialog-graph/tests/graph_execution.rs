//! End-to-end tests of the graph runtime: routing, checkpointing, and the
//! interrupt/resume cycle.

use std::sync::Arc;

use futures::{pin_mut, StreamExt};
use serde::{Deserialize, Serialize};

use dialog_checkpoint::MemorySaver;
use dialog_graph::{
    CompiledGraph, GraphError, NodeKind, RunConfig, StateGraph, StreamChunk, END, START,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FlowState {
    log: Vec<String>,
    replies: Vec<String>,
    next: String,
}

/// A two-node interactive flow: `ask` suspends for input, `record` logs it.
fn interactive_graph() -> CompiledGraph<FlowState> {
    let mut graph = StateGraph::new();

    graph.add_node("ask", NodeKind::Interactive, |mut state: FlowState, mut ctx| {
        Box::pin(async move {
            state.log.push("ask:entered".to_string());
            let reply = ctx.interrupt("What would you like to practice?")?;
            state.replies.push(reply);
            state.next = "record".to_string();
            Ok(state)
        })
    });

    graph.add_node("record", NodeKind::Internal, |mut state: FlowState, _ctx| {
        Box::pin(async move {
            state.log.push("record:entered".to_string());
            state.next = END.to_string();
            Ok(state)
        })
    });

    graph.add_edge(START, "ask");
    graph.add_conditional_edges("ask", |state: &FlowState| state.next.clone(), vec!["record"]);
    graph.add_edge("record", END);

    graph
        .compile()
        .unwrap()
        .with_checkpointer(Arc::new(MemorySaver::new()))
}

async fn collect(
    stream: impl futures::Stream<Item = dialog_graph::Result<StreamChunk<FlowState>>>,
) -> Vec<StreamChunk<FlowState>> {
    pin_mut!(stream);
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.unwrap());
    }
    chunks
}

#[tokio::test]
async fn linear_graph_runs_to_end() {
    let mut graph = StateGraph::new();
    graph.add_node("double", NodeKind::Internal, |state: i64, _ctx| {
        Box::pin(async move { Ok(state * 2) })
    });
    graph.add_node("inc", NodeKind::Internal, |state: i64, _ctx| {
        Box::pin(async move { Ok(state + 1) })
    });
    graph.add_edge(START, "double");
    graph.add_edge("double", "inc");
    graph.add_edge("inc", END);

    let app = graph.compile().unwrap();
    let result = app.invoke(Some(5), &RunConfig::new("t")).await.unwrap();
    assert_eq!(result, 11);
}

#[tokio::test]
async fn conditional_routing_picks_declared_target() {
    let mut graph = StateGraph::new();
    graph.add_node("classify", NodeKind::Internal, |state: i64, _ctx| {
        Box::pin(async move { Ok(state) })
    });
    graph.add_node("positive", NodeKind::Internal, |state: i64, _ctx| {
        Box::pin(async move { Ok(state * 10) })
    });
    graph.add_node("negative", NodeKind::Internal, |state: i64, _ctx| {
        Box::pin(async move { Ok(-state) })
    });
    graph.add_edge(START, "classify");
    graph.add_conditional_edges(
        "classify",
        |state: &i64| {
            if *state > 0 {
                "positive".to_string()
            } else {
                "negative".to_string()
            }
        },
        vec!["positive", "negative"],
    );
    graph.add_edge("positive", END);
    graph.add_edge("negative", END);

    let app = graph.compile().unwrap();
    assert_eq!(app.invoke(Some(3), &RunConfig::new("a")).await.unwrap(), 30);
    assert_eq!(app.invoke(Some(-4), &RunConfig::new("b")).await.unwrap(), 4);
}

#[tokio::test]
async fn interrupt_suspends_and_resume_continues() {
    let app = interactive_graph();
    let config = RunConfig::new("session-1");

    // First drive: the ask node suspends with its prompt.
    let chunks = collect(app.stream(Some(FlowState::default()), &config)).await;
    assert_eq!(chunks.len(), 1);
    match &chunks[0] {
        StreamChunk::Interrupt { node, value } => {
            assert_eq!(node, "ask");
            assert_eq!(value, "What would you like to practice?");
        }
        other => panic!("expected interrupt, got {other:?}"),
    }
    assert_eq!(
        app.pending_interrupt("session-1").await.unwrap().as_deref(),
        Some("ask")
    );

    // Resume: ask re-executes with the reply staged, then record runs.
    let chunks = collect(app.stream_resume("daily chat", &config)).await;
    let nodes: Vec<&str> = chunks
        .iter()
        .map(|chunk| match chunk {
            StreamChunk::Node { node, .. } => node.as_str(),
            StreamChunk::Interrupt { node, .. } => node.as_str(),
        })
        .collect();
    assert_eq!(nodes, vec!["ask", "record"]);

    let state = app.get_state("session-1").await.unwrap().unwrap();
    assert_eq!(state.replies, vec!["daily chat"]);
    // The ask node re-executed exactly once with the reply visible.
    assert_eq!(state.log, vec!["ask:entered", "record:entered"]);
    assert!(app.pending_interrupt("session-1").await.unwrap().is_none());
}

#[tokio::test]
async fn streaming_again_without_resume_re_raises_the_interrupt() {
    let app = interactive_graph();
    let config = RunConfig::new("session-2");

    let first = collect(app.stream(Some(FlowState::default()), &config)).await;
    let second = collect(app.stream(None, &config)).await;

    // Both drives observe the same logical interrupt; de-duplication is the
    // orchestrator's job, not the runtime's.
    for chunks in [&first, &second] {
        assert_eq!(chunks.len(), 1);
        assert!(matches!(chunks[0], StreamChunk::Interrupt { .. }));
    }
}

#[tokio::test]
async fn checkpoint_wins_over_supplied_initial_state() {
    let app = interactive_graph();
    let config = RunConfig::new("session-3");

    let _ = collect(app.stream(Some(FlowState::default()), &config)).await;
    let _ = collect(app.stream_resume("first reply", &config)).await;

    // A later drive with a fresh initial state must not reset the thread.
    let poisoned = FlowState {
        log: vec!["poison".to_string()],
        ..FlowState::default()
    };
    let _ = collect(app.stream(Some(poisoned), &config)).await;

    let state = app.get_state("session-3").await.unwrap().unwrap();
    assert_eq!(state.replies, vec!["first reply"]);
    assert!(!state.log.contains(&"poison".to_string()));
}

#[tokio::test]
async fn missing_state_and_checkpoint_is_an_error() {
    let app = interactive_graph();
    let stream = app.stream(None, &RunConfig::new("fresh-thread"));
    pin_mut!(stream);
    match stream.next().await {
        Some(Err(GraphError::Execution(msg))) => assert!(msg.contains("no checkpoint")),
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn recursion_limit_stops_runaway_loops() {
    let mut graph = StateGraph::new();
    graph.add_node("spin", NodeKind::Internal, |state: i64, _ctx| {
        Box::pin(async move { Ok(state + 1) })
    });
    graph.add_edge(START, "spin");
    graph.add_conditional_edges("spin", |_state: &i64| "spin".to_string(), vec!["spin"]);

    let app = graph.compile().unwrap();
    let config = RunConfig::new("loop").with_recursion_limit(10);

    let stream = app.stream(Some(0), &config);
    pin_mut!(stream);
    let mut node_steps = 0;
    let mut limit_error = false;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(StreamChunk::Node { .. }) => node_steps += 1,
            Ok(StreamChunk::Interrupt { .. }) => panic!("unexpected interrupt"),
            Err(GraphError::Execution(msg)) => {
                assert!(msg.contains("Recursion limit"));
                limit_error = true;
                break;
            }
            Err(other) => panic!("unexpected error {other}"),
        }
    }
    assert_eq!(node_steps, 10);
    assert!(limit_error);
}

#[tokio::test]
async fn node_error_carries_node_context() {
    let mut graph = StateGraph::new();
    graph.add_node("boom", NodeKind::Internal, |_state: i64, _ctx| {
        Box::pin(async move { Err(GraphError::node_execution("boom", "model unreachable")) })
    });
    graph.add_edge(START, "boom");
    graph.add_edge("boom", END);

    let app = graph.compile().unwrap();
    let err = app.invoke(Some(0), &RunConfig::new("t")).await.unwrap_err();
    match err {
        GraphError::NodeExecution { node, error } => {
            assert_eq!(node, "boom");
            assert!(error.contains("unreachable"));
        }
        other => panic!("expected node execution error, got {other}"),
    }
}
