//! # dialog-graph - Suspendable state graphs for conversational sessions
//!
//! This crate is the execution core of the kotori tutor: a directed graph of
//! named async nodes driven one step at a time, with conditional routing
//! between steps and the ability to **suspend** mid-graph while waiting for
//! user input.
//!
//! ## Core concepts
//!
//! ### StateGraph
//!
//! [`StateGraph`] is the construction API. A graph is built from:
//! - **Nodes**: async functions from state to state, registered by name
//! - **Edges**: direct or conditional transitions; a conditional edge carries
//!   a routing function that picks one of its declared targets per step
//! - **Entry point**: the edge from [`START`]; execution ends at [`END`]
//!
//! Compilation validates the shape (entry present, every edge endpoint and
//! conditional target registered) and produces a [`CompiledGraph`].
//!
//! ### Interrupts
//!
//! An interactive node requests user input by calling
//! [`NodeContext::interrupt`] with the prompt it wants shown. If a reply is
//! already staged (the thread is being resumed), the call returns it and the
//! node keeps running; otherwise the call raises
//! [`GraphError::Interrupted`], which the runtime catches: it checkpoints the
//! pre-node state, emits the prompt as a [`StreamChunk::Interrupt`], and ends
//! the stream. Resuming with [`CompiledGraph::stream_resume`] re-executes the
//! interrupted node from the checkpointed state with the reply staged, so the
//! node's writes land exactly once.
//!
//! ### Checkpointing
//!
//! When compiled with a [`dialog_checkpoint::CheckpointSaver`], the runtime
//! writes the thread's state at every node boundary. A later `stream(None)`
//! or `stream_resume` call continues from the stored position; an explicit
//! initial state is honored only on the first run of a thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut graph = StateGraph::new();
//! graph.add_node("ask", NodeKind::Interactive, |mut state: Demo, mut ctx| {
//!     Box::pin(async move {
//!         let reply = ctx.interrupt("What next?")?;
//!         state.last_reply = reply;
//!         Ok(state)
//!     })
//! });
//! graph.add_edge(START, "ask");
//! graph.add_edge("ask", END);
//!
//! let app = graph.compile()?.with_checkpointer(Arc::new(MemorySaver::new()));
//! ```
//!
//! The [`llm`] module defines the [`ChatModel`](llm::ChatModel) trait nodes
//! use to talk to a language model, and [`tool`] the registry of callable
//! tools the model may invoke; both are traits/types only - concrete clients
//! live in their own crates.

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod interrupt;
pub mod llm;
pub mod messages;
pub mod tool;

pub use builder::StateGraph;
pub use compiled::{CompiledGraph, RunConfig, StreamChunk};
pub use error::{GraphError, Result};
pub use graph::{EdgeSpec, Graph, NodeExecutor, NodeFuture, NodeId, NodeKind, NodeSpec, RouterFn, END, START};
pub use interrupt::NodeContext;
pub use messages::{has_pending_tool_calls, Message, MessageRole};
pub use tool::{Tool, ToolCall, ToolCallResult, ToolError, ToolExecutor, ToolOutput, ToolRegistry};
