//! The compiled graph runtime: streaming execution, checkpointing, resume.
//!
//! Execution advances one node per step. After a completed step the produced
//! state is checkpointed together with the routed next node and emitted as a
//! [`StreamChunk::Node`]. When a node raises an interrupt, the *pre-node*
//! state is checkpointed with the node marked pending, the prompt is emitted
//! as a [`StreamChunk::Interrupt`], and the stream ends; a later
//! [`CompiledGraph::stream_resume`] re-executes that node with the user's
//! reply staged in its [`NodeContext`].

use std::sync::Arc;

use async_stream::try_stream;
use futures::{pin_mut, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use dialog_checkpoint::{Checkpoint, CheckpointSaver};

use crate::error::{GraphError, Result};
use crate::graph::{Graph, END};
use crate::interrupt::NodeContext;

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Thread (session) id; keys the checkpoint.
    pub thread_id: String,

    /// Maximum node steps per drive loop.
    pub recursion_limit: usize,
}

impl RunConfig {
    /// Create a config for a thread with the default recursion limit (100).
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            recursion_limit: 100,
        }
    }

    /// Override the recursion limit.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }
}

/// One event of a streaming run.
#[derive(Debug, Clone)]
pub enum StreamChunk<S> {
    /// A node completed; `state` is the state it produced.
    Node {
        /// Node that ran.
        node: String,
        /// State after the step.
        state: S,
    },

    /// A node suspended waiting for user input.
    Interrupt {
        /// Node that suspended.
        node: String,
        /// Prompt to surface to the user.
        value: String,
    },
}

/// A validated, runnable graph.
pub struct CompiledGraph<S> {
    graph: Arc<Graph<S>>,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
}

impl<S> CompiledGraph<S> {
    pub(crate) fn new(graph: Graph<S>) -> Self {
        Self {
            graph: Arc::new(graph),
            checkpointer: None,
        }
    }

    /// Attach a checkpoint saver. Without one, runs are single-shot and
    /// cannot be resumed.
    pub fn with_checkpointer(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = Some(saver);
        self
    }

    /// The underlying graph definition.
    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }
}

impl<S> CompiledGraph<S>
where
    S: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Stream graph steps for a thread.
    ///
    /// `input` seeds the state on the *first* run of a thread; once a
    /// checkpoint exists it is authoritative and `input` is ignored. With no
    /// checkpoint and no input the stream yields an error.
    pub fn stream(
        &self,
        input: Option<S>,
        config: &RunConfig,
    ) -> impl Stream<Item = Result<StreamChunk<S>>> + Send + 'static {
        self.drive(input, None, config)
    }

    /// Resume a thread suspended on an interrupt with the user's reply.
    pub fn stream_resume(
        &self,
        reply: impl Into<String>,
        config: &RunConfig,
    ) -> impl Stream<Item = Result<StreamChunk<S>>> + Send + 'static {
        self.drive(None, Some(reply.into()), config)
    }

    fn drive(
        &self,
        input: Option<S>,
        resume: Option<String>,
        config: &RunConfig,
    ) -> impl Stream<Item = Result<StreamChunk<S>>> + Send + 'static {
        let graph = Arc::clone(&self.graph);
        let saver = self.checkpointer.clone();
        let thread_id = config.thread_id.clone();
        let limit = config.recursion_limit;
        let mut resume = resume;

        try_stream! {
            let existing = match &saver {
                Some(saver) => saver.get(&thread_id).await?,
                None => None,
            };

            let (mut state, mut current, mut step): (S, String, u64) = match (existing, input) {
                (Some(checkpoint), supplied) => {
                    if supplied.is_some() {
                        tracing::debug!(
                            thread = %thread_id,
                            "thread already has a checkpoint; supplied initial state ignored"
                        );
                    }
                    let state = checkpoint.decode_state::<S>()?;
                    let current = checkpoint
                        .pending_interrupt
                        .clone()
                        .or_else(|| checkpoint.next_node.clone())
                        .unwrap_or_else(|| END.to_string());
                    (state, current, checkpoint.step)
                }
                (None, Some(initial)) => (initial, graph.entry().to_string(), 0),
                (None, None) => {
                    Err(GraphError::Execution(format!(
                        "Thread '{thread_id}' has no checkpoint and no initial state was provided"
                    )))?;
                    unreachable!()
                }
            };

            let mut steps_in_drive = 0usize;
            while current != END {
                steps_in_drive += 1;
                if steps_in_drive > limit {
                    Err(GraphError::Execution(format!(
                        "Recursion limit of {limit} node steps exceeded in thread '{thread_id}'"
                    )))?;
                }

                let node = match graph.node(&current) {
                    Some(node) => node,
                    None => {
                        Err(GraphError::Validation(format!(
                            "Unknown node '{current}' in thread '{thread_id}'"
                        )))?;
                        unreachable!()
                    }
                };

                let ctx = NodeContext::new(thread_id.clone(), current.clone(), resume.take());
                tracing::debug!(thread = %thread_id, node = %current, "executing node");

                match (node.executor)(state.clone(), ctx).await {
                    Ok(new_state) => {
                        let next = graph.route(&current, &new_state)?;
                        step += 1;
                        if let Some(saver) = &saver {
                            let checkpoint = Checkpoint::new(&thread_id, &new_state, step)?
                                .with_next_node(next.clone());
                            saver.put(checkpoint).await?;
                        }
                        state = new_state;
                        tracing::debug!(thread = %thread_id, node = %current, next = %next, "node completed");
                        yield StreamChunk::Node {
                            node: current.clone(),
                            state: state.clone(),
                        };
                        current = next;
                    }
                    Err(GraphError::Interrupted { node: _, value }) => {
                        // The node's partial writes are discarded: the
                        // checkpoint keeps the pre-node state and the node
                        // re-executes in full on resume.
                        step += 1;
                        if let Some(saver) = &saver {
                            let checkpoint = Checkpoint::new(&thread_id, &state, step)?
                                .with_pending_interrupt(current.clone());
                            saver.put(checkpoint).await?;
                        }
                        tracing::debug!(thread = %thread_id, node = %current, "node suspended on interrupt");
                        yield StreamChunk::Interrupt {
                            node: current.clone(),
                            value,
                        };
                        return;
                    }
                    Err(err) => {
                        Err(err)?;
                    }
                }
            }
        }
    }

    /// Run until the graph ends or suspends, returning the final state.
    ///
    /// An interrupt is returned as [`GraphError::Interrupted`]; callers that
    /// need to handle interrupts interactively should use [`Self::stream`].
    pub async fn invoke(&self, input: Option<S>, config: &RunConfig) -> Result<S> {
        let stream = self.stream(input, config);
        pin_mut!(stream);

        let mut last_state = None;
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Node { state, .. } => last_state = Some(state),
                StreamChunk::Interrupt { node, value } => {
                    return Err(GraphError::Interrupted { node, value });
                }
            }
        }

        last_state.ok_or_else(|| {
            GraphError::Execution("Graph produced no state before ending".to_string())
        })
    }

    /// Latest checkpointed state of a thread, if any.
    pub async fn get_state(&self, thread_id: &str) -> Result<Option<S>> {
        let Some(saver) = &self.checkpointer else {
            return Ok(None);
        };
        match saver.get(thread_id).await? {
            Some(checkpoint) => Ok(Some(checkpoint.decode_state::<S>()?)),
            None => Ok(None),
        }
    }

    /// Name of the node a thread is suspended on, if it is waiting for a
    /// user reply.
    pub async fn pending_interrupt(&self, thread_id: &str) -> Result<Option<String>> {
        let Some(saver) = &self.checkpointer else {
            return Ok(None);
        };
        Ok(saver
            .get(thread_id)
            .await?
            .and_then(|checkpoint| checkpoint.pending_interrupt))
    }

    /// Drop a thread's checkpoint entirely.
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        if let Some(saver) = &self.checkpointer {
            saver.delete_thread(thread_id).await?;
        }
        Ok(())
    }
}
