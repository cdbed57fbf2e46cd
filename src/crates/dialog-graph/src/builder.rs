//! Graph construction API.
//!
//! [`StateGraph`] collects nodes and edges, then [`StateGraph::compile`]
//! validates the shape and produces a runnable [`CompiledGraph`].

use std::collections::HashMap;

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::graph::{EdgeSpec, Graph, NodeFuture, NodeId, NodeKind, NodeSpec, END, START};
use crate::interrupt::NodeContext;

/// Builder for a dialog graph.
pub struct StateGraph<S> {
    nodes: HashMap<NodeId, NodeSpec<S>>,
    edges: HashMap<NodeId, EdgeSpec<S>>,
    entry: Option<NodeId>,
}

impl<S> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
        }
    }

    /// Register a node. Re-registering a name replaces the previous node.
    pub fn add_node<F>(&mut self, name: impl Into<String>, kind: NodeKind, executor: F) -> &mut Self
    where
        F: Fn(S, NodeContext) -> NodeFuture<S> + Send + Sync + 'static,
    {
        let name = name.into();
        self.nodes.insert(
            name.clone(),
            NodeSpec {
                name,
                kind,
                executor: std::sync::Arc::new(executor),
            },
        );
        self
    }

    /// Add an unconditional edge. An edge from [`START`] sets the entry
    /// point.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            self.entry = Some(to);
        } else {
            self.edges.insert(from, EdgeSpec::Direct { to });
        }
        self
    }

    /// Add a conditional edge set: after `from` completes, `router` picks one
    /// of `targets` (or [`END`]) based on the produced state.
    pub fn add_conditional_edges<R>(
        &mut self,
        from: impl Into<String>,
        router: R,
        targets: Vec<&str>,
    ) -> &mut Self
    where
        R: Fn(&S) -> String + Send + Sync + 'static,
    {
        self.edges.insert(
            from.into(),
            EdgeSpec::Conditional {
                router: std::sync::Arc::new(router),
                targets: targets.into_iter().map(String::from).collect(),
            },
        );
        self
    }

    /// Validate the graph and produce a runnable [`CompiledGraph`].
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        let entry = self
            .entry
            .ok_or_else(|| GraphError::Validation("No entry point: add an edge from START".to_string()))?;

        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::Validation(format!(
                "Entry point '{entry}' is not a registered node"
            )));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::Validation(format!(
                    "Edge source '{from}' is not a registered node"
                )));
            }
            match edge {
                EdgeSpec::Direct { to } => {
                    if to != END && !self.nodes.contains_key(to) {
                        return Err(GraphError::Validation(format!(
                            "Edge target '{to}' is not a registered node"
                        )));
                    }
                }
                EdgeSpec::Conditional { targets, .. } => {
                    if targets.is_empty() {
                        return Err(GraphError::Validation(format!(
                            "Conditional edge of '{from}' declares no targets"
                        )));
                    }
                    for target in targets {
                        if target != END && !self.nodes.contains_key(target) {
                            return Err(GraphError::Validation(format!(
                                "Conditional target '{target}' of '{from}' is not a registered node"
                            )));
                        }
                    }
                }
            }
        }

        Ok(CompiledGraph::new(Graph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(state: i32, _ctx: NodeContext) -> NodeFuture<i32> {
        Box::pin(async move { Ok(state) })
    }

    #[test]
    fn compile_requires_entry_point() {
        let mut graph: StateGraph<i32> = StateGraph::new();
        graph.add_node("a", NodeKind::Internal, noop);
        assert!(matches!(graph.compile(), Err(GraphError::Validation(_))));
    }

    #[test]
    fn compile_rejects_unknown_edge_target() {
        let mut graph: StateGraph<i32> = StateGraph::new();
        graph.add_node("a", NodeKind::Internal, noop);
        graph.add_edge(START, "a");
        graph.add_edge("a", "missing");
        assert!(matches!(graph.compile(), Err(GraphError::Validation(_))));
    }

    #[test]
    fn compile_rejects_undeclared_conditional_target() {
        let mut graph: StateGraph<i32> = StateGraph::new();
        graph.add_node("a", NodeKind::Internal, noop);
        graph.add_edge(START, "a");
        graph.add_conditional_edges("a", |_s| "ghost".to_string(), vec!["ghost"]);
        assert!(matches!(graph.compile(), Err(GraphError::Validation(_))));
    }

    #[test]
    fn compile_accepts_end_as_target() {
        let mut graph: StateGraph<i32> = StateGraph::new();
        graph.add_node("a", NodeKind::Internal, noop);
        graph.add_edge(START, "a");
        graph.add_edge("a", END);
        assert!(graph.compile().is_ok());
    }
}
