//! Low-level graph representation: nodes, edges, and routing.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{GraphError, Result};
use crate::interrupt::NodeContext;

/// Virtual source node; the edge out of it sets the entry point.
pub const START: &str = "__start__";

/// Terminal marker; routing to it ends the run.
pub const END: &str = "__end__";

/// Node identifier.
pub type NodeId = String;

/// Future returned by a node executor.
pub type NodeFuture<S> = BoxFuture<'static, Result<S>>;

/// Node executor function type.
pub type NodeExecutor<S> = Arc<dyn Fn(S, NodeContext) -> NodeFuture<S> + Send + Sync>;

/// Routing function of a conditional edge: picks the destination from the
/// state produced by the step.
pub type RouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// What a node is allowed to do, for introspection and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// May suspend to request user input.
    Interactive,
    /// Pure state transformation and model queries.
    Internal,
    /// Executes pending tool calls.
    Tools,
}

/// A registered node.
pub struct NodeSpec<S> {
    /// Node name.
    pub name: NodeId,
    /// Node kind.
    pub kind: NodeKind,
    /// Executor function.
    pub executor: NodeExecutor<S>,
}

impl<S> std::fmt::Debug for NodeSpec<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Outgoing edge of a node.
pub enum EdgeSpec<S> {
    /// Unconditional transition.
    Direct {
        /// Destination node.
        to: NodeId,
    },
    /// Routed transition: `router` picks one of `targets` (or [`END`]).
    Conditional {
        /// Routing function.
        router: RouterFn<S>,
        /// Destinations the router may legally pick.
        targets: Vec<NodeId>,
    },
}

impl<S> std::fmt::Debug for EdgeSpec<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeSpec::Direct { to } => f.debug_struct("Direct").field("to", to).finish(),
            EdgeSpec::Conditional { targets, .. } => f
                .debug_struct("Conditional")
                .field("targets", targets)
                .finish(),
        }
    }
}

/// A validated graph: nodes, one outgoing edge spec per node, and an entry
/// point. Built by [`StateGraph::compile`](crate::StateGraph::compile).
pub struct Graph<S> {
    pub(crate) nodes: HashMap<NodeId, NodeSpec<S>>,
    pub(crate) edges: HashMap<NodeId, EdgeSpec<S>>,
    pub(crate) entry: NodeId,
}

impl<S> Graph<S> {
    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeSpec<S>> {
        self.nodes.get(name)
    }

    /// The entry node.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Names of all registered nodes.
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    /// Pick the destination after `node` produced `state`.
    ///
    /// A node with no outgoing edge routes to [`END`]. A conditional router
    /// must return one of its declared targets or [`END`]; anything else is a
    /// validation error.
    pub fn route(&self, node: &str, state: &S) -> Result<NodeId> {
        match self.edges.get(node) {
            None => Ok(END.to_string()),
            Some(EdgeSpec::Direct { to }) => Ok(to.clone()),
            Some(EdgeSpec::Conditional { router, targets }) => {
                let dest = router(state);
                if dest == END || targets.iter().any(|t| *t == dest) {
                    Ok(dest)
                } else {
                    Err(GraphError::Validation(format!(
                        "Router of node '{}' returned undeclared target '{}' (declared: {})",
                        node,
                        dest,
                        targets.join(", ")
                    )))
                }
            }
        }
    }
}
