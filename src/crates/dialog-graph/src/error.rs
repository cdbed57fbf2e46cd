//! Error types for graph construction and execution.
//!
//! All variants implement `std::error::Error` via `thiserror`. The one
//! variant that is *not* a failure is [`GraphError::Interrupted`]: it is the
//! control-flow signal an interactive node raises to suspend execution, and
//! the runtime catches it before it ever reaches application code.

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur during graph construction, validation, and
/// execution.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph structure validation failed (missing entry, unknown edge
    /// endpoint, undeclared conditional target, ...).
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// A node's executor returned an error.
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed.
        node: String,
        /// Error message from node execution.
        error: String,
    },

    /// Execution failed outside any specific node (recursion cap, missing
    /// initial state, ...).
    #[error("Execution failed: {0}")]
    Execution(String),

    /// An interactive node suspended to wait for user input.
    ///
    /// This is a workflow pause, not a failure: the runtime checkpoints the
    /// thread and surfaces `value` as the assistant's prompt.
    #[error("Graph execution interrupted at node '{node}'")]
    Interrupted {
        /// Node that raised the interrupt.
        node: String,
        /// Prompt to surface to the user.
        value: String,
    },

    /// State could not be applied or decoded.
    #[error("State error: {0}")]
    State(String),

    /// Checkpoint persistence failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] dialog_checkpoint::CheckpointError),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation exceeded its time limit.
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Timeout duration in milliseconds.
        duration_ms: u64,
    },

    /// Application-defined error.
    #[error("{0}")]
    Custom(String),
}

impl GraphError {
    /// Create a node execution error with context.
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }

    /// Create an interrupt signal for the given node and prompt.
    pub fn interrupted(node: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Interrupted {
            node: node.into(),
            value: value.into(),
        }
    }

    /// Whether this error is the interrupt control-flow signal rather than a
    /// real failure.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_execution_formats_with_context() {
        let err = GraphError::node_execution("mode_selection", "model unreachable");
        assert_eq!(
            err.to_string(),
            "Node 'mode_selection' execution failed: model unreachable"
        );
    }

    #[test]
    fn interrupt_is_distinguishable() {
        let err = GraphError::interrupted("greeting", "Hey!");
        assert!(err.is_interrupt());
        assert!(!GraphError::Execution("boom".into()).is_interrupt());
    }
}
