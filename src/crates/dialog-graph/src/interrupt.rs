//! The node-side interrupt primitive.
//!
//! Interactive nodes receive a [`NodeContext`] per execution. Calling
//! [`NodeContext::interrupt`] either consumes the staged resume value (when
//! the thread is being resumed into this node) or raises
//! [`GraphError::Interrupted`], which the runtime catches to checkpoint the
//! thread and surface the prompt.
//!
//! Because the runtime re-executes the interrupted node from its
//! checkpointed pre-node state on resume, node code reads naturally:
//!
//! ```rust,ignore
//! let reply = ctx.interrupt(greeting_text.clone())?;
//! state.messages.push(Message::assistant(greeting_text));
//! state.messages.push(Message::human(reply));
//! ```
//!
//! The appends after the `interrupt` call run exactly once - on the resumed
//! execution.

use crate::error::{GraphError, Result};

/// Per-execution context handed to every node.
#[derive(Debug)]
pub struct NodeContext {
    thread_id: String,
    node: String,
    resume: Option<String>,
}

impl NodeContext {
    pub(crate) fn new(thread_id: String, node: String, resume: Option<String>) -> Self {
        Self {
            thread_id,
            node,
            resume,
        }
    }

    /// Thread (session) this execution belongs to.
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Name of the executing node.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Whether a resume value is staged for this execution.
    pub fn is_resuming(&self) -> bool {
        self.resume.is_some()
    }

    /// Suspend to ask the user `prompt`, or consume the staged reply.
    ///
    /// Returns the user's reply when resuming; otherwise raises
    /// [`GraphError::Interrupted`] carrying the prompt. A node calls this at
    /// most once per execution - a second call in the same resumed execution
    /// suspends again with the new prompt.
    pub fn interrupt(&mut self, prompt: impl Into<String>) -> Result<String> {
        match self.resume.take() {
            Some(reply) => Ok(reply),
            None => Err(GraphError::Interrupted {
                node: self.node.clone(),
                value: prompt.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_without_resume_raises() {
        let mut ctx = NodeContext::new("t1".into(), "greeting".into(), None);
        match ctx.interrupt("Hey!") {
            Err(GraphError::Interrupted { node, value }) => {
                assert_eq!(node, "greeting");
                assert_eq!(value, "Hey!");
            }
            other => panic!("expected interrupt, got {other:?}"),
        }
    }

    #[test]
    fn interrupt_with_resume_returns_reply_once() {
        let mut ctx = NodeContext::new("t1".into(), "greeting".into(), Some("beginner".into()));
        assert!(ctx.is_resuming());
        assert_eq!(ctx.interrupt("Hey!").unwrap(), "beginner");

        // The reply is consumed; a second ask suspends again.
        assert!(ctx.interrupt("And now?").is_err());
    }
}
