//! The checkpoint data structure.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// A snapshot of one thread's graph state, written at a node boundary.
///
/// The state itself is stored as opaque JSON so the saver does not need to
/// know the application's state schema. `next_node` records where a normal
/// step left off; `pending_interrupt` records the node that raised an
/// interrupt and is waiting for a user reply. At most one of the two is
/// meaningful at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique id of this snapshot.
    pub id: String,

    /// Thread (session) this checkpoint belongs to.
    pub thread_id: String,

    /// Serialized graph state.
    pub state: Value,

    /// Node the next step should execute, if the previous step completed.
    pub next_node: Option<String>,

    /// Node that raised an interrupt and must be re-entered on resume.
    pub pending_interrupt: Option<String>,

    /// Monotonic step counter within the thread.
    pub step: u64,

    /// When this snapshot was written.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a checkpoint from a serializable state.
    pub fn new<S: Serialize>(thread_id: impl Into<String>, state: &S, step: u64) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            state: serde_json::to_value(state)?,
            next_node: None,
            pending_interrupt: None,
            step,
            created_at: Utc::now(),
        })
    }

    /// Set the node the next step should execute.
    pub fn with_next_node(mut self, node: impl Into<String>) -> Self {
        self.next_node = Some(node.into());
        self
    }

    /// Mark a node as interrupted and awaiting a user reply.
    pub fn with_pending_interrupt(mut self, node: impl Into<String>) -> Self {
        self.pending_interrupt = Some(node.into());
        self
    }

    /// Deserialize the stored state into the application's schema.
    pub fn decode_state<S: DeserializeOwned>(&self) -> Result<S> {
        Ok(serde_json::from_value(self.state.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct DemoState {
        counter: u64,
        note: String,
    }

    #[test]
    fn round_trips_state() {
        let state = DemoState {
            counter: 3,
            note: "hello".into(),
        };
        let cp = Checkpoint::new("thread-1", &state, 1).unwrap();
        assert_eq!(cp.thread_id, "thread-1");
        assert_eq!(cp.decode_state::<DemoState>().unwrap(), state);
    }

    #[test]
    fn builder_sets_position() {
        let cp = Checkpoint::new("t", &serde_json::json!({}), 0)
            .unwrap()
            .with_next_node("conversation");
        assert_eq!(cp.next_node.as_deref(), Some("conversation"));
        assert!(cp.pending_interrupt.is_none());

        let cp = Checkpoint::new("t", &serde_json::json!({}), 0)
            .unwrap()
            .with_pending_interrupt("greeting");
        assert_eq!(cp.pending_interrupt.as_deref(), Some("greeting"));
    }
}
