//! In-memory checkpoint storage.
//!
//! [`MemorySaver`] keeps the latest checkpoint per thread in a thread-safe
//! map. This is the production backend for this service: session state is
//! in-process by design, and idle sessions are reaped together with their
//! checkpoints via [`CheckpointSaver::delete_thread`]. It is also the test
//! backend, with [`MemorySaver::clear`] for isolation between cases.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::checkpoint::Checkpoint;
use crate::error::{CheckpointError, Result};
use crate::traits::CheckpointSaver;

/// Thread-safe in-memory checkpoint saver.
///
/// Cloning is shallow: clones share the same underlying storage, so one
/// saver can be handed to every session of the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySaver {
    storage: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl MemorySaver {
    /// Create an empty saver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads currently tracked.
    pub async fn thread_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Drop all checkpoints (test isolation).
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

#[async_trait]
impl CheckpointSaver for MemorySaver {
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        if thread_id.is_empty() {
            return Err(CheckpointError::Invalid("thread_id is required".to_string()));
        }
        Ok(self.storage.read().await.get(thread_id).cloned())
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        if checkpoint.thread_id.is_empty() {
            return Err(CheckpointError::Invalid("thread_id is required".to_string()));
        }
        self.storage
            .write()
            .await
            .insert(checkpoint.thread_id.clone(), checkpoint);
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.storage.write().await.remove(thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(thread: &str, step: u64) -> Checkpoint {
        Checkpoint::new(thread, &serde_json::json!({"step": step}), step).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_returns_latest() {
        let saver = MemorySaver::new();
        saver.put(checkpoint("t1", 0)).await.unwrap();
        saver.put(checkpoint("t1", 1)).await.unwrap();

        let loaded = saver.get("t1").await.unwrap().unwrap();
        assert_eq!(loaded.step, 1);
        assert_eq!(saver.thread_count().await, 1);
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let saver = MemorySaver::new();
        saver.put(checkpoint("t1", 0)).await.unwrap();
        saver.put(checkpoint("t2", 5)).await.unwrap();

        assert_eq!(saver.get("t1").await.unwrap().unwrap().step, 0);
        assert_eq!(saver.get("t2").await.unwrap().unwrap().step, 5);
        assert_eq!(saver.thread_count().await, 2);
    }

    #[tokio::test]
    async fn delete_thread_removes_state() {
        let saver = MemorySaver::new();
        saver.put(checkpoint("t1", 0)).await.unwrap();
        saver.delete_thread("t1").await.unwrap();
        assert!(saver.get("t1").await.unwrap().is_none());

        // Deleting an unknown thread is fine.
        saver.delete_thread("missing").await.unwrap();
    }

    #[tokio::test]
    async fn empty_thread_id_is_rejected() {
        let saver = MemorySaver::new();
        assert!(matches!(
            saver.get("").await,
            Err(CheckpointError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let saver = MemorySaver::new();
        let clone = saver.clone();
        saver.put(checkpoint("t1", 0)).await.unwrap();
        assert!(clone.get("t1").await.unwrap().is_some());

        clone.clear().await;
        assert_eq!(saver.thread_count().await, 0);
    }
}
