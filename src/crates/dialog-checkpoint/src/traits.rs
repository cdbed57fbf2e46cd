//! The storage backend trait for checkpoints.

use async_trait::async_trait;

use crate::checkpoint::Checkpoint;
use crate::error::Result;

/// Storage backend for per-thread checkpoints.
///
/// Implementations must be `Send + Sync`; the runtime shares one saver across
/// every session of the process behind an `Arc`. Only the latest checkpoint
/// per thread is kept - `put` replaces any previous snapshot for the same
/// thread.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Load the latest checkpoint for a thread, if any.
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Store a checkpoint, replacing the thread's previous one.
    async fn put(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Remove all state for a thread. Removing an unknown thread is not an
    /// error.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}
