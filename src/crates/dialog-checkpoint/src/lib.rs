//! # dialog-checkpoint - Per-thread state persistence for dialog graphs
//!
//! A conversation graph suspends whenever it asks the user something, so its
//! state must outlive any single execution of the drive loop. This crate owns
//! that persistence boundary: a [`Checkpoint`] is the serialized graph state
//! of one thread (one session) together with the position the run should
//! continue from, and a [`CheckpointSaver`] is the storage backend it is
//! written to at every node boundary.
//!
//! The runtime writes a checkpoint after each completed node step and after
//! each raised interrupt; resuming a thread reads the latest checkpoint and
//! continues from `next_node` (or re-enters `pending_interrupt` with the
//! user's reply staged).
//!
//! Only the latest checkpoint per thread is retained - this system does not
//! need time travel, and sessions are reaped wholesale via
//! [`CheckpointSaver::delete_thread`].
//!
//! [`MemorySaver`] is the in-process implementation used in production here;
//! durable cross-process persistence is explicitly out of scope for this
//! service, but the trait keeps the door open.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod traits;

pub use checkpoint::Checkpoint;
pub use error::{CheckpointError, Result};
pub use memory::MemorySaver;
pub use traits::CheckpointSaver;
