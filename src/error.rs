//! Crate-level error types for storage, store operations, and the bridge.

use std::path::PathBuf;

/// Error from the durable entity store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failure while reading or writing an entity table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entity table file exists but cannot be parsed.
    ///
    /// Unlike a missing table (treated as empty), a corrupt table is a
    /// hard error: silently discarding it would lose data.
    #[error("corrupt entity table at {path}: {reason}")]
    Corrupt {
        /// Path of the unreadable table file.
        path: PathBuf,
        /// Parser message describing the corruption.
        reason: String,
    },

    /// A mutation referenced an entity id the store does not hold.
    #[error("{kind} not found: {id}")]
    Missing {
        /// Entity kind ("file", "tag", or "collection").
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },
}

/// Error from a domain store or the tag resolution service.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The durable write or read behind the operation failed. The
    /// in-memory mirror is left unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A spawned resolution task failed to complete (panic or runtime
    /// shutdown).
    #[error("background task failed: {0}")]
    Background(String),

    /// An operation was issued in a window phase that does not permit it.
    #[error("invalid window phase: {0}")]
    InvalidPhase(&'static str),
}

/// Error crossing the inter-process bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The far side of the channel is gone.
    #[error("bridge channel closed")]
    Closed,

    /// A request/response message was delivered but the reply sender was
    /// dropped before answering.
    #[error("no reply received")]
    NoReply,

    /// The far side answered a request with a storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
