//! Durable local persistence behind the sync engine.
//!
//! Three logical slots mirror the in-memory state across process
//! restarts: the current board snapshot, the pending offline action
//! queue, and the undo history with its cursor.

pub mod local;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::queue::QueuedAction;
use crate::types::BoardSnapshot;

/// Persisted undo history: the snapshot array plus the cursor index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySlot {
    pub entries: Vec<BoardSnapshot>,
    pub cursor: usize,
}

/// Abstract slot storage. Implementations: [`local::LocalSlotStore`]
/// (filesystem), [`memory::MemorySlotStore`] (tests).
pub trait SlotStore: Send + Sync {
    /// Load the board snapshot slot, `None` if never written.
    fn load_board(&self) -> Result<Option<BoardSnapshot>, StorageError>;

    /// Write-through of the current board snapshot.
    fn save_board(&self, snapshot: &BoardSnapshot) -> Result<(), StorageError>;

    /// Load the pending offline action queue (empty if never written).
    fn load_queue(&self) -> Result<Vec<QueuedAction>, StorageError>;

    fn save_queue(&self, queue: &[QueuedAction]) -> Result<(), StorageError>;

    /// Load the undo history slot, `None` if never written.
    fn load_history(&self) -> Result<Option<HistorySlot>, StorageError>;

    fn save_history(&self, history: &HistorySlot) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
