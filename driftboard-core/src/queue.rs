//! Offline queue: a durable, ordered list of not-yet-confirmed remote
//! operations, replayed FIFO when connectivity is available.
//!
//! Replay is idempotent because entity ids are client-assigned: a
//! retried create that hits `409 Conflict` (or an update/delete hitting
//! `404`) means the remote is already in the state the entry wanted, so
//! the entry is treated as applied instead of retrying forever.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, BoardBackend};
use crate::storage::{SlotStore, StorageError};
use crate::types::{generate_id, timestamp_millis, Card, CardPatch, List, ListPatch};

/// One remote operation awaiting confirmation. Serialized with the
/// `{actionType, data}` wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "actionType",
    content = "data",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RemoteOp {
    CreateList(List),
    UpdateList { id: String, updates: ListPatch },
    DeleteList { id: String },
    CreateCard(Card),
    UpdateCard { id: String, updates: CardPatch },
    DeleteCard { id: String },
    MoveCard {
        card_id: String,
        target_list_id: String,
        target_index: usize,
    },
}

/// A queue entry: `{actionType, data, timestamp, id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub id: String,
    pub timestamp: i64,
    #[serde(flatten)]
    pub op: RemoteOp,
}

/// Result of one drain attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainOutcome {
    /// A drain was already in flight; this call did nothing.
    pub skipped: bool,
    pub attempted: usize,
    pub applied: usize,
    pub failed: usize,
}

impl DrainOutcome {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

pub struct OfflineQueue {
    store: Arc<dyn SlotStore>,
    entries: Mutex<Vec<QueuedAction>>,
    draining: tokio::sync::Mutex<()>,
}

impl OfflineQueue {
    /// Open the queue over its durable slot, restoring pending entries.
    pub fn open(store: Arc<dyn SlotStore>) -> Result<Self, StorageError> {
        let entries = store.load_queue()?;
        Ok(Self {
            store,
            entries: Mutex::new(entries),
            draining: tokio::sync::Mutex::new(()),
        })
    }

    /// Append an operation and persist the queue.
    pub fn enqueue(&self, op: RemoteOp) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        entries.push(QueuedAction {
            id: generate_id(),
            timestamp: timestamp_millis(),
            op,
        });
        self.store.save_queue(&entries)
    }

    pub fn pending(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Drop all pending entries.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        self.store.save_queue(&entries)
    }

    /// Attempt every pending entry in original order. Entries that fail
    /// stay queued, in their original relative order, for the next
    /// drain. Mutually exclusive: a call while another drain is in
    /// flight is a no-op.
    pub async fn drain<B: BoardBackend>(&self, backend: &B) -> Result<DrainOutcome, StorageError> {
        let Ok(_guard) = self.draining.try_lock() else {
            return Ok(DrainOutcome::skipped());
        };

        let batch: Vec<QueuedAction> = self.entries.lock().unwrap().clone();
        if batch.is_empty() {
            return Ok(DrainOutcome::default());
        }

        let mut applied: HashSet<String> = HashSet::new();
        for entry in &batch {
            match Self::attempt(backend, &entry.op).await {
                Ok(()) => {
                    applied.insert(entry.id.clone());
                }
                Err(e) if already_applied(&entry.op, &e) => {
                    log::debug!("[driftboard.queue] Entry {} already applied remotely: {e}", entry.id);
                    applied.insert(entry.id.clone());
                }
                Err(e) => {
                    log::warn!("[driftboard.queue] Replay of {} failed: {e}", entry.id);
                }
            }
        }

        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| !applied.contains(&e.id));
        self.store.save_queue(&entries)?;

        Ok(DrainOutcome {
            skipped: false,
            attempted: batch.len(),
            applied: applied.len(),
            failed: batch.len() - applied.len(),
        })
    }

    async fn attempt<B: BoardBackend>(backend: &B, op: &RemoteOp) -> Result<(), BackendError> {
        match op {
            RemoteOp::CreateList(list) => {
                backend.create_list(list).await?;
            }
            RemoteOp::UpdateList { id, updates } => {
                backend.update_list(id, updates).await?;
            }
            RemoteOp::DeleteList { id } => backend.delete_list(id).await?,
            RemoteOp::CreateCard(card) => {
                backend.create_card(card).await?;
            }
            RemoteOp::UpdateCard { id, updates } => {
                backend.update_card(id, updates).await?;
            }
            RemoteOp::DeleteCard { id } => backend.delete_card(id).await?,
            RemoteOp::MoveCard {
                card_id,
                target_list_id,
                target_index,
            } => {
                backend.move_card(card_id, target_list_id, *target_index).await?;
            }
        }
        Ok(())
    }
}

/// Whether an error means the remote already reflects the op's effect.
fn already_applied(op: &RemoteOp, err: &BackendError) -> bool {
    match op {
        RemoteOp::CreateList(_) | RemoteOp::CreateCard(_) => err.status() == Some(409),
        _ => err.status() == Some(404),
    }
}
