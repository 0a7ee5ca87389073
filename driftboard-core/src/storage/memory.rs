//! In-process slot storage, used by tests and ephemeral sessions.

use std::sync::Mutex;

use crate::queue::QueuedAction;
use crate::types::BoardSnapshot;

use super::{HistorySlot, SlotStore, StorageError};

#[derive(Default)]
struct Slots {
    board: Option<BoardSnapshot>,
    queue: Vec<QueuedAction>,
    history: Option<HistorySlot>,
}

#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<Slots>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemorySlotStore {
    fn load_board(&self) -> Result<Option<BoardSnapshot>, StorageError> {
        Ok(self.slots.lock().unwrap().board.clone())
    }

    fn save_board(&self, snapshot: &BoardSnapshot) -> Result<(), StorageError> {
        self.slots.lock().unwrap().board = Some(snapshot.clone());
        Ok(())
    }

    fn load_queue(&self) -> Result<Vec<QueuedAction>, StorageError> {
        Ok(self.slots.lock().unwrap().queue.clone())
    }

    fn save_queue(&self, queue: &[QueuedAction]) -> Result<(), StorageError> {
        self.slots.lock().unwrap().queue = queue.to_vec();
        Ok(())
    }

    fn load_history(&self) -> Result<Option<HistorySlot>, StorageError> {
        Ok(self.slots.lock().unwrap().history.clone())
    }

    fn save_history(&self, history: &HistorySlot) -> Result<(), StorageError> {
        self.slots.lock().unwrap().history = Some(history.clone());
        Ok(())
    }
}
