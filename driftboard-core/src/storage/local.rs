//! Filesystem slot storage.
//!
//! One JSON file per slot under a single directory. Writes are atomic:
//! write to a `.tmp` sibling, fsync, rename over the target, fsync the
//! directory so the rename itself is durable.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::queue::QueuedAction;
use crate::types::BoardSnapshot;

use super::{HistorySlot, SlotStore, StorageError};

const BOARD_FILE: &str = "board.json";
const QUEUE_FILE: &str = "queue.json";
const HISTORY_FILE: &str = "history.json";

pub struct LocalSlotStore {
    dir: PathBuf,
}

impl LocalSlotStore {
    /// Open (creating if needed) a slot directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn slot_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn load_slot<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let path = self.slot_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_slot<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let content = serde_json::to_string(value)?;
        Self::atomic_write(&self.slot_path(name), &content)?;
        Ok(())
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

impl SlotStore for LocalSlotStore {
    fn load_board(&self) -> Result<Option<BoardSnapshot>, StorageError> {
        self.load_slot(BOARD_FILE)
    }

    fn save_board(&self, snapshot: &BoardSnapshot) -> Result<(), StorageError> {
        self.save_slot(BOARD_FILE, snapshot)
    }

    fn load_queue(&self) -> Result<Vec<QueuedAction>, StorageError> {
        Ok(self.load_slot(QUEUE_FILE)?.unwrap_or_default())
    }

    fn save_queue(&self, queue: &[QueuedAction]) -> Result<(), StorageError> {
        self.save_slot(QUEUE_FILE, &queue)
    }

    fn load_history(&self) -> Result<Option<HistorySlot>, StorageError> {
        self.load_slot(HISTORY_FILE)
    }

    fn save_history(&self, history: &HistorySlot) -> Result<(), StorageError> {
        self.save_slot(HISTORY_FILE, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::List;

    fn sample_snapshot() -> BoardSnapshot {
        BoardSnapshot {
            lists: vec![List {
                id: "l1".to_string(),
                title: "Backlog".to_string(),
                archived: false,
                order: 0,
                version: 1,
                last_modified_at: 42,
            }],
            cards: Vec::new(),
        }
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSlotStore::new(dir.path()).unwrap();
        assert!(store.load_board().unwrap().is_none());
        assert!(store.load_queue().unwrap().is_empty());
        assert!(store.load_history().unwrap().is_none());
    }

    #[test]
    fn test_board_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSlotStore::new(dir.path()).unwrap();
        let snap = sample_snapshot();
        store.save_board(&snap).unwrap();

        // Re-open the directory to simulate a process restart.
        let store = LocalSlotStore::new(dir.path()).unwrap();
        assert_eq!(store.load_board().unwrap(), Some(snap));
    }

    #[test]
    fn test_history_slot_preserves_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSlotStore::new(dir.path()).unwrap();
        let slot = HistorySlot {
            entries: vec![BoardSnapshot::default(), sample_snapshot()],
            cursor: 1,
        };
        store.save_history(&slot).unwrap();
        let loaded = store.load_history().unwrap().unwrap();
        assert_eq!(loaded.cursor, 1);
        assert_eq!(loaded.entries.len(), 2);
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSlotStore::new(dir.path()).unwrap();
        store.save_board(&sample_snapshot()).unwrap();
        store.save_board(&BoardSnapshot::default()).unwrap();
        assert_eq!(store.load_board().unwrap(), Some(BoardSnapshot::default()));
    }
}
