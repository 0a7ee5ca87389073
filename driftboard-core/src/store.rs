//! Local state store: the in-memory authoritative view for the UI.
//!
//! Mutations go through a closed intent set applied by a pure reducer
//! (old snapshot + intent + clock -> new snapshot), which keeps replay
//! deterministic and testable. [`BoardStore`] wraps the reducer with
//! write-through durable persistence, undo history, and a revision
//! counter the sync engine debounces on.

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;

use crate::storage::{HistorySlot, SlotStore, StorageError};
use crate::types::{
    generate_id, timestamp_millis, BoardSnapshot, Card, CardPatch, List, ListPatch,
};
use crate::undo::UndoHistory;
use crate::validate::{validate_card_fields, validate_list_title};

/// The closed set of board mutations.
///
/// Creation intents may carry a caller-assigned id so that queue replay
/// and tests stay deterministic; `None` generates a fresh uuid.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    AddList {
        id: Option<String>,
        title: String,
    },
    UpdateList {
        id: String,
        patch: ListPatch,
    },
    ArchiveList {
        id: String,
    },
    DeleteList {
        id: String,
    },
    AddCard {
        id: Option<String>,
        list_id: String,
        title: String,
        description: String,
        tags: Vec<String>,
    },
    UpdateCard {
        id: String,
        patch: CardPatch,
    },
    DeleteCard {
        id: String,
    },
    MoveCard {
        card_id: String,
        target_list_id: String,
        target_index: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    /// Entity fails title/length constraints. Rejected before reaching
    /// the store; must surface to the invoking caller.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Card references a nonexistent list (creation or move time).
    #[error("List not found: {0}")]
    MissingList(String),

    /// Update/delete targeting a vanished id. The store downgrades this
    /// to a logged no-op, since the entity may have been concurrently
    /// deleted.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

fn validation(errors: Vec<String>) -> IntentError {
    IntentError::Validation(errors.join("; "))
}

/// Apply one intent to a snapshot. Pure: the input snapshot is never
/// mutated, and the same inputs always produce the same output.
pub fn apply(
    snapshot: &BoardSnapshot,
    intent: &Intent,
    now_ms: i64,
) -> Result<BoardSnapshot, IntentError> {
    let mut next = snapshot.clone();
    match intent {
        Intent::AddList { id, title } => {
            let errors = validate_list_title(title);
            if !errors.is_empty() {
                return Err(validation(errors));
            }
            let id = id.clone().unwrap_or_else(generate_id);
            if next.find_list(&id).is_some() {
                return Err(IntentError::Validation(format!("Duplicate list id: {id}")));
            }
            let order = next.lists.len() as i64;
            next.lists.push(List {
                id,
                title: title.clone(),
                archived: false,
                order,
                version: 1,
                last_modified_at: now_ms,
            });
        }

        Intent::UpdateList { id, patch } => {
            if let Some(title) = &patch.title {
                let errors = validate_list_title(title);
                if !errors.is_empty() {
                    return Err(validation(errors));
                }
            }
            let list = next
                .lists
                .iter_mut()
                .find(|l| &l.id == id)
                .ok_or(IntentError::NotFound { kind: "List", id: id.clone() })?;
            if let Some(title) = &patch.title {
                list.title = title.clone();
            }
            if let Some(archived) = patch.archived {
                list.archived = archived;
            }
            if let Some(order) = patch.order {
                list.order = order;
            }
            list.version += 1;
            list.last_modified_at = now_ms;
        }

        Intent::ArchiveList { id } => {
            let list = next
                .lists
                .iter_mut()
                .find(|l| &l.id == id)
                .ok_or(IntentError::NotFound { kind: "List", id: id.clone() })?;
            // Archiving leaves order and child cards untouched.
            list.archived = true;
            list.version += 1;
            list.last_modified_at = now_ms;
        }

        Intent::DeleteList { id } => {
            if next.find_list(id).is_none() {
                return Err(IntentError::NotFound { kind: "List", id: id.clone() });
            }
            next.lists.retain(|l| &l.id != id);
            // Cascade: cards of a deleted list go with it, atomically.
            next.cards.retain(|c| &c.list_id != id);
        }

        Intent::AddCard {
            id,
            list_id,
            title,
            description,
            tags,
        } => {
            let errors = validate_card_fields(title, description);
            if !errors.is_empty() {
                return Err(validation(errors));
            }
            if next.find_list(list_id).is_none() {
                return Err(IntentError::MissingList(list_id.clone()));
            }
            let id = id.clone().unwrap_or_else(generate_id);
            if next.find_card(&id).is_some() {
                return Err(IntentError::Validation(format!("Duplicate card id: {id}")));
            }
            let order = next.cards_in_list(list_id).len() as i64;
            next.cards.push(Card {
                id,
                list_id: list_id.clone(),
                title: title.clone(),
                description: description.clone(),
                tags: tags.clone(),
                order,
                version: 1,
                last_modified_at: now_ms,
            });
        }

        Intent::UpdateCard { id, patch } => {
            if patch.list_id.is_some() {
                return Err(IntentError::Validation(
                    "listId can only be changed by moveCard".to_string(),
                ));
            }
            let title = patch.title.as_deref();
            let description = patch.description.as_deref();
            if title.is_some() || description.is_some() {
                let current = next
                    .find_card(id)
                    .ok_or(IntentError::NotFound { kind: "Card", id: id.clone() })?;
                let errors = validate_card_fields(
                    title.unwrap_or(&current.title),
                    description.unwrap_or(&current.description),
                );
                if !errors.is_empty() {
                    return Err(validation(errors));
                }
            }
            let card = next
                .cards
                .iter_mut()
                .find(|c| &c.id == id)
                .ok_or(IntentError::NotFound { kind: "Card", id: id.clone() })?;
            if let Some(title) = &patch.title {
                card.title = title.clone();
            }
            if let Some(description) = &patch.description {
                card.description = description.clone();
            }
            if let Some(tags) = &patch.tags {
                card.tags = tags.clone();
            }
            if let Some(order) = patch.order {
                card.order = order;
            }
            card.version += 1;
            card.last_modified_at = now_ms;
        }

        Intent::DeleteCard { id } => {
            if next.find_card(id).is_none() {
                return Err(IntentError::NotFound { kind: "Card", id: id.clone() });
            }
            next.cards.retain(|c| &c.id != id);
        }

        Intent::MoveCard {
            card_id,
            target_list_id,
            target_index,
        } => {
            let card = next
                .find_card(card_id)
                .ok_or(IntentError::NotFound { kind: "Card", id: card_id.clone() })?;
            if next.find_list(target_list_id).is_none() {
                return Err(IntentError::MissingList(target_list_id.clone()));
            }
            let source_list_id = card.list_id.clone();
            move_card(&mut next, card_id, &source_list_id, target_list_id, *target_index, now_ms);
        }
    }
    Ok(next)
}

/// The move algorithm: remove the card from its source sequence, insert
/// into the target sequence at the clamped index, then renumber `order`
/// to 0..n-1 in every affected list. Every card whose placement actually
/// changed gets a fresh `lastModifiedAt` (and a version bump), because
/// downstream sync treats order drift as a change needing propagation.
fn move_card(
    snapshot: &mut BoardSnapshot,
    card_id: &str,
    source_list_id: &str,
    target_list_id: &str,
    target_index: usize,
    now_ms: i64,
) {
    let ordered_ids = |snap: &BoardSnapshot, list_id: &str, skip: &str| -> Vec<String> {
        snap.cards_in_list(list_id)
            .iter()
            .filter(|c| c.id != skip)
            .map(|c| c.id.clone())
            .collect()
    };

    // (card id, new list, new order) for every card in an affected list.
    let mut placement: Vec<(String, String, i64)> = Vec::new();

    if source_list_id == target_list_id {
        let mut seq = ordered_ids(snapshot, source_list_id, card_id);
        let index = target_index.min(seq.len());
        seq.insert(index, card_id.to_string());
        for (idx, id) in seq.into_iter().enumerate() {
            placement.push((id, source_list_id.to_string(), idx as i64));
        }
    } else {
        let source_seq = ordered_ids(snapshot, source_list_id, card_id);
        let mut target_seq = ordered_ids(snapshot, target_list_id, card_id);
        let index = target_index.min(target_seq.len());
        target_seq.insert(index, card_id.to_string());
        for (idx, id) in source_seq.into_iter().enumerate() {
            placement.push((id, source_list_id.to_string(), idx as i64));
        }
        for (idx, id) in target_seq.into_iter().enumerate() {
            placement.push((id, target_list_id.to_string(), idx as i64));
        }
    }

    for (id, list_id, order) in placement {
        if let Some(card) = snapshot.cards.iter_mut().find(|c| c.id == id) {
            if card.list_id != list_id || card.order != order {
                card.list_id = list_id;
                card.order = order;
                card.version += 1;
                card.last_modified_at = now_ms;
            }
        }
    }
}

/// Transient session state carried beside the entity snapshot.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub snapshot: BoardSnapshot,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_synced_at: Option<i64>,
}

/// The store service: reducer + durable write-through + undo history.
///
/// Mutations are synchronous and atomic from the caller's point of view.
/// The durable log is written before the in-memory commit, so a failed
/// persist leaves both sides on the old state.
pub struct BoardStore {
    state: RwLock<BoardState>,
    log: Arc<dyn SlotStore>,
    history: Mutex<UndoHistory>,
    revision: watch::Sender<u64>,
}

impl BoardStore {
    /// Open the store over a durable log, restoring the snapshot and the
    /// undo history from their slots when present.
    pub fn open(log: Arc<dyn SlotStore>, history_capacity: usize) -> Result<Self, StorageError> {
        let snapshot = log.load_board()?.unwrap_or_default();
        let history = match log.load_history()? {
            Some(slot) => UndoHistory::from_parts(slot.entries, slot.cursor, history_capacity),
            None => UndoHistory::new(snapshot.clone(), history_capacity),
        };
        let (revision, _) = watch::channel(0u64);
        Ok(Self {
            state: RwLock::new(BoardState {
                snapshot,
                ..BoardState::default()
            }),
            log,
            history: Mutex::new(history),
            revision,
        })
    }

    /// Apply an intent. Returns `Ok(true)` when the mutation was applied,
    /// `Ok(false)` when the target entity had already vanished (local
    /// no-op), and `Err` for validation/reference/persistence failures.
    pub fn dispatch(&self, intent: &Intent) -> Result<bool, IntentError> {
        let now = timestamp_millis();
        let mut state = self.state.write().unwrap();
        let next = match apply(&state.snapshot, intent, now) {
            Ok(next) => next,
            Err(IntentError::NotFound { kind, id }) => {
                log::warn!("[driftboard.store] {kind} {id} vanished, intent dropped");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        // Persist first: a failed write must not leave memory ahead of disk.
        self.log.save_board(&next)?;
        state.snapshot = next.clone();
        drop(state);

        let mut history = self.history.lock().unwrap();
        history.push_state(next);
        self.persist_history(&history);
        drop(history);

        self.revision.send_modify(|r| *r += 1);
        Ok(true)
    }

    /// Replace the whole board (bootstrap / reconciliation result). The
    /// undo history restarts from the new snapshot.
    pub fn replace_board(&self, snapshot: BoardSnapshot) -> Result<(), StorageError> {
        self.log.save_board(&snapshot)?;
        let mut state = self.state.write().unwrap();
        state.snapshot = snapshot.clone();
        state.is_loading = false;
        drop(state);

        let mut history = self.history.lock().unwrap();
        *history = UndoHistory::new(snapshot, history.capacity());
        self.persist_history(&history);
        Ok(())
    }

    /// Step the undo cursor back and apply the restored snapshot to the
    /// store and durable log, without re-inserting it into history.
    pub fn undo(&self) -> Result<Option<BoardSnapshot>, StorageError> {
        self.step_history(UndoHistory::undo)
    }

    /// Symmetric to [`BoardStore::undo`].
    pub fn redo(&self) -> Result<Option<BoardSnapshot>, StorageError> {
        self.step_history(UndoHistory::redo)
    }

    fn step_history(
        &self,
        step: fn(&mut UndoHistory) -> Option<BoardSnapshot>,
    ) -> Result<Option<BoardSnapshot>, StorageError> {
        let mut history = self.history.lock().unwrap();
        let Some(snapshot) = step(&mut history) else {
            return Ok(None);
        };
        self.log.save_board(&snapshot)?;
        self.persist_history(&history);
        drop(history);

        let mut state = self.state.write().unwrap();
        state.snapshot = snapshot.clone();
        Ok(Some(snapshot))
    }

    pub fn can_undo(&self) -> bool {
        self.history.lock().unwrap().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.lock().unwrap().can_redo()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.state.read().unwrap().snapshot.clone()
    }

    pub fn state(&self) -> BoardState {
        self.state.read().unwrap().clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.write().unwrap().is_loading = loading;
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.write().unwrap().error = error;
    }

    pub fn set_last_synced(&self, at_ms: i64) {
        let mut state = self.state.write().unwrap();
        state.last_synced_at = Some(at_ms);
        state.error = None;
    }

    /// Receiver over the mutation revision counter; the sync engine
    /// debounces on changes to it.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn persist_history(&self, history: &UndoHistory) {
        let (entries, cursor) = history.parts();
        let slot = HistorySlot {
            entries: entries.to_vec(),
            cursor,
        };
        if let Err(e) = self.log.save_history(&slot) {
            log::warn!("[driftboard.store] Failed to persist undo history: {e}");
        }
    }
}
