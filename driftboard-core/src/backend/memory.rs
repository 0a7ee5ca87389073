//! In-memory remote store: an explicit, owned stand-in for the real
//! backend, used by tests and local sessions. Applies the same
//! server-side rules as the HTTP backend: version bumping on write,
//! referential integrity, cascade delete, duplicate-id rejection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::types::{timestamp_millis, BoardSnapshot, Card, CardPatch, List, ListPatch};

use super::{BackendError, BoardBackend};

#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<BoardSnapshot>,
    fail: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated transport failure for every subsequent call.
    pub fn set_failure(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Replace the remote dataset wholesale (test seeding).
    pub fn seed(&self, data: BoardSnapshot) {
        *self.data.lock().unwrap() = data;
    }

    /// Current remote dataset (test inspection).
    pub fn data(&self) -> BoardSnapshot {
        self.data.lock().unwrap().clone()
    }

    fn check_network(&self) -> Result<(), BackendError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(BackendError::Network("simulated network failure".to_string()))
        } else {
            Ok(())
        }
    }
}

fn not_found(kind: &str, id: &str) -> BackendError {
    BackendError::Http {
        status: 404,
        body: format!("{kind} not found: {id}"),
    }
}

impl BoardBackend for MemoryBackend {
    async fn fetch_all(&self) -> Result<BoardSnapshot, BackendError> {
        self.check_network()?;
        Ok(self.data.lock().unwrap().clone())
    }

    async fn create_list(&self, list: &List) -> Result<List, BackendError> {
        self.check_network()?;
        let mut data = self.data.lock().unwrap();
        if data.find_list(&list.id).is_some() {
            return Err(BackendError::Http {
                status: 409,
                body: format!("Duplicate list id: {}", list.id),
            });
        }
        let stored = List {
            version: 1,
            last_modified_at: timestamp_millis(),
            ..list.clone()
        };
        data.lists.push(stored.clone());
        Ok(stored)
    }

    async fn update_list(&self, id: &str, patch: &ListPatch) -> Result<Option<List>, BackendError> {
        self.check_network()?;
        let mut data = self.data.lock().unwrap();
        let list = data
            .lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| not_found("List", id))?;
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
        list.last_modified_at = timestamp_millis();
        Ok(Some(list.clone()))
    }

    async fn delete_list(&self, id: &str) -> Result<(), BackendError> {
        self.check_network()?;
        let mut data = self.data.lock().unwrap();
        if data.find_list(id).is_none() {
            return Err(not_found("List", id));
        }
        data.lists.retain(|l| l.id != id);
        data.cards.retain(|c| c.list_id != id);
        Ok(())
    }

    async fn create_card(&self, card: &Card) -> Result<Card, BackendError> {
        self.check_network()?;
        let mut data = self.data.lock().unwrap();
        if data.find_list(&card.list_id).is_none() {
            return Err(BackendError::Http {
                status: 400,
                body: format!("List not found: {}", card.list_id),
            });
        }
        if data.find_card(&card.id).is_some() {
            return Err(BackendError::Http {
                status: 409,
                body: format!("Duplicate card id: {}", card.id),
            });
        }
        let stored = Card {
            version: 1,
            last_modified_at: timestamp_millis(),
            ..card.clone()
        };
        data.cards.push(stored.clone());
        Ok(stored)
    }

    async fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Option<Card>, BackendError> {
        self.check_network()?;
        let mut data = self.data.lock().unwrap();
        if let Some(list_id) = &patch.list_id {
            if data.find_list(list_id).is_none() {
                return Err(BackendError::Http {
                    status: 400,
                    body: format!("Target list not found: {list_id}"),
                });
            }
        }
        let card = data
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("Card", id))?;
        if let Some(list_id) = &patch.list_id {
            card.list_id = list_id.clone();
        }
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
        card.last_modified_at = timestamp_millis();
        Ok(Some(card.clone()))
    }

    async fn delete_card(&self, id: &str) -> Result<(), BackendError> {
        self.check_network()?;
        let mut data = self.data.lock().unwrap();
        if data.find_card(id).is_none() {
            return Err(not_found("Card", id));
        }
        data.cards.retain(|c| c.id != id);
        Ok(())
    }

    async fn move_card(
        &self,
        id: &str,
        target_list_id: &str,
        target_index: usize,
    ) -> Result<Option<Card>, BackendError> {
        self.check_network()?;
        let mut data = self.data.lock().unwrap();
        if data.find_list(target_list_id).is_none() {
            return Err(BackendError::Http {
                status: 400,
                body: format!("Target list not found: {target_list_id}"),
            });
        }
        let card = data
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("Card", id))?;
        card.list_id = target_list_id.to_string();
        card.order = target_index as i64;
        card.version += 1;
        card.last_modified_at = timestamp_millis();
        Ok(Some(card.clone()))
    }
}
