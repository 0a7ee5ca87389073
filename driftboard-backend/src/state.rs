//! Authoritative server-side board store.
//!
//! The server owns version numbers: every accepted write bumps the
//! entity's version and stamps a server-side timestamp. Ids are
//! client-assigned; a create with an id the store already holds is a
//! duplicate, not an upsert.

use std::sync::{Arc, Mutex};

use driftboard_core::types::{timestamp_millis, BoardSnapshot, Card, CardPatch, List, ListPatch};
use driftboard_core::validate::{validate_card_fields, validate_list_title};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Carries every violation so the 400 body can list them.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Duplicate {kind} id: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("List not found: {0}")]
    MissingList(String),
}

fn validation(errors: Vec<String>) -> StoreError {
    StoreError::Validation(errors)
}

#[derive(Clone, Default)]
pub struct ServerStore {
    data: Arc<Mutex<BoardSnapshot>>,
}

impl ServerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> BoardSnapshot {
        self.data.lock().unwrap().clone()
    }

    pub fn create_list(&self, mut list: List) -> Result<List, StoreError> {
        let errors = validate_list_title(&list.title);
        if !errors.is_empty() {
            return Err(validation(errors));
        }
        let mut data = self.data.lock().unwrap();
        if data.find_list(&list.id).is_some() {
            return Err(StoreError::Duplicate {
                kind: "List",
                id: list.id,
            });
        }
        list.version = 1;
        list.last_modified_at = timestamp_millis();
        data.lists.push(list.clone());
        Ok(list)
    }

    pub fn update_list(&self, id: &str, patch: &ListPatch) -> Result<List, StoreError> {
        if let Some(title) = &patch.title {
            let errors = validate_list_title(title);
            if !errors.is_empty() {
                return Err(validation(errors));
            }
        }
        let mut data = self.data.lock().unwrap();
        let list = data
            .lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "List",
                id: id.to_string(),
            })?;
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
        Ok(list.clone())
    }

    /// Delete a list and every card in it.
    pub fn delete_list(&self, id: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        if data.find_list(id).is_none() {
            return Err(StoreError::NotFound {
                kind: "List",
                id: id.to_string(),
            });
        }
        data.lists.retain(|l| l.id != id);
        data.cards.retain(|c| c.list_id != id);
        Ok(())
    }

    pub fn create_card(&self, mut card: Card) -> Result<Card, StoreError> {
        let errors = validate_card_fields(&card.title, &card.description);
        if !errors.is_empty() {
            return Err(validation(errors));
        }
        let mut data = self.data.lock().unwrap();
        if data.find_list(&card.list_id).is_none() {
            return Err(StoreError::MissingList(card.list_id));
        }
        if data.find_card(&card.id).is_some() {
            return Err(StoreError::Duplicate {
                kind: "Card",
                id: card.id,
            });
        }
        card.version = 1;
        card.last_modified_at = timestamp_millis();
        data.cards.push(card.clone());
        Ok(card)
    }

    pub fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Card, StoreError> {
        let mut data = self.data.lock().unwrap();
        if let Some(list_id) = &patch.list_id {
            if data.find_list(list_id).is_none() {
                return Err(StoreError::MissingList(list_id.clone()));
            }
        }
        let current = data.find_card(id).ok_or_else(|| StoreError::NotFound {
            kind: "Card",
            id: id.to_string(),
        })?;
        let title = patch.title.as_deref().unwrap_or(&current.title);
        let description = patch
            .description
            .as_deref()
            .unwrap_or(&current.description);
        let errors = validate_card_fields(title, description);
        if !errors.is_empty() {
            return Err(validation(errors));
        }

        let card = data
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "Card",
                id: id.to_string(),
            })?;
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
        Ok(card.clone())
    }

    pub fn delete_card(&self, id: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        if data.find_card(id).is_none() {
            return Err(StoreError::NotFound {
                kind: "Card",
                id: id.to_string(),
            });
        }
        data.cards.retain(|c| c.id != id);
        Ok(())
    }

    /// Move a card into a list at an index, renumbering both affected
    /// lists so orders stay dense.
    pub fn move_card(
        &self,
        id: &str,
        target_list_id: &str,
        target_index: usize,
    ) -> Result<Card, StoreError> {
        let mut data = self.data.lock().unwrap();
        if data.find_list(target_list_id).is_none() {
            return Err(StoreError::MissingList(target_list_id.to_string()));
        }
        let moved = data.find_card(id).ok_or_else(|| StoreError::NotFound {
            kind: "Card",
            id: id.to_string(),
        })?;
        let source_list_id = moved.list_id.clone();

        let mut target_ids: Vec<String> = data
            .cards_in_list(target_list_id)
            .iter()
            .filter(|c| c.id != id)
            .map(|c| c.id.clone())
            .collect();
        let index = target_index.min(target_ids.len());
        target_ids.insert(index, id.to_string());

        let source_ids: Vec<String> = data
            .cards_in_list(&source_list_id)
            .iter()
            .filter(|c| c.id != id)
            .map(|c| c.id.clone())
            .collect();

        let now = timestamp_millis();
        let mut stamp = |card_id: &str, list_id: &str, order: i64| {
            if let Some(card) = data.cards.iter_mut().find(|c| c.id == card_id) {
                if card.list_id != list_id || card.order != order {
                    card.list_id = list_id.to_string();
                    card.order = order;
                    card.version += 1;
                    card.last_modified_at = now;
                }
            }
        };
        for (order, card_id) in target_ids.iter().enumerate() {
            stamp(card_id, target_list_id, order as i64);
        }
        if source_list_id != target_list_id {
            for (order, card_id) in source_ids.iter().enumerate() {
                stamp(card_id, &source_list_id, order as i64);
            }
        }
        drop(stamp);

        data.find_card(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Card",
                id: id.to_string(),
            })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: ServerStore,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: ServerStore::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(id: &str) -> List {
        List {
            id: id.to_string(),
            title: id.to_string(),
            archived: false,
            order: 0,
            version: 0,
            last_modified_at: 0,
        }
    }

    fn card(id: &str, list_id: &str) -> Card {
        Card {
            id: id.to_string(),
            list_id: list_id.to_string(),
            title: id.to_string(),
            description: String::new(),
            tags: Vec::new(),
            order: 0,
            version: 0,
            last_modified_at: 0,
        }
    }

    #[test]
    fn test_create_assigns_version_and_timestamp() {
        let store = ServerStore::new();
        let created = store.create_list(list("l1")).unwrap();
        assert_eq!(created.version, 1);
        assert!(created.last_modified_at > 0);
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let store = ServerStore::new();
        store.create_list(list("l1")).unwrap();
        assert!(matches!(
            store.create_list(list("l1")),
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_card_requires_existing_list() {
        let store = ServerStore::new();
        assert!(matches!(
            store.create_card(card("c1", "ghost")),
            Err(StoreError::MissingList(_))
        ));
    }

    #[test]
    fn test_delete_list_cascades() {
        let store = ServerStore::new();
        store.create_list(list("l1")).unwrap();
        store.create_card(card("c1", "l1")).unwrap();
        store.delete_list("l1").unwrap();
        assert!(store.board().is_empty());
    }

    #[test]
    fn test_move_renumbers_both_lists() {
        let store = ServerStore::new();
        store.create_list(list("a")).unwrap();
        store.create_list(list("b")).unwrap();
        for i in 0..3 {
            let mut c = card(&format!("a{i}"), "a");
            c.order = i;
            store.create_card(c).unwrap();
        }
        let moved = store.move_card("a0", "b", 0).unwrap();
        assert_eq!(moved.list_id, "b");
        assert_eq!(moved.order, 0);

        let board = store.board();
        let a_orders: Vec<i64> = board.cards_in_list("a").iter().map(|c| c.order).collect();
        assert_eq!(a_orders, vec![0, 1]);
    }

    #[test]
    fn test_update_bumps_version() {
        let store = ServerStore::new();
        store.create_list(list("l1")).unwrap();
        let patch = ListPatch {
            title: Some("renamed".to_string()),
            ..ListPatch::default()
        };
        let updated = store.update_list("l1", &patch).unwrap();
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn test_title_length_enforced() {
        let store = ServerStore::new();
        let mut l = list("l1");
        l.title = "x".repeat(200);
        assert!(matches!(
            store.create_list(l),
            Err(StoreError::Validation(_))
        ));
    }
}
