//! Board entity model shared by every other component.
//!
//! Lists and cards carry a per-entity `version` counter (incremented by
//! exactly 1 on every accepted mutation) and a `lastModifiedAt` wall-clock
//! timestamp in Unix milliseconds. Both are the change-detection mechanism
//! for the conflict resolver and the sync engine.

use serde::{Deserialize, Serialize};

/// Maximum list title length.
pub const LIST_TITLE_MAX: usize = 100;
/// Maximum card title length.
pub const CARD_TITLE_MAX: usize = 200;
/// Maximum card description length.
pub const CARD_DESCRIPTION_MAX: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub archived: bool,
    pub order: i64,
    pub version: u64,
    pub last_modified_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    /// Must reference an extant list. Only `moveCard` may change it.
    pub list_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub order: i64,
    pub version: u64,
    pub last_modified_at: i64,
}

/// Partial update for a list. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Partial update for a card. `listId` is accepted on the wire (the remote
/// store applies merged entities wholesale) but rejected by the local
/// update intent, where `moveCard` is the only path allowed to change it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// The whole-board entity set: the unit of local state, durable
/// persistence, undo history, and the base snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    #[serde(default)]
    pub lists: Vec<List>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl BoardSnapshot {
    pub fn find_list(&self, id: &str) -> Option<&List> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn find_card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Cards belonging to `list_id`, sorted by their `order` rank.
    pub fn cards_in_list(&self, list_id: &str) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.iter().filter(|c| c.list_id == list_id).collect();
        cards.sort_by_key(|c| c.order);
        cards
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty() && self.cards.is_empty()
    }
}

/// Generate a new globally unique entity id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current wall-clock time in Unix milliseconds.
pub fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, list_id: &str, order: i64) -> Card {
        Card {
            id: id.to_string(),
            list_id: list_id.to_string(),
            title: format!("card {id}"),
            description: String::new(),
            tags: Vec::new(),
            order,
            version: 1,
            last_modified_at: 0,
        }
    }

    #[test]
    fn test_cards_in_list_sorted_by_order() {
        let snap = BoardSnapshot {
            lists: Vec::new(),
            cards: vec![card("b", "l1", 1), card("c", "l2", 0), card("a", "l1", 0)],
        };
        let in_l1: Vec<&str> = snap.cards_in_list("l1").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(in_l1, vec!["a", "b"]);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let c = card("c1", "l1", 0);
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("listId").is_some());
        assert!(json.get("lastModifiedAt").is_some());
        assert!(json.get("list_id").is_none());
    }

    #[test]
    fn test_generated_ids_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
