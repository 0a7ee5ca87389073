//! Three-way merge of a last-synced base snapshot against the current
//! local and remote versions of an entity.
//!
//! Merge logic per field (everything except `version`/`lastModifiedAt`):
//! - unchanged on both sides -> keep as-is
//! - changed only on one side -> take that side's value
//! - changed differently on both sides -> CONFLICT, auto-resolved:
//!   - drag fields (`listId`, `order`) -> local wins, the user explicitly
//!     placed the card there and a stale server value must not undo it
//!   - other fields -> per [`ConflictPolicy`], by default the side with
//!     the larger `lastModifiedAt`
//!
//! Without a base (entity never synced) the side with the larger
//! `lastModifiedAt` wins outright, no field-level merge.
//!
//! These functions are total and side-effect free; conflicts are a
//! recorded outcome, not an error.

use serde::Serialize;
use serde_json::Value;

use crate::types::{Card, List};

/// How a non-drag field conflict is auto-resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// The side with the larger `lastModifiedAt` wins (ties go local).
    #[default]
    PreferNewer,
    /// Local always wins.
    PreferLocal,
}

/// A field that both sides changed, differently, since the base.
/// Values are kept as JSON for observability and audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConflict {
    pub field: &'static str,
    pub base: Value,
    pub local: Value,
    pub remote: Value,
}

/// Result of a three-way merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome<T> {
    pub merged: T,
    pub has_conflict: bool,
    pub conflicts: Vec<FieldConflict>,
}

impl<T> MergeOutcome<T> {
    fn clean(merged: T) -> Self {
        Self {
            merged,
            has_conflict: false,
            conflicts: Vec::new(),
        }
    }
}

struct FieldMerge {
    local_newer: bool,
    policy: ConflictPolicy,
    conflicts: Vec<FieldConflict>,
}

impl FieldMerge {
    fn new(local_ts: i64, remote_ts: i64, policy: ConflictPolicy) -> Self {
        Self {
            local_newer: local_ts >= remote_ts,
            policy,
            conflicts: Vec::new(),
        }
    }

    fn pick<T: Clone + PartialEq + Serialize>(
        &mut self,
        field: &'static str,
        base: &T,
        local: &T,
        remote: &T,
        drag_field: bool,
    ) -> T {
        let local_changed = local != base;
        let remote_changed = remote != base;

        if local_changed && remote_changed && local != remote {
            self.conflicts.push(FieldConflict {
                field,
                base: to_json(base),
                local: to_json(local),
                remote: to_json(remote),
            });
            if drag_field || self.policy == ConflictPolicy::PreferLocal || self.local_newer {
                local.clone()
            } else {
                remote.clone()
            }
        } else if remote_changed && !local_changed {
            remote.clone()
        } else {
            local.clone()
        }
    }

    fn into_outcome<T>(self, merged: T) -> MergeOutcome<T> {
        MergeOutcome {
            merged,
            has_conflict: !self.conflicts.is_empty(),
            conflicts: self.conflicts,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Whichever side was modified later wins outright; ties go local.
fn newer_wins<T: Clone>(local: &T, remote: &T, local_ts: i64, remote_ts: i64) -> T {
    if remote_ts > local_ts {
        remote.clone()
    } else {
        local.clone()
    }
}

/// Three-way merge of a list.
pub fn merge_lists(
    base: Option<&List>,
    local: &List,
    remote: &List,
    policy: ConflictPolicy,
) -> MergeOutcome<List> {
    let Some(base) = base else {
        return MergeOutcome::clean(newer_wins(
            local,
            remote,
            local.last_modified_at,
            remote.last_modified_at,
        ));
    };
    if local == remote || base == remote {
        return MergeOutcome::clean(local.clone());
    }
    if base == local {
        return MergeOutcome::clean(remote.clone());
    }

    let mut fm = FieldMerge::new(local.last_modified_at, remote.last_modified_at, policy);
    let mut merged = local.clone();
    merged.title = fm.pick("title", &base.title, &local.title, &remote.title, false);
    merged.archived = fm.pick("archived", &base.archived, &local.archived, &remote.archived, false);
    merged.order = fm.pick("order", &base.order, &local.order, &remote.order, true);
    fm.into_outcome(merged)
}

/// Three-way merge of a card.
pub fn merge_cards(
    base: Option<&Card>,
    local: &Card,
    remote: &Card,
    policy: ConflictPolicy,
) -> MergeOutcome<Card> {
    let Some(base) = base else {
        return MergeOutcome::clean(newer_wins(
            local,
            remote,
            local.last_modified_at,
            remote.last_modified_at,
        ));
    };
    if local == remote || base == remote {
        return MergeOutcome::clean(local.clone());
    }
    if base == local {
        return MergeOutcome::clean(remote.clone());
    }

    let mut fm = FieldMerge::new(local.last_modified_at, remote.last_modified_at, policy);
    let mut merged = local.clone();
    merged.list_id = fm.pick("listId", &base.list_id, &local.list_id, &remote.list_id, true);
    merged.order = fm.pick("order", &base.order, &local.order, &remote.order, true);
    merged.title = fm.pick("title", &base.title, &local.title, &remote.title, false);
    merged.description = fm.pick(
        "description",
        &base.description,
        &local.description,
        &remote.description,
        false,
    );
    merged.tags = fm.pick("tags", &base.tags, &local.tags, &remote.tags, false);
    fm.into_outcome(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, ts: i64) -> Card {
        Card {
            id: "c1".to_string(),
            list_id: "l1".to_string(),
            title: title.to_string(),
            description: String::new(),
            tags: Vec::new(),
            order: 0,
            version: 1,
            last_modified_at: ts,
        }
    }

    #[test]
    fn test_identity_same_on_both_sides() {
        let base = card("A", 100);
        let x = card("B", 200);
        let out = merge_cards(Some(&base), &x, &x, ConflictPolicy::default());
        assert_eq!(out.merged, x);
        assert!(!out.has_conflict);
    }

    #[test]
    fn test_identity_local_unchanged_takes_remote() {
        let base = card("A", 100);
        let remote = card("B", 200);
        let out = merge_cards(Some(&base), &base, &remote, ConflictPolicy::default());
        assert_eq!(out.merged, remote);
        assert!(!out.has_conflict);
    }

    #[test]
    fn test_identity_remote_unchanged_takes_local() {
        let base = card("A", 100);
        let local = card("B", 200);
        let out = merge_cards(Some(&base), &local, &base, ConflictPolicy::default());
        assert_eq!(out.merged, local);
        assert!(!out.has_conflict);
    }

    #[test]
    fn test_title_conflict_newer_side_wins() {
        let base = card("A", 100);
        let local = card("B", 150);
        let remote = card("C", 200);
        let out = merge_cards(Some(&base), &local, &remote, ConflictPolicy::default());
        assert!(out.has_conflict);
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].field, "title");
        assert_eq!(out.merged.title, "C");

        // Flip the timestamps and local wins.
        let local = card("B", 300);
        let out = merge_cards(Some(&base), &local, &remote, ConflictPolicy::default());
        assert_eq!(out.merged.title, "B");
    }

    #[test]
    fn test_conflict_records_all_three_values() {
        let base = card("A", 100);
        let local = card("B", 150);
        let remote = card("C", 200);
        let out = merge_cards(Some(&base), &local, &remote, ConflictPolicy::default());
        let c = &out.conflicts[0];
        assert_eq!(c.base, serde_json::json!("A"));
        assert_eq!(c.local, serde_json::json!("B"));
        assert_eq!(c.remote, serde_json::json!("C"));
    }

    #[test]
    fn test_drag_field_local_wins_regardless_of_timestamp() {
        let base = card("A", 100);
        let mut local = card("A", 150);
        local.list_id = "done".to_string();
        let mut remote = card("A", 9999);
        remote.list_id = "doing".to_string();
        let out = merge_cards(Some(&base), &local, &remote, ConflictPolicy::default());
        assert!(out.has_conflict);
        assert_eq!(out.merged.list_id, "done");
    }

    #[test]
    fn test_disjoint_field_changes_merge_without_conflict() {
        // Local edits the title, remote edits the description.
        let base = card("A", 100);
        let mut local = card("X", 200);
        local.description.clear();
        let mut remote = card("A", 150);
        remote.description = "remote notes".to_string();
        let out = merge_cards(Some(&base), &local, &remote, ConflictPolicy::default());
        assert!(!out.has_conflict);
        assert_eq!(out.merged.title, "X");
        assert_eq!(out.merged.description, "remote notes");
    }

    #[test]
    fn test_no_base_newer_side_wins_outright() {
        let local = card("B", 100);
        let remote = card("C", 200);
        let out = merge_cards(None, &local, &remote, ConflictPolicy::default());
        assert_eq!(out.merged, remote);
        assert!(!out.has_conflict);

        // Tie goes local.
        let remote = card("C", 100);
        let out = merge_cards(None, &local, &remote, ConflictPolicy::default());
        assert_eq!(out.merged, local);
    }

    #[test]
    fn test_prefer_local_policy_overrides_timestamps() {
        let base = card("A", 100);
        let local = card("B", 150);
        let remote = card("C", 9999);
        let out = merge_cards(Some(&base), &local, &remote, ConflictPolicy::PreferLocal);
        assert!(out.has_conflict);
        assert_eq!(out.merged.title, "B");
    }

    #[test]
    fn test_list_merge_archived_one_side() {
        let base = List {
            id: "l1".to_string(),
            title: "Backlog".to_string(),
            archived: false,
            order: 0,
            version: 1,
            last_modified_at: 100,
        };
        let mut local = base.clone();
        local.archived = true;
        local.last_modified_at = 200;
        let mut remote = base.clone();
        remote.title = "Icebox".to_string();
        remote.last_modified_at = 150;
        let out = merge_lists(Some(&base), &local, &remote, ConflictPolicy::default());
        assert!(!out.has_conflict);
        assert!(out.merged.archived);
        assert_eq!(out.merged.title, "Icebox");
    }
}
