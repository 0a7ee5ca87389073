//! Bounded bidirectional history of whole-board snapshots.
//!
//! A single cursor addresses the current entry. Pushing truncates any
//! redo-able future first; exceeding capacity evicts the oldest entry.
//! `undo`/`redo` at a boundary return `None` and leave the cursor alone.

use crate::types::BoardSnapshot;

/// Default number of snapshots retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct UndoHistory {
    entries: Vec<BoardSnapshot>,
    cursor: usize,
    capacity: usize,
}

impl UndoHistory {
    /// History seeded with the initial board state at cursor 0.
    pub fn new(initial: BoardSnapshot, capacity: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Rebuild a history persisted via [`crate::storage::SlotStore`].
    /// An out-of-range cursor is clamped; an empty entry list falls back
    /// to a fresh history around the given snapshot. Entries beyond
    /// capacity (persisted under a larger bound) are dropped oldest-first
    /// and the cursor re-clamped.
    pub fn from_parts(mut entries: Vec<BoardSnapshot>, cursor: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        if entries.is_empty() {
            return Self::new(BoardSnapshot::default(), capacity);
        }
        let mut cursor = cursor.min(entries.len() - 1);
        if entries.len() > capacity {
            let evicted = entries.len() - capacity;
            entries.drain(..evicted);
            cursor = cursor.saturating_sub(evicted);
        }
        Self {
            entries,
            cursor,
            capacity,
        }
    }

    /// The persisted representation: (entries, cursor).
    pub fn parts(&self) -> (&[BoardSnapshot], usize) {
        (&self.entries, self.cursor)
    }

    /// Record a new state. Drops redo entries beyond the cursor, appends,
    /// and evicts the oldest entry once capacity is exceeded.
    pub fn push_state(&mut self, state: BoardSnapshot) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(state);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry, or `None` at the start of history.
    pub fn undo(&mut self) -> Option<BoardSnapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Step forward one entry, or `None` at the end of history.
    pub fn redo(&mut self) -> Option<BoardSnapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> &BoardSnapshot {
        &self.entries[self.cursor]
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Collapse history to just the current entry.
    pub fn clear(&mut self) {
        let current = self.entries[self.cursor].clone();
        self.entries = vec![current];
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::List;

    fn snap(n: usize) -> BoardSnapshot {
        BoardSnapshot {
            lists: vec![List {
                id: format!("l{n}"),
                title: format!("state {n}"),
                archived: false,
                order: 0,
                version: 1,
                last_modified_at: n as i64,
            }],
            cards: Vec::new(),
        }
    }

    #[test]
    fn test_undo_at_start_is_none_and_cursor_unchanged() {
        let mut h = UndoHistory::new(snap(0), 10);
        assert!(h.undo().is_none());
        assert_eq!(h.current(), &snap(0));
        assert!(!h.can_undo());
    }

    #[test]
    fn test_redo_at_end_is_none() {
        let mut h = UndoHistory::new(snap(0), 10);
        h.push_state(snap(1));
        assert!(h.redo().is_none());
        assert!(!h.can_redo());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut h = UndoHistory::new(snap(0), 10);
        h.push_state(snap(1));
        h.push_state(snap(2));
        assert_eq!(h.undo(), Some(snap(1)));
        assert_eq!(h.undo(), Some(snap(0)));
        assert_eq!(h.redo(), Some(snap(1)));
        assert_eq!(h.redo(), Some(snap(2)));
        assert!(h.redo().is_none());
    }

    #[test]
    fn test_push_truncates_redo_tail() {
        let mut h = UndoHistory::new(snap(0), 10);
        h.push_state(snap(1));
        h.push_state(snap(2));
        h.undo();
        h.undo();
        h.push_state(snap(3));
        assert!(!h.can_redo());
        assert_eq!(h.undo(), Some(snap(0)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut h = UndoHistory::new(snap(0), 3);
        for n in 1..=5 {
            h.push_state(snap(n));
        }
        assert_eq!(h.current(), &snap(5));
        assert_eq!(h.undo(), Some(snap(4)));
        assert_eq!(h.undo(), Some(snap(3)));
        // Oldest entries were evicted.
        assert!(h.undo().is_none());
    }

    #[test]
    fn test_from_parts_clamps_cursor() {
        let h = UndoHistory::from_parts(vec![snap(0), snap(1)], 99, 10);
        assert_eq!(h.current(), &snap(1));
    }

    #[test]
    fn test_from_parts_truncates_over_capacity_history() {
        let entries: Vec<BoardSnapshot> = (0..5).map(snap).collect();
        let mut h = UndoHistory::from_parts(entries, 4, 3);
        assert_eq!(h.parts().0.len(), 3);
        assert_eq!(h.current(), &snap(4));
        assert_eq!(h.undo(), Some(snap(3)));
        assert_eq!(h.undo(), Some(snap(2)));
        // The two oldest entries were dropped.
        assert!(h.undo().is_none());
    }

    #[test]
    fn test_from_parts_truncation_keeps_cursor_in_range() {
        let entries: Vec<BoardSnapshot> = (0..5).map(snap).collect();
        let h = UndoHistory::from_parts(entries, 0, 3);
        // The addressed entry was evicted; the cursor lands on the
        // oldest survivor.
        assert_eq!(h.current(), &snap(2));
        assert!(!h.can_undo());
    }

    #[test]
    fn test_clear_keeps_only_current() {
        let mut h = UndoHistory::new(snap(0), 10);
        h.push_state(snap(1));
        h.push_state(snap(2));
        h.undo();
        h.clear();
        assert_eq!(h.current(), &snap(1));
        assert!(!h.can_undo());
        assert!(!h.can_redo());
    }
}
