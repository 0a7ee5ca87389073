//! Property tests for the three-way merge laws and move renumbering.

use proptest::prelude::*;

use driftboard_core::merge::{merge_cards, merge_lists, ConflictPolicy};
use driftboard_core::store::{apply, Intent};
use driftboard_core::types::{BoardSnapshot, Card, List};

mod generators {
    use super::*;

    pub fn list() -> impl Strategy<Value = List> {
        (
            "[a-z]{1,8}",
            "[A-Za-z ]{1,20}",
            any::<bool>(),
            0..20i64,
            1..100u64,
            0..1_000_000i64,
        )
            .prop_map(|(id, title, archived, order, version, ts)| List {
                id,
                title,
                archived,
                order,
                version,
                last_modified_at: ts,
            })
    }

    pub fn card_in(list_id: &str) -> impl Strategy<Value = Card> {
        let list_id = list_id.to_string();
        (
            "[a-z]{1,8}",
            "[A-Za-z ]{1,20}",
            "[A-Za-z ]{0,40}",
            proptest::collection::vec("[a-z]{1,6}", 0..4),
            0..20i64,
            1..100u64,
            0..1_000_000i64,
        )
            .prop_map(move |(id, title, description, tags, order, version, ts)| Card {
                id,
                list_id: list_id.clone(),
                title,
                description,
                tags,
                order,
                version,
                last_modified_at: ts,
            })
    }

    /// A board with two lists and distinct-id cards spread across them.
    pub fn board() -> impl Strategy<Value = BoardSnapshot> {
        proptest::collection::vec((any::<bool>(), 0..1_000_000i64), 1..8).prop_map(|seeds| {
            let lists = vec![
                List {
                    id: "a".to_string(),
                    title: "A".to_string(),
                    archived: false,
                    order: 0,
                    version: 1,
                    last_modified_at: 0,
                },
                List {
                    id: "b".to_string(),
                    title: "B".to_string(),
                    archived: false,
                    order: 1,
                    version: 1,
                    last_modified_at: 0,
                },
            ];
            let mut per_list = [0i64, 0i64];
            let cards = seeds
                .into_iter()
                .enumerate()
                .map(|(i, (in_b, ts))| {
                    let slot = usize::from(in_b);
                    let order = per_list[slot];
                    per_list[slot] += 1;
                    Card {
                        id: format!("c{i}"),
                        list_id: if in_b { "b" } else { "a" }.to_string(),
                        title: format!("card {i}"),
                        description: String::new(),
                        tags: Vec::new(),
                        order,
                        version: 1,
                        last_modified_at: ts,
                    }
                })
                .collect();
            BoardSnapshot { lists, cards }
        })
    }
}

proptest! {
    #[test]
    fn merge_of_identical_sides_is_identity(base in generators::list(), side in generators::list()) {
        let out = merge_lists(Some(&base), &side, &side, ConflictPolicy::PreferNewer);
        prop_assert_eq!(&out.merged, &side);
        prop_assert!(!out.has_conflict);
    }

    #[test]
    fn only_remote_changed_yields_remote(base in generators::list(), remote in generators::list()) {
        let out = merge_lists(Some(&base), &base, &remote, ConflictPolicy::PreferNewer);
        prop_assert_eq!(&out.merged, &remote);
        prop_assert!(!out.has_conflict);
    }

    #[test]
    fn only_local_changed_yields_local(base in generators::card_in("a"), local in generators::card_in("a")) {
        let out = merge_cards(Some(&base), &local, &base, ConflictPolicy::PreferNewer);
        prop_assert_eq!(&out.merged, &local);
        prop_assert!(!out.has_conflict);
    }

    #[test]
    fn merged_title_comes_from_an_input(
        base in generators::list(),
        local in generators::list(),
        remote in generators::list(),
    ) {
        let out = merge_lists(Some(&base), &local, &remote, ConflictPolicy::PreferNewer);
        let title = &out.merged.title;
        prop_assert!(
            title == &base.title || title == &local.title || title == &remote.title
        );
    }

    #[test]
    fn move_keeps_orders_dense(
        board in generators::board(),
        pick in 0..8usize,
        target in any::<bool>(),
        index in 0..10usize,
    ) {
        let card_id = board.cards[pick % board.cards.len()].id.clone();
        let target_list_id = if target { "b" } else { "a" }.to_string();
        let intent = Intent::MoveCard {
            card_id,
            target_list_id,
            target_index: index,
        };
        let next = apply(&board, &intent, 999_999_999).unwrap();

        prop_assert_eq!(next.cards.len(), board.cards.len());
        for list in &next.lists {
            let orders: Vec<i64> = next
                .cards_in_list(&list.id)
                .iter()
                .map(|c| c.order)
                .collect();
            let expected: Vec<i64> = (0..orders.len() as i64).collect();
            prop_assert_eq!(orders, expected);
        }
    }
}
