//! Property-based invariant tests for the sorter.
//!
//! 1. Sorting any permutation of an object list yields the same names.
//! 2. A mixed list ending in an object comes out as non-objects
//!    (alphabetical) followed by objects (alphabetical).
//! 3. Sorting is idempotent.

use outliner::sort::sort_tree;
use outliner::tree::{NodeData, ViewTree};
use outliner_core::{DomainId, DomainKind, IdentityStore, RecordKey, TypeTag};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    object: bool,
}

fn entries(max_len: usize) -> impl Strategy<Value = Vec<Entry>> {
    proptest::collection::vec(("[a-d]{1,3}", any::<bool>()), 1..=max_len).prop_map(|raw| {
        raw.into_iter()
            .map(|(name, object)| Entry { name, object })
            .collect()
    })
}

fn build(list: &[Entry]) -> ViewTree {
    let mut store = IdentityStore::new();
    let mut tree = ViewTree::new();
    for (at, entry) in list.iter().enumerate() {
        let key = RecordKey::new(TypeTag::Id, 0, Some(DomainId::from_raw(at as u64)));
        let kind = if entry.object {
            DomainKind::Object
        } else {
            DomainKind::Material
        };
        tree.push(
            None,
            NodeData::new(key, store.claim_or_create(key), entry.name.clone()).with_kind(Some(kind)),
        );
    }
    tree
}

fn sorted(list: &[Entry]) -> Vec<Entry> {
    let mut tree = build(list);
    sort_tree(&mut tree);
    tree.roots()
        .iter()
        .map(|&id| Entry {
            name: tree.node(id).name().to_owned(),
            object: tree.node(id).is_object(),
        })
        .collect()
}

fn with_object_tail(mut list: Vec<Entry>) -> Vec<Entry> {
    list.push(Entry {
        name: "tail".into(),
        object: true,
    });
    list
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Permutation independence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn object_lists_sort_the_same_from_any_order(
        (original, shuffled) in entries(12)
            .prop_map(|list| list.into_iter().map(|e| Entry { object: true, ..e }).collect::<Vec<_>>())
            .prop_flat_map(|list| (Just(list.clone()), Just(list).prop_shuffle()))
    ) {
        prop_assert_eq!(sorted(&original), sorted(&shuffled));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Partition order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn non_objects_then_objects_each_alphabetical(list in entries(12).prop_map(with_object_tail)) {
        let out = sorted(&list);
        prop_assert_eq!(out.len(), list.len());

        let split = out.iter().position(|entry| entry.object).unwrap_or(out.len());
        prop_assert!(out[split..].iter().all(|entry| entry.object));
        prop_assert!(out[..split].windows(2).all(|pair| pair[0].name <= pair[1].name));
        prop_assert!(out[split..].windows(2).all(|pair| pair[0].name <= pair[1].name));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn sorting_twice_changes_nothing(list in entries(12).prop_map(with_object_tail)) {
        let once = sorted(&list);
        prop_assert_eq!(sorted(&once), once);
    }
}
