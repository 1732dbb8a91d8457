//! Alphabetical ordering of sibling lists.
//!
//! Whether a list is sorted is decided by its last member: lists that end
//! in an object, a category header or a deform group are sorted, anything
//! else keeps build order. Category-header lists are sorted by name alone.
//! Mixed lists keep their leading unsortable entries (animation data and
//! similar headers) in place, then list non-objects before objects, each
//! group alphabetically.

use std::cmp::Ordering;

use outliner_core::TypeTag;

use crate::tree::{NodeId, ViewNode, ViewTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SortClass {
    /// Keeps its position.
    Unsorted,
    Header,
    Named,
    Object,
}

fn classify(node: &ViewNode) -> SortClass {
    match node.tag() {
        TypeTag::IdBase => SortClass::Header,
        TypeTag::Id if node.is_object() => SortClass::Object,
        TypeTag::Id | TypeTag::DeformGroup => SortClass::Named,
        _ => SortClass::Unsorted,
    }
}

fn by_name(tree: &ViewTree, a: NodeId, b: NodeId) -> Ordering {
    tree.node(a).name().cmp(tree.node(b).name())
}

/// Sort every sibling list in the tree.
pub fn sort_tree(tree: &mut ViewTree) {
    let mut stack = vec![None];
    while let Some(parent) = stack.pop() {
        sort_list(tree, parent);
        stack.extend(tree.children_of(parent).iter().map(|&child| Some(child)));
    }
}

fn sort_list(tree: &mut ViewTree, parent: Option<NodeId>) {
    let list = tree.children_of(parent);
    if list.len() < 2 {
        return;
    }
    let Some(&last) = list.last() else {
        return;
    };
    let last_class = classify(tree.node(last));
    let sortable = matches!(last_class, SortClass::Object | SortClass::Header)
        || tree.node(last).tag() == TypeTag::DeformGroup;
    if !sortable {
        return;
    }

    let mut sorted = list.to_vec();
    if classify(tree.node(sorted[0])) == SortClass::Header {
        sorted.sort_by(|&a, &b| by_name(tree, a, b));
    } else {
        let skip = sorted
            .iter()
            .take_while(|&&id| classify(tree.node(id)) == SortClass::Unsorted)
            .count();
        let rest = &mut sorted[skip..];
        // Stable: equal names keep build order.
        rest.sort_by(|&a, &b| {
            let a_object = tree.node(a).is_object();
            let b_object = tree.node(b).is_object();
            a_object
                .cmp(&b_object)
                .then_with(|| by_name(tree, a, b))
        });
    }
    *tree.children_of_mut(parent) = sorted;
}
