//! Reflection browser: structs, their properties and array elements.
//!
//! The reflected graph is unbounded, so children are only built below open
//! nodes. A closed node with children is marked [`NodeFlags::LAZY_CLOSED`]
//! and filled in by [`materialize`] when it is opened.

use outliner_core::{DomainId, IdentityStore, MAX_ELEMENTS, RecordKey, TypeTag, ViewSettings};

use super::Builder;
use super::scenes::clamp_index;
use crate::domain::{DomainGraph, PropertyInfo, PropertyValue};
use crate::expand::ExpanderRegistry;
use crate::tree::{NodeFlags, NodeId, ViewTree};

pub(super) fn build(cx: &mut Builder<'_>) {
    let Some(root) = cx.graph.reflect_root() else {
        return;
    };
    // A root claimed for the first time opens itself.
    add_struct(cx, None, root, -1, true);
}

/// Add a struct node. Structs reached through a pointer start open.
fn add_struct(
    cx: &mut Builder<'_>,
    parent: Option<NodeId>,
    id: DomainId,
    index: i16,
    auto_open: bool,
) -> NodeId {
    let name = if cx.graph.contains(id) {
        cx.owned_name(id)
    } else {
        "(empty)".into()
    };
    let (node, claim) = cx.push(parent, RecordKey::new(TypeTag::RnaStruct, index, Some(id)), name, None);
    if auto_open && claim.created {
        cx.open(claim.record);
    }

    if cx.is_open(claim.record) {
        fill_struct(cx, node, id);
    } else if !cx.graph.struct_properties(id).is_empty() {
        cx.set_node_flag(node, NodeFlags::LAZY_CLOSED);
    }
    node
}

fn fill_struct(cx: &mut Builder<'_>, node: NodeId, id: DomainId) {
    cx.tree.node_mut(node).flags.remove(NodeFlags::LAZY_CLOSED);
    let properties = cx.graph.struct_properties(id);
    for (index, property) in properties.iter().enumerate().take(MAX_ELEMENTS) {
        if !property.hidden {
            add_property(cx, node, id, clamp_index(index), property);
        }
    }
}

fn add_property(
    cx: &mut Builder<'_>,
    parent: NodeId,
    owner: DomainId,
    index: i16,
    property: &PropertyInfo,
) {
    let (node, claim) = cx.push(
        Some(parent),
        RecordKey::new(TypeTag::RnaProperty, index, Some(owner)),
        property.name.clone(),
        None,
    );
    if cx.is_open(claim.record) {
        fill_property(cx, node, owner, property);
    } else if has_children(property) {
        cx.set_node_flag(node, NodeFlags::LAZY_CLOSED);
    }
}

fn has_children(property: &PropertyInfo) -> bool {
    match &property.value {
        PropertyValue::Pointer(target) => target.is_some(),
        PropertyValue::Collection(items) => !items.is_empty(),
        PropertyValue::Array { len, .. } => *len > 0,
        PropertyValue::Scalar => false,
    }
}

fn fill_property(cx: &mut Builder<'_>, node: NodeId, owner: DomainId, property: &PropertyInfo) {
    cx.tree.node_mut(node).flags.remove(NodeFlags::LAZY_CLOSED);
    match &property.value {
        PropertyValue::Pointer(Some(target)) => {
            add_struct(cx, Some(node), *target, -1, true);
        }
        PropertyValue::Collection(items) => {
            for (index, &item) in items.iter().enumerate().take(MAX_ELEMENTS) {
                add_struct(cx, Some(node), item, clamp_index(index), false);
            }
        }
        PropertyValue::Array { len, subtype } => {
            for index in 0..(*len).min(MAX_ELEMENTS) {
                let name = match subtype.item_char(index) {
                    Some(label) => label.to_string(),
                    None => (index + 1).to_string(),
                };
                cx.push(
                    Some(node),
                    RecordKey::new(TypeTag::RnaArrayElement, clamp_index(index), Some(owner)),
                    name,
                    None,
                );
            }
        }
        PropertyValue::Pointer(None) | PropertyValue::Scalar => {}
    }
}

/// Build the deferred children of a reflection node that was just opened.
///
/// Returns the number of nodes added.
pub(crate) fn materialize(
    graph: &dyn DomainGraph,
    store: &mut IdentityStore,
    settings: &ViewSettings,
    expanders: &ExpanderRegistry,
    tree: &mut ViewTree,
    node: NodeId,
) -> usize {
    let target = tree.node(node);
    if !target.flags.contains(NodeFlags::LAZY_CLOSED) {
        return 0;
    }
    let (tag, index) = (target.tag(), target.index());
    let Some(id) = target.id() else {
        return 0;
    };

    let mut cx = Builder::new(graph, store, settings, expanders, tree);
    match tag {
        TypeTag::RnaStruct => fill_struct(&mut cx, node, id),
        // Property nodes are keyed by the struct that owns them.
        TypeTag::RnaProperty => {
            let properties = graph.struct_properties(id);
            if let Some(property) = usize::try_from(index)
                .ok()
                .and_then(|at| properties.get(at))
            {
                fill_property(&mut cx, node, id, property);
            }
        }
        _ => {}
    }
    cx.stats.nodes
}

#[cfg(test)]
mod tests {
    use outliner_core::{RecordFlags, ViewMode};

    use super::*;
    use crate::domain::ArraySubtype;
    use crate::memory::MemoryGraph;

    fn graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let main = graph.add_struct("Blend Data");
        let world = graph.add_struct("World");
        let cube = graph.add_struct("Cube");
        graph.add_property(main, PropertyInfo::new("Worlds", PropertyValue::Collection(vec![world])));
        graph.add_property(main, PropertyInfo::new("Objects", PropertyValue::Collection(vec![cube])));
        graph.add_property(main, PropertyInfo::new("RNA", PropertyValue::Scalar).hidden());
        graph.add_property(
            cube,
            PropertyInfo::new(
                "Location",
                PropertyValue::Array {
                    len: 3,
                    subtype: ArraySubtype::Vector,
                },
            ),
        );
        graph.add_property(cube, PropertyInfo::new("Data", PropertyValue::Pointer(None)));
        graph.set_reflect_root(main);
        graph
    }

    fn run(graph: &MemoryGraph, store: &mut IdentityStore, first_view: bool) -> ViewTree {
        let registry = ExpanderRegistry::new();
        let settings = ViewSettings::new(ViewMode::DataApi);
        let mut tree = ViewTree::new();
        store.reset_marks();
        Builder::new(graph, store, &settings, &registry, &mut tree)
            .first_view(first_view)
            .build();
        tree
    }

    #[test]
    fn root_opens_and_properties_are_lazy() {
        let graph = graph();
        let mut store = IdentityStore::new();
        let tree = run(&graph, &mut store, true);
        assert_eq!(tree.outline(), "Blend Data\n  Worlds\n  Objects\n");
        let objects = tree.find(|node| node.name() == "Objects").unwrap();
        assert!(tree.node(objects).flags.contains(NodeFlags::LAZY_CLOSED));
    }

    #[test]
    fn opening_materializes_one_level() {
        let graph = graph();
        let mut store = IdentityStore::new();
        let mut tree = run(&graph, &mut store, true);
        let objects = tree.find(|node| node.name() == "Objects").unwrap();
        store.set_flags(tree.node(objects).record(), RecordFlags::CLOSED, false);

        let registry = ExpanderRegistry::new();
        let settings = ViewSettings::new(ViewMode::DataApi);
        let added = materialize(&graph, &mut store, &settings, &registry, &mut tree, objects);
        assert_eq!(added, 1);
        assert!(!tree.node(objects).flags.contains(NodeFlags::LAZY_CLOSED));
        let cube = tree.node(objects).children()[0];
        assert_eq!(tree.node(cube).name(), "Cube");
        // Collection items are not auto-opened.
        assert!(tree.node(cube).flags.contains(NodeFlags::LAZY_CLOSED));
    }

    #[test]
    fn open_records_rebuild_eagerly() {
        let graph = graph();
        let mut store = IdentityStore::new();
        let tree = run(&graph, &mut store, true);
        let objects = tree.find(|node| node.name() == "Objects").unwrap();
        store.set_flags(tree.node(objects).record(), RecordFlags::CLOSED, false);

        let tree = run(&graph, &mut store, false);
        let cube = tree.find(|node| node.name() == "Cube").unwrap();
        store.set_flags(tree.node(cube).record(), RecordFlags::CLOSED, false);
        let location = {
            let tree = run(&graph, &mut store, false);
            let location = tree.find(|node| node.name() == "Location").unwrap();
            store.set_flags(tree.node(location).record(), RecordFlags::CLOSED, false);
            tree.node(location).record()
        };
        let tree = run(&graph, &mut store, false);
        let node = tree.find_record(location).unwrap();
        let labels: Vec<_> = tree
            .node(node)
            .children()
            .iter()
            .map(|&child| tree.node(child).name().to_owned())
            .collect();
        assert_eq!(labels, ["X", "Y", "Z"]);
    }
}
