//! View layer mode: layer collections with their objects, or a flat list of
//! object bases.

use outliner_core::{FilterFlags, RecordKey, TypeTag};

use super::Builder;
use super::scenes::collection_name;
use crate::domain::LayerCollectionInfo;
use crate::tree::{NodeFlags, NodeId};

pub(super) fn build(cx: &mut Builder<'_>) {
    let graph = cx.graph;

    if cx.settings.filter.contains(FilterFlags::NO_COLLECTION) {
        for object in graph.view_layer_objects() {
            cx.add_id(None, object);
        }
        cx.link_by_logical_parent(None);
        return;
    }

    let Some(scene) = graph.active_scene() else {
        return;
    };
    let (root, claim) = cx.push(
        None,
        RecordKey::new(TypeTag::ViewCollectionBase, 0, Some(scene)),
        "Scene Collection",
        None,
    );
    cx.open(claim.record);

    // The master layer collection itself is represented by `root`.
    let Some(master) = graph.layer_collections() else {
        return;
    };
    let show_objects = !cx.settings.filter.contains(FilterFlags::NO_OBJECT);
    add_layer_collections(cx, root, &master.children, show_objects);
    if show_objects {
        add_objects(cx, root, &master);
    }
}

fn add_layer_collections(
    cx: &mut Builder<'_>,
    parent: NodeId,
    layers: &[LayerCollectionInfo],
    show_objects: bool,
) {
    for layer in layers {
        if !cx.check_live(layer.collection) {
            continue;
        }
        let name = collection_name(cx, layer.collection);
        let (node, _) = cx.push(
            Some(parent),
            RecordKey::new(TypeTag::LayerCollection, 0, Some(layer.collection)),
            name,
            None,
        );
        if layer.excluded {
            cx.set_node_flag(node, NodeFlags::DISABLED);
        }
        add_layer_collections(cx, node, &layer.children, show_objects);
        if show_objects && !layer.excluded {
            add_objects(cx, node, layer);
        }
    }
}

fn add_objects(cx: &mut Builder<'_>, parent: NodeId, layer: &LayerCollectionInfo) {
    for object in cx.graph.collection_objects(layer.collection) {
        cx.add_id(Some(parent), object);
    }
}

#[cfg(test)]
mod tests {
    use outliner_core::{IdentityStore, ObjectKind, ViewMode, ViewSettings};

    use super::*;
    use crate::build::Builder;
    use crate::expand::ExpanderRegistry;
    use crate::memory::MemoryGraph;
    use crate::tree::ViewTree;

    fn run(graph: &MemoryGraph, settings: &ViewSettings) -> ViewTree {
        let registry = ExpanderRegistry::new();
        let mut store = IdentityStore::new();
        let mut tree = ViewTree::new();
        store.reset_marks();
        Builder::new(graph, &mut store, settings, &registry, &mut tree).build();
        tree
    }

    fn graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let set = graph.add_collection("Set", master);
        let hidden = graph.add_collection("Hidden", master);
        let floor = graph.add_object("Floor", ObjectKind::Mesh, set);
        let lamp = graph.add_object("Lamp", ObjectKind::Light, set);
        graph.set_parent(lamp, Some(floor));
        graph.add_object("Ghost", ObjectKind::Empty, hidden);
        graph.add_object("Camera", ObjectKind::Camera, master);
        graph.exclude_collection(hidden, true);
        graph
    }

    #[test]
    fn layer_collections_with_objects() {
        let tree = run(&graph(), &ViewSettings::new(ViewMode::ViewLayer));
        assert_eq!(
            tree.outline(),
            "Scene Collection\n  Set\n    Floor\n    Lamp\n  Hidden\n  Camera\n"
        );
        let hidden = tree.find(|node| node.name() == "Hidden").unwrap();
        assert!(tree.node(hidden).flags.contains(NodeFlags::DISABLED));
    }

    #[test]
    fn no_object_keeps_collections_only() {
        let settings = ViewSettings::new(ViewMode::ViewLayer).with_filter(FilterFlags::NO_OBJECT);
        let tree = run(&graph(), &settings);
        assert_eq!(tree.outline(), "Scene Collection\n  Set\n  Hidden\n");
    }

    #[test]
    fn flat_bases_are_parent_linked() {
        let settings =
            ViewSettings::new(ViewMode::ViewLayer).with_filter(FilterFlags::NO_COLLECTION);
        let tree = run(&graph(), &settings);
        assert_eq!(tree.outline(), "Floor\n  Lamp\nCamera\n");
    }
}
