//! Scenes mode and the scene/collection contents shared with other modes.

use std::borrow::Cow;

use outliner_core::{DomainId, DomainKind, ElementIndex, RecordKey, TypeTag, ViewMode};

use super::Builder;
use crate::tree::NodeId;

const SCENE_COLLECTION: &str = "Scene Collection";

pub(super) fn build(cx: &mut Builder<'_>) {
    let active = cx.graph.active_scene();
    for scene in cx.graph.ids_of_kind(DomainKind::Scene) {
        let Some(node) = cx.add_id(None, scene) else {
            continue;
        };
        if cx.first_view && Some(scene) == active {
            let record = cx.tree.node(node).record();
            cx.open(record);
        }
    }
}

/// View layers, master collection, objects and animation of a scene.
pub(super) fn add_scene_contents(cx: &mut Builder<'_>, node: NodeId, scene: DomainId) {
    let graph = cx.graph;

    let (layers, _) = cx.push(
        Some(node),
        RecordKey::new(TypeTag::RenderLayerBase, 0, Some(scene)),
        "View Layers",
        None,
    );
    for (index, name) in graph.scene_view_layers(scene).into_iter().enumerate() {
        cx.push(
            Some(layers),
            RecordKey::new(TypeTag::RenderLayer, clamp_index(index), Some(scene)),
            name,
            None,
        );
    }

    let (collections, _) = cx.push(
        Some(node),
        RecordKey::new(TypeTag::SceneCollectionBase, 0, Some(scene)),
        SCENE_COLLECTION,
        None,
    );
    if let Some(master) = graph.scene_master_collection(scene) {
        add_collection_contents(cx, collections, master);
    }

    let (objects, _) = cx.push(
        Some(node),
        RecordKey::new(TypeTag::SceneObjectsBase, 0, Some(scene)),
        "Objects",
        None,
    );
    for object in graph.scene_objects(scene) {
        cx.add_id(Some(objects), object);
    }
    cx.link_by_logical_parent(Some(objects));

    if graph.scene_is_animated(scene) {
        cx.push(
            Some(node),
            RecordKey::new(TypeTag::AnimData, 0, Some(scene)),
            "Animation",
            None,
        );
    }
}

/// Child collections and, outside scenes mode, the collection's objects.
pub(super) fn add_collection_contents(cx: &mut Builder<'_>, node: NodeId, collection: DomainId) {
    let graph = cx.graph;
    for child in graph.collection_children(collection) {
        cx.add_id(Some(node), child);
    }
    if cx.settings.mode != ViewMode::Scenes {
        for object in graph.collection_objects(collection) {
            cx.add_id(Some(node), object);
        }
    }
}

/// Display name of a collection node.
pub(super) fn collection_name(cx: &Builder<'_>, collection: DomainId) -> Cow<'static, str> {
    if cx.graph.is_master_collection(collection) {
        Cow::Borrowed(SCENE_COLLECTION)
    } else {
        cx.owned_name(collection)
    }
}

pub(super) fn clamp_index(index: usize) -> ElementIndex {
    ElementIndex::try_from(index).unwrap_or(ElementIndex::MAX)
}

#[cfg(test)]
mod tests {
    use outliner_core::{IdentityStore, ObjectKind, ViewSettings};

    use super::*;
    use crate::expand::ExpanderRegistry;
    use crate::memory::MemoryGraph;
    use crate::tree::ViewTree;

    fn scene_graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let (scene, master) = graph.add_scene("Scene");
        graph.add_view_layer(scene, "ViewLayer");
        let props = graph.add_collection("Props", master);
        let table = graph.add_object("Table", ObjectKind::Mesh, props);
        let cup = graph.add_object("Cup", ObjectKind::Mesh, props);
        graph.set_parent(cup, Some(table));
        graph.add_object("Camera", ObjectKind::Camera, master);
        graph
    }

    #[test]
    fn scene_layout_groups_and_parents() {
        let graph = scene_graph();
        let registry = ExpanderRegistry::new();
        let settings = ViewSettings::new(ViewMode::Scenes);
        let mut store = IdentityStore::new();
        let mut tree = ViewTree::new();
        store.reset_marks();
        Builder::new(&graph, &mut store, &settings, &registry, &mut tree)
            .first_view(true)
            .build();

        assert_eq!(
            tree.outline(),
            "Scene\n  View Layers\n    ViewLayer\n  Scene Collection\n    Props\n  Objects\n    Table\n      Cup\n    Camera\n"
        );
        let scene = tree.roots()[0];
        assert!(!store.flags(tree.node(scene).record()).contains(outliner_core::RecordFlags::CLOSED));
    }

    #[test]
    fn index_saturates() {
        assert_eq!(clamp_index(3), 3);
        assert_eq!(clamp_index(usize::MAX), ElementIndex::MAX);
    }
}
