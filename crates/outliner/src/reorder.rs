//! Drag-and-drop re-parenting of collections and objects.
//!
//! A drop is polled first: the dragged node and the drop target decide
//! whether the move is allowed and may adjust the action. An accepted drop
//! is applied to the domain graph and mirrored in the view through the
//! linker, so the tree stays valid until the next rebuild replaces it.

use std::fmt;

use outliner_core::{DomainId, DomainKind, IdentityStore, RecordFlags, TypeTag};

use crate::domain::{DomainGraph, DomainGraphMut};
use crate::link::{self, LinkError, Placement};
use crate::tree::{NodeId, ViewTree};

/// Where the dragged node lands relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropAction {
    Before,
    After,
    Into,
}

/// Why a drop was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropError {
    /// The node or target is not part of the current tree.
    StaleNode,
    /// Only collections and objects can be dragged.
    NotDraggable,
    /// The target cannot receive the dragged node.
    InvalidTarget,
    /// The master collection never moves.
    MasterCollection,
    /// The domain graph refused the move.
    Rejected,
    Link(LinkError),
}

impl fmt::Display for DropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleNode => write!(f, "node is not part of the current tree"),
            Self::NotDraggable => write!(f, "only collections and objects can be moved"),
            Self::InvalidTarget => write!(f, "drop target cannot receive this node"),
            Self::MasterCollection => write!(f, "the master collection cannot be moved"),
            Self::Rejected => write!(f, "domain graph refused the move"),
            Self::Link(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DropError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Link(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LinkError> for DropError {
    fn from(err: LinkError) -> Self {
        Self::Link(err)
    }
}

/// Collection a node stands for.
pub fn node_collection<G: DomainGraph + ?Sized>(
    tree: &ViewTree,
    graph: &G,
    node: NodeId,
) -> Option<DomainId> {
    let n = tree.node(node);
    match n.tag() {
        TypeTag::Id if n.kind() == Some(DomainKind::Collection) => n.id(),
        TypeTag::LayerCollection => n.id(),
        TypeTag::SceneCollectionBase | TypeTag::ViewCollectionBase => {
            n.id().and_then(|scene| graph.scene_master_collection(scene))
        }
        _ => None,
    }
}

/// Nearest ancestor of `node` that stands for a collection.
fn parent_collection<G: DomainGraph + ?Sized>(
    tree: &ViewTree,
    graph: &G,
    node: NodeId,
) -> Option<DomainId> {
    let mut current = tree.node(node).parent();
    while let Some(at) = current {
        if let Some(collection) = node_collection(tree, graph, at) {
            return Some(collection);
        }
        current = tree.node(at).parent();
    }
    None
}

/// Check a drop and normalize its target and action.
///
/// # Errors
///
/// Returns the reason the drop is not allowed.
pub fn poll<G: DomainGraph + ?Sized>(
    tree: &ViewTree,
    graph: &G,
    node: NodeId,
    target: NodeId,
    action: DropAction,
) -> Result<(NodeId, DropAction), DropError> {
    if tree.get(node).is_none() || tree.get(target).is_none() {
        return Err(DropError::StaleNode);
    }
    let dragged = tree.node(node);

    if dragged.is_collection() {
        let collection = node_collection(tree, graph, node).ok_or(DropError::NotDraggable)?;
        if graph.is_master_collection(collection) {
            return Err(DropError::MasterCollection);
        }
        let handle = node_collection(tree, graph, target).ok_or(DropError::InvalidTarget)?;
        if !graph.is_master_collection(handle) {
            return Ok((target, action));
        }
        return Ok(match action {
            // Nothing sits above the master collection.
            DropAction::Before | DropAction::Into => (target, DropAction::Into),
            DropAction::After => match tree.node(target).children().last() {
                Some(&last) if last != node => (last, DropAction::After),
                _ => (target, DropAction::Into),
            },
        });
    }

    if dragged.is_object() {
        if tree.node(target).is_collection() && dragged.parent() != Some(target) {
            return Ok((target, DropAction::Into));
        }
        return Err(DropError::InvalidTarget);
    }

    Err(DropError::NotDraggable)
}

/// Apply a polled drop. Returns the number of nodes moved in the view.
///
/// # Errors
///
/// Fails when the poll fails, when the move would nest a collection inside
/// itself, or when the domain graph refuses.
pub fn apply<G: DomainGraphMut + ?Sized>(
    tree: &mut ViewTree,
    store: &mut IdentityStore,
    graph: &mut G,
    node: NodeId,
    target: NodeId,
    action: DropAction,
) -> Result<usize, DropError> {
    let (handle, action) = poll(tree, &*graph, node, target, action)?;

    let moved = if tree.node(node).is_collection() {
        move_collection(tree, graph, node, handle, action)?
    } else {
        move_objects(tree, store, graph, node, handle)?
    };
    graph.tag_changed();
    tracing::debug!(
        target: "outliner.reorder",
        node = %tree.node(node).key(),
        onto = %tree.node(handle).key(),
        ?action,
        moved,
        "drop applied"
    );
    Ok(moved)
}

fn move_collection<G: DomainGraphMut + ?Sized>(
    tree: &mut ViewTree,
    graph: &mut G,
    node: NodeId,
    handle: NodeId,
    action: DropAction,
) -> Result<usize, DropError> {
    let view = &*graph;
    let collection = node_collection(tree, view, node).ok_or(DropError::NotDraggable)?;
    let from = tree
        .node(node)
        .parent()
        .and_then(|parent| node_collection(tree, view, parent));

    let (view_parent, placement, to, relative) = match action {
        DropAction::Into => (
            Some(handle),
            Placement::Append,
            node_collection(tree, view, handle),
            None,
        ),
        DropAction::Before | DropAction::After => {
            let parent = tree.node(handle).parent();
            let after = action == DropAction::After;
            let placement = if after {
                Placement::After(handle)
            } else {
                Placement::Before(handle)
            };
            (
                parent,
                placement,
                parent.and_then(|p| node_collection(tree, view, p)),
                node_collection(tree, view, handle).map(|relative| (relative, after)),
            )
        }
    };
    let to = to.ok_or(DropError::InvalidTarget)?;

    if let Some(parent) = view_parent
        && tree.is_ancestor_or_self(node, parent)
    {
        return Err(LinkError::Cycle {
            child: node,
            parent,
        }
        .into());
    }
    if !graph.move_collection(collection, from, to, relative) {
        return Err(DropError::Rejected);
    }
    link::reparent(tree, node, view_parent, placement)?;
    Ok(1)
}

fn move_objects<G: DomainGraphMut + ?Sized>(
    tree: &mut ViewTree,
    store: &mut IdentityStore,
    graph: &mut G,
    node: NodeId,
    handle: NodeId,
) -> Result<usize, DropError> {
    let to = node_collection(tree, &*graph, handle).ok_or(DropError::InvalidTarget)?;

    // Every selected object moves along with the dragged one.
    let selected: Vec<NodeId> = tree
        .preorder()
        .into_iter()
        .filter(|&id| {
            let n = tree.node(id);
            n.is_object() && (id == node || store.flags(n.record()).contains(RecordFlags::SELECTED))
        })
        .collect();

    let mut moved = 0;
    for object_node in selected {
        let Some(object) = tree.node(object_node).id() else {
            continue;
        };
        if tree.is_ancestor_or_self(object_node, handle) {
            continue;
        }
        // Rows outside any collection row (scene object lists, flat object
        // views) take their source collection from the graph and stay put.
        let shown_in = parent_collection(tree, &*graph, object_node);
        let Some(from) =
            shown_in.or_else(|| owning_collection(tree, &*graph, object_node, object))
        else {
            tracing::debug!(
                target: "outliner.reorder",
                object = %object,
                "no collection holds the dragged object"
            );
            continue;
        };
        if from == to {
            continue;
        }
        if !graph.move_object(object, Some(from), to) {
            tracing::debug!(
                target: "outliner.reorder",
                object = %object,
                "domain graph refused object move"
            );
            continue;
        }
        if shown_in.is_some() {
            link::reparent(tree, object_node, Some(handle), Placement::Append)?;
        }
        moved += 1;
    }
    if moved == 0 {
        return Err(DropError::Rejected);
    }
    store.set_flags(tree.node(node).record(), RecordFlags::SELECTED, true);
    Ok(moved)
}

/// Scene the row sits under, or the active scene.
fn row_scene<G: DomainGraph + ?Sized>(tree: &ViewTree, graph: &G, node: NodeId) -> Option<DomainId> {
    let mut current = tree.node(node).parent();
    while let Some(at) = current {
        let n = tree.node(at);
        if n.tag() == TypeTag::SceneObjectsBase || n.kind() == Some(DomainKind::Scene) {
            return n.id();
        }
        current = n.parent();
    }
    graph.active_scene()
}

/// First collection of the row's scene that holds `object`, master first.
fn owning_collection<G: DomainGraph + ?Sized>(
    tree: &ViewTree,
    graph: &G,
    node: NodeId,
    object: DomainId,
) -> Option<DomainId> {
    let master = row_scene(tree, graph, node).and_then(|scene| graph.scene_master_collection(scene))?;
    let mut stack = vec![master];
    let mut seen = Vec::new();
    while let Some(at) = stack.pop() {
        if seen.contains(&at) {
            continue;
        }
        seen.push(at);
        if graph.collection_objects(at).contains(&object) {
            return Some(at);
        }
        stack.extend(graph.collection_children(at).into_iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use crate::outliner::Outliner;
    use outliner_core::{ObjectKind, ViewMode, ViewSettings};

    struct Fixture {
        graph: MemoryGraph,
        master: DomainId,
        props: DomainId,
        lights: DomainId,
        outliner: Outliner,
    }

    fn fixture() -> Fixture {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let props = graph.add_collection("Props", master);
        graph.add_collection("Crates", props);
        graph.add_object("Table", ObjectKind::Mesh, props);
        let lights = graph.add_collection("Lights", master);
        graph.add_object("Lamp", ObjectKind::Light, lights);
        graph.add_object("Camera", ObjectKind::Camera, master);
        let mut outliner = Outliner::default();
        outliner.rebuild(&graph, true);
        Fixture {
            graph,
            master,
            props,
            lights,
            outliner,
        }
    }

    fn node(outliner: &Outliner, name: &str) -> NodeId {
        outliner.tree().find(|node| node.name() == name).unwrap()
    }

    fn child_names(outliner: &Outliner, parent: &str) -> Vec<String> {
        let tree = outliner.tree();
        tree.node(node(outliner, parent))
            .children()
            .iter()
            .map(|&child| tree.node(child).name().to_owned())
            .collect()
    }

    #[test]
    fn collection_before_sibling() {
        let mut fx = fixture();
        let lights = node(&fx.outliner, "Lights");
        let props = node(&fx.outliner, "Props");
        fx.outliner
            .drop_node(&mut fx.graph, lights, props, DropAction::Before)
            .unwrap();
        assert_eq!(fx.graph.collection_children(fx.master), vec![fx.lights, fx.props]);
        assert_eq!(
            child_names(&fx.outliner, "Scene Collection"),
            ["Lights", "Props", "Camera"]
        );
        assert_eq!(fx.graph.changes(), 1);
        assert!(fx.outliner.is_dirty());
    }

    #[test]
    fn master_collection_is_fixed() {
        let mut fx = fixture();
        let root = node(&fx.outliner, "Scene Collection");
        let props = node(&fx.outliner, "Props");
        assert_eq!(
            fx.outliner.drop_node(&mut fx.graph, root, props, DropAction::Into),
            Err(DropError::MasterCollection)
        );
        assert_eq!(fx.graph.changes(), 0);
    }

    #[test]
    fn before_master_becomes_into() {
        let fx = fixture();
        let root = node(&fx.outliner, "Scene Collection");
        let crates = node(&fx.outliner, "Crates");
        let polled = poll(fx.outliner.tree(), &fx.graph, crates, root, DropAction::Before);
        assert_eq!(polled, Ok((root, DropAction::Into)));
    }

    #[test]
    fn after_master_lands_after_last_child() {
        let mut fx = fixture();
        let root = node(&fx.outliner, "Scene Collection");
        let props = node(&fx.outliner, "Props");
        let camera = node(&fx.outliner, "Camera");
        assert_eq!(
            poll(fx.outliner.tree(), &fx.graph, props, root, DropAction::After),
            Ok((camera, DropAction::After))
        );
        fx.outliner
            .drop_node(&mut fx.graph, props, root, DropAction::After)
            .unwrap();
        assert_eq!(
            child_names(&fx.outliner, "Scene Collection"),
            ["Lights", "Camera", "Props"]
        );
        assert_eq!(fx.graph.collection_children(fx.master), vec![fx.lights, fx.props]);
    }

    #[test]
    fn collection_into_own_child_is_a_cycle() {
        let mut fx = fixture();
        let props = node(&fx.outliner, "Props");
        let crates = node(&fx.outliner, "Crates");
        let err = fx
            .outliner
            .drop_node(&mut fx.graph, props, crates, DropAction::Into)
            .unwrap_err();
        assert!(matches!(err, DropError::Link(LinkError::Cycle { .. })));
        assert_eq!(fx.graph.collection_children(fx.master), vec![fx.props, fx.lights]);
    }

    #[test]
    fn object_into_collection() {
        let mut fx = fixture();
        let table = node(&fx.outliner, "Table");
        let lights = node(&fx.outliner, "Lights");
        let moved = fx
            .outliner
            .drop_node(&mut fx.graph, table, lights, DropAction::Before)
            .unwrap();
        assert_eq!(moved, 1);
        assert!(fx.graph.collection_objects(fx.props).is_empty());
        assert_eq!(fx.graph.collection_objects(fx.lights).len(), 2);
        assert_eq!(child_names(&fx.outliner, "Lights"), ["Lamp", "Table"]);
        assert!(fx.outliner.flags(table).contains(RecordFlags::SELECTED));
    }

    #[test]
    fn selected_objects_move_together() {
        let mut fx = fixture();
        let camera = node(&fx.outliner, "Camera");
        let table = node(&fx.outliner, "Table");
        let lights = node(&fx.outliner, "Lights");
        fx.outliner.set_selected(camera, true);
        let moved = fx
            .outliner
            .drop_node(&mut fx.graph, table, lights, DropAction::Into)
            .unwrap();
        assert_eq!(moved, 2);
        assert_eq!(child_names(&fx.outliner, "Lights"), ["Lamp", "Table", "Camera"]);
        assert!(fx.graph.collection_objects(fx.master).is_empty());
    }

    #[test]
    fn object_targets_must_be_other_collections() {
        let mut fx = fixture();
        let table = node(&fx.outliner, "Table");
        let props = node(&fx.outliner, "Props");
        let camera = node(&fx.outliner, "Camera");
        for target in [props, camera] {
            assert_eq!(
                fx.outliner.drop_node(&mut fx.graph, table, target, DropAction::Into),
                Err(DropError::InvalidTarget)
            );
        }
    }

    #[test]
    fn refused_drop_leaves_selection_alone() {
        let mut fx = fixture();
        let table = fx.outliner.tree().node(node(&fx.outliner, "Table")).id().unwrap();
        let cup = fx.graph.add_object("Cup", ObjectKind::Mesh, fx.props);
        fx.graph.set_parent(cup, Some(table));
        fx.outliner.rebuild(&fx.graph, true);

        let cup_row = node(&fx.outliner, "Cup");
        let props = node(&fx.outliner, "Props");
        assert_eq!(
            fx.outliner.drop_node(&mut fx.graph, cup_row, props, DropAction::Into),
            Err(DropError::Rejected)
        );
        assert!(!fx.outliner.flags(cup_row).contains(RecordFlags::SELECTED));
        assert_eq!(fx.graph.changes(), 0);
    }

    #[test]
    fn scene_object_list_drop_moves_from_owner() {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let props = graph.add_collection("Props", master);
        let camera = graph.add_object("Camera", ObjectKind::Camera, master);
        let mut outliner = Outliner::new(ViewSettings::new(ViewMode::Scenes));
        outliner.rebuild(&graph, true);

        let camera_row = node(&outliner, "Camera");
        let props_row = node(&outliner, "Props");
        assert_eq!(
            outliner.drop_node(&mut graph, camera_row, props_row, DropAction::Into),
            Ok(1)
        );
        assert!(graph.collection_objects(master).is_empty());
        assert_eq!(graph.collection_objects(props), vec![camera]);
        // The scene's object list still holds the row; the collection row
        // never lists objects in this mode.
        assert_eq!(child_names(&outliner, "Objects"), ["Camera"]);
        assert!(child_names(&outliner, "Props").is_empty());

        outliner.rebuild(&graph, true);
        assert_eq!(child_names(&outliner, "Objects"), ["Camera"]);
        assert!(child_names(&outliner, "Props").is_empty());
    }
}
