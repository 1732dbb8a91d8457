//! Orphans mode: blocks without real users, grouped by kind.

use outliner_core::{DomainKind, RecordKey, TypeTag};

use super::Builder;

pub(super) fn build(cx: &mut Builder<'_>) {
    let graph = cx.graph;
    let kinds: Vec<DomainKind> = match cx.settings.kind_filter {
        Some(kind) => vec![kind],
        None => DomainKind::ALL.to_vec(),
    };

    for kind in kinds {
        let orphans: Vec<_> = graph
            .ids_of_kind(kind)
            .into_iter()
            .filter(|&id| graph.real_users(id) == 0)
            .collect();
        if orphans.is_empty() {
            continue;
        }

        // With a kind filter the blocks are listed at the top level.
        let header = match cx.settings.kind_filter {
            Some(_) => None,
            None => {
                let (node, _) = cx.push(
                    None,
                    RecordKey::new(TypeTag::IdBase, kind as i16, None),
                    kind.plural(),
                    None,
                );
                Some(node)
            }
        };
        for id in orphans {
            cx.add_id(header, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use outliner_core::{IdentityStore, ViewMode, ViewSettings};

    use super::*;
    use crate::build::Builder;
    use crate::domain::ChildEntry;
    use crate::expand::ExpanderRegistry;
    use crate::memory::MemoryGraph;
    use crate::tree::ViewTree;

    fn graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let used = graph.add(DomainKind::Material, "Used");
        let unused = graph.add(DomainKind::Material, "Unused");
        let mesh = graph.add(DomainKind::Mesh, "Plane");
        let image = graph.add(DomainKind::Image, "Scratch");
        graph.add_component(mesh, ChildEntry::object(image));
        graph.set_users(used, 2);
        graph.set_users(unused, 0);
        graph.set_users(mesh, 0);
        graph.set_users(image, 1);
        graph
    }

    fn run(graph: &MemoryGraph, settings: &ViewSettings) -> ViewTree {
        let registry = ExpanderRegistry::new();
        let mut store = IdentityStore::new();
        let mut tree = ViewTree::new();
        store.reset_marks();
        Builder::new(graph, &mut store, settings, &registry, &mut tree).build();
        tree
    }

    #[test]
    fn headers_per_kind_without_subtrees() {
        let tree = run(&graph(), &ViewSettings::new(ViewMode::Orphans));
        assert_eq!(tree.outline(), "Meshes\n  Plane\nMaterials\n  Unused\n");
    }

    #[test]
    fn kind_filter_lists_flat_and_expanded() {
        let settings =
            ViewSettings::new(ViewMode::Orphans).with_kind_filter(Some(DomainKind::Mesh));
        let tree = run(&graph(), &settings);
        assert_eq!(tree.outline(), "Plane\n  Scratch\n");
    }
}
