//! Libraries mode: the current file and every linked library, each with
//! the blocks it provides grouped by kind.
//!
//! A library pulled in only indirectly is moved under the library that
//! linked it. One that is also linked directly stays at the top level and
//! gets a second copy under its parent.

use outliner_core::{DomainId, DomainKind, RecordKey, TypeTag};

use super::Builder;
use crate::link::{self, Placement};
use crate::tree::NodeId;

pub(super) fn build(cx: &mut Builder<'_>) {
    let graph = cx.graph;

    add_library_contents(cx, None, None);

    let libraries = graph.ids_of_kind(DomainKind::Library);
    let mut built: Vec<(DomainId, NodeId)> = Vec::new();
    for &library in &libraries {
        if let Some(node) = add_library_contents(cx, None, Some(library)) {
            cx.side_map.register(library, node);
            built.push((library, node));
        }
    }

    for (library, node) in built {
        let Some(link) = graph.library_link(library) else {
            continue;
        };
        let Some(parent) = link.parent.and_then(|p| cx.side_map.get(p)) else {
            continue;
        };
        if link.indirect {
            match link::reparent(cx.tree, node, Some(parent), Placement::Append) {
                Ok(()) => cx.stats.links.moved += 1,
                Err(err) => {
                    tracing::warn!(
                        target: "outliner.link",
                        library = %library,
                        error = %err,
                        "library chain is cyclic; keeping it at the top level"
                    );
                    cx.stats.links.cycles += 1;
                }
            }
        } else {
            add_library_contents(cx, Some(parent), Some(library));
        }
    }
}

/// Whether `id` belongs in the listing of `library`.
fn shows(cx: &Builder<'_>, library: Option<DomainId>, id: DomainId) -> bool {
    if cx.graph.owner_library(id) != library {
        return false;
    }
    // Filtered to collections: only list top-level ones.
    if cx.settings.kind_filter == Some(DomainKind::Collection) {
        return cx
            .graph
            .collection_parents(id)
            .into_iter()
            .all(|parent| cx.graph.is_master_collection(parent));
    }
    true
}

/// Add the node for `library` (the current file when `None`) with its
/// blocks. Nothing is added when the library provides no blocks.
fn add_library_contents(
    cx: &mut Builder<'_>,
    parent: Option<NodeId>,
    library: Option<DomainId>,
) -> Option<NodeId> {
    let graph = cx.graph;
    let kinds: Vec<DomainKind> = match cx.settings.kind_filter {
        Some(kind) => vec![kind],
        None => DomainKind::ALL
            .into_iter()
            .filter(|&kind| kind != DomainKind::Library)
            .collect(),
    };

    let mut library_node: Option<NodeId> = None;
    for kind in kinds {
        let ids: Vec<DomainId> = graph
            .ids_of_kind(kind)
            .into_iter()
            .filter(|&id| shows(cx, library, id))
            .collect();
        if ids.is_empty() {
            continue;
        }

        let owner = match library_node {
            Some(node) => node,
            None => {
                let node = match library {
                    Some(library) => {
                        let name = cx.owned_name(library);
                        cx.push(
                            parent,
                            RecordKey::new(TypeTag::Id, 0, Some(library)),
                            name,
                            Some(DomainKind::Library),
                        )
                        .0
                    }
                    None => {
                        let (node, claim) = cx.push(
                            parent,
                            RecordKey::new(TypeTag::IdBase, -1, None),
                            "Current File",
                            None,
                        );
                        if claim.created {
                            cx.open(claim.record);
                        }
                        node
                    }
                };
                library_node = Some(node);
                node
            }
        };

        let list = match cx.settings.kind_filter {
            Some(_) => owner,
            None => {
                cx.push(
                    Some(owner),
                    RecordKey::new(TypeTag::IdBase, kind as i16, library),
                    kind.plural(),
                    None,
                )
                .0
            }
        };
        for id in ids {
            cx.add_id(Some(list), id);
        }
    }
    library_node
}
