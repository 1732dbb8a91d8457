//! Re-nesting built nodes by their logical parent.
//!
//! Objects, bones and libraries are first built as flat lists. The linker
//! then moves each node under the node built for its logical parent, using
//! a side map from domain id to node that lives for one rebuild.

use std::fmt;

use ahash::AHashMap;
use outliner_core::DomainId;

use crate::tree::{NodeId, ViewNode, ViewTree};

/// Last node registered for each domain id during one rebuild.
#[derive(Debug, Clone, Default)]
pub struct SideMap {
    nodes: AHashMap<DomainId, NodeId>,
}

impl SideMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `node` for `id`. A later registration replaces an earlier one.
    pub fn register(&mut self, id: DomainId, node: NodeId) {
        self.nodes.insert(id, node);
    }

    #[must_use]
    pub fn get(&self, id: DomainId) -> Option<NodeId> {
        self.nodes.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Why a re-parent was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The new parent is the node itself or one of its descendants.
    Cycle { child: NodeId, parent: NodeId },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { child, parent } => write!(
                f,
                "moving node {} under node {} would create a cycle",
                child.index(),
                parent.index()
            ),
        }
    }
}

impl std::error::Error for LinkError {}

/// Where a re-parented node lands among its new siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Append,
    Before(NodeId),
    After(NodeId),
}

/// Move `child` (with its subtree) under `parent`.
///
/// # Errors
///
/// Returns [`LinkError::Cycle`] when `parent` lies inside `child`'s subtree.
/// The tree is untouched in that case.
pub fn reparent(
    tree: &mut ViewTree,
    child: NodeId,
    parent: Option<NodeId>,
    placement: Placement,
) -> Result<(), LinkError> {
    if let Some(parent) = parent
        && tree.is_ancestor_or_self(child, parent)
    {
        return Err(LinkError::Cycle { child, parent });
    }

    tree.detach(child);
    let position = match placement {
        Placement::Append => None,
        Placement::Before(sibling) | Placement::After(sibling) => {
            let at = tree
                .children_of(parent)
                .iter()
                .position(|&node| node == sibling);
            let after = usize::from(matches!(placement, Placement::After(_)));
            at.map(|at| at + after)
        }
    };
    tree.attach(child, parent, position);
    Ok(())
}

/// Outcome of one [`link_children`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub moved: usize,
    pub cycles: usize,
}

impl std::ops::AddAssign for LinkStats {
    fn add_assign(&mut self, rhs: Self) {
        self.moved += rhs.moved;
        self.cycles += rhs.cycles;
    }
}

/// Re-nest the children of `parent` by their logical parent.
///
/// Nodes whose parent is unknown or was not built stay where they are. A
/// move that would close a cycle is skipped with a warning.
pub fn link_children(
    tree: &mut ViewTree,
    side_map: &SideMap,
    parent: Option<NodeId>,
    logical_parent: impl Fn(&ViewNode) -> Option<DomainId>,
) -> LinkStats {
    let mut stats = LinkStats::default();
    let snapshot = tree.children_of(parent).to_vec();
    for child in snapshot {
        let Some(target) = logical_parent(tree.node(child)).and_then(|id| side_map.get(id)) else {
            continue;
        };
        if tree.node(child).parent() == Some(target) {
            continue;
        }
        match reparent(tree, child, Some(target), Placement::Append) {
            Ok(()) => stats.moved += 1,
            Err(err) => {
                tracing::warn!(
                    target: "outliner.link",
                    node = %tree.node(child).key(),
                    error = %err,
                    "parent chain is cyclic; keeping node in place"
                );
                stats.cycles += 1;
            }
        }
    }
    stats
}
