//! Ephemeral view tree rebuilt on every refresh.
//!
//! Nodes live in an arena addressed by [`NodeId`]. Parent links are plain
//! ids, so re-parenting is a detach plus an attach and never moves node
//! storage. A node removed by the filter stays in the arena as a dead slot
//! until the tree is dropped at the start of the next rebuild.
//!
//! # Example
//!
//! ```
//! use outliner::tree::{NodeData, ViewTree};
//! use outliner_core::{IdentityStore, RecordKey, TypeTag};
//!
//! let mut store = IdentityStore::new();
//! let mut tree = ViewTree::new();
//! let key = RecordKey::new(TypeTag::IdBase, 0, None);
//! let root = tree.push(None, NodeData::new(key, store.claim_or_create(key), "Current File"));
//! assert_eq!(tree.roots(), &[root]);
//! assert_eq!(tree.node(root).name(), "Current File");
//! ```

use std::borrow::Cow;

use bitflags::bitflags;
use outliner_core::{DomainId, DomainKind, ElementIndex, RecordKey, RecordRef, TypeTag};

/// Height of one row in layout units.
pub const ROW_HEIGHT: i32 = 20;

/// Index of a node in its [`ViewTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

bitflags! {
    /// Per-node state that only lives for one rebuild.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Children exist but were not built because the node is closed.
        const LAZY_CLOSED = 1 << 0;
        /// Shown greyed out (excluded layer collection).
        const DISABLED = 1 << 1;
    }
}

/// Everything needed to create a node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub key: RecordKey,
    pub record: RecordRef,
    pub name: Cow<'static, str>,
    pub kind: Option<DomainKind>,
    pub flags: NodeFlags,
}

impl NodeData {
    #[must_use]
    pub fn new(key: RecordKey, record: RecordRef, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key,
            record,
            name: name.into(),
            kind: None,
            flags: NodeFlags::empty(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: Option<DomainKind>) -> Self {
        self.kind = kind;
        self
    }
}

/// One displayed row.
#[derive(Debug, Clone)]
pub struct ViewNode {
    key: RecordKey,
    record: RecordRef,
    name: Cow<'static, str>,
    kind: Option<DomainKind>,
    pub flags: NodeFlags,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    ys: Option<i32>,
    alive: bool,
}

impl ViewNode {
    #[must_use]
    pub fn key(&self) -> RecordKey {
        self.key
    }

    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.key.tag()
    }

    #[must_use]
    pub fn index(&self) -> ElementIndex {
        self.key.index()
    }

    #[must_use]
    pub fn id(&self) -> Option<DomainId> {
        self.key.id()
    }

    /// Kind of the represented block, for plain domain-object nodes.
    #[must_use]
    pub fn kind(&self) -> Option<DomainKind> {
        self.kind
    }

    #[must_use]
    pub fn record(&self) -> RecordRef {
        self.record
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Top of the row after layout; `None` when hidden by a closed ancestor.
    #[must_use]
    pub fn ys(&self) -> Option<i32> {
        self.ys
    }

    /// A plain node for an object block.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.tag() == TypeTag::Id && self.kind == Some(DomainKind::Object)
    }

    /// A node that stands for a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.tag().is_collection_base()
            || (self.tag() == TypeTag::Id && self.kind == Some(DomainKind::Collection))
    }
}

/// Row of a flattened tree, for display and assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub node: NodeId,
    pub depth: usize,
    pub name: String,
}

/// Arena of [`ViewNode`]s plus the ordered top-level list.
#[derive(Debug, Clone, Default)]
pub struct ViewTree {
    nodes: Vec<ViewNode>,
    roots: Vec<NodeId>,
    live: usize,
}

impl ViewTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live nodes reachable from the roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// # Panics
    ///
    /// Panics if `id` did not come from this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ViewNode {
        &self.nodes[id.index()]
    }

    /// Node lookup that tolerates ids from an earlier tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ViewNode> {
        self.nodes.get(id.index()).filter(|node| node.alive)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ViewNode {
        &mut self.nodes[id.index()]
    }

    /// Children of `parent`, or the roots.
    #[must_use]
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(id) => &self.nodes[id.index()].children,
            None => &self.roots,
        }
    }

    pub(crate) fn children_of_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            Some(id) => &mut self.nodes[id.index()].children,
            None => &mut self.roots,
        }
    }

    /// Append a node as the last child of `parent` (or as a root).
    pub fn push(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ViewNode {
            key: data.key,
            record: data.record,
            name: data.name,
            kind: data.kind,
            flags: data.flags,
            parent,
            children: Vec::new(),
            ys: None,
            alive: true,
        });
        self.children_of_mut(parent).push(id);
        self.live += 1;
        id
    }

    /// Unhook `id` from its parent's child list. The node keeps its subtree.
    pub(crate) fn detach(&mut self, id: NodeId) {
        let parent = self.nodes[id.index()].parent;
        self.children_of_mut(parent).retain(|&child| child != id);
        self.nodes[id.index()].parent = None;
    }

    /// Hook a detached node under `parent` at `position` (append if `None`).
    pub(crate) fn attach(&mut self, id: NodeId, parent: Option<NodeId>, position: Option<usize>) {
        let list = self.children_of_mut(parent);
        match position {
            Some(at) if at <= list.len() => list.insert(at, id),
            _ => list.push(id),
        }
        self.nodes[id.index()].parent = parent;
    }

    /// Delete `id` and its whole subtree from the view.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        self.detach(id);
        self.free(id)
    }

    /// Set the child list of `parent` to `survivors` and delete the
    /// `dropped` subtrees, which must have been children of `parent`.
    pub(crate) fn prune_children(
        &mut self,
        parent: Option<NodeId>,
        survivors: Vec<NodeId>,
        dropped: &[NodeId],
    ) -> usize {
        *self.children_of_mut(parent) = survivors;
        let mut removed = 0;
        for &id in dropped {
            self.nodes[id.index()].parent = None;
            removed += self.free(id);
        }
        removed
    }

    fn free(&mut self, id: NodeId) -> usize {
        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(next) = stack.pop() {
            let node = &mut self.nodes[next.index()];
            if !node.alive {
                continue;
            }
            node.alive = false;
            removed += 1;
            stack.extend(node.children.iter().copied());
        }
        self.live -= removed;
        removed
    }

    /// Whether `ancestor` is `node` or lies on its parent chain.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            // A well-formed chain is never longer than the arena.
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes[id.index()].parent;
        }
        false
    }

    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.index()].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.index()].parent;
        }
        depth
    }

    /// Sibling after `id`, if any.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children_of(self.nodes[id.index()].parent);
        let at = siblings.iter().position(|&sibling| sibling == id)?;
        siblings.get(at + 1).copied()
    }

    /// Every live node in depth-first pre-order.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.live);
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev().copied());
        }
        out
    }

    /// Node built for `record` in this tree.
    #[must_use]
    pub fn find_record(&self, record: RecordRef) -> Option<NodeId> {
        self.preorder()
            .into_iter()
            .find(|&id| self.nodes[id.index()].record == record)
    }

    /// First node in pre-order matching `pred`.
    pub fn find(&self, mut pred: impl FnMut(&ViewNode) -> bool) -> Option<NodeId> {
        self.preorder()
            .into_iter()
            .find(|&id| pred(&self.nodes[id.index()]))
    }

    /// Assign row positions to every node reachable through open parents.
    ///
    /// Returns the total content height.
    pub fn layout(&mut self, is_open: impl Fn(&ViewNode) -> bool) -> i32 {
        for node in &mut self.nodes {
            node.ys = None;
        }
        let mut y = 0;
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id.index()];
            node.ys = Some(y);
            y += ROW_HEIGHT;
            if is_open(node) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        y
    }

    /// Visible node whose row covers `y`.
    #[must_use]
    pub fn item_at_y(&self, y: i32) -> Option<NodeId> {
        self.preorder().into_iter().find(|&id| {
            self.nodes[id.index()]
                .ys
                .is_some_and(|ys| ys <= y && y < ys + ROW_HEIGHT)
        })
    }

    /// Every live node with its depth, regardless of open state.
    #[must_use]
    pub fn flatten(&self) -> Vec<FlatRow> {
        self.preorder()
            .into_iter()
            .map(|id| FlatRow {
                node: id,
                depth: self.depth(id),
                name: self.nodes[id.index()].name.to_string(),
            })
            .collect()
    }

    /// Laid-out rows in display order.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<FlatRow> {
        let mut rows: Vec<(i32, FlatRow)> = self
            .preorder()
            .into_iter()
            .filter_map(|id| {
                let ys = self.nodes[id.index()].ys?;
                Some((
                    ys,
                    FlatRow {
                        node: id,
                        depth: self.depth(id),
                        name: self.nodes[id.index()].name.to_string(),
                    },
                ))
            })
            .collect();
        rows.sort_by_key(|(ys, _)| *ys);
        rows.into_iter().map(|(_, row)| row).collect()
    }

    /// Indented outline, one name per line. Handy in tests and logs.
    #[must_use]
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for row in self.flatten() {
            for _ in 0..row.depth {
                out.push_str("  ");
            }
            out.push_str(&row.name);
            out.push('\n');
        }
        out
    }
}
