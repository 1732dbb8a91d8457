//! Tree builder: walks the domain graph and produces a fresh [`ViewTree`].
//!
//! Every node claims its persistent record as it is created, so open and
//! selection state follow the node from one rebuild to the next. Each view
//! mode lives in its own submodule and shares the element helpers below.

mod library;
mod orphans;
mod reflection;
mod scenes;
mod sequencer;
mod view_layer;

use std::borrow::Cow;

use outliner_core::{
    Claim, DomainId, DomainKind, IdentityStore, RecordFlags, RecordKey, RecordRef, TypeTag,
    ViewMode, ViewSettings,
};

use crate::domain::{ChildEntry, DomainGraph};
use crate::expand::ExpanderRegistry;
use crate::link::{self, LinkStats, SideMap};
use crate::tree::{NodeData, NodeFlags, NodeId, ViewNode, ViewTree};

pub(crate) use reflection::materialize;

/// Counters collected while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Nodes created.
    pub nodes: usize,
    /// Children skipped because their domain object was gone.
    pub skipped: usize,
    pub links: LinkStats,
}

/// One rebuild's worth of builder state.
pub(crate) struct Builder<'a> {
    graph: &'a dyn DomainGraph,
    store: &'a mut IdentityStore,
    settings: &'a ViewSettings,
    expanders: &'a ExpanderRegistry,
    tree: &'a mut ViewTree,
    side_map: SideMap,
    searching: bool,
    first_view: bool,
    stats: BuildStats,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(
        graph: &'a dyn DomainGraph,
        store: &'a mut IdentityStore,
        settings: &'a ViewSettings,
        expanders: &'a ExpanderRegistry,
        tree: &'a mut ViewTree,
    ) -> Self {
        Self {
            graph,
            store,
            settings,
            expanders,
            tree,
            side_map: SideMap::new(),
            searching: settings.recursive_search(),
            first_view: false,
            stats: BuildStats::default(),
        }
    }

    /// Open the mode's landing node: the store had no records before.
    pub(crate) fn first_view(mut self, first_view: bool) -> Self {
        self.first_view = first_view;
        self
    }

    /// Populate the tree for the configured mode.
    pub(crate) fn build(mut self) -> BuildStats {
        match self.settings.mode {
            ViewMode::Libraries => library::build(&mut self),
            ViewMode::Scenes => scenes::build(&mut self),
            ViewMode::Sequencer => sequencer::build(&mut self),
            ViewMode::DataApi => reflection::build(&mut self),
            ViewMode::Orphans => orphans::build(&mut self),
            ViewMode::ViewLayer => view_layer::build(&mut self),
        }
        self.stats
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    fn claim(&mut self, key: RecordKey) -> Claim {
        let claim = self.store.claim(key);
        self.store
            .set_flags(claim.record, RecordFlags::CHILD_SEARCH, self.searching);
        if !self.settings.is_searching() {
            self.store
                .set_flags(claim.record, RecordFlags::SEARCH_MATCH, false);
        }
        claim
    }

    fn is_open(&self, record: RecordRef) -> bool {
        self.store.flags(record).is_open(self.searching)
    }

    fn open(&mut self, record: RecordRef) {
        self.store.set_flags(record, RecordFlags::CLOSED, false);
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    /// Claim a record and append a node for it.
    fn push(
        &mut self,
        parent: Option<NodeId>,
        key: RecordKey,
        name: impl Into<Cow<'static, str>>,
        kind: Option<DomainKind>,
    ) -> (NodeId, Claim) {
        let claim = self.claim(key);
        let node = self.tree.push(
            parent,
            NodeData::new(key, claim.record, name).with_kind(kind),
        );
        self.stats.nodes += 1;
        (node, claim)
    }

    /// Whether `id` can still be shown. Records a skip otherwise.
    fn check_live(&mut self, id: DomainId) -> bool {
        if self.graph.contains(id) {
            return true;
        }
        self.stats.skipped += 1;
        tracing::warn!(
            target: "outliner.build",
            id = %id,
            "skipping child whose domain object is gone"
        );
        false
    }

    fn owned_name(&self, id: DomainId) -> Cow<'static, str> {
        Cow::Owned(self.graph.name(id).unwrap_or_default().to_owned())
    }

    /// Add a plain domain-object node and expand it.
    fn add_id(&mut self, parent: Option<NodeId>, id: DomainId) -> Option<NodeId> {
        let name = self.owned_name(id);
        self.add_id_named(parent, id, name)
    }

    fn add_id_named(
        &mut self,
        parent: Option<NodeId>,
        id: DomainId,
        name: Cow<'static, str>,
    ) -> Option<NodeId> {
        if !self.check_live(id) {
            return None;
        }
        let kind = self.graph.kind(id);
        let (node, _) = self.push(parent, RecordKey::new(TypeTag::Id, 0, Some(id)), name, kind);
        if kind == Some(DomainKind::Object) {
            self.side_map.register(id, node);
        }

        let under_header = parent.is_some_and(|p| self.tree.node(p).tag() == TypeTag::IdBase);
        if !under_header || self.settings.kind_filter.is_some() {
            self.expand_id(node, id, kind);
        }
        Some(node)
    }

    /// Children of a domain object: structural kinds first, then whatever
    /// the registered expander reports.
    fn expand_id(&mut self, node: NodeId, id: DomainId, kind: Option<DomainKind>) {
        match kind {
            Some(DomainKind::Scene) => scenes::add_scene_contents(self, node, id),
            Some(DomainKind::Collection) => {
                let parent_is_object = self
                    .tree
                    .node(node)
                    .parent()
                    .is_some_and(|p| self.tree.node(p).is_object());
                // Instanced collections would repeat the whole hierarchy.
                if !parent_is_object {
                    scenes::add_collection_contents(self, node, id);
                }
            }
            Some(DomainKind::Library) => return,
            _ => {}
        }
        let expanders = self.expanders;
        let relink = expanders.get(kind);
        let entries = expanders.expand(self.graph, id);
        for entry in entries {
            let tag = entry.tag;
            if let Some(child) = self.add_entry(Some(node), entry)
                && relink.relinks(tag)
            {
                self.link_by_logical_parent(Some(child));
            }
        }
    }

    /// Add an expander-produced entry with its nested children.
    fn add_entry(&mut self, parent: Option<NodeId>, entry: ChildEntry) -> Option<NodeId> {
        let ChildEntry {
            tag,
            index,
            id,
            name,
            children,
        } = entry;

        if tag == TypeTag::Id {
            let id = id?;
            return match name {
                Some(name) => self.add_id_named(parent, id, name),
                None => self.add_id(parent, id),
            };
        }
        if let Some(id) = id
            && !self.check_live(id)
        {
            return None;
        }

        let name = name
            .or_else(|| id.map(|id| self.owned_name(id)))
            .unwrap_or(Cow::Borrowed(""));
        let (node, _) = self.push(parent, RecordKey::new(tag, index, id), name, None);
        if tag == TypeTag::PoseChannel
            && let Some(id) = id
        {
            self.side_map.register(id, node);
        }
        for child in children {
            self.add_entry(Some(node), child);
        }
        Some(node)
    }

    /// Re-nest the children of `parent` under their logical parents.
    fn link_by_logical_parent(&mut self, parent: Option<NodeId>) {
        let graph = self.graph;
        let stats = link::link_children(self.tree, &self.side_map, parent, |node: &ViewNode| {
            let linkable = node.is_object() || node.tag() == TypeTag::PoseChannel;
            if linkable {
                node.id().and_then(|id| graph.logical_parent(id))
            } else {
                None
            }
        });
        self.stats.links += stats;
    }

    fn set_node_flag(&mut self, node: NodeId, flag: NodeFlags) {
        self.tree.node_mut(node).flags |= flag;
    }
}
