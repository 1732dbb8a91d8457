//! The [`Outliner`] view: settings, identity store, current tree and the
//! rebuild pipeline tying them together.
//!
//! A rebuild runs in a fixed order: capture the scroll anchor from the old
//! tree, drop it, sweep stale records, build, sort, filter, lay out and
//! restore the anchor. Interactive operations work on the current tree and
//! mark the view dirty where the next rebuild has to catch up.

use outliner_core::{IdentityStore, RecordFlags, RecordRef, SweepOutcome, ViewSettings};
use tracing::field::Empty;
use web_time::Instant;

use crate::build::{self, Builder};
use crate::domain::{DomainGraph, DomainGraphMut};
use crate::expand::ExpanderRegistry;
use crate::filter;
use crate::reorder::{self, DropAction, DropError};
use crate::scroll::{self, AnchorTest, Viewport};
use crate::sort;
use crate::tree::{FlatRow, NodeFlags, NodeId, ViewTree};

/// What one call to [`Outliner::rebuild`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// `false` when the call was skipped because nothing was dirty.
    pub rebuilt: bool,
    /// Store generation the tree was built in.
    pub generation: u64,
    /// Live nodes in the finished tree.
    pub nodes: usize,
    /// Records in the store after the build.
    pub records: usize,
    /// Records dropped by the sweep.
    pub swept: usize,
    /// Children skipped because their domain object was gone.
    pub skipped: usize,
    /// Parent cycles found while linking.
    pub cycles: usize,
    pub masked: usize,
    pub search_removed: usize,
    pub matched: usize,
    /// Viewport shift applied to keep the anchor row in place.
    pub scroll_shift: i32,
}

/// One outliner view over a domain graph.
#[derive(Debug)]
pub struct Outliner {
    settings: ViewSettings,
    store: Option<IdentityStore>,
    tree: ViewTree,
    viewport: Viewport,
    expanders: ExpanderRegistry,
    content_height: i32,
    dirty: bool,
    index_dirty: bool,
    last: RebuildReport,
}

impl Default for Outliner {
    fn default() -> Self {
        Self::new(ViewSettings::default())
    }
}

impl Outliner {
    #[must_use]
    pub fn new(settings: ViewSettings) -> Self {
        Self {
            settings,
            store: None,
            tree: ViewTree::new(),
            viewport: Viewport::default(),
            expanders: ExpanderRegistry::new(),
            content_height: 0,
            dirty: true,
            index_dirty: false,
            last: RebuildReport::default(),
        }
    }

    /// Replace the expansion collaborators.
    #[must_use]
    pub fn with_expanders(mut self, expanders: ExpanderRegistry) -> Self {
        self.expanders = expanders;
        self.dirty = true;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ViewSettings) {
        if settings != self.settings {
            self.settings = settings;
            self.dirty = true;
        }
    }

    /// Identity store, once the first rebuild has created it.
    #[must_use]
    pub fn store(&self) -> Option<&IdentityStore> {
        self.store.as_ref()
    }

    #[must_use]
    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Height of the laid-out rows.
    #[must_use]
    pub fn content_height(&self) -> i32 {
        self.content_height
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The domain graph or settings changed; rebuild on the next call.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The store arena was changed out of band; rehash before the next build.
    pub fn request_index_rebuild(&mut self) {
        self.index_dirty = true;
        self.dirty = true;
    }

    /// Rebuild the tree from `graph`.
    ///
    /// Skipped when nothing is dirty and `force` is false; the returned
    /// report then repeats the previous one with `rebuilt == false`.
    pub fn rebuild(&mut self, graph: &dyn DomainGraph, force: bool) -> RebuildReport {
        if !self.dirty && !force {
            return RebuildReport {
                rebuilt: false,
                ..self.last
            };
        }

        let start = Instant::now();
        let span = tracing::debug_span!(
            "outliner.rebuild",
            mode = ?self.settings.mode,
            node_count = Empty,
            records = Empty,
            swept = Empty,
            duration_us = Empty,
        );
        let _guard = span.enter();

        let test = AnchorTest::for_settings(&self.settings);
        self.relayout();
        let mut anchor = scroll::capture(&self.tree, self.viewport, test);
        self.tree = ViewTree::new();

        let mut swept = 0;
        if let Some(store) = self.store.as_mut() {
            if self.index_dirty {
                store.rebuild_index();
            }
            let outcome = store.sweep_unused();
            swept = outcome.removed();
            match outcome {
                SweepOutcome::Untouched => {}
                SweepOutcome::Compacted { .. } => {
                    anchor = anchor.and_then(|mut anchor| {
                        anchor.record = outcome.relocate(anchor.record)?;
                        Some(anchor)
                    });
                }
                SweepOutcome::Emptied { .. } => {
                    self.store = None;
                    anchor = None;
                }
            }
        }
        self.index_dirty = false;

        let first_view = self.store.as_ref().is_none_or(IdentityStore::is_empty);
        let store = self.store.get_or_insert_with(IdentityStore::new);
        store.reset_marks();

        let stats = Builder::new(graph, store, &self.settings, &self.expanders, &mut self.tree)
            .first_view(first_view)
            .build();
        if !self.settings.skip_sort {
            sort::sort_tree(&mut self.tree);
        }
        let filtered = filter::filter_tree(&mut self.tree, store, graph, &self.settings);

        self.relayout();
        let scroll_shift = anchor.map_or(0, |anchor| {
            scroll::restore(&self.tree, &mut self.viewport, anchor)
        });

        let records = self.store.as_ref().map_or(0, IdentityStore::len);
        let report = RebuildReport {
            rebuilt: true,
            generation: self.store.as_ref().map_or(0, IdentityStore::generation),
            nodes: self.tree.len(),
            records,
            swept,
            skipped: stats.skipped,
            cycles: stats.links.cycles,
            masked: filtered.masked,
            search_removed: filtered.search_removed,
            matched: filtered.matched,
            scroll_shift,
        };
        self.dirty = false;
        self.last = report;

        let elapsed_us = start.elapsed().as_micros() as u64;
        span.record("node_count", report.nodes);
        span.record("records", records);
        span.record("swept", swept);
        span.record("duration_us", elapsed_us);
        report
    }

    fn relayout(&mut self) {
        let Some(store) = self.store.as_ref() else {
            self.content_height = 0;
            return;
        };
        let searching = self.settings.recursive_search();
        self.content_height = self
            .tree
            .layout(|node| store.flags(node.record()).is_open(searching));
    }

    // ------------------------------------------------------------------
    // Interactive operations
    // ------------------------------------------------------------------

    /// Record flags behind a node; empty for stale nodes.
    #[must_use]
    pub fn flags(&self, node: NodeId) -> RecordFlags {
        match (self.tree.get(node), &self.store) {
            (Some(node), Some(store)) => store.flags(node.record()),
            _ => RecordFlags::empty(),
        }
    }

    #[must_use]
    pub fn is_open(&self, node: NodeId) -> bool {
        self.flags(node).is_open(self.settings.recursive_search())
    }

    /// Node currently showing `record`.
    #[must_use]
    pub fn node_for_record(&self, record: RecordRef) -> Option<NodeId> {
        self.tree.find_record(record)
    }

    /// Open or close a node. Opening a node with deferred children builds
    /// them in place. Returns `false` for stale nodes.
    pub fn set_open(&mut self, graph: &dyn DomainGraph, node: NodeId, open: bool) -> bool {
        let Some(view) = self.tree.get(node) else {
            return false;
        };
        let (record, lazy) = (view.record(), view.flags.contains(NodeFlags::LAZY_CLOSED));
        let Some(store) = self.store.as_mut() else {
            return false;
        };
        if !store.set_flags(record, RecordFlags::CLOSED, !open) {
            return false;
        }

        if open && lazy {
            let added =
                build::materialize(graph, store, &self.settings, &self.expanders, &mut self.tree, node);
            if added > 0 {
                filter::search_subtree(&mut self.tree, store, &self.settings, node);
                if !self.settings.skip_sort {
                    sort::sort_tree(&mut self.tree);
                }
            }
        }
        self.relayout();
        tracing::debug!(
            message = "outliner.toggle",
            action = if open { "expand" } else { "collapse" },
            node = %self.tree.node(node).key(),
        );
        true
    }

    pub fn toggle_open(&mut self, graph: &dyn DomainGraph, node: NodeId) -> bool {
        let open = !self.is_open(node);
        self.set_open(graph, node, open)
    }

    /// Select or deselect a node. Returns `false` for stale nodes.
    pub fn set_selected(&mut self, node: NodeId, selected: bool) -> bool {
        let (Some(view), Some(store)) = (self.tree.get(node), self.store.as_mut()) else {
            return false;
        };
        store.set_flags(view.record(), RecordFlags::SELECTED, selected)
    }

    /// Drop `node` onto `target`.
    ///
    /// # Errors
    ///
    /// Returns why the drop was refused; the tree and graph are unchanged
    /// then.
    pub fn drop_node<G: DomainGraphMut + ?Sized>(
        &mut self,
        graph: &mut G,
        node: NodeId,
        target: NodeId,
        action: DropAction,
    ) -> Result<usize, DropError> {
        let store = self.store.as_mut().ok_or(DropError::StaleNode)?;
        let moved = reorder::apply(&mut self.tree, store, graph, node, target, action)?;
        self.dirty = true;
        self.relayout();
        Ok(moved)
    }

    /// Laid-out rows in display order.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<FlatRow> {
        self.tree.visible_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use outliner_core::{ObjectKind, ViewMode};

    fn graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let props = graph.add_collection("Props", master);
        graph.add_object("Table", ObjectKind::Mesh, props);
        graph.add_object("Camera", ObjectKind::Camera, master);
        graph
    }

    #[test]
    fn clean_rebuild_is_skipped() {
        let graph = graph();
        let mut outliner = Outliner::default();
        let first = outliner.rebuild(&graph, false);
        assert!(first.rebuilt);
        let second = outliner.rebuild(&graph, false);
        assert!(!second.rebuilt);
        assert_eq!(second.nodes, first.nodes);
        assert!(outliner.rebuild(&graph, true).rebuilt);
    }

    #[test]
    fn root_opens_and_collections_start_closed() {
        let graph = graph();
        let mut outliner = Outliner::default();
        outliner.rebuild(&graph, true);
        let rows: Vec<_> = outliner.visible_rows().into_iter().map(|row| row.name).collect();
        assert_eq!(rows, ["Scene Collection", "Props", "Camera"]);
    }

    #[test]
    fn toggle_persists_across_rebuilds() {
        let graph = graph();
        let mut outliner = Outliner::default();
        outliner.rebuild(&graph, true);
        let props = outliner.tree().find(|node| node.name() == "Props").unwrap();
        assert!(outliner.toggle_open(&graph, props));
        assert!(outliner.is_open(props));

        outliner.rebuild(&graph, true);
        let props = outliner.tree().find(|node| node.name() == "Props").unwrap();
        assert!(outliner.is_open(props));
        let rows: Vec<_> = outliner.visible_rows().into_iter().map(|row| row.name).collect();
        assert_eq!(rows, ["Scene Collection", "Props", "Table", "Camera"]);
    }

    #[test]
    fn settings_change_marks_dirty() {
        let graph = graph();
        let mut outliner = Outliner::default();
        outliner.rebuild(&graph, false);
        assert!(!outliner.is_dirty());
        outliner.set_settings(ViewSettings::new(ViewMode::Scenes));
        assert!(outliner.is_dirty());
        outliner.set_settings(ViewSettings::new(ViewMode::Scenes));
        assert!(outliner.rebuild(&graph, false).rebuilt);
    }

    #[test]
    fn stale_node_operations_fail_quietly() {
        let graph = graph();
        let mut outliner = Outliner::default();
        let bogus = NodeId::from_raw(99);
        assert!(!outliner.set_selected(bogus, true));
        outliner.rebuild(&graph, true);
        assert!(!outliner.set_open(&graph, bogus, true));
        assert_eq!(outliner.flags(bogus), RecordFlags::empty());
    }
}
