//! Keeping the viewport steady across rebuilds.
//!
//! Before a rebuild the first anchor-worthy row at or below the top of the
//! viewport is remembered by its persistent record. After the rebuild the
//! viewport is shifted by however far that row moved.

use outliner_core::{FilterFlags, RecordRef, ViewMode, ViewSettings};

use crate::tree::{NodeId, ViewNode, ViewTree};

/// Visible window over the laid-out rows. `y` grows downward from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub top: i32,
    pub height: i32,
}

impl Viewport {
    #[must_use]
    pub const fn new(top: i32, height: i32) -> Self {
        Self { top, height }
    }

    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.top + self.height
    }
}

/// Row remembered before a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAnchor {
    pub record: RecordRef,
    pub ys: i32,
}

/// Which rows can anchor the viewport in the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorTest {
    Collections,
    Objects,
}

impl AnchorTest {
    #[must_use]
    pub fn for_settings(settings: &ViewSettings) -> Self {
        if settings.mode == ViewMode::ViewLayer
            && settings.filter.contains(FilterFlags::NO_COLLECTION)
        {
            Self::Objects
        } else {
            Self::Collections
        }
    }

    fn passes(self, node: &ViewNode) -> bool {
        match self {
            Self::Collections => node.is_collection(),
            Self::Objects => node.is_object(),
        }
    }
}

/// First node in `node`'s laid-out subtree (itself included) that passes.
fn find_in_subtree(tree: &ViewTree, node: NodeId, test: AnchorTest) -> Option<NodeId> {
    let current = tree.node(node);
    if test.passes(current) {
        return Some(node);
    }
    current
        .children()
        .iter()
        .filter(|&&child| tree.node(child).ys().is_some())
        .find_map(|&child| find_in_subtree(tree, child, test))
}

/// Pick the anchor row for `viewport` on a laid-out tree.
///
/// The search starts at the row under the viewport top and walks forward
/// through siblings and then ancestors' siblings. Candidates below the
/// viewport are rejected.
#[must_use]
pub fn capture(tree: &ViewTree, viewport: Viewport, test: AnchorTest) -> Option<ScrollAnchor> {
    let mut current = tree.item_at_y(viewport.top);
    while let Some(node) = current {
        if let Some(found) = find_in_subtree(tree, node, test) {
            let ys = tree.node(found).ys()?;
            if tree.node(node).ys()? >= viewport.bottom() {
                return None;
            }
            return Some(ScrollAnchor {
                record: tree.node(found).record(),
                ys,
            });
        }

        let mut climb = Some(node);
        current = None;
        while let Some(at) = climb {
            if let Some(next) = tree.next_sibling(at) {
                current = Some(next);
                break;
            }
            climb = tree.node(at).parent();
        }
    }
    None
}

/// Shift `viewport` so the anchored row keeps its on-screen position.
///
/// Returns the applied shift. Zero when the anchor row is gone or hidden.
pub fn restore(tree: &ViewTree, viewport: &mut Viewport, anchor: ScrollAnchor) -> i32 {
    let Some(ys) = tree
        .find_record(anchor.record)
        .and_then(|node| tree.node(node).ys())
    else {
        return 0;
    };
    let old_top = viewport.top;
    viewport.top = (old_top + (ys - anchor.ys)).max(0);
    viewport.top - old_top
}
