//! Post-build filtering: the exclusion mask, then the name search.
//!
//! The mask drops whole subtrees (an excluded object takes its children
//! with it). The search is evaluated bottom-up: a node survives when its
//! own name matches or when any descendant survives, so the path down to
//! every match is kept.

use outliner_core::{
    ExcludeMask, IdentityStore, ObjectKind, RecordFlags, SearchFlags, ViewSettings,
};
use regex::{Regex, RegexBuilder};

use crate::domain::DomainGraph;
use crate::tree::{NodeId, ViewNode, ViewTree};

// ============================================================================
// Search pattern
// ============================================================================

/// Compiled wildcard pattern (`*`, `?`, `[abc]`, `[!abc]`).
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
}

impl SearchPattern {
    /// Compile `term` under `flags`.
    ///
    /// Without [`SearchFlags::EXACT`] the term may match anywhere in a name.
    ///
    /// # Errors
    ///
    /// Returns the regex error when the translated pattern does not compile.
    pub fn compile(term: &str, flags: SearchFlags) -> Result<Self, regex::Error> {
        let body = glob_to_regex(term);
        let source = if flags.contains(SearchFlags::EXACT) {
            format!("^{body}$")
        } else {
            format!("^.*{body}.*$")
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!flags.contains(SearchFlags::CASE_SENSITIVE))
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self { regex })
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let negate = chars.get(i + 1) == Some(&'!');
                let start = if negate { i + 2 } else { i + 1 };
                // A leading `]` is a literal member of the class.
                let search_from = if chars.get(start) == Some(&']') {
                    start + 1
                } else {
                    start
                };
                match chars[search_from.min(chars.len())..]
                    .iter()
                    .position(|&c| c == ']')
                {
                    Some(offset) => {
                        let end = search_from + offset;
                        out.push('[');
                        if negate {
                            out.push('^');
                        }
                        for &c in &chars[start..end] {
                            // Ranges like `a-z` pass through unchanged.
                            if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~') {
                                out.push('\\');
                            }
                            out.push(c);
                        }
                        out.push(']');
                        i = end;
                    }
                    None => out.push_str(r"\["),
                }
            }
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }
    out
}

// ============================================================================
// Exclusion mask
// ============================================================================

fn object_state_passes(graph: &dyn DomainGraph, mask: ExcludeMask, node: &ViewNode) -> bool {
    if !mask.intersects(ExcludeMask::OB_STATE) {
        return true;
    }
    let Some(state) = node.id().and_then(|id| graph.base_state(id)) else {
        return false;
    };
    if mask.contains(ExcludeMask::STATE_VISIBLE) {
        state.visible
    } else if mask.contains(ExcludeMask::STATE_SELECTED) {
        state.selected
    } else {
        state.active
    }
}

/// Whether `node` survives the mask.
fn passes_mask(
    graph: &dyn DomainGraph,
    mask: ExcludeMask,
    node: &ViewNode,
    parent: Option<&ViewNode>,
) -> bool {
    let parent_is_object = parent.is_some_and(ViewNode::is_object);
    if node.is_object() {
        if mask.contains(ExcludeMask::OB_TYPE) {
            return false;
        }
        let kind = node
            .id()
            .and_then(|id| graph.object_kind(id))
            .unwrap_or(ObjectKind::Other);
        if mask.excludes_kind(kind) {
            return false;
        }
        if !object_state_passes(graph, mask, node) {
            return false;
        }
        if parent_is_object && mask.contains(ExcludeMask::NO_CHILDREN) {
            return false;
        }
        true
    } else {
        !(parent_is_object && mask.contains(ExcludeMask::NO_CONTENT))
    }
}

fn apply_mask(
    tree: &mut ViewTree,
    graph: &dyn DomainGraph,
    mask: ExcludeMask,
) -> usize {
    let mut removed = 0;
    let mut stack = vec![None];
    while let Some(parent) = stack.pop() {
        for child in tree.children_of(parent).to_vec() {
            let keep = passes_mask(graph, mask, tree.node(child), parent.map(|p| tree.node(p)));
            if keep {
                stack.push(Some(child));
            } else {
                removed += tree.remove_subtree(child);
            }
        }
    }
    removed
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Nodes removed by the exclusion mask.
    pub masked: usize,
    /// Nodes removed by the search.
    pub search_removed: usize,
    /// Nodes whose own name matched the search.
    pub matched: usize,
}

fn apply_search(
    tree: &mut ViewTree,
    store: &mut IdentityStore,
    pattern: &SearchPattern,
    parent: Option<NodeId>,
    stats: &mut FilterStats,
) -> bool {
    let children = tree.children_of(parent).to_vec();
    let mut survivors = Vec::with_capacity(children.len());
    let mut dropped = Vec::new();
    for child in children {
        let node = tree.node(child);
        let matched = pattern.matches(node.name());
        store.set_flags(node.record(), RecordFlags::SEARCH_MATCH, matched);
        if matched {
            stats.matched += 1;
        }
        let keeps_descendant = apply_search(tree, store, pattern, Some(child), stats);
        if matched || keeps_descendant {
            survivors.push(child);
        } else {
            dropped.push(child);
        }
    }
    if !dropped.is_empty() {
        stats.search_removed += tree.prune_children(parent, survivors, &dropped);
    }
    !tree.children_of(parent).is_empty()
}

fn search_pattern(settings: &ViewSettings) -> Option<SearchPattern> {
    if !settings.exclude_mask().contains(ExcludeMask::SEARCH) {
        return None;
    }
    let term = settings.search.active_term()?;
    match SearchPattern::compile(term, settings.search.flags) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            tracing::warn!(
                target: "outliner.filter",
                term,
                error = %err,
                "search pattern rejected; showing unfiltered tree"
            );
            None
        }
    }
}

/// Run the active search over the children of `root`, for rows added
/// after the tree was filtered.
pub(crate) fn search_subtree(
    tree: &mut ViewTree,
    store: &mut IdentityStore,
    settings: &ViewSettings,
    root: NodeId,
) -> FilterStats {
    let mut stats = FilterStats::default();
    if let Some(pattern) = search_pattern(settings) {
        apply_search(tree, store, &pattern, Some(root), &mut stats);
    }
    stats
}

/// Run the exclusion mask and the search over a freshly built tree.
pub fn filter_tree(
    tree: &mut ViewTree,
    store: &mut IdentityStore,
    graph: &dyn DomainGraph,
    settings: &ViewSettings,
) -> FilterStats {
    let mut stats = FilterStats::default();
    let mask = settings.exclude_mask();
    if !mask.structural().is_empty() {
        stats.masked = apply_mask(tree, graph, mask.structural());
    }

    if let Some(pattern) = search_pattern(settings) {
        apply_search(tree, store, &pattern, None, &mut stats);
    }
    stats
}
