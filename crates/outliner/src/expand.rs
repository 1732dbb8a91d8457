//! Per-kind expansion collaborators.
//!
//! An [`Expander`] turns one domain object into the list of children the
//! builder should add below it. Structural kinds (scenes, collections,
//! libraries) are expanded by the builder itself; everything else is looked
//! up here, falling back to [`ComponentExpander`].

use ahash::AHashMap;
use outliner_core::{DomainId, DomainKind, TypeTag};

use crate::domain::{ChildEntry, DomainGraph};

/// Produces the children of a domain object.
pub trait Expander {
    /// Push the children of `id` onto `out`, in display order.
    fn expand(&self, graph: &dyn DomainGraph, id: DomainId, out: &mut Vec<ChildEntry>);

    /// Whether the children of nodes tagged `tag` are re-nested by their
    /// logical parent once built.
    fn relinks(&self, tag: TypeTag) -> bool {
        matches!(tag, TypeTag::PoseBase)
    }
}

/// Default expander: whatever [`DomainGraph::components`] reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentExpander;

impl Expander for ComponentExpander {
    fn expand(&self, graph: &dyn DomainGraph, id: DomainId, out: &mut Vec<ChildEntry>) {
        out.extend(graph.components(id));
    }
}

/// Lookup from domain kind to expander.
pub struct ExpanderRegistry {
    by_kind: AHashMap<DomainKind, Box<dyn Expander>>,
    fallback: Box<dyn Expander>,
}

impl Default for ExpanderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExpanderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.by_kind.keys().copied().collect();
        kinds.sort();
        f.debug_struct("ExpanderRegistry")
            .field("kinds", &kinds)
            .finish_non_exhaustive()
    }
}

impl ExpanderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_kind: AHashMap::new(),
            fallback: Box::new(ComponentExpander),
        }
    }

    /// Use `expander` for every object of `kind`, replacing any previous one.
    pub fn register(&mut self, kind: DomainKind, expander: impl Expander + 'static) {
        self.by_kind.insert(kind, Box::new(expander));
    }

    #[must_use]
    pub fn with(mut self, kind: DomainKind, expander: impl Expander + 'static) -> Self {
        self.register(kind, expander);
        self
    }

    /// Replace the expander used for unregistered kinds.
    pub fn set_fallback(&mut self, expander: impl Expander + 'static) {
        self.fallback = Box::new(expander);
    }

    /// Expander for `kind`.
    #[must_use]
    pub fn get(&self, kind: Option<DomainKind>) -> &dyn Expander {
        kind.and_then(|kind| self.by_kind.get(&kind))
            .map_or(self.fallback.as_ref(), |expander| expander.as_ref())
    }

    /// Children of `id`.
    #[must_use]
    pub fn expand(&self, graph: &dyn DomainGraph, id: DomainId) -> Vec<ChildEntry> {
        let mut out = Vec::new();
        self.get(graph.kind(id)).expand(graph, id, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use outliner_core::ObjectKind;

    struct Fixed(&'static str);

    impl Expander for Fixed {
        fn expand(&self, _graph: &dyn DomainGraph, id: DomainId, out: &mut Vec<ChildEntry>) {
            out.push(ChildEntry::element(TypeTag::Modifier, 0, id, self.0));
        }

        fn relinks(&self, _tag: TypeTag) -> bool {
            false
        }
    }

    #[test]
    fn fallback_uses_components() {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let mesh = graph.add(DomainKind::Mesh, "Cube");
        let ob = graph.add_object("Cube", ObjectKind::Mesh, master);
        graph.add_component(ob, ChildEntry::object(mesh));

        let registry = ExpanderRegistry::new();
        assert_eq!(registry.expand(&graph, ob), vec![ChildEntry::object(mesh)]);
        assert!(registry.get(Some(DomainKind::Object)).relinks(TypeTag::PoseBase));
    }

    #[test]
    fn registered_kind_wins() {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let ob = graph.add_object("Cube", ObjectKind::Mesh, master);

        let registry = ExpanderRegistry::new().with(DomainKind::Object, Fixed("Subdivision"));
        let children = registry.expand(&graph, ob);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name.as_deref(), Some("Subdivision"));
        assert!(!registry.get(Some(DomainKind::Object)).relinks(TypeTag::PoseBase));
    }
}
