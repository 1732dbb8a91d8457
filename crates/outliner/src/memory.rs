//! In-memory domain graph.
//!
//! [`MemoryGraph`] implements both graph contracts over plain maps. It backs
//! the crate's tests and benchmarks and doubles as a reference for hosts
//! wiring up their own graph: the first scene added is the active one, and
//! its master collection drives the view layer.

use ahash::AHashMap;
use outliner_core::{DomainId, DomainKind, ObjectKind};

use crate::domain::{
    BaseState, ChildEntry, DomainGraph, DomainGraphMut, LayerCollectionInfo, LibraryLink,
    PropertyInfo, StripInfo,
};

#[derive(Debug, Clone)]
struct Block {
    kind: DomainKind,
    name: String,
    library: Option<DomainId>,
    users: u32,
    parent: Option<DomainId>,
    object_kind: Option<ObjectKind>,
    components: Vec<ChildEntry>,
}

#[derive(Debug, Clone, Default)]
struct CollectionData {
    children: Vec<DomainId>,
    objects: Vec<DomainId>,
    parents: Vec<DomainId>,
    master: bool,
    excluded: bool,
}

#[derive(Debug, Clone)]
struct SceneData {
    master: DomainId,
    view_layers: Vec<String>,
    animated: bool,
}

#[derive(Debug, Clone)]
struct StructData {
    name: String,
    properties: Vec<PropertyInfo>,
}

/// Domain graph kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    next: u64,
    order: Vec<DomainId>,
    blocks: AHashMap<DomainId, Block>,
    collections: AHashMap<DomainId, CollectionData>,
    scenes: AHashMap<DomainId, SceneData>,
    active_scene: Option<DomainId>,
    links: AHashMap<DomainId, LibraryLink>,
    base_states: AHashMap<DomainId, BaseState>,
    strips: AHashMap<DomainId, StripInfo>,
    sequence: Option<Vec<DomainId>>,
    structs: AHashMap<DomainId, StructData>,
    reflect_root: Option<DomainId>,
    changes: u64,
}

impl MemoryGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> DomainId {
        self.next += 1;
        DomainId::from_raw(self.next)
    }

    /// Add a block of `kind` owned by the current file.
    pub fn add(&mut self, kind: DomainKind, name: impl Into<String>) -> DomainId {
        let id = self.alloc();
        self.order.push(id);
        self.blocks.insert(
            id,
            Block {
                kind,
                name: name.into(),
                library: None,
                users: 1,
                parent: None,
                object_kind: None,
                components: Vec::new(),
            },
        );
        if kind == DomainKind::Collection {
            self.collections.insert(id, CollectionData::default());
        }
        id
    }

    /// Add a scene with its master collection. The first scene becomes
    /// the active one.
    pub fn add_scene(&mut self, name: impl Into<String>) -> (DomainId, DomainId) {
        let scene = self.add(DomainKind::Scene, name);
        let master = self.add(DomainKind::Collection, "Master Collection");
        if let Some(data) = self.collections.get_mut(&master) {
            data.master = true;
        }
        self.scenes.insert(
            scene,
            SceneData {
                master,
                view_layers: Vec::new(),
                animated: false,
            },
        );
        self.active_scene.get_or_insert(scene);
        (scene, master)
    }

    pub fn add_view_layer(&mut self, scene: DomainId, name: impl Into<String>) {
        if let Some(data) = self.scenes.get_mut(&scene) {
            data.view_layers.push(name.into());
        }
    }

    pub fn set_animated(&mut self, scene: DomainId, animated: bool) {
        if let Some(data) = self.scenes.get_mut(&scene) {
            data.animated = animated;
        }
    }

    pub fn set_active_scene(&mut self, scene: DomainId) {
        if self.scenes.contains_key(&scene) {
            self.active_scene = Some(scene);
        }
    }

    /// Add a collection as the last child of `parent`.
    pub fn add_collection(&mut self, name: impl Into<String>, parent: DomainId) -> DomainId {
        let id = self.add(DomainKind::Collection, name);
        self.link_collection(id, parent, None);
        id
    }

    /// Add an object linked into `collection`.
    pub fn add_object(
        &mut self,
        name: impl Into<String>,
        kind: ObjectKind,
        collection: DomainId,
    ) -> DomainId {
        let id = self.add(DomainKind::Object, name);
        if let Some(block) = self.blocks.get_mut(&id) {
            block.object_kind = Some(kind);
        }
        self.link_object(id, collection);
        id
    }

    /// Link an existing object into one more collection.
    pub fn link_object(&mut self, object: DomainId, collection: DomainId) {
        if let Some(data) = self.collections.get_mut(&collection)
            && !data.objects.contains(&object)
        {
            data.objects.push(object);
        }
    }

    /// Set the logical parent used for object and bone chains.
    pub fn set_parent(&mut self, id: DomainId, parent: Option<DomainId>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.parent = parent;
        }
    }

    /// Append a sub-component reported by the fallback expander.
    pub fn add_component(&mut self, id: DomainId, entry: ChildEntry) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.components.push(entry);
        }
    }

    pub fn rename(&mut self, id: DomainId, name: impl Into<String>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.name = name.into();
        }
    }

    /// Delete a block. References held in components are left dangling.
    pub fn remove(&mut self, id: DomainId) {
        self.blocks.remove(&id);
        self.order.retain(|&other| other != id);
        self.collections.remove(&id);
        self.scenes.remove(&id);
        self.strips.remove(&id);
        self.structs.remove(&id);
        self.base_states.remove(&id);
        for data in self.collections.values_mut() {
            data.children.retain(|&other| other != id);
            data.objects.retain(|&other| other != id);
            data.parents.retain(|&other| other != id);
        }
        if let Some(sequence) = &mut self.sequence {
            sequence.retain(|&other| other != id);
        }
        if self.active_scene == Some(id) {
            self.active_scene = self.order.iter().copied().find(|id| self.scenes.contains_key(id));
        }
    }

    pub fn set_users(&mut self, id: DomainId, users: u32) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.users = users;
        }
    }

    /// Add a library linked from `parent` (the current file when `None`).
    pub fn add_library(
        &mut self,
        name: impl Into<String>,
        parent: Option<DomainId>,
        indirect: bool,
    ) -> DomainId {
        let id = self.add(DomainKind::Library, name);
        self.links.insert(id, LibraryLink { parent, indirect });
        id
    }

    pub fn set_library(&mut self, id: DomainId, library: Option<DomainId>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.library = library;
        }
    }

    /// Exclude a collection from the active view layer.
    pub fn exclude_collection(&mut self, collection: DomainId, excluded: bool) {
        if let Some(data) = self.collections.get_mut(&collection) {
            data.excluded = excluded;
        }
    }

    pub fn set_base_state(&mut self, object: DomainId, state: BaseState) {
        self.base_states.insert(object, state);
    }

    /// Add a top-level sequencer strip.
    pub fn add_strip(&mut self, info: StripInfo) -> DomainId {
        let id = self.add_inner_strip(info);
        self.sequence.get_or_insert_with(Vec::new).push(id);
        id
    }

    /// Add a strip that only appears inside a meta strip.
    pub fn add_inner_strip(&mut self, info: StripInfo) -> DomainId {
        let id = self.alloc();
        self.strips.insert(id, info);
        id
    }

    /// Add a reflected struct.
    pub fn add_struct(&mut self, name: impl Into<String>) -> DomainId {
        let id = self.alloc();
        self.structs.insert(
            id,
            StructData {
                name: name.into(),
                properties: Vec::new(),
            },
        );
        id
    }

    pub fn add_property(&mut self, id: DomainId, property: PropertyInfo) {
        if let Some(data) = self.structs.get_mut(&id) {
            data.properties.push(property);
        }
    }

    pub fn set_reflect_root(&mut self, id: DomainId) {
        self.reflect_root = Some(id);
    }

    /// Times [`DomainGraphMut::tag_changed`] was called.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes
    }

    fn master_of_active(&self) -> Option<DomainId> {
        self.active_scene
            .and_then(|scene| self.scenes.get(&scene))
            .map(|data| data.master)
    }

    fn link_collection(
        &mut self,
        collection: DomainId,
        parent: DomainId,
        relative: Option<(DomainId, bool)>,
    ) {
        let Some(data) = self.collections.get_mut(&parent) else {
            return;
        };
        let at = relative
            .and_then(|(relative, after)| {
                data.children
                    .iter()
                    .position(|&child| child == relative)
                    .map(|at| if after { at + 1 } else { at })
            })
            .unwrap_or(data.children.len());
        data.children.insert(at, collection);
        if let Some(child) = self.collections.get_mut(&collection)
            && !child.parents.contains(&parent)
        {
            child.parents.push(parent);
        }
    }

    fn unlink_collection(&mut self, collection: DomainId, parent: DomainId) {
        if let Some(data) = self.collections.get_mut(&parent) {
            data.children.retain(|&child| child != collection);
        }
        if let Some(data) = self.collections.get_mut(&collection) {
            data.parents.retain(|&other| other != parent);
        }
    }

    /// Whether `inner` is `outer` or nested somewhere below it.
    fn collection_contains(&self, outer: DomainId, inner: DomainId) -> bool {
        let mut stack = vec![outer];
        while let Some(at) = stack.pop() {
            if at == inner {
                return true;
            }
            if let Some(data) = self.collections.get(&at) {
                stack.extend(data.children.iter().copied());
            }
        }
        false
    }

    /// Objects below `collection`, child collections first, without repeats.
    fn gather_objects(&self, collection: DomainId, skip_excluded: bool, out: &mut Vec<DomainId>) {
        let Some(data) = self.collections.get(&collection) else {
            return;
        };
        if skip_excluded && data.excluded {
            return;
        }
        for &child in &data.children {
            self.gather_objects(child, skip_excluded, out);
        }
        for &object in &data.objects {
            if !out.contains(&object) {
                out.push(object);
            }
        }
    }

    fn layer_collection(&self, collection: DomainId) -> LayerCollectionInfo {
        let data = self.collections.get(&collection);
        LayerCollectionInfo {
            collection,
            excluded: data.is_some_and(|data| data.excluded),
            children: data
                .map(|data| {
                    data.children
                        .iter()
                        .map(|&child| self.layer_collection(child))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl DomainGraph for MemoryGraph {
    fn contains(&self, id: DomainId) -> bool {
        self.blocks.contains_key(&id) || self.strips.contains_key(&id) || self.structs.contains_key(&id)
    }

    fn kind(&self, id: DomainId) -> Option<DomainKind> {
        self.blocks.get(&id).map(|block| block.kind)
    }

    fn name(&self, id: DomainId) -> Option<&str> {
        if let Some(block) = self.blocks.get(&id) {
            return Some(&block.name);
        }
        if let Some(data) = self.structs.get(&id) {
            return Some(&data.name);
        }
        self.strips.get(&id).map(|strip| strip.name.as_str())
    }

    fn ids_of_kind(&self, kind: DomainKind) -> Vec<DomainId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.blocks.get(id).is_some_and(|block| block.kind == kind))
            .filter(|id| !self.is_master_collection(*id))
            .collect()
    }

    fn owner_library(&self, id: DomainId) -> Option<DomainId> {
        self.blocks.get(&id).and_then(|block| block.library)
    }

    fn library_link(&self, library: DomainId) -> Option<LibraryLink> {
        self.links.get(&library).copied()
    }

    fn real_users(&self, id: DomainId) -> u32 {
        self.blocks.get(&id).map_or(0, |block| block.users)
    }

    fn logical_parent(&self, id: DomainId) -> Option<DomainId> {
        self.blocks.get(&id).and_then(|block| block.parent)
    }

    fn object_kind(&self, id: DomainId) -> Option<ObjectKind> {
        self.blocks.get(&id).and_then(|block| block.object_kind)
    }

    fn components(&self, id: DomainId) -> Vec<ChildEntry> {
        self.blocks
            .get(&id)
            .map(|block| block.components.clone())
            .unwrap_or_default()
    }

    fn active_scene(&self) -> Option<DomainId> {
        self.active_scene
    }

    fn scene_view_layers(&self, scene: DomainId) -> Vec<String> {
        self.scenes
            .get(&scene)
            .map(|data| data.view_layers.clone())
            .unwrap_or_default()
    }

    fn scene_master_collection(&self, scene: DomainId) -> Option<DomainId> {
        self.scenes.get(&scene).map(|data| data.master)
    }

    fn scene_objects(&self, scene: DomainId) -> Vec<DomainId> {
        let mut out = Vec::new();
        if let Some(master) = self.scene_master_collection(scene) {
            self.gather_objects(master, false, &mut out);
        }
        out
    }

    fn scene_is_animated(&self, scene: DomainId) -> bool {
        self.scenes.get(&scene).is_some_and(|data| data.animated)
    }

    fn collection_children(&self, collection: DomainId) -> Vec<DomainId> {
        self.collections
            .get(&collection)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn collection_objects(&self, collection: DomainId) -> Vec<DomainId> {
        self.collections
            .get(&collection)
            .map(|data| data.objects.clone())
            .unwrap_or_default()
    }

    fn collection_parents(&self, collection: DomainId) -> Vec<DomainId> {
        self.collections
            .get(&collection)
            .map(|data| data.parents.clone())
            .unwrap_or_default()
    }

    fn is_master_collection(&self, collection: DomainId) -> bool {
        self.collections
            .get(&collection)
            .is_some_and(|data| data.master)
    }

    fn layer_collections(&self) -> Option<LayerCollectionInfo> {
        self.master_of_active()
            .map(|master| self.layer_collection(master))
    }

    fn view_layer_objects(&self) -> Vec<DomainId> {
        let mut out = Vec::new();
        if let Some(master) = self.master_of_active() {
            self.gather_objects(master, true, &mut out);
        }
        out
    }

    fn base_state(&self, object: DomainId) -> Option<BaseState> {
        if !self.view_layer_objects().contains(&object) {
            return None;
        }
        Some(self.base_states.get(&object).copied().unwrap_or(BaseState {
            visible: true,
            ..BaseState::default()
        }))
    }

    fn sequence_strips(&self) -> Option<Vec<DomainId>> {
        self.sequence.clone()
    }

    fn strip(&self, id: DomainId) -> Option<StripInfo> {
        self.strips.get(&id).cloned()
    }

    fn reflect_root(&self) -> Option<DomainId> {
        self.reflect_root
    }

    fn struct_properties(&self, id: DomainId) -> Vec<PropertyInfo> {
        self.structs
            .get(&id)
            .map(|data| data.properties.clone())
            .unwrap_or_default()
    }
}

impl DomainGraphMut for MemoryGraph {
    fn move_collection(
        &mut self,
        collection: DomainId,
        from: Option<DomainId>,
        to: DomainId,
        relative: Option<(DomainId, bool)>,
    ) -> bool {
        if self.is_master_collection(collection)
            || !self.collections.contains_key(&to)
            || self.collection_contains(collection, to)
        {
            return false;
        }
        match from {
            Some(from) => self.unlink_collection(collection, from),
            None => {
                for parent in self.collection_parents(collection) {
                    self.unlink_collection(collection, parent);
                }
            }
        }
        if self.collection_children(to).contains(&collection) {
            self.unlink_collection(collection, to);
        }
        self.link_collection(collection, to, relative);
        true
    }

    fn move_object(&mut self, object: DomainId, from: Option<DomainId>, to: DomainId) -> bool {
        if self.kind(object) != Some(DomainKind::Object) || !self.collections.contains_key(&to) {
            return false;
        }
        if let Some(from) = from
            && let Some(data) = self.collections.get_mut(&from)
        {
            data.objects.retain(|&other| other != object);
        }
        self.link_object(object, to);
        true
    }

    fn tag_changed(&mut self) {
        self.changes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_objects_children_first() {
        let mut graph = MemoryGraph::new();
        let (scene, master) = graph.add_scene("Scene");
        let camera = graph.add_object("Camera", ObjectKind::Camera, master);
        let props = graph.add_collection("Props", master);
        let cup = graph.add_object("Cup", ObjectKind::Mesh, props);
        graph.link_object(cup, master);
        assert_eq!(graph.scene_objects(scene), vec![cup, camera]);
        assert_eq!(graph.ids_of_kind(DomainKind::Collection), vec![props]);
    }

    #[test]
    fn excluded_collections_have_no_bases() {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let hidden = graph.add_collection("Hidden", master);
        let ghost = graph.add_object("Ghost", ObjectKind::Empty, hidden);
        graph.exclude_collection(hidden, true);
        assert!(graph.view_layer_objects().is_empty());
        assert_eq!(graph.base_state(ghost), None);
        assert!(graph.layer_collections().unwrap().children[0].excluded);
    }

    #[test]
    fn move_collection_refuses_cycles() {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let outer = graph.add_collection("Outer", master);
        let inner = graph.add_collection("Inner", outer);
        assert!(!graph.move_collection(outer, Some(master), inner, None));
        assert!(!graph.move_collection(master, None, outer, None));

        let side = graph.add_collection("Side", master);
        assert!(graph.move_collection(side, Some(master), master, Some((outer, false))));
        assert_eq!(graph.collection_children(master), vec![side, outer]);
        assert_eq!(graph.collection_parents(side), vec![master]);
    }

    #[test]
    fn move_object_between_collections() {
        let mut graph = MemoryGraph::new();
        let (_, master) = graph.add_scene("Scene");
        let props = graph.add_collection("Props", master);
        let cube = graph.add_object("Cube", ObjectKind::Mesh, master);
        assert!(graph.move_object(cube, Some(master), props));
        assert!(graph.collection_objects(master).is_empty());
        assert_eq!(graph.collection_objects(props), vec![cube]);
        assert!(!graph.move_object(props, Some(master), props));
    }
}
