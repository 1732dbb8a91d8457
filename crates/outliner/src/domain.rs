//! Collaborator contracts for the domain graph the outliner displays.
//!
//! The engine never owns domain data. It reads it through [`DomainGraph`]
//! during a rebuild and writes it back through [`DomainGraphMut`] only for
//! interactive re-parenting. Every query takes a [`DomainId`] and answers
//! `None`/empty for ids the graph no longer knows, which the builder treats
//! as a child that disappeared between enumeration and use.

use std::borrow::Cow;

use outliner_core::{DomainId, DomainKind, ElementIndex, ObjectKind, TypeTag};

/// How a library is linked into the current file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryLink {
    /// Library that pulled this one in, if any.
    pub parent: Option<DomainId>,
    /// Linked only through `parent`, never directly by the current file.
    pub indirect: bool,
}

/// Per-object state in the active view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaseState {
    pub visible: bool,
    pub selected: bool,
    pub active: bool,
}

/// One node of the active view layer's collection tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerCollectionInfo {
    pub collection: DomainId,
    /// Excluded from the view layer: shown disabled, without objects.
    pub excluded: bool,
    pub children: Vec<LayerCollectionInfo>,
}

/// What a sequencer strip contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripKind {
    /// Plays external media.
    Media,
    /// Groups other strips.
    Meta(Vec<DomainId>),
    /// Generated from other strips; has no media of its own.
    Effect,
}

/// A sequencer strip as the outliner sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripInfo {
    pub name: String,
    /// Name of the backing media file, if the strip has one.
    pub media: Option<String>,
    /// Directory of the backing media.
    pub directory: String,
    pub kind: StripKind,
}

impl StripInfo {
    /// Media name usable for duplicate detection.
    #[must_use]
    pub fn media_name(&self) -> Option<&str> {
        self.media.as_deref().filter(|name| !name.is_empty())
    }
}

/// Component labels of numeric arrays in the reflection browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArraySubtype {
    #[default]
    Plain,
    /// X, Y, Z, W.
    Vector,
    /// R, G, B, A.
    Color,
}

impl ArraySubtype {
    /// Label character for element `index`, when the subtype has one.
    #[must_use]
    pub fn item_char(self, index: usize) -> Option<char> {
        let labels: &[char] = match self {
            Self::Plain => return None,
            Self::Vector => &['X', 'Y', 'Z', 'W'],
            Self::Color => &['R', 'G', 'B', 'A'],
        };
        labels.get(index).copied()
    }
}

/// Value shape of a reflected property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Points at another struct.
    Pointer(Option<DomainId>),
    /// Owns a list of structs.
    Collection(Vec<DomainId>),
    /// Boolean/int/float array.
    Array { len: usize, subtype: ArraySubtype },
    /// Anything without children.
    Scalar,
}

/// A property of a reflected struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub hidden: bool,
    pub value: PropertyValue,
}

impl PropertyInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            value,
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

// ============================================================================
// ChildEntry
// ============================================================================

/// One child produced by an expansion collaborator.
///
/// Sub-element entries may carry their own children; plain domain-object
/// entries are expanded again through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub tag: TypeTag,
    pub index: ElementIndex,
    /// Domain object represented, or the owner for grouping headers.
    pub id: Option<DomainId>,
    /// Display name; plain objects default to the graph's name.
    pub name: Option<Cow<'static, str>>,
    pub children: Vec<ChildEntry>,
}

impl ChildEntry {
    /// A domain object shown as itself.
    #[must_use]
    pub fn object(id: DomainId) -> Self {
        Self {
            tag: TypeTag::Id,
            index: 0,
            id: Some(id),
            name: None,
            children: Vec::new(),
        }
    }

    /// A sub-element of `owner`.
    #[must_use]
    pub fn element(
        tag: TypeTag,
        index: ElementIndex,
        owner: DomainId,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            tag,
            index,
            id: Some(owner),
            name: Some(name.into()),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: ElementIndex) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn child(mut self, entry: ChildEntry) -> Self {
        self.children.push(entry);
        self
    }

    #[must_use]
    pub fn with_children(mut self, entries: Vec<ChildEntry>) -> Self {
        self.children = entries;
        self
    }
}

// ============================================================================
// DomainGraph
// ============================================================================

/// Read access to the domain graph.
///
/// Lists are returned in graph order; the builder relies on it for
/// deterministic output. Methods with default bodies describe optional
/// structure: a graph without a sequencer simply keeps the default.
pub trait DomainGraph {
    /// Whether `id` still names a live object.
    fn contains(&self, id: DomainId) -> bool;

    fn kind(&self, id: DomainId) -> Option<DomainKind>;

    fn name(&self, id: DomainId) -> Option<&str>;

    /// Every block of `kind`, in graph order.
    fn ids_of_kind(&self, kind: DomainKind) -> Vec<DomainId>;

    /// Library providing `id`; `None` for data owned by the current file.
    fn owner_library(&self, _id: DomainId) -> Option<DomainId> {
        None
    }

    fn library_link(&self, _library: DomainId) -> Option<LibraryLink> {
        None
    }

    /// Users that keep the block alive (fake users excluded).
    fn real_users(&self, _id: DomainId) -> u32 {
        1
    }

    /// Logical parent for object and bone chains.
    fn logical_parent(&self, _id: DomainId) -> Option<DomainId> {
        None
    }

    fn object_kind(&self, _id: DomainId) -> Option<ObjectKind> {
        None
    }

    /// Generic sub-components of a block, used by the fallback expander.
    fn components(&self, _id: DomainId) -> Vec<ChildEntry> {
        Vec::new()
    }

    fn active_scene(&self) -> Option<DomainId> {
        None
    }

    fn scene_view_layers(&self, _scene: DomainId) -> Vec<String> {
        Vec::new()
    }

    fn scene_master_collection(&self, _scene: DomainId) -> Option<DomainId> {
        None
    }

    /// Every object of the scene, in collection order without repeats.
    fn scene_objects(&self, _scene: DomainId) -> Vec<DomainId> {
        Vec::new()
    }

    fn scene_is_animated(&self, _scene: DomainId) -> bool {
        false
    }

    fn collection_children(&self, _collection: DomainId) -> Vec<DomainId> {
        Vec::new()
    }

    fn collection_objects(&self, _collection: DomainId) -> Vec<DomainId> {
        Vec::new()
    }

    fn collection_parents(&self, _collection: DomainId) -> Vec<DomainId> {
        Vec::new()
    }

    fn is_master_collection(&self, _collection: DomainId) -> bool {
        false
    }

    /// Master layer collection of the active view layer.
    fn layer_collections(&self) -> Option<LayerCollectionInfo> {
        None
    }

    /// Object bases of the active view layer.
    fn view_layer_objects(&self) -> Vec<DomainId> {
        Vec::new()
    }

    /// State of an object's base; `None` when it has no base.
    fn base_state(&self, _object: DomainId) -> Option<BaseState> {
        None
    }

    /// Top-level strips of the active scene; `None` without editing data.
    fn sequence_strips(&self) -> Option<Vec<DomainId>> {
        None
    }

    fn strip(&self, _id: DomainId) -> Option<StripInfo> {
        None
    }

    /// Root struct of the reflection browser.
    fn reflect_root(&self) -> Option<DomainId> {
        None
    }

    fn struct_properties(&self, _id: DomainId) -> Vec<PropertyInfo> {
        Vec::new()
    }
}

/// Write access used by drag-and-drop.
pub trait DomainGraphMut: DomainGraph {
    /// Move `collection` from `from` into `to`, optionally next to
    /// `relative` (`true` = after). Returns `false` if the graph refuses.
    fn move_collection(
        &mut self,
        collection: DomainId,
        from: Option<DomainId>,
        to: DomainId,
        relative: Option<(DomainId, bool)>,
    ) -> bool;

    /// Move `object` from collection `from` into collection `to`.
    fn move_object(&mut self, object: DomainId, from: Option<DomainId>, to: DomainId) -> bool;

    /// Record that the graph changed and dependents must update.
    fn tag_changed(&mut self);
}
