//! Identity types shared by the store and the tree engine.
//!
//! A [`RecordKey`] is the triple `(tag, index, domain id)` that decides which
//! persistent record a freshly built view node receives. Keys are plain
//! values: they never borrow domain data, so a key stays valid after the
//! domain object it names has been deleted.

use std::fmt;

/// Index carried by a view node to disambiguate siblings that share one
/// domain object (array elements, material slots, duplicated strips).
///
/// Stored as `i16`: reflection roots use `-1`, and lists longer than
/// [`MAX_ELEMENTS`] are truncated by the builder.
pub type ElementIndex = i16;

/// Largest element count a single list may show.
pub const MAX_ELEMENTS: usize = i16::MAX as usize;

// ============================================================================
// DomainId
// ============================================================================

/// Stable, comparable identity of a domain object.
///
/// Opaque to the engine: the domain graph decides what the raw value means.
/// Valid at least for the lifetime of one rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "settings-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DomainId(u64);

impl DomainId {
    /// Create an id from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

// ============================================================================
// DomainKind
// ============================================================================

/// Closed set of domain-object kinds the outliner knows how to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "settings-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum DomainKind {
    Library,
    Scene,
    Collection,
    Object,
    Mesh,
    Curve,
    Armature,
    Camera,
    Light,
    Material,
    Texture,
    Image,
    Action,
    GreasePencil,
    World,
    Text,
}

impl DomainKind {
    /// Every kind, in the order category headers are emitted.
    pub const ALL: [DomainKind; 16] = [
        DomainKind::Library,
        DomainKind::Scene,
        DomainKind::Collection,
        DomainKind::Object,
        DomainKind::Mesh,
        DomainKind::Curve,
        DomainKind::Armature,
        DomainKind::Camera,
        DomainKind::Light,
        DomainKind::Material,
        DomainKind::Texture,
        DomainKind::Image,
        DomainKind::Action,
        DomainKind::GreasePencil,
        DomainKind::World,
        DomainKind::Text,
    ];

    /// Plural display name used for category headers.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Library => "Libraries",
            Self::Scene => "Scenes",
            Self::Collection => "Collections",
            Self::Object => "Objects",
            Self::Mesh => "Meshes",
            Self::Curve => "Curves",
            Self::Armature => "Armatures",
            Self::Camera => "Cameras",
            Self::Light => "Lights",
            Self::Material => "Materials",
            Self::Texture => "Textures",
            Self::Image => "Images",
            Self::Action => "Actions",
            Self::GreasePencil => "Grease Pencil",
            Self::World => "Worlds",
            Self::Text => "Texts",
        }
    }
}

/// Object sub-kind, used by the coarse visibility mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "settings-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ObjectKind {
    Mesh,
    Armature,
    Empty,
    Light,
    Camera,
    Other,
}

// ============================================================================
// TypeTag
// ============================================================================

/// What a view node represents.
///
/// [`TypeTag::Id`] is a plain domain object; every other tag is a
/// sub-element or grouping header that may share its domain id with
/// siblings or with its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    /// A domain object shown as itself.
    Id,
    /// Category header listing every block of one kind.
    IdBase,
    AnimData,
    DriverBase,
    LinkedObject,
    NlaBase,
    NlaTrack,
    NlaAction,
    PoseBase,
    PoseChannel,
    Bone,
    ConstraintBase,
    Constraint,
    ModifierBase,
    Modifier,
    DeformGroupBase,
    DeformGroup,
    Proxy,
    GpLayer,
    RenderLayerBase,
    RenderLayer,
    SceneCollectionBase,
    SceneObjectsBase,
    ViewCollectionBase,
    LayerCollection,
    Sequence,
    SequenceStrip,
    SequenceDup,
    RnaStruct,
    RnaProperty,
    RnaArrayElement,
    KeyMap,
    KeyMapItem,
}

impl TypeTag {
    /// Reflection-browser tags.
    #[must_use]
    pub const fn is_reflection(self) -> bool {
        matches!(
            self,
            Self::RnaStruct | Self::RnaProperty | Self::RnaArrayElement
        )
    }

    /// Tags that stand for a collection (scroll anchoring, drop targets).
    #[must_use]
    pub const fn is_collection_base(self) -> bool {
        matches!(
            self,
            Self::LayerCollection | Self::SceneCollectionBase | Self::ViewCollectionBase
        )
    }
}

// ============================================================================
// RecordKey
// ============================================================================

/// Lookup key of a persistent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    tag: TypeTag,
    index: ElementIndex,
    id: Option<DomainId>,
}

impl RecordKey {
    /// Build a key. Plain domain-object keys always carry index 0.
    #[must_use]
    pub const fn new(tag: TypeTag, index: ElementIndex, id: Option<DomainId>) -> Self {
        let index = match tag {
            TypeTag::Id => 0,
            _ => index,
        };
        Self { tag, index, id }
    }

    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        self.tag
    }

    #[must_use]
    pub const fn index(&self) -> ElementIndex {
        self.index
    }

    #[must_use]
    pub const fn id(&self) -> Option<DomainId> {
        self.id
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{:?}[{}]@{}", self.tag, self.index, id),
            None => write!(f, "{:?}[{}]", self.tag, self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object_keys_ignore_index() {
        let id = Some(DomainId::from_raw(7));
        assert_eq!(
            RecordKey::new(TypeTag::Id, 3, id),
            RecordKey::new(TypeTag::Id, 0, id)
        );
        assert_ne!(
            RecordKey::new(TypeTag::Modifier, 3, id),
            RecordKey::new(TypeTag::Modifier, 0, id)
        );
    }

    #[test]
    fn key_display() {
        let key = RecordKey::new(TypeTag::PoseChannel, 2, Some(DomainId::from_raw(4)));
        assert_eq!(key.to_string(), "PoseChannel[2]@D4");
        let key = RecordKey::new(TypeTag::IdBase, 0, None);
        assert_eq!(key.to_string(), "IdBase[0]");
    }

    #[test]
    fn plurals_are_distinct() {
        let mut names: Vec<_> = DomainKind::ALL.iter().map(|k| k.plural()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DomainKind::ALL.len());
    }
}
