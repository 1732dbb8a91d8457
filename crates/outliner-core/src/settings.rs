//! View settings consumed by every rebuild.
//!
//! [`ViewSettings`] groups the display mode, the coarse object filters and
//! the text search into one value. With the `settings-config` feature it can
//! be loaded from TOML or JSON:
//!
//! ```toml
//! mode = "view-layer"
//! filter = "NO_OB_CAMERA | NO_CHILDREN"
//! object_state = "selected"
//!
//! [search]
//! term = "cube"
//! flags = "CASE_SENSITIVE"
//! ```
//!
//! The coarse filters are folded into an [`ExcludeMask`] once per rebuild.

#[cfg(feature = "settings-config")]
use std::path::Path;

use bitflags::bitflags;

#[cfg(feature = "settings-config")]
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::id::{DomainKind, ObjectKind};

/// Longest search term kept; longer terms are cut at a char boundary.
pub const MAX_SEARCH_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Enums and flag sets
// ---------------------------------------------------------------------------

/// Which hierarchy the outliner shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "settings-config",
    derive(Serialize, Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ViewMode {
    /// Every library and the data it provides.
    Libraries,
    /// All scenes with their contents.
    Scenes,
    /// Strips of the active scene's sequencer.
    Sequencer,
    /// Reflection browser over the whole data model.
    DataApi,
    /// Blocks without real users.
    Orphans,
    /// Collections and objects of the active view layer.
    #[default]
    ViewLayer,
}

bitflags! {
    /// Coarse filter toggles from the view settings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "settings-config", derive(Serialize, Deserialize))]
    pub struct FilterFlags: u32 {
        /// View layer: list object bases instead of collections.
        const NO_COLLECTION = 1 << 0;
        /// Hide every object.
        const NO_OBJECT = 1 << 1;
        /// Hide objects parented to another shown object.
        const NO_CHILDREN = 1 << 2;
        /// Hide non-object content of objects (modifiers, data, pose, ...).
        const NO_OB_CONTENT = 1 << 3;
        const NO_OB_MESH = 1 << 4;
        const NO_OB_ARMATURE = 1 << 5;
        const NO_OB_EMPTY = 1 << 6;
        const NO_OB_LIGHT = 1 << 7;
        const NO_OB_CAMERA = 1 << 8;
        const NO_OB_OTHERS = 1 << 9;
    }
}

/// Show only objects in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "settings-config",
    derive(Serialize, Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ObjectStateFilter {
    #[default]
    All,
    Visible,
    Selected,
    Active,
}

bitflags! {
    /// Text search options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "settings-config", derive(Serialize, Deserialize))]
    pub struct SearchFlags: u8 {
        /// Compare without case folding.
        const CASE_SENSITIVE = 1 << 0;
        /// Match the whole name; no implicit `*` padding.
        const EXACT = 1 << 1;
    }
}

bitflags! {
    /// Per-rebuild exclusion mask derived from [`ViewSettings`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExcludeMask: u32 {
        const OB_MESH = 1 << 0;
        const OB_ARMATURE = 1 << 1;
        const OB_EMPTY = 1 << 2;
        const OB_LIGHT = 1 << 3;
        const OB_CAMERA = 1 << 4;
        const OB_OTHERS = 1 << 5;
        const STATE_VISIBLE = 1 << 6;
        const STATE_SELECTED = 1 << 7;
        const STATE_ACTIVE = 1 << 8;
        const NO_CHILDREN = 1 << 9;
        const NO_CONTENT = 1 << 10;
        const SEARCH = 1 << 11;

        const OB_TYPE = Self::OB_MESH.bits()
            | Self::OB_ARMATURE.bits()
            | Self::OB_EMPTY.bits()
            | Self::OB_LIGHT.bits()
            | Self::OB_CAMERA.bits()
            | Self::OB_OTHERS.bits();
        const OB_STATE = Self::STATE_VISIBLE.bits()
            | Self::STATE_SELECTED.bits()
            | Self::STATE_ACTIVE.bits();
    }
}

impl ExcludeMask {
    /// Bits that concern the structure of the tree rather than the search.
    #[must_use]
    pub fn structural(self) -> Self {
        self.difference(Self::SEARCH)
    }

    /// Whether an object of `kind` is excluded by type.
    #[must_use]
    pub fn excludes_kind(self, kind: ObjectKind) -> bool {
        let bit = match kind {
            ObjectKind::Mesh => Self::OB_MESH,
            ObjectKind::Armature => Self::OB_ARMATURE,
            ObjectKind::Empty => Self::OB_EMPTY,
            ObjectKind::Light => Self::OB_LIGHT,
            ObjectKind::Camera => Self::OB_CAMERA,
            ObjectKind::Other => Self::OB_OTHERS,
        };
        self.contains(bit)
    }
}

// ---------------------------------------------------------------------------
// SearchSettings
// ---------------------------------------------------------------------------

/// Text search term and options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "settings-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "settings-config", serde(default))]
pub struct SearchSettings {
    pub term: String,
    pub flags: SearchFlags,
}

impl SearchSettings {
    /// Search for `term` with default options.
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            flags: SearchFlags::empty(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: SearchFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The active term, or `None` when the search is blank.
    #[must_use]
    pub fn active_term(&self) -> Option<&str> {
        let term = self.term.trim();
        if term.is_empty() {
            return None;
        }
        let mut end = term.len().min(MAX_SEARCH_LEN);
        while !term.is_char_boundary(end) {
            end -= 1;
        }
        Some(&term[..end])
    }
}

// ---------------------------------------------------------------------------
// ViewSettings
// ---------------------------------------------------------------------------

/// Everything a rebuild reads from the view configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "settings-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "settings-config", serde(default))]
pub struct ViewSettings {
    pub mode: ViewMode,
    pub filter: FilterFlags,
    pub object_state: ObjectStateFilter,
    /// Keep build order instead of sorting alphabetically.
    pub skip_sort: bool,
    /// Library and orphan modes: show only blocks of this kind.
    pub kind_filter: Option<DomainKind>,
    pub search: SearchSettings,
}

impl ViewSettings {
    #[must_use]
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterFlags) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_object_state(mut self, state: ObjectStateFilter) -> Self {
        self.object_state = state;
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchSettings) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn with_skip_sort(mut self, skip: bool) -> Self {
        self.skip_sort = skip;
        self
    }

    #[must_use]
    pub fn with_kind_filter(mut self, kind: Option<DomainKind>) -> Self {
        self.kind_filter = kind;
        self
    }

    /// Whether a non-blank search term is set.
    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.search.active_term().is_some()
    }

    /// Whether nodes built this rebuild count as open for the search.
    ///
    /// Never in the reflection browser: expanding every reflected struct
    /// has no upper bound.
    #[must_use]
    pub fn recursive_search(&self) -> bool {
        self.is_searching() && self.mode != ViewMode::DataApi
    }

    /// Whether the coarse object filters apply in the current mode.
    #[must_use]
    pub fn supports_object_filters(&self) -> bool {
        self.mode == ViewMode::ViewLayer
    }

    /// Fold the settings into the per-rebuild exclusion mask.
    #[must_use]
    pub fn exclude_mask(&self) -> ExcludeMask {
        let mut mask = ExcludeMask::empty();
        if self.is_searching() {
            mask |= ExcludeMask::SEARCH;
        }
        if !self.supports_object_filters() {
            return mask;
        }

        let type_bits = [
            (FilterFlags::NO_OB_MESH, ExcludeMask::OB_MESH),
            (FilterFlags::NO_OB_ARMATURE, ExcludeMask::OB_ARMATURE),
            (FilterFlags::NO_OB_EMPTY, ExcludeMask::OB_EMPTY),
            (FilterFlags::NO_OB_LIGHT, ExcludeMask::OB_LIGHT),
            (FilterFlags::NO_OB_CAMERA, ExcludeMask::OB_CAMERA),
            (FilterFlags::NO_OB_OTHERS, ExcludeMask::OB_OTHERS),
        ];
        for (flag, bit) in type_bits {
            if self.filter.contains(flag) {
                mask |= bit;
            }
        }
        if self.filter.contains(FilterFlags::NO_OBJECT) {
            mask |= ExcludeMask::OB_TYPE;
        }
        if self.filter.contains(FilterFlags::NO_CHILDREN) {
            mask |= ExcludeMask::NO_CHILDREN;
        }
        if self.filter.contains(FilterFlags::NO_OB_CONTENT) {
            mask |= ExcludeMask::NO_CONTENT;
        }
        mask |= match self.object_state {
            ObjectStateFilter::All => ExcludeMask::empty(),
            ObjectStateFilter::Visible => ExcludeMask::STATE_VISIBLE,
            ObjectStateFilter::Selected => ExcludeMask::STATE_SELECTED,
            ObjectStateFilter::Active => ExcludeMask::STATE_ACTIVE,
        };
        mask
    }

    /// Report settings that cannot take effect.
    ///
    /// An empty list means the settings are coherent. Problems never stop a
    /// rebuild; they only explain an unexpectedly empty or unfiltered view.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.kind_filter.is_some()
            && !matches!(self.mode, ViewMode::Libraries | ViewMode::Orphans)
        {
            errors.push(format!(
                "kind_filter only applies to libraries/orphans mode, not {:?}",
                self.mode
            ));
        }

        if self.mode == ViewMode::ViewLayer
            && self
                .filter
                .contains(FilterFlags::NO_COLLECTION | FilterFlags::NO_OBJECT)
        {
            errors.push("NO_COLLECTION together with NO_OBJECT leaves the view empty".into());
        }

        if !self.supports_object_filters()
            && (self.object_state != ObjectStateFilter::All
                || self.filter.difference(FilterFlags::NO_COLLECTION) != FilterFlags::empty())
        {
            errors.push(format!(
                "object filters are ignored in {:?} mode",
                self.mode
            ));
        }

        if self.search.term.trim().len() > MAX_SEARCH_LEN {
            errors.push(format!(
                "search.term longer than {MAX_SEARCH_LEN} bytes is truncated"
            ));
        }

        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "settings-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        toml::from_str(s).map_err(SettingsError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "settings-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SettingsError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "settings-config")]
    pub fn from_json_str(s: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(s).map_err(SettingsError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "settings-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SettingsError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to TOML.
    #[cfg(feature = "settings-config")]
    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(SettingsError::TomlSer)
    }

    /// Return `self` when [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self, SettingsError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(SettingsError::Validation(errors))
        }
    }
}
