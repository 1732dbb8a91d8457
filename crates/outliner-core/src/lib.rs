#![forbid(unsafe_code)]

//! Core types for the outliner tree engine.
//!
//! - [`id`]: domain identities, node type tags and record keys.
//! - [`store`]: the generation-spanning [`IdentityStore`](store::IdentityStore).
//! - [`settings`]: [`ViewSettings`](settings::ViewSettings) and the masks derived from them.

pub mod error;
pub mod id;
pub mod settings;
pub mod store;

pub use error::SettingsError;
pub use id::{DomainId, DomainKind, ElementIndex, MAX_ELEMENTS, ObjectKind, RecordKey, TypeTag};
pub use settings::{
    ExcludeMask, FilterFlags, ObjectStateFilter, SearchFlags, SearchSettings, ViewMode,
    ViewSettings,
};
pub use store::{Claim, IdentityStore, PersistentRecord, RecordFlags, RecordRef, SweepOutcome};
