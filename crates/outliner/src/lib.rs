#![forbid(unsafe_code)]

//! Outliner: a persistent, filterable tree view over a mutable domain graph.
//!
//! # Role
//! `outliner` turns a domain graph (scenes, collections, objects and their
//! sub-components) into a display tree, from scratch on every refresh, while
//! open/closed and selection state survive through the identity store in
//! `outliner-core`.
//!
//! # Primary pieces
//! - **[`Outliner`]**: the view; owns settings, store and current tree and
//!   runs the rebuild pipeline.
//! - **[`domain`]**: the graph contracts a host implements.
//! - **[`expand`]**: per-kind expansion collaborators.
//! - **[`tree`]**: the arena-backed view tree and layout.
//! - **[`link`]**, **[`sort`]**, **[`filter`]**, **[`scroll`]**: the passes
//!   run after building.
//! - **[`reorder`]**: drag-and-drop re-parenting.
//! - **[`memory`]**: an in-memory graph for tests and demos.
//!
//! # Example
//!
//! ```
//! use outliner::{MemoryGraph, Outliner};
//! use outliner_core::ObjectKind;
//!
//! let mut graph = MemoryGraph::new();
//! let (_, master) = graph.add_scene("Scene");
//! graph.add_object("Cube", ObjectKind::Mesh, master);
//!
//! let mut outliner = Outliner::default();
//! let report = outliner.rebuild(&graph, false);
//! assert!(report.rebuilt);
//! assert_eq!(outliner.tree().outline(), "Scene Collection\n  Cube\n");
//! ```

mod build;
pub mod domain;
pub mod expand;
pub mod filter;
pub mod link;
pub mod memory;
pub mod outliner;
pub mod reorder;
pub mod scroll;
pub mod sort;
pub mod tree;

pub use build::BuildStats;
pub use domain::{
    ArraySubtype, BaseState, ChildEntry, DomainGraph, DomainGraphMut, LayerCollectionInfo,
    LibraryLink, PropertyInfo, PropertyValue, StripInfo, StripKind,
};
pub use expand::{ComponentExpander, Expander, ExpanderRegistry};
pub use filter::{FilterStats, SearchPattern};
pub use link::{LinkError, LinkStats};
pub use memory::MemoryGraph;
pub use outliner::{Outliner, RebuildReport};
pub use reorder::{DropAction, DropError};
pub use scroll::{AnchorTest, ScrollAnchor, Viewport};
pub use tree::{FlatRow, NodeFlags, NodeId, ViewNode, ViewTree};
