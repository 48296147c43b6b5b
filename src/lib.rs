#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-hierarchy
//!
//! mesh-hierarchy manages nested, multi-resolution rectangular grids on the
//! periodic unit cube. Each refinement level holds one dense patch, twice as
//! fine as its parent, and the crate keeps the parent/child offsets,
//! power-of-two alignment and periodic wraparound consistent while patches
//! are added, grown or shrunk.
//!
//! ## Features
//! - [`RectField`](crate::data::RectField): dense 3D array with a uniform
//!   ghost border, scalar and elementwise arithmetic
//! - [`LevelSet`](crate::hierarchy::LevelSet): one field per level with
//!   absolute offset bookkeeping, patch add/cut and leaf-cell queries
//! - [`RefinementLayout`](crate::hierarchy::RefinementLayout): per-level box
//!   geometry derived from a region of interest and padding/alignment policy
//! - Typed configuration read from any sectioned key/value store
//!
//! ## Usage
//!
//! ```
//! use mesh_hierarchy::prelude::*;
//!
//! let store = KeyValueStore::new()
//!     .with("setup", "levelmin", "5")
//!     .with("setup", "levelmax", "7")
//!     .with("setup", "padding", "1")
//!     .with("setup", "align_top", "no")
//!     .with("setup", "ref_center", "0.5,0.5,0.5")
//!     .with("setup", "ref_extent", "0.25,0.25,0.25");
//!
//! let layout = RefinementLayout::from_source(&store)?;
//! let levels: LevelSet<f64> = build_hierarchy(&layout, 2)?;
//! assert_eq!(levels.size(7, 0), 34);
//! # Ok::<(), MeshHierarchyError>(())
//! ```
//!
//! ## Invariant checking
//!
//! Structural mutations validate the touched object afterwards in debug
//! builds. Enable the `check-invariants` feature to keep these checks in
//! release builds.

pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod hierarchy;
pub mod mesh_error;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::config::{
        ConfigSink, ConfigSource, KeyValueStore, RefinementConfig, RegionAnchor, RegionSpec,
        record_shift,
    };
    pub use crate::data::rect_field::RectField;
    pub use crate::data::storage::{Storage, VecStorage};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::hierarchy::build::{build_hierarchy, sync_layout};
    pub use crate::hierarchy::layout::{LevelBox, RefinementLayout};
    pub use crate::hierarchy::level_set::LevelSet;
    pub use crate::mesh_error::MeshHierarchyError;
}
