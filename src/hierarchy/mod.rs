//! Nested refinement hierarchy: per-level grids, the box geometry that
//! positions them, and the glue between the two.

pub mod bounds;
pub mod build;
pub mod layout;
pub mod level_set;

pub use bounds::{Alignment, IndexBox};
pub use build::{build_hierarchy, sync_layout};
pub use layout::{LevelBox, MAX_LEVEL, RefinementLayout};
pub use level_set::LevelSet;
