//! MeshHierarchyError: Unified error type for mesh-hierarchy public APIs
//!
//! Every fallible operation in this crate (field arithmetic, patch mutation,
//! layout derivation, configuration loading) reports through this enum so
//! callers can match on the failure without parsing strings.

use thiserror::Error;

/// Unified error type for mesh-hierarchy operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshHierarchyError {
    /// Elementwise arithmetic between fields with different element counts.
    #[error("Incompatible field shapes: expected {expected} elements, found {found}")]
    IncompatibleShape { expected: usize, found: usize },
    /// Binary arithmetic between hierarchies that are not structurally consistent.
    #[error("Incompatible hierarchies: {0}")]
    IncompatibleHierarchy(String),
    /// A level index beyond the finest level was requested.
    #[error("Level {level} out of range (levelmax = {levelmax})")]
    LevelOutOfRange { level: usize, levelmax: usize },
    /// The hierarchy holds no levels yet.
    #[error("Hierarchy is empty: create the base hierarchy first")]
    EmptyHierarchy,
    /// A logical cell index lies outside the ghosted extent of a field.
    #[error("Index {index:?} outside field of extent {extent:?} with {nbnd} ghost cells")]
    IndexOutOfBounds {
        index: [i64; 3],
        extent: [usize; 3],
        nbnd: usize,
    },
    /// A patch was requested with a zero extent along some axis.
    #[error("Patch extent {0:?} has a zero-length axis")]
    ZeroExtent([usize; 3]),
    /// A patch move that would not land on a parent cell boundary.
    #[error("Patch shift {delta:?} on level {level} is not a whole number of parent cells")]
    MisalignedPatch { level: usize, delta: [i64; 3] },
    /// Internal bookkeeping no longer matches the stored grids.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    /// `levelmin`/`levelmax` do not describe a usable level range.
    #[error("Invalid level range: levelmin = {levelmin}, levelmax = {levelmax} (max {max})")]
    InvalidLevelRange {
        levelmin: usize,
        levelmax: usize,
        max: usize,
    },
    /// The refinement bounding box collapsed after alignment and wrapping.
    #[error("Refinement bounding box error on level {level}: lo = {lo:?}, hi = {hi:?}")]
    DegenerateBoundingBox {
        level: usize,
        lo: [i64; 3],
        hi: [i64; 3],
    },
    /// Both `ref_center` and `ref_offset` were supplied.
    #[error("Found both ref_offset and ref_center; only one may be specified")]
    ConflictingRegionAnchor,
    /// A required configuration key is absent.
    #[error("Missing configuration key `{section}.{key}`")]
    MissingConfigKey { section: String, key: String },
    /// A configuration value could not be parsed.
    #[error("Invalid value `{value}` for configuration key `{key}`: {reason}")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },
}
