//! Structural self-checks for fields, hierarchies and layouts.
//!
//! Mutating operations (`cut_patch`, `add_patch`, `adjust_level`, ...) run
//! these checks afterwards in debug builds, or in release builds compiled with
//! the `check-invariants` feature.

use crate::mesh_error::MeshHierarchyError;

/// Types whose internal bookkeeping can be verified after a mutation.
pub trait DebugInvariants {
    /// Panic on the first violated invariant when checking is enabled.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "structure check failed");
    }

    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshHierarchyError>;
}

/// Run a fallible invariant check and panic with context when checking is
/// enabled; compiles to nothing otherwise.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
