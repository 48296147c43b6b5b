//! Half-open integer boxes on a periodic level grid.
//!
//! The layout engine moves one box per level through the same pipeline:
//! outward alignment, periodic wrap (finest level) or clipping to the domain
//! (coarser levels), degeneracy check, then halving and padding for the next
//! coarser level.

use crate::data::rect_field::{Extent3, Offset3};
use crate::mesh_error::MeshHierarchyError;

/// Rounding rule applied to box bounds so that halving stays exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    /// Low bound down to even, high bound up to even.
    Parent,
    /// Low bound down to a multiple of `n`; high bound to the next multiple
    /// strictly above `hi / n`.
    Multiple(i64),
}

/// Per-axis half-open cell bounds `[lo, hi)` on one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBox {
    pub lo: Offset3,
    pub hi: Offset3,
}

impl IndexBox {
    pub fn new(lo: Offset3, hi: Offset3) -> Self {
        Self { lo, hi }
    }

    /// Cell count per axis; zero on axes where `hi <= lo`.
    pub fn extent(&self) -> Extent3 {
        std::array::from_fn(|d| (self.hi[d] - self.lo[d]).max(0) as usize)
    }

    /// Round both ends outward according to `alignment`.
    pub fn align(self, alignment: Alignment) -> Self {
        match alignment {
            Alignment::Parent => Self {
                lo: self.lo.map(|lo| lo - lo.rem_euclid(2)),
                hi: self.hi.map(|hi| hi + hi.rem_euclid(2)),
            },
            Alignment::Multiple(n) => Self {
                lo: self.lo.map(|lo| lo.div_euclid(n) * n),
                hi: self.hi.map(|hi| (hi.div_euclid(n) + 1) * n),
            },
        }
    }

    /// Map the bounds into a periodic axis of `n` cells: `lo` into `[0, n)`,
    /// the exclusive `hi` into `(0, n]`.
    pub fn wrap_periodic(self, n: i64) -> Self {
        Self {
            lo: self.lo.map(|lo| lo.rem_euclid(n)),
            hi: self.hi.map(|hi| (hi - 1).rem_euclid(n) + 1),
        }
    }

    /// Clip the bounds to `[0, n]` on every axis.
    ///
    /// Padding a coarse level next to the domain edge can push the box past
    /// it; the clipped box still covers the finer level.
    pub fn clamp_to_domain(self, n: i64) -> Self {
        Self {
            lo: self.lo.map(|lo| lo.clamp(0, n)),
            hi: self.hi.map(|hi| hi.clamp(0, n)),
        }
    }

    /// Project onto the next coarser level and grow by `padding` cells.
    pub fn coarsen_padded(self, padding: i64) -> Self {
        Self {
            lo: self.lo.map(|lo| lo.div_euclid(2) - padding),
            hi: self.hi.map(|hi| hi.div_euclid(2) + padding),
        }
    }

    /// True if `lo < hi` on every axis.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|d| self.lo[d] < self.hi[d])
    }

    /// Pass the box through unchanged, or fail if it collapsed on `level`.
    pub fn validated(self, level: usize) -> Result<Self, MeshHierarchyError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(MeshHierarchyError::DegenerateBoundingBox {
                level,
                lo: self.lo,
                hi: self.hi,
            })
        }
    }
}
