//! RefinementLayout: per-level box geometry derived from a requested region.
//!
//! Given `levelmin`, `levelmax`, padding and alignment policy plus a region
//! of interest in the unit cube, the layout computes where each level's patch
//! sits (absolute and parent-relative offsets) and how large it is. The
//! region is first re-centered on the domain by an integer shift in
//! coarse-grid cells; the finest patch is then fitted around it, and every
//! coarser patch is derived from the one above by halving and padding.
//! Boxes are aligned outward at each step so that refinement by two stays
//! exact. The finest box is wrapped on the periodic domain; coarser boxes
//! are clipped to it, so padding next to the domain edge never wraps.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigSource, RefinementConfig};
use crate::data::rect_field::{Extent3, Offset3};
use crate::debug_invariants::DebugInvariants;
use crate::hierarchy::bounds::{Alignment, IndexBox};
use crate::mesh_error::MeshHierarchyError;

/// Finest level the layout engine accepts.
pub const MAX_LEVEL: usize = 30;

/// Geometry of one level's patch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelBox {
    /// Lower corner in the unit cube.
    pub origin: [f64; 3],
    /// Edge lengths in the unit cube.
    pub length: [f64; 3],
    /// Offset in parent-level cells.
    pub offset: Offset3,
    /// Offset from the domain origin in this level's cells.
    pub offset_abs: Offset3,
    /// Cell counts.
    pub size: Extent3,
}

impl LevelBox {
    fn full_domain(level: usize) -> Self {
        Self {
            origin: [0.0; 3],
            length: [1.0; 3],
            offset: [0; 3],
            offset_abs: [0; 3],
            size: [1usize << level; 3],
        }
    }

    fn refresh_normalized(&mut self, level: usize) {
        let h = 1.0 / (1u64 << level) as f64;
        self.origin = self.offset_abs.map(|o| h * o as f64);
        self.length = self.size.map(|n| h * n as f64);
    }

    /// True if the box spans the whole domain at `level`.
    pub fn is_full_domain(&self, level: usize) -> bool {
        self.offset_abs == [0; 3] && self.size == [1usize << level; 3]
    }
}

/// Per-level refinement geometry for `0..=levelmax`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefinementLayout {
    levelmin: usize,
    levelmax: usize,
    levelmin_tf: usize,
    padding: usize,
    align_top: bool,
    region_origin: [f64; 3],
    region_extent: [f64; 3],
    shift: Offset3,
    boxes: Vec<LevelBox>,
}

impl RefinementLayout {
    /// Derive the layout described by `config`.
    ///
    /// # Errors
    /// `InvalidLevelRange` unless `levelmin <= levelmax <= MAX_LEVEL`;
    /// `DegenerateBoundingBox` if some level's box collapses after alignment
    /// and periodic wrapping.
    pub fn new(config: &RefinementConfig) -> Result<Self, MeshHierarchyError> {
        let (levelmin, levelmax) = (config.levelmin, config.levelmax);
        if levelmin > levelmax || levelmax > MAX_LEVEL {
            return Err(MeshHierarchyError::InvalidLevelRange {
                levelmin,
                levelmax,
                max: MAX_LEVEL,
            });
        }

        let ncoarse = (1i64 << levelmin) as f64;
        let shift: Offset3 = if config.shift_enabled() {
            let center = config.region.center();
            std::array::from_fn(|d| ((0.5 - center[d]) * ncoarse) as i64)
        } else {
            [0; 3]
        };
        let origin = config.region.origin();
        let region_origin: [f64; 3] =
            std::array::from_fn(|d| (origin[d] + shift[d] as f64 / ncoarse).rem_euclid(1.0));

        let mut layout = Self {
            levelmin,
            levelmax,
            levelmin_tf: config.levelmin_tf(),
            padding: config.padding,
            align_top: config.align_top,
            region_origin,
            region_extent: config.region.extent,
            shift,
            boxes: (0..=levelmax).map(LevelBox::full_domain).collect(),
        };
        if levelmin != levelmax {
            layout.place_patches()?;
        }
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        layout.debug_assert_invariants();
        Ok(layout)
    }

    /// Read a [`RefinementConfig`] from `source` and derive its layout.
    pub fn from_source<C: ConfigSource + ?Sized>(source: &C) -> Result<Self, MeshHierarchyError> {
        Self::new(&RefinementConfig::from_source(source)?)
    }

    fn alignment(&self, level: usize) -> Alignment {
        if !self.align_top {
            return Alignment::Parent;
        }
        let exponent = if level == self.levelmax {
            level - self.levelmin + 1
        } else {
            level - self.levelmin
        };
        Alignment::Multiple(1i64 << exponent)
    }

    fn record(&mut self, level: usize, bounds: IndexBox) {
        let b = &mut self.boxes[level];
        b.offset_abs = bounds.lo;
        b.size = bounds.extent();
    }

    fn place_patches(&mut self) -> Result<(), MeshHierarchyError> {
        let (levelmin, levelmax) = (self.levelmin, self.levelmax);
        let nres = (1i64 << levelmax) as f64;
        let lo = self.region_origin.map(|x| (x * nres) as i64);
        let hi: Offset3 =
            std::array::from_fn(|d| ((self.region_origin[d] + self.region_extent[d]) * nres + 1.0) as i64);

        let mut bounds = IndexBox::new(lo, hi)
            .align(self.alignment(levelmax))
            .wrap_periodic(1i64 << levelmax)
            .validated(levelmax)?;
        self.record(levelmax, bounds);

        for level in (levelmin + 1..levelmax).rev() {
            bounds = bounds
                .coarsen_padded(self.padding as i64)
                .align(self.alignment(level))
                .clamp_to_domain(1i64 << level)
                .validated(level)?;
            self.record(level, bounds);
        }

        for level in levelmin + 1..=levelmax {
            let parent = self.boxes[level - 1].offset_abs;
            let b = &mut self.boxes[level];
            b.offset = std::array::from_fn(|d| b.offset_abs[d] / 2 - parent[d]);
            b.refresh_normalized(level);
        }
        Ok(())
    }

    /// Override the geometry of `level` with an actually allocated patch.
    ///
    /// The level's relative offset and normalized box are recomputed, the
    /// next finer level's relative offset absorbs the move, and `levelmin`
    /// is re-derived.
    ///
    /// # Errors
    /// `LevelOutOfRange` for `level > levelmax`; `DegenerateBoundingBox` if
    /// the new box is empty or leaves the domain; `MisalignedPatch` if a
    /// level above `0` moves by an odd number of its own cells.
    pub fn adjust_level(
        &mut self,
        level: usize,
        size: Extent3,
        offset_abs: Offset3,
    ) -> Result<(), MeshHierarchyError> {
        if level > self.levelmax {
            return Err(MeshHierarchyError::LevelOutOfRange {
                level,
                levelmax: self.levelmax,
            });
        }
        let n = 1i64 << level;
        let requested = IndexBox::new(offset_abs, std::array::from_fn(|d| offset_abs[d] + size[d] as i64));
        if (0..3).any(|d| requested.lo[d] < 0 || requested.hi[d] > n) {
            return Err(MeshHierarchyError::DegenerateBoundingBox {
                level,
                lo: requested.lo,
                hi: requested.hi,
            });
        }
        requested.validated(level)?;

        let b = &mut self.boxes[level];
        let delta: Offset3 = std::array::from_fn(|d| b.offset_abs[d] - offset_abs[d]);
        if level > 0 && delta.iter().any(|&x| x % 2 != 0) {
            return Err(MeshHierarchyError::MisalignedPatch {
                level,
                delta: delta.map(|x| -x),
            });
        }
        for d in 0..3 {
            b.offset[d] -= delta[d] / 2;
        }
        b.offset_abs = offset_abs;
        b.size = size;
        b.refresh_normalized(level);

        if let Some(fine) = self.boxes.get_mut(level + 1) {
            for d in 0..3 {
                fine.offset[d] += delta[d];
            }
        }
        self.find_new_levelmin();
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        self.debug_assert_invariants();
        Ok(())
    }

    /// Set `levelmin` to the highest level whose box spans the whole domain
    /// (level `0` if none does) and return it.
    pub fn find_new_levelmin(&mut self) -> usize {
        let old = self.levelmin;
        self.levelmin = self
            .boxes
            .iter()
            .enumerate()
            .filter(|(level, b)| b.is_full_domain(*level))
            .map(|(level, _)| level)
            .last()
            .unwrap_or(0);
        if old != self.levelmin {
            log::debug!("RefinementLayout: set new levelmin to {}", self.levelmin);
        }
        self.levelmin
    }

    /// Box record of `level`.
    pub fn level_box(&self, level: usize) -> Result<&LevelBox, MeshHierarchyError> {
        self.boxes
            .get(level)
            .ok_or(MeshHierarchyError::LevelOutOfRange {
                level,
                levelmax: self.levelmax,
            })
    }

    /// Offset of `level` from the domain origin, in that level's cells.
    ///
    /// # Panics
    /// If `level > levelmax` or `dim > 2`.
    pub fn offset_abs(&self, level: usize, dim: usize) -> i64 {
        self.boxes[level].offset_abs[dim]
    }

    /// Offset of `level` relative to its parent, in parent cells.
    ///
    /// # Panics
    /// If `level > levelmax` or `dim > 2`.
    pub fn offset(&self, level: usize, dim: usize) -> i64 {
        self.boxes[level].offset[dim]
    }

    /// Cell count of `level` along `dim`.
    ///
    /// # Panics
    /// If `level > levelmax` or `dim > 2`.
    pub fn size(&self, level: usize, dim: usize) -> usize {
        self.boxes[level].size[dim]
    }

    pub fn levelmin(&self) -> usize {
        self.levelmin
    }

    pub fn levelmax(&self) -> usize {
        self.levelmax
    }

    pub fn levelmin_tf(&self) -> usize {
        self.levelmin_tf
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn align_top(&self) -> bool {
        self.align_top
    }

    /// Centering shift along `dim`, in cells of `levelmin`.
    pub fn get_shift(&self, dim: usize) -> i64 {
        self.shift[dim]
    }

    /// Centering shift on all axes, in cells of `levelmin`.
    pub fn shift(&self) -> Offset3 {
        self.shift
    }

    /// Region lower corner after the centering shift.
    pub fn region_origin(&self) -> [f64; 3] {
        self.region_origin
    }

    pub fn region_extent(&self) -> [f64; 3] {
        self.region_extent
    }

    /// Report the shift and every level's offset and size at `info` level.
    pub fn log_summary(&self) {
        let [sx, sy, sz] = self.shift;
        log::info!("   Domain shifted by      ({sx:5},{sy:5},{sz:5})");
        for level in self.levelmin..=self.levelmax {
            let b = &self.boxes[level];
            let [ox, oy, oz] = b.offset;
            let [nx, ny, nz] = b.size;
            log::info!("   Level {level:3} :   offset = ({ox:5},{oy:5},{oz:5})");
            log::info!("                   size = ({nx:5},{ny:5},{nz:5})");
        }
    }
}

impl DebugInvariants for RefinementLayout {
    fn validate_invariants(&self) -> Result<(), MeshHierarchyError> {
        if self.boxes.len() != self.levelmax + 1 {
            return Err(MeshHierarchyError::InvariantViolation(format!(
                "{} level boxes for levelmax {}",
                self.boxes.len(),
                self.levelmax
            )));
        }
        if !self.boxes[self.levelmin].is_full_domain(self.levelmin) && self.levelmin > 0 {
            return Err(MeshHierarchyError::InvariantViolation(format!(
                "levelmin {} does not span the domain",
                self.levelmin
            )));
        }
        for (level, b) in self.boxes.iter().enumerate() {
            if level > 0 {
                let parent = self.boxes[level - 1].offset_abs;
                if (0..3).any(|d| b.offset_abs[d] != 2 * (parent[d] + b.offset[d])) {
                    return Err(MeshHierarchyError::InvariantViolation(format!(
                        "level {level}: absolute offset {:?} does not match parent {parent:?} + relative {:?}",
                        b.offset_abs, b.offset
                    )));
                }
            }
            let n = 1i64 << level;
            let inside = (0..3).all(|d| {
                b.size[d] > 0 && b.offset_abs[d] >= 0 && b.offset_abs[d] + b.size[d] as i64 <= n
            });
            if !inside {
                return Err(MeshHierarchyError::DegenerateBoundingBox {
                    level,
                    lo: b.offset_abs,
                    hi: std::array::from_fn(|d| b.offset_abs[d] + b.size[d] as i64),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RegionAnchor, RegionSpec};

    fn centered(levelmin: usize, levelmax: usize) -> RefinementConfig {
        RefinementConfig {
            levelmin,
            levelmax,
            levelmin_tf: None,
            padding: 1,
            align_top: false,
            region: RegionSpec {
                extent: [0.25; 3],
                anchor: RegionAnchor::Center([0.5; 3]),
            },
            no_shift: false,
            force_shift: false,
        }
    }

    #[test]
    fn rejects_inverted_level_range() {
        assert_eq!(
            RefinementLayout::new(&centered(6, 5)),
            Err(MeshHierarchyError::InvalidLevelRange {
                levelmin: 6,
                levelmax: 5,
                max: MAX_LEVEL
            })
        );
    }

    #[test]
    fn single_level_is_full_domain_without_shift() {
        let mut cfg = centered(4, 4);
        cfg.force_shift = true;
        cfg.region.anchor = RegionAnchor::Center([0.1, 0.2, 0.3]);
        let layout = RefinementLayout::new(&cfg).unwrap();
        assert_eq!(layout.shift(), [0, 0, 0]);
        for level in 0..=4 {
            let b = layout.level_box(level).unwrap();
            assert!(b.is_full_domain(level));
            assert_eq!(b.length, [1.0; 3]);
        }
        assert_eq!(layout.levelmin_tf(), 4);
    }

    #[test]
    fn coarse_alignment_uses_levelmin_cells() {
        let mut cfg = centered(5, 7);
        cfg.align_top = true;
        let layout = RefinementLayout::new(&cfg).unwrap();
        assert_eq!(layout.alignment(7), Alignment::Multiple(8));
        assert_eq!(layout.alignment(6), Alignment::Multiple(2));
    }

    #[test]
    fn level_box_out_of_range() {
        let layout = RefinementLayout::new(&centered(2, 3)).unwrap();
        assert_eq!(
            layout.level_box(4),
            Err(MeshHierarchyError::LevelOutOfRange {
                level: 4,
                levelmax: 3
            })
        );
    }
}
