//! LevelSet: one [`RectField`] per refinement level.
//!
//! Level `0` is the coarsest grid (a single cell per axis), level `levelmax`
//! the finest patch. Every level stores two positions:
//!
//! - the *relative* offset, kept as the field's placement offset and counted
//!   in cells of the next coarser level;
//! - the *absolute* offset, counted in the level's own cells from the domain
//!   origin.
//!
//! `levelmin` is the finest level whose grid still spans the whole domain.
//!
//! # Invariants
//!
//! - For every level `l >= 1`:
//!   `offset_abs(l) == 2 * (offset_abs(l - 1) + offset(l))`.
//! - The grid at `levelmin` has absolute offset zero and extent `2^levelmin`.
//! - All levels share the same ghost width.
//!
//! Structural changes go through [`LevelSet::create_base`],
//! [`LevelSet::add_patch`] and [`LevelSet::cut_patch`] only.

use core::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

use itertools::iproduct;
use num_traits::NumAssign;

use crate::data::rect_field::{Extent3, Offset3, RectField};
use crate::data::storage::{Storage, VecStorage};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshHierarchyError;

/// Ordered, owning collection of per-level fields.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelSet<T, S: Storage<T> = VecStorage<T>> {
    nbnd: usize,
    levelmin: usize,
    grids: Vec<RectField<T, S>>,
    offset_abs: Vec<Offset3>,
}

fn full_extent(level: usize) -> Extent3 {
    [1usize << level; 3]
}

impl<T, S: Storage<T>> LevelSet<T, S> {
    /// Empty hierarchy whose levels will carry `nbnd` ghost cells.
    pub fn new(nbnd: usize) -> Self {
        Self {
            nbnd,
            levelmin: 0,
            grids: Vec::new(),
            offset_abs: Vec::new(),
        }
    }

    /// Ghost width shared by all levels.
    #[inline]
    pub fn nbnd(&self) -> usize {
        self.nbnd
    }

    /// Finest level that still covers the whole domain.
    #[inline]
    pub fn levelmin(&self) -> usize {
        self.levelmin
    }

    /// Finest level index; `0` for an empty hierarchy.
    #[inline]
    pub fn levelmax(&self) -> usize {
        self.grids.len().saturating_sub(1)
    }

    /// Number of stored levels.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.grids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Release every level at once and reset `levelmin`.
    pub fn clear(&mut self) {
        self.grids.clear();
        self.offset_abs.clear();
        self.levelmin = 0;
    }

    fn check_level(&self, level: usize) -> Result<(), MeshHierarchyError> {
        if self.grids.is_empty() {
            return Err(MeshHierarchyError::EmptyHierarchy);
        }
        if level >= self.grids.len() {
            return Err(MeshHierarchyError::LevelOutOfRange {
                level,
                levelmax: self.levelmax(),
            });
        }
        Ok(())
    }

    /// The field stored for `level`.
    ///
    /// # Errors
    /// `LevelOutOfRange` if `level > levelmax`, `EmptyHierarchy` if no level
    /// exists yet.
    pub fn get(&self, level: usize) -> Result<&RectField<T, S>, MeshHierarchyError> {
        self.check_level(level)?;
        Ok(&self.grids[level])
    }

    /// Mutable access to the field stored for `level`.
    pub fn get_mut(&mut self, level: usize) -> Result<&mut RectField<T, S>, MeshHierarchyError> {
        self.check_level(level)?;
        Ok(&mut self.grids[level])
    }

    /// Iterate over `(level, field)` from coarsest to finest.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RectField<T, S>)> {
        self.grids.iter().enumerate()
    }

    /// Interior extent of `level` along `dim`.
    ///
    /// # Panics
    /// If `level > levelmax` or `dim > 2`.
    #[inline]
    pub fn size(&self, level: usize, dim: usize) -> usize {
        self.grids[level].size(dim)
    }

    /// Offset of `level` relative to its parent, in parent cells.
    ///
    /// # Panics
    /// If `level > levelmax` or `dim > 2`.
    #[inline]
    pub fn offset(&self, level: usize, dim: usize) -> i64 {
        self.grids[level].offset(dim)
    }

    /// Offset of `level` from the domain origin, in that level's cells.
    ///
    /// # Panics
    /// If `level > levelmax` or `dim > 2`.
    #[inline]
    pub fn offset_abs(&self, level: usize, dim: usize) -> i64 {
        self.offset_abs[level][dim]
    }

    /// Physical position of cell `(i, j, k)` on `level` in the unit cube.
    ///
    /// Coordinates outside `[0, 1)` are logged as a warning and returned
    /// unchanged.
    ///
    /// # Panics
    /// If `level > levelmax`.
    pub fn cell_pos(&self, level: usize, i: i64, j: i64, k: i64) -> [f64; 3] {
        let h = 1.0 / (1u64 << level) as f64;
        let abs = self.offset_abs[level];
        let idx = [i, j, k];
        let pos: [f64; 3] = std::array::from_fn(|d| h * (abs[d] as f64 + idx[d] as f64 + 0.5));
        if pos.iter().any(|x| !(0.0..1.0).contains(x)) {
            log::warn!(
                "Cell seems outside domain: level {level}, index ({i}, {j}, {k}) -> ({:.6}, {:.6}, {:.6})",
                pos[0],
                pos[1],
                pos[2]
            );
        }
        pos
    }

    /// True if cell `(i, j, k)` of `level` is covered by the next finer patch.
    ///
    /// Always false on the finest level.
    pub fn is_refined(&self, level: usize, i: i64, j: i64, k: i64) -> bool {
        if level >= self.levelmax() {
            return false;
        }
        let fine = &self.grids[level + 1];
        [i, j, k].iter().enumerate().all(|(d, &x)| {
            let lo = fine.offset(d);
            x >= lo && x < lo + (fine.size(d) / 2) as i64
        })
    }

    /// Number of interior cells on levels `lmin..=lmax` that are not refined.
    ///
    /// # Errors
    /// `LevelOutOfRange` if `lmax > levelmax`.
    pub fn count_leaf_cells(&self, lmin: usize, lmax: usize) -> Result<usize, MeshHierarchyError> {
        self.check_level(lmax)?;
        let count = (lmin..=lmax)
            .rev()
            .map(|level| {
                self.grids[level]
                    .interior_indices()
                    .filter(|&[i, j, k]| !self.is_refined(level, i, j, k))
                    .count()
            })
            .sum();
        Ok(count)
    }

    /// Leaf cells over `levelmin..=levelmax`.
    pub fn count_all_leaf_cells(&self) -> Result<usize, MeshHierarchyError> {
        self.count_leaf_cells(self.levelmin, self.levelmax())
    }

    /// Re-derive `levelmin` as the highest level spanning the whole domain.
    ///
    /// Level `0` is used when no finer level qualifies.
    pub fn find_new_levelmin(&mut self) -> usize {
        let old = self.levelmin;
        let mut levelmin = 0;
        for (level, grid) in self.grids.iter().enumerate() {
            if self.offset_abs[level] == [0; 3] && grid.extent() == full_extent(level) {
                levelmin = level;
            }
        }
        self.levelmin = levelmin;
        if old != levelmin {
            log::debug!("LevelSet: levelmin changed from {old} to {levelmin}");
        }
        levelmin
    }

    /// True if `other` has the same levels, ghost width, sizes and offsets.
    pub fn is_consistent<S2: Storage<T>>(&self, other: &LevelSet<T, S2>) -> bool {
        self.consistency_error(other).is_none()
    }

    fn consistency_error<S2: Storage<T>>(&self, other: &LevelSet<T, S2>) -> Option<String> {
        if self.grids.len() != other.grids.len() {
            return Some(format!(
                "{} levels vs {} levels",
                self.grids.len(),
                other.grids.len()
            ));
        }
        if self.levelmin != other.levelmin {
            return Some(format!(
                "levelmin {} vs {}",
                self.levelmin, other.levelmin
            ));
        }
        if self.nbnd != other.nbnd {
            return Some(format!("ghost width {} vs {}", self.nbnd, other.nbnd));
        }
        for (level, (a, b)) in self.grids.iter().zip(&other.grids).enumerate() {
            if a.extent() != b.extent() {
                return Some(format!(
                    "level {level} size {:?} vs {:?}",
                    a.extent(),
                    b.extent()
                ));
            }
            if a.offsets() != b.offsets() {
                return Some(format!(
                    "level {level} offset {:?} vs {:?}",
                    a.offsets(),
                    b.offsets()
                ));
            }
        }
        None
    }
}

impl<T, S> LevelSet<T, S>
where
    T: Copy + NumAssign,
    S: Storage<T>,
{
    /// Reset to `levelmax + 1` full-domain levels, level `i` sized `2^i` per
    /// axis, all zero, with `levelmin = levelmax`.
    pub fn create_base(&mut self, levelmax: usize) {
        self.clear();
        for level in 0..=levelmax {
            self.grids
                .push(RectField::with_border(self.nbnd, full_extent(level), [0; 3]));
            self.offset_abs.push([0; 3]);
        }
        self.levelmin = levelmax;
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        self.debug_assert_invariants();
    }

    /// Append a new finest level.
    ///
    /// `offset` is measured in cells of the current finest level and
    /// `extent` in cells of the new one. Returns the new level index.
    ///
    /// # Errors
    /// `EmptyHierarchy` if there is no level to refine, `ZeroExtent` for an
    /// empty patch.
    pub fn add_patch(&mut self, offset: Offset3, extent: Extent3) -> Result<usize, MeshHierarchyError> {
        let parent_abs = *self
            .offset_abs
            .last()
            .ok_or(MeshHierarchyError::EmptyHierarchy)?;
        if extent.contains(&0) {
            return Err(MeshHierarchyError::ZeroExtent(extent));
        }
        let abs: Offset3 = std::array::from_fn(|d| 2 * (parent_abs[d] + offset[d]));
        self.grids
            .push(RectField::with_border(self.nbnd, extent, offset));
        self.offset_abs.push(abs);
        let level = self.levelmax();
        log::debug!("LevelSet: added level {level} at {abs:?} (relative {offset:?}), size {extent:?}");
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        self.debug_assert_invariants();
        Ok(level)
    }

    /// Replace the patch on `level` by one at absolute offset `offset_abs`
    /// with extent `extent`, keeping the data where old and new overlap.
    ///
    /// The finer level, if any, keeps its absolute position: its relative
    /// offset absorbs the move. `levelmin` is re-derived afterwards.
    ///
    /// # Errors
    /// `LevelOutOfRange`, `ZeroExtent`, or `MisalignedPatch` when a level
    /// above `0` would move by an odd number of its own cells.
    pub fn cut_patch(
        &mut self,
        level: usize,
        offset_abs: Offset3,
        extent: Extent3,
    ) -> Result<(), MeshHierarchyError> {
        self.check_level(level)?;
        if extent.contains(&0) {
            return Err(MeshHierarchyError::ZeroExtent(extent));
        }
        let old_abs = self.offset_abs[level];
        let delta: Offset3 = std::array::from_fn(|d| offset_abs[d] - old_abs[d]);
        if level > 0 && delta.iter().any(|&x| x % 2 != 0) {
            return Err(MeshHierarchyError::MisalignedPatch { level, delta });
        }

        let old = &self.grids[level];
        let relative: Offset3 = std::array::from_fn(|d| old.offset(d) + delta[d] / 2);
        let mut patch = RectField::with_border(self.nbnd, extent, relative);
        let [nx, ny, nz] = extent.map(|n| n as i64);
        for (i, j, k) in iproduct!(0..nx, 0..ny, 0..nz) {
            let src = [i + delta[0], j + delta[1], k + delta[2]];
            if old.contains_interior(src) {
                patch[[i, j, k]] = old[src];
            }
        }

        self.grids[level] = patch;
        self.offset_abs[level] = offset_abs;
        if let Some(fine) = self.grids.get_mut(level + 1) {
            for d in 0..3 {
                fine.set_offset(d, fine.offset(d) - delta[d]);
            }
        }
        log::debug!("LevelSet: cut level {level} to {offset_abs:?}, size {extent:?}");

        self.find_new_levelmin();
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        self.debug_assert_invariants();
        Ok(())
    }

    /// Set every level to zero.
    pub fn zero(&mut self) {
        for grid in &mut self.grids {
            grid.zero();
        }
    }

    /// Level-by-level `self += rhs`.
    ///
    /// # Errors
    /// `IncompatibleHierarchy` unless the two hierarchies are structurally
    /// consistent; `self` is left untouched in that case.
    pub fn try_add_assign<S2: Storage<T>>(&mut self, rhs: &LevelSet<T, S2>) -> Result<(), MeshHierarchyError> {
        self.zip_levels(rhs, |a, b| a.try_add_assign(b))
    }

    /// Level-by-level `self -= rhs`; see [`try_add_assign`](Self::try_add_assign).
    pub fn try_sub_assign<S2: Storage<T>>(&mut self, rhs: &LevelSet<T, S2>) -> Result<(), MeshHierarchyError> {
        self.zip_levels(rhs, |a, b| a.try_sub_assign(b))
    }

    /// Level-by-level `self *= rhs`; see [`try_add_assign`](Self::try_add_assign).
    pub fn try_mul_assign<S2: Storage<T>>(&mut self, rhs: &LevelSet<T, S2>) -> Result<(), MeshHierarchyError> {
        self.zip_levels(rhs, |a, b| a.try_mul_assign(b))
    }

    /// Level-by-level `self /= rhs`; see [`try_add_assign`](Self::try_add_assign).
    pub fn try_div_assign<S2: Storage<T>>(&mut self, rhs: &LevelSet<T, S2>) -> Result<(), MeshHierarchyError> {
        self.zip_levels(rhs, |a, b| a.try_div_assign(b))
    }

    fn zip_levels<S2, F>(&mut self, rhs: &LevelSet<T, S2>, op: F) -> Result<(), MeshHierarchyError>
    where
        S2: Storage<T>,
        F: Fn(&mut RectField<T, S>, &RectField<T, S2>) -> Result<(), MeshHierarchyError>,
    {
        if let Some(reason) = self.consistency_error(rhs) {
            return Err(MeshHierarchyError::IncompatibleHierarchy(reason));
        }
        for (a, b) in self.grids.iter_mut().zip(&rhs.grids) {
            op(a, b)?;
        }
        Ok(())
    }
}

macro_rules! impl_scalar_assign {
    ($($op:ident :: $method:ident),* $(,)?) => {$(
        impl<T, S> $op<T> for LevelSet<T, S>
        where
            T: Copy + NumAssign,
            S: Storage<T>,
        {
            fn $method(&mut self, rhs: T) {
                for grid in &mut self.grids {
                    $op::$method(grid, rhs);
                }
            }
        }
    )*};
}

impl_scalar_assign!(
    AddAssign::add_assign,
    SubAssign::sub_assign,
    MulAssign::mul_assign,
    DivAssign::div_assign,
);

impl<T, S: Storage<T>> DebugInvariants for LevelSet<T, S> {
    fn validate_invariants(&self) -> Result<(), MeshHierarchyError> {
        if self.offset_abs.len() != self.grids.len() {
            return Err(MeshHierarchyError::InvariantViolation(format!(
                "{} absolute offsets for {} levels",
                self.offset_abs.len(),
                self.grids.len()
            )));
        }
        if self.grids.is_empty() {
            return Ok(());
        }
        for (level, grid) in self.grids.iter().enumerate() {
            grid.validate_invariants()?;
            if grid.nbnd() != self.nbnd {
                return Err(MeshHierarchyError::InvariantViolation(format!(
                    "level {level} has {} ghost cells, hierarchy uses {}",
                    grid.nbnd(),
                    self.nbnd
                )));
            }
            if level == 0 {
                continue;
            }
            let (parent, abs) = (self.offset_abs[level - 1], self.offset_abs[level]);
            let rel = grid.offsets();
            if (0..3).any(|d| abs[d] != 2 * (parent[d] + rel[d])) {
                return Err(MeshHierarchyError::InvariantViolation(format!(
                    "level {level}: absolute offset {abs:?} does not match parent {parent:?} + relative {rel:?}"
                )));
            }
        }
        let lmin = self.levelmin;
        if lmin > self.levelmax() {
            return Err(MeshHierarchyError::LevelOutOfRange {
                level: lmin,
                levelmax: self.levelmax(),
            });
        }
        if lmin > 0
            && (self.offset_abs[lmin] != [0; 3] || self.grids[lmin].extent() != full_extent(lmin))
        {
            return Err(MeshHierarchyError::InvariantViolation(format!(
                "levelmin {lmin} does not span the domain"
            )));
        }
        Ok(())
    }
}
