//! RectField: a dense 3D array with an optional uniform ghost border.
//!
//! The buffer is laid out with `z` varying fastest, then `y`, then `x`.
//! With a border of width `nbnd`, logical index `0` sits at buffer index
//! `nbnd` along each axis, so valid logical indices run over
//! `[-nbnd, size + nbnd)`. `size(dim)` always reports the interior extent.
//!
//! The placement offset is carried only as metadata for the owning
//! hierarchy; it never enters the index arithmetic.

use core::fmt::{self, Debug};
use core::marker::PhantomData;
use core::ops::{AddAssign, DivAssign, Index, IndexMut, MulAssign, SubAssign};

use itertools::iproduct;
use num_traits::NumAssign;

use crate::data::storage::{Storage, VecStorage};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshHierarchyError;

/// Cell counts along `x`, `y`, `z`.
pub type Extent3 = [usize; 3];
/// Integer placement offsets along `x`, `y`, `z`.
pub type Offset3 = [i64; 3];
/// Logical cell index `(i, j, k)`; may be negative inside the ghost border.
pub type Index3 = [i64; 3];

/// Dense rectangular field of `T` values with an optional ghost border.
///
/// # Invariants
///
/// - The buffer holds exactly `(nx+2nbnd)*(ny+2nbnd)*(nz+2nbnd)` elements.
/// - The shape never changes after construction; a new shape is a new field.
#[derive(Clone, PartialEq)]
pub struct RectField<T, S: Storage<T> = VecStorage<T>> {
    extent: Extent3,
    nbnd: usize,
    offset: Offset3,
    data: S,
    _marker: PhantomData<T>,
}

impl<T, S: Storage<T>> Debug for RectField<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RectField")
            .field("extent", &self.extent)
            .field("nbnd", &self.nbnd)
            .field("offset", &self.offset)
            .field("data", &self.data)
            .finish()
    }
}

fn allocated_len(extent: Extent3, nbnd: usize) -> usize {
    extent.iter().map(|&n| n + 2 * nbnd).product()
}

impl<T, S: Storage<T>> RectField<T, S> {
    /// Interior (border-excluded) extent along all three axes.
    #[inline]
    pub fn extent(&self) -> Extent3 {
        self.extent
    }

    /// Interior extent along `dim` (0 = x, 1 = y, 2 = z).
    ///
    /// # Panics
    /// If `dim > 2`.
    #[inline]
    pub fn size(&self, dim: usize) -> usize {
        self.extent[dim]
    }

    /// Extent along `dim` including both ghost layers.
    #[inline]
    pub fn allocated_size(&self, dim: usize) -> usize {
        self.extent[dim] + 2 * self.nbnd
    }

    /// Ghost border width.
    #[inline]
    pub fn nbnd(&self) -> usize {
        self.nbnd
    }

    /// Placement offset along `dim`.
    #[inline]
    pub fn offset(&self, dim: usize) -> i64 {
        self.offset[dim]
    }

    /// Placement offsets along all three axes.
    #[inline]
    pub fn offsets(&self) -> Offset3 {
        self.offset
    }

    /// Overwrite the placement offset along `dim`.
    #[inline]
    pub fn set_offset(&mut self, dim: usize, value: i64) {
        self.offset[dim] = value;
    }

    /// Number of elements in the buffer, ghost cells included.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of interior cells, `nx * ny * nz`.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.extent.iter().product()
    }

    /// Raw buffer in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }

    /// Mutable raw buffer in storage order.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    /// Buffer position of a logical index, or `None` outside the ghosted extent.
    pub fn linear_index(&self, idx: Index3) -> Option<usize> {
        let nb = self.nbnd as i64;
        let mut lin = 0usize;
        for d in 0..3 {
            let alloc = self.allocated_size(d);
            let shifted = idx[d] + nb;
            if shifted < 0 || shifted as usize >= alloc {
                return None;
            }
            lin = lin * alloc + shifted as usize;
        }
        Some(lin)
    }

    /// True if `idx` addresses a cell of this field (interior or ghost).
    #[inline]
    pub fn contains(&self, idx: Index3) -> bool {
        self.linear_index(idx).is_some()
    }

    /// True if `idx` lies in the interior `[0, size)` on every axis.
    #[inline]
    pub fn contains_interior(&self, idx: Index3) -> bool {
        idx.iter()
            .zip(self.extent)
            .all(|(&i, n)| i >= 0 && (i as usize) < n)
    }

    /// Interior indices in storage order (`z` fastest).
    pub fn interior_indices(&self) -> impl Iterator<Item = Index3> + use<T, S> {
        let [nx, ny, nz] = self.extent.map(|n| n as i64);
        iproduct!(0..nx, 0..ny, 0..nz).map(|(i, j, k)| [i, j, k])
    }

    fn out_of_bounds(&self, index: Index3) -> MeshHierarchyError {
        MeshHierarchyError::IndexOutOfBounds {
            index,
            extent: self.extent,
            nbnd: self.nbnd,
        }
    }
}

impl<T, S> RectField<T, S>
where
    T: Copy + NumAssign,
    S: Storage<T>,
{
    /// Zero-filled field without a ghost border.
    pub fn new(extent: Extent3, offset: Offset3) -> Self {
        Self::with_border(0, extent, offset)
    }

    /// Zero-filled field with `nbnd` ghost cells on every side.
    pub fn with_border(nbnd: usize, extent: Extent3, offset: Offset3) -> Self {
        Self::filled(nbnd, extent, offset, T::zero())
    }

    /// Field whose every element (ghosts included) starts as `value`.
    pub fn filled(nbnd: usize, extent: Extent3, offset: Offset3, value: T) -> Self {
        Self {
            extent,
            nbnd,
            offset,
            data: S::with_len(allocated_len(extent, nbnd), value),
            _marker: PhantomData,
        }
    }

    /// Shape-only copy: same extents, border and offset, fresh zeroed buffer.
    pub fn shape_like(&self) -> Self {
        Self::with_border(self.nbnd, self.extent, self.offset)
    }

    /// Set every element, ghosts included, to zero.
    pub fn zero(&mut self) {
        self.data.fill(T::zero());
    }

    /// Set every element, ghosts included, to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Read a cell by logical index.
    pub fn try_get(&self, idx: Index3) -> Result<T, MeshHierarchyError> {
        self.linear_index(idx)
            .map(|lin| self.data.as_slice()[lin])
            .ok_or_else(|| self.out_of_bounds(idx))
    }

    /// Write a cell by logical index.
    pub fn try_set(&mut self, idx: Index3, value: T) -> Result<(), MeshHierarchyError> {
        let lin = self
            .linear_index(idx)
            .ok_or_else(|| self.out_of_bounds(idx))?;
        self.data.as_mut_slice()[lin] = value;
        Ok(())
    }

    /// Zero the ghost shell, leaving the interior untouched.
    ///
    /// One sweep per axis zeroes the low and high border slabs across the
    /// full ghosted extent of the other two axes. Edges and corners are
    /// visited more than once.
    pub fn zero_bnd(&mut self) {
        if self.nbnd == 0 {
            return;
        }
        let nb = self.nbnd as i64;
        let [nx, ny, nz] = self.extent.map(|n| n as i64);
        let zero = T::zero();

        for (j, k, i) in iproduct!(-nb..ny + nb, -nb..nz + nb, -nb..0) {
            self[[i, j, k]] = zero;
            self[[nx - 1 - i, j, k]] = zero;
        }
        for (i, k, j) in iproduct!(-nb..nx + nb, -nb..nz + nb, -nb..0) {
            self[[i, j, k]] = zero;
            self[[i, ny - 1 - j, k]] = zero;
        }
        for (i, j, k) in iproduct!(-nb..nx + nb, -nb..ny + nb, -nb..0) {
            self[[i, j, k]] = zero;
            self[[i, j, nz - 1 - k]] = zero;
        }
    }

    /// Elementwise `self[i] += rhs[i]` over the raw buffers.
    ///
    /// # Errors
    /// `IncompatibleShape` if the element counts differ. Only the counts are
    /// compared: equal-volume fields of different shape combine in buffer
    /// order.
    pub fn try_add_assign<S2: Storage<T>>(
        &mut self,
        rhs: &RectField<T, S2>,
    ) -> Result<(), MeshHierarchyError> {
        self.zip_apply(rhs, |a, b| *a += b)
    }

    /// Elementwise `self[i] -= rhs[i]`; see [`try_add_assign`](Self::try_add_assign).
    pub fn try_sub_assign<S2: Storage<T>>(
        &mut self,
        rhs: &RectField<T, S2>,
    ) -> Result<(), MeshHierarchyError> {
        self.zip_apply(rhs, |a, b| *a -= b)
    }

    /// Elementwise `self[i] *= rhs[i]`; see [`try_add_assign`](Self::try_add_assign).
    pub fn try_mul_assign<S2: Storage<T>>(
        &mut self,
        rhs: &RectField<T, S2>,
    ) -> Result<(), MeshHierarchyError> {
        self.zip_apply(rhs, |a, b| *a *= b)
    }

    /// Elementwise `self[i] /= rhs[i]`; see [`try_add_assign`](Self::try_add_assign).
    pub fn try_div_assign<S2: Storage<T>>(
        &mut self,
        rhs: &RectField<T, S2>,
    ) -> Result<(), MeshHierarchyError> {
        self.zip_apply(rhs, |a, b| *a /= b)
    }

    /// True if elementwise arithmetic against `rhs` is allowed.
    pub fn is_compatible<S2: Storage<T>>(&self, rhs: &RectField<T, S2>) -> bool {
        allocated_len(self.extent, self.nbnd) == allocated_len(rhs.extent, rhs.nbnd)
    }

    fn zip_apply<S2, F>(&mut self, rhs: &RectField<T, S2>, op: F) -> Result<(), MeshHierarchyError>
    where
        S2: Storage<T>,
        F: Fn(&mut T, T),
    {
        if !self.is_compatible(rhs) {
            return Err(MeshHierarchyError::IncompatibleShape {
                expected: allocated_len(self.extent, self.nbnd),
                found: allocated_len(rhs.extent, rhs.nbnd),
            });
        }
        for (a, &b) in self.data.as_mut_slice().iter_mut().zip(rhs.as_slice()) {
            op(a, b);
        }
        Ok(())
    }
}

impl<T, S: Storage<T>> Index<Index3> for RectField<T, S> {
    type Output = T;

    fn index(&self, idx: Index3) -> &T {
        match self.linear_index(idx) {
            Some(lin) => &self.data.as_slice()[lin],
            None => panic!(
                "RectField index {idx:?} out of bounds (extent {:?}, nbnd {})",
                self.extent, self.nbnd
            ),
        }
    }
}

impl<T, S: Storage<T>> IndexMut<Index3> for RectField<T, S> {
    fn index_mut(&mut self, idx: Index3) -> &mut T {
        match self.linear_index(idx) {
            Some(lin) => &mut self.data.as_mut_slice()[lin],
            None => panic!(
                "RectField index {idx:?} out of bounds (extent {:?}, nbnd {})",
                self.extent, self.nbnd
            ),
        }
    }
}

macro_rules! impl_scalar_assign {
    ($($op:ident :: $method:ident),* $(,)?) => {$(
        impl<T, S> $op<T> for RectField<T, S>
        where
            T: Copy + NumAssign,
            S: Storage<T>,
        {
            fn $method(&mut self, rhs: T) {
                for v in self.data.as_mut_slice() {
                    $op::$method(v, rhs);
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

impl<T, S: Storage<T>> DebugInvariants for RectField<T, S> {
    fn validate_invariants(&self) -> Result<(), MeshHierarchyError> {
        let expected = allocated_len(self.extent, self.nbnd);
        if self.data.len() != expected {
            return Err(MeshHierarchyError::IncompatibleShape {
                expected,
                found: self.data.len(),
            });
        }
        Ok(())
    }
}
