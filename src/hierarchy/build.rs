//! Allocation of a [`LevelSet`] from a computed [`RefinementLayout`], and the
//! reverse step of feeding patches that were cut afterwards back into the
//! layout.

use num_traits::NumAssign;

use crate::data::storage::Storage;
use crate::hierarchy::layout::RefinementLayout;
use crate::hierarchy::level_set::LevelSet;
use crate::mesh_error::MeshHierarchyError;

/// Allocate a zeroed hierarchy whose levels match `layout`.
///
/// Levels up to `levelmin` span the whole domain; each finer level is added
/// with the layout's relative offset and size, so absolute offsets agree
/// with [`RefinementLayout::offset_abs`].
pub fn build_hierarchy<T, S>(
    layout: &RefinementLayout,
    nbnd: usize,
) -> Result<LevelSet<T, S>, MeshHierarchyError>
where
    T: Copy + NumAssign,
    S: Storage<T>,
{
    let mut levels = LevelSet::new(nbnd);
    levels.create_base(layout.levelmin());
    for level in layout.levelmin() + 1..=layout.levelmax() {
        let b = layout.level_box(level)?;
        levels.add_patch(b.offset, b.size)?;
    }
    log::debug!(
        "built hierarchy with levels {}..={} and {} ghost cells",
        levels.levelmin(),
        levels.levelmax(),
        nbnd
    );
    Ok(levels)
}

impl<T, S> LevelSet<T, S>
where
    T: Copy + NumAssign,
    S: Storage<T>,
{
    /// See [`build_hierarchy`].
    pub fn from_layout(layout: &RefinementLayout, nbnd: usize) -> Result<Self, MeshHierarchyError> {
        build_hierarchy(layout, nbnd)
    }
}

/// Adjust `layout` so that every level records the box actually held by
/// `levels`, e.g. after [`LevelSet::cut_patch`]. Returns the number of
/// levels that changed.
///
/// # Errors
/// `IncompatibleHierarchy` if the two disagree on `levelmax`.
pub fn sync_layout<T, S>(
    layout: &mut RefinementLayout,
    levels: &LevelSet<T, S>,
) -> Result<usize, MeshHierarchyError>
where
    S: Storage<T>,
{
    if levels.is_empty() || levels.levelmax() != layout.levelmax() {
        return Err(MeshHierarchyError::IncompatibleHierarchy(format!(
            "layout has levelmax {}, hierarchy has {} levels",
            layout.levelmax(),
            levels.num_levels()
        )));
    }
    let mut changed = 0;
    for level in 0..=levels.levelmax() {
        let size = std::array::from_fn(|d| levels.size(level, d));
        let offset_abs = std::array::from_fn(|d| levels.offset_abs(level, d));
        let b = layout.level_box(level)?;
        if b.size != size || b.offset_abs != offset_abs {
            layout.adjust_level(level, size, offset_abs)?;
            changed += 1;
        }
    }
    Ok(changed)
}
