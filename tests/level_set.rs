mod util;
use mesh_hierarchy::DebugInvariants;
use mesh_hierarchy::hierarchy::LevelSet;
use mesh_hierarchy::mesh_error::MeshHierarchyError;
use util::*;

#[test]
fn create_base_builds_full_domain_levels() {
    let mut h: LevelSet<f64> = LevelSet::new(2);
    h.create_base(3);
    assert_eq!(h.num_levels(), 4);
    assert_eq!(h.levelmin(), 3);
    assert_eq!(h.levelmax(), 3);
    for level in 0..=3 {
        let grid = h.get(level).unwrap();
        assert_eq!(grid.extent(), [1 << level; 3]);
        assert_eq!(grid.nbnd(), 2);
        assert!(grid.as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(h.offset_abs(level, 0), 0);
    }
}

#[test]
fn get_past_levelmax_is_out_of_range() {
    let mut h: LevelSet<f64> = LevelSet::new(0);
    h.create_base(3);
    assert_eq!(
        h.get(4).unwrap_err(),
        MeshHierarchyError::LevelOutOfRange {
            level: 4,
            levelmax: 3
        }
    );
    assert_eq!(
        h.count_leaf_cells(0, 5),
        Err(MeshHierarchyError::LevelOutOfRange {
            level: 5,
            levelmax: 3
        })
    );
}

#[test]
fn add_patch_tracks_absolute_offset() {
    let h = small_hierarchy(1);
    assert_eq!(h.levelmax(), 3);
    assert_eq!(h.levelmin(), 2);
    assert_eq!(h.offset(3, 1), 1);
    assert_eq!(h.offset_abs(3, 1), 2);
    assert_eq!(h.size(3, 2), 4);
    assert_offsets_nested(&h);
}

#[test]
fn refined_cells_and_leaf_count() {
    let h = small_hierarchy(0);
    assert!(h.is_refined(2, 1, 1, 1));
    assert!(h.is_refined(2, 2, 2, 2));
    assert!(!h.is_refined(2, 3, 1, 1));
    assert!(!h.is_refined(2, 0, 2, 2));
    assert!(!h.is_refined(3, 0, 0, 0));
    // 64 fine cells plus 64 - 8 uncovered coarse cells
    assert_eq!(h.count_leaf_cells(2, 3), Ok(120));
    assert_eq!(h.count_all_leaf_cells(), Ok(120));
}

#[test]
fn full_base_has_only_finest_leaves() {
    let mut h: LevelSet<f64> = LevelSet::new(0);
    h.create_base(3);
    assert_eq!(h.count_leaf_cells(0, 3), Ok(512));
}

#[test]
fn cell_pos_is_cell_center() {
    let mut h: LevelSet<f64> = LevelSet::new(0);
    h.create_base(3);
    assert_eq!(h.cell_pos(3, 0, 0, 0), [0.0625; 3]);
    let p = small_hierarchy(0).cell_pos(3, 0, 1, 3);
    assert_eq!(p, [2.5 / 8.0, 3.5 / 8.0, 5.5 / 8.0]);
}

#[test]
fn cell_pos_outside_domain_still_returns() {
    let mut h: LevelSet<f64> = LevelSet::new(0);
    h.create_base(3);
    assert_eq!(h.cell_pos(3, 8, 0, -1), [8.5 / 8.0, 0.0625, -0.0625]);
}

#[test]
fn cut_patch_shrinks_and_keeps_overlap() {
    let mut h = small_hierarchy(1);
    let grid = h.get_mut(3).unwrap();
    grid[[0, 0, 0]] = 5.0;
    grid[[2, 0, 0]] = 7.0;
    grid[[3, 3, 3]] = 9.0;

    h.cut_patch(3, [4, 2, 2], [2, 4, 4]).unwrap();
    let grid = h.get(3).unwrap();
    assert_eq!(grid.extent(), [2, 4, 4]);
    assert_eq!(grid.offsets(), [2, 1, 1]);
    assert_eq!(h.offset_abs(3, 0), 4);
    assert_eq!(grid[[0, 0, 0]], 7.0);
    assert_eq!(grid[[1, 3, 3]], 9.0);
    assert_eq!(grid.as_slice().iter().filter(|&&v| v != 0.0).count(), 2);
    assert_offsets_nested(&h);
}

#[test]
fn cut_patch_grows_with_zero_fill() {
    let mut h = small_hierarchy(0);
    h.get_mut(3).unwrap().fill(1.0);

    h.cut_patch(3, [0, 2, 2], [8, 4, 4]).unwrap();
    let grid = h.get(3).unwrap();
    assert_eq!(grid.offsets(), [0, 1, 1]);
    for i in 0..8 {
        let expected = if (2..6).contains(&i) { 1.0 } else { 0.0 };
        assert_eq!(grid[[i, 0, 0]], expected, "i = {i}");
    }
    assert_eq!(h.levelmin(), 2);
}

#[test]
fn cut_patch_keeps_finer_level_in_place() {
    let mut h = small_hierarchy(0);
    h.add_patch([1, 1, 1], [4, 4, 4]).unwrap();
    assert_eq!(h.offset_abs(4, 0), 6);

    h.cut_patch(3, [0, 2, 2], [8, 4, 4]).unwrap();
    assert_eq!(h.offset(4, 0), 3);
    assert_eq!(h.offset_abs(4, 0), 6);
    assert_offsets_nested(&h);
    assert!(h.validate_invariants().is_ok());
}

#[test]
fn cutting_levelmin_lowers_it() {
    let mut h: LevelSet<f64> = LevelSet::new(0);
    h.create_base(3);
    h.cut_patch(3, [2, 2, 2], [4, 4, 4]).unwrap();
    assert_eq!(h.levelmin(), 2);
    assert_eq!(h.offset(3, 0), 1);
    assert_eq!(h.count_leaf_cells(2, 3), Ok(64 + 56));
}

#[test]
fn cut_patch_validates_input() {
    let mut h = small_hierarchy(0);
    assert_eq!(
        h.cut_patch(5, [0, 0, 0], [2, 2, 2]),
        Err(MeshHierarchyError::LevelOutOfRange {
            level: 5,
            levelmax: 3
        })
    );
    assert_eq!(
        h.cut_patch(3, [2, 2, 2], [0, 2, 2]),
        Err(MeshHierarchyError::ZeroExtent([0, 2, 2]))
    );
}

#[test]
fn hierarchy_arithmetic() {
    let mut a = small_hierarchy(1);
    a += 3.0;
    let mut b = a.clone();
    b *= 2.0;
    assert!(a.is_consistent(&b));

    a.try_add_assign(&b).unwrap();
    assert!(a.get(3).unwrap().as_slice().iter().all(|&v| v == 9.0));
    a.try_div_assign(&b).unwrap();
    assert!(a.get(0).unwrap().as_slice().iter().all(|&v| v == 1.5));
    a.try_sub_assign(&b).unwrap();
    a.try_mul_assign(&b).unwrap();
    assert_eq!(a.get(2).unwrap()[[0, 0, 0]], -27.0);
    a -= 1.0;
    a /= 4.0;
    assert_eq!(a.get(2).unwrap()[[0, 0, 0]], -7.0);
}

#[test]
fn inconsistent_hierarchies_are_untouched() {
    let mut a = small_hierarchy(0);
    a += 1.0;
    let mut b = small_hierarchy(0);
    b.cut_patch(3, [4, 2, 2], [2, 4, 4]).unwrap();
    assert!(!a.is_consistent(&b));

    let before = a.clone();
    let err = a.try_add_assign(&b).unwrap_err();
    assert!(matches!(err, MeshHierarchyError::IncompatibleHierarchy(_)));
    assert_eq!(a, before);

    let mut c: LevelSet<f64> = LevelSet::new(0);
    c.create_base(2);
    assert!(!a.is_consistent(&c));
}

#[test]
fn zero_and_clone_are_deep() {
    let mut a = small_hierarchy(1);
    a += 2.0;
    let b = a.clone();
    a.zero();
    assert!(a.get(3).unwrap().as_slice().iter().all(|&v| v == 0.0));
    assert!(b.get(3).unwrap().as_slice().iter().all(|&v| v == 2.0));
}
