mod util;
use mesh_hierarchy::DebugInvariants;
use mesh_hierarchy::hierarchy::{LevelSet, build_hierarchy, sync_layout};
use util::*;

#[test]
fn built_hierarchy_matches_layout() {
    let layout = reference_layout();
    let levels: LevelSet<f64> = build_hierarchy(&layout, 2).unwrap();
    assert_eq!(levels.levelmin(), 5);
    assert_eq!(levels.levelmax(), 7);
    assert_eq!(levels.nbnd(), 2);
    for level in 0..=7 {
        for d in 0..3 {
            assert_eq!(levels.offset_abs(level, d), layout.offset_abs(level, d));
            assert_eq!(levels.size(level, d), layout.size(level, d));
        }
    }
    assert_offsets_nested(&levels);
    assert!(levels.validate_invariants().is_ok());
}

#[test]
fn leaf_cells_of_reference_hierarchy() {
    let levels: LevelSet<f64> = build_hierarchy(&reference_layout(), 0).unwrap();
    // 34^3 + (20^3 - 17^3) + (32^3 - 10^3)
    assert_eq!(levels.count_leaf_cells(5, 7), Ok(74159));
    assert_eq!(levels.count_all_leaf_cells(), Ok(74159));
}

#[test]
fn finest_cells_lie_inside_the_domain() {
    let levels: LevelSet<f64> = build_hierarchy(&reference_layout(), 0).unwrap();
    let first = levels.cell_pos(7, 0, 0, 0);
    let last = levels.cell_pos(7, 33, 33, 33);
    assert_eq!(first, [48.5 / 128.0; 3]);
    assert_eq!(last, [81.5 / 128.0; 3]);
}

#[test]
fn cut_patch_then_sync_layout() {
    let mut layout = reference_layout();
    let mut levels: LevelSet<f64> = build_hierarchy(&layout, 1).unwrap();
    levels.get_mut(7).unwrap()[[10, 10, 10]] = 1.0;

    levels.cut_patch(6, [20; 3], [24; 3]).unwrap();
    assert_eq!(levels.offset(6, 0), 10);
    assert_eq!(levels.offset(7, 0), 4);
    assert_eq!(levels.get(7).unwrap()[[10, 10, 10]], 1.0);

    assert_eq!(sync_layout(&mut layout, &levels), Ok(1));
    assert_eq!(layout.offset(6, 0), 10);
    assert_eq!(layout.offset(7, 0), 4);
    assert_eq!(layout.size(6, 0), 24);
    assert_eq!(sync_layout(&mut layout, &levels), Ok(0));
}

#[test]
fn growing_a_level_to_full_domain_moves_levelmin() {
    let mut layout = reference_layout();
    let mut levels: LevelSet<f64> = build_hierarchy(&layout, 0).unwrap();

    levels.cut_patch(6, [0; 3], [64; 3]).unwrap();
    assert_eq!(levels.levelmin(), 6);
    assert_eq!(levels.offset(7, 0), 24);
    // 34^3 + (64^3 - 17^3)
    assert_eq!(levels.count_all_leaf_cells(), Ok(296535));

    sync_layout(&mut layout, &levels).unwrap();
    assert_eq!(layout.levelmin(), 6);
    assert_eq!(layout.offset(7, 2), 24);
}

#[test]
fn rebuilding_after_sync_reproduces_the_hierarchy() {
    let mut layout = reference_layout();
    let mut levels: LevelSet<f32> = LevelSet::from_layout(&layout, 0).unwrap();
    levels.cut_patch(6, [20; 3], [24; 3]).unwrap();
    sync_layout(&mut layout, &levels).unwrap();

    let rebuilt: LevelSet<f32> = LevelSet::from_layout(&layout, 0).unwrap();
    assert!(rebuilt.is_consistent(&levels));
}
