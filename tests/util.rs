#![allow(dead_code)]
use mesh_hierarchy::config::{KeyValueStore, RefinementConfig, RegionAnchor, RegionSpec};
use mesh_hierarchy::hierarchy::{LevelSet, RefinementLayout};

/// Store with the keys every layout needs; anchor keys are left to the caller.
pub fn base_store(levelmin: usize, levelmax: usize, padding: usize, align_top: bool) -> KeyValueStore {
    KeyValueStore::new()
        .with("setup", "levelmin", levelmin.to_string())
        .with("setup", "levelmax", levelmax.to_string())
        .with("setup", "padding", padding.to_string())
        .with("setup", "align_top", if align_top { "yes" } else { "no" })
}

/// Cubic region of edge `extent` centered at `center`.
pub fn centered(levelmin: usize, levelmax: usize, center: [f64; 3], extent: f64) -> RefinementConfig {
    RefinementConfig {
        levelmin,
        levelmax,
        levelmin_tf: None,
        padding: 1,
        align_top: false,
        region: RegionSpec {
            extent: [extent; 3],
            anchor: RegionAnchor::Center(center),
        },
        no_shift: false,
        force_shift: false,
    }
}

/// levelmin 5, levelmax 7, padding 1, a 0.25 cube at the domain center.
pub fn reference_layout() -> RefinementLayout {
    RefinementLayout::new(&centered(5, 7, [0.5; 3], 0.25)).unwrap()
}

/// Base hierarchy up to level 2 plus a 4^3 patch at absolute offset 2 on level 3.
pub fn small_hierarchy(nbnd: usize) -> LevelSet<f64> {
    let mut h = LevelSet::new(nbnd);
    h.create_base(2);
    h.add_patch([1, 1, 1], [4, 4, 4]).unwrap();
    h
}

/// Assert every level obeys `offset_abs(l) == 2 * (offset_abs(l-1) + offset(l))`.
pub fn assert_offsets_nested(h: &LevelSet<f64>) {
    for level in 1..=h.levelmax() {
        for d in 0..3 {
            assert_eq!(
                h.offset_abs(level, d),
                2 * (h.offset_abs(level - 1, d) + h.offset(level, d)),
                "level {level}, axis {d}"
            );
        }
    }
}
