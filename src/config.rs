//! Refinement configuration: a typed snapshot read from a key/value store.
//!
//! The geometry engine never touches the store itself. Callers read a
//! [`RefinementConfig`] once, hand it to
//! [`RefinementLayout::new`](crate::hierarchy::layout::RefinementLayout::new),
//! and write the computed shift back with [`record_shift`].
//!
//! Recognized keys (section [`SETUP_SECTION`]):
//!
//! | key            | type        | default      |
//! |----------------|-------------|--------------|
//! | `levelmin`     | integer     | required     |
//! | `levelmax`     | integer     | required     |
//! | `levelmin_TF`  | integer     | `levelmin`   |
//! | `padding`      | integer     | required     |
//! | `align_top`    | bool        | required     |
//! | `ref_extent`   | `"x,y,z"`   | required     |
//! | `ref_center`   | `"x,y,z"`   | one of these |
//! | `ref_offset`   | `"x,y,z"`   | one of these |
//! | `no_shift`     | bool        | `false`      |
//! | `force_shift`  | bool        | `false`      |

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::rect_field::Offset3;
use crate::mesh_error::MeshHierarchyError;

/// Section holding all refinement keys.
pub const SETUP_SECTION: &str = "setup";

/// Keys under which the centering shift is written back.
pub const SHIFT_KEYS: [&str; 3] = ["shift_x", "shift_y", "shift_z"];

/// Read access to a sectioned key/value store.
pub trait ConfigSource {
    /// Raw string stored under `section.key`, if any.
    fn raw_value(&self, section: &str, key: &str) -> Option<&str>;

    fn contains_key(&self, section: &str, key: &str) -> bool {
        self.raw_value(section, key).is_some()
    }
}

/// Write access to a sectioned key/value store.
pub trait ConfigSink {
    fn insert_value(&mut self, section: &str, key: &str, value: String);
}

/// Values that can be parsed from a raw configuration string.
pub trait ConfigValue: Sized {
    fn parse_config(raw: &str) -> Result<Self, String>;
}

macro_rules! impl_config_value_from_str {
    ($($ty:ty),*) => {$(
        impl ConfigValue for $ty {
            fn parse_config(raw: &str) -> Result<Self, String> {
                <$ty>::from_str(raw.trim()).map_err(|e| e.to_string())
            }
        }
    )*};
}

impl_config_value_from_str!(usize, i64, f64, String);

impl ConfigValue for bool {
    fn parse_config(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            other => Err(format!("`{other}` is not a boolean")),
        }
    }
}

impl ConfigValue for [f64; 3] {
    fn parse_config(raw: &str) -> Result<Self, String> {
        let parts = raw
            .split(',')
            .map(f64::parse_config)
            .collect::<Result<Vec<_>, _>>()?;
        <[f64; 3]>::try_from(parts)
            .map_err(|p| format!("expected three comma-separated values, found {}", p.len()))
    }
}

/// Parse the value under `section.key`, failing if it is absent.
pub fn required<V, C>(source: &C, section: &str, key: &str) -> Result<V, MeshHierarchyError>
where
    V: ConfigValue,
    C: ConfigSource + ?Sized,
{
    optional(source, section, key)?.ok_or_else(|| MeshHierarchyError::MissingConfigKey {
        section: section.to_owned(),
        key: key.to_owned(),
    })
}

/// Parse the value under `section.key` if present.
pub fn optional<V, C>(source: &C, section: &str, key: &str) -> Result<Option<V>, MeshHierarchyError>
where
    V: ConfigValue,
    C: ConfigSource + ?Sized,
{
    source
        .raw_value(section, key)
        .map(|raw| {
            V::parse_config(raw).map_err(|reason| MeshHierarchyError::InvalidConfigValue {
                key: format!("{section}.{key}"),
                value: raw.to_owned(),
                reason,
            })
        })
        .transpose()
}

/// Write the centering shift back under `shift_x`, `shift_y`, `shift_z`.
pub fn record_shift<C: ConfigSink + ?Sized>(sink: &mut C, shift: Offset3) {
    for (key, value) in SHIFT_KEYS.iter().zip(shift) {
        sink.insert_value(SETUP_SECTION, key, value.to_string());
    }
}

/// In-memory sectioned key/value store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueStore {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.insert_value(section, key, value.into());
        self
    }

    /// Remove `section.key`, returning the old value.
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        self.sections.get_mut(section)?.remove(key)
    }

    /// Parse `section.key`; see [`required`].
    pub fn get_value<V: ConfigValue>(&self, section: &str, key: &str) -> Result<V, MeshHierarchyError> {
        required(self, section, key)
    }

    /// Parse `section.key`, or fall back to `default` when it is absent.
    pub fn get_value_or<V: ConfigValue>(
        &self,
        section: &str,
        key: &str,
        default: V,
    ) -> Result<V, MeshHierarchyError> {
        Ok(optional(self, section, key)?.unwrap_or(default))
    }
}

impl ConfigSource for KeyValueStore {
    fn raw_value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }
}

impl ConfigSink for KeyValueStore {
    fn insert_value(&mut self, section: &str, key: &str, value: String) {
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
    }
}

/// How the region of interest is anchored in the unit cube.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionAnchor {
    /// Region center.
    Center([f64; 3]),
    /// Region lower corner.
    Offset([f64; 3]),
}

/// Requested region of interest, normalized to the unit cube.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub extent: [f64; 3],
    pub anchor: RegionAnchor,
}

impl RegionSpec {
    /// Lower corner of the region, wrapped into `[0, 1)` when given by center.
    pub fn origin(&self) -> [f64; 3] {
        match self.anchor {
            RegionAnchor::Center(c) => {
                std::array::from_fn(|d| (c[d] - 0.5 * self.extent[d] + 1.0) % 1.0)
            }
            RegionAnchor::Offset(o) => o,
        }
    }

    /// Center of the region, wrapped into `[0, 1)`.
    pub fn center(&self) -> [f64; 3] {
        let origin = self.origin();
        std::array::from_fn(|d| (origin[d] + 0.5 * self.extent[d]) % 1.0)
    }
}

/// Immutable snapshot of everything the layout engine needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Coarsest level, always spanning the full domain.
    pub levelmin: usize,
    /// Finest level.
    pub levelmax: usize,
    /// Level used for transfer-function sampling; `levelmin` when unset.
    #[serde(default)]
    pub levelmin_tf: Option<usize>,
    /// Cells of padding between nested levels.
    pub padding: usize,
    /// Align every patch with the cells of the coarsest grid.
    pub align_top: bool,
    pub region: RegionSpec,
    #[serde(default)]
    pub no_shift: bool,
    #[serde(default)]
    pub force_shift: bool,
}

impl RefinementConfig {
    /// Read the snapshot from `source`.
    ///
    /// # Errors
    /// `ConflictingRegionAnchor` if both `ref_center` and `ref_offset` are
    /// set, `MissingConfigKey` for absent required keys (including when
    /// neither anchor is set), `InvalidConfigValue` for unparsable values.
    pub fn from_source<C: ConfigSource + ?Sized>(source: &C) -> Result<Self, MeshHierarchyError> {
        let s = SETUP_SECTION;
        if source.contains_key(s, "ref_offset") && source.contains_key(s, "ref_center") {
            return Err(MeshHierarchyError::ConflictingRegionAnchor);
        }
        let levelmin = required(source, s, "levelmin")?;
        let extent = required(source, s, "ref_extent")?;
        let anchor = match optional(source, s, "ref_center")? {
            Some(center) => RegionAnchor::Center(center),
            None => RegionAnchor::Offset(required(source, s, "ref_offset")?),
        };
        Ok(Self {
            levelmin,
            levelmax: required(source, s, "levelmax")?,
            levelmin_tf: optional(source, s, "levelmin_TF")?,
            padding: required(source, s, "padding")?,
            align_top: required(source, s, "align_top")?,
            region: RegionSpec { extent, anchor },
            no_shift: optional(source, s, "no_shift")?.unwrap_or(false),
            force_shift: optional(source, s, "force_shift")?.unwrap_or(false),
        })
    }

    /// Effective transfer-function level.
    pub fn levelmin_tf(&self) -> usize {
        self.levelmin_tf.unwrap_or(self.levelmin)
    }

    /// True if the region should be re-centered in the domain.
    pub fn shift_enabled(&self) -> bool {
        self.levelmin != self.levelmax && (!self.no_shift || self.force_shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_accept_common_spellings() {
        for raw in ["yes", "True", " on ", "1"] {
            assert_eq!(bool::parse_config(raw), Ok(true));
        }
        for raw in ["no", "FALSE", "off", "0"] {
            assert_eq!(bool::parse_config(raw), Ok(false));
        }
        assert!(bool::parse_config("maybe").is_err());
    }

    #[test]
    fn triples_need_three_values() {
        assert_eq!(
            <[f64; 3]>::parse_config("0.5, 0.25,0.125"),
            Ok([0.5, 0.25, 0.125])
        );
        assert!(<[f64; 3]>::parse_config("0.5,0.5").is_err());
        assert!(<[f64; 3]>::parse_config("0.5,x,0.5").is_err());
    }

    #[test]
    fn center_anchor_wraps_origin() {
        let region = RegionSpec {
            extent: [0.5, 0.25, 0.25],
            anchor: RegionAnchor::Center([0.125, 0.5, 0.875]),
        };
        assert_eq!(region.origin(), [0.875, 0.375, 0.75]);
        assert_eq!(region.center(), [0.125, 0.5, 0.875]);
    }
}
