//! Grid, sampling and bucket configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use voxcrete_solid::ContainmentKind;

use crate::bucket::{Bucket, BucketTable};
use crate::error::{Result, VoxelError};

/// Default voxel edge length.
pub const DEFAULT_CELL_SIZE: f64 = 0.5;

/// Default sub-lattice pitch for density sampling.
pub const DEFAULT_SUB_GRID_SIZE: f64 = 0.05;

/// Default number of buckets in an even table.
pub const DEFAULT_BUCKET_COUNT: usize = 4;

/// Cell sizes keyed by the largest concrete volume they apply to.
const VOLUME_STEPS: [(f64, f64); 14] = [
    (0.0, 0.2),
    (200.0, 0.3),
    (600.0, 0.4),
    (1000.0, 0.5),
    (1300.0, 0.6),
    (1500.0, 0.7),
    (2000.0, 0.8),
    (2500.0, 0.9),
    (4000.0, 1.0),
    (8000.0, 1.1),
    (12000.0, 1.2),
    (20000.0, 1.3),
    (25000.0, 1.4),
    (30000.0, 1.5),
];

/// Cell size suited to a concrete body of the given bounding volume.
///
/// Larger bodies get coarser voxels so the cell count stays manageable.
/// Volumes above the last step use the coarsest size.
pub fn suggested_cell_size(volume: f64) -> f64 {
    VOLUME_STEPS
        .iter()
        .find(|(limit, _)| volume <= *limit)
        .map_or(VOLUME_STEPS[VOLUME_STEPS.len() - 1].1, |(_, size)| *size)
}

/// Lattice and voxel appearance parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Voxel edge length, world units.
    pub cell_size: f64,
    /// Corner rounding radius of rendered voxels.
    pub roundness: f64,
    /// Voxel opacity in (0, 1].
    pub transparency: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            roundness: 0.01,
            transparency: 0.4,
        }
    }
}

impl GridSettings {
    /// Default settings with the cell size suggested for `volume`.
    pub fn for_volume(volume: f64) -> Self {
        Self {
            cell_size: suggested_cell_size(volume),
            ..Self::default()
        }
    }

    /// Largest cell size offered to users for this configuration.
    pub fn size_limit(&self) -> f64 {
        self.cell_size + 1.0
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(VoxelError::InvalidSettings(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if !(self.roundness.is_finite() && self.roundness >= 0.0) {
            return Err(VoxelError::InvalidSettings(format!(
                "roundness must be non-negative, got {}",
                self.roundness
            )));
        }
        if !(self.transparency > 0.0 && self.transparency <= 1.0) {
            return Err(VoxelError::InvalidSettings(format!(
                "transparency must be in (0, 1], got {}",
                self.transparency
            )));
        }
        Ok(())
    }

    /// True if switching to `other` requires discarding the voxel set.
    pub fn needs_rebuild(&self, other: &GridSettings) -> bool {
        self.cell_size != other.cell_size
    }

    /// True if switching to `other` changes only how voxels look.
    pub fn needs_restyle(&self, other: &GridSettings) -> bool {
        self.roundness != other.roundness || self.transparency != other.transparency
    }
}

/// Density sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Sub-lattice pitch inside each voxel.
    pub sub_grid_size: f64,
    /// Point-in-solid strategy for both solids.
    pub containment: ContainmentKind,
    /// Build the grid and sample voxels on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            sub_grid_size: DEFAULT_SUB_GRID_SIZE,
            containment: ContainmentKind::default(),
            parallel: true,
        }
    }
}

impl SamplingSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.sub_grid_size.is_finite() && self.sub_grid_size > 0.0) {
            return Err(VoxelError::InvalidSettings(format!(
                "sub_grid_size must be positive, got {}",
                self.sub_grid_size
            )));
        }
        Ok(())
    }
}

/// Bucket table source: an even split into `count` ranges, or explicit
/// ranges that take precedence when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketSettings {
    /// Number of ranges in an even table.
    pub count: usize,
    /// Explicit ranges, in table order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<Bucket>,
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            count: DEFAULT_BUCKET_COUNT,
            ranges: Vec::new(),
        }
    }
}

impl BucketSettings {
    /// Build the validated table these settings describe.
    pub fn table(&self) -> Result<BucketTable> {
        if self.ranges.is_empty() {
            BucketTable::even(self.count)
        } else {
            BucketTable::new(self.ranges.clone())
        }
    }
}

/// Complete configuration file.
///
/// ```toml
/// [grid]
/// cell_size = 0.5
/// transparency = 0.4
///
/// [sampling]
/// sub_grid_size = 0.05
/// containment = "majority-vote"
///
/// [buckets]
/// count = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelConfig {
    /// Lattice and appearance.
    pub grid: GridSettings,
    /// Density sampling.
    pub sampling: SamplingSettings,
    /// Bucket table.
    pub buckets: BucketSettings,
}

impl VoxelConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate every section, including the bucket table.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.sampling.validate()?;
        self.buckets.table()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = VoxelConfig::default();
        config.validate().unwrap();
        assert_relative_eq!(config.grid.cell_size, 0.5);
        assert_relative_eq!(config.sampling.sub_grid_size, 0.05);
        assert_eq!(config.buckets.table().unwrap().len(), 4);
    }

    #[test]
    fn test_suggested_cell_size_steps() {
        assert_relative_eq!(suggested_cell_size(-3.0), 0.2);
        assert_relative_eq!(suggested_cell_size(0.0), 0.2);
        assert_relative_eq!(suggested_cell_size(150.0), 0.3);
        assert_relative_eq!(suggested_cell_size(1000.0), 0.5);
        assert_relative_eq!(suggested_cell_size(1000.5), 0.6);
        assert_relative_eq!(suggested_cell_size(27000.0), 1.5);
        assert_relative_eq!(suggested_cell_size(1.0e9), 1.5);
    }

    #[test]
    fn test_for_volume_and_size_limit() {
        let settings = GridSettings::for_volume(300.0);
        assert_relative_eq!(settings.cell_size, 0.4);
        assert_relative_eq!(settings.size_limit(), 1.4);
        assert_relative_eq!(settings.transparency, 0.4);
    }

    #[test]
    fn test_invalid_grid_settings() {
        for bad in [
            GridSettings { cell_size: 0.0, ..Default::default() },
            GridSettings { cell_size: -1.0, ..Default::default() },
            GridSettings { cell_size: f64::NAN, ..Default::default() },
            GridSettings { roundness: -0.1, ..Default::default() },
            GridSettings { transparency: 0.0, ..Default::default() },
            GridSettings { transparency: 1.5, ..Default::default() },
        ] {
            assert!(matches!(bad.validate(), Err(VoxelError::InvalidSettings(_))));
        }
    }

    #[test]
    fn test_change_kinds() {
        let base = GridSettings::default();
        let finer = GridSettings { cell_size: 0.25, ..base };
        let faded = GridSettings { transparency: 0.8, ..base };
        assert!(base.needs_rebuild(&finer));
        assert!(!base.needs_rebuild(&faded));
        assert!(base.needs_restyle(&faded));
        assert!(!base.needs_restyle(&base));
    }

    #[test]
    fn test_parse_toml_partial() {
        let config = VoxelConfig::from_toml_str(
            r#"
            [grid]
            cell_size = 0.25

            [sampling]
            containment = "majority-vote"
            parallel = false
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.grid.cell_size, 0.25);
        assert_relative_eq!(config.grid.roundness, 0.01);
        assert_eq!(config.sampling.containment, ContainmentKind::MajorityVote);
        assert!(!config.sampling.parallel);
        assert_eq!(config.buckets.count, 4);
    }

    #[test]
    fn test_parse_toml_explicit_ranges() {
        let config = VoxelConfig::from_toml_str(
            r##"
            [[buckets.ranges]]
            label = "0%"
            color = "#52d726"
            ratio = { min = 0, max = 0 }

            [[buckets.ranges]]
            label = "0% - 10%"
            color = "#ffaf00"
            ratio = { min = 0, max = 10 }

            [[buckets.ranges]]
            label = "10% - 100%"
            color = "#dd1b1b"
            ratio = { min = 10, max = 100 }
            "##,
        )
        .unwrap();
        let table = config.buckets.table().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.classify_ratio(5.0), 1);
    }

    #[test]
    fn test_toml_rejects_bad_values() {
        assert!(matches!(
            VoxelConfig::from_toml_str("[grid]\ncell_size = -2.0\n"),
            Err(VoxelError::InvalidSettings(_))
        ));
        assert!(matches!(
            VoxelConfig::from_toml_str("[buckets]\ncount = 1\n"),
            Err(VoxelError::InvalidBucketTable(_))
        ));
        assert!(matches!(
            VoxelConfig::from_toml_str("[grid\n"),
            Err(VoxelError::Config(_))
        ));
    }
}
