//! Voxel records and their visual handles.

use serde::{Deserialize, Serialize};
use voxcrete_math::{Aabb3, Point3};

use crate::color::{Color, UNCLASSIFIED};
use crate::settings::GridSettings;

/// Stable voxel identifier: the cell's linear index in the lattice it was
/// built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelId(pub u64);

/// What the rendering side needs to draw one voxel.
///
/// Handles are immutable; a style change replaces them with a new one
/// carrying a higher `generation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualHandle {
    /// Bumped every time the handle is recreated.
    pub generation: u64,
    /// Fill color.
    pub color: Color,
    /// Edge length.
    pub size: f64,
    /// Corner rounding radius.
    pub roundness: f64,
    /// Opacity.
    pub transparency: f64,
}

impl VisualHandle {
    pub(crate) fn new(generation: u64, color: Color, size: f64, settings: &GridSettings) -> Self {
        Self {
            generation,
            color,
            size,
            roundness: settings.roundness,
            transparency: settings.transparency,
        }
    }
}

/// An occupied cell of the primary solid's lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct Voxel {
    /// Identifier, stable until the grid is rebuilt.
    pub id: VoxelId,
    /// Cell center, world space.
    pub center: Point3,
    /// Edge length.
    pub size: f64,
    /// Reinforcement ratio in `[0, 100]`, once classified.
    pub ratio: Option<f64>,
    /// Bucket index, once classified.
    pub bucket: Option<usize>,
    /// Current visual representation.
    pub visual: VisualHandle,
}

impl Voxel {
    pub(crate) fn new(id: VoxelId, center: Point3, settings: &GridSettings) -> Self {
        Self {
            id,
            center,
            size: settings.cell_size,
            ratio: None,
            bucket: None,
            visual: VisualHandle::new(0, UNCLASSIFIED, settings.cell_size, settings),
        }
    }

    /// The cell's box.
    pub fn aabb(&self) -> Aabb3 {
        Aabb3::from_center(&self.center, self.size)
    }

    /// True once a classification pass has assigned a bucket.
    pub fn is_classified(&self) -> bool {
        self.bucket.is_some()
    }

    /// Display color.
    pub fn color(&self) -> Color {
        self.visual.color
    }

    /// Plain record for export.
    pub fn record(&self) -> VoxelRecord {
        VoxelRecord {
            id: self.id,
            center: [self.center.x, self.center.y, self.center.z],
            size: self.size,
            ratio: self.ratio,
            bucket: self.bucket,
            color: self.visual.color,
        }
    }
}

/// Serializable view of a [`Voxel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelRecord {
    /// Identifier.
    pub id: VoxelId,
    /// Center, world space.
    pub center: [f64; 3],
    /// Edge length.
    pub size: f64,
    /// Reinforcement ratio.
    pub ratio: Option<f64>,
    /// Bucket index.
    pub bucket: Option<usize>,
    /// Display color.
    pub color: Color,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_voxel_is_unclassified() {
        let settings = GridSettings::default();
        let v = Voxel::new(VoxelId(7), Point3::new(1.0, 2.0, 3.0), &settings);
        assert!(!v.is_classified());
        assert_eq!(v.color(), UNCLASSIFIED);
        assert_eq!(v.visual.generation, 0);
        assert_relative_eq!(v.visual.transparency, settings.transparency);
        let aabb = v.aabb();
        assert_relative_eq!(aabb.min.x, 0.75);
        assert_relative_eq!(aabb.max.z, 3.25);
    }

    #[test]
    fn test_record_json() {
        let settings = GridSettings::default();
        let mut v = Voxel::new(VoxelId(3), Point3::new(0.25, 0.25, 0.25), &settings);
        v.ratio = Some(12.5);
        v.bucket = Some(1);
        let json = serde_json::to_value(v.record()).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["bucket"], 1);
        assert_eq!(json["color"], "#057400");
        assert_eq!(json["center"][0], 0.25);
    }
}
