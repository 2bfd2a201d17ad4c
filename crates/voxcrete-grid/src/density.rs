//! Reinforcement density inside a single voxel.

use voxcrete_math::{Aabb3, Point3, Vec3};
use voxcrete_solid::Solid;

use crate::error::{Result, VoxelError};

/// Slack when deciding how many sub-cells fit along an axis, so that exact
/// multiples do not gain a cell from rounding noise.
const FIT_EPS: f64 = 1e-9;

/// Outcome of sampling one voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensitySample {
    /// Sub-cells occupied by the solid.
    pub occupied: usize,
    /// Sub-cells tested.
    pub total: usize,
    /// Occupied volume as a percentage of the voxel volume, unclamped.
    ///
    /// Exceeds 100 when the sub-lattice pitch does not divide the voxel
    /// size, since the outermost sub-cells then reach past the voxel.
    pub raw_ratio: f64,
}

impl DensitySample {
    /// Ratio clamped to `[0, 100]`.
    pub fn ratio(&self) -> f64 {
        self.raw_ratio.clamp(0.0, 100.0)
    }
}

/// Sub-cells per axis for a voxel of edge `size`.
pub fn sub_cells_per_axis(size: f64, sub_grid_size: f64) -> usize {
    ((size / sub_grid_size) - FIT_EPS).ceil().max(1.0) as usize
}

/// Upper bound on sub-cells sampled per voxel.
pub const MAX_SUB_CELLS: usize = 1 << 24;

/// Sub-cells a voxel of edge `size` is split into at `sub_grid_size`.
///
/// Fails when the pitch is not positive or the sub-lattice would exceed
/// [`MAX_SUB_CELLS`].
pub fn sub_lattice_cells(size: f64, sub_grid_size: f64) -> Result<usize> {
    validate_sub_grid_size(sub_grid_size)?;
    let n = sub_cells_per_axis(size, sub_grid_size);
    n.checked_mul(n)
        .and_then(|square| square.checked_mul(n))
        .filter(|&total| total <= MAX_SUB_CELLS)
        .ok_or_else(|| {
            VoxelError::InvalidSettings(format!(
                "sub_grid_size {sub_grid_size} splits a voxel of size {size} into more than \
                 {MAX_SUB_CELLS} cells"
            ))
        })
}

/// Check a sub-lattice pitch.
pub fn validate_sub_grid_size(sub_grid_size: f64) -> Result<()> {
    if !(sub_grid_size.is_finite() && sub_grid_size > 0.0) {
        return Err(VoxelError::InvalidSettings(format!(
            "sub_grid_size must be positive, got {sub_grid_size}"
        )));
    }
    Ok(())
}

/// Estimate how much of `cell` the solid occupies.
///
/// The cell is split into cubes of edge `sub_grid_size`, starting at its
/// min corner, and each cube counts as occupied under the same rule the
/// grid builder uses. Fails without sampling when the sub-lattice is
/// rejected by [`sub_lattice_cells`].
pub fn sample_density(cell: &Aabb3, solid: &Solid, sub_grid_size: f64) -> Result<DensitySample> {
    let size = cell.extent().x;
    let total = sub_lattice_cells(size, sub_grid_size)?;
    let n = sub_cells_per_axis(size, sub_grid_size);

    let reaches_solid = solid
        .world_aabb()
        .is_some_and(|bounds| bounds.overlaps(cell));
    if !reaches_solid {
        return Ok(DensitySample {
            occupied: 0,
            total,
            raw_ratio: 0.0,
        });
    }

    let first = cell.min + Vec3::repeat(sub_grid_size / 2.0);
    let mut occupied = 0;
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let center: Point3 =
                    first + sub_grid_size * Vec3::new(i as f64, j as f64, k as f64);
                let sub_cell = Aabb3::from_center(&center, sub_grid_size);
                if solid.is_occupied(&center, &sub_cell) {
                    occupied += 1;
                }
            }
        }
    }

    let volume = occupied as f64 * sub_grid_size.powi(3);
    Ok(DensitySample {
        occupied,
        total,
        raw_ratio: 100.0 * volume / size.powi(3),
    })
}
