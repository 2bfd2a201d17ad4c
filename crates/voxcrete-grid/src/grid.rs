//! Regular lattices and the voxel grid builder.

use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;
use voxcrete_math::{Aabb3, Point3, Vec3};
use voxcrete_solid::Solid;

use crate::error::{Result, VoxelError};
use crate::settings::GridSettings;
use crate::voxel::{Voxel, VoxelId};

/// Upper bound on lattice cells, to turn a runaway cell size into an error
/// rather than an allocation failure.
pub const MAX_LATTICE_CELLS: u64 = 1 << 32;

/// A regular lattice of cubic cells.
///
/// Cell `(i, j, k)` is centered at `origin + cell_size * (i, j, k)`. Cells
/// are visited with `i` outermost and `k` innermost, and a cell's linear
/// index follows that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    /// Center of cell `(0, 0, 0)`.
    pub origin: Point3,
    /// Cell edge length.
    pub cell_size: f64,
    /// Cells per axis.
    pub dims: [usize; 3],
}

impl Lattice {
    /// Lattice covering `bbox` at `cell_size`.
    ///
    /// Cell `(0, 0, 0)` has its min corner on `bbox.min`, and each axis gets
    /// `ceil(extent / cell_size) + 1` cells so the far side is covered even
    /// when the extent is an exact multiple of the cell size.
    pub fn covering(bbox: &Aabb3, cell_size: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(VoxelError::InvalidSettings(format!(
                "cell_size must be positive, got {cell_size}"
            )));
        }
        let finite = bbox.min.iter().chain(bbox.max.iter()).all(|c| c.is_finite());
        if !finite || bbox.is_degenerate() {
            return Err(VoxelError::DegenerateBounds(format!(
                "{:?} .. {:?}",
                bbox.min, bbox.max
            )));
        }

        let extent = bbox.extent();
        let mut dims = [0usize; 3];
        let mut total: u64 = 1;
        for axis in 0..3 {
            let n = (extent[axis] / cell_size).ceil() + 1.0;
            if n > MAX_LATTICE_CELLS as f64 {
                return Err(VoxelError::InvalidSettings(format!(
                    "cell_size {cell_size} is too small for the bounds"
                )));
            }
            dims[axis] = n as usize;
            total = total.saturating_mul(n as u64);
        }
        if total > MAX_LATTICE_CELLS {
            return Err(VoxelError::InvalidSettings(format!(
                "cell_size {cell_size} gives {total} lattice cells"
            )));
        }

        Ok(Self {
            origin: bbox.min + Vec3::repeat(cell_size / 2.0),
            cell_size,
            dims,
        })
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// True if the lattice has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of cell `(i, j, k)`.
    pub fn index(&self, [i, j, k]: [usize; 3]) -> u64 {
        ((i * self.dims[1] + j) * self.dims[2] + k) as u64
    }

    /// Cell coordinates of a linear index.
    pub fn coords(&self, index: u64) -> [usize; 3] {
        let index = index as usize;
        let k = index % self.dims[2];
        let rest = index / self.dims[2];
        [rest / self.dims[1], rest % self.dims[1], k]
    }

    /// Center of cell `(i, j, k)`.
    pub fn center(&self, [i, j, k]: [usize; 3]) -> Point3 {
        self.origin + self.cell_size * Vec3::new(i as f64, j as f64, k as f64)
    }

    /// Box of cell `(i, j, k)`.
    pub fn cell_box(&self, coords: [usize; 3]) -> Aabb3 {
        Aabb3::from_center(&self.center(coords), self.cell_size)
    }
}

/// Build the voxel set of `solid` over `bbox`.
///
/// A lattice cell becomes a voxel when its box overlaps the solid's
/// surface or its center is inside the solid. Cells are tested on the rayon
/// pool when `parallel` is set. Output follows lattice order either way and
/// is identical across runs.
pub fn build_grid(
    bbox: &Aabb3,
    settings: &GridSettings,
    solid: &Solid,
    parallel: bool,
) -> Result<Vec<Voxel>> {
    settings.validate()?;
    let lattice = Lattice::covering(bbox, settings.cell_size)?;
    debug!(
        "lattice {}x{}x{} at {} over `{}`",
        lattice.dims[0],
        lattice.dims[1],
        lattice.dims[2],
        lattice.cell_size,
        solid.id()
    );

    let start = Instant::now();
    let cell = |index: u64| {
        let coords = lattice.coords(index);
        let center = lattice.center(coords);
        solid
            .is_occupied(&center, &lattice.cell_box(coords))
            .then(|| Voxel::new(VoxelId(index), center, settings))
    };
    let cells = 0..lattice.len() as u64;
    let voxels: Vec<Voxel> = if parallel {
        cells.into_par_iter().filter_map(cell).collect()
    } else {
        cells.filter_map(cell).collect()
    };

    info!(
        "voxelized `{}`: {} of {} cells occupied in {:.1?}",
        solid.id(),
        voxels.len(),
        lattice.len(),
        start.elapsed()
    );
    Ok(voxels)
}
