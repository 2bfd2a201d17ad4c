#![warn(missing_docs)]

//! Concrete voxelization and reinforcement density classification.
//!
//! Given a concrete [`Solid`](voxcrete_solid::Solid) and a reinforcement
//! solid, this crate covers the concrete with a regular voxel lattice, samples
//! how much of each voxel the reinforcement fills, and counts voxels into
//! colored ratio buckets.
//!
//! # Pipeline
//!
//! - [`build_grid`] - occupied lattice cells of the concrete become [`Voxel`]s
//! - [`sample_density`] - sub-lattice estimate of the reinforcement ratio
//! - [`BucketTable`] - validated ratio ranges with colors and counts
//! - [`classify_voxels`] - the density and bucket pass over a voxel set
//! - [`VoxelModel`] - owns all of the above and reacts to settings changes
//!
//! # Example
//!
//! ```
//! use voxcrete_grid::{VoxelConfig, VoxelModel};
//! use voxcrete_math::{Point3, Transform};
//! use voxcrete_solid::{box_mesh, Solid};
//!
//! let concrete = box_mesh(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
//! let rebar = box_mesh(Point3::new(0.4, 0.4, 0.0), Point3::new(0.6, 0.6, 1.0));
//! let mut model = VoxelModel::new(
//!     Solid::new("slab", &concrete, Transform::identity())?,
//!     Solid::new("bar", &rebar, Transform::identity())?,
//!     &VoxelConfig::default(),
//! )?;
//!
//! let table = model.voxelize()?;
//! assert_eq!(table.total_quantity(), model.voxels().len());
//! # Ok::<(), voxcrete_grid::VoxelError>(())
//! ```

pub mod bucket;
pub mod classify;
pub mod color;
pub mod density;
pub mod error;
pub mod grid;
pub mod model;
pub mod settings;
pub mod voxel;

pub use bucket::{Bucket, BucketTable, RatioRange};
pub use classify::{classify_voxel, classify_voxels, restyle_voxels};
pub use color::{Color, PALETTE, UNCLASSIFIED};
pub use density::{sample_density, sub_lattice_cells, DensitySample, MAX_SUB_CELLS};
pub use error::{Result, VoxelError};
pub use grid::{build_grid, Lattice};
pub use model::{BuildState, SettingsChange, StateListener, VoxelModel};
pub use settings::{
    suggested_cell_size, BucketSettings, GridSettings, SamplingSettings, VoxelConfig,
};
pub use voxel::{VisualHandle, Voxel, VoxelId, VoxelRecord};
