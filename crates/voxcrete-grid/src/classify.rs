//! The classification pass: density sampling plus bucket assignment over a
//! whole voxel set.

use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;
use voxcrete_solid::Solid;

use crate::bucket::BucketTable;
use crate::color::UNCLASSIFIED;
use crate::density::{sample_density, sub_lattice_cells, validate_sub_grid_size, DensitySample};
use crate::error::Result;
use crate::settings::GridSettings;
use crate::voxel::{VisualHandle, Voxel};

/// Ratio and bucket index of a single voxel, without touching it or the
/// table's quantities.
pub fn classify_voxel(
    voxel: &Voxel,
    solid: &Solid,
    sub_grid_size: f64,
    table: &BucketTable,
) -> Result<(f64, usize)> {
    let ratio = sample_density(&voxel.aabb(), solid, sub_grid_size)?.ratio();
    Ok((ratio, table.classify_ratio(ratio)))
}

/// Sample every voxel against `solid`, assign ratios, buckets and bucket
/// colors, and return `table` with recomputed quantities.
///
/// Quantities are reset before counting, so every voxel is counted exactly
/// once and the quantities sum to `voxels.len()`. Sampling runs on the
/// rayon pool when `parallel` is set; per-bucket counts are merged after
/// the parallel map. The pitch and sub-lattice size are checked against
/// the largest voxel before any sampling, and nothing is written to
/// `voxels` unless the whole pass succeeds.
pub fn classify_voxels(
    voxels: &mut [Voxel],
    solid: &Solid,
    sub_grid_size: f64,
    mut table: BucketTable,
    parallel: bool,
) -> Result<BucketTable> {
    validate_sub_grid_size(sub_grid_size)?;
    let largest = voxels.iter().map(|v| v.size).fold(0.0, f64::max);
    sub_lattice_cells(largest, sub_grid_size)?;
    let start = Instant::now();

    let sample = |v: &Voxel| sample_density(&v.aabb(), solid, sub_grid_size);
    let samples: Vec<DensitySample> = if parallel {
        voxels.par_iter().map(sample).collect::<Result<_>>()?
    } else {
        voxels.iter().map(sample).collect::<Result<_>>()?
    };

    let mut counts = vec![0usize; table.len()];
    let mut overshoot = 0usize;
    for (voxel, sample) in voxels.iter_mut().zip(&samples) {
        if sample.raw_ratio > 100.0 {
            overshoot += 1;
        }
        let ratio = sample.ratio();
        let bucket = table.classify_ratio(ratio);
        counts[bucket] += 1;
        voxel.ratio = Some(ratio);
        voxel.bucket = Some(bucket);
        voxel.visual.color = table.buckets()[bucket].color;
    }
    table.reset_quantities();
    table.set_quantities(&counts);

    if overshoot > 0 {
        debug!("{overshoot} voxels sampled above 100% and were clamped");
    }
    info!(
        "classified {} voxels against `{}` into {} buckets in {:.1?}",
        voxels.len(),
        solid.id(),
        table.len(),
        start.elapsed()
    );
    Ok(table)
}

/// Replace every voxel's visual handle, coloring classified voxels by their
/// bucket.
pub fn restyle_voxels(
    voxels: &mut [Voxel],
    table: &BucketTable,
    settings: &GridSettings,
    generation: u64,
) {
    for voxel in voxels {
        let color = voxel
            .bucket
            .and_then(|b| table.get(b))
            .map_or(UNCLASSIFIED, |b| b.color);
        voxel.visual = VisualHandle::new(generation, color, voxel.size, settings);
    }
}
