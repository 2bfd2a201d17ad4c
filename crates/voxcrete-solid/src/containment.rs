//! Point-in-solid strategies.
//!
//! Neither strategy is a robust parity test. Both look only at the first
//! surface hit along axis-aligned rays and ask whether that surface faces
//! away from the origin, which assumes a closed, consistently wound mesh.
//! Points on or very near the surface, and meshes with holes or flipped
//! triangles, can be misclassified.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use voxcrete_math::{Point3, Vec3};

use crate::{Bvh, Ray};

/// Decides whether a local-space point lies inside a solid's surface.
pub trait PointContainment: Debug + Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Whether `point`, given in the BVH's local frame, is inside.
    fn contains(&self, bvh: &Bvh, point: &Point3) -> bool;
}

const AXES: [Vec3; 3] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
];

fn first_hit_is_backface(bvh: &Bvh, point: &Point3, direction: &Vec3) -> bool {
    let ray = Ray::new(*point, *direction);
    bvh.trace_closest(&ray)
        .is_some_and(|hit| hit.is_backface(&ray))
}

/// Inside if the first hit along any of +X, +Y, +Z is a backface.
///
/// Over-includes near concave features and open seams, where one ray can
/// see a backface from outside.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackfaceRay;

impl PointContainment for BackfaceRay {
    fn name(&self) -> &'static str {
        "backface-ray"
    }

    fn contains(&self, bvh: &Bvh, point: &Point3) -> bool {
        AXES.iter().any(|d| first_hit_is_backface(bvh, point, d))
    }
}

/// Inside if at least two of the +X, +Y, +Z rays first hit a backface.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityVote;

impl PointContainment for MajorityVote {
    fn name(&self) -> &'static str {
        "majority-vote"
    }

    fn contains(&self, bvh: &Bvh, point: &Point3) -> bool {
        let mut votes = 0;
        for (i, d) in AXES.iter().enumerate() {
            if first_hit_is_backface(bvh, point, d) {
                votes += 1;
            }
            // Decided once two agree, or once two can no longer agree.
            let remaining = AXES.len() - 1 - i;
            if votes >= 2 || votes + remaining < 2 {
                break;
            }
        }
        votes >= 2
    }
}

/// Configurable selection of a [`PointContainment`] strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainmentKind {
    /// [`BackfaceRay`].
    #[default]
    BackfaceRay,
    /// [`MajorityVote`].
    MajorityVote,
}

impl ContainmentKind {
    /// Instantiate the strategy.
    pub fn strategy(self) -> Arc<dyn PointContainment> {
        match self {
            ContainmentKind::BackfaceRay => Arc::new(BackfaceRay),
            ContainmentKind::MajorityVote => Arc::new(MajorityVote),
        }
    }
}
