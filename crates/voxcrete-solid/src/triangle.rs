//! Single-triangle primitives: ray intersection and box overlap.

use voxcrete_math::{Aabb3, Point3, Vec3};

use crate::Ray;

/// Barycentric slack so rays through shared edges hit at least one side.
const EDGE_EPS: f64 = 1e-9;

/// Minimum ray parameter; hits closer than this are the origin itself.
const T_EPS: f64 = 1e-9;

/// A triangle with its precomputed geometric normal.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// Corner positions.
    pub v: [Point3; 3],
    /// Unit normal following the winding `(v1 - v0) x (v2 - v0)`; zero for
    /// degenerate triangles.
    pub normal: Vec3,
}

impl Triangle {
    /// Create a triangle from its corners.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        let n = (v1 - v0).cross(&(v2 - v0));
        let len = n.norm();
        let normal = if len > 1e-15 { n / len } else { Vec3::zeros() };
        Self {
            v: [v0, v1, v2],
            normal,
        }
    }

    /// True if the triangle has no area.
    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::zeros()
    }

    /// Bounding box.
    pub fn aabb(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for p in &self.v {
            aabb.include_point(p);
        }
        aabb
    }

    /// Centroid.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.v[0].coords + self.v[1].coords + self.v[2].coords) / 3.0)
    }

    /// Double-sided Möller-Trumbore intersection, returning the ray parameter.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f64> {
        let edge1 = self.v[1] - self.v[0];
        let edge2 = self.v[2] - self.v[0];
        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        if a.abs() < 1e-14 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v[0];
        let u = f * s.dot(&h);
        if !(-EDGE_EPS..=1.0 + EDGE_EPS).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < -EDGE_EPS || u + v > 1.0 + EDGE_EPS {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t > T_EPS).then_some(t)
    }

    /// Separating-axis test against an axis-aligned box.
    ///
    /// Contact of zero thickness, within `eps`, counts as separated: a
    /// triangle lying in a box face plane does not overlap the box.
    pub fn overlaps_aabb(&self, aabb: &Aabb3, eps: f64) -> bool {
        let c = aabb.center();
        let h = aabb.extent() / 2.0;
        let p = [self.v[0] - c, self.v[1] - c, self.v[2] - c];
        let edges = [p[1] - p[0], p[2] - p[1], p[0] - p[2]];

        let separated_on = |axis: &Vec3| -> bool {
            if axis.norm_squared() < 1e-24 {
                return false;
            }
            let d0 = p[0].dot(axis);
            let d1 = p[1].dot(axis);
            let d2 = p[2].dot(axis);
            let r = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
            let scale = axis.norm();
            d0.min(d1).min(d2) >= r - eps * scale || d0.max(d1).max(d2) <= -r + eps * scale
        };

        for axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
            if separated_on(&axis) {
                return false;
            }
        }

        if !self.is_degenerate() && separated_on(&self.normal) {
            return false;
        }

        for box_axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
            for edge in &edges {
                if separated_on(&box_axis.cross(edge)) {
                    return false;
                }
            }
        }

        true
    }
}
