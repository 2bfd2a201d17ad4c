//! Ray representation and the slab test used during BVH traversal.

use voxcrete_math::{Aabb3, Point3, Vec3};

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Vec3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let dir = direction.normalize();
        let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Self {
            origin,
            direction: dir,
            inv_direction: inv,
            sign,
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns `Some((t_min, t_max))` if the ray intersects the box.
    /// For axis-parallel rays a zero-width slab yields NaN terms, which
    /// `f64::max`/`f64::min` discard, so an origin lying on a box plane
    /// is treated as inside that slab.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let bounds = [aabb.min, aabb.max];

        let tx1 = (bounds[self.sign[0]].x - self.origin.x) * self.inv_direction.x;
        let tx2 = (bounds[1 - self.sign[0]].x - self.origin.x) * self.inv_direction.x;

        let mut t_min = tx1;
        let mut t_max = tx2;

        let ty1 = (bounds[self.sign[1]].y - self.origin.y) * self.inv_direction.y;
        let ty2 = (bounds[1 - self.sign[1]].y - self.origin.y) * self.inv_direction.y;

        t_min = t_min.max(ty1);
        t_max = t_max.min(ty2);

        let tz1 = (bounds[self.sign[2]].z - self.origin.z) * self.inv_direction.z;
        let tz2 = (bounds[1 - self.sign[2]].z - self.origin.z) * self.inv_direction.z;

        t_min = t_min.max(tz1);
        t_max = t_max.min(tz2);

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

/// First surface hit along a ray.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Parameter along the ray where intersection occurs.
    pub t: f64,
    /// 3D intersection point.
    pub point: Point3,
    /// Geometric normal of the hit triangle, following its winding.
    pub normal: Vec3,
    /// Index of the triangle that was hit.
    pub triangle: usize,
}

impl RayHit {
    /// True if the hit surface faces away from the ray origin, i.e. the
    /// ray is leaving the solid through this triangle.
    pub fn is_backface(&self, ray: &Ray) -> bool {
        self.normal.dot(&ray.direction) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit() -> Aabb3 {
        Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::origin(), Vec3::new(2.0, 0.0, 0.0));
        let p = ray.at(5.0);
        assert_relative_eq!(p.x, 5.0);
        assert!(p.y.abs() < 1e-12);
    }

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::x());
        let (t_min, t_max) = ray.intersect_aabb(&unit()).unwrap();
        assert_relative_eq!(t_min, 5.0, epsilon = 1e-10);
        assert_relative_eq!(t_max, 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let ray = Ray::new(Point3::new(-5.0, 5.0, 5.0), Vec3::x());
        assert!(ray.intersect_aabb(&unit()).is_none());
    }

    #[test]
    fn test_ray_aabb_from_inside() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::z());
        let (t_min, t_max) = ray.intersect_aabb(&unit()).unwrap();
        assert_eq!(t_min, 0.0);
        assert_relative_eq!(t_max, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_aabb_behind() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 3.0), Vec3::z());
        assert!(ray.intersect_aabb(&unit()).is_none());
    }

    #[test]
    fn test_ray_origin_on_slab_plane() {
        let ray = Ray::new(Point3::new(-1.0, 0.0, 0.5), Vec3::x());
        assert!(ray.intersect_aabb(&unit()).is_some());
    }
}
