//! Solids: a mesh, its world placement and a BVH built once over it.

use std::fmt;
use std::sync::Arc;

use log::debug;
use voxcrete_math::{Aabb3, Point3, Tolerance, Transform};

use crate::containment::{BackfaceRay, PointContainment};
use crate::error::{Result, SolidError};
use crate::{Bvh, Triangle, TriangleMesh};

/// A closed triangulated surface placed in the world.
///
/// The BVH is built in the constructor, so every `Solid` is queryable; a
/// solid without a BVH cannot be observed. Cloning is cheap and clones
/// share the tree.
#[derive(Clone)]
pub struct Solid {
    id: String,
    transform: Transform,
    inverse: Transform,
    bvh: Arc<Bvh>,
    /// World-space copies of the BVH triangles, same indices. `None` when
    /// the transform is the identity.
    world_triangles: Option<Arc<Vec<Triangle>>>,
    world_bounds: Option<Aabb3>,
    containment: Arc<dyn PointContainment>,
    tolerance: Tolerance,
}

impl fmt::Debug for Solid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solid")
            .field("id", &self.id)
            .field("triangles", &self.bvh.triangles().len())
            .field("containment", &self.containment.name())
            .finish()
    }
}

impl Solid {
    /// Build a solid from a local-space mesh and its world transform.
    ///
    /// Fails if the mesh has no index buffer, if its vertex buffer is not a
    /// whole number of positions, or if the transform is singular. A mesh
    /// with zero (or only malformed) triangles is accepted and yields a
    /// solid that nothing overlaps.
    pub fn new(id: impl Into<String>, mesh: &TriangleMesh, transform: Transform) -> Result<Self> {
        let id = id.into();
        if !mesh.is_indexed() {
            return Err(SolidError::MissingIndexBuffer(id));
        }
        if mesh.vertices.len() % 3 != 0 {
            return Err(SolidError::MalformedVertices {
                mesh: id,
                len: mesh.vertices.len(),
            });
        }
        let inverse = transform
            .inverse()
            .ok_or_else(|| SolidError::SingularTransform(id.clone()))?;

        let (corners, _) = mesh.triangle_corners();
        let triangles: Vec<Triangle> = corners
            .into_iter()
            .map(|[a, b, c]| Triangle::new(a, b, c))
            .collect();

        let world_triangles: Option<Arc<Vec<Triangle>>> = if transform.is_identity() {
            None
        } else {
            Some(Arc::new(
                triangles
                    .iter()
                    .map(|t| {
                        Triangle::new(
                            transform.apply_point(&t.v[0]),
                            transform.apply_point(&t.v[1]),
                            transform.apply_point(&t.v[2]),
                        )
                    })
                    .collect(),
            ))
        };

        let bvh = Bvh::build(triangles);
        let world_bounds = match &world_triangles {
            None => bvh.bounds(),
            Some(world) => {
                let mut aabb = Aabb3::empty();
                for t in world.iter() {
                    aabb.union(&t.aabb());
                }
                (!aabb.is_empty()).then_some(aabb)
            }
        };
        debug!("built BVH for `{}` over {} triangles", id, bvh.triangles().len());

        Ok(Self {
            id,
            transform,
            inverse,
            bvh: Arc::new(bvh),
            world_triangles,
            world_bounds,
            containment: Arc::new(BackfaceRay),
            tolerance: Tolerance::DEFAULT,
        })
    }

    /// Replace the point containment strategy.
    pub fn with_containment(mut self, containment: Arc<dyn PointContainment>) -> Self {
        self.containment = containment;
        self
    }

    /// Mesh identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// World transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// The underlying BVH, in local space.
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Name of the active containment strategy.
    pub fn containment_name(&self) -> &'static str {
        self.containment.name()
    }

    /// Number of triangles indexed by the BVH.
    pub fn triangle_count(&self) -> usize {
        self.bvh.triangles().len()
    }

    /// True if the solid has no triangles at all.
    pub fn is_empty(&self) -> bool {
        self.bvh.root().is_none()
    }

    /// World-space bounds of the solid's triangles.
    pub fn world_aabb(&self) -> Option<Aabb3> {
        self.world_bounds
    }

    /// Whether a world-space box overlaps the surface, without considering
    /// the enclosed volume.
    pub fn box_touches_surface(&self, world_box: &Aabb3) -> bool {
        let eps = self.tolerance.linear;
        match &self.world_triangles {
            None => self.bvh.intersects_aabb(world_box, eps),
            Some(world) => {
                // Cull in local space with the box's conservative local
                // bounds, then test exactly against the world triangles.
                let local = self.inverse.apply_aabb(world_box);
                self.bvh
                    .any_in_aabb(&local, |i| world[i].overlaps_aabb(world_box, eps))
            }
        }
    }

    /// Whether a world-space point is inside, per the containment strategy.
    pub fn point_is_inside(&self, point: &Point3) -> bool {
        let local = self.inverse.apply_point(point);
        self.containment.contains(&self.bvh, &local)
    }

    /// Whether a world-space box overlaps the solid, including the case of
    /// the box lying entirely inside it.
    pub fn intersects_box(&self, world_box: &Aabb3) -> bool {
        self.box_touches_surface(world_box) || self.point_is_inside(&world_box.center())
    }

    /// Occupancy of a cell: its box overlaps the surface, or `point`
    /// (normally the cell center) is inside.
    ///
    /// Cells that straddle the surface count even when their center is
    /// outside, so results over-include at boundaries.
    pub fn is_occupied(&self, point: &Point3, cell: &Aabb3) -> bool {
        self.box_touches_surface(cell) || self.point_is_inside(point)
    }
}

/// Union of the world bounds of several solids.
pub fn combined_world_aabb<'a>(solids: impl IntoIterator<Item = &'a Solid>) -> Option<Aabb3> {
    let mut aabb = Aabb3::empty();
    for solid in solids {
        if let Some(b) = solid.world_aabb() {
            aabb.union(&b);
        }
    }
    (!aabb.is_empty()).then_some(aabb)
}
