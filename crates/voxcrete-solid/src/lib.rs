#![warn(missing_docs)]

//! Triangle-mesh solids for the voxcrete voxelizer.
//!
//! A [`Solid`] wraps an indexed [`TriangleMesh`] with its world transform and
//! a bounding volume hierarchy built once at construction. It answers the two
//! questions the voxelizer asks of every cell:
//!
//! - does this axis-aligned box overlap the surface?
//! - is this point inside the enclosed volume?
//!
//! # Architecture
//!
//! - [`TriangleMesh`] - flat vertex/index buffers as loaded from disk
//! - [`Ray`] / [`RayHit`] - rays and their closest hits
//! - [`Triangle`] - ray intersection and separating-axis box overlap
//! - [`bvh`] - SAH-built hierarchy over the triangles
//! - [`containment`] - point-in-solid strategies
//!
//! # Example
//!
//! ```
//! use voxcrete_math::{Aabb3, Point3, Transform};
//! use voxcrete_solid::{box_mesh, Solid};
//!
//! let mesh = box_mesh(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
//! let solid = Solid::new("cube", &mesh, Transform::identity()).unwrap();
//!
//! assert!(solid.point_is_inside(&Point3::new(0.5, 0.5, 0.5)));
//! let cell = Aabb3::from_center(&Point3::new(1.0, 0.5, 0.5), 0.2);
//! assert!(solid.intersects_box(&cell));
//! ```

mod error;
mod mesh;
mod ray;
mod solid;
mod triangle;
pub mod bvh;
pub mod containment;

pub use bvh::{Bvh, BvhNode};
pub use containment::{BackfaceRay, ContainmentKind, MajorityVote, PointContainment};
pub use error::{Result, SolidError};
pub use mesh::{box_mesh, TriangleMesh};
pub use ray::{Ray, RayHit};
pub use solid::{combined_world_aabb, Solid};
pub use triangle::Triangle;
