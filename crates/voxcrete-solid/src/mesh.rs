//! Indexed triangle meshes as handed over by the model loader.

use log::warn;
use serde::{Deserialize, Serialize};
use voxcrete_math::{Aabb3, Point3, Transform};

/// Indexed triangle mesh in the solid's local frame.
///
/// `indices` is `None` when the source geometry had no index buffer.
/// Such meshes can be inspected but not turned into a [`Solid`](crate::Solid).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub vertices: Vec<f64>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]`.
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
}

impl TriangleMesh {
    /// Create an empty indexed mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Some(Vec::new()),
        }
    }

    /// Create an indexed mesh from flat buffers.
    pub fn indexed(vertices: Vec<f64>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices: Some(indices),
        }
    }

    /// Whether an index buffer is present.
    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of index triples, including malformed ones.
    pub fn num_triangles(&self) -> usize {
        self.indices.as_ref().map_or(0, |i| i.len() / 3)
    }

    /// Vertex position by index.
    pub fn vertex(&self, index: u32) -> Option<Point3> {
        let i = index as usize * 3;
        let v = self.vertices.get(i..i + 3)?;
        Some(Point3::new(v[0], v[1], v[2]))
    }

    /// Resolve every index triple into corner positions.
    ///
    /// Triples referencing missing vertices and a trailing partial triple
    /// are skipped and logged; the count of skipped triples is returned
    /// alongside the triangles.
    pub fn triangle_corners(&self) -> (Vec<[Point3; 3]>, usize) {
        let Some(indices) = &self.indices else {
            return (Vec::new(), 0);
        };

        let mut out = Vec::with_capacity(indices.len() / 3);
        let mut skipped = 0;
        for chunk in indices.chunks(3) {
            if chunk.len() < 3 {
                skipped += 1;
                continue;
            }
            match (self.vertex(chunk[0]), self.vertex(chunk[1]), self.vertex(chunk[2])) {
                (Some(a), Some(b), Some(c)) => out.push([a, b, c]),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("skipped {} malformed index triples", skipped);
        }
        (out, skipped)
    }

    /// Merge another indexed mesh into this one.
    ///
    /// An index-less operand makes the result index-less.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        match (&mut self.indices, &other.indices) {
            (Some(mine), Some(theirs)) => mine.extend(theirs.iter().map(|&i| i + offset)),
            _ => self.indices = None,
        }
    }

    /// Copy with every vertex mapped through `transform`.
    pub fn transformed(&self, transform: &Transform) -> TriangleMesh {
        let mut vertices = Vec::with_capacity(self.vertices.len());
        for v in self.vertices.chunks_exact(3) {
            let p = transform.apply_point(&Point3::new(v[0], v[1], v[2]));
            vertices.extend_from_slice(&[p.x, p.y, p.z]);
        }
        TriangleMesh {
            vertices,
            indices: self.indices.clone(),
        }
    }

    /// Bounds of the vertices referenced by the index buffer.
    pub fn bounds(&self) -> Option<Aabb3> {
        let (triangles, _) = self.triangle_corners();
        let mut aabb = Aabb3::empty();
        for tri in &triangles {
            for p in tri {
                aabb.include_point(p);
            }
        }
        (!aabb.is_empty()).then_some(aabb)
    }
}

/// Closed box mesh spanning `min..max` with outward-facing winding.
pub fn box_mesh(min: Point3, max: Point3) -> TriangleMesh {
    let (a, b) = (min, max);
    #[rustfmt::skip]
    let vertices = vec![
        a.x, a.y, a.z,  b.x, a.y, a.z,  b.x, b.y, a.z,  a.x, b.y, a.z,
        a.x, a.y, b.z,  b.x, a.y, b.z,  b.x, b.y, b.z,  a.x, b.y, b.z,
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2,
        4, 5, 6, 4, 6, 7,
        0, 1, 5, 0, 5, 4,
        2, 3, 7, 2, 7, 6,
        0, 4, 7, 0, 7, 3,
        1, 2, 6, 1, 6, 5,
    ];
    TriangleMesh::indexed(vertices, indices)
}
