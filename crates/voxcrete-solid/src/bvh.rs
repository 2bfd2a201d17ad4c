//! Bounding Volume Hierarchy over a solid's triangles.
//!
//! Uses Surface Area Heuristic (SAH) for construction. The tree is built
//! once per solid and only read afterwards, so it can be shared between
//! threads freely.

use voxcrete_math::{Aabb3, Point3};

use crate::{Ray, RayHit, Triangle};

/// A BVH node - either a leaf containing triangles or an internal node with children.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Leaf node containing triangle indices.
    Leaf {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Indices into [`Bvh::triangles`].
        triangles: Vec<usize>,
    },
    /// Internal node with two children.
    Internal {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Left child node.
        left: Box<BvhNode>,
        /// Right child node.
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } => aabb,
            BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Bounding Volume Hierarchy for accelerated ray and box queries.
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    triangles: Vec<Triangle>,
}

impl Bvh {
    /// Build a BVH over the given triangles using SAH construction.
    ///
    /// Degenerate triangles are kept out of the tree. An empty input gives
    /// a tree with no root, against which every query misses.
    pub fn build(triangles: Vec<Triangle>) -> Self {
        let mut tri_data: Vec<(usize, Aabb3, Point3)> = triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_degenerate())
            .map(|(i, t)| (i, t.aabb(), t.centroid()))
            .collect();

        let root = if tri_data.is_empty() {
            None
        } else {
            Some(build_node(&mut tri_data))
        };

        Self { root, triangles }
    }

    /// All triangles, indexed as in hits and leaves.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounds of the indexed triangles, if any.
    pub fn bounds(&self) -> Option<Aabb3> {
        self.root.as_ref().map(|r| *r.aabb())
    }

    /// Get a reference to the root node, if any.
    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Trace a ray and return only the closest hit.
    pub fn trace_closest(&self, ray: &Ray) -> Option<RayHit> {
        let mut closest: Option<RayHit> = None;
        let mut closest_t = f64::INFINITY;

        if let Some(ref root) = self.root {
            self.trace_node_closest(ray, root, &mut closest, &mut closest_t);
        }

        closest
    }

    fn trace_node_closest(
        &self,
        ray: &Ray,
        node: &BvhNode,
        closest: &mut Option<RayHit>,
        closest_t: &mut f64,
    ) {
        match node {
            BvhNode::Leaf { aabb, triangles } => {
                if let Some((t_min, _)) = ray.intersect_aabb(aabb) {
                    // Early out if AABB entry is beyond current closest
                    if t_min > *closest_t {
                        return;
                    }

                    for &index in triangles {
                        let tri = &self.triangles[index];
                        if let Some(t) = tri.intersect_ray(ray) {
                            if t < *closest_t {
                                *closest_t = t;
                                *closest = Some(RayHit {
                                    t,
                                    point: ray.at(t),
                                    normal: tri.normal,
                                    triangle: index,
                                });
                            }
                        }
                    }
                }
            }
            BvhNode::Internal { aabb, left, right } => {
                if let Some((t_min, _)) = ray.intersect_aabb(aabb) {
                    if t_min > *closest_t {
                        return;
                    }

                    // Test children in order of AABB distance
                    let left_t = ray.intersect_aabb(left.aabb()).map(|(t, _)| t);
                    let right_t = ray.intersect_aabb(right.aabb()).map(|(t, _)| t);

                    match (left_t, right_t) {
                        (Some(lt), Some(rt)) => {
                            if lt <= rt {
                                self.trace_node_closest(ray, left, closest, closest_t);
                                self.trace_node_closest(ray, right, closest, closest_t);
                            } else {
                                self.trace_node_closest(ray, right, closest, closest_t);
                                self.trace_node_closest(ray, left, closest, closest_t);
                            }
                        }
                        (Some(_), None) => {
                            self.trace_node_closest(ray, left, closest, closest_t);
                        }
                        (None, Some(_)) => {
                            self.trace_node_closest(ray, right, closest, closest_t);
                        }
                        (None, None) => {}
                    }
                }
            }
        }
    }

    /// Visit triangles whose bounds touch `query` until `accept` returns true.
    ///
    /// Returns whether any triangle was accepted.
    pub fn any_in_aabb<F>(&self, query: &Aabb3, mut accept: F) -> bool
    where
        F: FnMut(usize) -> bool,
    {
        match &self.root {
            Some(root) => any_in_node(root, query, &mut accept),
            None => false,
        }
    }

    /// Triangle/box overlap against the local-space triangles.
    pub fn intersects_aabb(&self, query: &Aabb3, eps: f64) -> bool {
        self.any_in_aabb(query, |i| self.triangles[i].overlaps_aabb(query, eps))
    }
}

fn any_in_node<F>(node: &BvhNode, query: &Aabb3, accept: &mut F) -> bool
where
    F: FnMut(usize) -> bool,
{
    match node {
        BvhNode::Leaf { aabb, triangles } => {
            aabb.overlaps(query) && triangles.iter().any(|&i| accept(i))
        }
        BvhNode::Internal { aabb, left, right } => {
            aabb.overlaps(query)
                && (any_in_node(left, query, accept) || any_in_node(right, query, accept))
        }
    }
}

/// Build a BVH node recursively using SAH.
fn build_node(tri_data: &mut [(usize, Aabb3, Point3)]) -> BvhNode {
    let mut bounds = Aabb3::empty();
    for (_, aabb, _) in tri_data.iter() {
        bounds.union(aabb);
    }

    if tri_data.len() <= 4 {
        return BvhNode::Leaf {
            aabb: bounds,
            triangles: tri_data.iter().map(|(id, _, _)| *id).collect(),
        };
    }

    let (best_axis, best_pos) = find_best_split(tri_data, &bounds);
    let mut mid = partition_triangles(tri_data, best_axis, best_pos);

    // Fallback if partition fails: split in the middle
    if mid == 0 || mid == tri_data.len() {
        mid = tri_data.len() / 2;
    }

    let (left_data, right_data) = tri_data.split_at_mut(mid);

    BvhNode::Internal {
        aabb: bounds,
        left: Box::new(build_node(left_data)),
        right: Box::new(build_node(right_data)),
    }
}

/// Find the best split axis and position using SAH.
fn find_best_split(tri_data: &[(usize, Aabb3, Point3)], bounds: &Aabb3) -> (usize, f64) {
    const NUM_BUCKETS: usize = 12;

    let extent = bounds.extent();
    let total_area = bounds.surface_area();

    let mut best_cost = f64::INFINITY;
    let mut best_axis = bounds.longest_axis();
    let mut best_pos = bounds.center()[best_axis];

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-10 {
            continue;
        }
        let axis_min = bounds.min[axis];

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];

        for (_, aabb, centroid) in tri_data {
            let b = ((centroid[axis] - axis_min) / axis_extent * NUM_BUCKETS as f64) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].union(aabb);
        }

        for split in 1..NUM_BUCKETS {
            let mut left_count = 0;
            let mut left_bounds = Aabb3::empty();
            for i in 0..split {
                left_count += bucket_counts[i];
                left_bounds.union(&bucket_bounds[i]);
            }

            let mut right_count = 0;
            let mut right_bounds = Aabb3::empty();
            for i in split..NUM_BUCKETS {
                right_count += bucket_counts[i];
                right_bounds.union(&bucket_bounds[i]);
            }

            if left_count == 0 || right_count == 0 {
                continue;
            }

            // SAH cost: traversal + P(left) * N_left + P(right) * N_right
            let cost = 0.125
                + left_bounds.surface_area() / total_area * left_count as f64
                + right_bounds.surface_area() / total_area * right_count as f64;

            if cost < best_cost {
                best_cost = cost;
                best_axis = axis;
                best_pos = axis_min + (split as f64 / NUM_BUCKETS as f64) * axis_extent;
            }
        }
    }

    (best_axis, best_pos)
}

/// Partition triangles by centroid along an axis.
fn partition_triangles(tri_data: &mut [(usize, Aabb3, Point3)], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = tri_data.len();

    while left < right {
        if tri_data[left].2[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            tri_data.swap(left, right);
        }
    }

    left
}
