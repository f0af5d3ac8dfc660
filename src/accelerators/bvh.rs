// wavefront
use crate::core::geometry::{bnd3_union_bnd3, bnd3_union_pnt3};
use crate::core::geometry::{Bounds3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::pbrt::{Float, SHADOW_EPSILON};
use crate::core::shape::Geom;

/// Hits on an excluded geometry closer than this are treated as the
/// ray re-hitting the surface it just left.
pub const SELF_HIT_T: Float = 1.0e-3;

#[derive(Debug, Default, Copy, Clone)]
pub struct BVHPrimitiveInfo {
    primitive_number: usize,
    bounds: Bounds3f,
    centroid: Point3f,
}

impl BVHPrimitiveInfo {
    pub fn new(primitive_number: usize, bounds: Bounds3f) -> Self {
        BVHPrimitiveInfo {
            primitive_number,
            bounds,
            centroid: bounds.centroid(),
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct LinearBVHNode {
    pub bounds: Bounds3f,
    // primitives offset for a leaf, second child offset for an interior node
    pub offset: usize,
    pub n_primitives: usize,
    pub axis: u8,
}

/// Nearest hit found by a traversal.
#[derive(Debug, Copy, Clone)]
pub struct HitRecord {
    pub geom_id: usize,
    pub t: Float,
    /// passed on to `Geom::resolve_normals`
    pub token: Point2f,
}

/// Bounding volume hierarchy over the scene geometry, stored as a
/// depth-first flattened node array. The tree references geometry by
/// index, so the geometry table is passed to every query.
pub struct BVHAccel {
    max_prims_in_node: usize,
    pub nodes: Vec<LinearBVHNode>,
    pub root: usize,
    /// geometry ids in leaf order
    pub prim_indices: Vec<usize>,
}

impl BVHAccel {
    pub fn new(geoms: &[Geom], max_prims_in_node: usize) -> Self {
        let mut bvh = BVHAccel {
            max_prims_in_node: max_prims_in_node.clamp(1, 255),
            nodes: Vec::new(),
            root: 0_usize,
            prim_indices: Vec::with_capacity(geoms.len()),
        };
        if geoms.is_empty() {
            return bvh;
        }
        let mut primitive_info: Vec<BVHPrimitiveInfo> = geoms
            .iter()
            .enumerate()
            .map(|(i, geom)| BVHPrimitiveInfo::new(i, geom.world_bound()))
            .collect();
        let n: usize = primitive_info.len();
        bvh.nodes.reserve(2 * n);
        bvh.recursive_build(&mut primitive_info, 0, n);
        bvh
    }
    /// Build the subtree over `primitive_info[start..end]`, appending
    /// its nodes in depth-first order; returns the node offset.
    fn recursive_build(
        &mut self,
        primitive_info: &mut [BVHPrimitiveInfo],
        start: usize,
        end: usize,
    ) -> usize {
        debug_assert_ne!(start, end);
        let my_offset: usize = self.nodes.len();
        self.nodes.push(LinearBVHNode::default());
        // compute bounds of all primitives in BVH node
        let mut bounds: Bounds3f = Bounds3f::default();
        for info in &primitive_info[start..end] {
            bounds = bnd3_union_bnd3(&bounds, &info.bounds);
        }
        let n_primitives: usize = end - start;
        // compute bound of primitive centroids, choose split dimension _dim_
        let mut centroid_bounds: Bounds3f = Bounds3f::default();
        for info in &primitive_info[start..end] {
            centroid_bounds = bnd3_union_pnt3(&centroid_bounds, &info.centroid);
        }
        let dim: usize = centroid_bounds.maximum_extent();
        if n_primitives <= self.max_prims_in_node
            || centroid_bounds.p_max[dim] == centroid_bounds.p_min[dim]
        {
            // create leaf
            let first_prim_offset: usize = self.prim_indices.len();
            for info in &primitive_info[start..end] {
                self.prim_indices.push(info.primitive_number);
            }
            self.nodes[my_offset] = LinearBVHNode {
                bounds,
                offset: first_prim_offset,
                n_primitives,
                axis: 0_u8,
            };
            return my_offset;
        }
        // partition into equally sized subsets
        let mid: usize = (start + end) / 2;
        primitive_info[start..end].select_nth_unstable_by(mid - start, |a, b| {
            a.centroid[dim]
                .partial_cmp(&b.centroid[dim])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.recursive_build(primitive_info, start, mid);
        let second_child: usize = self.recursive_build(primitive_info, mid, end);
        self.nodes[my_offset] = LinearBVHNode {
            bounds,
            offset: second_child,
            n_primitives: 0_usize,
            axis: dim as u8,
        };
        my_offset
    }
    pub fn world_bound(&self) -> Bounds3f {
        if !self.nodes.is_empty() {
            self.nodes[self.root].bounds
        } else {
            Bounds3f::default()
        }
    }
    /// Nearest hit along *ray*. Hits on *exclude* or *prev_exclude*
    /// closer than [SELF_HIT_T] are ignored.
    pub fn intersect(
        &self,
        geoms: &[Geom],
        ray: &Ray,
        exclude: Option<usize>,
        prev_exclude: Option<usize>,
    ) -> Option<HitRecord> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut ray: Ray = *ray;
        let mut hit: Option<HitRecord> = None;
        let inv_dir: Vector3f = Vector3f {
            x: 1.0 / ray.d.x,
            y: 1.0 / ray.d.y,
            z: 1.0 / ray.d.z,
        };
        let dir_is_neg: [bool; 3] = [inv_dir.x < 0.0, inv_dir.y < 0.0, inv_dir.z < 0.0];
        // follow ray through BVH nodes to find primitive intersections
        let mut to_visit_offset: usize = 0;
        let mut current_node_index: usize = self.root;
        let mut nodes_to_visit: [usize; 64] = [0_usize; 64];
        loop {
            let node: &LinearBVHNode = &self.nodes[current_node_index];
            if node.bounds.intersect_p(&ray, &inv_dir).is_some() {
                if node.n_primitives > 0 {
                    for i in 0..node.n_primitives {
                        let geom_id: usize = self.prim_indices[node.offset + i];
                        let t_min: Float =
                            if Some(geom_id) == exclude || Some(geom_id) == prev_exclude {
                                SELF_HIT_T
                            } else {
                                0.0 as Float
                            };
                        if let Some((t, token)) = geoms[geom_id].intersect(&ray, t_min) {
                            ray.t_max = t;
                            hit = Some(HitRecord { geom_id, t, token });
                        }
                    }
                    if to_visit_offset == 0 {
                        break;
                    }
                    to_visit_offset -= 1;
                    current_node_index = nodes_to_visit[to_visit_offset];
                } else {
                    // put far BVH node on _nodesToVisit_ stack,
                    // advance to near node
                    if dir_is_neg[node.axis as usize] {
                        nodes_to_visit[to_visit_offset] = current_node_index + 1;
                        current_node_index = node.offset;
                    } else {
                        nodes_to_visit[to_visit_offset] = node.offset;
                        current_node_index += 1;
                    }
                    to_visit_offset += 1;
                }
            } else {
                if to_visit_offset == 0 {
                    break;
                }
                to_visit_offset -= 1;
                current_node_index = nodes_to_visit[to_visit_offset];
            }
        }
        hit
    }
    /// Shadow query: true if nothing blocks the segment from *p0* to
    /// *p1*. The surface *p0* lies on is passed as *exclude*.
    pub fn unoccluded(
        &self,
        geoms: &[Geom],
        p0: &Point3f,
        p1: &Point3f,
        exclude: Option<usize>,
    ) -> bool {
        let d: Vector3f = *p1 - *p0;
        let ray: Ray = Ray {
            o: *p0,
            d,
            t_max: 1.0 as Float - SHADOW_EPSILON,
        };
        self.intersect(geoms, &ray, exclude, None).is_none()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::shape::Sphere;

    fn row_of_spheres(n: usize) -> Vec<Geom> {
        (0..n)
            .map(|i| {
                Geom::Sphere(Sphere {
                    center: Point3f::new(i as Float * 3.0, 0.0, 0.0),
                    radius: 1.0,
                    material_id: 0,
                })
            })
            .collect()
    }

    fn brute_force(geoms: &[Geom], ray: &Ray) -> Option<(usize, Float)> {
        let mut best: Option<(usize, Float)> = None;
        for (i, g) in geoms.iter().enumerate() {
            if let Some((t, _)) = g.intersect(ray, 0.0) {
                if best.map_or(true, |(_, bt)| t < bt) {
                    best = Some((i, t));
                }
            }
        }
        best
    }

    #[test]
    fn nearest_hit_matches_brute_force() {
        let geoms = row_of_spheres(17);
        let bvh = BVHAccel::new(&geoms, 2);
        assert_eq!(bvh.prim_indices.len(), 17);
        for k in 0..40 {
            let o = Point3f::new(-5.0 + k as Float, 0.3, -10.0);
            let d = Vector3f::new(0.05 * k as Float - 1.0, 0.01, 1.0).normalize();
            let ray = Ray::new(o, d);
            let expected = brute_force(&geoms, &ray);
            let got = bvh.intersect(&geoms, &ray, None, None);
            match (expected, got) {
                (None, None) => {}
                (Some((id, t)), Some(hit)) => {
                    assert_eq!(id, hit.geom_id);
                    assert!((t - hit.t).abs() < 1e-4);
                }
                _ => panic!("bvh and brute force disagree for ray {}", k),
            }
        }
    }

    #[test]
    fn along_the_row_hits_first_sphere() {
        let geoms = row_of_spheres(8);
        let bvh = BVHAccel::new(&geoms, 1);
        let ray = Ray::new(Point3f::new(-5.0, 0.0, 0.0), Vector3f::new(1.0, 0.0, 0.0));
        let hit = bvh.intersect(&geoms, &ray, None, None).unwrap();
        assert_eq!(hit.geom_id, 0);
        assert!((hit.t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn excluded_geometry_is_skipped_near_origin() {
        let geoms = row_of_spheres(2);
        let bvh = BVHAccel::new(&geoms, 1);
        // leaving sphere 0 on its surface towards sphere 1
        let ray = Ray::new(Point3f::new(1.0, 0.0, 0.0), Vector3f::new(1.0, 0.0, 0.0));
        let hit = bvh.intersect(&geoms, &ray, Some(0), None).unwrap();
        assert_eq!(hit.geom_id, 1);
        assert!((hit.t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shadow_segments() {
        let geoms = row_of_spheres(3);
        let bvh = BVHAccel::new(&geoms, 1);
        let p0 = Point3f::new(1.0, 0.0, 0.0);
        // surface point of sphere 2 facing sphere 1: blocked
        assert!(!bvh.unoccluded(&geoms, &p0, &Point3f::new(5.0, 0.0, 0.0), Some(0)));
        // surface point of sphere 1: free
        assert!(bvh.unoccluded(&geoms, &p0, &Point3f::new(2.0, 0.0, 0.0), Some(0)));
        assert!(bvh.world_bound().p_max.x > 6.9);
    }
}
