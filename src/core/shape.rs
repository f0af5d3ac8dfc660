//! Geometric primitives the path tracer can intersect: spheres and
//! triangles. Each primitive references one entry of the scene's
//! material table.
//!
//! Intersection returns the parametric distance plus a *token*, a
//! small value that lets [Geom::resolve_normals] rebuild the normals
//! later without redoing the intersection. For triangles the token
//! holds the barycentric coordinates of the hit.

// wavefront
use crate::core::geometry::{
    bnd3_union_pnt3, nrm_faceforward_vec3, vec3_cross_vec3, vec3_dot_vec3f,
};
use crate::core::geometry::{Bounds3f, Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::pbrt::{quadratic, Float};
use crate::core::sampling::{uniform_sample_sphere, uniform_sample_triangle};

#[derive(Debug, Copy, Clone)]
pub struct Sphere {
    pub center: Point3f,
    pub radius: Float,
    pub material_id: usize,
}

#[derive(Debug, Copy, Clone)]
pub struct Triangle {
    pub p: [Point3f; 3],
    /// optional per-vertex normals for smooth shading
    pub n: Option<[Normal3f; 3]>,
    pub material_id: usize,
}

#[derive(Debug, Copy, Clone)]
pub enum Geom {
    Sphere(Sphere),
    Triangle(Triangle),
}

impl Geom {
    pub fn material_id(&self) -> usize {
        match self {
            Geom::Sphere(sphere) => sphere.material_id,
            Geom::Triangle(triangle) => triangle.material_id,
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        match self {
            Geom::Sphere(sphere) => {
                let r: Vector3f = Vector3f::new(sphere.radius, sphere.radius, sphere.radius);
                Bounds3f::new(sphere.center - r, sphere.center + r)
            }
            Geom::Triangle(triangle) => bnd3_union_pnt3(
                &Bounds3f::new(triangle.p[0], triangle.p[1]),
                &triangle.p[2],
            ),
        }
    }
    pub fn area(&self) -> Float {
        match self {
            Geom::Sphere(sphere) => {
                4.0 as Float * std::f32::consts::PI * sphere.radius * sphere.radius
            }
            Geom::Triangle(triangle) => {
                0.5 as Float
                    * vec3_cross_vec3(
                        &(triangle.p[1] - triangle.p[0]),
                        &(triangle.p[2] - triangle.p[0]),
                    )
                    .length()
            }
        }
    }
    /// Nearest intersection with parametric distance in *(t_min,
    /// ray.t_max)*. Returns the distance and the normal token.
    pub fn intersect(&self, ray: &Ray, t_min: Float) -> Option<(Float, Point2f)> {
        match self {
            Geom::Sphere(sphere) => {
                let oc: Vector3f = ray.o - sphere.center;
                let a: Float = ray.d.length_squared();
                let b: Float = 2.0 as Float * vec3_dot_vec3f(&ray.d, &oc);
                let c: Float = oc.length_squared() - sphere.radius * sphere.radius;
                let (t0, t1) = quadratic(a, b, c)?;
                // check quadric shape _t0_ and _t1_ for nearest intersection
                if t0 > ray.t_max || t1 <= t_min {
                    return None;
                }
                let mut t_shape_hit: Float = t0;
                if t_shape_hit <= t_min {
                    t_shape_hit = t1;
                    if t_shape_hit > ray.t_max {
                        return None;
                    }
                }
                Some((t_shape_hit, Point2f::default()))
            }
            Geom::Triangle(triangle) => {
                // Moeller-Trumbore
                let e1: Vector3f = triangle.p[1] - triangle.p[0];
                let e2: Vector3f = triangle.p[2] - triangle.p[0];
                let pvec: Vector3f = vec3_cross_vec3(&ray.d, &e2);
                let det: Float = vec3_dot_vec3f(&e1, &pvec);
                if det.abs() < 1e-10 as Float {
                    return None;
                }
                let inv_det: Float = 1.0 as Float / det;
                let tvec: Vector3f = ray.o - triangle.p[0];
                let b1: Float = vec3_dot_vec3f(&tvec, &pvec) * inv_det;
                if b1 < 0.0 as Float || b1 > 1.0 as Float {
                    return None;
                }
                let qvec: Vector3f = vec3_cross_vec3(&tvec, &e1);
                let b2: Float = vec3_dot_vec3f(&ray.d, &qvec) * inv_det;
                if b2 < 0.0 as Float || b1 + b2 > 1.0 as Float {
                    return None;
                }
                let t: Float = vec3_dot_vec3f(&e2, &qvec) * inv_det;
                if t <= t_min || t > ray.t_max {
                    return None;
                }
                Some((t, Point2f { x: b1, y: b2 }))
            }
        }
    }
    /// Geometric and shading normal at the hit described by *t* and
    /// *token*. Both point to the outside of the primitive; the
    /// shading normal lies in the hemisphere of the geometric one.
    pub fn resolve_normals(&self, ray: &Ray, t: Float, token: &Point2f) -> (Normal3f, Normal3f) {
        match self {
            Geom::Sphere(sphere) => {
                let p: Point3f = ray.position(t);
                let n: Normal3f = Normal3f::from((p - sphere.center) / sphere.radius).normalize();
                (n, n)
            }
            Geom::Triangle(triangle) => {
                let ng: Normal3f = triangle.geometric_normal();
                let ns: Normal3f = match triangle.n {
                    Some(n) => {
                        let b0: Float = 1.0 as Float - token.x - token.y;
                        let interpolated: Normal3f = n[0] * b0 + n[1] * token.x + n[2] * token.y;
                        if interpolated.length_squared() > 0.0 as Float {
                            nrm_faceforward_vec3(&interpolated.normalize(), &Vector3f::from(ng))
                        } else {
                            ng
                        }
                    }
                    None => ng,
                };
                (ng, ns)
            }
        }
    }
    /// Uniformly sample a point on the surface; returns the point and
    /// its outward normal. The area density is `1 / area()`.
    pub fn sample(&self, u: &Point2f) -> (Point3f, Normal3f) {
        match self {
            Geom::Sphere(sphere) => {
                let d: Vector3f = uniform_sample_sphere(u);
                (sphere.center + d * sphere.radius, Normal3f::from(d))
            }
            Geom::Triangle(triangle) => {
                let b: Point2f = uniform_sample_triangle(u);
                let p: Point3f = triangle.p[0] * b[0]
                    + triangle.p[1] * b[1]
                    + triangle.p[2] * (1.0 as Float - b[0] - b[1]);
                (p, triangle.geometric_normal())
            }
        }
    }
}

impl Triangle {
    pub fn geometric_normal(&self) -> Normal3f {
        Normal3f::from(vec3_cross_vec3(&(self.p[1] - self.p[0]), &(self.p[2] - self.p[0])))
            .normalize()
    }
}
