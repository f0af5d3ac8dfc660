//! Almost all nontrivial graphics programs are built on a foundation
//! of geometric classes. These classes represent mathematical
//! constructs like points, vectors, and rays.
//!
//! # Points
//!
//! A **point** is a zero-dimensional location in 2D or 3D space.
//!
//! ```rust
//! use rs_wavefront::core::geometry::Point3f;
//!
//!     let float_origin = Point3f {
//!         x: 0.0,
//!         y: 0.0,
//!         z: 0.0,
//!     };
//!
//!     println!("float {:?}", float_origin);
//! ```
//!
//! # Vectors
//!
//! Directions are represented by **Vector3f**. Although the same
//! representation is used for points, a vector represents a
//! direction and is treated differently (e.g. it is the thing that
//! gets normalized).
//!
//! # Normals
//!
//! A surface **normal** is a vector that is perpendicular to a
//! surface at a particular position. The path tracer keeps two of
//! them per hit: the geometric normal of the primitive and the
//! (possibly interpolated) shading normal.
//!
//! # Rays
//!
//! A **ray** is a semi-infinite line specified by its origin and
//! direction, limited by *t_max*.

// std
use std::ops;
use std::ops::{Index, IndexMut};
// wavefront
use crate::core::pbrt::Float;

/// Offset applied to spawned ray origins along the surface normal.
pub const RAY_EPSILON: Float = 1.0e-4;

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Vector3f { x, y, z }
    }
    pub fn has_nans(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    /// Compute a new vector pointing in the same direction but with unit
    /// length.
    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }
}

impl Index<usize> for Vector3f {
    type Output = Float;
    fn index(&self, index: usize) -> &Float {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl From<Point3f> for Vector3f {
    fn from(p: Point3f) -> Self {
        Vector3f {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Self {
        Vector3f {
            x: n.x,
            y: n.y,
            z: n.z,
        }
    }
}

/// Product of the Euclidean magnitudes of the two vectors and the
/// cosine of the angle between them.
pub fn vec3_dot_vec3f(v1: &Vector3f, v2: &Vector3f) -> Float {
    v1.x * v2.x + v1.y * v2.y + v1.z * v2.z
}

/// Product of the Euclidean magnitudes of a vector (and a normal) and
/// the cosine of the angle between them.
pub fn vec3_dot_nrmf(v1: &Vector3f, n2: &Normal3f) -> Float {
    v1.x * n2.x + v1.y * n2.y + v1.z * n2.z
}

/// Computes the absolute value of the dot product.
pub fn vec3_abs_dot_nrmf(v1: &Vector3f, n2: &Normal3f) -> Float {
    vec3_dot_nrmf(v1, n2).abs()
}

/// Given two vectors in 3D, the cross product is a vector that is
/// perpendicular to both of them.
pub fn vec3_cross_vec3(v1: &Vector3f, v2: &Vector3f) -> Vector3f {
    let v1x: f64 = v1.x as f64;
    let v1y: f64 = v1.y as f64;
    let v1z: f64 = v1.z as f64;
    let v2x: f64 = v2.x as f64;
    let v2y: f64 = v2.y as f64;
    let v2z: f64 = v2.z as f64;
    Vector3f {
        x: ((v1y * v2z) - (v1z * v2y)) as Float,
        y: ((v1z * v2x) - (v1x * v2z)) as Float,
        z: ((v1x * v2y) - (v1y * v2x)) as Float,
    }
}

/// Construct a local coordinate system given only a single 3D vector.
pub fn vec3_coordinate_system(v1: &Vector3f) -> (Vector3f, Vector3f) {
    let v2: Vector3f = if v1.x.abs() > v1.y.abs() {
        Vector3f {
            x: -v1.z,
            y: 0.0 as Float,
            z: v1.x,
        } / (v1.x * v1.x + v1.z * v1.z).sqrt()
    } else {
        Vector3f {
            x: 0.0 as Float,
            y: v1.z,
            z: -v1.y,
        } / (v1.y * v1.y + v1.z * v1.z).sqrt()
    };
    let v3: Vector3f = vec3_cross_vec3(v1, &v2);
    (v2, v3)
}

/// Mirror *wo* about the normal *n*.
pub fn vec3_reflect(wo: &Vector3f, n: &Normal3f) -> Vector3f {
    -*wo + Vector3f::from(*n) * 2.0 as Float * vec3_dot_nrmf(wo, n)
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point2f {
    pub x: Float,
    pub y: Float,
}

impl Point2f {
    pub fn new(x: Float, y: Float) -> Self {
        Point2f { x, y }
    }
}

impl Index<usize> for Point2f {
    type Output = Float;
    fn index(&self, index: usize) -> &Float {
        match index {
            0 => &self.x,
            _ => &self.y,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3f {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Point3f { x, y, z }
    }
}

impl Index<usize> for Point3f {
    type Output = Float;
    fn index(&self, index: usize) -> &Float {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl IndexMut<usize> for Point3f {
    fn index_mut(&mut self, index: usize) -> &mut Float {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl From<Vector3f> for Point3f {
    fn from(v: Vector3f) -> Self {
        Point3f {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// The distance squared between two points is the length of the
/// vector between them squared.
pub fn pnt3_distance_squaredf(p1: &Point3f, p2: &Point3f) -> Float {
    (*p1 - *p2).length_squared()
}

/// Component-wise minimum.
pub fn pnt3_min_pnt3(p1: &Point3f, p2: &Point3f) -> Point3f {
    Point3f {
        x: p1.x.min(p2.x),
        y: p1.y.min(p2.y),
        z: p1.z.min(p2.z),
    }
}

/// Component-wise maximum.
pub fn pnt3_max_pnt3(p1: &Point3f, p2: &Point3f) -> Point3f {
    Point3f {
        x: p1.x.max(p2.x),
        y: p1.y.max(p2.y),
        z: p1.z.max(p2.z),
    }
}

/// Move a surface point slightly along the normal so that a ray
/// leaving in direction *w* does not immediately hit the surface it
/// starts on.
pub fn pnt3_offset_ray_origin(p: &Point3f, n: &Normal3f, w: &Vector3f) -> Point3f {
    let mut offset: Vector3f = Vector3f::from(*n) * RAY_EPSILON;
    if vec3_dot_nrmf(w, n) < 0.0 as Float {
        offset = -offset;
    }
    *p + offset
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Normal3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Normal3f {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Normal3f { x, y, z }
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    pub fn normalize(&self) -> Normal3f {
        *self / self.length()
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Self {
        Normal3f {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Flip a surface normal so that it lies in the same hemisphere as a
/// given vector.
pub fn nrm_faceforward_vec3(n: &Normal3f, v: &Vector3f) -> Normal3f {
    if vec3_dot_nrmf(v, n) < 0.0 as Float {
        -*n
    } else {
        *n
    }
}

// operators

impl_op!(-|a: Vector3f| -> Vector3f {
    Vector3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op!(-|a: Normal3f| -> Normal3f {
    Normal3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op_ex!(+|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(*|a: &Vector3f, b: Float| -> Vector3f {
    Vector3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(/|a: &Vector3f, b: Float| -> Vector3f {
    let inv: Float = 1.0 as Float / b;
    Vector3f {
        x: a.x * inv,
        y: a.y * inv,
        z: a.z * inv,
    }
});

impl_op!(+= |a: &mut Vector3f, b: Vector3f| {
    a.x += b.x;
    a.y += b.y;
    a.z += b.z;
});

impl_op_ex!(+|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Point3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Point3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(*|a: &Point3f, b: Float| -> Point3f {
    Point3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(+|a: &Point2f, b: &Point2f| -> Point2f {
    Point2f {
        x: a.x + b.x,
        y: a.y + b.y,
    }
});

impl_op_ex!(-|a: &Point2f, b: &Point2f| -> Point2f {
    Point2f {
        x: a.x - b.x,
        y: a.y - b.y,
    }
});

impl_op_ex!(*|a: &Point2f, b: Float| -> Point2f {
    Point2f {
        x: a.x * b,
        y: a.y * b,
    }
});

impl_op_ex!(+|a: &Normal3f, b: &Normal3f| -> Normal3f {
    Normal3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Normal3f, b: &Normal3f| -> Normal3f {
    Normal3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(*|a: &Normal3f, b: Float| -> Normal3f {
    Normal3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(/|a: &Normal3f, b: Float| -> Normal3f {
    let inv: Float = 1.0 as Float / b;
    Normal3f {
        x: a.x * inv,
        y: a.y * inv,
        z: a.z * inv,
    }
});

// bounds

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    fn default() -> Bounds3f {
        // an empty box: any union will replace both corners
        let min_num: Float = std::f32::MIN;
        let max_num: Float = std::f32::MAX;
        Bounds3f {
            p_min: Point3f {
                x: max_num,
                y: max_num,
                z: max_num,
            },
            p_max: Point3f {
                x: min_num,
                y: min_num,
                z: min_num,
            },
        }
    }
}

impl Bounds3f {
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Bounds3f {
            p_min: pnt3_min_pnt3(&p1, &p2),
            p_max: pnt3_max_pnt3(&p1, &p2),
        }
    }
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }
    pub fn centroid(&self) -> Point3f {
        self.p_min * 0.5 + self.p_max * 0.5
    }
    /// Index of the longest axis.
    pub fn maximum_extent(&self) -> usize {
        let d: Vector3f = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0_usize
        } else if d.y > d.z {
            1_usize
        } else {
            2_usize
        }
    }
    /// Position of *p* relative to the corners, (0,0,0) at *p_min*
    /// and (1,1,1) at *p_max*. Degenerate axes map to zero.
    pub fn offset(&self, p: &Point3f) -> Vector3f {
        let mut o: Vector3f = *p - self.p_min;
        let d: Vector3f = self.diagonal();
        if d.x > 0.0 as Float {
            o.x /= d.x;
        } else {
            o.x = 0.0;
        }
        if d.y > 0.0 as Float {
            o.y /= d.y;
        } else {
            o.y = 0.0;
        }
        if d.z > 0.0 as Float {
            o.z /= d.z;
        } else {
            o.z = 0.0;
        }
        o
    }
    /// Slab test against precomputed reciprocal direction. Returns the
    /// parametric entry distance if the ray overlaps the box within
    /// *[0, ray.t_max]*.
    pub fn intersect_p(&self, ray: &Ray, inv_dir: &Vector3f) -> Option<Float> {
        let mut t0: Float = 0.0;
        let mut t1: Float = ray.t_max;
        for i in 0..3_usize {
            let mut t_near: Float = (self.p_min[i] - ray.o[i]) * inv_dir[i];
            let mut t_far: Float = (self.p_max[i] - ray.o[i]) * inv_dir[i];
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            // robust against rounding at grazing angles
            t_far *= 1.0 + 2.0 * 3.0 * std::f32::EPSILON;
            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }
        Some(t0)
    }
}

/// Given a bounding box and a point, the **bnd3_union_pnt3()**
/// function returns a new bounding box that encompasses that point as
/// well as the original box.
pub fn bnd3_union_pnt3(b: &Bounds3f, p: &Point3f) -> Bounds3f {
    Bounds3f {
        p_min: pnt3_min_pnt3(&b.p_min, p),
        p_max: pnt3_max_pnt3(&b.p_max, p),
    }
}

/// Construct a new box that bounds the space encompassed by two other
/// bounding boxes.
pub fn bnd3_union_bnd3(b1: &Bounds3f, b2: &Bounds3f) -> Bounds3f {
    Bounds3f {
        p_min: pnt3_min_pnt3(&b1.p_min, &b2.p_min),
        p_max: pnt3_max_pnt3(&b1.p_max, &b2.p_max),
    }
}

// ray

#[derive(Debug, Copy, Clone)]
pub struct Ray {
    /// origin
    pub o: Point3f,
    /// direction
    pub d: Vector3f,
    /// limits the ray to a segment along its infinite extent
    pub t_max: Float,
}

impl Default for Ray {
    fn default() -> Self {
        Ray {
            o: Point3f::default(),
            d: Vector3f::new(0.0, 0.0, 1.0),
            t_max: std::f32::INFINITY,
        }
    }
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f) -> Self {
        Ray {
            o,
            d,
            t_max: std::f32::INFINITY,
        }
    }
    /// Spawn a ray leaving surface point *p* with normal *n* in
    /// direction *d*.
    pub fn spawn(p: &Point3f, n: &Normal3f, d: &Vector3f) -> Self {
        Ray::new(pnt3_offset_ray_origin(p, n, d), *d)
    }
    // Point3f operator()(Float t) const { return o + d * t; }
    pub fn position(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}
