// std
use std::f32::consts::PI;
// wavefront
use crate::core::geometry::{Point2f, Vector3f};
use crate::core::pbrt::Float;
use crate::core::pbrt::{INV_PI, PI_OVER_2, PI_OVER_4};
use crate::core::rng::{Rng, FLOAT_ONE_MINUS_EPSILON};

/// Integer hash (Bob Jenkins' 6-shift variant) used to decorrelate
/// pixels and to seed per-path random streams.
pub fn utilhash(a: u32) -> u32 {
    let mut a: u32 = a;
    a = a.wrapping_add(0x7ed5_5d16).wrapping_add(a << 12);
    a = (a ^ 0xc761_c23c) ^ (a >> 19);
    a = a.wrapping_add(0x1656_67b1).wrapping_add(a << 5);
    a = a.wrapping_add(0xd3a2_646c) ^ (a << 9);
    a = a.wrapping_add(0xfd70_46c5).wrapping_add(a << 3);
    a = (a ^ 0xb55a_4f09) ^ (a >> 16);
    a
}

/// Jittered (or centered) samples of an *nx* by *ny* grid over the
/// unit square, written row by row into *samp*.
pub fn stratified_sample_2d(samp: &mut [Point2f], nx: i32, ny: i32, rng: &mut Rng, jitter: bool) {
    let dx: Float = 1.0 as Float / nx as Float;
    let dy: Float = 1.0 as Float / ny as Float;
    let mut i: usize = 0;
    for y in 0..ny {
        for x in 0..nx {
            let jx: Float = if jitter { rng.uniform_float() } else { 0.5 as Float };
            let jy: Float = if jitter { rng.uniform_float() } else { 0.5 as Float };
            samp[i].x = ((x as Float + jx) * dx).min(FLOAT_ONE_MINUS_EPSILON);
            samp[i].y = ((y as Float + jy) * dy).min(FLOAT_ONE_MINUS_EPSILON);
            i += 1;
        }
    }
}

/// Randomly permute an array of *count* sample values, each of which
/// has *n_dimensions* dimensions.
pub fn shuffle<T>(samp: &mut [T], count: i32, n_dimensions: i32, rng: &mut Rng) {
    for i in 0..count {
        let other: i32 = i + rng.uniform_uint32_bounded((count - i) as u32) as i32;
        for j in 0..n_dimensions {
            samp.swap(
                (n_dimensions * i + j) as usize,
                (n_dimensions * other + j) as usize,
            );
        }
    }
}

/// Cosine-weighted hemisphere sampling using Malley's method.
pub fn cosine_sample_hemisphere(u: &Point2f) -> Vector3f {
    let d: Point2f = concentric_sample_disk(u);
    let z: Float = (0.0 as Float)
        .max(1.0 as Float - d.x * d.x - d.y * d.y)
        .sqrt();
    Vector3f { x: d.x, y: d.y, z }
}

/// Returns a weight of cos_theta / PI.
pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * INV_PI
}

/// Reducing the variance according to Veach's heuristic.
pub fn power_heuristic(nf: u8, f_pdf: Float, ng: u8, g_pdf: Float) -> Float {
    let f: Float = nf as Float * f_pdf;
    let g: Float = ng as Float * g_pdf;
    if f == 0.0 as Float && g == 0.0 as Float {
        return 0.0 as Float;
    }
    (f * f) / (f * f + g * g)
}

/// Uniformly sample rays in a full sphere. Choose a direction.
pub fn uniform_sample_sphere(u: &Point2f) -> Vector3f {
    let z: Float = 1.0 as Float - 2.0 as Float * u[0];
    let r: Float = (0.0 as Float).max(1.0 as Float - z * z).sqrt();
    let phi: Float = 2.0 as Float * PI * u[1];
    Vector3f {
        x: r * phi.cos(),
        y: r * phi.sin(),
        z,
    }
}

/// Uniformly distribute samples over a unit disk.
pub fn concentric_sample_disk(u: &Point2f) -> Point2f {
    // map uniform random numbers to $[-1,1]^2$
    let u_offset: Point2f = *u * 2.0 as Float - Point2f { x: 1.0, y: 1.0 };
    // handle degeneracy at the origin
    if u_offset.x == 0.0 as Float && u_offset.y == 0.0 as Float {
        return Point2f::default();
    }
    // apply concentric mapping to point
    let theta: Float;
    let r: Float;
    if u_offset.x.abs() > u_offset.y.abs() {
        r = u_offset.x;
        theta = PI_OVER_4 * (u_offset.y / u_offset.x);
    } else {
        r = u_offset.y;
        theta = PI_OVER_2 - PI_OVER_4 * (u_offset.x / u_offset.y);
    }
    Point2f {
        x: theta.cos(),
        y: theta.sin(),
    } * r
}

/// Uniformly distributing samples over isosceles right triangles
/// actually works for any triangle.
pub fn uniform_sample_triangle(u: &Point2f) -> Point2f {
    let su0: Float = u[0].sqrt();
    Point2f {
        x: 1.0 as Float - su0,
        y: u[1] * su0,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn concentric_disk_stays_inside_unit_disk() {
        let mut rng = Rng::new();
        for _ in 0..1000 {
            let u = Point2f::new(rng.uniform_float(), rng.uniform_float());
            let d = concentric_sample_disk(&u);
            assert!(d.x * d.x + d.y * d.y <= 1.0 + 1e-5);
        }
        assert_eq!(concentric_sample_disk(&Point2f::new(0.5, 0.5)), Point2f::default());
    }

    #[test]
    fn power_heuristic_balances() {
        assert!((power_heuristic(1, 1.0, 1, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(power_heuristic(1, 0.0, 1, 0.0), 0.0);
        assert!(power_heuristic(1, 10.0, 1, 1.0) > 0.98);
    }

    #[test]
    fn stratified_samples_cover_every_cell() {
        let mut rng = Rng::new();
        let n: i32 = 4;
        let mut samples = vec![Point2f::default(); (n * n) as usize];
        stratified_sample_2d(&mut samples, n, n, &mut rng, true);
        shuffle(&mut samples, n * n, 1, &mut rng);
        let mut seen = vec![false; (n * n) as usize];
        for s in &samples {
            let cx = (s.x * n as Float) as i32;
            let cy = (s.y * n as Float) as i32;
            seen[(cy * n + cx) as usize] = true;
        }
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn utilhash_is_deterministic() {
        assert_eq!(utilhash(42), utilhash(42));
        assert_ne!(utilhash(42), utilhash(43));
    }
}
