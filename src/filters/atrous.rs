//! Edge-avoiding A-trous wavelet filter.
//!
//! The filter blurs the per-pixel mean radiance with a 5x5 binomial
//! kernel whose taps spread further apart at every level. Each tap is
//! discounted by how much its color, normal and position differ from
//! the centre pixel, so edges in the G-buffers and in the image itself
//! survive the blur.
//!
//! The color tolerance is scaled by the per-pixel variance estimate:
//! noisy pixels accept larger color differences than converged ones.

// std
use std::ops::{Add, Mul};
// others
use rayon::prelude::*;
// wavefront
use crate::core::error::Result;
use crate::core::film::try_alloc;
use crate::core::geometry::{Normal3f, Point3f};
use crate::core::pbrt::{lerp, Float, Spectrum};

/// 1D binomial weights; the 2D kernel is their outer product.
pub const KERNEL: [Float; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Floor for every denominator of the edge-stopping terms.
const WEIGHT_EPSILON: Float = 1.0e-10;

#[derive(Debug, Copy, Clone)]
pub struct ATrousFilter {
    pub levels: u32,
    pub radius: Float,
    pub color_weight: Float,
    pub normal_weight: Float,
    pub position_weight: Float,
}

/// Guide images for the edge-stopping function.
pub struct Guides<'a> {
    pub variance: &'a [Float],
    pub normals: &'a [Normal3f],
    pub positions: &'a [Point3f],
}

impl ATrousFilter {
    /// Tap spacing of the first level.
    pub fn initial_step(&self) -> Float {
        0.5 as Float * self.radius / (1_u64 << self.levels.min(63)) as Float
    }
    /// Run all levels over *mean*, a *width* by *height* image of
    /// per-pixel averages. Returns the filtered image.
    pub fn filter(
        &self,
        width: usize,
        height: usize,
        mean: Vec<Spectrum>,
        guides: &Guides,
    ) -> Result<Vec<Spectrum>> {
        let mut working: Vec<Spectrum> = mean;
        let mut scratch: Vec<Spectrum> =
            try_alloc("denoiser scratch", width * height, Spectrum::default())?;
        let mut step: Float = self.initial_step();
        for _level in 0..self.levels {
            self.filter_level(width, height, step, &working, &mut scratch, guides);
            std::mem::swap(&mut working, &mut scratch);
            step *= 2.0 as Float;
        }
        Ok(working)
    }
    fn filter_level(
        &self,
        width: usize,
        height: usize,
        step: Float,
        input: &[Spectrum],
        output: &mut [Spectrum],
        guides: &Guides,
    ) {
        let cw2: Float = self.color_weight * self.color_weight;
        let nw2: Float = (self.normal_weight * self.normal_weight * step * step).max(WEIGHT_EPSILON);
        let pw2: Float = (self.position_weight * self.position_weight).max(WEIGHT_EPSILON);
        output
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let center: usize = y * width + x;
                    let c0: Spectrum = input[center];
                    let n0: Normal3f = guides.normals[center];
                    let p0: Point3f = guides.positions[center];
                    let color_denom: Float = (cw2 * guides.variance[center]).max(0.0 as Float)
                        + WEIGHT_EPSILON;
                    // the centre tap is never discounted
                    let w_center: Float = KERNEL[2] * KERNEL[2];
                    let mut sum: Spectrum = c0 * w_center;
                    let mut weight_sum: Float = w_center;
                    for (j, ky) in KERNEL.iter().enumerate() {
                        for (i, kx) in KERNEL.iter().enumerate() {
                            if i == 2 && j == 2 {
                                continue;
                            }
                            let sx: Float = x as Float + (i as Float - 2.0 as Float) * step;
                            let sy: Float = y as Float + (j as Float - 2.0 as Float) * step;
                            let c: Spectrum = sample_bilinear(input, width, height, sx, sy);
                            let n: Normal3f =
                                sample_bilinear(guides.normals, width, height, sx, sy);
                            let p: Point3f =
                                sample_bilinear(guides.positions, width, height, sx, sy);
                            let color_term: Float = (c - c0).length_squared() / color_denom;
                            let normal_term: Float = (n - n0).length_squared() / nw2;
                            let position_term: Float = (p - p0).length_squared() / pw2;
                            let w: Float =
                                kx * ky * (-(color_term + normal_term + position_term)).exp();
                            sum += c * w;
                            weight_sum += w;
                        }
                    }
                    *out = sum / weight_sum;
                }
            });
    }
}

/// Bilinear lookup at continuous pixel coordinates, clamped to the
/// image border.
pub fn sample_bilinear<T>(buf: &[T], width: usize, height: usize, x: Float, y: Float) -> T
where
    T: Copy + Add<T, Output = T> + Mul<Float, Output = T>,
{
    let max_x: Float = (width - 1) as Float;
    let max_y: Float = (height - 1) as Float;
    let x: Float = x.max(0.0 as Float).min(max_x);
    let y: Float = y.max(0.0 as Float).min(max_y);
    let x0: usize = x.floor() as usize;
    let y0: usize = y.floor() as usize;
    let x1: usize = (x0 + 1).min(width - 1);
    let y1: usize = (y0 + 1).min(height - 1);
    let fx: Float = x - x0 as Float;
    let fy: Float = y - y0 as Float;
    let top: T = lerp(fx, buf[y0 * width + x0], buf[y0 * width + x1]);
    let bottom: T = lerp(fx, buf[y1 * width + x0], buf[y1 * width + x1]);
    lerp(fy, top, bottom)
}
