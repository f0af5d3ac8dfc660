//! The **Film** holds everything a render session accumulates per
//! pixel:
//!
//! - running sums of direct and indirect radiance, and of their
//!   squared magnitudes (for the variance estimate)
//! - the G-buffers (first-hit normal and position) guiding the
//!   denoiser
//! - the filtered results of the last denoiser runs
//!
//! All buffers are reserved fallibly; running out of memory is
//! reported as an error instead of aborting.

// others
use rayon::prelude::*;
use smallvec::SmallVec;
use strum_macros::{Display, EnumString};
use tracing::warn;
// wavefront
use crate::core::error::{RenderError, Result};
use crate::core::geometry::{Normal3f, Point3f};
use crate::core::integrator::PathSegment;
use crate::core::pbrt::{Float, Spectrum};

/// Which illumination category a denoiser run filters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DenoiseCategory {
    Direct,
    Indirect,
}

/// Per-pixel first-hit geometry.
pub struct GBuffer {
    pub normals: Vec<Normal3f>,
    pub positions: Vec<Point3f>,
    /// iteration the buffers were computed for
    pub iteration: u32,
}

pub struct Film {
    pub width: usize,
    pub height: usize,
    pub direct_illum: Vec<Spectrum>,
    pub indirect_illum: Vec<Spectrum>,
    pub direct_sqr: Vec<Float>,
    pub indirect_sqr: Vec<Float>,
    pub gbuffer: Option<GBuffer>,
    pub filtered_direct: Option<Vec<Spectrum>>,
    pub filtered_indirect: Option<Vec<Spectrum>>,
}

/// Allocate *len* copies of *value*, reporting failure instead of
/// aborting.
pub fn try_alloc<T: Clone>(buffer: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|source| RenderError::Allocation { buffer, source })?;
    v.resize(len, value);
    Ok(v)
}

/// Unbiased sample variance of the per-iteration squared magnitude
/// given the running sums over *iteration* samples. With a single
/// sample there is no estimate and 1.0 is used.
pub fn variance(sum: &Spectrum, sum_sqr: Float, iteration: u32) -> Float {
    if iteration > 1 {
        let n: Float = iteration as Float;
        ((sum_sqr - sum.length_squared() / n) / (n - 1.0 as Float)).max(0.0 as Float)
    } else {
        1.0 as Float
    }
}

impl Film {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let n: usize = width * height;
        Ok(Film {
            width,
            height,
            direct_illum: try_alloc("direct illumination", n, Spectrum::default())?,
            indirect_illum: try_alloc("indirect illumination", n, Spectrum::default())?,
            direct_sqr: try_alloc("direct second moment", n, 0.0 as Float)?,
            indirect_sqr: try_alloc("indirect second moment", n, 0.0 as Float)?,
            gbuffer: None,
            filtered_direct: None,
            filtered_indirect: None,
        })
    }
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }
    /// Zero all running sums and forget derived buffers.
    pub fn reset(&mut self) {
        self.direct_illum.iter_mut().for_each(|s| *s = Spectrum::default());
        self.indirect_illum.iter_mut().for_each(|s| *s = Spectrum::default());
        self.direct_sqr.iter_mut().for_each(|s| *s = 0.0 as Float);
        self.indirect_sqr.iter_mut().for_each(|s| *s = 0.0 as Float);
        self.filtered_direct = None;
        self.filtered_indirect = None;
    }
    /// Running sum and second moment of one category.
    pub fn illum(&self, category: DenoiseCategory) -> (&[Spectrum], &[Float]) {
        match category {
            DenoiseCategory::Direct => (&self.direct_illum, &self.direct_sqr),
            DenoiseCategory::Indirect => (&self.indirect_illum, &self.indirect_sqr),
        }
    }
    pub fn filtered(&self, category: DenoiseCategory) -> Option<&Vec<Spectrum>> {
        match category {
            DenoiseCategory::Direct => self.filtered_direct.as_ref(),
            DenoiseCategory::Indirect => self.filtered_indirect.as_ref(),
        }
    }
    pub fn set_filtered(&mut self, category: DenoiseCategory, filtered: Vec<Spectrum>) {
        match category {
            DenoiseCategory::Direct => self.filtered_direct = Some(filtered),
            DenoiseCategory::Indirect => self.filtered_indirect = Some(filtered),
        }
    }
    /// Per-pixel variance of one category after *iteration* samples.
    pub fn variance_buffer(&self, category: DenoiseCategory, iteration: u32) -> Result<Vec<Float>> {
        let (sum, sum_sqr) = self.illum(category);
        let mut out: Vec<Float> = try_alloc("variance", self.num_pixels(), 0.0 as Float)?;
        out.par_iter_mut()
            .zip(sum.par_iter().zip(sum_sqr.par_iter()))
            .for_each(|(v, (s, sq))| *v = variance(s, *sq, iteration));
        Ok(out)
    }
    /// Add the radiance of every path slot (alive or not) to the
    /// running sums of its pixel.
    pub fn accumulate(&mut self, paths: &[PathSegment]) -> Result<()> {
        // slots per pixel, usually exactly one
        let mut slots: Vec<SmallVec<[usize; 1]>> =
            try_alloc("gather slots", self.num_pixels(), SmallVec::new())?;
        for (slot, path) in paths.iter().enumerate() {
            slots[path.pixel_index].push(slot);
        }
        self.direct_illum
            .par_iter_mut()
            .zip(self.indirect_illum.par_iter_mut())
            .zip(self.direct_sqr.par_iter_mut())
            .zip(self.indirect_sqr.par_iter_mut())
            .zip(slots.par_iter())
            .enumerate()
            .for_each(|(pixel, ((((direct, indirect), direct_sqr), indirect_sqr), slots))| {
                for slot in slots {
                    let path: &PathSegment = &paths[*slot];
                    let d: Spectrum = checked_radiance(path.direct, pixel);
                    let i: Spectrum = checked_radiance(path.indirect, pixel);
                    *direct += d;
                    *indirect += i;
                    *direct_sqr += d.length_squared();
                    *indirect_sqr += i.length_squared();
                }
            });
        Ok(())
    }
}

/// Radiance values that would poison the running sums are replaced by
/// black.
fn checked_radiance(l: Spectrum, pixel: usize) -> Spectrum {
    let y: Float = l.y();
    if l.has_nans() {
        warn!(pixel, "Not-a-number radiance value. Setting to black.");
        Spectrum::default()
    } else if y < -10.0e-5 as Float {
        warn!(pixel, y, "Negative luminance value. Setting to black.");
        Spectrum::default()
    } else if y.is_infinite() {
        warn!(pixel, "Infinite luminance value. Setting to black.");
        Spectrum::default()
    } else {
        l
    }
}
