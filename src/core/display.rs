//! Buffer selection and tone mapping.
//!
//! A [BufferType] names *what* to look at. [select] maps it to the
//! storage backing it (one buffer, or two that are combined) together
//! with the per-pixel transform that turns stored values into display
//! values. The same binding drives both the RGBA8 display push and the
//! floating point read-back.

// std
use std::str::FromStr;
// others
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use strum_macros::{Display, EnumIter, EnumString};
// wavefront
use crate::core::error::{RenderError, Result};
use crate::core::film::{variance, Film};
use crate::core::geometry::{Bounds3f, Normal3f, Point3f};
use crate::core::pbrt::{clamp_t, gamma_encode, Float, Spectrum};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString, EnumIter, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum BufferType {
    DirectRaw,
    IndirectRaw,
    DirectVariance,
    IndirectVariance,
    Full,
    Normal,
    Position,
    FilteredDirect,
    FilteredIndirect,
    FilteredFull,
}

impl BufferType {
    pub fn parse(name: &str) -> Result<BufferType> {
        BufferType::from_str(name).map_err(|_| RenderError::UnknownBuffer(name.to_string()))
    }
}

/// Borrowed per-pixel storage; every variant yields three floats per
/// pixel.
#[derive(Debug, Copy, Clone)]
pub enum BufferStorage<'a> {
    Color(&'a [Spectrum]),
    Scalar(&'a [Float]),
    Normal(&'a [Normal3f]),
    Position(&'a [Point3f]),
}

impl<'a> BufferStorage<'a> {
    pub fn len(&self) -> usize {
        match self {
            BufferStorage::Color(b) => b.len(),
            BufferStorage::Scalar(b) => b.len(),
            BufferStorage::Normal(b) => b.len(),
            BufferStorage::Position(b) => b.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn texel(&self, i: usize) -> [Float; 3] {
        match self {
            BufferStorage::Color(b) => b[i].c,
            BufferStorage::Scalar(b) => [b[i]; 3],
            BufferStorage::Normal(b) => [b[i].x, b[i].y, b[i].z],
            BufferStorage::Position(b) => [b[i].x, b[i].y, b[i].z],
        }
    }
}

/// Parameters shared by all transforms.
#[derive(Debug, Copy, Clone)]
pub struct ToneMap {
    /// number of accumulated iterations
    pub iteration: u32,
    pub exposure: Float,
    /// world bounds used to normalize positions
    pub bounds: Bounds3f,
}

impl ToneMap {
    fn inv_iterations(&self) -> Float {
        1.0 as Float / self.iteration.max(1) as Float
    }
}

pub type Transform = fn(&[Float; 3], Option<&[Float; 3]>, &ToneMap) -> [Float; 3];

pub struct BufferBinding<'a> {
    pub buffer: BufferType,
    pub primary: BufferStorage<'a>,
    pub secondary: Option<BufferStorage<'a>>,
    pub transform: Transform,
}

impl<'a> BufferBinding<'a> {
    pub fn len(&self) -> usize {
        self.primary.len()
    }
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
    /// Display value of pixel *i*.
    pub fn pixel(&self, i: usize, tone: &ToneMap) -> [Float; 3] {
        let a: [Float; 3] = self.primary.texel(i);
        match self.secondary {
            Some(ref secondary) => (self.transform)(&a, Some(&secondary.texel(i)), tone),
            None => (self.transform)(&a, None, tone),
        }
    }
}

fn map3(v: &[Float; 3], f: impl Fn(Float) -> Float) -> [Float; 3] {
    [f(v[0]), f(v[1]), f(v[2])]
}

fn add3(a: &[Float; 3], b: Option<&[Float; 3]>) -> [Float; 3] {
    match b {
        Some(b) => [a[0] + b[0], a[1] + b[1], a[2] + b[2]],
        None => *a,
    }
}

fn raw_color(a: &[Float; 3], b: Option<&[Float; 3]>, tone: &ToneMap) -> [Float; 3] {
    let scale: Float = tone.inv_iterations() * tone.exposure;
    map3(&add3(a, b), |v| gamma_encode(v * scale))
}

fn filtered_color(a: &[Float; 3], b: Option<&[Float; 3]>, tone: &ToneMap) -> [Float; 3] {
    map3(&add3(a, b), |v| gamma_encode(v * tone.exposure))
}

fn variance_grey(a: &[Float; 3], b: Option<&[Float; 3]>, tone: &ToneMap) -> [Float; 3] {
    let sum_sqr: Float = b.map_or(0.0 as Float, |b| b[0]);
    let sum: Spectrum = Spectrum { c: *a };
    let v: Float = variance(&sum, sum_sqr, tone.iteration).powf(0.25 as Float);
    [v; 3]
}

fn normal_remap(a: &[Float; 3], _b: Option<&[Float; 3]>, _tone: &ToneMap) -> [Float; 3] {
    map3(a, |v| (v + 1.0 as Float) * 0.5 as Float)
}

fn position_remap(a: &[Float; 3], _b: Option<&[Float; 3]>, tone: &ToneMap) -> [Float; 3] {
    let o = tone.bounds.offset(&Point3f::new(a[0], a[1], a[2]));
    [o.x, o.y, o.z]
}

/// The storage pair and transform behind *buffer*.
pub fn select(film: &Film, buffer: BufferType) -> Result<BufferBinding<'_>> {
    let unavailable = || RenderError::BufferUnavailable(buffer);
    let binding = match buffer {
        BufferType::DirectRaw => BufferBinding {
            buffer,
            primary: BufferStorage::Color(&film.direct_illum),
            secondary: None,
            transform: raw_color,
        },
        BufferType::IndirectRaw => BufferBinding {
            buffer,
            primary: BufferStorage::Color(&film.indirect_illum),
            secondary: None,
            transform: raw_color,
        },
        BufferType::DirectVariance => BufferBinding {
            buffer,
            primary: BufferStorage::Color(&film.direct_illum),
            secondary: Some(BufferStorage::Scalar(&film.direct_sqr)),
            transform: variance_grey,
        },
        BufferType::IndirectVariance => BufferBinding {
            buffer,
            primary: BufferStorage::Color(&film.indirect_illum),
            secondary: Some(BufferStorage::Scalar(&film.indirect_sqr)),
            transform: variance_grey,
        },
        BufferType::Full => BufferBinding {
            buffer,
            primary: BufferStorage::Color(&film.direct_illum),
            secondary: Some(BufferStorage::Color(&film.indirect_illum)),
            transform: raw_color,
        },
        BufferType::Normal => BufferBinding {
            buffer,
            primary: BufferStorage::Normal(&film.gbuffer.as_ref().ok_or_else(unavailable)?.normals),
            secondary: None,
            transform: normal_remap,
        },
        BufferType::Position => BufferBinding {
            buffer,
            primary: BufferStorage::Position(
                &film.gbuffer.as_ref().ok_or_else(unavailable)?.positions,
            ),
            secondary: None,
            transform: position_remap,
        },
        BufferType::FilteredDirect => BufferBinding {
            buffer,
            primary: BufferStorage::Color(film.filtered_direct.as_ref().ok_or_else(unavailable)?),
            secondary: None,
            transform: filtered_color,
        },
        BufferType::FilteredIndirect => BufferBinding {
            buffer,
            primary: BufferStorage::Color(
                film.filtered_indirect.as_ref().ok_or_else(unavailable)?,
            ),
            secondary: None,
            transform: filtered_color,
        },
        BufferType::FilteredFull => BufferBinding {
            buffer,
            primary: BufferStorage::Color(film.filtered_direct.as_ref().ok_or_else(unavailable)?),
            secondary: Some(BufferStorage::Color(
                film.filtered_indirect.as_ref().ok_or_else(unavailable)?,
            )),
            transform: filtered_color,
        },
    };
    Ok(binding)
}

/// Map a display value in [0,1] to an 8 bit channel.
pub fn quantize(v: Float) -> u8 {
    clamp_t(v * 255.0 as Float, 0.0 as Float, 255.0 as Float) as u8
}

/// Anything a tone-mapped image can be pushed into.
pub trait PresentationSurface {
    fn dimensions(&self) -> (u32, u32);
    fn put_rgba(&mut self, x: u32, y: u32, rgba: [u8; 4]);
}

impl PresentationSurface for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }
    fn put_rgba(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.put_pixel(x, y, Rgba(rgba));
    }
}

/// Write the quantized image of *binding* into *surface*.
pub fn push_to_surface<S: PresentationSurface + ?Sized>(
    binding: &BufferBinding,
    tone: &ToneMap,
    width: usize,
    surface: &mut S,
) -> Result<()> {
    let (w, h) = surface.dimensions();
    let expected: usize = binding.len();
    if w as usize != width || (w as usize) * (h as usize) != expected {
        return Err(RenderError::ResolutionMismatch {
            expected,
            actual: (w as usize) * (h as usize),
        });
    }
    let rgba: Vec<[u8; 4]> = (0..expected)
        .into_par_iter()
        .map(|i| {
            let v: [Float; 3] = binding.pixel(i, tone);
            [quantize(v[0]), quantize(v[1]), quantize(v[2]), 255_u8]
        })
        .collect();
    for (i, px) in rgba.into_iter().enumerate() {
        surface.put_rgba((i % width) as u32, (i / width) as u32, px);
    }
    Ok(())
}

/// Tone-mapped floating point copy of *binding*.
pub fn readback(binding: &BufferBinding, tone: &ToneMap, out: &mut Vec<Spectrum>) -> Result<()> {
    let n: usize = binding.len();
    out.clear();
    out.try_reserve_exact(n)
        .map_err(|source| RenderError::Allocation {
            buffer: "read-back",
            source,
        })?;
    out.par_extend((0..n).into_par_iter().map(|i| Spectrum {
        c: binding.pixel(i, tone),
    }));
    Ok(())
}
