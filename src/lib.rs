//! # rs_wavefront
//!
//! Iterative core of a parallel stochastic path tracer. Each
//! iteration traces one sample per pixel as a *wavefront*: every
//! stage (ray generation, intersection, shading, compaction) runs over
//! all active paths at once before the next stage starts. Direct light
//! is estimated with multiple importance sampling, radiance is
//! accumulated separately for direct and indirect illumination, and an
//! edge-avoiding A-trous wavelet filter can denoise the running
//! estimate, guided by first-hit normals and positions.
//!
//! A render session is driven through [core::api::RenderContext]:
//!
//! 1. [init][core::api::RenderContext::init] with a scene, a camera
//!    and a [RenderConfig][core::api::RenderConfig]
//! 2. [render_iteration][core::api::RenderContext::render_iteration]
//!    once per sample
//! 3. optionally [denoise][core::api::RenderContext::denoise]
//! 4. [push_to_surface][core::api::RenderContext::push_to_surface] or
//!    [readback][core::api::RenderContext::readback] any
//!    [BufferType][core::display::BufferType]

#[macro_use]
extern crate impl_ops;

pub mod accelerators;
pub mod core;
pub mod filters;
pub mod integrators;
