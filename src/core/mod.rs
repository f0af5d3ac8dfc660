//! The building blocks every stage shares: geometry and sampling
//! math, the scene description, per-path state, the accumulation film,
//! buffer display and the session interface in [api].

pub mod api;
pub mod camera;
pub mod display;
pub mod error;
pub mod film;
pub mod geometry;
pub mod integrator;
pub mod interaction;
pub mod light;
pub mod material;
pub mod parallel;
pub mod pbrt;
pub mod rng;
pub mod sampler;
pub mod sampling;
pub mod scene;
pub mod shape;
pub mod spectrum;
