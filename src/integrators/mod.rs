//! The wavefront integrator splits every iteration into stages that
//! each run over all pixels or all still active paths:
//!
//! 1. ray generation (one camera path per pixel)
//! 2. nearest-hit intersection against the BVH
//! 3. an optional sort of the active paths by material
//! 4. shading, which adds emission and explicitly sampled direct
//!    light and picks the next direction
//! 5. compaction of terminated paths out of the active prefix
//!
//! Steps 2 to 5 repeat until no path is active. A final gather then
//! adds the radiance of every path to the film.

pub mod wavefront;
