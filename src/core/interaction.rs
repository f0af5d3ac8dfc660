//! The record the intersection stage hands to the shading stage.

// wavefront
use crate::core::geometry::Normal3f;
use crate::core::pbrt::Float;

/// Parametric distance stored for a ray that left the scene.
pub const MISS_T: Float = -1.0;

#[derive(Debug, Copy, Clone)]
pub struct ShadeableIntersection {
    /// hit distance, [MISS_T] for a miss
    pub t: Float,
    /// `None` for a miss
    pub material_id: Option<usize>,
    pub geom_id: Option<usize>,
    pub geometric_normal: Normal3f,
    pub shading_normal: Normal3f,
}

impl Default for ShadeableIntersection {
    fn default() -> Self {
        ShadeableIntersection::miss()
    }
}

impl ShadeableIntersection {
    pub fn miss() -> Self {
        ShadeableIntersection {
            t: MISS_T,
            material_id: None,
            geom_id: None,
            geometric_normal: Normal3f::default(),
            shading_normal: Normal3f::default(),
        }
    }
    pub fn is_hit(&self) -> bool {
        self.material_id.is_some() && self.t >= 0.0 as Float
    }
    /// Sort key used to group intersections by material; misses sort
    /// last.
    pub fn material_key(&self) -> usize {
        self.material_id.unwrap_or(usize::MAX)
    }
}
