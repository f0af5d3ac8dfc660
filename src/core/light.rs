//! Area lights. Every geometry whose material emits light becomes a
//! **Light**; sampling picks a point uniformly on the surface and
//! converts the area density to solid angle.
//!
//! Emission is two-sided: the radiance returned does not depend on
//! which side of the surface is seen.

// wavefront
use crate::core::geometry::{pnt3_distance_squaredf, vec3_abs_dot_nrmf};
use crate::core::geometry::{Normal3f, Point2f, Point3f, Vector3f};
use crate::core::pbrt::{Float, Spectrum};
use crate::core::shape::Geom;

#[derive(Debug, Copy, Clone)]
pub struct Light {
    /// index into the scene's geometry table
    pub geom_id: usize,
    /// emitted radiance
    pub l_emit: Spectrum,
    pub area: Float,
}

/// A point sampled on a light, seen from a reference point.
#[derive(Debug, Copy, Clone)]
pub struct LightSample {
    /// normalized direction from the reference point to the light
    pub wi: Vector3f,
    pub li: Spectrum,
    /// density with respect to solid angle at the reference point
    pub pdf: Float,
    pub p_light: Point3f,
    pub n_light: Normal3f,
}

impl Light {
    pub fn new(geom_id: usize, geom: &Geom, l_emit: Spectrum) -> Self {
        Light {
            geom_id,
            l_emit,
            area: geom.area(),
        }
    }
    /// Radiance leaving the light surface.
    pub fn l(&self) -> Spectrum {
        self.l_emit
    }
    pub fn sample_li(&self, geom: &Geom, p_ref: &Point3f, u: &Point2f) -> Option<LightSample> {
        let (p_light, n_light) = geom.sample(u);
        let to_light: Vector3f = p_light - *p_ref;
        if to_light.length_squared() == 0.0 as Float {
            return None;
        }
        let wi: Vector3f = to_light.normalize();
        let pdf: Float = self.pdf_li(p_ref, &p_light, &n_light, &wi);
        if pdf == 0.0 as Float || pdf.is_infinite() {
            return None;
        }
        Some(LightSample {
            wi,
            li: self.l(),
            pdf,
            p_light,
            n_light,
        })
    }
    /// Solid angle density of reaching point *p_light* (with normal
    /// *n_light*) from *p_ref* along *wi* by sampling this light.
    pub fn pdf_li(
        &self,
        p_ref: &Point3f,
        p_light: &Point3f,
        n_light: &Normal3f,
        wi: &Vector3f,
    ) -> Float {
        let cos_light: Float = vec3_abs_dot_nrmf(wi, n_light);
        if cos_light == 0.0 as Float || self.area == 0.0 as Float {
            return 0.0 as Float;
        }
        pnt3_distance_squaredf(p_ref, p_light) / (cos_light * self.area)
    }
}
