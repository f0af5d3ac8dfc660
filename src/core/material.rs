//! Surface appearance. A **Material** is one of four kinds, decided
//! by its parameters:
//!
//! - emissive (`emittance > 0`), a light source that ends the path
//! - perfect mirror (`has_reflective > 0`)
//! - dielectric glass (`has_refractive > 0`), Fresnel-weighted
//!   reflection and transmission
//! - Lambertian diffuse otherwise
//!
//! All directions are in world space. Normals passed in are the
//! outward shading normals; the functions decide the side
//! themselves.

// wavefront
use crate::core::geometry::{
    nrm_faceforward_vec3, vec3_coordinate_system, vec3_dot_nrmf, vec3_reflect,
};
use crate::core::geometry::{Normal3f, Point2f, Vector3f};
use crate::core::pbrt::{clamp_t, Float, Spectrum, INV_PI};
use crate::core::sampling::{cosine_hemisphere_pdf, cosine_sample_hemisphere};

#[derive(Debug, Copy, Clone)]
pub struct Material {
    pub color: Spectrum,
    pub specular_color: Spectrum,
    pub has_reflective: Float,
    pub has_refractive: Float,
    pub index_of_refraction: Float,
    pub emittance: Float,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            color: Spectrum::new(0.5 as Float),
            specular_color: Spectrum::new(1.0 as Float),
            has_reflective: 0.0 as Float,
            has_refractive: 0.0 as Float,
            index_of_refraction: 1.0 as Float,
            emittance: 0.0 as Float,
        }
    }
}

/// Result of sampling the BSDF.
#[derive(Debug, Copy, Clone)]
pub struct BsdfSample {
    pub wi: Vector3f,
    pub f: Spectrum,
    pub pdf: Float,
    pub specular: bool,
}

impl Material {
    pub fn diffuse(color: Spectrum) -> Self {
        Material {
            color,
            ..Default::default()
        }
    }
    pub fn mirror(specular_color: Spectrum) -> Self {
        Material {
            specular_color,
            has_reflective: 1.0 as Float,
            ..Default::default()
        }
    }
    pub fn glass(specular_color: Spectrum, index_of_refraction: Float) -> Self {
        Material {
            specular_color,
            has_refractive: 1.0 as Float,
            index_of_refraction,
            ..Default::default()
        }
    }
    pub fn emissive(color: Spectrum, emittance: Float) -> Self {
        Material {
            color,
            emittance,
            ..Default::default()
        }
    }
    pub fn is_emissive(&self) -> bool {
        self.emittance > 0.0 as Float
    }
    pub fn is_specular(&self) -> bool {
        self.has_reflective > 0.0 as Float || self.has_refractive > 0.0 as Float
    }
    /// Emitted radiance.
    pub fn le(&self) -> Spectrum {
        self.color * self.emittance
    }
    /// BSDF value for the pair of directions. Delta distributions
    /// evaluate to zero.
    pub fn f(&self, wo: &Vector3f, wi: &Vector3f, n: &Normal3f) -> Spectrum {
        if self.is_specular() || !same_hemisphere(wo, wi, n) {
            return Spectrum::default();
        }
        self.color * INV_PI
    }
    pub fn pdf(&self, wo: &Vector3f, wi: &Vector3f, n: &Normal3f) -> Float {
        if self.is_specular() || !same_hemisphere(wo, wi, n) {
            return 0.0 as Float;
        }
        cosine_hemisphere_pdf(vec3_dot_nrmf(wi, n).abs())
    }
    /// Sample an incident direction for the outgoing direction *wo*.
    /// Returns `None` when the sample carries no energy.
    pub fn sample_f(&self, wo: &Vector3f, n: &Normal3f, u: &Point2f) -> Option<BsdfSample> {
        let sample: BsdfSample = if self.has_refractive > 0.0 as Float {
            self.sample_dielectric(wo, n, u)?
        } else if self.has_reflective > 0.0 as Float {
            let n_ff: Normal3f = nrm_faceforward_vec3(n, wo);
            let wi: Vector3f = vec3_reflect(wo, &n_ff);
            let cos_theta: Float = vec3_dot_nrmf(&wi, &n_ff).abs();
            if cos_theta == 0.0 as Float {
                return None;
            }
            BsdfSample {
                wi,
                f: self.specular_color / cos_theta,
                pdf: 1.0 as Float,
                specular: true,
            }
        } else {
            let n_ff: Normal3f = nrm_faceforward_vec3(n, wo);
            let local: Vector3f = cosine_sample_hemisphere(u);
            let nz: Vector3f = Vector3f::from(n_ff);
            let (tx, ty) = vec3_coordinate_system(&nz);
            let wi: Vector3f = tx * local.x + ty * local.y + nz * local.z;
            BsdfSample {
                wi,
                f: self.color * INV_PI,
                pdf: cosine_hemisphere_pdf(local.z),
                specular: false,
            }
        };
        if sample.pdf == 0.0 as Float || sample.f.is_black() {
            return None;
        }
        Some(sample)
    }
    fn sample_dielectric(&self, wo: &Vector3f, n: &Normal3f, u: &Point2f) -> Option<BsdfSample> {
        let cos_o: Float = vec3_dot_nrmf(wo, n);
        let fr: Float = fr_dielectric(cos_o, 1.0 as Float, self.index_of_refraction);
        if u[0] < fr {
            // specular reflection
            let n_ff: Normal3f = nrm_faceforward_vec3(n, wo);
            let wi: Vector3f = vec3_reflect(wo, &n_ff);
            let cos_theta: Float = vec3_dot_nrmf(&wi, &n_ff).abs();
            if cos_theta == 0.0 as Float {
                return None;
            }
            Some(BsdfSample {
                wi,
                f: self.specular_color * (fr / cos_theta),
                pdf: fr,
                specular: true,
            })
        } else {
            // specular transmission
            let entering: bool = cos_o > 0.0 as Float;
            let (eta_i, eta_t) = if entering {
                (1.0 as Float, self.index_of_refraction)
            } else {
                (self.index_of_refraction, 1.0 as Float)
            };
            let n_ff: Normal3f = nrm_faceforward_vec3(n, wo);
            let wi: Vector3f = refract(wo, &n_ff, eta_i / eta_t)?;
            let cos_theta: Float = vec3_dot_nrmf(&wi, &n_ff).abs();
            if cos_theta == 0.0 as Float {
                return None;
            }
            let ft: Float = 1.0 as Float - fr;
            Some(BsdfSample {
                wi,
                f: self.specular_color * (ft / cos_theta),
                pdf: ft,
                specular: true,
            })
        }
    }
}

fn same_hemisphere(wo: &Vector3f, wi: &Vector3f, n: &Normal3f) -> bool {
    vec3_dot_nrmf(wo, n) * vec3_dot_nrmf(wi, n) > 0.0 as Float
}

/// Refracted direction of *wi* through a surface with normal *n* on
/// the side of *wi*. `None` on total internal reflection.
pub fn refract(wi: &Vector3f, n: &Normal3f, eta: Float) -> Option<Vector3f> {
    // compute $\cos \theta_\roman{t}$ using Snell's law
    let cos_theta_i: Float = vec3_dot_nrmf(wi, n);
    let sin2_theta_i: Float = (0.0 as Float).max(1.0 as Float - cos_theta_i * cos_theta_i);
    let sin2_theta_t: Float = eta * eta * sin2_theta_i;
    // handle total internal reflection for transmission
    if sin2_theta_t >= 1.0 as Float {
        return None;
    }
    let cos_theta_t: Float = (1.0 as Float - sin2_theta_t).sqrt();
    Some(-(*wi) * eta + Vector3f::from(*n) * (eta * cos_theta_i - cos_theta_t))
}

/// Computes the Fresnel reflection formula for dielectric materials
/// and unpolarized light.
pub fn fr_dielectric(cos_theta_i: Float, eta_i: Float, eta_t: Float) -> Float {
    let mut cos_theta_i = clamp_t(cos_theta_i, -1.0, 1.0);
    // potentially swap indices of refraction
    let entering: bool = cos_theta_i > 0.0;
    let (eta_i, eta_t) = if entering { (eta_i, eta_t) } else { (eta_t, eta_i) };
    if !entering {
        cos_theta_i = cos_theta_i.abs();
    }
    // compute _cos_theta_t_ using Snell's law
    let sin_theta_i: Float = (0.0 as Float)
        .max(1.0 as Float - cos_theta_i * cos_theta_i)
        .sqrt();
    let sin_theta_t: Float = eta_i / eta_t * sin_theta_i;
    // handle total internal reflection
    if sin_theta_t >= 1.0 as Float {
        return 1.0 as Float;
    }
    let cos_theta_t: Float = (0.0 as Float)
        .max(1.0 as Float - sin_theta_t * sin_theta_t)
        .sqrt();
    let r_parl: Float = ((eta_t * cos_theta_i) - (eta_i * cos_theta_t))
        / ((eta_t * cos_theta_i) + (eta_i * cos_theta_t));
    let r_perp: Float = ((eta_i * cos_theta_i) - (eta_t * cos_theta_t))
        / ((eta_i * cos_theta_i) + (eta_t * cos_theta_t));
    (r_parl * r_parl + r_perp * r_perp) / 2.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn diffuse_sample_matches_evaluation() {
        let m = Material::diffuse(Spectrum::new(0.8));
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let wo = Vector3f::new(0.3, 0.0, 1.0).normalize();
        let s = m.sample_f(&wo, &n, &Point2f::new(0.3, 0.7)).unwrap();
        assert!(!s.specular);
        assert!(vec3_dot_nrmf(&s.wi, &n) > 0.0);
        assert!((m.pdf(&wo, &s.wi, &n) - s.pdf).abs() < 1e-4);
        assert_eq!(m.f(&wo, &s.wi, &n), s.f);
    }

    #[test]
    fn diffuse_works_from_the_back_side() {
        let m = Material::diffuse(Spectrum::new(0.8));
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let wo = Vector3f::new(0.0, 0.0, -1.0);
        let s = m.sample_f(&wo, &n, &Point2f::new(0.5, 0.2)).unwrap();
        assert!(vec3_dot_nrmf(&s.wi, &n) < 0.0);
    }

    #[test]
    fn mirror_reflects_and_is_delta() {
        let m = Material::mirror(Spectrum::new(1.0));
        assert!(m.is_specular());
        let n = Normal3f::new(0.0, 1.0, 0.0);
        let wo = Vector3f::new(1.0, 1.0, 0.0).normalize();
        let s = m.sample_f(&wo, &n, &Point2f::new(0.5, 0.5)).unwrap();
        assert!(s.specular);
        assert!((s.wi.x + wo.x).abs() < 1e-6);
        assert!(m.f(&wo, &s.wi, &n).is_black());
        assert_eq!(m.pdf(&wo, &s.wi, &n), 0.0);
    }

    #[test]
    fn glass_transmits_at_normal_incidence() {
        let m = Material::glass(Spectrum::new(1.0), 1.5);
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let wo = Vector3f::new(0.0, 0.0, 1.0);
        // reflectance at normal incidence is 0.04, u = 0.5 transmits
        let s = m.sample_f(&wo, &n, &Point2f::new(0.5, 0.5)).unwrap();
        assert!(s.wi.z < -0.999);
        let throughput = s.f * (vec3_dot_nrmf(&s.wi, &n).abs() / s.pdf);
        assert!((throughput.c[0] - 1.0).abs() < 1e-4);
        assert!((fr_dielectric(1.0, 1.0, 1.5) - 0.04).abs() < 1e-4);
    }

    #[test]
    fn emissive_radiance() {
        let m = Material::emissive(Spectrum::rgb(1.0, 0.5, 0.25), 4.0);
        assert!(m.is_emissive());
        assert_eq!(m.le(), Spectrum::rgb(4.0, 2.0, 1.0));
    }
}
