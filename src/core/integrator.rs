//! Per-path state and the direct lighting estimator.
//!
//! A **PathSegment** is the in-flight state of one camera path. The
//! wavefront stages in `integrators::wavefront` read and rewrite these
//! records bounce by bounce; **estimate_direct** is the light
//! transport core they call for explicit light sampling.

// wavefront
use crate::core::geometry::{pnt3_offset_ray_origin, vec3_abs_dot_nrmf};
use crate::core::geometry::{Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::light::{Light, LightSample};
use crate::core::material::{BsdfSample, Material};
use crate::core::pbrt::{Float, Spectrum};
use crate::core::sampling::power_heuristic;
use crate::core::scene::Scene;

#[derive(Debug, Copy, Clone)]
pub struct PathSegment {
    pub ray: Ray,
    /// throughput, the running product of `f * |cos| / pdf`
    pub color: Spectrum,
    /// radiance gathered while the path is still camera-visible
    pub direct: Spectrum,
    /// radiance gathered after the first non-specular bounce
    pub indirect: Spectrum,
    pub pixel_index: usize,
    /// geometry the ray starts on
    pub last_geom: Option<usize>,
    /// geometry hit one bounce before `last_geom`
    pub prev_geom: Option<usize>,
    pub remaining_bounces: u32,
    pub prev_bounce_no_mis: bool,
    pub prev_bounce_specular: bool,
    pub indirect_illum: bool,
}

impl PathSegment {
    pub fn new(pixel_index: usize) -> Self {
        PathSegment {
            ray: Ray::default(),
            color: Spectrum::new(1.0 as Float),
            direct: Spectrum::default(),
            indirect: Spectrum::default(),
            pixel_index,
            last_geom: None,
            prev_geom: None,
            remaining_bounces: 0_u32,
            prev_bounce_no_mis: true,
            prev_bounce_specular: true,
            indirect_illum: false,
        }
    }
    /// Start a fresh camera path along *ray*.
    pub fn reset(&mut self, ray: Ray, max_depth: u32) {
        self.ray = ray;
        self.color = Spectrum::new(1.0 as Float);
        self.direct = Spectrum::default();
        self.indirect = Spectrum::default();
        self.last_geom = None;
        self.prev_geom = None;
        self.remaining_bounces = max_depth;
        self.prev_bounce_no_mis = true;
        self.prev_bounce_specular = true;
        self.indirect_illum = false;
    }
    pub fn is_alive(&self) -> bool {
        self.remaining_bounces > 0
    }
    pub fn terminate(&mut self) {
        self.remaining_bounces = 0;
    }
    /// Add radiance to the accumulator of the current regime.
    pub fn add_radiance(&mut self, l: Spectrum) {
        if self.indirect_illum {
            self.indirect += l;
        } else {
            self.direct += l;
        }
    }
}

/// Surface point as seen by the shading stage.
#[derive(Debug, Copy, Clone)]
pub struct SurfaceHit {
    pub geom_id: usize,
    pub p: Point3f,
    pub geometric_normal: Normal3f,
    pub shading_normal: Normal3f,
    /// direction back towards the previous vertex
    pub wo: Vector3f,
}

/// Direct lighting from *light* at *hit*, combining one light sample
/// and one BSDF sample with the power heuristic. The caller divides by
/// the probability of having picked *light*.
pub fn estimate_direct(
    scene: &Scene,
    hit: &SurfaceHit,
    material: &Material,
    light: &Light,
    u_light: &Point2f,
    u_scattering: &Point2f,
) -> Spectrum {
    let mut ld: Spectrum = Spectrum::default();
    let light_geom = &scene.geoms[light.geom_id];
    // sample light source with multiple importance sampling
    if let Some(ls) = light.sample_li(light_geom, &hit.p, u_light) {
        let LightSample {
            wi,
            li,
            pdf: light_pdf,
            p_light,
            ..
        } = ls;
        // evaluate BSDF for light sampling strategy
        let f: Spectrum =
            material.f(&hit.wo, &wi, &hit.shading_normal) * vec3_abs_dot_nrmf(&wi, &hit.shading_normal);
        if !f.is_black() && !li.is_black() {
            let origin: Point3f = pnt3_offset_ray_origin(&hit.p, &hit.geometric_normal, &wi);
            if scene
                .aggregate
                .unoccluded(&scene.geoms, &origin, &p_light, Some(hit.geom_id))
            {
                let scattering_pdf: Float = material.pdf(&hit.wo, &wi, &hit.shading_normal);
                let weight: Float = power_heuristic(1_u8, light_pdf, 1_u8, scattering_pdf);
                ld += f * li * (weight / light_pdf);
            }
        }
    }
    // sample BSDF with multiple importance sampling
    if let Some(bs) = material.sample_f(&hit.wo, &hit.shading_normal, u_scattering) {
        let BsdfSample {
            wi,
            f,
            pdf: scattering_pdf,
            specular,
        } = bs;
        if specular {
            return ld;
        }
        let f: Spectrum = f * vec3_abs_dot_nrmf(&wi, &hit.shading_normal);
        let ray: Ray = Ray::spawn(&hit.p, &hit.geometric_normal, &wi);
        // add light contribution from material sampling
        if let Some(light_hit) = scene
            .aggregate
            .intersect(&scene.geoms, &ray, Some(hit.geom_id), None)
        {
            if light_hit.geom_id == light.geom_id {
                let (n_light, _) = light_geom.resolve_normals(&ray, light_hit.t, &light_hit.token);
                let p_light: Point3f = ray.position(light_hit.t);
                let light_pdf: Float = light.pdf_li(&hit.p, &p_light, &n_light, &wi);
                if light_pdf == 0.0 as Float {
                    return ld;
                }
                let weight: Float = power_heuristic(1_u8, scattering_pdf, 1_u8, light_pdf);
                ld += f * light.l() * (weight / scattering_pdf);
            }
        }
    }
    ld
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::material::Material;
    use crate::core::shape::{Geom, Sphere, Triangle};

    /// Diffuse floor (geom 0) under a small emissive quad (geoms 1, 2).
    fn floor_and_light(blocker: bool) -> Scene {
        let floor_material = 0;
        let light_material = 1;
        let mut geoms = vec![
            Geom::Triangle(Triangle {
                p: [
                    Point3f::new(-10.0, 0.0, -10.0),
                    Point3f::new(-10.0, 0.0, 10.0),
                    Point3f::new(10.0, 0.0, -10.0),
                ],
                n: None,
                material_id: floor_material,
            }),
            Geom::Triangle(Triangle {
                p: [
                    Point3f::new(-0.5, 2.0, -0.5),
                    Point3f::new(0.5, 2.0, -0.5),
                    Point3f::new(-0.5, 2.0, 0.5),
                ],
                n: None,
                material_id: light_material,
            }),
            Geom::Triangle(Triangle {
                p: [
                    Point3f::new(0.5, 2.0, 0.5),
                    Point3f::new(-0.5, 2.0, 0.5),
                    Point3f::new(0.5, 2.0, -0.5),
                ],
                n: None,
                material_id: light_material,
            }),
        ];
        if blocker {
            geoms.push(Geom::Sphere(Sphere {
                center: Point3f::new(0.0, 1.0, 0.0),
                radius: 0.5,
                material_id: floor_material,
            }));
        }
        let materials = vec![
            Material::diffuse(Spectrum::new(0.5)),
            Material::emissive(Spectrum::new(1.0), 10.0),
        ];
        Scene::new(geoms, materials).unwrap()
    }

    fn floor_hit() -> SurfaceHit {
        SurfaceHit {
            geom_id: 0,
            p: Point3f::new(0.0, 0.0, 0.0),
            geometric_normal: Normal3f::new(0.0, 1.0, 0.0),
            shading_normal: Normal3f::new(0.0, 1.0, 0.0),
            wo: Vector3f::new(0.0, 1.0, 0.0),
        }
    }

    #[test]
    fn path_reset_clears_state() {
        let mut path = PathSegment::new(42);
        path.direct = Spectrum::new(3.0);
        path.indirect_illum = true;
        path.prev_bounce_no_mis = false;
        path.reset(Ray::default(), 5);
        assert_eq!(path.pixel_index, 42);
        assert!(path.direct.is_black());
        assert_eq!(path.color, Spectrum::new(1.0));
        assert_eq!(path.remaining_bounces, 5);
        assert!(path.prev_bounce_no_mis && path.prev_bounce_specular && !path.indirect_illum);
        path.add_radiance(Spectrum::new(1.0));
        assert_eq!(path.direct, Spectrum::new(1.0));
    }

    #[test]
    fn lit_floor_receives_direct_light() {
        let scene = floor_and_light(false);
        assert_eq!(scene.lights.len(), 2);
        let hit = floor_hit();
        let material = scene.materials[0];
        let ld = estimate_direct(
            &scene,
            &hit,
            &material,
            &scene.lights[0],
            &Point2f::new(0.3, 0.4),
            &Point2f::new(0.5, 0.5),
        );
        assert!(ld.y() > 0.0);
        assert!(!ld.has_nans());
    }

    #[test]
    fn blocked_light_contributes_nothing() {
        let scene = floor_and_light(true);
        let hit = floor_hit();
        let material = scene.materials[0];
        for light in &scene.lights {
            let ld = estimate_direct(
                &scene,
                &hit,
                &material,
                light,
                &Point2f::new(0.3, 0.4),
                &Point2f::new(0.5, 0.5),
            );
            assert!(ld.is_black());
        }
    }
}
