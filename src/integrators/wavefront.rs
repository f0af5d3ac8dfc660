//! The stages of one wavefront path tracing iteration.
//!
//! Each function is one data-parallel pass over pixels or over the
//! active prefix of the path array. None of them synchronizes
//! internally; the caller issues them one after the other (see
//! `core::api::RenderContext::render_iteration`).

// others
use rayon::prelude::*;
// wavefront
use crate::core::camera::Camera;
use crate::core::geometry::{vec3_abs_dot_nrmf, Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::integrator::{estimate_direct, PathSegment, SurfaceHit};
use crate::core::interaction::ShadeableIntersection;
use crate::core::material::Material;
use crate::core::pbrt::{Float, Spectrum};
use crate::core::rng::Rng;
use crate::core::sampler::{jitter_sample, IntersectionSample, SamplePool, StratifiedIndex};
use crate::core::scene::Scene;

/// Whether shading adds explicit light samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MisMode {
    Off,
    On,
}

/// Read-only inputs of the per-pixel sampling decisions.
#[derive(Copy, Clone)]
pub struct SampleSource<'a> {
    pub pool: &'a SamplePool,
    pub policy: StratifiedIndex,
    pub iteration: u32,
}

impl<'a> SampleSource<'a> {
    fn index(&self, pixel_index: usize) -> usize {
        self.policy.index(self.iteration, pixel_index, self.pool.len())
    }
}

/// Random stream for ray generation of a pixel.
fn camera_rng(iteration: u32, pixel_index: usize) -> Rng {
    Rng::for_path(iteration, pixel_index, 0)
}

/// Random stream for shading a path at *depth*.
fn shading_rng(iteration: u32, pixel_index: usize, depth: u32) -> Rng {
    Rng::for_path(iteration, pixel_index, depth + 1)
}

/// Start one camera path per pixel. Slot *i* of `paths` becomes the
/// path of pixel *i*.
pub fn generate_rays(
    camera: &Camera,
    samples: &SampleSource,
    jitter_pixels: bool,
    max_depth: u32,
    paths: &mut [PathSegment],
) {
    let cell_width: Float = samples.pool.cell_width();
    paths.par_iter_mut().enumerate().for_each(|(pixel_index, path)| {
        let (x, y) = camera.pixel_coords(pixel_index);
        let sample = samples.pool.camera_sample(samples.index(pixel_index));
        let ray: Ray = if jitter_pixels {
            let mut rng: Rng = camera_rng(samples.iteration, pixel_index);
            let film: Point2f = jitter_sample(&sample.pixel, cell_width, &mut rng);
            let lens: Point2f = jitter_sample(&sample.lens, cell_width, &mut rng);
            camera.generate_ray(x, y, &film, &lens)
        } else {
            camera.generate_ray(x, y, &Point2f { x: 0.5, y: 0.5 }, &sample.lens)
        };
        path.pixel_index = pixel_index;
        path.reset(ray, max_depth);
    });
}

/// Nearest hit for every active path.
pub fn compute_intersections(
    scene: &Scene,
    paths: &[PathSegment],
    isects: &mut [ShadeableIntersection],
) {
    isects
        .par_iter_mut()
        .zip(paths.par_iter())
        .for_each(|(isect, path)| {
            *isect = match scene.aggregate.intersect(
                &scene.geoms,
                &path.ray,
                path.last_geom,
                path.prev_geom,
            ) {
                Some(hit) => {
                    let geom = &scene.geoms[hit.geom_id];
                    let (geometric_normal, shading_normal) =
                        geom.resolve_normals(&path.ray, hit.t, &hit.token);
                    ShadeableIntersection {
                        t: hit.t,
                        material_id: Some(geom.material_id()),
                        geom_id: Some(hit.geom_id),
                        geometric_normal,
                        shading_normal,
                    }
                }
                None => ShadeableIntersection::miss(),
            };
        });
}

/// Reorder the active paths and their intersections by material. Key,
/// intersection and path move together as one record.
pub fn sort_by_material(paths: &mut [PathSegment], isects: &mut [ShadeableIntersection]) {
    let mut records: Vec<(usize, ShadeableIntersection, PathSegment)> = isects
        .par_iter()
        .zip(paths.par_iter())
        .map(|(isect, path)| (isect.material_key(), *isect, *path))
        .collect();
    // stable
    records.par_sort_by_key(|record| record.0);
    records
        .into_par_iter()
        .zip(isects.par_iter_mut().zip(paths.par_iter_mut()))
        .for_each(|((_, isect, path), (isect_slot, path_slot))| {
            *isect_slot = isect;
            *path_slot = path;
        });
}

/// Everything the shading stage reads besides the paths.
#[derive(Copy, Clone)]
pub struct ShadingParams<'a> {
    pub scene: &'a Scene,
    pub samples: SampleSource<'a>,
    pub depth: u32,
    pub mis: MisMode,
    /// lights eligible for explicit sampling (a prefix of the scene's
    /// light list)
    pub light_count: usize,
}

/// Shade every active path at its intersection.
pub fn shade(params: &ShadingParams, paths: &mut [PathSegment], isects: &[ShadeableIntersection]) {
    let slice: &[IntersectionSample] = params.samples.pool.intersection_slice(params.depth);
    let cell_width: Float = params.samples.pool.cell_width();
    paths
        .par_iter_mut()
        .zip(isects.par_iter())
        .for_each(|(path, isect)| {
            let sample: &IntersectionSample = &slice[params.samples.index(path.pixel_index)];
            let mut rng: Rng =
                shading_rng(params.samples.iteration, path.pixel_index, params.depth);
            let u = ShadingSample {
                scatter: jitter_sample(&sample.scatter, cell_width, &mut rng),
                light: jitter_sample(&sample.light, cell_width, &mut rng),
                scatter_mis: jitter_sample(&sample.scatter_mis, cell_width, &mut rng),
                light_choice: rng.uniform_float(),
            };
            shade_path(params, path, isect, &u);
        });
}

struct ShadingSample {
    scatter: Point2f,
    light: Point2f,
    scatter_mis: Point2f,
    light_choice: Float,
}

fn shade_path(
    params: &ShadingParams,
    path: &mut PathSegment,
    isect: &ShadeableIntersection,
    u: &ShadingSample,
) {
    let (material_id, geom_id) = match (isect.material_id, isect.geom_id) {
        (Some(material_id), Some(geom_id)) if isect.is_hit() => (material_id, geom_id),
        _ => {
            // left the scene
            path.color = Spectrum::default();
            path.terminate();
            return;
        }
    };
    let scene: &Scene = params.scene;
    let material: &Material = &scene.materials[material_id];
    if material.is_emissive() {
        // lights outside the sampled prefix are only ever found by
        // scattering
        if path.prev_bounce_no_mis || !scene.is_sampled_light(geom_id, params.light_count) {
            let le: Spectrum = path.color * material.le();
            path.add_radiance(le);
        }
        path.terminate();
        return;
    }
    let mis_active: bool = params.mis == MisMode::On && params.light_count > 0;
    let p: Point3f = path.ray.position(isect.t);
    let wo: Vector3f = -path.ray.d;
    let hit = SurfaceHit {
        geom_id,
        p,
        geometric_normal: isect.geometric_normal,
        shading_normal: isect.shading_normal,
        wo,
    };
    if mis_active && !material.is_specular() {
        // pick one light uniformly, divide by its probability
        let n: usize = params.light_count;
        let light_index: usize = ((u.light_choice * n as Float) as usize).min(n - 1);
        let ld: Spectrum = estimate_direct(
            scene,
            &hit,
            material,
            &scene.lights[light_index],
            &u.light,
            &u.scatter_mis,
        );
        let contribution: Spectrum = path.color * ld * n as Float;
        path.add_radiance(contribution);
    }
    let bs = match material.sample_f(&wo, &isect.shading_normal, &u.scatter) {
        Some(bs) => bs,
        None => {
            path.terminate();
            return;
        }
    };
    let shading_normal: Normal3f = isect.shading_normal;
    path.color *= bs.f * (vec3_abs_dot_nrmf(&bs.wi, &shading_normal) / bs.pdf);
    path.ray = Ray::spawn(&p, &isect.geometric_normal, &bs.wi);
    path.prev_geom = path.last_geom;
    path.last_geom = Some(geom_id);
    path.prev_bounce_specular = bs.specular;
    path.prev_bounce_no_mis = bs.specular || !mis_active;
    if !bs.specular {
        path.indirect_illum = true;
    }
    path.remaining_bounces -= 1;
}

/// Stable partition of `paths[..active]` so that live paths form the
/// prefix. Returns the new active count.
pub fn compact(paths: &mut [PathSegment], active: usize) -> usize {
    let (alive, dead): (Vec<PathSegment>, Vec<PathSegment>) =
        paths[..active].par_iter().copied().partition(|path| path.is_alive());
    let n_alive: usize = alive.len();
    paths[..n_alive].copy_from_slice(&alive);
    paths[n_alive..active].copy_from_slice(&dead);
    n_alive
}

/// First-hit shading normal and position through each pixel centre.
/// Misses store zero for both.
pub fn generate_gbuffer(
    scene: &Scene,
    camera: &Camera,
    normals: &mut [Normal3f],
    positions: &mut [Point3f],
) {
    normals
        .par_iter_mut()
        .zip(positions.par_iter_mut())
        .enumerate()
        .for_each(|(pixel_index, (normal, position))| {
            let (x, y) = camera.pixel_coords(pixel_index);
            let ray: Ray = camera.generate_center_ray(x, y);
            match scene.aggregate.intersect(&scene.geoms, &ray, None, None) {
                Some(hit) => {
                    let (_, ns) =
                        scene.geoms[hit.geom_id].resolve_normals(&ray, hit.t, &hit.token);
                    *normal = ns;
                    *position = ray.position(hit.t);
                }
                None => {
                    *normal = Normal3f::default();
                    *position = Point3f::default();
                }
            }
        });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::material::Material;
    use crate::core::shape::{Geom, Sphere};

    fn sphere_scene(material: Material) -> Scene {
        Scene::new(
            vec![Geom::Sphere(Sphere {
                center: Point3f::new(0.0, 0.0, -5.0),
                radius: 1.0,
                material_id: 0,
            })],
            vec![material],
        )
        .unwrap()
    }

    fn ray_at_sphere() -> Ray {
        Ray::new(Point3f::new(0.0, 0.0, 0.0), Vector3f::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn compaction_is_a_stable_partition() {
        let mut paths: Vec<PathSegment> = (0..10)
            .map(|i| {
                let mut p = PathSegment::new(i);
                p.remaining_bounces = if i % 3 == 0 { 0 } else { 2 };
                p
            })
            .collect();
        let active = compact(&mut paths, 10);
        assert_eq!(active, 6);
        let order: Vec<usize> = paths.iter().map(|p| p.pixel_index).collect();
        assert_eq!(order, vec![1, 2, 4, 5, 7, 8, 0, 3, 6, 9]);
        // only the prefix is touched
        let active = compact(&mut paths, 3);
        assert_eq!(active, 3);
    }

    #[test]
    fn sort_keeps_records_together() {
        let mut paths: Vec<PathSegment> = (0..6).map(PathSegment::new).collect();
        let mut isects: Vec<ShadeableIntersection> = (0..6)
            .map(|i| {
                let mut isect = ShadeableIntersection::miss();
                if i % 2 == 0 {
                    isect.t = i as Float;
                    isect.material_id = Some(2 - i / 2);
                    isect.geom_id = Some(i);
                }
                isect
            })
            .collect();
        sort_by_material(&mut paths, &mut isects);
        let keys: Vec<usize> = isects.iter().map(|i| i.material_key()).collect();
        assert_eq!(keys[..3], [0, 1, 2]);
        for (path, isect) in paths.iter().zip(isects.iter()) {
            assert_eq!(isect.geom_id.unwrap_or(path.pixel_index), path.pixel_index);
        }
        // misses keep their relative order at the end
        let tail: Vec<usize> = paths[3..].iter().map(|p| p.pixel_index).collect();
        assert_eq!(tail, vec![1, 3, 5]);
    }

    #[test]
    fn intersection_stage_records_hits_and_misses() {
        let scene = sphere_scene(Material::diffuse(Spectrum::new(0.5)));
        let mut hit_path = PathSegment::new(0);
        hit_path.reset(ray_at_sphere(), 3);
        let mut miss_path = PathSegment::new(1);
        miss_path.reset(
            Ray::new(Point3f::new(0.0, 0.0, 0.0), Vector3f::new(0.0, 1.0, 0.0)),
            3,
        );
        let paths = vec![hit_path, miss_path];
        let mut isects = vec![ShadeableIntersection::default(); 2];
        compute_intersections(&scene, &paths, &mut isects);
        assert!((isects[0].t - 4.0).abs() < 1e-5);
        assert_eq!(isects[0].material_id, Some(0));
        assert!((isects[0].shading_normal.z - 1.0).abs() < 1e-5);
        assert!(!isects[1].is_hit());
        assert_eq!(isects[1].t, -1.0);
    }

    #[test]
    fn emissive_hit_adds_radiance_and_terminates() {
        let scene = sphere_scene(Material::emissive(Spectrum::rgb(1.0, 0.5, 0.25), 2.0));
        let pool = SamplePool::generate(2, 1, 0);
        let params = ShadingParams {
            scene: &scene,
            samples: SampleSource {
                pool: &pool,
                policy: StratifiedIndex::FullStratified,
                iteration: 1,
            },
            depth: 0,
            mis: MisMode::On,
            light_count: 1,
        };
        let mut paths = vec![PathSegment::new(0)];
        paths[0].reset(ray_at_sphere(), 1);
        let mut isects = vec![ShadeableIntersection::default()];
        compute_intersections(&scene, &paths, &mut isects);
        shade(&params, &mut paths, &isects);
        assert_eq!(paths[0].direct, Spectrum::rgb(2.0, 1.0, 0.5));
        assert!(paths[0].indirect.is_black());
        assert_eq!(paths[0].remaining_bounces, 0);
    }

    #[test]
    fn emission_after_light_sampling_counts_only_for_unsampled_lights() {
        let scene = sphere_scene(Material::emissive(Spectrum::new(1.0), 3.0));
        let pool = SamplePool::generate(2, 2, 0);
        for (light_count, expected) in [(1_usize, 0.0 as Float), (0, 1.5)].iter() {
            let params = ShadingParams {
                scene: &scene,
                samples: SampleSource {
                    pool: &pool,
                    policy: StratifiedIndex::FullStratified,
                    iteration: 1,
                },
                depth: 1,
                mis: MisMode::On,
                light_count: *light_count,
            };
            // a path that already took a light sample at its last vertex
            let mut paths = vec![PathSegment::new(0)];
            paths[0].reset(ray_at_sphere(), 2);
            paths[0].color = Spectrum::new(0.5);
            paths[0].prev_bounce_no_mis = false;
            paths[0].prev_bounce_specular = false;
            paths[0].indirect_illum = true;
            let mut isects = vec![ShadeableIntersection::default()];
            compute_intersections(&scene, &paths, &mut isects);
            shade(&params, &mut paths, &isects);
            assert_eq!(paths[0].indirect, Spectrum::new(*expected));
            assert!(!paths[0].is_alive());
        }
    }

    #[test]
    fn diffuse_bounce_updates_flags() {
        let scene = sphere_scene(Material::diffuse(Spectrum::new(0.5)));
        let pool = SamplePool::generate(2, 2, 0);
        let params = ShadingParams {
            scene: &scene,
            samples: SampleSource {
                pool: &pool,
                policy: StratifiedIndex::Splatting,
                iteration: 0,
            },
            depth: 0,
            mis: MisMode::On,
            light_count: 0,
        };
        let mut paths = vec![PathSegment::new(0)];
        paths[0].reset(ray_at_sphere(), 2);
        let mut isects = vec![ShadeableIntersection::default()];
        compute_intersections(&scene, &paths, &mut isects);
        shade(&params, &mut paths, &isects);
        let path = &paths[0];
        assert_eq!(path.remaining_bounces, 1);
        assert!(path.indirect_illum);
        assert!(!path.prev_bounce_specular);
        // no lights to sample, so emission found by scattering counts
        assert!(path.prev_bounce_no_mis);
        assert_eq!(path.last_geom, Some(0));
        assert!(path.ray.d.z > 0.0);
        assert!(path.color.y() > 0.0);
    }
}
