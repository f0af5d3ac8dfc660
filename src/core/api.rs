//! The session interface of the renderer.
//!
//! A **RenderContext** owns every buffer of a render session: the
//! path and intersection arrays of the wavefront loop, the sample
//! pool, the accumulation film, the G-buffers and the denoiser
//! results. It is created by [RenderContext::init] and released by
//! [RenderContext::teardown]; all other operations borrow it.
//!
//! ```no_run
//! use rs_wavefront::core::api::{cornell_box, RenderConfig, RenderContext};
//! use rs_wavefront::core::display::BufferType;
//! use rs_wavefront::integrators::wavefront::MisMode;
//!
//! let (scene, camera) = cornell_box((64, 64)).unwrap();
//! let lights = scene.lights.len();
//! let mut ctx = RenderContext::init(scene, camera, RenderConfig::default()).unwrap();
//! for iteration in 1..=16 {
//!     ctx.render_iteration(0, iteration, MisMode::On, lights).unwrap();
//! }
//! let mut pixels = Vec::new();
//! ctx.readback(BufferType::Full, 16, &mut pixels).unwrap();
//! ctx.teardown();
//! ```

// others
use rayon::prelude::*;
use tracing::{debug, info};
// wavefront
use crate::core::camera::Camera;
use crate::core::display::{self, BufferBinding, BufferType, PresentationSurface, ToneMap};
use crate::core::error::{RenderError, Result};
use crate::core::film::{try_alloc, Film, GBuffer};
use crate::core::geometry::{Normal3f, Point3f, Vector3f};
use crate::core::integrator::PathSegment;
use crate::core::interaction::ShadeableIntersection;
use crate::core::material::Material;
use crate::core::parallel::{Stage, WorkQueue};
use crate::core::pbrt::{Float, Spectrum};
use crate::core::sampler::{SamplePool, StratifiedIndex};
use crate::core::scene::Scene;
use crate::core::shape::{Geom, Sphere, Triangle};
use crate::filters::atrous::{ATrousFilter, Guides};
use crate::integrators::wavefront::{self, MisMode, SampleSource, ShadingParams};

pub use crate::core::film::DenoiseCategory;

/// Largest accepted `pool_side`; the pool then holds 16M entries per
/// dimension.
pub const MAX_POOL_SIDE: u32 = 4096;

/// Options fixed for the lifetime of a session.
#[derive(Debug, Copy, Clone)]
pub struct RenderConfig {
    /// worker threads, 0 for all cores
    pub num_threads: usize,
    pub max_depth: u32,
    pub stratified_index: StratifiedIndex,
    pub sort_by_material: bool,
    /// reuse the depth-0 intersections of the first iteration
    pub cache_first_bounce: bool,
    pub jitter_pixels: bool,
    /// iterations between sample pool refreshes, 0 for never (used by
    /// the driver)
    pub sample_refresh_interval: u32,
    /// the sample pool holds `pool_side * pool_side` entries
    pub pool_side: u32,
    pub exposure: Float,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            num_threads: 0,
            max_depth: 8,
            stratified_index: StratifiedIndex::FullStratified,
            sort_by_material: false,
            cache_first_bounce: false,
            jitter_pixels: true,
            sample_refresh_interval: 0,
            pool_side: 16,
            exposure: 1.0 as Float,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self, camera: &Camera) -> Result<()> {
        let invalid = |msg: &str| Err(RenderError::InvalidConfig(msg.to_string()));
        if camera.resolution.0 == 0 || camera.resolution.1 == 0 {
            return invalid("resolution must be non-zero");
        }
        if self.max_depth == 0 {
            return invalid("max depth must be at least 1");
        }
        if self.pool_side == 0 || self.pool_side > MAX_POOL_SIDE {
            return invalid("sample pool side must be between 1 and 4096");
        }
        if !(self.exposure.is_finite() && self.exposure > 0.0 as Float) {
            return invalid("exposure must be positive");
        }
        if self.cache_first_bounce && (self.jitter_pixels || camera.lens_radius > 0.0 as Float) {
            return invalid("first bounce caching needs un-jittered pixels and a pinhole camera");
        }
        Ok(())
    }
}

/// Parameters of one denoiser run.
#[derive(Debug, Copy, Clone)]
pub struct DenoiseRequest {
    pub category: DenoiseCategory,
    pub levels: u32,
    /// filter footprint in pixels
    pub radius: Float,
    /// iterations accumulated so far
    pub iteration: u32,
    pub color_weight: Float,
    pub normal_weight: Float,
    pub position_weight: Float,
}

pub struct RenderContext {
    pub scene: Scene,
    pub camera: Camera,
    pub config: RenderConfig,
    queue: WorkQueue,
    film: Film,
    pool: SamplePool,
    paths: Vec<PathSegment>,
    intersections: Vec<ShadeableIntersection>,
    first_bounce: Option<Vec<ShadeableIntersection>>,
    /// active path count entering each depth of the last iteration
    active_counts: Vec<usize>,
}

impl RenderContext {
    /// Validate *config* and allocate all session buffers.
    pub fn init(scene: Scene, camera: Camera, config: RenderConfig) -> Result<Self> {
        config.validate(&camera)?;
        let queue: WorkQueue = WorkQueue::new(config.num_threads)?;
        let (width, height) = (camera.resolution.0 as usize, camera.resolution.1 as usize);
        let film: Film = Film::new(width, height)?;
        let n: usize = film.num_pixels();
        let mut paths: Vec<PathSegment> = try_alloc("paths", n, PathSegment::new(0))?;
        for (i, path) in paths.iter_mut().enumerate() {
            path.pixel_index = i;
        }
        let intersections: Vec<ShadeableIntersection> =
            try_alloc("intersections", n, ShadeableIntersection::miss())?;
        let pool: SamplePool = SamplePool::generate(config.pool_side, config.max_depth, 0);
        info!(
            width,
            height,
            threads = queue.num_threads(),
            max_depth = config.max_depth,
            stratified = %config.stratified_index,
            "render session initialized"
        );
        Ok(RenderContext {
            scene,
            camera,
            config,
            queue,
            film,
            pool,
            paths,
            intersections,
            first_bounce: None,
            active_counts: Vec::new(),
        })
    }
    pub fn width(&self) -> usize {
        self.film.width
    }
    pub fn height(&self) -> usize {
        self.film.height
    }
    pub fn film(&self) -> &Film {
        &self.film
    }
    pub fn num_threads(&self) -> usize {
        self.queue.num_threads()
    }
    pub fn active_counts(&self) -> &[usize] {
        &self.active_counts
    }
    /// Trace one sample per pixel and add it to the accumulation.
    /// Explicit light sampling picks among the first *light_count*
    /// lights of the scene.
    pub fn render_iteration(
        &mut self,
        frame: u32,
        iteration: u32,
        mis: MisMode,
        light_count: usize,
    ) -> Result<()> {
        let available: usize = self.scene.lights.len();
        if light_count > available {
            return Err(RenderError::LightCountMismatch {
                requested: light_count,
                available,
            });
        }
        let queue: &WorkQueue = &self.queue;
        let scene: &Scene = &self.scene;
        let camera: &Camera = &self.camera;
        let config: RenderConfig = self.config;
        let paths: &mut Vec<PathSegment> = &mut self.paths;
        let isects: &mut Vec<ShadeableIntersection> = &mut self.intersections;
        let first_bounce: &mut Option<Vec<ShadeableIntersection>> = &mut self.first_bounce;
        let active_counts: &mut Vec<usize> = &mut self.active_counts;
        let film: &mut Film = &mut self.film;
        let samples = SampleSource {
            pool: &self.pool,
            policy: config.stratified_index,
            iteration,
        };
        queue.issue(Stage::GenerateRays, || {
            wavefront::generate_rays(
                camera,
                &samples,
                config.jitter_pixels,
                config.max_depth,
                &mut paths[..],
            )
        })?;
        active_counts.clear();
        let mut active: usize = paths.len();
        let mut depth: u32 = 0;
        while active > 0 {
            active_counts.push(active);
            let cached: Option<&Vec<ShadeableIntersection>> = if depth == 0 {
                first_bounce.as_ref()
            } else {
                None
            };
            match cached {
                Some(cache) => isects[..active].copy_from_slice(cache),
                None => {
                    queue.issue(Stage::Intersect, || {
                        wavefront::compute_intersections(
                            scene,
                            &paths[..active],
                            &mut isects[..active],
                        )
                    })?;
                    if depth == 0 && config.cache_first_bounce {
                        let mut cache: Vec<ShadeableIntersection> =
                            try_alloc("first bounce cache", active, ShadeableIntersection::miss())?;
                        cache.copy_from_slice(&isects[..active]);
                        *first_bounce = Some(cache);
                    }
                }
            }
            if config.sort_by_material {
                queue.issue(Stage::SortByMaterial, || {
                    wavefront::sort_by_material(&mut paths[..active], &mut isects[..active])
                })?;
            }
            let params = ShadingParams {
                scene,
                samples,
                depth,
                mis,
                light_count,
            };
            queue.issue(Stage::Shade, || {
                wavefront::shade(&params, &mut paths[..active], &isects[..active])
            })?;
            active = queue.issue(Stage::Compact, || wavefront::compact(&mut paths[..], active))?;
            depth += 1;
            debug_assert!(depth <= config.max_depth);
        }
        queue.issue(Stage::FinalGather, || film.accumulate(&paths[..]))??;
        debug!(frame, iteration, depths = depth, "iteration done");
        Ok(())
    }
    /// Fill the G-buffers with pixel-centre first hits.
    pub fn prepare_denoiser(&mut self, iteration: u32) -> Result<()> {
        let n: usize = self.film.num_pixels();
        let mut normals: Vec<Normal3f> = try_alloc("normal G-buffer", n, Normal3f::default())?;
        let mut positions: Vec<Point3f> = try_alloc("position G-buffer", n, Point3f::default())?;
        let scene: &Scene = &self.scene;
        let camera: &Camera = &self.camera;
        self.queue.issue(Stage::GBuffer, || {
            wavefront::generate_gbuffer(scene, camera, &mut normals, &mut positions)
        })?;
        self.film.gbuffer = Some(GBuffer {
            normals,
            positions,
            iteration,
        });
        Ok(())
    }
    /// Filter one illumination category. The result replaces the
    /// previous filtered buffer of that category.
    pub fn denoise(&mut self, req: &DenoiseRequest) -> Result<()> {
        if !(req.radius >= 0.0 as Float
            && req.color_weight >= 0.0 as Float
            && req.normal_weight >= 0.0 as Float
            && req.position_weight >= 0.0 as Float)
        {
            return Err(RenderError::InvalidConfig(
                "denoiser radius and weights must be non-negative".to_string(),
            ));
        }
        if self.film.gbuffer.is_none() {
            self.prepare_denoiser(req.iteration)?;
        }
        let iteration: u32 = req.iteration.max(1);
        let film: &Film = &self.film;
        let variance: Vec<Float> = self.queue.issue(Stage::Variance, || {
            film.variance_buffer(req.category, iteration)
        })??;
        let (sum, _) = film.illum(req.category);
        let inv: Float = 1.0 as Float / iteration as Float;
        let mut mean: Vec<Spectrum> = try_alloc("denoiser input", sum.len(), Spectrum::default())?;
        mean.par_iter_mut()
            .zip(sum.par_iter())
            .for_each(|(m, s)| *m = *s * inv);
        let gbuffer: &GBuffer = film
            .gbuffer
            .as_ref()
            .ok_or(RenderError::BufferUnavailable(BufferType::Normal))?;
        let guides = Guides {
            variance: &variance,
            normals: &gbuffer.normals,
            positions: &gbuffer.positions,
        };
        let filter = ATrousFilter {
            levels: req.levels,
            radius: req.radius,
            color_weight: req.color_weight,
            normal_weight: req.normal_weight,
            position_weight: req.position_weight,
        };
        let (width, height) = (film.width, film.height);
        let filtered: Vec<Spectrum> = self
            .queue
            .issue(Stage::Denoise, || filter.filter(width, height, mean, &guides))??;
        debug!(category = %req.category, levels = req.levels, "denoised");
        self.film.set_filtered(req.category, filtered);
        Ok(())
    }
    pub fn select(&self, buffer: BufferType) -> Result<BufferBinding<'_>> {
        display::select(&self.film, buffer)
    }
    fn tone(&self, iteration: u32) -> ToneMap {
        ToneMap {
            iteration,
            exposure: self.config.exposure,
            bounds: self.scene.world_bound(),
        }
    }
    /// Tone map *buffer* into *surface*, which must match the film
    /// resolution.
    pub fn push_to_surface<S>(
        &self,
        surface: &mut S,
        buffer: BufferType,
        iteration: u32,
    ) -> Result<()>
    where
        S: PresentationSurface + Send + ?Sized,
    {
        let binding: BufferBinding = self.select(buffer)?;
        let tone: ToneMap = self.tone(iteration);
        let width: usize = self.film.width;
        self.queue.issue(Stage::ToneMap, || {
            display::push_to_surface(&binding, &tone, width, surface)
        })?
    }
    /// Tone-mapped floating point copy of *buffer*.
    pub fn readback(
        &self,
        buffer: BufferType,
        iteration: u32,
        out: &mut Vec<Spectrum>,
    ) -> Result<()> {
        let binding: BufferBinding = self.select(buffer)?;
        let tone: ToneMap = self.tone(iteration);
        self.queue
            .issue(Stage::ToneMap, || display::readback(&binding, &tone, out))?
    }
    pub fn refresh_samples(&mut self, generation: u64) {
        debug!(generation, "refresh sample pool");
        self.pool.refresh(generation);
    }
    /// Start accumulating from scratch.
    pub fn reset_accumulation(&mut self) {
        self.film.reset();
        self.first_bounce = None;
    }
    pub fn teardown(self) {
        info!(
            width = self.film.width,
            height = self.film.height,
            "render session released"
        );
    }
}

fn quad(a: Point3f, b: Point3f, c: Point3f, d: Point3f, material_id: usize) -> [Geom; 2] {
    [
        Geom::Triangle(Triangle {
            p: [a, b, c],
            n: None,
            material_id,
        }),
        Geom::Triangle(Triangle {
            p: [a, c, d],
            n: None,
            material_id,
        }),
    ]
}

/// A closed-back box with a ceiling light, a diffuse, a mirror and a
/// glass sphere, and a camera looking in through the open front.
pub fn cornell_box(resolution: (u32, u32)) -> Result<(Scene, Camera)> {
    let materials: Vec<Material> = vec![
        Material::diffuse(Spectrum::rgb(0.73, 0.73, 0.73)),
        Material::diffuse(Spectrum::rgb(0.65, 0.05, 0.05)),
        Material::diffuse(Spectrum::rgb(0.12, 0.45, 0.15)),
        Material::emissive(Spectrum::rgb(1.0, 0.85, 0.6), 12.0),
        Material::mirror(Spectrum::new(0.9)),
        Material::glass(Spectrum::new(1.0), 1.5),
    ];
    let p = Point3f::new;
    let mut geoms: Vec<Geom> = Vec::new();
    // floor, ceiling, back
    geoms.extend_from_slice(&quad(
        p(-1.0, 0.0, 1.0),
        p(1.0, 0.0, 1.0),
        p(1.0, 0.0, -1.0),
        p(-1.0, 0.0, -1.0),
        0,
    ));
    geoms.extend_from_slice(&quad(
        p(-1.0, 2.0, 1.0),
        p(-1.0, 2.0, -1.0),
        p(1.0, 2.0, -1.0),
        p(1.0, 2.0, 1.0),
        0,
    ));
    geoms.extend_from_slice(&quad(
        p(-1.0, 0.0, -1.0),
        p(1.0, 0.0, -1.0),
        p(1.0, 2.0, -1.0),
        p(-1.0, 2.0, -1.0),
        0,
    ));
    // left red, right green
    geoms.extend_from_slice(&quad(
        p(-1.0, 0.0, 1.0),
        p(-1.0, 0.0, -1.0),
        p(-1.0, 2.0, -1.0),
        p(-1.0, 2.0, 1.0),
        1,
    ));
    geoms.extend_from_slice(&quad(
        p(1.0, 0.0, -1.0),
        p(1.0, 0.0, 1.0),
        p(1.0, 2.0, 1.0),
        p(1.0, 2.0, -1.0),
        2,
    ));
    // light just below the ceiling
    geoms.extend_from_slice(&quad(
        p(-0.3, 1.98, -0.3),
        p(0.3, 1.98, -0.3),
        p(0.3, 1.98, 0.3),
        p(-0.3, 1.98, 0.3),
        3,
    ));
    geoms.push(Geom::Sphere(Sphere {
        center: p(-0.45, 0.35, -0.35),
        radius: 0.35,
        material_id: 0,
    }));
    geoms.push(Geom::Sphere(Sphere {
        center: p(0.45, 0.3, 0.2),
        radius: 0.3,
        material_id: 4,
    }));
    geoms.push(Geom::Sphere(Sphere {
        center: p(0.0, 0.9, 0.1),
        radius: 0.25,
        material_id: 5,
    }));
    let scene: Scene = Scene::new(geoms, materials)?;
    let camera: Camera = Camera::look_at(
        p(0.0, 1.0, 3.6),
        p(0.0, 1.0, 0.0),
        Vector3f::new(0.0, 1.0, 0.0),
        40.0,
        resolution,
        0.0,
        3.6,
    );
    Ok((scene, camera))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::pbrt::gamma_encode;

    fn single_sphere(material: Material, center_z: Float) -> (Scene, Camera) {
        let scene = Scene::new(
            vec![Geom::Sphere(Sphere {
                center: Point3f::new(0.0, 0.0, center_z),
                radius: 9.0,
                material_id: 0,
            })],
            vec![material],
        )
        .unwrap();
        let camera = Camera::look_at(
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.0, 0.0, -1.0),
            Vector3f::new(0.0, 1.0, 0.0),
            10.0,
            (4, 4),
            0.0,
            1.0,
        );
        (scene, camera)
    }

    fn config(num_threads: usize) -> RenderConfig {
        RenderConfig {
            num_threads,
            max_depth: 4,
            pool_side: 4,
            ..Default::default()
        }
    }

    fn render(ctx: &mut RenderContext, iterations: u32, mis: MisMode) {
        let lights = ctx.scene.lights.len();
        for iteration in 1..=iterations {
            ctx.render_iteration(0, iteration, mis, lights).unwrap();
        }
    }

    #[test]
    fn emissive_sphere_shows_its_emission() {
        let le = Spectrum::rgb(0.5, 0.25, 1.0);
        let (scene, camera) = single_sphere(Material::emissive(le, 1.0), -10.0);
        let cfg = RenderConfig {
            max_depth: 1,
            ..config(2)
        };
        let mut ctx = RenderContext::init(scene, camera, cfg).unwrap();
        ctx.render_iteration(0, 1, MisMode::On, 1).unwrap();
        for i in 0..16 {
            assert_eq!(ctx.film().direct_illum[i], le);
            assert!(ctx.film().indirect_illum[i].is_black());
        }
        let mut out = Vec::new();
        ctx.readback(BufferType::Full, 1, &mut out).unwrap();
        assert_eq!(out.len(), 16);
        for s in &out {
            for c in 0..3 {
                assert!((s.c[c] - gamma_encode(le.c[c])).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn all_miss_scene_stays_black() {
        // the only geometry is behind the camera
        let (scene, camera) = single_sphere(Material::diffuse(Spectrum::new(0.5)), 20.0);
        let mut ctx = RenderContext::init(scene, camera, config(2)).unwrap();
        render(&mut ctx, 3, MisMode::On);
        assert!(ctx.film().direct_illum.iter().all(|s| s.is_black()));
        assert!(ctx.film().indirect_illum.iter().all(|s| s.is_black()));
        assert!(ctx.film().direct_sqr.iter().all(|v| *v == 0.0));
        assert_eq!(ctx.active_counts(), &[16]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut sums = Vec::new();
        for threads in [1, 3].iter() {
            let (scene, camera) = cornell_box((12, 10)).unwrap();
            let mut ctx = RenderContext::init(scene, camera, config(*threads)).unwrap();
            render(&mut ctx, 3, MisMode::On);
            sums.push((
                ctx.film().direct_illum.clone(),
                ctx.film().indirect_illum.clone(),
                ctx.film().indirect_sqr.clone(),
            ));
        }
        assert_eq!(sums[0], sums[1]);
        assert!(sums[0].0.iter().any(|s| !s.is_black()));
    }

    #[test]
    fn active_paths_never_increase() {
        let (scene, camera) = cornell_box((8, 8)).unwrap();
        let mut ctx = RenderContext::init(scene, camera, config(2)).unwrap();
        render(&mut ctx, 2, MisMode::On);
        let counts = ctx.active_counts();
        assert_eq!(counts[0], 64);
        assert!(counts.len() <= 4);
        assert!(counts.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn material_sort_does_not_change_the_image() {
        let mut films = Vec::new();
        for sort in [false, true].iter() {
            let (scene, camera) = cornell_box((10, 8)).unwrap();
            let cfg = RenderConfig {
                sort_by_material: *sort,
                ..config(2)
            };
            let mut ctx = RenderContext::init(scene, camera, cfg).unwrap();
            render(&mut ctx, 2, MisMode::On);
            films.push((
                ctx.film().direct_illum.clone(),
                ctx.film().indirect_illum.clone(),
            ));
        }
        assert_eq!(films[0], films[1]);
    }

    #[test]
    fn first_bounce_cache_matches_tracing() {
        let mut films = Vec::new();
        for cache in [false, true].iter() {
            let (scene, camera) = cornell_box((8, 6)).unwrap();
            let cfg = RenderConfig {
                cache_first_bounce: *cache,
                jitter_pixels: false,
                ..config(2)
            };
            let mut ctx = RenderContext::init(scene, camera, cfg).unwrap();
            render(&mut ctx, 3, MisMode::Off);
            films.push(ctx.film().indirect_illum.clone());
        }
        assert_eq!(films[0], films[1]);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let (scene, camera) = cornell_box((4, 4)).unwrap();
        let cfg = RenderConfig {
            cache_first_bounce: true,
            ..config(1)
        };
        match RenderContext::init(scene, camera, cfg) {
            Err(RenderError::InvalidConfig(_)) => {}
            _ => panic!("caching with jittered pixels must be rejected"),
        }
        let (scene, camera) = cornell_box((4, 4)).unwrap();
        let cfg = RenderConfig {
            max_depth: 0,
            ..config(1)
        };
        assert!(RenderContext::init(scene, camera, cfg).is_err());
        // side * side would not fit a u32
        let (scene, camera) = cornell_box((4, 4)).unwrap();
        let cfg = RenderConfig {
            pool_side: 70_000,
            ..config(1)
        };
        match RenderContext::init(scene, camera, cfg) {
            Err(RenderError::InvalidConfig(_)) => {}
            _ => panic!("oversized sample pool must be rejected"),
        }
        let (_, camera) = cornell_box((4, 4)).unwrap();
        let cfg = RenderConfig {
            pool_side: MAX_POOL_SIDE,
            ..config(1)
        };
        assert!(cfg.validate(&camera).is_ok());
    }

    /// Diffuse floor (albedo 0.5) inside a large sphere of unit
    /// radiance, optionally with a brighter sphere beside the view. The
    /// camera looks straight down at a tiny patch around the origin.
    fn floor_under_dome(bright: Option<Float>) -> (Scene, Camera) {
        let p = Point3f::new;
        let mut materials = vec![
            Material::diffuse(Spectrum::new(0.5)),
            Material::emissive(Spectrum::new(1.0), 1.0),
        ];
        let mut geoms = vec![
            Geom::Triangle(Triangle {
                p: [p(-40.0, 0.0, -40.0), p(-40.0, 0.0, 80.0), p(80.0, 0.0, -40.0)],
                n: None,
                material_id: 0,
            }),
            Geom::Sphere(Sphere {
                center: p(0.0, 0.0, 0.0),
                radius: 100.0,
                material_id: 1,
            }),
        ];
        if let Some(le) = bright {
            materials.push(Material::emissive(Spectrum::new(1.0), le));
            geoms.push(Geom::Sphere(Sphere {
                center: p(1.2, 0.6, 0.0),
                radius: 0.5,
                material_id: 2,
            }));
        }
        let scene = Scene::new(geoms, materials).unwrap();
        let camera = Camera::look_at(
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 0.0),
            Vector3f::new(0.0, 0.0, 1.0),
            2.0,
            (8, 8),
            0.0,
            1.0,
        );
        (scene, camera)
    }

    /// Mean red radiance per pixel and sample.
    fn mean_radiance(ctx: &RenderContext, iterations: u32) -> Float {
        let film = ctx.film();
        let total: f64 = film
            .direct_illum
            .iter()
            .zip(film.indirect_illum.iter())
            .map(|(d, i)| (d.c[0] + i.c[0]) as f64)
            .sum();
        (total / (film.num_pixels() as f64 * iterations as f64)) as Float
    }

    fn converged(bright: Option<Float>, mis: MisMode, light_count: usize) -> Float {
        let iterations: u32 = 512;
        let (scene, camera) = floor_under_dome(bright);
        let cfg = RenderConfig {
            max_depth: 2,
            ..config(2)
        };
        let mut ctx = RenderContext::init(scene, camera, cfg).unwrap();
        for iteration in 1..=iterations {
            ctx.render_iteration(0, iteration, mis, light_count).unwrap();
        }
        mean_radiance(&ctx, iterations)
    }

    #[test]
    fn estimate_converges_to_closed_form_radiance() {
        // inside a uniform dome a diffuse surface reflects albedo * Le
        for mis in [MisMode::Off, MisMode::On].iter() {
            let mean = converged(None, *mis, 1);
            assert!((mean - 0.5).abs() < 0.01, "{:?}: {}", mis, mean);
        }
        // the bright sphere replaces part of the dome: with sin(a) = r / d
        // and the elevation cosine c the floor sees
        // albedo * (Le_dome + (Le_sphere - Le_dome) * sin(a)^2 * c)
        let d2: Float = 1.2 * 1.2 + 0.6 * 0.6;
        let expected: Float = 0.5 * (1.0 + 7.0 * (0.25 / d2) * (0.6 / d2.sqrt()));
        for mis in [MisMode::Off, MisMode::On].iter() {
            let mean = converged(Some(8.0), *mis, 2);
            assert!(
                (mean - expected).abs() < 0.03 * expected,
                "{:?}: {} vs {}",
                mis,
                mean,
                expected
            );
        }
    }

    #[test]
    fn lights_outside_the_sampled_subset_still_shine() {
        let all = converged(Some(8.0), MisMode::On, 2);
        let dome_only = converged(Some(8.0), MisMode::On, 1);
        let none = converged(Some(8.0), MisMode::On, 0);
        assert!((dome_only - all).abs() < 0.03 * all, "{} vs {}", dome_only, all);
        assert!((none - all).abs() < 0.03 * all, "{} vs {}", none, all);
    }

    #[test]
    fn light_count_is_checked() {
        let (scene, camera) = cornell_box((4, 4)).unwrap();
        let lights = scene.lights.len();
        assert_eq!(lights, 2);
        let mut ctx = RenderContext::init(scene, camera, config(1)).unwrap();
        match ctx.render_iteration(0, 1, MisMode::On, lights + 1) {
            Err(RenderError::LightCountMismatch {
                requested,
                available,
            }) => assert_eq!((requested, available), (3, 2)),
            _ => panic!("expected a light count mismatch"),
        }
        // a subset of the lights is fine
        ctx.render_iteration(0, 1, MisMode::On, 1).unwrap();
    }

    #[test]
    fn filtered_buffers_need_a_denoise_run() {
        let (scene, camera) = cornell_box((8, 8)).unwrap();
        let mut ctx = RenderContext::init(scene, camera, config(2)).unwrap();
        render(&mut ctx, 2, MisMode::On);
        match ctx.select(BufferType::FilteredFull) {
            Err(RenderError::BufferUnavailable(BufferType::FilteredFull)) => {}
            _ => panic!("filtered buffer must not be available yet"),
        }
        assert!(ctx.select(BufferType::Normal).is_err());
        for category in [DenoiseCategory::Direct, DenoiseCategory::Indirect].iter() {
            ctx.denoise(&DenoiseRequest {
                category: *category,
                levels: 2,
                radius: 8.0,
                iteration: 2,
                color_weight: 1.0,
                normal_weight: 0.5,
                position_weight: 0.5,
            })
            .unwrap();
        }
        assert!(ctx.select(BufferType::Normal).is_ok());
        let mut image = image::RgbaImage::new(8, 8);
        ctx.push_to_surface(&mut image, BufferType::FilteredFull, 2)
            .unwrap();
        let mut wrong = image::RgbaImage::new(4, 4);
        assert!(ctx
            .push_to_surface(&mut wrong, BufferType::Full, 2)
            .is_err());
        ctx.reset_accumulation();
        assert!(ctx.film().direct_illum.iter().all(|s| s.is_black()));
        ctx.teardown();
    }
}
