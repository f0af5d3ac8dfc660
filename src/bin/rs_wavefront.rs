// std
use std::error::Error;
use std::path::PathBuf;
// others
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
// wavefront
use rs_wavefront::core::api::{
    cornell_box, DenoiseCategory, DenoiseRequest, RenderConfig, RenderContext,
};
use rs_wavefront::core::display::BufferType;
use rs_wavefront::core::error::RenderError;
use rs_wavefront::core::pbrt::Float;
use rs_wavefront::core::sampler::StratifiedIndex;
use rs_wavefront::integrators::wavefront::MisMode;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Render the built-in box scene with the wavefront path tracer and
/// write one of its buffers as PNG.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// image width in pixels
    #[arg(long, default_value_t = 256)]
    width: u32,
    /// image height in pixels
    #[arg(long, default_value_t = 256)]
    height: u32,
    /// number of accumulated samples per pixel
    #[arg(short = 'i', long, default_value_t = 64)]
    iterations: u32,
    /// maximum number of bounces
    #[arg(short = 'd', long, default_value_t = 8)]
    depth: u32,
    /// use specified number of threads for rendering (0 = all cores)
    #[arg(short = 't', long, default_value_t = 0)]
    threads: usize,
    /// disable explicit light sampling
    #[arg(long)]
    no_mis: bool,
    /// sort active paths by material before shading
    #[arg(long)]
    sort_materials: bool,
    /// sample index policy (splatting or full)
    #[arg(long, default_value = "full")]
    stratified: StratifiedIndex,
    /// the sample pool holds side * side entries
    #[arg(long, default_value_t = 16)]
    pool_side: u32,
    /// iterations between sample pool refreshes (0 = never)
    #[arg(long, default_value_t = 0)]
    refresh_interval: u32,
    /// run the A-trous denoiser on both illumination categories
    #[arg(long)]
    denoise: bool,
    /// denoiser levels
    #[arg(long, default_value_t = 5)]
    levels: u32,
    /// denoiser footprint in pixels
    #[arg(long, default_value_t = 32.0)]
    radius: Float,
    #[arg(long, default_value_t = 1.0)]
    color_weight: Float,
    #[arg(long, default_value_t = 0.35)]
    normal_weight: Float,
    #[arg(long, default_value_t = 0.2)]
    position_weight: Float,
    /// buffer to write, e.g. full, filtered-full, direct-variance
    #[arg(long, default_value = "full")]
    buffer: String,
    /// PNG file to write
    #[arg(short = 'o', long, default_value = "wavefront.png")]
    output: PathBuf,
}

fn run(args: &Cli) -> Result<(), Box<dyn Error>> {
    let buffer: BufferType = BufferType::parse(&args.buffer)?;
    let (scene, camera) = cornell_box((args.width, args.height))?;
    let light_count: usize = scene.lights.len();
    let config = RenderConfig {
        num_threads: args.threads,
        max_depth: args.depth,
        stratified_index: args.stratified,
        sort_by_material: args.sort_materials,
        sample_refresh_interval: args.refresh_interval,
        pool_side: args.pool_side,
        ..Default::default()
    };
    let mis: MisMode = if args.no_mis { MisMode::Off } else { MisMode::On };
    let mut ctx: RenderContext = RenderContext::init(scene, camera, config)?;
    info!(
        version = VERSION,
        threads = ctx.num_threads(),
        lights = light_count,
        "rendering"
    );
    let mut generation: u64 = 0;
    for iteration in pbr::PbIter::new(1..=args.iterations) {
        let interval: u32 = ctx.config.sample_refresh_interval;
        if interval > 0 && iteration > 1 && (iteration - 1) % interval == 0 {
            generation += 1;
            ctx.refresh_samples(generation);
        }
        ctx.render_iteration(0, iteration, mis, light_count)?;
    }
    if args.denoise {
        for category in [DenoiseCategory::Direct, DenoiseCategory::Indirect].iter() {
            ctx.denoise(&DenoiseRequest {
                category: *category,
                levels: args.levels,
                radius: args.radius,
                iteration: args.iterations,
                color_weight: args.color_weight,
                normal_weight: args.normal_weight,
                position_weight: args.position_weight,
            })?;
        }
    } else if matches!(buffer, BufferType::Normal | BufferType::Position) {
        ctx.prepare_denoiser(args.iterations)?;
    }
    let mut image = image::RgbaImage::new(ctx.width() as u32, ctx.height() as u32);
    ctx.push_to_surface(&mut image, buffer, args.iterations)?;
    image.save(&args.output)?;
    info!(output = %args.output.display(), %buffer, "image written");
    ctx.teardown();
    Ok(())
}

fn main() {
    let args = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if let Err(e) = run(&args) {
        match e.downcast_ref::<RenderError>() {
            Some(render_error) if !render_error.is_fatal() => {
                error!(error = %render_error, "request rejected")
            }
            _ => error!(error = %e, "render failed"),
        }
        std::process::exit(1);
    }
}
