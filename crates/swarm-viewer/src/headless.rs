use anyhow::{Context, Result};
use swarm_engine::device::{HeadlessGpu, Offscreen, RenderSurface};
use swarm_engine::input::FrameInputs;
use swarm_engine::particles::SpriteImage;
use swarm_engine::shaders::ShaderSources;
use swarm_engine::{ParticleSystem, SimulationConfig};

/// Simulated refresh interval.
const FRAME_MS: f64 = 1000.0 / 60.0;
const TARGET_SIZE: (u32, u32) = (1280, 720);

/// Runs `frames` ticks against an offscreen target and logs a summary.
pub fn run(
    config: &SimulationConfig,
    sources: &ShaderSources,
    sprite: &SpriteImage,
    frames: u32,
) -> Result<()> {
    let gpu = HeadlessGpu::request()?;
    let (device, queue) = (gpu.device(), gpu.queue());
    let mut target = Offscreen::new(device, TARGET_SIZE.0, TARGET_SIZE.1);

    let mut system = ParticleSystem::new(device, queue, target.format(), config, sources, sprite)
        .context("failed to build the particle system")?;

    for frame in 0..frames {
        let report = system.tick(
            device,
            queue,
            &mut target,
            frame as f64 * FRAME_MS,
            FrameInputs::default(),
        )?;
        log::trace!("{report:?}");
    }

    let particles = system.read_particles(device, queue)?;
    let count = particles.len().max(1) as f32;
    let mean_speed = particles.iter().map(|p| p.speed()).sum::<f32>() / count;
    let (min, max) = particles.iter().fold(
        ([f32::MAX; 2], [f32::MIN; 2]),
        |(lo, hi), p| {
            (
                [lo[0].min(p.position[0]), lo[1].min(p.position[1])],
                [hi[0].max(p.position[0]), hi[1].max(p.position[1])],
            )
        },
    );
    let (min_speed, max_speed) = system.state().speed_bounds();
    log::info!(
        "{frames} ticks, {:.1} s simulated: mean speed {mean_speed:.1} (bounds {min_speed}..{max_speed}), extent {min:?}..{max:?}",
        system.state().elapsed_ms() / 1000.0
    );
    Ok(())
}
