//! Composition root: builds programs, state and stepper in dependency order.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::SimulationConfig;
use crate::device::{RenderSurface, scoped};
use crate::error::{SimError, SimResult};
use crate::input::FrameInputs;
use crate::particles::{
    NoiseTexture, ParticleRecord, ParticleStateStore, Slot, SpriteImage, SpriteTexture,
    seed_particles,
};
use crate::program::{Program, ProgramBuilder, StageKind, StageSource};
use crate::shaders::{self, ShaderSources};
use crate::sim::{SimulationState, SimulationStepper, TickReport};

/// One particle simulation: its device state plus the stepper that drives it.
///
/// Several systems may share a device; nothing here is global.
pub struct ParticleSystem {
    store: ParticleStateStore,
    stepper: SimulationStepper,
}

impl ParticleSystem {
    /// Validates `config`, then compiles, seeds and binds everything.
    ///
    /// Any failure drops whatever was built before it.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        config: &SimulationConfig,
        sources: &ShaderSources,
        sprite: &SpriteImage,
    ) -> SimResult<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (update, render) = compile_programs(device, sources)?;
        let seeds = seed_particles(config, &mut rng);
        let store = scoped(
            device,
            |e| SimError::layout("particle state", e),
            || ParticleStateStore::initialize(device, &seeds, &update, &render),
        )?;

        let (noise, sprite) = scoped(
            device,
            |e| SimError::DeviceCapability(format!("texture upload failed: {e}")),
            || {
                Ok((
                    NoiseTexture::new(device, queue, &mut rng),
                    SpriteTexture::new(device, queue, sprite),
                ))
            },
        )?;
        let stepper = scoped(
            device,
            |e| SimError::layout("particle passes", e),
            || {
                SimulationStepper::new(
                    device,
                    config,
                    &store,
                    (&update, &render),
                    target_format,
                    &noise,
                    &sprite,
                )
            },
        )?;

        log::info!(
            "particle system ready: {} particles, speed {}..{}",
            config.particle_count,
            config.min_speed,
            config.max_speed
        );
        Ok(Self { store, stepper })
    }

    /// Runs one update + render + swap. See [`SimulationStepper::tick`].
    pub fn tick(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &mut dyn RenderSurface,
        timestamp_ms: f64,
        inputs: FrameInputs,
    ) -> SimResult<TickReport> {
        self.stepper
            .tick(device, queue, &self.store, target, timestamp_ms, inputs)
    }

    pub fn state(&self) -> &SimulationState {
        self.stepper.state()
    }

    pub fn store(&self) -> &ParticleStateStore {
        &self.store
    }

    /// Reads back the buffer the next tick will read, i.e. the latest state.
    pub fn read_particles(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> SimResult<Vec<ParticleRecord>> {
        self.read_slot(device, queue, self.state().roles().read())
    }

    pub fn read_slot(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: Slot,
    ) -> SimResult<Vec<ParticleRecord>> {
        self.store.read_back(device, queue, slot)
    }
}

/// Compiles the update program (with its captured outputs) and the render program.
pub fn compile_programs(
    device: &wgpu::Device,
    sources: &ShaderSources,
) -> SimResult<(Program, Program)> {
    let builder = ProgramBuilder::new(device);
    let update = builder.compile_program(
        "particle update",
        &[StageSource::new(
            shaders::UPDATE,
            StageKind::Compute,
            sources.update.clone(),
        )],
        Some(shaders::CAPTURED_OUTPUTS.as_slice()),
    )?;
    let render = builder.compile_program(
        "particle render",
        &[
            StageSource::new(
                shaders::RENDER_VERT,
                StageKind::Vertex,
                sources.render_vertex.clone(),
            ),
            StageSource::new(
                shaders::RENDER_FRAG,
                StageKind::Fragment,
                sources.render_fragment.clone(),
            ),
        ],
        None,
    )?;
    Ok((update, render))
}
