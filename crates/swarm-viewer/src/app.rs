use swarm_engine::core::{App, AppControl, FrameCtx};
use swarm_engine::device::RenderSurface;
use swarm_engine::particles::SpriteImage;
use swarm_engine::shaders::ShaderSources;
use swarm_engine::{ParticleSystem, SimError, SimulationConfig};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Ticks between progress lines in the log.
const REPORT_EVERY: u64 = 600;

struct Running {
    device: wgpu::Device,
    queue: wgpu::Queue,
    system: ParticleSystem,
}

/// Drives one particle system inside the window runtime.
pub struct ViewerApp {
    config: SimulationConfig,
    sources: ShaderSources,
    sprite: SpriteImage,
    running: Option<Running>,
    /// Set when the simulation stopped on an error.
    pub failure: Option<SimError>,
}

impl ViewerApp {
    pub fn new(config: SimulationConfig, sources: ShaderSources, sprite: SpriteImage) -> Self {
        Self {
            config,
            sources,
            sprite,
            running: None,
            failure: None,
        }
    }

    /// Builds the system on the first frame, once the device exists.
    fn ensure_running(&mut self, ctx: &FrameCtx<'_, '_>) -> Result<(), SimError> {
        if self.running.is_some() {
            return Ok(());
        }
        let device = ctx.gpu.device().clone();
        let queue = ctx.gpu.queue().clone();
        let system = ParticleSystem::new(
            &device,
            &queue,
            ctx.gpu.format(),
            &self.config,
            &self.sources,
            &self.sprite,
        )?;
        self.running = Some(Running {
            device,
            queue,
            system,
        });
        Ok(())
    }
}

impl App for ViewerApp {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if let Err(err) = self.ensure_running(ctx) {
            log::error!("{err}");
            self.failure = Some(err);
            return AppControl::Exit;
        }
        let Some(run) = self.running.as_mut() else {
            return AppControl::Exit;
        };

        match run.system.tick(
            &run.device,
            &run.queue,
            &mut *ctx.gpu,
            ctx.time.timestamp_ms,
            ctx.inputs,
        ) {
            Ok(report) => {
                if report.tick % REPORT_EVERY == 0 {
                    log::info!(
                        "tick {}: {:.1} s simulated",
                        report.tick,
                        run.system.state().elapsed_ms() / 1000.0
                    );
                }
                AppControl::Continue
            }
            Err(err) => {
                // Frame errors are not retried: stop scheduling ticks.
                log::error!("{err}");
                self.failure = Some(err);
                AppControl::Exit
            }
        }
    }
}
