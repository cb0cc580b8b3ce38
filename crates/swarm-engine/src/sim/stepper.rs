use std::num::NonZeroU64;

use super::state::{SimulationState, StepPhase, TickPlan};
use super::uniforms::{RenderParams, UpdateParams};
use crate::config::SimulationConfig;
use crate::device::{RenderSurface, TargetFrame, scoped};
use crate::error::{SimError, SimResult};
use crate::input::FrameInputs;
use crate::particles::{BufferRoles, NoiseTexture, ParticleStateStore, SPRITE_QUAD, Slot, SpriteTexture};
use crate::program::Program;

/// Invocations per update workgroup. Matches `@workgroup_size` in the shader.
const WORKGROUP_SIZE: u32 = 64;

/// What one tick did.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TickReport {
    /// 1-based tick counter.
    pub tick: u64,
    pub delta_ms: f64,
    /// Roles after the swap, i.e. for the next tick.
    pub roles: BufferRoles,
    /// `false` when the target was not available this tick.
    pub rendered: bool,
}

struct UpdateResources {
    pipeline: wgpu::ComputePipeline,
    params_ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct RenderResources {
    pipeline: wgpu::RenderPipeline,
    params_ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Drives one update + render + swap cycle per call to [`tick`](Self::tick).
pub struct SimulationStepper {
    state: SimulationState,
    update: UpdateResources,
    render: RenderResources,
}

impl SimulationStepper {
    pub fn new(
        device: &wgpu::Device,
        config: &SimulationConfig,
        store: &ParticleStateStore,
        programs: (&Program, &Program),
        target_format: wgpu::TextureFormat,
        noise: &NoiseTexture,
        sprite: &SpriteTexture,
    ) -> SimResult<Self> {
        let (update_program, render_program) = programs;
        if config.particle_count != store.particle_count() {
            return Err(SimError::config(format!(
                "config asks for {} particles, state holds {}",
                config.particle_count,
                store.particle_count()
            )));
        }

        let update = build_update_pass(device, store, update_program, noise)?;
        let render = build_render_pass(device, store, render_program, target_format, sprite)?;

        Ok(Self {
            state: SimulationState::new(config),
            update,
            render,
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Advances the simulation by one frame and draws it into `target`.
    ///
    /// The update pass is submitted before the target is acquired, and the
    /// roles are swapped even when rendering fails.
    pub fn tick(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &ParticleStateStore,
        target: &mut dyn RenderSurface,
        timestamp_ms: f64,
        inputs: FrameInputs,
    ) -> SimResult<TickReport> {
        let plan = self.state.begin_tick(timestamp_ms, target.size(), inputs);
        let updated = scoped(device, frame_error("update pass"), || {
            self.submit_update(device, queue, store, &plan);
            Ok(())
        });

        self.state.phase = StepPhase::Rendering;
        let rendered = self.submit_render(device, queue, store, target, &plan);

        self.state.finish_tick();
        updated?;
        let rendered = rendered?;

        Ok(TickReport {
            tick: self.state.ticks(),
            delta_ms: plan.delta_ms,
            roles: self.state.roles(),
            rendered,
        })
    }

    fn submit_update(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &ParticleStateStore,
        plan: &TickPlan,
    ) {
        queue.write_buffer(&self.update.params_ubo, 0, bytemuck::bytes_of(&plan.update));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("swarm update encoder"),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("swarm update pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&self.update.pipeline);
            cpass.set_bind_group(0, store.update_input(plan.read), &[]);
            cpass.set_bind_group(1, store.capture_target(plan.write), &[]);
            cpass.set_bind_group(2, &self.update.bind_group, &[]);
            cpass.dispatch_workgroups(store.particle_count().div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draws from the pre-swap read buffer. Returns whether a frame was drawn.
    fn submit_render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &ParticleStateStore,
        target: &mut dyn RenderSurface,
        plan: &TickPlan,
    ) -> SimResult<bool> {
        let Some(frame) = target.acquire()? else {
            log::trace!("no render target this tick");
            return Ok(false);
        };

        scoped(device, frame_error("render pass"), || {
            self.encode_render(device, queue, store, &frame, plan);
            Ok(())
        })?;
        frame.present();
        Ok(true)
    }

    fn encode_render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &ParticleStateStore,
        frame: &TargetFrame,
        plan: &TickPlan,
    ) {
        queue.write_buffer(&self.render.params_ubo, 0, bytemuck::bytes_of(&plan.render));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("swarm render encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("swarm render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(&self.render.pipeline);
            rpass.set_bind_group(0, &self.render.bind_group, &[]);
            store.render_array(plan.read).bind(&mut rpass);
            rpass.draw(0..SPRITE_QUAD.len() as u32, 0..store.particle_count());
        }
        queue.submit(std::iter::once(encoder.finish()));
    }
}

fn frame_error(pass: &'static str) -> impl FnOnce(String) -> SimError {
    move |e| SimError::Frame(format!("{pass}: {e}"))
}

fn build_update_pass(
    device: &wgpu::Device,
    store: &ParticleStateStore,
    program: &Program,
    noise: &NoiseTexture,
) -> SimResult<UpdateResources> {
    let params_size = std::mem::size_of::<UpdateParams>() as u64;
    let params_ubo = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("swarm update params"),
        size: params_size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("swarm update params bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(params_size),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("swarm update params bg"),
        layout: &bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_ubo.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(noise.view()),
            },
        ],
    });

    let pipeline =
        program.update_pipeline(device, &[store.input_layout(), store.capture_layout(), &bgl])?;

    Ok(UpdateResources {
        pipeline,
        params_ubo,
        bind_group,
    })
}

fn build_render_pass(
    device: &wgpu::Device,
    store: &ParticleStateStore,
    program: &Program,
    format: wgpu::TextureFormat,
    sprite: &SpriteTexture,
) -> SimResult<RenderResources> {
    let params_size = std::mem::size_of::<RenderParams>() as u64;
    let params_ubo = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("swarm render params"),
        size: params_size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("swarm render bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(params_size),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("swarm render bg"),
        layout: &bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_ubo.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(sprite.view()),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sprite.sampler()),
            },
        ],
    });

    // Both render arrays share one layout; either slot describes the pipeline.
    let pipeline = program.render_pipeline(
        device,
        store.render_array(Slot::A),
        &[&bgl],
        wgpu::ColorTargetState {
            format,
            blend: Some(additive_blend()),
            write_mask: wgpu::ColorWrites::ALL,
        },
    )?;

    Ok(RenderResources {
        pipeline,
        params_ubo,
        bind_group,
    })
}

/// `src × srcAlpha + dst`: overlapping sprites brighten.
fn additive_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}
