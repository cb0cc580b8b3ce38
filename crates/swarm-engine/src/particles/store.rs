use wgpu::util::DeviceExt;

use super::roles::{PingPong, Slot};
use super::sprite::SPRITE_QUAD;
use super::{PARTICLE_STRIDE, ParticleRecord};
use crate::device::{check_particle_capacity, wait_for_map};
use crate::error::{SimError, SimResult};
use crate::layout::{AttributeDescriptor, AttributeMap, BufferBinding, VertexArray, bind_layout};
use crate::program::{Program, RecordLayout};

/// The two particle buffers and every binding built over them.
///
/// Both buffers start with identical contents. Vertex arrays and bind groups
/// are indexed by the slot of the buffer they *read*; capture targets by the
/// slot they *write*.
pub struct ParticleStateStore {
    particle_count: u32,
    buffers: PingPong<wgpu::Buffer>,
    update_arrays: PingPong<VertexArray>,
    render_arrays: PingPong<VertexArray>,
    input_layout: wgpu::BindGroupLayout,
    capture_layout: wgpu::BindGroupLayout,
    update_inputs: PingPong<wgpu::BindGroup>,
    capture_targets: PingPong<wgpu::BindGroup>,
}

impl ParticleStateStore {
    /// Uploads `seeds` into both buffers and binds them for both programs.
    pub fn initialize(
        device: &wgpu::Device,
        seeds: &[ParticleRecord],
        update: &Program,
        render: &Program,
    ) -> SimResult<Self> {
        if seeds.is_empty() {
            return Err(SimError::config("particle count must be positive"));
        }
        let particle_count = u32::try_from(seeds.len())
            .map_err(|_| SimError::config(format!("{} particles do not fit a u32 count", seeds.len())))?;
        check_particle_capacity(particle_count, &device.limits())?;

        let update_attrs = AttributeMap::new()
            .with("i_Position", AttributeDescriptor::float(location(update, "i_Position")?, 2))
            .with("i_Velocity", AttributeDescriptor::float(location(update, "i_Velocity")?, 2));
        // Particles advance once per sprite instance.
        let render_attrs = AttributeMap::new().with(
            "i_Position",
            AttributeDescriptor::float(location(render, "i_Position")?, 2).per_instance(1),
        );
        let sprite_attrs = AttributeMap::new()
            .with("i_Coord", AttributeDescriptor::float(location(render, "i_Coord")?, 2))
            .with("i_TexCoord", AttributeDescriptor::float(location(render, "i_TexCoord")?, 2));

        let contents: &[u8] = bytemuck::cast_slice(seeds);
        let buffers = PingPong::try_from_fn(|slot| -> SimResult<wgpu::Buffer> {
            Ok(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(slot_label("swarm particles", slot).as_str()),
                contents,
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            }))
        })?;
        let sprite_quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("swarm sprite quad"),
            contents: bytemuck::cast_slice(&SPRITE_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sprite_stride = std::mem::size_of_val(&SPRITE_QUAD[0]) as u64;

        let update_arrays = PingPong::try_from_fn(|slot| {
            bind_layout(
                &slot_label("update from", slot),
                vec![BufferBinding {
                    buffer: buffers.get(slot).clone(),
                    stride: PARTICLE_STRIDE,
                    attributes: update_attrs.clone(),
                }],
            )
        })?;
        let render_arrays = PingPong::try_from_fn(|slot| {
            bind_layout(
                &slot_label("render from", slot),
                vec![
                    BufferBinding {
                        buffer: buffers.get(slot).clone(),
                        stride: PARTICLE_STRIDE,
                        attributes: render_attrs.clone(),
                    },
                    BufferBinding {
                        buffer: sprite_quad.clone(),
                        stride: sprite_stride,
                        attributes: sprite_attrs.clone(),
                    },
                ],
            )
        })?;

        check_record(update, &update_arrays, update.input_record(), "read")?;
        check_record(update, &update_arrays, update.capture_layout(), "captured")?;
        update.check_vertex_inputs(update_arrays.get(Slot::A))?;
        render.check_vertex_inputs(render_arrays.get(Slot::A))?;

        let input_layout = storage_layout(device, "swarm particle input bgl", true);
        let capture_layout = storage_layout(device, "swarm particle capture bgl", false);

        let update_inputs = buffers.map(|slot, buffer| {
            storage_group(device, &slot_label("swarm read", slot), &input_layout, buffer)
        });
        let capture_targets = buffers.map(|slot, buffer| {
            storage_group(device, &slot_label("swarm capture into", slot), &capture_layout, buffer)
        });

        log::info!(
            "particle state initialized: {particle_count} particles, {} bytes per buffer",
            contents.len()
        );

        Ok(Self {
            particle_count,
            buffers,
            update_arrays,
            render_arrays,
            input_layout,
            capture_layout,
            update_inputs,
            capture_targets,
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    pub fn buffer(&self, slot: Slot) -> &wgpu::Buffer {
        self.buffers.get(slot)
    }

    /// Vertex array the update pass reads when `slot` is the read buffer.
    pub fn update_array(&self, read: Slot) -> &VertexArray {
        self.update_arrays.get(read)
    }

    /// Vertex array the render pass draws when `slot` is the read buffer.
    pub fn render_array(&self, read: Slot) -> &VertexArray {
        self.render_arrays.get(read)
    }

    pub fn input_layout(&self) -> &wgpu::BindGroupLayout {
        &self.input_layout
    }

    pub fn capture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.capture_layout
    }

    pub(crate) fn update_input(&self, read: Slot) -> &wgpu::BindGroup {
        self.update_inputs.get(read)
    }

    pub(crate) fn capture_target(&self, write: Slot) -> &wgpu::BindGroup {
        self.capture_targets.get(write)
    }

    /// Copies one buffer back to the host. Blocks until the copy lands.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: Slot,
    ) -> SimResult<Vec<ParticleRecord>> {
        let size = self.particle_count as u64 * PARTICLE_STRIDE;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("swarm readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("swarm readback encoder"),
        });
        encoder.copy_buffer_to_buffer(self.buffers.get(slot), 0, &staging, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        wait_for_map(device, &slice)?;

        let records = {
            let view = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, ParticleRecord>(&view).to_vec()
        };
        staging.unmap();
        Ok(records)
    }
}

fn slot_label(prefix: &str, slot: Slot) -> String {
    format!("{prefix} {slot:?}")
}

fn location(program: &Program, name: &str) -> SimResult<u32> {
    program
        .attribute(name)
        .ok_or_else(|| SimError::link(program.label(), format!("program does not read `{name}`")))
}

fn check_record(
    program: &Program,
    arrays: &PingPong<VertexArray>,
    record: Option<&RecordLayout>,
    what: &str,
) -> SimResult<()> {
    let Some(record) = record else {
        return Err(SimError::link(program.label(), format!("program declares no {what} record")));
    };
    let array = arrays.get(Slot::A);
    for bound in array.buffers() {
        record
            .check_matches(&bound.layout)
            .map_err(|reason| SimError::layout(array.label(), format!("{what} record: {reason}")))?;
    }
    Ok(())
}

fn storage_layout(device: &wgpu::Device, label: &str, read_only: bool) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(PARTICLE_STRIDE),
            },
            count: None,
        }],
    })
}

fn storage_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}
