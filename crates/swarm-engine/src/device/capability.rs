use crate::error::{SimError, SimResult};
use crate::particles::PARTICLE_STRIDE;

/// Storage buffers the update pass binds at once: the read and the write buffer.
const STORAGE_BUFFERS: u32 = 2;
/// Vertex buffers the render pass binds at once: particles and the sprite quad.
const VERTEX_BUFFERS: u32 = 2;
/// Invocations per update workgroup.
const WORKGROUP_SIZE: u32 = 64;

/// Checks adapter-reported capabilities against what both passes need.
pub fn check_capabilities(flags: wgpu::DownlevelFlags, limits: &wgpu::Limits) -> SimResult<()> {
    if !flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        return Err(SimError::DeviceCapability("compute shaders are not supported".into()));
    }
    if limits.max_storage_buffers_per_shader_stage < STORAGE_BUFFERS {
        return Err(SimError::DeviceCapability(format!(
            "{} storage buffer(s) per stage, {STORAGE_BUFFERS} required",
            limits.max_storage_buffers_per_shader_stage
        )));
    }
    if limits.max_vertex_buffers < VERTEX_BUFFERS {
        return Err(SimError::DeviceCapability(format!(
            "{} vertex buffer(s), {VERTEX_BUFFERS} required",
            limits.max_vertex_buffers
        )));
    }
    if limits.max_compute_invocations_per_workgroup < WORKGROUP_SIZE
        || limits.max_compute_workgroup_size_x < WORKGROUP_SIZE
    {
        return Err(SimError::DeviceCapability(format!(
            "compute workgroups of {WORKGROUP_SIZE} invocations are not supported"
        )));
    }
    Ok(())
}

/// Checks that `particle_count` records fit one dispatch and one storage binding.
pub fn check_particle_capacity(particle_count: u32, limits: &wgpu::Limits) -> SimResult<()> {
    let groups = particle_count.div_ceil(WORKGROUP_SIZE);
    if groups > limits.max_compute_workgroups_per_dimension {
        return Err(SimError::DeviceCapability(format!(
            "{particle_count} particles need {groups} workgroups, the device dispatches at most {}",
            limits.max_compute_workgroups_per_dimension
        )));
    }
    let bytes = u64::from(particle_count) * PARTICLE_STRIDE;
    if bytes > u64::from(limits.max_storage_buffer_binding_size) {
        return Err(SimError::DeviceCapability(format!(
            "{particle_count} particles take {bytes} bytes, storage bindings hold at most {}",
            limits.max_storage_buffer_binding_size
        )));
    }
    if bytes > limits.max_buffer_size {
        return Err(SimError::DeviceCapability(format!(
            "{particle_count} particles take {bytes} bytes, buffers hold at most {}",
            limits.max_buffer_size
        )));
    }
    Ok(())
}

/// Runs [`check_capabilities`] against an adapter.
pub fn check_adapter(adapter: &wgpu::Adapter) -> SimResult<()> {
    let caps = adapter.get_downlevel_capabilities();
    check_capabilities(caps.flags, &adapter.limits())
}

/// Limits to request: downlevel defaults, raised to the adapter's texture
/// resolution so large windows still configure.
pub fn required_limits(adapter: &wgpu::Adapter) -> wgpu::Limits {
    wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits())
}
