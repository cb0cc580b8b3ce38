use bytemuck::{Pod, Zeroable};

/// Update pass uniforms. Mirrors `UpdateParams` in `particle-update.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct UpdateParams {
    /// Seconds.
    pub time_delta: f32,
    /// Milliseconds accumulated before this tick.
    pub total_time: f32,
    pub field_size: [f32; 2],
    pub min_speed: f32,
    pub max_speed: f32,
    pub pointer: [f32; 2],
    /// Non-zero when `pointer` is meaningful.
    pub pointer_active: u32,
    pub particle_count: u32,
    pub _pad: [u32; 2],
}

/// Render pass uniforms. Mirrors `RenderParams` in `particle-render-vert.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct RenderParams {
    pub field_size: [f32; 2],
    /// Sprite edge length in pixels.
    pub particle_size: f32,
    pub _pad: f32,
}
