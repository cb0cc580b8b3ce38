//! Particle state: records, seeding, the two ping-pong buffers and the
//! resources the passes sample.

mod noise;
mod roles;
mod seed;
mod sprite;
mod store;

pub use noise::{NOISE_EXTENT, NoiseTexture, random_rg};
pub use roles::{BufferRoles, PingPong, Slot};
pub use seed::{sample_speed, seed_particles};
pub use sprite::{SPRITE_QUAD, SpriteImage, SpriteTexture, SpriteVertex};
pub use store::ParticleStateStore;

use bytemuck::{Pod, Zeroable};

/// Bytes per particle record: position (2 × f32) then velocity (2 × f32).
pub const PARTICLE_STRIDE: u64 = std::mem::size_of::<ParticleRecord>() as u64;

/// One particle as laid out in both state buffers.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleRecord {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl ParticleRecord {
    pub fn speed(&self) -> f32 {
        let [vx, vy] = self.velocity;
        (vx * vx + vy * vy).sqrt()
    }
}
