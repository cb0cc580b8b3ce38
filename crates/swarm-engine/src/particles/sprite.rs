use bytemuck::{Pod, Zeroable};

use crate::config::SPRITE_EXTENT;
use crate::error::{SimError, SimResult};

/// Corner of the unit sprite quad.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    /// Quad corner in `[-1, 1]`.
    pub coord: [f32; 2],
    /// Texture coordinate in `[0, 1]`.
    pub tex_coord: [f32; 2],
}

const fn corner(coord: [f32; 2], tex_coord: [f32; 2]) -> SpriteVertex {
    SpriteVertex { coord, tex_coord }
}

/// Two triangles covering the sprite quad, drawn once per particle.
pub const SPRITE_QUAD: [SpriteVertex; 6] = [
    corner([1.0, 1.0], [1.0, 1.0]),
    corner([-1.0, 1.0], [0.0, 1.0]),
    corner([-1.0, -1.0], [0.0, 0.0]),
    corner([1.0, 1.0], [1.0, 1.0]),
    corner([-1.0, -1.0], [0.0, 0.0]),
    corner([1.0, -1.0], [1.0, 0.0]),
];

/// RGBA8 sprite pixels, `SPRITE_EXTENT` pixels square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    rgba: Vec<u8>,
}

impl SpriteImage {
    const BYTES: usize = (SPRITE_EXTENT * SPRITE_EXTENT * 4) as usize;

    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> SimResult<Self> {
        if width != SPRITE_EXTENT || height != SPRITE_EXTENT {
            return Err(SimError::config(format!(
                "sprite must be {SPRITE_EXTENT}x{SPRITE_EXTENT}, got {width}x{height}"
            )));
        }
        if rgba.len() != Self::BYTES {
            return Err(SimError::config(format!(
                "sprite holds {} bytes, expected {}",
                rgba.len(),
                Self::BYTES
            )));
        }
        Ok(Self { rgba })
    }

    /// White disc fading out towards the rim.
    pub fn soft_disc() -> Self {
        let half = SPRITE_EXTENT as f32 * 0.5;
        let mut rgba = Vec::with_capacity(Self::BYTES);
        for y in 0..SPRITE_EXTENT {
            for x in 0..SPRITE_EXTENT {
                let dx = (x as f32 + 0.5 - half) / half;
                let dy = (y as f32 + 0.5 - half) / half;
                let falloff = (1.0 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
                let alpha = (falloff * falloff * 255.0).round() as u8;
                rgba.extend_from_slice(&[255, 255, 255, alpha]);
            }
        }
        Self { rgba }
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

impl Default for SpriteImage {
    fn default() -> Self {
        Self::soft_disc()
    }
}

/// Sprite uploaded to the device, with a linear sampler.
pub struct SpriteTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl SpriteTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, image: &SpriteImage) -> Self {
        let size = wgpu::Extent3d {
            width: SPRITE_EXTENT,
            height: SPRITE_EXTENT,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("swarm sprite"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.rgba(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(SPRITE_EXTENT * 4),
                rows_per_image: Some(SPRITE_EXTENT),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("swarm sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}
