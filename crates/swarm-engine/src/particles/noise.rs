use rand::Rng;

/// Side length of the random RG texture sampled by the update pass.
pub const NOISE_EXTENT: u32 = 512;

/// `width × height` random two-channel texels, one byte per channel.
pub fn random_rg<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Vec<u8> {
    let mut texels = vec![0u8; (width * height * 2) as usize];
    rng.fill(texels.as_mut_slice());
    texels
}

/// Static noise texture. Filled once at initialization.
pub struct NoiseTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl NoiseTexture {
    pub fn new<R: Rng + ?Sized>(device: &wgpu::Device, queue: &wgpu::Queue, rng: &mut R) -> Self {
        let size = wgpu::Extent3d {
            width: NOISE_EXTENT,
            height: NOISE_EXTENT,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("swarm rg noise"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rg8Unorm,
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
            &random_rg(NOISE_EXTENT, NOISE_EXTENT, rng),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(NOISE_EXTENT * 2),
                rows_per_image: Some(NOISE_EXTENT),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}
