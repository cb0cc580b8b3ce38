use crate::error::SimResult;

/// A color target acquired for one tick.
///
/// Short-lived: a surface frame must be presented (or dropped) before the
/// next one can be acquired.
pub struct TargetFrame {
    view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl TargetFrame {
    pub(crate) fn from_surface(surface_texture: wgpu::SurfaceTexture) -> Self {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            surface_texture: Some(surface_texture),
        }
    }

    /// Frame over a caller-owned texture. Presenting it is a no-op.
    pub fn from_texture(texture: &wgpu::Texture) -> Self {
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            surface_texture: None,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Presents a surface frame. Texture targets have nothing to present.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// Where the render pass draws: a window surface or an offscreen texture.
pub trait RenderSurface {
    fn format(&self) -> wgpu::TextureFormat;

    /// Drawable size in physical pixels. Also the simulation field size.
    fn size(&self) -> (u32, u32);

    /// Acquires the target for this tick.
    ///
    /// `Ok(None)` means "skip rendering this tick" (transient surface state or
    /// a zero-size target). `Err` is a frame error the driver must handle.
    fn acquire(&mut self) -> SimResult<Option<TargetFrame>>;
}
