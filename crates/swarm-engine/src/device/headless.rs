use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::capability::{check_adapter, required_limits};
use super::scope::log_uncaptured_errors;
use super::target::{RenderSurface, TargetFrame};
use crate::error::{SimError, SimResult};

/// Device and queue without a window.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    /// Requests an adapter that can run the particle passes.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a GPU adapter")?;

        check_adapter(&adapter).context("adapter cannot run the particle passes")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("swarm headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: required_limits(&adapter),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;
        log_uncaptured_errors(&device);

        log::info!("headless device on {:?}", adapter.get_info().name);
        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Blocking form of [`HeadlessGpu::new`].
    pub fn request() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Texture render target for headless runs.
pub struct Offscreen {
    texture: wgpu::Texture,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl Offscreen {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("swarm offscreen target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Self {
            texture,
            format: Self::FORMAT,
            width,
            height,
        }
    }

    /// Copies the target back to the host as tightly packed RGBA rows.
    pub fn read_pixels(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> SimResult<Vec<u8>> {
        let (width, height) = (self.width.max(1), self.height.max(1));
        let row = width * 4;
        let padded_row = row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("swarm offscreen readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("swarm offscreen readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        wait_for_map(device, &slice)?;
        let pixels = {
            let data = slice.get_mapped_range();
            data.chunks(padded_row as usize)
                .flat_map(|r| &r[..row as usize])
                .copied()
                .collect()
        };
        staging.unmap();
        Ok(pixels)
    }
}

impl RenderSurface for Offscreen {
    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn acquire(&mut self) -> SimResult<Option<TargetFrame>> {
        if self.width == 0 || self.height == 0 {
            return Ok(None);
        }
        Ok(Some(TargetFrame::from_texture(&self.texture)))
    }
}

const MAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Maps `slice` for reading and polls the device until the mapping lands.
pub(crate) fn wait_for_map(device: &wgpu::Device, slice: &wgpu::BufferSlice<'_>) -> SimResult<()> {
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = tx.send(res);
    });
    await_mapping(&rx, MAP_TIMEOUT, || device.poll(wgpu::PollType::Poll))
}

type MapResult = Result<(), wgpu::BufferAsyncError>;

fn await_mapping(
    rx: &mpsc::Receiver<MapResult>,
    timeout: Duration,
    mut poll: impl FnMut() -> Result<wgpu::PollStatus, wgpu::PollError>,
) -> SimResult<()> {
    let started = Instant::now();
    loop {
        poll().map_err(|e| SimError::Frame(format!("device poll failed: {e}")))?;
        match rx.try_recv() {
            Ok(res) => {
                return res.map_err(|e| SimError::Frame(format!("buffer mapping failed: {e}")));
            }
            Err(mpsc::TryRecvError::Empty) if started.elapsed() < timeout => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(_) => return Err(SimError::Frame("buffer mapping timed out".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_mapping_completes() {
        let (tx, rx) = mpsc::channel();
        tx.send(Ok(())).unwrap();
        let res = await_mapping(&rx, MAP_TIMEOUT, || Ok(wgpu::PollStatus::Poll));
        assert!(res.is_ok(), "{res:?}");
    }

    #[test]
    fn poll_error_ends_the_wait_at_once() {
        let (_tx, rx) = mpsc::channel::<MapResult>();
        let started = Instant::now();
        let err = await_mapping(&rx, MAP_TIMEOUT, || Err(wgpu::PollError::Timeout)).unwrap_err();
        assert!(matches!(err, SimError::Frame(_)));
        assert!(err.to_string().contains("poll"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn silent_mapping_times_out() {
        let (_tx, rx) = mpsc::channel::<MapResult>();
        let err = await_mapping(&rx, Duration::from_millis(20), || Ok(wgpu::PollStatus::Poll))
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }
}
