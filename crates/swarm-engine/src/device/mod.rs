//! GPU device + render targets.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue, windowed or headless
//! - refusing adapters that cannot run the particle passes
//! - handing out one color target per tick through [`RenderSurface`]

mod capability;
mod gpu;
mod headless;
mod init;
mod scope;
mod target;

pub use capability::{check_adapter, check_capabilities, check_particle_capacity, required_limits};
pub use gpu::{Gpu, SurfaceErrorAction};
pub use headless::{HeadlessGpu, Offscreen};
pub(crate) use headless::wait_for_map;
pub use init::GpuInit;
pub(crate) use scope::scoped;
pub use target::{RenderSurface, TargetFrame};
