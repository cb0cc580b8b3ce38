use winit::window::Window;

use crate::device::Gpu;
use crate::input::FrameInputs;
use crate::time::FrameTime;

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    /// Input snapshot taken before the callback runs.
    pub inputs: FrameInputs,
    pub time: FrameTime,
}
