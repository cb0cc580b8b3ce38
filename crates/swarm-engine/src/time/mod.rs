//! Time subsystem.
//!
//! `FrameClock` turns the monotonic clock into frame timestamps;
//! `StepTimer` turns consecutive timestamps into simulation deltas.
//! Neither is coupled to the runtime, so both are driven directly in tests.

mod frame_clock;
mod step_timer;

pub use frame_clock::{FrameClock, FrameTime};
pub use step_timer::StepTimer;
