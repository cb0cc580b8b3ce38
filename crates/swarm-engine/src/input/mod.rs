//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Runtime code translates platform events into `InputEvent`s; the simulation
//! only ever sees the per-tick `FrameInputs` snapshot.

mod pointer;

pub use pointer::{FrameInputs, InputEvent, PointerState};
