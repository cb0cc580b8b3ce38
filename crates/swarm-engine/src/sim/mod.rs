//! The per-frame simulation cycle: time step, update pass, render pass, swap.

mod state;
mod stepper;
mod uniforms;

pub use state::{SimulationState, StepPhase};
pub use stepper::{SimulationStepper, TickReport};
pub use uniforms::{RenderParams, UpdateParams};
