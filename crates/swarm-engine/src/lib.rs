//! Swarm engine crate.
//!
//! A device-resident particle simulation: an update pass reads one particle
//! buffer and captures the next state into the other, a render pass draws one
//! instanced sprite per particle, then the buffer roles swap.
//!
//! Also owns the platform + GPU runtime pieces the viewer uses.

pub mod config;
pub mod error;
pub mod layout;
pub mod particles;
pub mod program;
pub mod shaders;
pub mod sim;
pub mod system;

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod time;
pub mod window;

pub use config::SimulationConfig;
pub use error::{SimError, SimResult};
pub use system::ParticleSystem;
