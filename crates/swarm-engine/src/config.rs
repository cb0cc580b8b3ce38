//! Simulation parameters.
//!
//! Parameters are plain data: they can be built in code or read from JSON.
//! `validate()` runs before any device resource is created.

use serde::Deserialize;

use crate::error::{SimError, SimResult};

/// Side length of the sprite image in pixels.
pub const SPRITE_EXTENT: u32 = 32;

/// Initialization parameters for one particle simulation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of particles. Fixed for the lifetime of the simulation.
    pub particle_count: u32,

    /// Sprite size as a fraction of `viewport width + height`.
    pub particle_size: f32,

    /// Lower speed bound in field units per second.
    pub min_speed: f32,

    /// Upper speed bound in field units per second.
    pub max_speed: f32,

    /// Field that seed positions are centred in (not the render viewport).
    pub reference_field: [f32; 2],

    /// Deltas above this many milliseconds are treated as stalls and dropped.
    pub stall_threshold_ms: f64,

    /// Seed for particle and noise generation. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 100,
            particle_size: 0.01,
            min_speed: 50.0,
            max_speed: 200.0,
            reference_field: [1000.0, 1000.0],
            stall_threshold_ms: 500.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Parses a JSON document. Missing fields take their default.
    pub fn from_json_str(text: &str) -> SimResult<Self> {
        serde_json::from_str(text).map_err(|e| SimError::config(format!("malformed config: {e}")))
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.particle_count == 0 {
            return Err(SimError::config("particle count must be positive"));
        }
        if !(self.particle_size.is_finite() && self.particle_size > 0.0) {
            return Err(SimError::config(format!(
                "particle size must be a positive fraction, got {}",
                self.particle_size
            )));
        }
        if !(self.min_speed.is_finite() && self.max_speed.is_finite()) || self.min_speed < 0.0 {
            return Err(SimError::config(format!(
                "speed bounds must be finite and non-negative, got [{}, {}]",
                self.min_speed, self.max_speed
            )));
        }
        if self.min_speed > self.max_speed {
            return Err(SimError::config(format!(
                "invalid min-max speed range: {} > {}",
                self.min_speed, self.max_speed
            )));
        }
        let [fw, fh] = self.reference_field;
        if !(fw.is_finite() && fh.is_finite() && fw > 0.0 && fh > 0.0) {
            return Err(SimError::config(format!(
                "reference field must have a positive size, got {fw}x{fh}"
            )));
        }
        if !(self.stall_threshold_ms.is_finite() && self.stall_threshold_ms >= 0.0) {
            return Err(SimError::config("stall threshold must be a non-negative duration"));
        }
        Ok(())
    }

    /// Seed position shared by every particle: the reference field centre.
    pub fn field_center(&self) -> [f32; 2] {
        [self.reference_field[0] * 0.5, self.reference_field[1] * 0.5]
    }

    /// Size in bytes of one particle buffer.
    pub fn buffer_size(&self) -> u64 {
        self.particle_count as u64 * crate::particles::PARTICLE_STRIDE
    }
}
