use std::f32::consts::TAU;

use rand::Rng;

use super::ParticleRecord;
use crate::config::SimulationConfig;

/// Draws a speed in `[min, max)`, or exactly `min` when the bounds are equal.
pub fn sample_speed<R: Rng + ?Sized>(min: f32, max: f32, rng: &mut R) -> f32 {
    if min < max {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Initial records: every particle at the reference field centre, heading in a
/// uniformly random direction at a random speed within the configured bounds.
pub fn seed_particles<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Vec<ParticleRecord> {
    let center = config.field_center();
    (0..config.particle_count)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let speed = sample_speed(config.min_speed, config.max_speed, rng);
            ParticleRecord {
                position: center,
                velocity: [angle.cos() * speed, angle.sin() * speed],
            }
        })
        .collect()
}
