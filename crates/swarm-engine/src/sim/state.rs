use super::uniforms::{RenderParams, UpdateParams};
use crate::config::SimulationConfig;
use crate::input::FrameInputs;
use crate::particles::{BufferRoles, Slot};
use crate::time::StepTimer;

/// Where a tick currently is. `Swapped` returns to `Idle` before `tick` returns.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum StepPhase {
    #[default]
    Idle,
    Updating,
    Rendering,
    Swapped,
}

/// Everything one tick needs, resolved at tick start.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TickPlan {
    pub read: Slot,
    pub write: Slot,
    pub delta_ms: f64,
    pub update: UpdateParams,
    pub render: RenderParams,
}

/// Mutable per-simulation state, owned by the stepper.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub(crate) roles: BufferRoles,
    pub(crate) timer: StepTimer,
    pub(crate) elapsed_ms: f64,
    pub(crate) phase: StepPhase,
    pub(crate) ticks: u64,
    min_speed: f32,
    max_speed: f32,
    particle_count: u32,
    particle_size: f32,
}

impl SimulationState {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            roles: BufferRoles::default(),
            timer: StepTimer::new(config.stall_threshold_ms),
            elapsed_ms: 0.0,
            phase: StepPhase::Idle,
            ticks: 0,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            particle_count: config.particle_count,
            particle_size: config.particle_size,
        }
    }

    pub fn roles(&self) -> BufferRoles {
        self.roles
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// Sum of the deltas of every completed tick, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn previous_timestamp(&self) -> Option<f64> {
        self.timer.previous()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn speed_bounds(&self) -> (f32, f32) {
        (self.min_speed, self.max_speed)
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// Sprite size in pixels for a `width × height` viewport.
    pub fn sprite_pixels(&self, width: u32, height: u32) -> f32 {
        self.particle_size * (width + height) as f32
    }
}

impl SimulationState {
    /// Enters `Updating`: advances the step timer and resolves uniforms.
    ///
    /// The update pass sees the elapsed time from before this tick's delta.
    pub(crate) fn begin_tick(
        &mut self,
        timestamp_ms: f64,
        (width, height): (u32, u32),
        inputs: FrameInputs,
    ) -> TickPlan {
        self.phase = StepPhase::Updating;
        let delta_ms = self.timer.advance(timestamp_ms);
        let field_size = [width.max(1) as f32, height.max(1) as f32];

        let update = UpdateParams {
            time_delta: (delta_ms / 1000.0) as f32,
            total_time: self.elapsed_ms as f32,
            field_size,
            min_speed: self.min_speed,
            max_speed: self.max_speed,
            pointer: inputs.pointer.unwrap_or([0.0; 2]),
            pointer_active: inputs.pointer.is_some() as u32,
            particle_count: self.particle_count,
            _pad: [0; 2],
        };
        let render = RenderParams {
            field_size,
            particle_size: self.sprite_pixels(width, height),
            _pad: 0.0,
        };
        self.elapsed_ms += delta_ms;

        TickPlan {
            read: self.roles.read(),
            write: self.roles.write(),
            delta_ms,
            update,
            render,
        }
    }

    /// Swaps the buffer roles and returns to `Idle`. Called once per tick,
    /// whether or not rendering succeeded.
    pub(crate) fn finish_tick(&mut self) {
        self.phase = StepPhase::Swapped;
        self.roles.swap();
        self.ticks += 1;
        log::trace!("tick {} done, {:?} next", self.ticks, self.roles);
        self.phase = StepPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SimulationState {
        SimulationState::new(&SimulationConfig::default())
    }

    #[test]
    fn speed_bounds_reach_the_update_uniform() {
        let mut s = state();
        assert_eq!(s.speed_bounds(), (50.0, 200.0));
        let plan = s.begin_tick(0.0, (800, 600), FrameInputs::default());
        assert_eq!((plan.update.min_speed, plan.update.max_speed), s.speed_bounds());
    }

    #[test]
    fn first_tick_has_zero_delta() {
        let mut s = state();
        let plan = s.begin_tick(5000.0, (800, 600), FrameInputs::default());
        assert_eq!(plan.delta_ms, 0.0);
        assert_eq!(plan.update.time_delta, 0.0);
        assert_eq!(s.phase(), StepPhase::Updating);
    }

    #[test]
    fn uniform_sees_elapsed_before_the_delta() {
        let mut s = state();
        s.begin_tick(1000.0, (800, 600), FrameInputs::default());
        s.finish_tick();
        let plan = s.begin_tick(1020.0, (800, 600), FrameInputs::default());
        assert_eq!(plan.update.total_time, 0.0);
        assert!((plan.update.time_delta - 0.02).abs() < 1e-6);
        assert_eq!(s.elapsed_ms(), 20.0);
        s.finish_tick();

        let plan = s.begin_tick(1036.0, (800, 600), FrameInputs::default());
        assert_eq!(plan.update.total_time, 20.0);
        assert_eq!(s.elapsed_ms(), 36.0);
    }

    #[test]
    fn stall_keeps_elapsed_and_moves_previous() {
        let mut s = state();
        s.begin_tick(1000.0, (800, 600), FrameInputs::default());
        s.finish_tick();
        let plan = s.begin_tick(1700.0, (800, 600), FrameInputs::default());
        assert_eq!(plan.delta_ms, 0.0);
        assert_eq!(s.elapsed_ms(), 0.0);
        assert_eq!(s.previous_timestamp(), Some(1700.0));
    }

    #[test]
    fn plan_reads_one_buffer_and_writes_the_other() {
        let mut s = state();
        for _ in 0..4 {
            let plan = s.begin_tick(0.0, (10, 10), FrameInputs::default());
            assert_ne!(plan.read, plan.write);
            assert_eq!(plan.read, s.roles().read());
            s.finish_tick();
        }
    }

    #[test]
    fn finish_tick_swaps_exactly_once() {
        let mut s = state();
        for n in 1..=3u64 {
            let before = s.roles();
            s.begin_tick(n as f64 * 16.0, (10, 10), FrameInputs::default());
            s.finish_tick();
            assert_eq!(s.roles(), before.swapped());
            assert_eq!(s.ticks(), n);
            assert_eq!(s.phase(), StepPhase::Idle);
        }
        assert_eq!(s.roles(), BufferRoles::BReads);
    }

    #[test]
    fn pointer_and_sprite_size_reach_the_uniforms() {
        let mut s = state();
        let inputs = FrameInputs {
            pointer: Some([40.0, 30.0]),
        };
        let plan = s.begin_tick(0.0, (800, 600), inputs);
        assert_eq!(plan.update.pointer, [40.0, 30.0]);
        assert_eq!(plan.update.pointer_active, 1);
        assert_eq!(plan.update.field_size, [800.0, 600.0]);
        assert_eq!(plan.update.particle_count, 100);
        assert!((plan.render.particle_size - 14.0).abs() < 1e-4);
    }

    #[test]
    fn zero_size_viewport_keeps_a_unit_field() {
        let mut s = state();
        let plan = s.begin_tick(0.0, (0, 0), FrameInputs::default());
        assert_eq!(plan.update.field_size, [1.0, 1.0]);
        assert_eq!(plan.render.particle_size, 0.0);
    }
}
