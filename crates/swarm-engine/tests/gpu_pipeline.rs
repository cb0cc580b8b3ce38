//! End-to-end checks on a real adapter. Each test skips when no adapter can
//! run the particle passes (e.g. CI without a GPU or software rasterizer).

use swarm_engine::device::{HeadlessGpu, Offscreen, RenderSurface, TargetFrame};
use swarm_engine::input::FrameInputs;
use swarm_engine::particles::{BufferRoles, ParticleRecord, Slot, SpriteImage};
use swarm_engine::shaders::{self, ShaderSources};
use swarm_engine::{ParticleSystem, SimError, SimulationConfig};

fn gpu() -> Option<HeadlessGpu> {
    match HeadlessGpu::request() {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            None
        }
    }
}

fn seeded(count: u32) -> SimulationConfig {
    SimulationConfig {
        particle_count: count,
        seed: Some(7),
        ..Default::default()
    }
}

fn build(
    gpu: &HeadlessGpu,
    target: &Offscreen,
    config: &SimulationConfig,
    sources: &ShaderSources,
) -> Result<ParticleSystem, SimError> {
    ParticleSystem::new(
        gpu.device(),
        gpu.queue(),
        target.format(),
        config,
        sources,
        &SpriteImage::soft_disc(),
    )
}

fn tick(gpu: &HeadlessGpu, sys: &mut ParticleSystem, target: &mut Offscreen, ts: f64) {
    let report = sys
        .tick(gpu.device(), gpu.queue(), target, ts, FrameInputs::default())
        .unwrap();
    assert!(report.rendered);
}

fn read(gpu: &HeadlessGpu, sys: &ParticleSystem, slot: Slot) -> Vec<ParticleRecord> {
    sys.read_slot(gpu.device(), gpu.queue(), slot).unwrap()
}

/// Fails every acquisition the way a lost or exhausted surface does.
struct FailingTarget;

impl RenderSurface for FailingTarget {
    fn format(&self) -> wgpu::TextureFormat {
        Offscreen::FORMAT
    }

    fn size(&self) -> (u32, u32) {
        (64, 64)
    }

    fn acquire(&mut self) -> Result<Option<TargetFrame>, SimError> {
        Err(SimError::Frame("out of memory".into()))
    }
}

/// Advertises the offscreen format but hands out frames of another one.
struct MismatchedTarget {
    texture: wgpu::Texture,
}

impl MismatchedTarget {
    fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mismatched target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Bgra8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self { texture }
    }
}

impl RenderSurface for MismatchedTarget {
    fn format(&self) -> wgpu::TextureFormat {
        Offscreen::FORMAT
    }

    fn size(&self) -> (u32, u32) {
        (64, 64)
    }

    fn acquire(&mut self) -> Result<Option<TargetFrame>, SimError> {
        Ok(Some(TargetFrame::from_texture(&self.texture)))
    }
}

// ── initialization ────────────────────────────────────────────────────────

#[test]
fn both_buffers_hold_identical_seeds() {
    let Some(gpu) = gpu() else { return };
    let target = Offscreen::new(gpu.device(), 256, 256);
    let sys = build(&gpu, &target, &seeded(100), &ShaderSources::builtin()).unwrap();

    let a = read(&gpu, &sys, Slot::A);
    let b = read(&gpu, &sys, Slot::B);
    assert_eq!(a.len(), 100);
    assert_eq!(a, b);
    for p in &a {
        assert_eq!(p.position, [500.0, 500.0]);
        let s = p.speed();
        assert!(s >= 50.0 - 1e-3 && s < 200.0 + 1e-3, "speed {s}");
    }
}

#[test]
fn inverted_speed_range_is_a_configuration_error() {
    let Some(gpu) = gpu() else { return };
    let target = Offscreen::new(gpu.device(), 64, 64);
    let config = SimulationConfig {
        min_speed: 300.0,
        max_speed: 50.0,
        ..Default::default()
    };
    let err = build(&gpu, &target, &config, &ShaderSources::builtin()).err();
    assert!(matches!(err, Some(SimError::Configuration(_))), "{err:?}");
}

#[test]
fn broken_update_source_reports_the_stage() {
    let Some(gpu) = gpu() else { return };
    let target = Offscreen::new(gpu.device(), 64, 64);
    let mut sources = ShaderSources::builtin();
    sources.set(shaders::UPDATE, "fn broken(".to_string());

    match build(&gpu, &target, &seeded(8), &sources) {
        Err(SimError::ShaderCompile { stage, diagnostic }) => {
            assert_eq!(stage, shaders::UPDATE);
            assert!(!diagnostic.is_empty());
        }
        other => panic!("expected a compile error, got {:?}", other.err()),
    }
}

#[test]
fn renamed_capture_member_fails_to_link() {
    let Some(gpu) = gpu() else { return };
    let target = Offscreen::new(gpu.device(), 64, 64);
    let mut sources = ShaderSources::builtin();
    let renamed = sources.update.replace("v_Velocity", "v_Heading");
    sources.set(shaders::UPDATE, renamed);

    let err = build(&gpu, &target, &seeded(8), &sources).err();
    assert!(matches!(err, Some(SimError::ProgramLink { .. })), "{err:?}");
}

#[test]
fn particle_count_beyond_one_dispatch_is_rejected_at_setup() {
    let Some(gpu) = gpu() else { return };
    let target = Offscreen::new(gpu.device(), 64, 64);
    let limits = gpu.device().limits();
    let count = limits.max_compute_workgroups_per_dimension * 64 + 1;

    let err = build(&gpu, &target, &seeded(count), &ShaderSources::builtin()).err();
    assert!(matches!(err, Some(SimError::DeviceCapability(_))), "{err:?}");
}

#[test]
fn pipeline_binding_mismatch_is_a_link_error() {
    let Some(gpu) = gpu() else { return };
    let target = Offscreen::new(gpu.device(), 64, 64);
    let mut sources = ShaderSources::builtin();
    // Valid WGSL, but binding 3 is missing from the pass's bind group layout.
    let moved = sources.update.replace(
        "@group(2) @binding(1) var u_RgNoise",
        "@group(2) @binding(3) var u_RgNoise",
    );
    assert_ne!(moved, sources.update);
    sources.set(shaders::UPDATE, moved);

    let err = build(&gpu, &target, &seeded(8), &sources).err();
    assert!(matches!(err, Some(SimError::ProgramLink { .. })), "{err:?}");
}

// ── stepping ──────────────────────────────────────────────────────────────

#[test]
fn zero_delta_ticks_leave_particles_unchanged() {
    let Some(gpu) = gpu() else { return };
    let mut target = Offscreen::new(gpu.device(), 256, 256);
    let mut sys = build(&gpu, &target, &seeded(100), &ShaderSources::builtin()).unwrap();
    let seeds = read(&gpu, &sys, Slot::A);

    // First tick: no previous timestamp.
    tick(&gpu, &mut sys, &mut target, 1000.0);
    assert_eq!(read(&gpu, &sys, Slot::B), seeds);

    // Second tick: a 700 ms stall.
    tick(&gpu, &mut sys, &mut target, 1700.0);
    assert_eq!(read(&gpu, &sys, Slot::A), seeds);
    assert_eq!(sys.state().elapsed_ms(), 0.0);
}

#[test]
fn roles_alternate_once_per_tick() {
    let Some(gpu) = gpu() else { return };
    let mut target = Offscreen::new(gpu.device(), 128, 128);
    let mut sys = build(&gpu, &target, &seeded(64), &ShaderSources::builtin()).unwrap();

    for n in 1..=5u64 {
        let report = sys
            .tick(gpu.device(), gpu.queue(), &mut target, n as f64 * 16.0, FrameInputs::default())
            .unwrap();
        assert_eq!(report.tick, n);
        let expected = if n % 2 == 1 { BufferRoles::BReads } else { BufferRoles::AReads };
        assert_eq!(report.roles, expected);
        assert_ne!(report.roles.read(), report.roles.write());
    }
}

#[test]
fn moving_particles_stay_in_the_field_and_speed_bounds() {
    let Some(gpu) = gpu() else { return };
    let mut target = Offscreen::new(gpu.device(), 200, 200);
    let config = SimulationConfig {
        reference_field: [200.0, 200.0],
        ..seeded(256)
    };
    let mut sys = build(&gpu, &target, &config, &ShaderSources::builtin()).unwrap();
    let seeds = read(&gpu, &sys, Slot::A);

    for frame in 0..60 {
        tick(&gpu, &mut sys, &mut target, frame as f64 * 16.0);
    }

    let now = sys.read_particles(gpu.device(), gpu.queue()).unwrap();
    assert_ne!(now, seeds);
    for p in &now {
        let [x, y] = p.position;
        assert!((0.0..=200.0).contains(&x) && (0.0..=200.0).contains(&y), "{p:?}");
        let s = p.speed();
        assert!(s >= 50.0 - 0.1 && s <= 200.0 + 0.1, "speed {s}");
    }
}

#[test]
fn zero_size_target_skips_rendering_but_still_swaps() {
    let Some(gpu) = gpu() else { return };
    let mut target = Offscreen::new(gpu.device(), 0, 0);
    let mut sys = build(&gpu, &target, &seeded(16), &ShaderSources::builtin()).unwrap();

    let report = sys
        .tick(gpu.device(), gpu.queue(), &mut target, 0.0, FrameInputs::default())
        .unwrap();
    assert!(!report.rendered);
    assert_eq!(report.roles, BufferRoles::BReads);
}

#[test]
fn fatal_acquisition_is_a_frame_error_and_still_swaps() {
    let Some(gpu) = gpu() else { return };
    let offscreen = Offscreen::new(gpu.device(), 64, 64);
    let mut sys = build(&gpu, &offscreen, &seeded(16), &ShaderSources::builtin()).unwrap();

    let res = sys.tick(gpu.device(), gpu.queue(), &mut FailingTarget, 0.0, FrameInputs::default());
    assert!(matches!(res, Err(SimError::Frame(_))), "{res:?}");
    assert_eq!(sys.state().roles(), BufferRoles::BReads);
    assert_eq!(sys.state().ticks(), 1);
}

#[test]
fn device_errors_during_a_tick_come_back_as_frame_errors() {
    let Some(gpu) = gpu() else { return };
    let mut offscreen = Offscreen::new(gpu.device(), 64, 64);
    let mut sys = build(&gpu, &offscreen, &seeded(16), &ShaderSources::builtin()).unwrap();
    let mut mismatched = MismatchedTarget::new(gpu.device());

    let res = sys.tick(gpu.device(), gpu.queue(), &mut mismatched, 0.0, FrameInputs::default());
    assert!(matches!(res, Err(SimError::Frame(_))), "{res:?}");
    assert_eq!(sys.state().roles(), BufferRoles::BReads);
    assert_eq!(sys.state().ticks(), 1);

    // The next tick against a compatible target proceeds normally.
    tick(&gpu, &mut sys, &mut offscreen, 16.0);
    assert_eq!(sys.state().roles(), BufferRoles::AReads);
}

// ── rendering ─────────────────────────────────────────────────────────────

#[test]
fn sprites_are_drawn_on_a_black_background() {
    let Some(gpu) = gpu() else { return };
    let mut target = Offscreen::new(gpu.device(), 64, 64);
    let config = SimulationConfig {
        reference_field: [64.0, 64.0],
        particle_size: 0.1,
        ..seeded(32)
    };
    let mut sys = build(&gpu, &target, &config, &ShaderSources::builtin()).unwrap();

    // The first tick draws the seeds: every sprite centred on the field.
    tick(&gpu, &mut sys, &mut target, 0.0);
    let pixels = target.read_pixels(gpu.device(), gpu.queue()).unwrap();
    assert_eq!(pixels.len(), 64 * 64 * 4);

    let px = |x: usize, y: usize| &pixels[(y * 64 + x) * 4..(y * 64 + x) * 4 + 3];
    assert!(px(32, 32).iter().any(|&c| c > 0), "centre is black");
    assert_eq!(px(0, 0), [0, 0, 0]);
}

#[test]
fn render_draws_the_buffer_the_update_read() {
    let Some(gpu) = gpu() else { return };
    let mut target = Offscreen::new(gpu.device(), 256, 256);
    let config = SimulationConfig {
        reference_field: [256.0, 256.0],
        particle_size: 0.02,
        min_speed: 100.0,
        max_speed: 100.0,
        ..seeded(1)
    };
    let mut sys = build(&gpu, &target, &config, &ShaderSources::builtin()).unwrap();

    // Δt = 0: both buffers still hold the centred seed.
    tick(&gpu, &mut sys, &mut target, 0.0);
    // Reads A at the centre and captures B 40 px away.
    tick(&gpu, &mut sys, &mut target, 400.0);

    let drawn = read(&gpu, &sys, Slot::A)[0].position;
    let captured = read(&gpu, &sys, Slot::B)[0].position;
    assert_eq!(drawn, [128.0, 128.0]);
    let (dx, dy) = (captured[0] - drawn[0], captured[1] - drawn[1]);
    assert!((dx * dx + dy * dy).sqrt() > 30.0, "captured {captured:?}");

    let pixels = target.read_pixels(gpu.device(), gpu.queue()).unwrap();
    let lit = |[x, y]: [f32; 2]| {
        let i = (y as usize * 256 + x as usize) * 4;
        pixels[i..i + 3].iter().any(|&c| c > 0)
    };
    assert!(lit(drawn), "pre-update position is dark");
    assert!(!lit(captured), "captured position was drawn");
}
