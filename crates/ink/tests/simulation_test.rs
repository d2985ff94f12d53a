//! End-to-end simulation tests
//!
//! Drives `InkSimulation` the way a host would: impulses in, particle
//! snapshots out.

use ink::{
    Impulse, InkConfig, InkError, InkSimulation, ParticleSettings, ParticleSystem, ParticleVertex,
    Region, TimestepMode, Vec3, Vec4,
};

fn config() -> InkConfig {
    let mut config = InkConfig::with_grid(12, 12, 12, 1.0 / 12.0);
    config.max_particles = 512;
    config.initial_particles = 400;
    config
}

fn stir(sim: &mut InkSimulation, frame: usize) {
    let angle = frame as f32 * 0.4;
    sim.enqueue(Impulse::new(
        Vec3::new(0.5 + 0.2 * angle.cos(), 0.5, 0.5 + 0.2 * angle.sin()),
        Vec3::new(-angle.sin(), 0.3, angle.cos()),
        4.0,
        0.2,
    ));
}

/// spawn(1000) on a full capacity-10 system adds nothing.
#[test]
fn test_spawn_beyond_capacity_is_noop() {
    let config = InkConfig::with_grid(4, 4, 4, 1.0);
    let mut particles = ParticleSystem::new(10, config.domain(), ParticleSettings::from(&config));
    let region = config.spawn_region;

    assert_eq!(particles.spawn(10, region), 10);
    assert_eq!(particles.len(), 10);

    assert_eq!(particles.spawn(1000, region), 0);
    assert_eq!(particles.len(), 10);
    assert_eq!(particles.capacity(), 10);
}

/// Particles stay inside the domain however hard the fluid is pushed.
#[test]
fn test_particles_stay_in_domain() {
    let mut config = config();
    config.inertia = 0.2;
    config.max_timestep = 0.1;
    let mut sim = InkSimulation::new(config).unwrap();
    let domain = sim.config().domain();

    for frame in 0..60 {
        stir(&mut sim, frame);
        let report = sim.step(1.0 / 20.0).unwrap();
        assert!(report.instability.is_none());

        for p in sim.particles().particles() {
            assert!(
                domain.contains(p.position),
                "frame {}: particle at {:?} escaped",
                frame,
                p.position
            );
        }
    }
    assert_eq!(sim.particles().len(), 400);
}

/// Fast particles are recycled into the spawn region.
#[test]
fn test_escaping_particles_respawn_at_seed() {
    let mut config = config();
    config.inertia = 1.0;
    config.spawn_velocity = Vec3::new(0.0, 30.0, 0.0);
    config.max_timestep = 0.1;
    let spawn_region = config.spawn_region;
    let mut sim = InkSimulation::new(config).unwrap();

    let report = sim.step(0.1).unwrap();
    assert_eq!(report.respawned, 400);
    for p in sim.particles().particles() {
        assert!(spawn_region.contains(p.position));
        assert_eq!(p.generation, 1);
    }
}

/// Two runs with the same inputs produce identical snapshots.
#[test]
fn test_runs_are_bit_identical() {
    let run = || {
        let mut sim = InkSimulation::new(config()).unwrap();
        for frame in 0..20 {
            stir(&mut sim, frame);
            sim.step(1.0 / 60.0).unwrap();
        }
        (sim.snapshot(), sim.grid().velocity().to_vec())
    };

    let (snap_a, grid_a) = run();
    let (snap_b, grid_b) = run();
    assert_eq!(grid_a, grid_b);
    assert_eq!(
        bytemuck::cast_slice::<ParticleVertex, u8>(&snap_a),
        bytemuck::cast_slice::<ParticleVertex, u8>(&snap_b)
    );
}

/// A rejected frame keeps every queued impulse for the next valid step.
#[test]
fn test_rejected_frame_keeps_state() {
    let mut sim = InkSimulation::new(config()).unwrap();
    sim.step(1.0 / 60.0).unwrap();
    let snapshot = sim.snapshot();

    stir(&mut sim, 0);
    stir(&mut sim, 1);
    for dt in [-1.0, 0.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(sim.step(dt), Err(InkError::InvalidTimestep { .. })));
    }
    assert_eq!(sim.pending_impulses(), 2);
    assert_eq!(sim.frame(), 1);
    assert_eq!(sim.snapshot(), snapshot);

    let report = sim.step(1.0 / 60.0).unwrap();
    assert_eq!(report.impulses_applied, 2);
    assert_eq!(sim.pending_impulses(), 0);
}

/// Oversized dt is clamped, not rejected.
#[test]
fn test_large_dt_is_clamped() {
    let mut sim = InkSimulation::new(config()).unwrap();
    let report = sim.step(5.0).unwrap();
    assert!(report.solve.clamped);
    assert_eq!(report.dt, sim.config().max_timestep);
    assert!((sim.time() - f64::from(sim.config().max_timestep)).abs() < 1e-9);
}

/// Colors fade toward the faded color as particles age.
#[test]
fn test_particles_fade() {
    let mut config = config();
    config.color_decay_rate = 2.0;
    config.spawn_color = Vec4::new(1.0, 0.0, 0.0, 1.0);
    config.faded_color = Vec4::new(0.0, 0.0, 1.0, 0.0);
    let mut sim = InkSimulation::new(config).unwrap();

    for _ in 0..30 {
        sim.step(1.0 / 30.0).unwrap();
    }

    for v in sim.snapshot() {
        assert!(v.color[3] < 1.0);
        assert!(v.color[2] > 0.0);
        assert!(v.age > 0.9);
    }
}

/// Fixed-step mode consumes frame time in whole steps.
#[test]
fn test_fixed_step_advance() {
    let mut config = config();
    config.timestep = TimestepMode::Fixed {
        dt: 1.0 / 120.0,
        max_substeps: 8,
    };
    let mut sim = InkSimulation::new(config).unwrap();

    let mut steps = 0;
    for _ in 0..10 {
        steps += sim.advance(1.0 / 60.0).unwrap();
    }
    // 20 steps, give or take one for float rounding in the accumulator
    assert!((19..=20).contains(&steps), "took {} steps", steps);
    assert_eq!(sim.frame(), steps as u64);
}

/// Spawning through the simulation clips to the domain.
#[test]
fn test_spawn_particles_clips_region() {
    let mut config = config();
    config.initial_particles = 0;
    let mut sim = InkSimulation::new(config).unwrap();

    let added = sim.spawn_particles(64, Region::new(Vec3::splat(0.9), Vec3::splat(3.0)));
    assert_eq!(added, 64);
    let domain = sim.config().domain();
    assert!(sim.particles().particles().all(|p| domain.contains(p.position)));
}

/// Hosts can load a partial JSON config; everything else takes defaults.
#[test]
fn test_partial_json_config() {
    let json = r#"{
        "resolution": [16, 8, 4],
        "cell_size": 0.25,
        "spawn_region": { "min": [1.0, 0.5, 0.25], "max": [2.0, 1.5, 0.75] },
        "spawn_color": [1.0, 0.5, 0.0, 1.0],
        "max_age": 3.0,
        "timestep": { "mode": "variable" }
    }"#;

    let config: InkConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.resolution, [16, 8, 4]);
    assert_eq!(config.spawn_color, Vec4::new(1.0, 0.5, 0.0, 1.0));
    assert_eq!(config.max_age, Some(3.0));
    assert_eq!(config.timestep, TimestepMode::Variable);
    assert_eq!(config.inertia, InkConfig::default().inertia);
    config.validate().unwrap();

    let round_trip: InkConfig =
        serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
    assert_eq!(round_trip, config);
}
