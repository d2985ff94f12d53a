//! Property-based tests for the ink simulation using proptest
//!
//! These tests verify invariants hold across random inputs:
//! - Particles never leave the domain
//! - Population never exceeds capacity
//! - Grid and particle state stays finite
//! - Out-of-range deposits never mutate the grid

use ink::{
    apply_impulse, Impulse, InkConfig, InkSimulation, IVec3, ParticleSettings, ParticleSystem,
    Region, Vec3, VelocityGrid,
};
use proptest::prelude::*;

const GRID: usize = 8;
const CELL_SIZE: f32 = 0.125;
const MAX_PARTICLES: usize = 128;
const SIMULATION_STEPS: usize = 12;

fn vec3_in(lo: f32, hi: f32) -> impl Strategy<Value = Vec3> {
    (lo..hi, lo..hi, lo..hi).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

/// Impulses anywhere near the domain, some of them outside it.
fn impulse() -> impl Strategy<Value = Impulse> {
    (vec3_in(-0.5, 1.5), vec3_in(-1.0, 1.0), -20.0f32..20.0, 0.0f32..0.6)
        .prop_map(|(position, direction, magnitude, radius)| {
            Impulse::new(position, direction, magnitude, radius)
        })
}

fn simulation(inertia: f32) -> InkSimulation {
    let mut config = InkConfig::with_grid(GRID, GRID, GRID, CELL_SIZE);
    config.max_particles = MAX_PARTICLES;
    config.initial_particles = MAX_PARTICLES / 2;
    config.inertia = inertia;
    InkSimulation::new(config).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_particles_contained_and_finite(
        impulses in prop::collection::vec(impulse(), SIMULATION_STEPS),
        inertia in 0.0f32..=1.0,
        dt in 0.001f32..0.1,
    ) {
        let mut sim = simulation(inertia);
        let domain = sim.config().domain();

        for impulse in impulses {
            sim.enqueue(impulse);
            let report = sim.step(dt).unwrap();
            prop_assert!(report.instability.is_none());

            for p in sim.particles().particles() {
                prop_assert!(
                    domain.contains(p.position),
                    "particle at {:?} outside {:?}",
                    p.position,
                    domain
                );
                prop_assert!(p.velocity.is_finite());
                prop_assert!(p.color.is_finite());
            }
            prop_assert!(sim.grid().velocity().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_population_never_exceeds_capacity(
        requests in prop::collection::vec((0usize..400, vec3_in(-1.0, 2.0), vec3_in(-1.0, 2.0)), 1..10),
        kills in prop::collection::vec(0usize..MAX_PARTICLES, 0..20),
    ) {
        let config = InkConfig::with_grid(GRID, GRID, GRID, CELL_SIZE);
        let mut particles =
            ParticleSystem::new(MAX_PARTICLES, config.domain(), ParticleSettings::from(&config));

        for (n, a, b) in requests {
            let before = particles.len();
            let added = particles.spawn(n, Region::new(a.min(b), a.max(b)));
            prop_assert!(added <= n);
            prop_assert_eq!(particles.len(), before + added);
            prop_assert!(particles.len() <= particles.capacity());
            prop_assert_eq!(particles.particles().count(), particles.len());

            for &slot in &kills {
                particles.kill(slot);
            }
            prop_assert!(particles.len() <= MAX_PARTICLES);
        }

        for p in particles.particles() {
            prop_assert!(config.domain().contains(p.position));
        }
    }

    #[test]
    fn test_out_of_range_deposit_is_noop(
        x in prop_oneof![-1000i32..0, GRID as i32..1000],
        y in -1000i32..1000,
        z in -1000i32..1000,
        force in vec3_in(-10.0, 10.0),
    ) {
        let mut grid = VelocityGrid::new(GRID, GRID, GRID, CELL_SIZE);
        prop_assert!(!grid.deposit(IVec3::new(x, y, z), force));
        prop_assert!(grid.velocity().iter().all(|v| *v == Vec3::ZERO));
        prop_assert!(grid.force_applied().iter().all(|f| !f));
    }

    #[test]
    fn test_impulse_deposits_stay_finite(impulse in impulse()) {
        let mut grid = VelocityGrid::new(GRID, GRID, GRID, CELL_SIZE);
        let deposits = apply_impulse(&mut grid, &impulse);
        prop_assert!(deposits <= grid.cell_count());
        prop_assert_eq!(
            grid.force_applied().iter().filter(|f| **f).count(),
            deposits
        );
        prop_assert!(grid.velocity().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_sample_is_finite_everywhere(pos in vec3_in(-100.0, 100.0)) {
        let mut grid = VelocityGrid::new(GRID, GRID, GRID, CELL_SIZE);
        apply_impulse(&mut grid, &Impulse::new(Vec3::splat(0.5), Vec3::ONE, 3.0, 0.3));
        let v = grid.sample(pos);
        prop_assert!(v.is_finite());
        prop_assert!(v.length() <= 3.0 + 1e-4);
    }
}
