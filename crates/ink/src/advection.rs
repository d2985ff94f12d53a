//! Advection: the velocity field through itself, and particles through the
//! velocity field.

use glam::Vec3;
use rayon::prelude::*;

use crate::grid::VelocityGrid;
use crate::particle::ParticleSystem;

/// Semi-Lagrangian self-advection of the grid velocity.
///
/// Every cell traces its center back by `velocity * dt` and takes the
/// trilinearly sampled velocity found there. Results go to `scratch`, which
/// is swapped in afterwards.
pub fn advect_velocity(grid: &mut VelocityGrid, scratch: &mut Vec<Vec3>, dt: f32) {
    {
        let source = &*grid;
        scratch.par_iter_mut().enumerate().for_each(|(idx, out)| {
            let (i, j, k) = source.dims.coord(idx);
            let back = source.cell_center(i, j, k) - source.velocity[idx] * dt;
            *out = source.sample(back);
        });
    }

    std::mem::swap(&mut grid.velocity, scratch);
}

impl ParticleSystem {
    /// Move every live particle through the grid for one step.
    ///
    /// Per particle: blend own velocity with the sampled grid velocity by
    /// `inertia`, integrate with explicit Euler, age and fade. Particles that
    /// leave the domain, go non-finite or outlive `max_age` respawn in the
    /// configured spawn region. Each slot only touches itself, so the pass
    /// runs in parallel. Returns the number of respawns.
    pub fn advect(&mut self, grid: &VelocityGrid, dt: f32) -> usize {
        let settings = &self.settings;
        let domain = self.domain;
        let inertia = settings.inertia;
        let spawn_region = settings
            .spawn_region
            .intersect(&domain)
            .unwrap_or(domain);

        self.slots
            .par_iter_mut()
            .enumerate()
            .filter(|(_, p)| p.alive)
            .map(|(slot, p)| {
                let ambient = grid.sample(p.position);
                p.velocity = p.velocity * inertia + ambient * (1.0 - inertia);
                p.position += p.velocity * dt;
                p.age += dt;

                let escaped = !p.position.is_finite()
                    || !p.velocity.is_finite()
                    || !domain.contains(p.position);

                if escaped || settings.expired(p) {
                    let generation = p.generation.wrapping_add(1);
                    *p = settings.spawn_particle(slot, generation, &spawn_region);
                    1
                } else {
                    settings.apply_fade(p);
                    0
                }
            })
            .sum()
    }
}
