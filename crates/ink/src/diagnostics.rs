//! Health checks and summary statistics.
//!
//! All reductions here are sequential so repeated runs produce bit-identical
//! numbers regardless of thread count.

use glam::Vec3;

use crate::grid::VelocityGrid;
use crate::particle::ParticleSystem;
use crate::pressure::{compute_divergence, mean_abs};

/// Non-finite values found by [`scan_for_instability`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instability {
    pub non_finite_cells: usize,
    pub non_finite_particles: usize,
    /// Cells inspected by the scan (the scan is strided).
    pub cells_checked: usize,
}

/// Look for NaN/Inf in every `stride`-th cell and particle slot.
///
/// Returns `None` when nothing non-finite was seen or `stride` is zero.
pub fn scan_for_instability(
    grid: &VelocityGrid,
    particles: &ParticleSystem,
    stride: usize,
) -> Option<Instability> {
    if stride == 0 {
        return None;
    }

    let mut cells_checked = 0;
    let mut non_finite_cells = 0;
    for v in grid.velocity().iter().step_by(stride) {
        cells_checked += 1;
        if !v.is_finite() {
            non_finite_cells += 1;
        }
    }

    let non_finite_particles = particles
        .slots()
        .iter()
        .step_by(stride)
        .filter(|p| p.alive && !(p.position.is_finite() && p.velocity.is_finite()))
        .count();

    if non_finite_cells == 0 && non_finite_particles == 0 {
        None
    } else {
        Some(Instability {
            non_finite_cells,
            non_finite_particles,
            cells_checked,
        })
    }
}

/// 0.5 * sum |v|^2 * h^3
pub fn kinetic_energy(grid: &VelocityGrid) -> f32 {
    let volume = grid.cell_size.powi(3);
    0.5 * grid.velocity().iter().map(|v| v.length_squared()).sum::<f32>() * volume
}

/// 0.5 * sum |curl|^2 * h^3, using the curl from the last solve.
pub fn enstrophy(grid: &VelocityGrid) -> f32 {
    let volume = grid.cell_size.powi(3);
    0.5 * grid.curl().iter().map(|w| w.length_squared()).sum::<f32>() * volume
}

pub fn max_speed(grid: &VelocityGrid) -> f32 {
    grid.velocity().iter().map(|v| v.length()).fold(0.0, f32::max)
}

/// Mean |div v| of the current velocity field.
pub fn mean_abs_divergence(grid: &VelocityGrid) -> f32 {
    let mut divergence = vec![0.0; grid.cell_count()];
    compute_divergence(grid, &mut divergence);
    mean_abs(&divergence)
}

/// One-line summary of the grid state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridStats {
    pub kinetic_energy: f32,
    pub enstrophy: f32,
    pub max_speed: f32,
    pub mean_abs_divergence: f32,
    /// Mean velocity over all cells.
    pub mean_velocity: Vec3,
}

impl GridStats {
    pub fn collect(grid: &VelocityGrid) -> Self {
        let n = grid.cell_count().max(1) as f32;
        Self {
            kinetic_energy: kinetic_energy(grid),
            enstrophy: enstrophy(grid),
            max_speed: max_speed(grid),
            mean_abs_divergence: mean_abs_divergence(grid),
            mean_velocity: grid.velocity().iter().copied().sum::<Vec3>() / n,
        }
    }
}
