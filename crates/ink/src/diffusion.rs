//! Implicit viscous diffusion of the velocity field.
//!
//! Solves (I - a * Laplacian) v_new = v with Jacobi relaxation, where
//! a = viscosity * dt / dx^2. Cells that received a force this step relax
//! with a reduced coefficient so freshly injected momentum survives the
//! frame it was deposited in.

use glam::Vec3;
use rayon::prelude::*;

use crate::grid::VelocityGrid;

/// Diffuse `grid.velocity` in place.
///
/// The incoming field is committed to the old-velocity arena and serves as
/// the right-hand side. Each iteration reads it and the previous iterate and
/// writes into `scratch` (one entry per cell), which is then swapped in.
pub fn diffuse_velocity(
    grid: &mut VelocityGrid,
    scratch: &mut Vec<Vec3>,
    viscosity: f32,
    forced_damping_scale: f32,
    dt: f32,
    iterations: usize,
) {
    let dims = grid.dims;
    grid.store_old_velocities();

    let a = viscosity * dt / (grid.cell_size * grid.cell_size);
    if a <= 0.0 || iterations == 0 {
        return;
    }

    for _ in 0..iterations {
        {
            let current: &[Vec3] = &grid.velocity;
            let source: &[Vec3] = &grid.velocity_old;
            let forced: &[bool] = &grid.force_applied;

            scratch.par_iter_mut().enumerate().for_each(|(idx, out)| {
                let (i, j, k) = dims.coord(idx);
                let a = if forced[idx] { a * forced_damping_scale } else { a };
                let (sum, count) = dims.neighbor_sum(current, i, j, k);
                *out = (source[idx] + sum * a) / (1.0 + a * count as f32);
            });
        }

        std::mem::swap(&mut grid.velocity, scratch);
    }
}
