//! Pressure projection for approximately incompressible flow.
//!
//! Divergence and gradient are both central differences over two cells, and
//! the Poisson operator is exactly their composition, applied matrix-free.
//! Wall cells carry no normal velocity, so the gradient skips them and the
//! divergence mirrors the normal component across the wall.
//!
//! Each Jacobi sweep is two parallel passes (gradient of the current
//! pressure, then the weighted update) writing into separate buffers; the
//! swap between sweeps is the barrier.

use glam::Vec3;
use rayon::prelude::*;

use crate::constants::PRESSURE_JACOBI_WEIGHT;
use crate::grid::{GridDims, VelocityGrid};

/// div(v) = du/dx + dv/dy + dw/dz at (i, j, k)
#[inline]
fn divergence_at(dims: GridDims, field: &[Vec3], i: usize, j: usize, k: usize, dx: f32) -> f32 {
    dims.normal_difference(field, i, j, k, 0, dx)
        + dims.normal_difference(field, i, j, k, 1, dx)
        + dims.normal_difference(field, i, j, k, 2, dx)
}

/// Pressure gradient at (i, j, k). Components normal to a wall are zero on
/// that wall's cells.
#[inline]
fn gradient_at(dims: GridDims, pressure: &[f32], i: usize, j: usize, k: usize, dx: f32) -> Vec3 {
    let scale = 0.5 / dx;
    let mut grad = Vec3::ZERO;
    if !dims.on_boundary(i, j, k, 0) {
        grad.x = (pressure[dims.index(i + 1, j, k)] - pressure[dims.index(i - 1, j, k)]) * scale;
    }
    if !dims.on_boundary(i, j, k, 1) {
        grad.y = (pressure[dims.index(i, j + 1, k)] - pressure[dims.index(i, j - 1, k)]) * scale;
    }
    if !dims.on_boundary(i, j, k, 2) {
        grad.z = (pressure[dims.index(i, j, k + 1)] - pressure[dims.index(i, j, k - 1)]) * scale;
    }
    grad
}

/// Diagonal of -div(grad) at (i, j, k): every adjacent cell that is not a
/// wall cell along the shared axis contributes 1 / (4 dx^2).
#[inline]
fn stencil_diagonal(dims: GridDims, i: usize, j: usize, k: usize, dx: f32) -> f32 {
    let interior_neighbors = |c: usize, n: usize| usize::from(c >= 2) + usize::from(c + 2 < n);
    let count = interior_neighbors(i, dims.width)
        + interior_neighbors(j, dims.height)
        + interior_neighbors(k, dims.depth);
    count as f32 * 0.25 / (dx * dx)
}

/// Compute divergence of the velocity field into `divergence`.
pub fn compute_divergence(grid: &VelocityGrid, divergence: &mut [f32]) {
    let dims = grid.dims;
    let dx = grid.cell_size;
    let velocity: &[Vec3] = &grid.velocity;

    divergence.par_iter_mut().enumerate().for_each(|(idx, div)| {
        let (i, j, k) = dims.coord(idx);
        *div = divergence_at(dims, velocity, i, j, k, dx);
    });
}

/// Solve div(grad(p)) = div(v) with weighted Jacobi iteration.
///
/// `pressure` is reset to zero first. `scratch` and `gradient` must have one
/// entry per cell. Cells with an empty stencil keep zero pressure.
pub fn solve_pressure_jacobi(
    grid: &VelocityGrid,
    divergence: &[f32],
    pressure: &mut Vec<f32>,
    scratch: &mut Vec<f32>,
    gradient: &mut [Vec3],
    iterations: usize,
) {
    let dims = grid.dims;
    let dx = grid.cell_size;

    pressure.fill(0.0);

    for _ in 0..iterations {
        {
            let current: &[f32] = pressure.as_slice();
            gradient.par_iter_mut().enumerate().for_each(|(idx, out)| {
                let (i, j, k) = dims.coord(idx);
                *out = gradient_at(dims, current, i, j, k, dx);
            });
        }
        {
            let current: &[f32] = pressure.as_slice();
            let gradient: &[Vec3] = &*gradient;
            scratch.par_iter_mut().enumerate().for_each(|(idx, out)| {
                let (i, j, k) = dims.coord(idx);
                let diagonal = stencil_diagonal(dims, i, j, k, dx);
                *out = if diagonal > 0.0 {
                    let residual = divergence[idx] - divergence_at(dims, gradient, i, j, k, dx);
                    current[idx] - PRESSURE_JACOBI_WEIGHT * residual / diagonal
                } else {
                    0.0
                };
            });
        }

        // Swap buffers
        std::mem::swap(pressure, scratch);
    }
}

/// Subtract the pressure gradient from the velocity field.
/// v_new = v - grad(p)
pub fn apply_pressure_gradient(grid: &mut VelocityGrid, pressure: &[f32]) {
    let dims = grid.dims;
    let dx = grid.cell_size;

    grid.velocity.par_iter_mut().enumerate().for_each(|(idx, vel)| {
        let (i, j, k) = dims.coord(idx);
        *vel -= gradient_at(dims, pressure, i, j, k, dx);
    });
}

/// Enforce no-flux walls: zero the velocity component normal to each domain
/// face on the cells touching that face.
pub fn enforce_boundary_conditions(grid: &mut VelocityGrid) {
    let dims = grid.dims;

    grid.velocity.par_iter_mut().enumerate().for_each(|(idx, vel)| {
        let (i, j, k) = dims.coord(idx);
        if dims.on_boundary(i, j, k, 0) {
            vel.x = 0.0;
        }
        if dims.on_boundary(i, j, k, 1) {
            vel.y = 0.0;
        }
        if dims.on_boundary(i, j, k, 2) {
            vel.z = 0.0;
        }
    });
}

/// Mean of |divergence| over the lattice. Summed sequentially so the result
/// is reproducible.
pub fn mean_abs(divergence: &[f32]) -> f32 {
    if divergence.is_empty() {
        return 0.0;
    }
    divergence.iter().map(|d| d.abs()).sum::<f32>() / divergence.len() as f32
}
