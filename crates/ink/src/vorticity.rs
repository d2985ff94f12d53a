//! Vorticity estimation and confinement.
//!
//! Confinement pushes velocity along N x omega, where N points up the
//! gradient of |omega|. This puts back small-scale swirl that the coarse grid
//! and the diffusion stage smear out.

use glam::Vec3;
use rayon::prelude::*;

use crate::constants::GRADIENT_EPSILON;
use crate::grid::VelocityGrid;

/// Recompute `grid.curl` = curl(velocity).
///
/// Central differences over the 6-neighbourhood, one-sided on boundary cells.
pub fn compute_curl(grid: &mut VelocityGrid) {
    let dims = grid.dims;
    let dx = grid.cell_size;
    let velocity: &[Vec3] = &grid.velocity;

    grid.curl.par_iter_mut().enumerate().for_each(|(idx, curl)| {
        let (i, j, k) = dims.coord(idx);
        let d_dx = dims.difference(velocity, i, j, k, 0, dx);
        let d_dy = dims.difference(velocity, i, j, k, 1, dx);
        let d_dz = dims.difference(velocity, i, j, k, 2, dx);

        *curl = Vec3::new(
            d_dy.z - d_dz.y,
            d_dz.x - d_dx.z,
            d_dx.y - d_dy.x,
        );
    });
}

/// Add the confinement force eps * dx * (N x omega) * dt to the velocity.
///
/// Reads `grid.curl` (from [`compute_curl`]) and writes `curl_magnitude`
/// in a first pass, then updates velocity in a second pass.
pub fn apply_confinement(grid: &mut VelocityGrid, curl_magnitude: &mut [f32], strength: f32, dt: f32) {
    if strength <= 0.0 {
        return;
    }

    let dims = grid.dims;
    let dx = grid.cell_size;

    curl_magnitude
        .par_iter_mut()
        .zip(grid.curl.par_iter())
        .for_each(|(m, c)| *m = c.length());

    let curl: &[Vec3] = &grid.curl;
    let magnitude: &[f32] = curl_magnitude;
    let scale = strength * dx * dt;

    grid.velocity.par_iter_mut().enumerate().for_each(|(idx, vel)| {
        let (i, j, k) = dims.coord(idx);
        let eta = Vec3::new(
            dims.difference(magnitude, i, j, k, 0, dx),
            dims.difference(magnitude, i, j, k, 1, dx),
            dims.difference(magnitude, i, j, k, 2, dx),
        );

        let len = eta.length();
        if len < GRADIENT_EPSILON {
            return;
        }

        let n = eta / len;
        *vel += n.cross(curl[idx]) * scale;
    });
}
