//! Per-step fluid solve over a [`VelocityGrid`].
//!
//! Stage order is fixed:
//! 0. self-advection (optional)
//! 1. diffusion
//! 2. vorticity estimation
//! 3. vorticity confinement
//! 4. projection
//!
//! Every stage is its own set of parallel passes and ends with the no-flux
//! boundary condition. The end of the step commits current velocity into the
//! old-velocity arena and clears the force flags.

use glam::Vec3;

use crate::advection::advect_velocity;
use crate::config::InkConfig;
use crate::diffusion::diffuse_velocity;
use crate::error::{InkError, InkResult};
use crate::grid::VelocityGrid;
use crate::pressure::{
    apply_pressure_gradient, compute_divergence, enforce_boundary_conditions, mean_abs,
    solve_pressure_jacobi,
};
use crate::vorticity::{apply_confinement, compute_curl};

/// Solver tuning, usually derived from [`InkConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct SolverParams {
    pub diffusion: f32,
    pub diffusion_iterations: usize,
    pub forced_damping_scale: f32,
    pub confinement: f32,
    pub projection_iterations: usize,
    pub self_advection: bool,
    pub max_timestep: f32,
}

impl From<&InkConfig> for SolverParams {
    fn from(config: &InkConfig) -> Self {
        Self {
            diffusion: config.diffusion,
            diffusion_iterations: config.diffusion_iterations,
            forced_damping_scale: config.forced_damping_scale,
            confinement: config.confinement,
            projection_iterations: config.projection_iterations,
            self_advection: config.self_advection,
            max_timestep: config.max_timestep,
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self::from(&InkConfig::default())
    }
}

/// Outcome of one solver step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveReport {
    /// Timestep actually used.
    pub dt: f32,
    /// The requested timestep exceeded `max_timestep`.
    pub clamped: bool,
    /// Mean |div v| entering the projection stage.
    pub divergence_before: f32,
    /// Mean |div v| after projection and boundary enforcement.
    pub divergence_after: f32,
}

/// Validate a requested timestep and clamp it to `max_timestep`.
///
/// Returns the effective dt and whether it was clamped.
pub fn checked_timestep(dt: f32, max_timestep: f32) -> InkResult<(f32, bool)> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(InkError::InvalidTimestep { dt });
    }
    if dt > max_timestep {
        Ok((max_timestep, true))
    } else {
        Ok((dt, false))
    }
}

/// Pre-allocated scratch buffers (avoids allocation each frame).
#[derive(Clone, Debug)]
struct SolverBuffers {
    vector_scratch: Vec<Vec3>,
    divergence: Vec<f32>,
    pressure: Vec<f32>,
    pressure_scratch: Vec<f32>,
    curl_magnitude: Vec<f32>,
}

impl SolverBuffers {
    fn new(cell_count: usize) -> Self {
        Self {
            vector_scratch: vec![Vec3::ZERO; cell_count],
            divergence: vec![0.0; cell_count],
            pressure: vec![0.0; cell_count],
            pressure_scratch: vec![0.0; cell_count],
            curl_magnitude: vec![0.0; cell_count],
        }
    }
}

/// Advances a velocity grid one timestep at a time.
#[derive(Clone, Debug)]
pub struct FluidSolver {
    pub params: SolverParams,
    buffers: SolverBuffers,
}

impl FluidSolver {
    /// Create a solver with buffers sized for `grid`.
    pub fn new(grid: &VelocityGrid, params: SolverParams) -> Self {
        Self {
            params,
            buffers: SolverBuffers::new(grid.cell_count()),
        }
    }

    /// Last pressure field computed by the projection stage.
    pub fn pressure(&self) -> &[f32] {
        &self.buffers.pressure
    }

    /// Run one full solve.
    ///
    /// A non-positive or non-finite `dt` is rejected with
    /// [`InkError::InvalidTimestep`] before anything is touched.
    pub fn step(&mut self, grid: &mut VelocityGrid, dt: f32) -> InkResult<SolveReport> {
        let (dt, clamped) = checked_timestep(dt, self.params.max_timestep)?;
        if clamped {
            log::debug!("timestep clamped to {}", dt);
        }

        if self.buffers.divergence.len() != grid.cell_count() {
            self.buffers = SolverBuffers::new(grid.cell_count());
        }
        let params = &self.params;
        let buffers = &mut self.buffers;

        // 0. Self-advection
        if params.self_advection {
            advect_velocity(grid, &mut buffers.vector_scratch, dt);
            enforce_boundary_conditions(grid);
        }

        // 1. Diffusion (forced cells damped less)
        diffuse_velocity(
            grid,
            &mut buffers.vector_scratch,
            params.diffusion,
            params.forced_damping_scale,
            dt,
            params.diffusion_iterations,
        );
        enforce_boundary_conditions(grid);

        // 2. Vorticity estimation
        compute_curl(grid);

        // 3. Vorticity confinement
        apply_confinement(grid, &mut buffers.curl_magnitude, params.confinement, dt);
        enforce_boundary_conditions(grid);

        // 4. Projection
        compute_divergence(grid, &mut buffers.divergence);
        let divergence_before = mean_abs(&buffers.divergence);

        solve_pressure_jacobi(
            grid,
            &buffers.divergence,
            &mut buffers.pressure,
            &mut buffers.pressure_scratch,
            &mut buffers.vector_scratch,
            params.projection_iterations,
        );
        apply_pressure_gradient(grid, &buffers.pressure);
        enforce_boundary_conditions(grid);

        compute_divergence(grid, &mut buffers.divergence);
        let divergence_after = mean_abs(&buffers.divergence);
        log::trace!(
            "projection: mean |div| {:.3e} -> {:.3e}",
            divergence_before,
            divergence_after
        );

        // Commit
        grid.store_old_velocities();
        grid.clear_forces();

        Ok(SolveReport {
            dt,
            clamped,
            divergence_before,
            divergence_after,
        })
    }
}
