//! Default tuning constants for the ink simulation.
//!
//! The defaults describe a unit cube split into 32³ cells, a particle cloud
//! seeded near the middle of the cube and a dark blue ink that fades out over
//! a few seconds.

/// Default lattice resolution (cells per axis).
pub const DEFAULT_RESOLUTION: [usize; 3] = [32, 32, 32];

/// Default cell edge length in world units (unit cube domain).
pub const DEFAULT_CELL_SIZE: f32 = 1.0 / 32.0;

/// Kinematic viscosity used by the diffusion stage.
pub const DEFAULT_DIFFUSION: f32 = 2.0e-4;

/// Jacobi sweeps spent on implicit diffusion per step.
pub const DEFAULT_DIFFUSION_ITERATIONS: usize = 4;

/// Damping multiplier for cells that received a force deposit this step.
pub const DEFAULT_FORCED_DAMPING_SCALE: f32 = 0.25;

/// Vorticity confinement strength (epsilon).
pub const DEFAULT_CONFINEMENT: f32 = 2.0;

/// Jacobi sweeps spent on the pressure Poisson equation per step.
pub const DEFAULT_PROJECTION_ITERATIONS: usize = 30;

/// Relaxation weight of the pressure Jacobi sweeps.
pub const PRESSURE_JACOBI_WEIGHT: f32 = 2.0 / 3.0;

/// Largest timestep the solver accepts before clamping (seconds).
pub const DEFAULT_MAX_TIMESTEP: f32 = 1.0 / 30.0;

/// Fixed timestep used by [`crate::TimestepMode::Fixed`] by default.
pub const DEFAULT_FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Substep cap per `advance` call in fixed mode.
pub const DEFAULT_MAX_SUBSTEPS: usize = 4;

/// Particle population cap.
pub const DEFAULT_MAX_PARTICLES: usize = 65_536;

/// Weight of a particle's own velocity against the sampled grid velocity.
pub const DEFAULT_INERTIA: f32 = 0.85;

/// Exponential fade rate of particle color (1/s).
pub const DEFAULT_COLOR_DECAY_RATE: f32 = 0.5;

/// Spawn color [R, G, B, A]: dark blue ink.
pub const DEFAULT_SPAWN_COLOR: [f32; 4] = [0.05, 0.1, 0.45, 1.0];

/// Fully faded color [R, G, B, A].
pub const DEFAULT_FADED_COLOR: [f32; 4] = [0.05, 0.1, 0.45, 0.0];

/// Render size of a freshly spawned particle (world units).
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.01;

/// Fraction of the spawn size a fully faded particle keeps.
pub const DEFAULT_MIN_SIZE_FRACTION: f32 = 0.25;

/// Seed for deterministic particle placement.
pub const DEFAULT_SEED: u64 = 0x1_4E4B;

/// Every n-th cell and particle is checked for NaN/Inf after each step.
pub const DEFAULT_DIAGNOSTIC_STRIDE: usize = 7;

/// Below this length a gradient is treated as zero.
pub const GRADIENT_EPSILON: f32 = 1e-5;
