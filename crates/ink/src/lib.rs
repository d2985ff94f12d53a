//! Ink: a 3D grid fluid solver that carries a cloud of dye particles.
//!
//! Velocity lives on a collocated grid. Each step applies pending force
//! impulses, then runs self-advection, diffusion, vorticity confinement and
//! pressure projection. Particles then blend their own velocity with the
//! sampled grid velocity, fade with age and respawn in the spawn region
//! when they leave the domain.
//!
//! ```
//! use ink::{Impulse, InkConfig, InkSimulation, Vec3};
//!
//! let mut config = InkConfig::with_grid(16, 16, 16, 1.0 / 16.0);
//! config.max_particles = 256;
//! config.initial_particles = 128;
//!
//! let mut sim = InkSimulation::new(config)?;
//! sim.enqueue(Impulse::new(Vec3::splat(0.5), Vec3::Y, 2.0, 0.15));
//! let report = sim.step(1.0 / 60.0)?;
//!
//! assert_eq!(report.frame, 1);
//! assert_eq!(sim.snapshot().len(), 128);
//! # Ok::<(), ink::InkError>(())
//! ```

pub mod advection;
pub mod clock;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod diffusion;
pub mod error;
pub mod forces;
pub mod grid;
pub mod kernels;
pub mod particle;
pub mod pressure;
pub mod serde_utils;
pub mod solver;
pub mod vorticity;

pub use clock::{InkSimulation, StepReport};
pub use config::{InkConfig, Region, TimestepMode};
pub use diagnostics::{GridStats, Instability};
pub use error::{InkError, InkResult};
pub use forces::{apply_impulse, DragTracker, Impulse};
pub use grid::{Cell, GridDims, VelocityGrid};
pub use particle::{Particle, ParticleSettings, ParticleSystem, ParticleVertex};
pub use solver::{FluidSolver, SolveReport, SolverParams};

// Re-export glam types for convenience
pub use glam::{IVec3, Vec3, Vec4};
