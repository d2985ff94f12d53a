//! Construction-time configuration.
//!
//! Every field has a default, so hosts can deserialize partial documents
//! (JSON, TOML, RON...) and only override what they care about.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{InkError, InkResult};

/// Axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(with = "crate::serde_utils::vec3")]
    pub min: Vec3,
    #[serde(with = "crate::serde_utils::vec3")]
    pub max: Vec3,
}

impl Region {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Closed containment test. Non-finite points are never contained.
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Overlap of two boxes, or `None` when they do not overlap.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min.cmple(max).all() && min.is_finite() && max.is_finite() {
            Some(Region { min, max })
        } else {
            None
        }
    }

    /// Point at normalized coordinates `u` (each in `[0, 1)`) inside the box.
    #[inline]
    pub fn point_at(&self, u: Vec3) -> Vec3 {
        self.min + (self.max - self.min) * u
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// How [`crate::InkSimulation::advance`] turns wall-clock frame time into
/// solver steps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimestepMode {
    /// One step per frame using the frame time directly.
    Variable,
    /// Accumulate frame time and consume it in steps of `dt`, at most
    /// `max_substeps` per frame.
    Fixed { dt: f32, max_substeps: usize },
}

impl Default for TimestepMode {
    fn default() -> Self {
        TimestepMode::Fixed {
            dt: DEFAULT_FIXED_TIMESTEP,
            max_substeps: DEFAULT_MAX_SUBSTEPS,
        }
    }
}

/// Full simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InkConfig {
    /// Cells along X, Y, Z.
    pub resolution: [usize; 3],
    /// Cell edge length in world units.
    pub cell_size: f32,

    /// Viscosity for the diffusion stage.
    pub diffusion: f32,
    pub diffusion_iterations: usize,
    /// Damping multiplier for cells touched by a force this step (0..=1).
    pub forced_damping_scale: f32,
    /// Vorticity confinement strength.
    pub confinement: f32,
    pub projection_iterations: usize,
    /// Semi-Lagrangian self-advection before diffusion.
    pub self_advection: bool,
    /// Timesteps above this are clamped.
    pub max_timestep: f32,
    pub timestep: TimestepMode,

    /// Particle population cap.
    pub max_particles: usize,
    /// Particles seeded into `spawn_region` at construction.
    pub initial_particles: usize,
    /// 0 = particles follow the grid exactly, 1 = grid is ignored.
    pub inertia: f32,
    pub spawn_region: Region,
    #[serde(with = "crate::serde_utils::vec3")]
    pub spawn_velocity: Vec3,
    #[serde(with = "crate::serde_utils::rgba")]
    pub spawn_color: Vec4,
    #[serde(with = "crate::serde_utils::rgba")]
    pub faded_color: Vec4,
    /// Fade rate (1/s). Zero keeps the spawn color forever.
    pub color_decay_rate: f32,
    pub particle_size: f32,
    pub min_size_fraction: f32,
    /// Particles older than this respawn. `None` = immortal.
    pub max_age: Option<f32>,
    pub seed: u64,

    /// NaN/Inf scan stride over cells and particles. Zero disables the scan.
    pub diagnostic_stride: usize,
}

impl Default for InkConfig {
    fn default() -> Self {
        let extent = Vec3::new(
            DEFAULT_RESOLUTION[0] as f32,
            DEFAULT_RESOLUTION[1] as f32,
            DEFAULT_RESOLUTION[2] as f32,
        ) * DEFAULT_CELL_SIZE;

        Self {
            resolution: DEFAULT_RESOLUTION,
            cell_size: DEFAULT_CELL_SIZE,
            diffusion: DEFAULT_DIFFUSION,
            diffusion_iterations: DEFAULT_DIFFUSION_ITERATIONS,
            forced_damping_scale: DEFAULT_FORCED_DAMPING_SCALE,
            confinement: DEFAULT_CONFINEMENT,
            projection_iterations: DEFAULT_PROJECTION_ITERATIONS,
            self_advection: true,
            max_timestep: DEFAULT_MAX_TIMESTEP,
            timestep: TimestepMode::default(),
            max_particles: DEFAULT_MAX_PARTICLES,
            initial_particles: 0,
            inertia: DEFAULT_INERTIA,
            spawn_region: Region::new(extent * 0.45, extent * 0.55),
            spawn_velocity: Vec3::ZERO,
            spawn_color: Vec4::from_array(DEFAULT_SPAWN_COLOR),
            faded_color: Vec4::from_array(DEFAULT_FADED_COLOR),
            color_decay_rate: DEFAULT_COLOR_DECAY_RATE,
            particle_size: DEFAULT_PARTICLE_SIZE,
            min_size_fraction: DEFAULT_MIN_SIZE_FRACTION,
            max_age: None,
            seed: DEFAULT_SEED,
            diagnostic_stride: DEFAULT_DIAGNOSTIC_STRIDE,
        }
    }
}

impl InkConfig {
    /// Config for a `nx × ny × nz` grid of `cell_size` cells, spawn region
    /// centred in the domain, everything else default.
    pub fn with_grid(nx: usize, ny: usize, nz: usize, cell_size: f32) -> Self {
        let extent = Vec3::new(nx as f32, ny as f32, nz as f32) * cell_size;
        Self {
            resolution: [nx, ny, nz],
            cell_size,
            spawn_region: Region::new(extent * 0.45, extent * 0.55),
            ..Self::default()
        }
    }

    /// World-space bounding box of the grid.
    pub fn domain(&self) -> Region {
        let [nx, ny, nz] = self.resolution;
        Region::new(
            Vec3::ZERO,
            Vec3::new(nx as f32, ny as f32, nz as f32) * self.cell_size,
        )
    }

    pub fn validate(&self) -> InkResult<()> {
        fn fail<T>(msg: String) -> InkResult<T> {
            Err(InkError::InvalidConfig(msg))
        }

        if self.resolution.iter().any(|&n| n == 0) {
            return fail(format!("resolution must be non-zero, got {:?}", self.resolution));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return fail(format!("cell_size must be positive, got {}", self.cell_size));
        }
        if !(self.max_timestep.is_finite() && self.max_timestep > 0.0) {
            return fail(format!("max_timestep must be positive, got {}", self.max_timestep));
        }
        for (name, value) in [
            ("diffusion", self.diffusion),
            ("confinement", self.confinement),
            ("color_decay_rate", self.color_decay_rate),
            ("particle_size", self.particle_size),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return fail(format!("{} must be non-negative, got {}", name, value));
            }
        }
        for (name, value) in [
            ("inertia", self.inertia),
            ("forced_damping_scale", self.forced_damping_scale),
            ("min_size_fraction", self.min_size_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return fail(format!("{} must be in [0, 1], got {}", name, value));
            }
        }
        if let Some(max_age) = self.max_age {
            if !(max_age.is_finite() && max_age > 0.0) {
                return fail(format!("max_age must be positive, got {}", max_age));
            }
        }
        if let TimestepMode::Fixed { dt, max_substeps } = self.timestep {
            if !(dt.is_finite() && dt > 0.0) || max_substeps == 0 {
                return fail(format!(
                    "fixed timestep needs dt > 0 and max_substeps > 0, got dt={} max_substeps={}",
                    dt, max_substeps
                ));
            }
            if dt > self.max_timestep {
                return fail(format!(
                    "fixed timestep {} exceeds max_timestep {}",
                    dt, self.max_timestep
                ));
            }
        }
        if self.initial_particles > self.max_particles {
            return fail(format!(
                "initial_particles ({}) exceeds max_particles ({})",
                self.initial_particles, self.max_particles
            ));
        }
        if !self.spawn_region.size().cmpgt(Vec3::ZERO).all() {
            return fail(format!("spawn_region {:?} has zero volume", self.spawn_region));
        }
        match self.spawn_region.intersect(&self.domain()) {
            Some(region) if region == self.spawn_region => Ok(()),
            _ => fail(format!(
                "spawn_region {:?} must lie inside the domain {:?}",
                self.spawn_region,
                self.domain()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        InkConfig::default().validate().unwrap();
    }

    #[test]
    fn test_domain_extent() {
        let config = InkConfig::with_grid(8, 4, 2, 0.5);
        let domain = config.domain();
        assert_eq!(domain.min, Vec3::ZERO);
        assert_eq!(domain.max, Vec3::new(4.0, 2.0, 1.0));
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let config = InkConfig::with_grid(0, 4, 4, 1.0);
        assert!(matches!(config.validate(), Err(InkError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inertia_out_of_range() {
        let config = InkConfig {
            inertia: 1.5,
            ..InkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_spawn_region_outside_domain() {
        let mut config = InkConfig::with_grid(4, 4, 4, 1.0);
        config.spawn_region = Region::new(Vec3::splat(3.0), Vec3::splat(5.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_flat_spawn_region() {
        let mut config = InkConfig::with_grid(4, 4, 4, 1.0);
        config.spawn_region = Region::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 1.0, 2.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_fixed_step_above_max_timestep() {
        let mut config = InkConfig::with_grid(4, 4, 4, 1.0);
        config.max_timestep = 1.0 / 60.0;
        config.timestep = TimestepMode::Fixed {
            dt: 1.0 / 30.0,
            max_substeps: 2,
        };
        assert!(matches!(config.validate(), Err(InkError::InvalidConfig(_))));

        config.max_timestep = 1.0 / 30.0;
        config.validate().unwrap();
    }

    #[test]
    fn test_region_intersect() {
        let a = Region::new(Vec3::ZERO, Vec3::splat(2.0));
        let b = Region::new(Vec3::ONE, Vec3::splat(3.0));
        assert_eq!(a.intersect(&b), Some(Region::new(Vec3::ONE, Vec3::splat(2.0))));

        let far = Region::new(Vec3::splat(5.0), Vec3::splat(6.0));
        assert_eq!(a.intersect(&far), None);
    }

    #[test]
    fn test_region_contains_rejects_nan() {
        let a = Region::new(Vec3::ZERO, Vec3::ONE);
        assert!(a.contains(Vec3::splat(0.5)));
        assert!(a.contains(Vec3::ONE));
        assert!(!a.contains(Vec3::new(f32::NAN, 0.5, 0.5)));
    }
}
