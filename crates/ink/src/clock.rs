//! The simulation driver: owns the grid, solver and particles and advances
//! them one frame at a time.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::config::{InkConfig, Region, TimestepMode};
use crate::diagnostics::{scan_for_instability, Instability};
use crate::error::{InkError, InkResult};
use crate::forces::{apply_impulse, Impulse};
use crate::grid::VelocityGrid;
use crate::particle::{ParticleSettings, ParticleSystem, ParticleVertex};
use crate::solver::{checked_timestep, FluidSolver, SolveReport, SolverParams};

/// What happened during one [`InkSimulation::step`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// Frame number after this step (1 for the first step).
    pub frame: u64,
    /// Effective timestep.
    pub dt: f32,
    /// Impulses that deposited into at least one cell.
    pub impulses_applied: usize,
    /// Particles respawned during advection.
    pub respawned: usize,
    pub solve: SolveReport,
    /// Set when the post-step scan found non-finite values.
    pub instability: Option<Instability>,
}

/// A complete ink simulation.
pub struct InkSimulation {
    config: InkConfig,
    grid: VelocityGrid,
    solver: FluidSolver,
    particles: ParticleSystem,

    /// Impulses waiting for the next step.
    queue: Vec<Impulse>,
    /// Timed impulses ordered by fire time (ties keep insertion order).
    scheduled: Vec<(f64, Impulse)>,
    sender: Sender<Impulse>,
    receiver: Receiver<Impulse>,

    frame: u64,
    time: f64,
    accumulator: f64,
}

impl InkSimulation {
    /// Build a simulation from a validated config.
    pub fn new(config: InkConfig) -> InkResult<Self> {
        config.validate()?;

        let [nx, ny, nz] = config.resolution;
        let grid = VelocityGrid::new(nx, ny, nz, config.cell_size);
        let solver = FluidSolver::new(&grid, SolverParams::from(&config));
        let mut particles = ParticleSystem::new(
            config.max_particles,
            config.domain(),
            ParticleSettings::from(&config),
        );
        if config.initial_particles > 0 {
            particles.spawn(config.initial_particles, config.spawn_region);
        }
        let (sender, receiver) = mpsc::channel();

        log::debug!(
            "ink simulation: {}x{}x{} cells (h = {}), {} / {} particles",
            nx,
            ny,
            nz,
            config.cell_size,
            particles.len(),
            particles.capacity()
        );

        Ok(Self {
            config,
            grid,
            solver,
            particles,
            queue: Vec::new(),
            scheduled: Vec::new(),
            sender,
            receiver,
            frame: 0,
            time: 0.0,
            accumulator: 0.0,
        })
    }

    // ========== Input ==========

    /// Queue an impulse for the next step.
    pub fn enqueue(&mut self, impulse: Impulse) {
        self.queue.push(impulse);
    }

    /// A sender other threads can use to submit impulses. Anything sent is
    /// picked up at the start of the next step.
    pub fn impulse_sender(&self) -> Sender<Impulse> {
        self.sender.clone()
    }

    /// Fire `impulse` on the first step that reaches simulated time `at_time`.
    pub fn schedule(&mut self, impulse: Impulse, at_time: f64) {
        if !at_time.is_finite() {
            log::warn!("ignoring impulse scheduled at non-finite time {}", at_time);
            return;
        }
        let at = self.scheduled.partition_point(|(t, _)| *t <= at_time);
        self.scheduled.insert(at, (at_time, impulse));
    }

    /// Number of impulses waiting in the queue (channel not included).
    pub fn pending_impulses(&self) -> usize {
        self.queue.len()
    }

    /// Spawn extra particles inside `region`; returns how many fit.
    pub fn spawn_particles(&mut self, n: usize, region: Region) -> usize {
        self.particles.spawn(n, region)
    }

    // ========== Stepping ==========

    /// Advance the simulation by `dt` seconds.
    ///
    /// An invalid `dt` skips the frame: the error is returned and queued
    /// impulses stay queued.
    pub fn step(&mut self, dt: f32) -> InkResult<StepReport> {
        self.queue.extend(self.receiver.try_iter());

        let dt = match checked_timestep(dt, self.config.max_timestep) {
            Ok((dt, _)) => dt,
            Err(err) => {
                log::warn!("skipping frame {}: {}", self.frame + 1, err);
                return Err(err);
            }
        };

        let mut impulses_applied = 0;
        for impulse in self.queue.drain(..) {
            if apply_impulse(&mut self.grid, &impulse) > 0 {
                impulses_applied += 1;
            }
        }

        let horizon = self.time + f64::from(dt);
        let due = self.scheduled.partition_point(|(t, _)| *t <= horizon);
        for (_, impulse) in self.scheduled.drain(..due) {
            if apply_impulse(&mut self.grid, &impulse) > 0 {
                impulses_applied += 1;
            }
        }

        let solve = self.solver.step(&mut self.grid, dt)?;
        let respawned = self.particles.advect(&self.grid, solve.dt);

        self.frame += 1;
        self.time += f64::from(solve.dt);

        let instability =
            scan_for_instability(&self.grid, &self.particles, self.config.diagnostic_stride);
        if let Some(report) = &instability {
            log::warn!(
                "frame {}: numerical instability ({} of {} sampled cells, {} particles non-finite)",
                self.frame,
                report.non_finite_cells,
                report.cells_checked,
                report.non_finite_particles
            );
        }

        log::debug!(
            "frame {}: dt={:.4} impulses={} respawned={} div {:.3e} -> {:.3e}",
            self.frame,
            solve.dt,
            impulses_applied,
            respawned,
            solve.divergence_before,
            solve.divergence_after
        );

        Ok(StepReport {
            frame: self.frame,
            dt: solve.dt,
            impulses_applied,
            respawned,
            solve,
            instability,
        })
    }

    /// Advance by one frame of wall-clock time according to the configured
    /// [`TimestepMode`]. Returns the number of steps taken.
    pub fn advance(&mut self, frame_time: f32) -> InkResult<usize> {
        match self.config.timestep {
            TimestepMode::Variable => self.step(frame_time).map(|_| 1),
            TimestepMode::Fixed { dt, max_substeps } => {
                if !(frame_time.is_finite() && frame_time >= 0.0) {
                    log::warn!("skipping frame with invalid frame time {}", frame_time);
                    return Err(InkError::InvalidTimestep { dt: frame_time });
                }

                self.accumulator += f64::from(frame_time);
                let step_dt = f64::from(dt);
                let mut steps = 0;
                while self.accumulator >= step_dt && steps < max_substeps {
                    self.step(dt)?;
                    self.accumulator -= step_dt;
                    steps += 1;
                }

                if self.accumulator >= step_dt {
                    log::debug!(
                        "dropping {:.4}s of simulation backlog after {} substeps",
                        self.accumulator,
                        steps
                    );
                    self.accumulator %= step_dt;
                }
                Ok(steps)
            }
        }
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &InkConfig {
        &self.config
    }

    pub fn grid(&self) -> &VelocityGrid {
        &self.grid
    }

    /// Direct grid access for hosts that deposit forces themselves.
    pub fn grid_mut(&mut self) -> &mut VelocityGrid {
        &mut self.grid
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleSystem {
        &mut self.particles
    }

    /// Live particles as renderer records.
    pub fn snapshot(&self) -> Vec<ParticleVertex> {
        self.particles.snapshot()
    }

    /// Number of completed steps.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated seconds.
    pub fn time(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{IVec3, Vec3};

    fn small_config() -> InkConfig {
        let mut config = InkConfig::with_grid(8, 8, 8, 0.125);
        config.max_particles = 64;
        config.initial_particles = 16;
        config
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let mut config = small_config();
        config.cell_size = -1.0;
        assert!(matches!(InkSimulation::new(config), Err(InkError::InvalidConfig(_))));
    }

    #[test]
    fn test_new_seeds_initial_particles() {
        let sim = InkSimulation::new(small_config()).unwrap();
        assert_eq!(sim.particles().len(), 16);
        assert_eq!(sim.snapshot().len(), 16);
        assert_eq!(sim.frame(), 0);
    }

    #[test]
    fn test_step_applies_queue() {
        let mut sim = InkSimulation::new(small_config()).unwrap();
        sim.enqueue(Impulse::new(Vec3::splat(0.5), Vec3::X, 1.0, 0.2));
        sim.enqueue(Impulse::new(Vec3::splat(0.5), Vec3::X, 0.0, 0.2));

        let report = sim.step(1.0 / 60.0).unwrap();
        assert_eq!(report.frame, 1);
        assert_eq!(report.impulses_applied, 1);
        assert_eq!(sim.pending_impulses(), 0);
        assert!(sim.time() > 0.0);
        assert!(report.instability.is_none());
    }

    #[test]
    fn test_invalid_dt_keeps_queue() {
        let mut sim = InkSimulation::new(small_config()).unwrap();
        sim.enqueue(Impulse::new(Vec3::splat(0.5), Vec3::Y, 1.0, 0.2));

        assert_eq!(sim.step(-1.0), Err(InkError::InvalidTimestep { dt: -1.0 }));
        assert_eq!(sim.pending_impulses(), 1);
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn test_sender_from_other_thread() {
        let mut sim = InkSimulation::new(small_config()).unwrap();
        let sender = sim.impulse_sender();
        std::thread::spawn(move || {
            sender
                .send(Impulse::new(Vec3::splat(0.5), Vec3::Z, 1.0, 0.2))
                .unwrap();
        })
        .join()
        .unwrap();

        let report = sim.step(1.0 / 60.0).unwrap();
        assert_eq!(report.impulses_applied, 1);
    }

    #[test]
    fn test_scheduled_impulse_fires_on_time() {
        let mut config = small_config();
        config.max_timestep = 0.1;
        let mut sim = InkSimulation::new(config).unwrap();
        sim.schedule(Impulse::new(Vec3::splat(0.5), Vec3::X, 1.0, 0.2), 0.25);

        assert_eq!(sim.step(0.1).unwrap().impulses_applied, 0);
        assert_eq!(sim.step(0.1).unwrap().impulses_applied, 0);
        assert_eq!(sim.step(0.1).unwrap().impulses_applied, 1);
        assert_eq!(sim.step(0.1).unwrap().impulses_applied, 0);
    }

    #[test]
    fn test_fixed_timestep_accumulates() {
        let mut config = small_config();
        config.timestep = TimestepMode::Fixed {
            dt: 0.01,
            max_substeps: 3,
        };
        let mut sim = InkSimulation::new(config).unwrap();

        assert_eq!(sim.advance(0.005).unwrap(), 0);
        assert_eq!(sim.advance(0.0051).unwrap(), 1);
        // Backlog beyond max_substeps is dropped
        assert_eq!(sim.advance(1.0).unwrap(), 3);
        assert_eq!(sim.frame(), 4);
        assert!(sim.advance(f32::NAN).is_err());
    }

    #[test]
    fn test_variable_timestep() {
        let mut config = small_config();
        config.timestep = TimestepMode::Variable;
        let mut sim = InkSimulation::new(config).unwrap();
        assert_eq!(sim.advance(0.02).unwrap(), 1);
        assert!(sim.advance(0.0).is_err());
    }

    #[test]
    fn test_grid_mut_deposits_survive_into_step() {
        let mut sim = InkSimulation::new(small_config()).unwrap();
        sim.grid_mut().deposit(IVec3::splat(4), Vec3::new(0.0, 2.0, 0.0));
        sim.step(1.0 / 60.0).unwrap();
        assert!(sim.grid().velocity().iter().any(|v| v.y != 0.0));
    }
}
