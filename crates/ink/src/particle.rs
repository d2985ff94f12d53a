//! Ink particles stored in a fixed-capacity slot arena.
//!
//! Slots never move: a particle keeps its slot index for its whole life and
//! across respawns, which is what makes respawn placement a pure function of
//! `(seed, slot, generation)` and parallel advection race-free.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{InkConfig, Region};

/// 32-bit words reserved per placement draw in a slot's ChaCha stream.
const WORDS_PER_DRAW: u128 = 4;

/// A single ink particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// World position
    pub position: Vec3,
    /// Own kinematic velocity (blended with the grid each step)
    pub velocity: Vec3,
    /// RGBA color
    pub color: Vec4,
    /// Render size in world units
    pub size: f32,
    /// Seconds since the last (re)spawn
    pub age: f32,
    /// Placement generation of this slot; bumped on every respawn or kill
    pub generation: u32,
    pub alive: bool,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            color: Vec4::ZERO,
            size: 0.0,
            age: 0.0,
            generation: 0,
            alive: false,
        }
    }
}

/// GPU-friendly particle record handed to the renderer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub size: f32,
    pub velocity: [f32; 3],
    pub age: f32,
    pub color: [f32; 4],
}

impl From<&Particle> for ParticleVertex {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.position.to_array(),
            size: p.size,
            velocity: p.velocity.to_array(),
            age: p.age,
            color: p.color.to_array(),
        }
    }
}

/// Per-particle behaviour shared by spawn, advection and respawn.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSettings {
    pub inertia: f32,
    /// Where respawned particles reappear.
    pub spawn_region: Region,
    pub spawn_velocity: Vec3,
    pub spawn_color: Vec4,
    pub faded_color: Vec4,
    pub color_decay_rate: f32,
    pub size: f32,
    pub min_size_fraction: f32,
    pub max_age: Option<f32>,
    pub seed: u64,
}

impl From<&InkConfig> for ParticleSettings {
    fn from(config: &InkConfig) -> Self {
        Self {
            inertia: config.inertia,
            spawn_region: config.spawn_region,
            spawn_velocity: config.spawn_velocity,
            spawn_color: config.spawn_color,
            faded_color: config.faded_color,
            color_decay_rate: config.color_decay_rate,
            size: config.particle_size,
            min_size_fraction: config.min_size_fraction,
            max_age: config.max_age,
            seed: config.seed,
        }
    }
}

impl ParticleSettings {
    /// Deterministic point in `region` for a slot's n-th spawn.
    ///
    /// Each slot reads its own ChaCha stream at an offset set by the
    /// generation, so the result does not depend on which other slots spawn
    /// or in what order.
    pub fn placement(&self, slot: usize, generation: u32, region: &Region) -> Vec3 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(slot as u64);
        rng.set_word_pos(u128::from(generation) * WORDS_PER_DRAW);
        let u = Vec3::new(rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>());
        region.point_at(u)
    }

    /// A freshly spawned particle for `slot`.
    pub fn spawn_particle(&self, slot: usize, generation: u32, region: &Region) -> Particle {
        Particle {
            position: self.placement(slot, generation, region),
            velocity: self.spawn_velocity,
            color: self.spawn_color,
            size: self.size,
            age: 0.0,
            generation,
            alive: true,
        }
    }

    /// Fade color and size toward their aged values.
    ///
    /// fade = 1 - exp(-rate * age); zero rate keeps the spawn look.
    #[inline]
    pub fn apply_fade(&self, particle: &mut Particle) {
        if self.color_decay_rate <= 0.0 {
            return;
        }
        let fade = 1.0 - (-self.color_decay_rate * particle.age).exp();
        particle.color = self.spawn_color.lerp(self.faded_color, fade);
        particle.size = self.size * (1.0 - fade * (1.0 - self.min_size_fraction));
    }

    /// True when the particle has outlived `max_age`.
    #[inline]
    pub fn expired(&self, particle: &Particle) -> bool {
        self.max_age.is_some_and(|max_age| particle.age > max_age)
    }
}

/// Fixed-capacity particle population.
#[derive(Clone, Debug)]
pub struct ParticleSystem {
    pub(crate) slots: Vec<Particle>,
    /// Dead slot indices; popped from the back, so lower slots fill first.
    free: Vec<usize>,
    alive: usize,
    /// Particles must stay inside this box.
    pub(crate) domain: Region,
    pub settings: ParticleSettings,
}

impl ParticleSystem {
    /// Create an empty system with `capacity` dead slots.
    pub fn new(capacity: usize, domain: Region, settings: ParticleSettings) -> Self {
        Self {
            slots: vec![Particle::default(); capacity],
            free: (0..capacity).rev().collect(),
            alive: 0,
            domain,
            settings,
        }
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.alive
    }

    pub fn is_empty(&self) -> bool {
        self.alive == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn domain(&self) -> Region {
        self.domain
    }

    /// Spawn up to `n` particles inside `region` (clipped to the domain).
    ///
    /// Requests beyond the free capacity are truncated; returns how many
    /// particles were actually added.
    pub fn spawn(&mut self, n: usize, region: Region) -> usize {
        let Some(region) = region.intersect(&self.domain) else {
            log::debug!("spawn region {:?} lies outside the domain, nothing spawned", region);
            return 0;
        };

        let count = n.min(self.free.len());
        if count < n {
            log::debug!("spawn request of {} truncated to {} (capacity {})", n, count, self.capacity());
        }

        for _ in 0..count {
            let Some(slot) = self.free.pop() else {
                break;
            };
            let generation = self.slots[slot].generation;
            self.slots[slot] = self.settings.spawn_particle(slot, generation, &region);
            self.alive += 1;
        }

        count
    }

    /// Kill the particle in `slot`, returning it to the free list.
    pub fn kill(&mut self, slot: usize) -> bool {
        match self.slots.get_mut(slot) {
            Some(p) if p.alive => {
                p.alive = false;
                p.generation = p.generation.wrapping_add(1);
                self.free.push(slot);
                self.alive -= 1;
                true
            }
            _ => false,
        }
    }

    /// Kill every particle.
    pub fn clear(&mut self) {
        for p in self.slots.iter_mut().filter(|p| p.alive) {
            p.alive = false;
            p.generation = p.generation.wrapping_add(1);
        }
        self.free = (0..self.slots.len()).rev().collect();
        self.alive = 0;
    }

    /// Live particles in slot order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.slots.iter().filter(|p| p.alive)
    }

    /// Every slot, dead ones included.
    pub fn slots(&self) -> &[Particle] {
        &self.slots
    }

    /// Live particles as renderer records.
    pub fn snapshot(&self) -> Vec<ParticleVertex> {
        let mut out = Vec::with_capacity(self.alive);
        self.snapshot_into(&mut out);
        out
    }

    /// Like [`ParticleSystem::snapshot`] but reuses `out`'s allocation.
    pub fn snapshot_into(&self, out: &mut Vec<ParticleVertex>) {
        out.clear();
        out.extend(self.particles().map(ParticleVertex::from));
    }
}
