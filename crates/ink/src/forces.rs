//! Turning external stimuli into grid deposits.

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::grid::VelocityGrid;
use crate::kernels::gaussian_falloff;

/// A localized push applied to the velocity grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Impulse {
    /// World-space center of the push.
    #[serde(with = "crate::serde_utils::vec3")]
    pub position: Vec3,
    /// Push direction; only its orientation matters.
    #[serde(with = "crate::serde_utils::vec3")]
    pub direction: Vec3,
    pub magnitude: f32,
    /// Falloff radius in world units.
    pub radius: f32,
}

impl Impulse {
    pub fn new(position: Vec3, direction: Vec3, magnitude: f32, radius: f32) -> Self {
        Self {
            position,
            direction,
            magnitude,
            radius,
        }
    }

    /// False for impulses that would deposit nothing.
    pub fn is_active(&self) -> bool {
        self.position.is_finite()
            && self.direction.is_finite()
            && self.magnitude.is_finite()
            && self.radius.is_finite()
            && self.magnitude != 0.0
            && self.radius > 0.0
            && self.direction != Vec3::ZERO
    }
}

/// Deposit `impulse` into every cell within `radius` of the cell nearest to
/// its position, weighted by a Gaussian falloff.
///
/// Only the part of the neighbourhood that overlaps the lattice is visited.
/// Returns the number of cells that received a deposit.
pub fn apply_impulse(grid: &mut VelocityGrid, impulse: &Impulse) -> usize {
    if !impulse.is_active() {
        return 0;
    }

    let h = grid.cell_size;
    let force = impulse.direction.normalize() * impulse.magnitude;
    let radius_sq = impulse.radius * impulse.radius;

    let center = grid.world_to_cell(impulse.position);
    // Float-to-int casts saturate, so huge radii stay well defined
    let reach = (impulse.radius / h).floor() as i64;

    let axis_range = |c: i32, n: usize| -> Option<(i64, i64)> {
        let lo = i64::from(c).saturating_sub(reach).max(0);
        let hi = i64::from(c).saturating_add(reach).min(n as i64 - 1);
        (lo <= hi).then_some((lo, hi))
    };
    let (Some((x0, x1)), Some((y0, y1)), Some((z0, z1))) = (
        axis_range(center.x, grid.width()),
        axis_range(center.y, grid.height()),
        axis_range(center.z, grid.depth()),
    ) else {
        return 0;
    };

    let mut deposits = 0;
    for k in z0..=z1 {
        for j in y0..=y1 {
            for i in x0..=x1 {
                let offset = Vec3::new(
                    (i - i64::from(center.x)) as f32,
                    (j - i64::from(center.y)) as f32,
                    (k - i64::from(center.z)) as f32,
                ) * h;
                let weight = gaussian_falloff(offset.length_squared(), radius_sq);
                if weight <= 0.0 {
                    continue;
                }

                let coord = IVec3::new(i as i32, j as i32, k as i32);
                if grid.deposit(coord, force * weight) {
                    deposits += 1;
                }
            }
        }
    }

    log::trace!(
        "impulse at {:?} (r = {}) touched {} cells",
        impulse.position,
        impulse.radius,
        deposits
    );
    deposits
}

/// Converts a stream of pointer positions into impulses.
///
/// Direction follows the displacement since the previous position and the
/// magnitude is the pointer speed scaled by `strength`.
#[derive(Clone, Debug, PartialEq)]
pub struct DragTracker {
    last: Option<Vec3>,
    pub radius: f32,
    pub strength: f32,
}

impl DragTracker {
    pub fn new(radius: f32, strength: f32) -> Self {
        Self {
            last: None,
            radius,
            strength,
        }
    }

    /// Record a new pointer position `dt` seconds after the previous one.
    ///
    /// The first position of a drag only primes the tracker.
    pub fn move_to(&mut self, position: Vec3, dt: f32) -> Option<Impulse> {
        if !position.is_finite() {
            return None;
        }
        let previous = self.last.replace(position)?;
        if !(dt.is_finite() && dt > 0.0) {
            return None;
        }

        let displacement = position - previous;
        let distance = displacement.length();
        if distance <= 0.0 {
            return None;
        }

        let impulse = Impulse::new(position, displacement, distance / dt * self.strength, self.radius);
        impulse.is_active().then_some(impulse)
    }

    /// End the current drag.
    pub fn release(&mut self) {
        self.last = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }
}
