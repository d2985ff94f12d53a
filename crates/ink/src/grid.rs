//! Collocated 3D velocity grid.
//!
//! Every cell stores its velocity at the cell center:
//! - cell (i, j, k) sits at ((i + 0.5) * dx, (j + 0.5) * dx, (k + 0.5) * dx)
//! - the domain covers [0, width * dx] x [0, height * dx] x [0, depth * dx]
//!
//! Per-cell state is kept as separate arenas indexed by the flat cell index
//! so each solver stage can read one buffer while writing another.

use glam::{IVec3, Vec3};

use crate::config::Region;
use crate::kernels::{axis_difference, linear_weights, reflected_difference};

/// Lattice dimensions and flat indexing.
///
/// `Copy` so parallel passes can capture it by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDims {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl GridDims {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Flat index: k * (width * height) + j * width + i
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        k * self.width * self.height + j * self.width + i
    }

    /// Inverse of [`GridDims::index`].
    #[inline]
    pub fn coord(&self, idx: usize) -> (usize, usize, usize) {
        let i = idx % self.width;
        let j = (idx / self.width) % self.height;
        let k = idx / (self.width * self.height);
        (i, j, k)
    }

    /// Number of cells along `axis` (0 = X, 1 = Y, 2 = Z).
    #[inline]
    pub fn axis_len(&self, axis: usize) -> usize {
        match axis {
            0 => self.width,
            1 => self.height,
            _ => self.depth,
        }
    }

    #[inline]
    pub fn in_bounds(&self, c: IVec3) -> bool {
        c.x >= 0
            && c.y >= 0
            && c.z >= 0
            && (c.x as usize) < self.width
            && (c.y as usize) < self.height
            && (c.z as usize) < self.depth
    }

    /// True if the cell touches the domain face perpendicular to `axis`.
    #[inline]
    pub fn on_boundary(&self, i: usize, j: usize, k: usize, axis: usize) -> bool {
        let (c, n) = match axis {
            0 => (i, self.width),
            1 => (j, self.height),
            _ => (k, self.depth),
        };
        c == 0 || c + 1 == n
    }

    /// Finite difference of `field` along `axis` at (i, j, k): central in the
    /// interior, one-sided on boundary cells.
    #[inline]
    pub fn difference<T>(&self, field: &[T], i: usize, j: usize, k: usize, axis: usize, spacing: f32) -> T
    where
        T: Copy + std::ops::Sub<Output = T> + std::ops::Mul<f32, Output = T> + Default,
    {
        match axis {
            0 => axis_difference(i, self.width, spacing, |ii| field[self.index(ii, j, k)]),
            1 => axis_difference(j, self.height, spacing, |jj| field[self.index(i, jj, k)]),
            _ => axis_difference(k, self.depth, spacing, |kk| field[self.index(i, j, kk)]),
        }
    }

    /// Derivative of the `axis` component of `field` along `axis`, with that
    /// component mirrored across the domain walls.
    #[inline]
    pub fn normal_difference(&self, field: &[Vec3], i: usize, j: usize, k: usize, axis: usize, spacing: f32) -> f32 {
        match axis {
            0 => reflected_difference(i, self.width, spacing, |ii| field[self.index(ii, j, k)].x),
            1 => reflected_difference(j, self.height, spacing, |jj| field[self.index(i, jj, k)].y),
            _ => reflected_difference(k, self.depth, spacing, |kk| field[self.index(i, j, kk)].z),
        }
    }

    /// Sum of `field` over the in-domain 6-neighbourhood of (i, j, k) and the
    /// number of neighbours that contributed.
    #[inline]
    pub fn neighbor_sum<T>(&self, field: &[T], i: usize, j: usize, k: usize) -> (T, usize)
    where
        T: Copy + std::ops::Add<Output = T> + Default,
    {
        let mut sum = T::default();
        let mut count = 0;

        if i > 0 {
            sum = sum + field[self.index(i - 1, j, k)];
            count += 1;
        }
        if i + 1 < self.width {
            sum = sum + field[self.index(i + 1, j, k)];
            count += 1;
        }
        if j > 0 {
            sum = sum + field[self.index(i, j - 1, k)];
            count += 1;
        }
        if j + 1 < self.height {
            sum = sum + field[self.index(i, j + 1, k)];
            count += 1;
        }
        if k > 0 {
            sum = sum + field[self.index(i, j, k - 1)];
            count += 1;
        }
        if k + 1 < self.depth {
            sum = sum + field[self.index(i, j, k + 1)];
            count += 1;
        }

        (sum, count)
    }
}

/// Snapshot of one lattice cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cell {
    /// Velocity at the start of the current step.
    pub old_velocity: Vec3,
    /// Velocity after the latest solve (plus any deposits since).
    pub velocity: Vec3,
    /// Vorticity from the latest solve.
    pub curl: Vec3,
    /// A force deposit touched this cell since the last solve.
    pub force_applied: bool,
}

/// The authoritative velocity lattice of a simulation.
#[derive(Clone, Debug)]
pub struct VelocityGrid {
    pub dims: GridDims,
    /// Size of each cell in world units
    pub cell_size: f32,

    /// Current velocity at cell centers
    pub(crate) velocity: Vec<Vec3>,

    /// Right-hand side of the diffusion solve during a step, the committed
    /// velocity between steps
    pub(crate) velocity_old: Vec<Vec3>,

    /// Vorticity (curl of velocity)
    pub(crate) curl: Vec<Vec3>,

    /// Cells touched by a force deposit this step
    pub(crate) force_applied: Vec<bool>,
}

impl VelocityGrid {
    /// Create a zero-velocity grid with the given dimensions.
    pub fn new(width: usize, height: usize, depth: usize, cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive, got {}", cell_size);
        assert!(
            width > 0 && height > 0 && depth > 0,
            "grid dimensions must be non-zero, got {}x{}x{}",
            width,
            height,
            depth
        );
        let dims = GridDims::new(width, height, depth);
        let cell_count = dims.cell_count();

        Self {
            dims,
            cell_size,
            velocity: vec![Vec3::ZERO; cell_count],
            velocity_old: vec![Vec3::ZERO; cell_count],
            curl: vec![Vec3::ZERO; cell_count],
            force_applied: vec![false; cell_count],
        }
    }

    pub fn width(&self) -> usize {
        self.dims.width
    }

    pub fn height(&self) -> usize {
        self.dims.height
    }

    pub fn depth(&self) -> usize {
        self.dims.depth
    }

    pub fn cell_count(&self) -> usize {
        self.dims.cell_count()
    }

    /// World-space bounding box.
    pub fn bounds(&self) -> Region {
        Region::new(
            Vec3::ZERO,
            Vec3::new(
                self.dims.width as f32,
                self.dims.height as f32,
                self.dims.depth as f32,
            ) * self.cell_size,
        )
    }

    /// True if `pos` lies inside the (closed) domain box.
    #[inline]
    pub fn contains(&self, pos: Vec3) -> bool {
        self.bounds().contains(pos)
    }

    // ========== Field accessors ==========

    pub fn velocity(&self) -> &[Vec3] {
        &self.velocity
    }

    pub fn velocity_old(&self) -> &[Vec3] {
        &self.velocity_old
    }

    pub fn curl(&self) -> &[Vec3] {
        &self.curl
    }

    pub fn force_applied(&self) -> &[bool] {
        &self.force_applied
    }

    // ========== Coordinates ==========

    #[inline]
    pub fn cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        self.dims.index(i, j, k)
    }

    /// World position of the center of cell (i, j, k).
    #[inline]
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> Vec3 {
        Vec3::new(i as f32 + 0.5, j as f32 + 0.5, k as f32 + 0.5) * self.cell_size
    }

    /// Cell containing `pos` (floored, may be out of bounds).
    #[inline]
    pub fn world_to_cell(&self, pos: Vec3) -> IVec3 {
        (pos / self.cell_size).floor().as_ivec3()
    }

    #[inline]
    pub fn cell_in_bounds(&self, coord: IVec3) -> bool {
        self.dims.in_bounds(coord)
    }

    fn checked_index(&self, coord: IVec3) -> Option<usize> {
        self.cell_in_bounds(coord)
            .then(|| self.dims.index(coord.x as usize, coord.y as usize, coord.z as usize))
    }

    // ========== Cell access ==========

    /// Snapshot of the cell at `coord`, `None` outside the lattice.
    pub fn at(&self, coord: IVec3) -> Option<Cell> {
        self.checked_index(coord).map(|idx| Cell {
            old_velocity: self.velocity_old[idx],
            velocity: self.velocity[idx],
            curl: self.curl[idx],
            force_applied: self.force_applied[idx],
        })
    }

    /// Add a velocity impulse to one cell and flag it as forced.
    ///
    /// Coordinates outside the lattice are discarded; returns whether the
    /// deposit landed.
    pub fn deposit(&mut self, coord: IVec3, force: Vec3) -> bool {
        match self.checked_index(coord) {
            Some(idx) if force.is_finite() => {
                self.velocity[idx] += force;
                self.force_applied[idx] = true;
                true
            }
            _ => false,
        }
    }

    /// Trilinearly interpolated velocity at a world position.
    ///
    /// The position is first clamped into the box spanned by the outermost
    /// cell centers, so anything on or beyond the boundary reads the nearest
    /// boundary cell instead of extrapolating. NaN components resolve to the
    /// lower boundary.
    pub fn sample(&self, pos: Vec3) -> Vec3 {
        let dx = self.cell_size;
        let dims = self.dims;
        let lo = Vec3::splat(0.5 * dx);
        let hi = Vec3::new(
            dims.width as f32 - 0.5,
            dims.height as f32 - 0.5,
            dims.depth as f32 - 0.5,
        ) * dx;

        // Vec3::max picks the non-NaN operand
        let pos = pos.max(lo).min(hi);

        // Cell-centered coordinates in [0, n - 1]
        let f = pos / dx - Vec3::splat(0.5);
        let base = f.floor();
        let t = f - base;

        let i0 = (base.x as usize).min(dims.width - 1);
        let j0 = (base.y as usize).min(dims.height - 1);
        let k0 = (base.z as usize).min(dims.depth - 1);
        let i = [i0, (i0 + 1).min(dims.width - 1)];
        let j = [j0, (j0 + 1).min(dims.height - 1)];
        let k = [k0, (k0 + 1).min(dims.depth - 1)];

        let wx = linear_weights(t.x);
        let wy = linear_weights(t.y);
        let wz = linear_weights(t.z);

        let mut result = Vec3::ZERO;
        for dk in 0..2 {
            for dj in 0..2 {
                for di in 0..2 {
                    let w = wx[di] * wy[dj] * wz[dk];
                    if w == 0.0 {
                        continue;
                    }
                    result += self.velocity[dims.index(i[di], j[dj], k[dk])] * w;
                }
            }
        }

        result
    }

    // ========== Reset/clear ==========

    /// Clear all velocities (current and old) and curl to zero.
    pub fn clear_velocities(&mut self) {
        self.velocity.fill(Vec3::ZERO);
        self.velocity_old.fill(Vec3::ZERO);
        self.curl.fill(Vec3::ZERO);
    }

    /// Store current velocities as old.
    pub fn store_old_velocities(&mut self) {
        self.velocity_old.copy_from_slice(&self.velocity);
    }

    /// Drop every force flag.
    pub fn clear_forces(&mut self) {
        self.force_applied.fill(false);
    }
}
