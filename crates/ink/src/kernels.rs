//! Small numeric kernels shared by the solver stages.

use std::ops::{Mul, Sub};

/// Gaussian-like falloff used for force deposits: `exp(-d² / r²)`.
/// Returns 0 outside the support (`d² > r²`) or for a non-positive radius.
#[inline]
pub fn gaussian_falloff(dist_sq: f32, radius_sq: f32) -> f32 {
    if radius_sq <= 0.0 || dist_sq > radius_sq {
        return 0.0;
    }
    (-dist_sq / radius_sq).exp()
}

/// Finite difference along one axis for sample `i` of `n`, using `at` to
/// read neighbours along that axis.
///
/// Central in the interior, one-sided on the first and last sample, zero on
/// a single-sample axis.
#[inline]
pub fn axis_difference<T, F>(i: usize, n: usize, spacing: f32, at: F) -> T
where
    T: Sub<Output = T> + Mul<f32, Output = T> + Default,
    F: Fn(usize) -> T,
{
    if n < 2 {
        T::default()
    } else if i == 0 {
        (at(1) - at(0)) * (1.0 / spacing)
    } else if i + 1 >= n {
        (at(n - 1) - at(n - 2)) * (1.0 / spacing)
    } else {
        (at(i + 1) - at(i - 1)) * (0.5 / spacing)
    }
}

/// Central difference of a wall-normal component for sample `i` of `n`.
///
/// Past either end of the axis the component mirrors with opposite sign, as a
/// no-flux wall imposes on the normal velocity. A single-sample axis gives 0.
#[inline]
pub fn reflected_difference<F>(i: usize, n: usize, spacing: f32, at: F) -> f32
where
    F: Fn(usize) -> f32,
{
    let here = at(i);
    let prev = if i > 0 { at(i - 1) } else { -here };
    let next = if i + 1 < n { at(i + 1) } else { -here };
    (next - prev) * (0.5 / spacing)
}

/// Linear interpolation weights for the two samples bracketing `t`.
#[inline]
pub fn linear_weights(t: f32) -> [f32; 2] {
    [1.0 - t, t]
}
