//! Cell → face interpolation.
//!
//! Positive transport quantities (χ, D, nₑ) are interpolated by the
//! reciprocal-harmonic mean to preserve flux continuity across cell
//! boundaries; velocities by the arithmetic mean. Boundary faces copy the
//! adjacent cell value, there is no ghost-cell extrapolation.

use ndarray::Array1;
use torrent_common::Real;

/// Guard against division by zero in the reciprocal form.
const HARMONIC_EPS: Real = 1.0e-30;

/// Harmonic face mean of a positive cell quantity, reciprocal form.
///
/// The textbook `2ab/(a+b)` is avoided: its product overflows single
/// precision already at magnitudes around 10²⁰, which nₑ reaches routinely.
/// The reciprocal form `2/(1/a + 1/b)` stays inside the representable
/// range for anything up to ~10³⁰.
pub fn harmonic_faces(cell: &Array1<Real>) -> Array1<Real> {
    let n_cells = cell.len();
    Array1::from_shape_fn(n_cells + 1, |i| {
        if i == 0 {
            cell[0]
        } else if i == n_cells {
            cell[n_cells - 1]
        } else {
            let left = cell[i - 1].max(HARMONIC_EPS);
            let right = cell[i].max(HARMONIC_EPS);
            2.0 / (1.0 / left + 1.0 / right)
        }
    })
}

/// Arithmetic face mean of a cell quantity (used for velocities).
pub fn arithmetic_faces(cell: &Array1<Real>) -> Array1<Real> {
    let n_cells = cell.len();
    Array1::from_shape_fn(n_cells + 1, |i| {
        if i == 0 {
            cell[0]
        } else if i == n_cells {
            cell[n_cells - 1]
        } else {
            0.5 * (cell[i - 1] + cell[i])
        }
    })
}
