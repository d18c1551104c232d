//! The four cell-centered plasma profiles evolved by the solver.

use ndarray::Array1;

use crate::{CommonError, PerCubicMeter, Real, Result};

/// Density floor, in m⁻³.
///
/// nₑ is clamped to this value wherever it is consumed as a divisor (the
/// non-conservation transient coefficient) or as a transport weight, so the
/// per-cell division stays well-defined even while the Newton iterate wanders
/// through unphysical intermediate states.
pub const DENSITY_FLOOR: PerCubicMeter = 1.0e18;

/// Cell-centered profiles of the four evolved fields.
///
/// All arrays have the same length N (the number of radial cells). The
/// profiles are immutable; each Newton iterate and each accepted step
/// produces a new value rather than mutating in place.
#[derive(Clone, PartialEq)]
pub struct CoreProfiles {
    /// Ion temperature Tᵢ **in \[eV\]**.
    ti: Array1<Real>,
    /// Electron temperature Tₑ **in \[eV\]**.
    te: Array1<Real>,
    /// Electron density nₑ **in \[m⁻³\]**.
    ne: Array1<Real>,
    /// Poloidal flux ψ **in \[Wb\]**.
    psi: Array1<Real>,
}

impl CoreProfiles {
    /// Creates a [`CoreProfiles`] from the four field arrays.
    ///
    /// # Errors
    ///
    /// [`CommonError::ShapeMismatch`] if the arrays disagree on length, and
    /// [`CommonError::EmptyLayout`] for an empty grid.
    pub fn new(
        ti: Array1<Real>,
        te: Array1<Real>,
        ne: Array1<Real>,
        psi: Array1<Real>,
    ) -> Result<Self> {
        let n_cells = ti.len();
        if n_cells == 0 {
            return Err(CommonError::EmptyLayout);
        }
        for found in [te.len(), ne.len(), psi.len()] {
            if found != n_cells {
                return Err(CommonError::ShapeMismatch {
                    expected: n_cells,
                    found,
                });
            }
        }
        Ok(Self { ti, te, ne, psi })
    }

    /// Returns the number of radial cells.
    pub fn n_cells(&self) -> usize {
        self.ti.len()
    }

    /// Returns the ion temperature profile **in \[eV\]**.
    pub fn ti(&self) -> &Array1<Real> {
        &self.ti
    }

    /// Returns the electron temperature profile **in \[eV\]**.
    pub fn te(&self) -> &Array1<Real> {
        &self.te
    }

    /// Returns the electron density profile **in \[m⁻³\]**.
    pub fn ne(&self) -> &Array1<Real> {
        &self.ne
    }

    /// Returns the poloidal flux profile **in \[Wb\]**.
    pub fn psi(&self) -> &Array1<Real> {
        &self.psi
    }

    /// Returns nₑ clamped to [`DENSITY_FLOOR`].
    pub fn floored_ne(&self) -> Array1<Real> {
        self.ne.mapv(|value| value.max(DENSITY_FLOOR))
    }

    /// Returns a copy with nₑ clamped to [`DENSITY_FLOOR`].
    pub fn with_floored_density(&self) -> Self {
        Self {
            ne: self.floored_ne(),
            ..self.clone()
        }
    }

    /// Returns `true` if every value of every field is finite.
    pub fn is_finite(&self) -> bool {
        [&self.ti, &self.te, &self.ne, &self.psi]
            .iter()
            .all(|field| field.iter().all(|value| value.is_finite()))
    }
}

impl std::fmt::Debug for CoreProfiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let span = |field: &Array1<Real>| {
            let (mut lo, mut hi) = (Real::INFINITY, Real::NEG_INFINITY);
            for &value in field {
                lo = lo.min(value);
                hi = hi.max(value);
            }
            format!("[{lo:.4e}, {hi:.4e}]")
        };
        f.debug_struct("CoreProfiles")
            .field("n_cells", &self.n_cells())
            .field("T_i [eV]", &span(&self.ti))
            .field("T_e [eV]", &span(&self.te))
            .field("n_e [1/m^3]", &span(&self.ne))
            .field("psi [Wb]", &span(&self.psi))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array1;

    fn flat(value: Real, n_cells: usize) -> Array1<Real> {
        Array1::from_elem(n_cells, value)
    }

    #[test]
    fn test_shape_validation() {
        let profiles = CoreProfiles::new(flat(1e3, 10), flat(1e3, 10), flat(1e20, 10), flat(0.0, 10));
        assert!(profiles.is_ok());

        let mismatched = CoreProfiles::new(flat(1e3, 10), flat(1e3, 9), flat(1e20, 10), flat(0.0, 10));
        assert!(matches!(
            mismatched,
            Err(CommonError::ShapeMismatch { expected: 10, found: 9 })
        ));

        let empty = CoreProfiles::new(flat(0.0, 0), flat(0.0, 0), flat(0.0, 0), flat(0.0, 0));
        assert!(matches!(empty, Err(CommonError::EmptyLayout)));
    }

    #[test]
    fn test_density_floor() {
        let profiles =
            CoreProfiles::new(flat(1e3, 4), flat(1e3, 4), flat(1e15, 4), flat(0.0, 4)).unwrap();
        assert!(profiles.floored_ne().iter().all(|&ne| ne >= DENSITY_FLOOR));
        // The stored profile itself is untouched.
        assert!(profiles.ne().iter().all(|&ne| ne < DENSITY_FLOOR));
    }

    #[test]
    fn test_finiteness() {
        let good =
            CoreProfiles::new(flat(1e3, 4), flat(1e3, 4), flat(1e20, 4), flat(0.0, 4)).unwrap();
        assert!(good.is_finite());

        let mut ti = flat(1e3, 4);
        ti[2] = Real::NAN;
        let bad = CoreProfiles::new(ti, flat(1e3, 4), flat(1e20, 4), flat(0.0, 4)).unwrap();
        assert!(!bad.is_finite());
    }
}
