//! Per-equation finite-volume coefficients.

use ndarray::Array1;
use torrent_common::{Evaluated, Field, Real};
use torrent_geometry::GeometricFactors;

use crate::{Result, SolverError};

/// The coefficients of one drift–diffusion equation
/// c·∂u/∂t = ∇·(d∇u) + ∇·(v·u) + s + s_mat·u, discretized on the
/// cell/face grid.
///
/// Shapes are validated at construction: faces carry N+1 values, cells N.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationCoeffs {
    /// Diffusivity d at faces. Length N+1.
    d_face: Evaluated,
    /// Convection velocity v at faces. Length N+1.
    v_face: Evaluated,
    /// Explicit source s at cells. Length N.
    source_cell: Evaluated,
    /// Implicit (matrix) source s_mat at cells. Length N.
    source_mat_cell: Evaluated,
    /// Transient coefficient c at cells. Length N.
    transient_coeff: Evaluated,
}

impl EquationCoeffs {
    /// Wraps the five coefficient arrays for a grid of `n_cells` cells.
    ///
    /// # Errors
    ///
    /// [`SolverError::CoeffShape`] on the first array whose length is wrong.
    pub fn new(
        n_cells: usize,
        d_face: Array1<Real>,
        v_face: Array1<Real>,
        source_cell: Array1<Real>,
        source_mat_cell: Array1<Real>,
        transient_coeff: Array1<Real>,
    ) -> Result<Self> {
        let checks = [
            ("d_face", d_face.len(), n_cells + 1),
            ("v_face", v_face.len(), n_cells + 1),
            ("source_cell", source_cell.len(), n_cells),
            ("source_mat_cell", source_mat_cell.len(), n_cells),
            ("transient_coeff", transient_coeff.len(), n_cells),
        ];
        for (name, found, expected) in checks {
            if found != expected {
                return Err(SolverError::CoeffShape {
                    name,
                    expected,
                    found,
                });
            }
        }
        Ok(Self {
            d_face: Evaluated::new(d_face),
            v_face: Evaluated::new(v_face),
            source_cell: Evaluated::new(source_cell),
            source_mat_cell: Evaluated::new(source_mat_cell),
            transient_coeff: Evaluated::new(transient_coeff),
        })
    }

    /// Returns the number of cells N.
    pub fn n_cells(&self) -> usize {
        self.source_cell.len()
    }

    /// Returns the face diffusivities. Length N+1.
    pub fn d_face(&self) -> &Evaluated {
        &self.d_face
    }

    /// Returns the face convection velocities. Length N+1.
    pub fn v_face(&self) -> &Evaluated {
        &self.v_face
    }

    /// Returns the explicit cell sources. Length N.
    pub fn source_cell(&self) -> &Evaluated {
        &self.source_cell
    }

    /// Returns the implicit cell sources. Length N.
    pub fn source_mat_cell(&self) -> &Evaluated {
        &self.source_mat_cell
    }

    /// Returns the transient coefficients. Length N.
    pub fn transient_coeff(&self) -> &Evaluated {
        &self.transient_coeff
    }
}

/// Coefficients of all four equations plus the metric view.
///
/// Produced once per coefficient evaluation: at the old time, at the new
/// time, and at every Newton iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct Block1DCoeffs {
    /// Tᵢ equation coefficients.
    pub ion_temperature: EquationCoeffs,
    /// Tₑ equation coefficients.
    pub electron_temperature: EquationCoeffs,
    /// nₑ equation coefficients.
    pub density: EquationCoeffs,
    /// ψ equation coefficients.
    pub poloidal_flux: EquationCoeffs,
    /// Metric factors shared by the four equations.
    pub geometry: GeometricFactors,
}

impl Block1DCoeffs {
    /// Returns the coefficients of `field`'s equation.
    pub fn for_field(&self, field: Field) -> &EquationCoeffs {
        match field {
            Field::IonTemperature => &self.ion_temperature,
            Field::ElectronTemperature => &self.electron_temperature,
            Field::Density => &self.density,
            Field::PoloidalFlux => &self.poloidal_flux,
        }
    }

    /// Returns the number of cells N.
    pub fn n_cells(&self) -> usize {
        self.geometry.n_cells()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_shape_validation() {
        let n_cells = 8;
        let good = EquationCoeffs::new(
            n_cells,
            Array1::zeros(n_cells + 1),
            Array1::zeros(n_cells + 1),
            Array1::zeros(n_cells),
            Array1::zeros(n_cells),
            Array1::ones(n_cells),
        );
        assert!(good.is_ok());

        let bad = EquationCoeffs::new(
            n_cells,
            Array1::zeros(n_cells), // faces need N+1
            Array1::zeros(n_cells + 1),
            Array1::zeros(n_cells),
            Array1::zeros(n_cells),
            Array1::ones(n_cells),
        );
        assert!(matches!(
            bad,
            Err(SolverError::CoeffShape {
                name: "d_face",
                expected: 9,
                found: 8,
            })
        ));
    }
}
