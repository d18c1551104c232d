//! The finite-volume spatial operator
//! F(u) = ∇·(d∇u) + ∇·(v·u) + s + s_mat·u.
//!
//! Face gradients fold the boundary conditions in, the convective face
//! value uses Patankar's power-law interpolation, and the divergence is
//! metric-weighted: (1/√g)·∂(√g·F)/∂ρ. All stages are whole-array
//! expressions; the Jacobian is obtained by differencing this operator,
//! never by hand-written stencils.

use ndarray::{Array1, ArrayView1, Zip, s};
use torrent_common::{BoundaryCondition, BoundarySet, Real};
use torrent_geometry::GeometricFactors;

use crate::coeffs::EquationCoeffs;

/// Guard for the Péclet division at vanishing diffusivity.
const PECLET_GUARD: Real = 1.0e-30;

/// Below this |Pe| the face value is the plain central average.
const PECLET_CENTRAL: Real = 0.1;

/// Above this |Pe| the face value is pure first-order upwind.
const PECLET_UPWIND: Real = 10.0;

/// Applies the spatial operator to one cell vector.
///
/// `u` must carry one value per cell of `factors`; the coefficient shapes
/// are already validated by [`EquationCoeffs`].
pub fn apply_spatial(
    u: ArrayView1<'_, Real>,
    coeffs: &EquationCoeffs,
    factors: &GeometricFactors,
    boundaries: &BoundarySet,
) -> Array1<Real> {
    let n_cells = u.len();
    debug_assert_eq!(n_cells, factors.n_cells(), "state/grid cell count mismatch");
    let dx = factors.cell_distances();

    // Face gradients; boundary conditions are folded into the end faces,
    // treating a Dirichlet value as sitting one spacing outside.
    let mut grad = Array1::<Real>::zeros(n_cells + 1);
    grad.slice_mut(s![1..n_cells])
        .assign(&((&u.slice(s![1..]) - &u.slice(s![..n_cells - 1])) / dx));
    grad[0] = match boundaries.axis {
        BoundaryCondition::Value(value) => (u[0] - value) / dx[0],
        BoundaryCondition::Gradient(gradient) => gradient,
    };
    grad[n_cells] = match boundaries.edge {
        BoundaryCondition::Value(value) => (value - u[n_cells - 1]) / dx[dx.len() - 1],
        BoundaryCondition::Gradient(gradient) => gradient,
    };

    // Convective face values: central, power-law or upwind by face Péclet
    // number. Boundary faces copy the adjacent cell.
    let mut u_face = Array1::<Real>::zeros(n_cells + 1);
    u_face[0] = u[0];
    u_face[n_cells] = u[n_cells - 1];
    Zip::from(u_face.slice_mut(s![1..n_cells]))
        .and(u.slice(s![..n_cells - 1]))
        .and(u.slice(s![1..]))
        .and(coeffs.d_face().slice(s![1..n_cells]))
        .and(coeffs.v_face().slice(s![1..n_cells]))
        .and(dx)
        .for_each(|face, &left, &right, &d, &v, &spacing| {
            let peclet = v * spacing / d.max(PECLET_GUARD);
            *face = power_law_value(left, right, peclet);
        });

    // Total face flux and its metric divergence.
    let flux = coeffs.d_face().as_array() * &grad + coeffs.v_face().as_array() * &u_face;
    let weighted = &flux * &factors.sqrt_g_faces();
    let divergence = (&weighted.slice(s![1..]) - &weighted.slice(s![..n_cells]))
        / (factors.sqrt_g() * &factors.padded_distances());

    divergence
        + coeffs.source_cell().as_array()
        + &(coeffs.source_mat_cell().as_array() * &u)
}

/// Patankar's power-law face interpolation.
///
/// Central below |Pe| = 0.1, pure upwind above |Pe| = 10, and in between a
/// blend weighted by max(0, (1 − 0.1|Pe|)⁵) tilted toward the upwind cell
/// by the sign of Pe.
fn power_law_value(left: Real, right: Real, peclet: Real) -> Real {
    let magnitude = peclet.abs();
    if magnitude < PECLET_CENTRAL {
        0.5 * (left + right)
    } else if magnitude > PECLET_UPWIND {
        if peclet > 0.0 { left } else { right }
    } else {
        let weight = (1.0 - 0.1 * magnitude).powi(5).max(0.0);
        let upwind = if peclet > 0.0 { left } else { right };
        weight * 0.5 * (left + right) + (1.0 - weight) * upwind
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::Array1;
    use torrent_geometry::Geometry;

    fn diffusion_coeffs(n_cells: usize, d: Real) -> EquationCoeffs {
        EquationCoeffs::new(
            n_cells,
            Array1::from_elem(n_cells + 1, d),
            Array1::zeros(n_cells + 1),
            Array1::zeros(n_cells),
            Array1::zeros(n_cells),
            Array1::ones(n_cells),
        )
        .unwrap()
    }

    fn reflecting() -> BoundarySet {
        BoundarySet::default()
    }

    #[test]
    fn test_uniform_field_is_stationary() {
        let geometry = Geometry::circular(50, 3.0, 1.0, 2.5).unwrap();
        let factors = geometry.factors();
        let u = Array1::from_elem(50, 7.0);
        let coeffs = diffusion_coeffs(50, 2.0);

        let result = apply_spatial(u.view(), &coeffs, &factors, &reflecting());
        for &value in &result {
            assert_abs_diff_eq!(value, 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_uniform_field_matching_dirichlet_is_stationary() {
        let geometry = Geometry::circular(50, 3.0, 1.0, 2.5).unwrap();
        let factors = geometry.factors();
        let u = Array1::from_elem(50, 100.0);
        let coeffs = diffusion_coeffs(50, 1.0);
        let boundaries = BoundarySet {
            axis: BoundaryCondition::Gradient(0.0),
            edge: BoundaryCondition::Value(100.0),
        };

        let result = apply_spatial(u.view(), &coeffs, &factors, &boundaries);
        for &value in &result {
            assert_abs_diff_eq!(value, 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_parabolic_profile_cylindrical_laplacian() {
        // For u = ρ² and √g ∝ ρ the operator is (1/ρ)·d(ρ·2ρ)/dρ = 4.
        let geometry = Geometry::circular(200, 3.0, 1.0, 2.5).unwrap();
        let factors = geometry.factors();
        let u = geometry.rho().mapv(|rho| rho * rho);
        let coeffs = diffusion_coeffs(200, 1.0);

        let result = apply_spatial(u.view(), &coeffs, &factors, &reflecting());
        // Interior cells only; the reflecting boundaries distort the ends.
        for i in 5..195 {
            assert_relative_eq!(result[i], 4.0, max_relative = 2e-2);
        }
    }

    #[test]
    fn test_power_law_limits() {
        // |Pe| < 0.1: arithmetic mean.
        assert_abs_diff_eq!(power_law_value(1.0, 3.0, 0.05), 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(power_law_value(1.0, 3.0, -0.05), 2.0, epsilon = 1e-3);

        // |Pe| > 10: exact upwind.
        assert_eq!(power_law_value(1.0, 3.0, 20.0), 1.0);
        assert_eq!(power_law_value(1.0, 3.0, -20.0), 3.0);
        assert_eq!(power_law_value(1.0, 3.0, Real::INFINITY), 1.0);

        // Transition region tilts toward the upwind cell.
        let forward = power_law_value(1.0, 3.0, 5.0);
        let backward = power_law_value(1.0, 3.0, -5.0);
        assert!(forward < 2.0);
        assert!(backward > 2.0);
        assert!((0.0..=4.0).contains(&forward));
    }

    #[test]
    fn test_matrix_source_contribution() {
        let geometry = Geometry::circular(10, 3.0, 1.0, 2.5).unwrap();
        let factors = geometry.factors();
        let u = Array1::from_elem(10, 2.0);
        let coeffs = EquationCoeffs::new(
            10,
            Array1::zeros(11),
            Array1::zeros(11),
            Array1::from_elem(10, 1.5),
            Array1::from_elem(10, 3.0),
            Array1::ones(10),
        )
        .unwrap();

        let result = apply_spatial(u.view(), &coeffs, &factors, &reflecting());
        // No transport: F = s + s_mat·u = 1.5 + 3·2.
        for &value in &result {
            assert_abs_diff_eq!(value, 7.5, epsilon = 1e-5);
        }
    }
}
