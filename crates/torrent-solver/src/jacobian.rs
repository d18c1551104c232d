//! Jacobian of the scaled residual.
//!
//! On an autodiff backend this would be a reverse-mode sweep, one basis
//! cotangent per state entry yielding a row of J. This backend has no vjp,
//! so the sweep runs forward instead: one finite-difference column per
//! basis vector, at the cost of O(4N) residual evaluations. The
//! direction-validity guards in the Newton driver catch any accuracy loss
//! this substitution introduces.
//!
//! Only the evaluated matrix is retained; no graph state survives between
//! Newton iterations.

use ndarray::{Array1, Array2};
use torrent_common::Real;

use crate::Result;

/// Forward-difference step scale, √ε for f32.
const STEP_SCALE: Real = 3.45e-4;

/// Assembles the dense Jacobian of `f` at `x` by a basis-vector sweep.
///
/// `fx` must be `f(x)`, reused to avoid one evaluation. The step of column
/// j scales with |x[j]| so the sweep stays accurate for states that are
/// O(1) only on average.
///
/// # Errors
///
/// Propagates the first failing residual evaluation.
pub fn finite_difference_jacobian<F>(
    f: &F,
    x: &Array1<Real>,
    fx: &Array1<Real>,
) -> Result<Array2<Real>>
where
    F: Fn(&Array1<Real>) -> Result<Array1<Real>>,
{
    let n_cols = x.len();
    let n_rows = fx.len();
    let mut jacobian = Array2::<Real>::zeros((n_rows, n_cols));
    let mut probe = x.clone();

    for j in 0..n_cols {
        let step = STEP_SCALE * x[j].abs().max(1.0);
        probe[j] = x[j] + step;
        // The representable step can differ from the nominal one.
        let actual = probe[j] - x[j];
        let f_probe = f(&probe)?;
        let mut column = jacobian.column_mut(j);
        for i in 0..n_rows {
            column[i] = (f_probe[i] - fx[i]) / actual;
        }
        probe[j] = x[j];
    }
    Ok(jacobian)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_linear_function_is_recovered_exactly() {
        // f(x) = A·x has Jacobian A regardless of step size.
        let f = |x: &Array1<Real>| {
            Ok(array![
                2.0 * x[0] + 3.0 * x[1],
                -1.0 * x[0] + 0.5 * x[1],
            ])
        };
        let x = array![1.0, -2.0];
        let fx = f(&x).unwrap();
        let jacobian = finite_difference_jacobian(&f, &x, &fx).unwrap();

        assert_relative_eq!(jacobian[(0, 0)], 2.0, max_relative = 1e-3);
        assert_relative_eq!(jacobian[(0, 1)], 3.0, max_relative = 1e-3);
        assert_relative_eq!(jacobian[(1, 0)], -1.0, max_relative = 1e-3);
        assert_relative_eq!(jacobian[(1, 1)], 0.5, max_relative = 1e-3);
    }

    #[test]
    fn test_nonlinear_diagonal() {
        let f = |x: &Array1<Real>| Ok(array![x[0] * x[0], x[1].exp()]);
        let x = array![3.0, 0.5];
        let fx = f(&x).unwrap();
        let jacobian = finite_difference_jacobian(&f, &x, &fx).unwrap();

        assert_relative_eq!(jacobian[(0, 0)], 6.0, max_relative = 1e-2);
        assert_relative_eq!(jacobian[(1, 1)], (0.5_f32).exp(), max_relative = 1e-2);
        // Decoupled entries stay zero.
        assert_relative_eq!(jacobian[(0, 1)], 0.0, epsilon = 1e-3);
    }
}
