//! Opaque handle around an array that is guaranteed to hold concrete values.
//!
//! The solver was designed against numerical backends that may defer
//! computation into lazy graphs. Every array crossing a component boundary
//! is wrapped in an [`Evaluated`], whose construction forces the values into
//! an owned, standard-layout buffer. On an eager backend such as [`ndarray`]
//! the forcing is a cheap copy at worst, but the type keeps its role as the
//! boundary marker: downstream code never sees a pending expression.

use std::ops::Deref;

use approx::AbsDiffEq;
use ndarray::Array1;

use crate::Real;

/// A numerical array forced to concrete values.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluated {
    data: Array1<Real>,
}

impl Evaluated {
    /// Forces `array` into an owned standard-layout buffer and wraps it.
    pub fn new(array: Array1<Real>) -> Self {
        // Owned `Array1`s produced by slicing can carry non-unit strides.
        let data = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().to_owned()
        };
        Self { data }
    }

    /// Forces several arrays in a single pass before wrapping each of them.
    pub fn batch<I>(arrays: I) -> Vec<Self>
    where
        I: IntoIterator<Item = Array1<Real>>,
    {
        arrays.into_iter().map(Self::new).collect()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of dimensions. Always 1 for radial profiles.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Returns the shape of the underlying array.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns `true` if every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }

    /// Returns the raw array.
    pub fn as_array(&self) -> &Array1<Real> {
        &self.data
    }

    /// Unwraps into the raw array.
    pub fn into_inner(self) -> Array1<Real> {
        self.data
    }
}

impl Deref for Evaluated {
    type Target = Array1<Real>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl From<Array1<Real>> for Evaluated {
    fn from(array: Array1<Real>) -> Self {
        Self::new(array)
    }
}

impl AbsDiffEq for Evaluated {
    type Epsilon = Real;

    fn default_epsilon() -> Self::Epsilon {
        Real::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.len() == other.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(lhs, rhs)| lhs.abs_diff_eq(rhs, epsilon))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, array, s};

    #[test]
    fn test_forcing_non_standard_layout() {
        let base: Array1<Real> = Array1::linspace(0.0, 9.0, 10);
        // `slice_move` keeps the stride of 2 in the owned array.
        let strided = base.slice_move(s![..;2]);
        assert!(!strided.is_standard_layout());
        let forced = Evaluated::new(strided);

        assert!(forced.as_array().is_standard_layout());
        assert_eq!(forced.len(), 5);
        assert_eq!(forced.ndim(), 1);
        assert_eq!(forced.shape(), &[5]);
    }

    #[test]
    fn test_batch_wraps_all() {
        let wrapped = Evaluated::batch(vec![array![1.0], array![2.0, 3.0]]);
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[1].len(), 2);
    }

    #[test]
    fn test_tolerance_equality() {
        let lhs = Evaluated::new(array![1.0, 2.0, 3.0]);
        let rhs = Evaluated::new(array![1.0, 2.0 + 1e-6, 3.0]);

        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-5);
        assert!(!lhs.abs_diff_eq(&rhs, 1e-8));
        // Length mismatch is never equal.
        assert!(!lhs.abs_diff_eq(&Evaluated::new(array![1.0]), 1.0));
    }

    #[test]
    fn test_finiteness() {
        assert!(Evaluated::new(array![1.0, 2.0]).is_finite());
        assert!(!Evaluated::new(array![1.0, Real::NAN]).is_finite());
        assert!(!Evaluated::new(array![Real::INFINITY]).is_finite());
    }
}
