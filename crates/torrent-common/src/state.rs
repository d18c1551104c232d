//! Flattened solver state and its layout.
//!
//! The Newton driver operates on a single length-4N vector. The layout
//! partitions it into four contiguous ranges in the fixed order
//! (Tᵢ, Tₑ, nₑ, ψ); conversion to and from [`CoreProfiles`] is O(N) and
//! bijective.

use std::ops::Range;

use ndarray::{Array1, ArrayView1, s};

use crate::{CommonError, CoreProfiles, Field, Real, Result};

/// Partition of the flat state vector into the four field ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLayout {
    n_cells: usize,
}

impl StateLayout {
    /// Creates a layout for a grid of `n_cells` cells.
    ///
    /// # Errors
    ///
    /// [`CommonError::EmptyLayout`] if `n_cells` is zero.
    pub fn new(n_cells: usize) -> Result<Self> {
        if n_cells == 0 {
            return Err(CommonError::EmptyLayout);
        }
        Ok(Self { n_cells })
    }

    /// Returns the number of radial cells N.
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Returns the total state length 4N.
    pub fn total_len(&self) -> usize {
        4 * self.n_cells
    }

    /// Returns the index range of `field` within the flat vector.
    pub fn range(&self, field: Field) -> Range<usize> {
        let start = field.index() * self.n_cells;
        start..start + self.n_cells
    }
}

/// A length-4N state vector together with its layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedState {
    data: Array1<Real>,
    layout: StateLayout,
}

impl FlattenedState {
    /// Concatenates the four profile arrays in layout order.
    pub fn from_profiles(profiles: &CoreProfiles) -> Self {
        let n_cells = profiles.n_cells();
        let mut data = Array1::zeros(4 * n_cells);
        // `CoreProfiles` guarantees n_cells > 0 and equal lengths.
        let layout = StateLayout { n_cells };
        for (field, source) in Field::ALL.into_iter().zip([
            profiles.ti(),
            profiles.te(),
            profiles.ne(),
            profiles.psi(),
        ]) {
            data.slice_mut(s![layout.range(field)]).assign(source);
        }
        Self { data, layout }
    }

    /// Wraps an existing flat vector.
    ///
    /// # Errors
    ///
    /// [`CommonError::ShapeMismatch`] if `data` is not of length 4N.
    pub fn from_raw(data: Array1<Real>, layout: StateLayout) -> Result<Self> {
        if data.len() != layout.total_len() {
            return Err(CommonError::ShapeMismatch {
                expected: layout.total_len(),
                found: data.len(),
            });
        }
        Ok(Self { data, layout })
    }

    /// Slices the flat vector back into the four profiles.
    pub fn to_profiles(&self) -> CoreProfiles {
        let slice_of = |field: Field| self.data.slice(s![self.layout.range(field)]).to_owned();
        CoreProfiles::new(
            slice_of(Field::IonTemperature),
            slice_of(Field::ElectronTemperature),
            slice_of(Field::Density),
            slice_of(Field::PoloidalFlux),
        )
        .expect("slices share the layout's cell count")
    }

    /// Returns the layout.
    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    /// Returns the flat vector.
    pub fn data(&self) -> &Array1<Real> {
        &self.data
    }

    /// Unwraps into the flat vector.
    pub fn into_data(self) -> Array1<Real> {
        self.data
    }

    /// Returns a view of `field`'s range.
    pub fn field(&self, field: Field) -> ArrayView1<'_, Real> {
        self.data.slice(s![self.layout.range(field)])
    }

    /// Elementwise division by a reference state of the same shape.
    ///
    /// # Errors
    ///
    /// [`CommonError::ShapeMismatch`] if `reference` is not of length 4N.
    pub fn scaled(&self, reference: &Array1<Real>) -> Result<Self> {
        self.check_reference(reference)?;
        Ok(Self {
            data: &self.data / reference,
            layout: self.layout,
        })
    }

    /// Elementwise multiplication by a reference state of the same shape.
    ///
    /// # Errors
    ///
    /// [`CommonError::ShapeMismatch`] if `reference` is not of length 4N.
    pub fn unscaled(&self, reference: &Array1<Real>) -> Result<Self> {
        self.check_reference(reference)?;
        Ok(Self {
            data: &self.data * reference,
            layout: self.layout,
        })
    }

    /// Returns `true` if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }

    fn check_reference(&self, reference: &Array1<Real>) -> Result<()> {
        if reference.len() != self.layout.total_len() {
            return Err(CommonError::ShapeMismatch {
                expected: self.layout.total_len(),
                found: reference.len(),
            });
        }
        Ok(())
    }
}
