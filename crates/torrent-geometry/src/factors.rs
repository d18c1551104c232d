//! Metric factors consumed by the finite-volume operator.

use ndarray::Array1;
use torrent_common::Real;

/// The subset of the geometry the spatial discretization needs.
///
/// Produced by [`Geometry::factors`](crate::Geometry::factors) and carried
/// alongside each coefficient block so the operator never reaches back into
/// the full geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricFactors {
    /// Distances between adjacent cell centers **in \[m\]**. Length N−1.
    cell_distances: Array1<Real>,
    /// Cell volumes **in \[m³\]**. Length N.
    cell_volumes: Array1<Real>,
    /// Face areas **in \[m²\]**. Length N+1.
    face_areas: Array1<Real>,
    /// Cell-centered Jacobian √g **in \[m²\]**. Length N.
    sqrt_g: Array1<Real>,
}

impl GeometricFactors {
    /// Bundles the four metric arrays.
    pub fn new(
        cell_distances: Array1<Real>,
        cell_volumes: Array1<Real>,
        face_areas: Array1<Real>,
        sqrt_g: Array1<Real>,
    ) -> Self {
        Self {
            cell_distances,
            cell_volumes,
            face_areas,
            sqrt_g,
        }
    }

    /// Returns the number of radial cells N.
    pub fn n_cells(&self) -> usize {
        self.sqrt_g.len()
    }

    /// Returns the distances between adjacent cell centers. Length N−1.
    pub fn cell_distances(&self) -> &Array1<Real> {
        &self.cell_distances
    }

    /// Returns the cell volumes. Length N.
    pub fn cell_volumes(&self) -> &Array1<Real> {
        &self.cell_volumes
    }

    /// Returns the face areas. Length N+1.
    pub fn face_areas(&self) -> &Array1<Real> {
        &self.face_areas
    }

    /// Returns the cell-centered Jacobian √g. Length N.
    pub fn sqrt_g(&self) -> &Array1<Real> {
        &self.sqrt_g
    }

    /// Cell distances padded to length N by repeating the last entry.
    ///
    /// The divergence stencil needs one spacing per cell; on a uniform grid
    /// the padding is exact.
    pub fn padded_distances(&self) -> Array1<Real> {
        let n_cells = self.n_cells();
        let last = self.cell_distances[self.cell_distances.len() - 1];
        Array1::from_shape_fn(n_cells, |i| {
            if i < self.cell_distances.len() {
                self.cell_distances[i]
            } else {
                last
            }
        })
    }

    /// √g interpolated to faces by arithmetic mean, copied at the
    /// boundaries. Length N+1.
    pub fn sqrt_g_faces(&self) -> Array1<Real> {
        let n_cells = self.n_cells();
        Array1::from_shape_fn(n_cells + 1, |i| {
            if i == 0 {
                self.sqrt_g[0]
            } else if i == n_cells {
                self.sqrt_g[n_cells - 1]
            } else {
                0.5 * (self.sqrt_g[i - 1] + self.sqrt_g[i])
            }
        })
    }
}
