//! Analytic circular-cross-section geometry.
//!
//! All derived arrays live on the cell/face grid of the transport solver:
//! N cell centers at ρᵢ = (i + ½)·Δρ and N+1 faces at ρ = i·Δρ, with
//! Δρ = a/N uniform. The Jacobian is chosen so that cell volumes satisfy
//! Vᵢ = √gᵢ·Δρ exactly, which makes the metric-weighted divergence
//! telescope and keeps the finite-volume scheme conservative.

use std::f64::consts::PI;

use ndarray::Array1;
use torrent_common::Real;

use crate::{GeometricFactors, GeometryError, Result};

/// Shape of the flux surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// Concentric circular flux surfaces.
    Circular,
}

/// Fixed axisymmetric geometry of a radial transport grid.
///
/// Immutable during a timestep.
///
/// # Example
/// ```
/// # use torrent_geometry::*;
/// # fn main() -> Result<()> {
/// let geometry = Geometry::circular(50, 3.0, 1.0, 2.5)?;
///
/// assert_eq!(geometry.n_cells(), 50);
/// assert_eq!(geometry.face_areas().len(), 51);
/// # Ok(())
/// # }
/// ```
pub struct Geometry {
    kind: GeometryKind,
    /// Device major radius R **in \[m\]**.
    major_radius: Real,
    /// Device minor radius a **in \[m\]**.
    minor_radius: Real,
    /// Toroidal field on axis B₀ **in \[T\]**.
    b0: Real,
    n_cells: usize,

    /// Cell-centered radial coordinates ρ **in \[m\]**. Length N.
    rho: Array1<Real>,
    /// Distances between adjacent cell centers **in \[m\]**. Length N−1.
    cell_distances: Array1<Real>,
    /// Cell volumes **in \[m³\]**. Length N.
    cell_volumes: Array1<Real>,
    /// Face areas **in \[m²\]**. Length N+1.
    face_areas: Array1<Real>,
    /// Cell-centered Jacobian √g **in \[m²\]**. Length N.
    sqrt_g: Array1<Real>,
    /// Safety factor q(ρ). Length N.
    safety_factor: Array1<Real>,
}

// Creation
impl Geometry {
    /// Default safety factor on axis.
    const Q_AXIS: Real = 1.0;
    /// Default safety factor at the edge.
    const Q_EDGE: Real = 3.0;

    /// Constructs a circular-cross-section geometry with a parabolic
    /// default q profile.
    ///
    /// # Errors
    ///
    /// Rejects non-positive dimensions, fewer than two cells, and aspect
    /// ratios a/R above 0.5.
    pub fn circular(
        n_cells: usize,
        major_radius: Real,
        minor_radius: Real,
        b0: Real,
    ) -> Result<Self> {
        Self::circular_with_q(n_cells, major_radius, minor_radius, b0, Self::Q_AXIS, Self::Q_EDGE)
    }

    /// Constructs a circular geometry with a parabolic q profile running
    /// from `q_axis` to `q_edge`.
    ///
    /// # Errors
    ///
    /// Same invariants as [`Geometry::circular`].
    pub fn circular_with_q(
        n_cells: usize,
        major_radius: Real,
        minor_radius: Real,
        b0: Real,
        q_axis: Real,
        q_edge: Real,
    ) -> Result<Self> {
        for (name, value) in [
            ("major_radius", major_radius),
            ("minor_radius", minor_radius),
            ("b0", b0),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(GeometryError::NonPositive { name, value });
            }
        }
        if n_cells < 2 {
            return Err(GeometryError::TooFewCells { found: n_cells });
        }
        let ratio = minor_radius / major_radius;
        if ratio > 0.5 {
            return Err(GeometryError::AspectRatio { ratio });
        }

        let dr = minor_radius / n_cells as Real;
        // 4π²R: torus surface per unit flux-surface radius.
        let surface_per_radius = (4.0 * PI * PI) as Real * major_radius;

        let rho = Array1::from_shape_fn(n_cells, |i| (i as Real + 0.5) * dr);
        let cell_distances = Array1::from_elem(n_cells - 1, dr);
        let sqrt_g = rho.mapv(|r| surface_per_radius * r);
        let cell_volumes = sqrt_g.mapv(|g| g * dr);
        let face_areas = Array1::from_shape_fn(n_cells + 1, |i| surface_per_radius * i as Real * dr);
        let safety_factor =
            rho.mapv(|r| q_axis + (q_edge - q_axis) * (r / minor_radius) * (r / minor_radius));

        Ok(Self {
            kind: GeometryKind::Circular,
            major_radius,
            minor_radius,
            b0,
            n_cells,
            rho,
            cell_distances,
            cell_volumes,
            face_areas,
            sqrt_g,
            safety_factor,
        })
    }
}

// Getters
impl Geometry {
    /// Returns the flux-surface shape.
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Returns the device major radius R **in \[m\]**.
    pub fn major_radius(&self) -> Real {
        self.major_radius
    }

    /// Returns the device minor radius a **in \[m\]**.
    pub fn minor_radius(&self) -> Real {
        self.minor_radius
    }

    /// Returns the toroidal field on axis B₀ **in \[T\]**.
    pub fn b0(&self) -> Real {
        self.b0
    }

    /// Returns the number of radial cells N.
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Returns the uniform radial spacing Δρ = a/N **in \[m\]**.
    pub fn dr(&self) -> Real {
        self.minor_radius / self.n_cells as Real
    }

    /// Returns the cell-centered radial coordinates **in \[m\]**.
    pub fn rho(&self) -> &Array1<Real> {
        &self.rho
    }

    /// Returns the distances between adjacent cell centers **in \[m\]**.
    pub fn cell_distances(&self) -> &Array1<Real> {
        &self.cell_distances
    }

    /// Returns the cell volumes **in \[m³\]**.
    pub fn cell_volumes(&self) -> &Array1<Real> {
        &self.cell_volumes
    }

    /// Returns the face areas **in \[m²\]**.
    pub fn face_areas(&self) -> &Array1<Real> {
        &self.face_areas
    }

    /// Returns the cell-centered Jacobian √g **in \[m²\]**.
    pub fn sqrt_g(&self) -> &Array1<Real> {
        &self.sqrt_g
    }

    /// Returns the safety factor profile q(ρ).
    pub fn safety_factor(&self) -> &Array1<Real> {
        &self.safety_factor
    }

    /// Returns the total plasma volume **in \[m³\]**.
    pub fn plasma_volume(&self) -> Real {
        self.cell_volumes.sum()
    }

    /// Returns the metric view consumed by the solver.
    pub fn factors(&self) -> GeometricFactors {
        GeometricFactors::new(
            self.cell_distances.clone(),
            self.cell_volumes.clone(),
            self.face_areas.clone(),
            self.sqrt_g.clone(),
        )
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("kind", &self.kind)
            .field("R [m]", &format!("{:.3}", self.major_radius))
            .field("a [m]", &format!("{:.3}", self.minor_radius))
            .field("B0 [T]", &format!("{:.3}", self.b0))
            .field("n_cells", &self.n_cells)
            .field("V [m^3]", &format!("{:.3}", self.plasma_volume()))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invariants() {
        assert!(matches!(
            Geometry::circular(50, -3.0, 1.0, 2.5),
            Err(GeometryError::NonPositive { name: "major_radius", .. })
        ));
        assert!(matches!(
            Geometry::circular(1, 3.0, 1.0, 2.5),
            Err(GeometryError::TooFewCells { found: 1 })
        ));
        assert!(matches!(
            Geometry::circular(50, 3.0, 2.0, 2.5),
            Err(GeometryError::AspectRatio { .. })
        ));
    }

    #[test]
    fn test_shapes_and_monotonicity() {
        let geometry = Geometry::circular(50, 3.0, 1.0, 2.5).unwrap();
        assert_eq!(geometry.rho().len(), 50);
        assert_eq!(geometry.cell_distances().len(), 49);
        assert_eq!(geometry.cell_volumes().len(), 50);
        assert_eq!(geometry.face_areas().len(), 51);
        assert_eq!(geometry.sqrt_g().len(), 50);
        assert_eq!(geometry.safety_factor().len(), 50);

        for window in geometry.rho().as_slice().unwrap().windows(2) {
            assert!(window[1] > window[0]);
        }
        assert!(geometry.rho().iter().all(|&r| r > 0.0));
        assert!(geometry.sqrt_g().iter().all(|&g| g > 0.0));
    }

    #[test]
    fn test_volume_consistency() {
        let geometry = Geometry::circular(200, 3.0, 1.0, 2.5).unwrap();
        // Midpoint-rule cell volumes sum to the torus volume 2π²Ra² exactly.
        let analytic = (2.0 * PI * PI) as Real * 3.0 * 1.0 * 1.0;
        assert_relative_eq!(geometry.plasma_volume(), analytic, max_relative = 1e-4);

        // Vᵢ = √gᵢ·Δρ by construction.
        let dr = geometry.dr();
        for (volume, sqrt_g) in geometry.cell_volumes().iter().zip(geometry.sqrt_g()) {
            assert_relative_eq!(*volume, sqrt_g * dr, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_q_profile_endpoints() {
        let geometry = Geometry::circular_with_q(100, 3.0, 1.0, 2.5, 1.0, 3.0).unwrap();
        let q = geometry.safety_factor();
        assert!(q[0] < 1.01);
        assert!((q[99] - 3.0).abs() < 0.05);
        for window in q.as_slice().unwrap().windows(2) {
            assert!(window[1] >= window[0]);
        }
    }
}
