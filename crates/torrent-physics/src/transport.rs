//! Transport closures: χᵢ, χₑ, D and V on the radial cell grid.

use ndarray::Array1;
use torrent_common::{CoreProfiles, Evaluated, Real};
use torrent_geometry::Geometry;

use crate::{PhysicsError, Result};

/// Cell-centered transport coefficients, one value per radial cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCoefficients {
    /// Ion heat conductivity χᵢ **in \[m²/s\]**.
    chi_ion: Evaluated,
    /// Electron heat conductivity χₑ **in \[m²/s\]**.
    chi_electron: Evaluated,
    /// Particle diffusivity D **in \[m²/s\]**.
    particle_diffusivity: Evaluated,
    /// Particle convection velocity V **in \[m/s\]**; negative is an inward
    /// pinch.
    convection: Evaluated,
}

impl TransportCoefficients {
    /// Wraps and validates the four coefficient arrays.
    ///
    /// # Errors
    ///
    /// Shape mismatches and negative diffusivities are rejected; the
    /// convection velocity may take either sign.
    pub fn new(
        chi_ion: Array1<Real>,
        chi_electron: Array1<Real>,
        particle_diffusivity: Array1<Real>,
        convection: Array1<Real>,
    ) -> Result<Self> {
        let n_cells = chi_ion.len();
        for found in [
            chi_electron.len(),
            particle_diffusivity.len(),
            convection.len(),
        ] {
            if found != n_cells {
                return Err(torrent_common::CommonError::ShapeMismatch {
                    expected: n_cells,
                    found,
                }
                .into());
            }
        }
        for (name, array) in [
            ("chi_ion", &chi_ion),
            ("chi_electron", &chi_electron),
            ("particle_diffusivity", &particle_diffusivity),
        ] {
            if array.iter().any(|&value| value < 0.0) {
                return Err(PhysicsError::NegativeCoefficient { name });
            }
        }
        Ok(Self {
            chi_ion: Evaluated::new(chi_ion),
            chi_electron: Evaluated::new(chi_electron),
            particle_diffusivity: Evaluated::new(particle_diffusivity),
            convection: Evaluated::new(convection),
        })
    }

    /// Returns χᵢ **in \[m²/s\]**.
    pub fn chi_ion(&self) -> &Evaluated {
        &self.chi_ion
    }

    /// Returns χₑ **in \[m²/s\]**.
    pub fn chi_electron(&self) -> &Evaluated {
        &self.chi_electron
    }

    /// Returns D **in \[m²/s\]**.
    pub fn particle_diffusivity(&self) -> &Evaluated {
        &self.particle_diffusivity
    }

    /// Returns V **in \[m/s\]**.
    pub fn convection(&self) -> &Evaluated {
        &self.convection
    }

    /// The largest diffusive coefficient over all channels and cells.
    ///
    /// This is the χ_max entering the diffusion CFL limit.
    pub fn max_diffusivity(&self) -> Real {
        [&self.chi_ion, &self.chi_electron, &self.particle_diffusivity]
            .iter()
            .flat_map(|channel| channel.iter().copied())
            .fold(0.0, Real::max)
    }

    /// The largest |V| over all cells.
    pub fn max_convection(&self) -> Real {
        self.convection.iter().fold(0.0, |max, &v| max.max(v.abs()))
    }
}

/// A transport closure: profiles + geometry → coefficients.
///
/// Implementations must be pure functions; the solver may call them at every
/// Newton iterate.
pub trait TransportModel: std::fmt::Debug {
    /// Evaluates the closure on the current profiles.
    ///
    /// # Errors
    ///
    /// Model-specific; shape and sign violations at minimum.
    fn coefficients(
        &self,
        profiles: &CoreProfiles,
        geometry: &Geometry,
    ) -> Result<TransportCoefficients>;
}

// ===============================================================================================

/// Spatially uniform transport, the workhorse for verification runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTransport {
    /// χᵢ **in \[m²/s\]**.
    pub chi_ion: Real,
    /// χₑ **in \[m²/s\]**.
    pub chi_electron: Real,
    /// D **in \[m²/s\]**.
    pub particle_diffusivity: Real,
    /// V **in \[m/s\]**.
    pub convection: Real,
}

impl Default for ConstantTransport {
    fn default() -> Self {
        Self {
            chi_ion: 1.0,
            chi_electron: 1.0,
            particle_diffusivity: 0.5,
            convection: 0.0,
        }
    }
}

impl TransportModel for ConstantTransport {
    fn coefficients(
        &self,
        profiles: &CoreProfiles,
        _geometry: &Geometry,
    ) -> Result<TransportCoefficients> {
        let n_cells = profiles.n_cells();
        TransportCoefficients::new(
            Array1::from_elem(n_cells, self.chi_ion),
            Array1::from_elem(n_cells, self.chi_electron),
            Array1::from_elem(n_cells, self.particle_diffusivity),
            Array1::from_elem(n_cells, self.convection),
        )
    }
}

// ===============================================================================================

/// Bohm/gyro-Bohm mixing closure.
///
/// Local approximation: χₑ = α_B·χ_Bohm + α_gB·ρ*·χ_Bohm with
/// χ_Bohm = Tₑ/(16·B) and ρ* = ρ_s/a the normalized ion sound gyroradius.
/// The ion channel and the particle channel are scaled off the electron
/// channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BohmGyroBohm {
    /// Weight of the Bohm term.
    pub alpha_bohm: Real,
    /// Weight of the gyro-Bohm term.
    pub alpha_gyro_bohm: Real,
    /// χᵢ/χₑ ratio.
    pub ion_ratio: Real,
    /// D/χₑ ratio.
    pub diffusivity_ratio: Real,
    /// Pinch velocity **in \[m/s\]**, uniform.
    pub pinch: Real,
}

impl Default for BohmGyroBohm {
    fn default() -> Self {
        Self {
            alpha_bohm: 0.05,
            alpha_gyro_bohm: 0.35,
            ion_ratio: 2.0,
            diffusivity_ratio: 0.3,
            pinch: -0.2,
        }
    }
}

impl TransportModel for BohmGyroBohm {
    fn coefficients(
        &self,
        profiles: &CoreProfiles,
        geometry: &Geometry,
    ) -> Result<TransportCoefficients> {
        let b0 = f64::from(geometry.b0());
        let minor_radius = f64::from(geometry.minor_radius());

        let chi_electron = profiles.te().mapv(|te| {
            let te = f64::from(te.max(1.0));
            let chi_bohm = te / (16.0 * b0);
            // Deuterium sound gyroradius.
            let rho_star = 1.02e-4 * (2.0 * te).sqrt() / (b0 * minor_radius);
            (f64::from(self.alpha_bohm) * chi_bohm
                + f64::from(self.alpha_gyro_bohm) * rho_star * chi_bohm) as Real
        });
        let chi_ion = chi_electron.mapv(|chi| chi * self.ion_ratio);
        let particle_diffusivity = chi_electron.mapv(|chi| chi * self.diffusivity_ratio);
        let convection = Array1::from_elem(profiles.n_cells(), self.pinch);

        TransportCoefficients::new(chi_ion, chi_electron, particle_diffusivity, convection)
    }
}

// ===============================================================================================

/// A regression-style closure with a declared training envelope.
///
/// Power-law fit of core turbulent transport; only trustworthy for
/// Tₑ ≥ 500 eV and nₑ ∈ [10¹⁹, 10²⁰] m⁻³. The configuration validator
/// enforces the envelope before a run starts; evaluation itself clamps
/// silently so Newton iterates passing through the boundary stay defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedSurrogate {
    /// χₑ at the fit's reference point (1 keV, 10²⁰ m⁻³) **in \[m²/s\]**.
    pub reference_chi: Real,
    /// Temperature exponent.
    pub temperature_exponent: Real,
    /// Density exponent.
    pub density_exponent: Real,
}

impl FittedSurrogate {
    /// Lower edge of the training envelope in Tₑ **\[eV\]**.
    pub const MIN_TE: Real = 500.0;
    /// Training envelope in nₑ **\[m⁻³\]**.
    pub const DENSITY_RANGE: (Real, Real) = (1.0e19, 1.0e20);
}

impl Default for FittedSurrogate {
    fn default() -> Self {
        Self {
            reference_chi: 1.2,
            temperature_exponent: 1.5,
            density_exponent: -0.5,
        }
    }
}

impl TransportModel for FittedSurrogate {
    fn coefficients(
        &self,
        profiles: &CoreProfiles,
        _geometry: &Geometry,
    ) -> Result<TransportCoefficients> {
        let chi_electron = ndarray::Zip::from(profiles.te())
            .and(profiles.ne())
            .map_collect(|&te, &ne| {
                let te = f64::from(te.max(Self::MIN_TE)) / 1.0e3;
                let ne = f64::from(ne.clamp(Self::DENSITY_RANGE.0, Self::DENSITY_RANGE.1)) / 1.0e20;
                (f64::from(self.reference_chi)
                    * te.powf(f64::from(self.temperature_exponent))
                    * ne.powf(f64::from(self.density_exponent))) as Real
            });
        let chi_ion = chi_electron.clone();
        let particle_diffusivity = chi_electron.mapv(|chi| 0.3 * chi);
        let convection = Array1::zeros(profiles.n_cells());

        TransportCoefficients::new(chi_ion, chi_electron, particle_diffusivity, convection)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array1;
    use torrent_common::CoreProfiles;

    fn sample_profiles(n_cells: usize) -> CoreProfiles {
        CoreProfiles::new(
            Array1::from_elem(n_cells, 2.0e3),
            Array1::from_elem(n_cells, 3.0e3),
            Array1::from_elem(n_cells, 5.0e19),
            Array1::zeros(n_cells),
        )
        .unwrap()
    }

    fn sample_geometry() -> Geometry {
        Geometry::circular(50, 3.0, 1.0, 2.5).unwrap()
    }

    #[test]
    fn test_shape_and_sign_validation() {
        let bad = TransportCoefficients::new(
            Array1::from_elem(10, 1.0),
            Array1::from_elem(9, 1.0),
            Array1::from_elem(10, 1.0),
            Array1::zeros(10),
        );
        assert!(matches!(bad, Err(PhysicsError::Common(..))));

        let negative = TransportCoefficients::new(
            Array1::from_elem(10, -1.0),
            Array1::from_elem(10, 1.0),
            Array1::from_elem(10, 1.0),
            Array1::zeros(10),
        );
        assert!(matches!(
            negative,
            Err(PhysicsError::NegativeCoefficient { name: "chi_ion" })
        ));
    }

    #[test]
    fn test_constant_transport() {
        let model = ConstantTransport::default();
        let coefficients = model
            .coefficients(&sample_profiles(50), &sample_geometry())
            .unwrap();
        assert_eq!(coefficients.chi_ion().len(), 50);
        assert_eq!(coefficients.max_diffusivity(), 1.0);
        assert_eq!(coefficients.max_convection(), 0.0);
    }

    #[test]
    fn test_bohm_gyro_bohm_scales_with_te() {
        let model = BohmGyroBohm::default();
        let cold = model
            .coefficients(&sample_profiles(50), &sample_geometry())
            .unwrap();

        let mut hot_profiles = sample_profiles(50);
        hot_profiles = CoreProfiles::new(
            hot_profiles.ti().clone(),
            hot_profiles.te() * 4.0,
            hot_profiles.ne().clone(),
            hot_profiles.psi().clone(),
        )
        .unwrap();
        let hot = model.coefficients(&hot_profiles, &sample_geometry()).unwrap();

        assert!(hot.chi_electron()[25] > cold.chi_electron()[25]);
        assert!(hot.chi_ion()[25] > hot.chi_electron()[25]);
    }

    #[test]
    fn test_surrogate_clamps_out_of_envelope_inputs() {
        let model = FittedSurrogate::default();
        let cold = CoreProfiles::new(
            Array1::from_elem(10, 1.0e3),
            Array1::from_elem(10, 10.0), // far below the envelope
            Array1::from_elem(10, 5.0e19),
            Array1::zeros(10),
        )
        .unwrap();
        let coefficients = model.coefficients(&cold, &sample_geometry()).unwrap();
        assert!(coefficients.chi_electron().iter().all(|chi| chi.is_finite()));
        assert!(coefficients.chi_electron().iter().all(|&chi| chi > 0.0));
    }
}
