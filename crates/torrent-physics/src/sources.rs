//! Heat, particle and current sources on the radial cell grid.
//!
//! Heating terms are returned **in \[MW/m³\]**; the coefficient assembly
//! converts them to equation units. Model internals run in f64: densities
//! enter squared (10⁴⁰), which does not fit the f32 hot state.

use ndarray::Array1;
use torrent_common::{CoreProfiles, Evaluated, LogLimiter, Real};
use torrent_geometry::Geometry;

use crate::{EV_TO_JOULES, Result};

/// D–T reactivity fit ⟨σv⟩ ≈ C·T², T in keV. Valid roughly for 8–25 keV.
const SIGMA_V_PER_KEV2: f64 = 1.1e-24;

/// Energy of the fusion alpha **in \[J\]** (3.5 MeV).
const ALPHA_ENERGY_J: f64 = 5.6e-13;

/// Bremsstrahlung coefficient, P = C·Zeff·nₑ²·√Tₑ(keV) **in \[W/m³\]**.
const BREMSSTRAHLUNG_COEFF: f64 = 5.35e-37;

/// Electron collision rate coefficient, ν = C·nₑ·lnΛ·Tₑ(eV)^(−3/2).
const COLLISION_RATE_COEFF: f64 = 2.91e-12;

/// Electron to deuteron mass ratio.
const MASS_RATIO: f64 = 2.724e-4;

/// Coulomb logarithm, held fixed.
const COULOMB_LOG: f64 = 15.0;

/// Spitzer parallel resistivity, η = C·Zeff·Tₑ(keV)^(−3/2) **in \[Ω·m\]**.
const SPITZER_COEFF: f64 = 2.8e-8;

static INVALID_SOURCE_INPUT: LogLimiter = LogLimiter::new(5);

/// Cell-centered source terms of the four equations.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTerms {
    /// Ion heating **in \[MW/m³\]**.
    ion_heating: Evaluated,
    /// Electron heating **in \[MW/m³\]**.
    electron_heating: Evaluated,
    /// Particle source **in \[m⁻³/s\]**.
    particle_source: Evaluated,
    /// Current source **in \[A/m²\]**.
    current_source: Evaluated,
}

impl SourceTerms {
    /// Wraps and validates the four source arrays.
    ///
    /// # Errors
    ///
    /// Rejects arrays that disagree on the cell count.
    pub fn new(
        ion_heating: Array1<Real>,
        electron_heating: Array1<Real>,
        particle_source: Array1<Real>,
        current_source: Array1<Real>,
    ) -> Result<Self> {
        let n_cells = ion_heating.len();
        for found in [
            electron_heating.len(),
            particle_source.len(),
            current_source.len(),
        ] {
            if found != n_cells {
                return Err(torrent_common::CommonError::ShapeMismatch {
                    expected: n_cells,
                    found,
                }
                .into());
            }
        }
        Ok(Self {
            ion_heating: Evaluated::new(ion_heating),
            electron_heating: Evaluated::new(electron_heating),
            particle_source: Evaluated::new(particle_source),
            current_source: Evaluated::new(current_source),
        })
    }

    /// All-zero terms for a grid of `n_cells`.
    pub fn zeros(n_cells: usize) -> Self {
        Self {
            ion_heating: Evaluated::new(Array1::zeros(n_cells)),
            electron_heating: Evaluated::new(Array1::zeros(n_cells)),
            particle_source: Evaluated::new(Array1::zeros(n_cells)),
            current_source: Evaluated::new(Array1::zeros(n_cells)),
        }
    }

    /// Returns the ion heating **in \[MW/m³\]**.
    pub fn ion_heating(&self) -> &Evaluated {
        &self.ion_heating
    }

    /// Returns the electron heating **in \[MW/m³\]**.
    pub fn electron_heating(&self) -> &Evaluated {
        &self.electron_heating
    }

    /// Returns the particle source **in \[m⁻³/s\]**.
    pub fn particle_source(&self) -> &Evaluated {
        &self.particle_source
    }

    /// Returns the current source **in \[A/m²\]**.
    pub fn current_source(&self) -> &Evaluated {
        &self.current_source
    }
}

/// A source model: profiles + geometry → source terms.
///
/// Implementations must be pure and must fail safely: on invalid input
/// (non-finite profiles, nₑ ≤ 0) they return zero terms rather than an
/// error, so a wandering Newton iterate cannot poison the residual.
pub trait SourceModel: std::fmt::Debug {
    /// Evaluates the source terms on the current profiles.
    ///
    /// # Errors
    ///
    /// Shape violations only; physical degeneracies are handled by the
    /// fail-safe contract.
    fn terms(&self, profiles: &CoreProfiles, geometry: &Geometry) -> Result<SourceTerms>;
}

/// Returns `true` when the fail-safe path must be taken.
fn input_invalid(profiles: &CoreProfiles) -> bool {
    let degenerate = !profiles.is_finite() || profiles.ne().iter().any(|&ne| ne <= 0.0);
    if degenerate && INVALID_SOURCE_INPUT.should_log() {
        log::warn!("source model received degenerate profiles; returning zero terms");
    }
    degenerate
}

// ===============================================================================================

/// No sources at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSources;

impl SourceModel for NoSources {
    fn terms(&self, profiles: &CoreProfiles, _geometry: &Geometry) -> Result<SourceTerms> {
        Ok(SourceTerms::zeros(profiles.n_cells()))
    }
}

// ===============================================================================================

/// Gaussian ECRH deposition.
///
/// The radial shape exp(−½((ρ/a − c)/w)²) is normalized against the cell
/// volumes so the volume integral reproduces `total_power_mw` exactly on
/// the discrete grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianEcrh {
    /// Total injected power **in \[MW\]**.
    pub total_power_mw: Real,
    /// Deposition centre, normalized radius ρ/a.
    pub deposition_rho: Real,
    /// Deposition width, normalized radius.
    pub width: Real,
    /// Fraction of the power deposited on electrons; the rest heats ions.
    pub electron_fraction: Real,
}

impl Default for GaussianEcrh {
    fn default() -> Self {
        Self {
            total_power_mw: 10.0,
            deposition_rho: 0.0,
            width: 0.2,
            electron_fraction: 1.0,
        }
    }
}

impl GaussianEcrh {
    /// Volumetric deposition density **in \[MW/m³\]**.
    fn density(&self, geometry: &Geometry) -> Array1<Real> {
        let minor_radius = geometry.minor_radius();
        let width = self.width.max(1e-3);
        let shape = geometry.rho().mapv(|rho| {
            let offset = (rho / minor_radius - self.deposition_rho) / width;
            (-0.5 * f64::from(offset * offset)).exp() as Real
        });
        let weighted: Real = shape
            .iter()
            .zip(geometry.cell_volumes())
            .map(|(s, v)| s * v)
            .sum();
        shape.mapv(|s| s * self.total_power_mw / weighted.max(1e-30))
    }
}

impl SourceModel for GaussianEcrh {
    fn terms(&self, profiles: &CoreProfiles, geometry: &Geometry) -> Result<SourceTerms> {
        let n_cells = profiles.n_cells();
        if input_invalid(profiles) {
            return Ok(SourceTerms::zeros(n_cells));
        }
        let density = self.density(geometry);
        let electron = density.mapv(|p| p * self.electron_fraction);
        let ion = density.mapv(|p| p * (1.0 - self.electron_fraction));
        SourceTerms::new(ion, electron, Array1::zeros(n_cells), Array1::zeros(n_cells))
    }
}

// ===============================================================================================

/// Edge gas puff, exponentially attenuated inward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasPuff {
    /// Total fuelling rate **in \[particles/s\]**.
    pub total_rate: Real,
    /// e-folding penetration depth, normalized radius.
    pub penetration: Real,
}

impl Default for GasPuff {
    fn default() -> Self {
        Self {
            total_rate: 1.0e21,
            penetration: 0.1,
        }
    }
}

impl SourceModel for GasPuff {
    fn terms(&self, profiles: &CoreProfiles, geometry: &Geometry) -> Result<SourceTerms> {
        let n_cells = profiles.n_cells();
        if input_invalid(profiles) {
            return Ok(SourceTerms::zeros(n_cells));
        }
        let minor_radius = geometry.minor_radius();
        let penetration = self.penetration.max(1e-3);
        let shape = geometry
            .rho()
            .mapv(|rho| (-(1.0 - rho / minor_radius) / penetration).exp());
        let weighted: Real = shape
            .iter()
            .zip(geometry.cell_volumes())
            .map(|(s, v)| s * v)
            .sum();
        let particle = shape.mapv(|s| s * self.total_rate / weighted.max(1e-30));
        SourceTerms::new(
            Array1::zeros(n_cells),
            Array1::zeros(n_cells),
            particle,
            Array1::zeros(n_cells),
        )
    }
}

// ===============================================================================================

/// Fuel ion composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelMix {
    /// Deuterium fraction of nₑ.
    pub deuterium: Real,
    /// Tritium fraction of nₑ.
    pub tritium: Real,
}

impl Default for FuelMix {
    fn default() -> Self {
        Self {
            deuterium: 0.5,
            tritium: 0.5,
        }
    }
}

/// The bundled intrinsic sources: fusion alphas, ohmic heating,
/// bremsstrahlung losses, ion–electron exchange, plus optional auxiliary
/// heating, fuelling and current drive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeSources {
    /// Enable D–T fusion alpha heating.
    pub fusion: bool,
    /// Enable ohmic heating.
    pub ohmic: bool,
    /// Enable bremsstrahlung losses.
    pub bremsstrahlung: bool,
    /// Enable ion–electron collisional exchange.
    pub exchange: bool,
    /// Fuel composition used by the fusion term.
    pub fuel: FuelMix,
    /// Effective charge.
    pub z_effective: Real,
    /// Total plasma current **in \[MA\]**, for the ohmic term.
    pub plasma_current_ma: Real,
    /// Auxiliary ECRH deposition.
    pub ecrh: Option<GaussianEcrh>,
    /// Edge fuelling.
    pub gas_puff: Option<GasPuff>,
    /// Uniform driven current density **in \[A/m²\]**.
    pub current_drive: Option<Real>,
}

impl Default for CompositeSources {
    fn default() -> Self {
        Self {
            fusion: true,
            ohmic: true,
            bremsstrahlung: true,
            exchange: true,
            fuel: FuelMix::default(),
            z_effective: 1.5,
            plasma_current_ma: 10.0,
            ecrh: None,
            gas_puff: None,
            current_drive: None,
        }
    }
}

impl CompositeSources {
    /// Alpha power split: fraction deposited on electrons.
    const ALPHA_ELECTRON_FRACTION: f64 = 0.7;

    /// Fusion alpha heating **in \[W/m³\]**, per cell.
    fn fusion_power(&self, ti: Real, ne: Real) -> f64 {
        let ti_kev = f64::from(ti) / 1.0e3;
        let ne = f64::from(ne);
        let sigma_v = SIGMA_V_PER_KEV2 * ti_kev * ti_kev;
        f64::from(self.fuel.deuterium) * f64::from(self.fuel.tritium) * ne * ne * sigma_v
            * ALPHA_ENERGY_J
    }

    /// Bremsstrahlung loss **in \[W/m³\]**, per cell.
    fn bremsstrahlung_power(&self, te: Real, ne: Real) -> f64 {
        let te_kev = (f64::from(te) / 1.0e3).max(1e-6);
        let ne = f64::from(ne);
        BREMSSTRAHLUNG_COEFF * f64::from(self.z_effective) * ne * ne * te_kev.sqrt()
    }

    /// Collisional ion–electron equilibration **in \[W/m³\]**.
    ///
    /// Positive when the electrons are hotter, i.e. when energy flows to
    /// the ions.
    fn exchange_power(&self, ti: Real, te: Real, ne: Real) -> f64 {
        let te_ev = f64::from(te).max(1.0);
        let ne = f64::from(ne);
        let collision_rate = COLLISION_RATE_COEFF * ne * COULOMB_LOG * te_ev.powf(-1.5);
        3.0 * MASS_RATIO * ne * collision_rate * f64::from(te - ti) * EV_TO_JOULES
    }

    /// Ohmic heating **in \[W/m³\]** at uniform current density.
    fn ohmic_power(&self, te: Real, geometry: &Geometry) -> f64 {
        let te_kev = (f64::from(te) / 1.0e3).max(1e-6);
        let minor_radius = f64::from(geometry.minor_radius());
        let current_density =
            f64::from(self.plasma_current_ma) * 1.0e6 / (std::f64::consts::PI * minor_radius * minor_radius);
        let resistivity = SPITZER_COEFF * f64::from(self.z_effective) * te_kev.powf(-1.5);
        resistivity * current_density * current_density
    }
}

impl SourceModel for CompositeSources {
    fn terms(&self, profiles: &CoreProfiles, geometry: &Geometry) -> Result<SourceTerms> {
        let n_cells = profiles.n_cells();
        if input_invalid(profiles) {
            return Ok(SourceTerms::zeros(n_cells));
        }

        let mut ion = Array1::<f64>::zeros(n_cells);
        let mut electron = Array1::<f64>::zeros(n_cells);
        let mut particle = Array1::<Real>::zeros(n_cells);
        let mut current = Array1::<Real>::zeros(n_cells);

        for i in 0..n_cells {
            let (ti, te, ne) = (profiles.ti()[i], profiles.te()[i], profiles.ne()[i]);

            if self.fusion {
                let alpha = self.fusion_power(ti, ne);
                ion[i] += alpha * (1.0 - Self::ALPHA_ELECTRON_FRACTION);
                electron[i] += alpha * Self::ALPHA_ELECTRON_FRACTION;
            }
            if self.ohmic {
                electron[i] += self.ohmic_power(te, geometry);
            }
            if self.bremsstrahlung {
                electron[i] -= self.bremsstrahlung_power(te, ne);
            }
            if self.exchange {
                let exchanged = self.exchange_power(ti, te, ne);
                ion[i] += exchanged;
                electron[i] -= exchanged;
            }
        }

        // W/m³ → MW/m³ happens here; the eV conversion is the assembler's.
        let mut ion = ion.mapv(|p| (p / 1.0e6) as Real);
        let mut electron = electron.mapv(|p| (p / 1.0e6) as Real);

        if let Some(ecrh) = &self.ecrh {
            let aux = ecrh.terms(profiles, geometry)?;
            ion += aux.ion_heating().as_array();
            electron += aux.electron_heating().as_array();
        }
        if let Some(puff) = &self.gas_puff {
            let fuelling = puff.terms(profiles, geometry)?;
            particle += fuelling.particle_source().as_array();
        }
        if let Some(drive) = self.current_drive {
            current.fill(drive);
        }

        SourceTerms::new(ion, electron, particle, current)
    }
}
