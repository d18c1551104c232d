//! The hierarchical run configuration.
//!
//! Split into the *fixed* runtime parameters (structural: mesh, which
//! equations evolve, solver and scheme settings) and the *dynamic*
//! parameters (exchangeable between steps: boundary conditions, model
//! selections, source enables, initial shapes). Time and output settings
//! sit beside them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use torrent_common::{EvolveFlags, Real, StateBoundaries};
use torrent_geometry::GeometryKind;

/// Top-level configuration of a simulation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TorrentConfig {
    /// Runtime parameters.
    pub runtime: RuntimeConfig,
    /// Time span and adaptive timestep settings.
    pub time: TimeConfig,
    /// Output cadence and destination.
    pub output: OutputConfig,
}

/// Runtime parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuntimeConfig {
    /// Structural settings, fixed for the lifetime of a run.
    pub fixed: FixedParams,
    /// Per-step exchangeable settings.
    pub dynamic: DynamicParams,
}

/// Structural runtime parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedParams {
    /// Radial mesh and device dimensions.
    pub mesh: MeshConfig,
    /// Which of the four equations evolve.
    pub evolve: EvolveFlags,
    /// Nonlinear and linear solver settings.
    pub solver: SolverConfig,
    /// Time discretization settings.
    pub scheme: SchemeConfig,
}

/// Radial mesh and device dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshConfig {
    /// Number of radial cells N.
    pub n_cells: usize,
    /// Major radius R **in \[m\]**.
    pub major_radius: Real,
    /// Minor radius a **in \[m\]**.
    pub minor_radius: Real,
    /// Toroidal field on axis **in \[T\]**.
    pub b0: Real,
    /// Flux-surface shape.
    pub kind: GeometryKind,
}

impl MeshConfig {
    /// Radial spacing Δr = a/N **in \[m\]**.
    pub fn dr(&self) -> Real {
        self.minor_radius / self.n_cells as Real
    }
}

impl Default for MeshConfig {
    /// ITER-like circular device.
    fn default() -> Self {
        Self {
            n_cells: 100,
            major_radius: 6.2,
            minor_radius: 2.0,
            b0: 5.3,
            kind: GeometryKind::Circular,
        }
    }
}

/// Nonlinear solver selection and settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Outer iteration scheme.
    pub kind: SolverKind,
    /// Base tolerances the per-equation criteria are derived from.
    pub tolerances: NumericalTolerances,
    /// Newton iteration cap.
    pub max_iterations: usize,
    /// Backtracking line search settings.
    pub line_search: LineSearchConfig,
    /// Inner linear solver settings.
    pub linear: LinearSolverConfig,
    /// Density floor applied wherever nₑ is consumed **in \[m⁻³\]**.
    pub density_floor: Real,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::NewtonRaphson,
            tolerances: NumericalTolerances::default(),
            max_iterations: 100,
            line_search: LineSearchConfig::default(),
            linear: LinearSolverConfig::default(),
            density_floor: 1.0e18,
        }
    }
}

/// Outer iteration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Newton–Raphson with scaled state and backtracking line search.
    #[default]
    NewtonRaphson,
}

/// Base tolerances for the per-equation convergence criteria.
///
/// The per-equation residual tolerance is
/// `absolute·scale(eq) + relative·‖R₀(eq)‖`, with a coarse scale (10⁴) for
/// the temperature equations and a tight one (10) for density and flux.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericalTolerances {
    /// Absolute floor of the scaled residual norm.
    pub absolute: Real,
    /// Fraction of the initial residual norm.
    pub relative: Real,
}

impl Default for NumericalTolerances {
    fn default() -> Self {
        Self {
            absolute: 1.0e-3,
            relative: 1.0e-3,
        }
    }
}

/// Backtracking line search settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchConfig {
    /// Maximum number of step halvings.
    pub max_halvings: usize,
    /// Step fraction taken when no halving reduces the residual.
    pub fallback_alpha: Real,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            max_halvings: 10,
            fallback_alpha: 0.1,
        }
    }
}

/// Inner linear solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSolverConfig {
    /// SOR relaxation factor ω.
    pub sor_omega: Real,
    /// SOR sweep cap.
    pub sor_max_iterations: usize,
    /// SOR relative update tolerance.
    pub sor_tolerance: Real,
    /// Optional quality gate on the direct solution: accept only when the
    /// relative residual stays below this threshold, otherwise fall through
    /// to SOR. `None` trusts any finite direct solution.
    pub condition_threshold: Option<Real>,
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            sor_omega: 1.5,
            sor_max_iterations: 10_000,
            sor_tolerance: 1.0e-8,
            condition_threshold: None,
        }
    }
}

/// Time discretization settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemeConfig {
    /// θ of the θ-method: 0 explicit Euler, ½ Crank–Nicolson, 1 implicit
    /// Euler.
    pub theta: Real,
    /// Move stiff source couplings into the implicit matrix term.
    pub stabilize_stiff_terms: bool,
    /// Transient coefficient of the ψ equation (poloidal inductance L_p).
    ///
    /// The physically motivated value is μ₀R₀; the historical default is 1.
    pub flux_inductance: Real,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            theta: 1.0,
            stabilize_stiff_terms: false,
            flux_inductance: 1.0,
        }
    }
}

/// Per-step exchangeable parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicParams {
    /// Boundary conditions, per variable and side.
    pub boundaries: StateBoundaries,
    /// Transport closure selection.
    pub transport: TransportConfig,
    /// Source enables and sub-configurations.
    pub sources: SourcesConfig,
    /// MHD event toggles.
    pub mhd: MhdConfig,
    /// Restart hints, if resuming from a checkpoint.
    pub restart: Option<RestartConfig>,
    /// Initial profile shapes.
    pub initial_profiles: InitialProfilesConfig,
}

/// Transport closure selection.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Default)]
pub enum TransportModelKind {
    /// Spatially uniform coefficients.
    #[default]
    Constant,
    /// Bohm/gyro-Bohm mixing closure.
    BohmGyroBohm,
    /// Regression closure with a declared training envelope.
    Surrogate,
}

/// Transport model tag plus its free parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportConfig {
    /// Which closure to run.
    pub model: TransportModelKind,
    /// Model parameters, keyed by name.
    pub params: BTreeMap<String, Real>,
}

impl TransportConfig {
    /// Recognized key: uniform χᵢ **in \[m²/s\]**.
    pub const CHI_ION: &'static str = "chi_ion";
    /// Recognized key: uniform χₑ **in \[m²/s\]**.
    pub const CHI_ELECTRON: &'static str = "chi_electron";
    /// Recognized key: uniform D **in \[m²/s\]**.
    pub const PARTICLE_DIFFUSIVITY: &'static str = "particle_diffusivity";
    /// Recognized key: uniform V **in \[m/s\]**.
    pub const CONVECTION_VELOCITY: &'static str = "convection_velocity";

    /// Reads a parameter, falling back to `default`.
    pub fn param(&self, key: &str, default: Real) -> Real {
        self.params.get(key).copied().unwrap_or(default)
    }
}

/// Source enables and sub-configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcesConfig {
    /// Ohmic heating.
    pub ohmic: bool,
    /// D–T fusion alpha heating.
    pub fusion: bool,
    /// Bremsstrahlung losses.
    pub bremsstrahlung: bool,
    /// Ion–electron collisional exchange.
    pub exchange: bool,
    /// Fuel composition.
    pub fuel: FuelMixConfig,
    /// Effective charge.
    pub z_effective: Real,
    /// Total plasma current **in \[MA\]**.
    pub plasma_current_ma: Real,
    /// Auxiliary ECRH deposition.
    pub ecrh: Option<EcrhConfig>,
    /// Edge gas puff.
    pub gas_puff: Option<GasPuffConfig>,
    /// Uniform driven current density **in \[A/m²\]**.
    pub current_drive: Option<Real>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ohmic: true,
            fusion: true,
            bremsstrahlung: true,
            exchange: true,
            fuel: FuelMixConfig::default(),
            z_effective: 1.5,
            plasma_current_ma: 10.0,
            ecrh: None,
            gas_puff: None,
            current_drive: None,
        }
    }
}

/// Fuel composition; fractions must sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelMixConfig {
    /// Deuterium fraction of nₑ.
    pub deuterium_fraction: Real,
    /// Tritium fraction of nₑ.
    pub tritium_fraction: Real,
}

impl Default for FuelMixConfig {
    fn default() -> Self {
        Self {
            deuterium_fraction: 0.5,
            tritium_fraction: 0.5,
        }
    }
}

/// Gaussian ECRH deposition settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcrhConfig {
    /// Total injected power **in \[MW\]**.
    pub power_mw: Real,
    /// Deposition centre, normalized radius ρ/a.
    pub deposition_rho: Real,
    /// Deposition width, normalized radius.
    pub width: Real,
}

impl Default for EcrhConfig {
    fn default() -> Self {
        Self {
            power_mw: 10.0,
            deposition_rho: 0.0,
            width: 0.2,
        }
    }
}

/// Edge gas puff settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasPuffConfig {
    /// Total fuelling rate **in \[particles/s\]**.
    pub rate: Real,
    /// e-folding penetration depth, normalized radius.
    pub penetration: Real,
}

impl Default for GasPuffConfig {
    fn default() -> Self {
        Self {
            rate: 1.0e21,
            penetration: 0.1,
        }
    }
}

/// MHD event toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MhdConfig {
    /// Trigger sawtooth crashes when q drops below one.
    pub sawtooth_crashes: bool,
}

/// Restart hints.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartConfig {
    /// Checkpoint file to resume from.
    pub filename: PathBuf,
    /// Simulation time to resume at **in \[s\]**.
    pub time: Real,
    /// Stitch the new history onto the checkpointed one.
    pub stitch: bool,
}

/// Shape of one initial profile:
/// `u(ρ) = edge + (core − edge)·(1 − (ρ/a)²)^exponent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileShape {
    /// On-axis value.
    pub core: Real,
    /// Edge value.
    pub edge: Real,
    /// Peaking exponent; 0 gives a flat profile.
    pub exponent: Real,
}

/// Initial profile shapes of the evolved fields; ψ starts flat at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialProfilesConfig {
    /// Tᵢ shape **in \[eV\]**.
    pub ion_temperature: ProfileShape,
    /// Tₑ shape **in \[eV\]**.
    pub electron_temperature: ProfileShape,
    /// nₑ shape **in \[m⁻³\]**.
    pub density: ProfileShape,
}

impl Default for InitialProfilesConfig {
    fn default() -> Self {
        Self {
            ion_temperature: ProfileShape {
                core: 8.0e3,
                edge: 100.0,
                exponent: 1.0,
            },
            electron_temperature: ProfileShape {
                core: 8.0e3,
                edge: 100.0,
                exponent: 1.0,
            },
            density: ProfileShape {
                core: 1.0e20,
                edge: 2.0e19,
                exponent: 1.0,
            },
        }
    }
}

/// Time span and adaptive timestep settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConfig {
    /// Start time **in \[s\]**.
    pub start: Real,
    /// End time **in \[s\]**.
    pub end: Real,
    /// First timestep **in \[s\]**.
    pub initial_dt: Real,
    /// Adaptive controller settings.
    pub adaptive: AdaptiveDtConfig,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
            initial_dt: 1.0e-3,
            adaptive: AdaptiveDtConfig::default(),
        }
    }
}

/// Adaptive timestep controller settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveDtConfig {
    /// Hard lower bound on dt **in \[s\]**; overrides `min_dt_fraction`.
    pub min_dt: Option<Real>,
    /// Lower bound on dt as a fraction of `initial_dt`.
    pub min_dt_fraction: Option<Real>,
    /// Hard upper bound on dt **in \[s\]**.
    pub max_dt: Real,
    /// CFL safety factor, in (0, 1).
    pub safety_factor: Real,
    /// Cap on step-to-step growth.
    pub max_growth: Real,
}

impl AdaptiveDtConfig {
    /// Resolves the lower dt bound against `initial_dt`.
    pub fn resolved_min_dt(&self, initial_dt: Real) -> Real {
        self.min_dt
            .or_else(|| self.min_dt_fraction.map(|fraction| fraction * initial_dt))
            .unwrap_or(1.0e-8)
    }
}

impl Default for AdaptiveDtConfig {
    fn default() -> Self {
        Self {
            min_dt: None,
            min_dt_fraction: Some(1.0e-3),
            max_dt: 1.0e-1,
            safety_factor: 0.9,
            max_growth: 1.2,
        }
    }
}

/// Output cadence and destination. The writer itself lives in the I/O
/// layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    /// Save every this many seconds of simulated time.
    pub save_interval: Real,
    /// Destination directory.
    pub directory: PathBuf,
    /// On-disk format.
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_interval: 0.1,
            directory: PathBuf::from("results"),
            format: OutputFormat::NetCdf,
        }
    }
}

/// On-disk output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One NetCDF dataset per run.
    #[default]
    NetCdf,
    /// Plain JSON time series.
    Json,
}
