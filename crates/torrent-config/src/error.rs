use torrent_common::Real;

/// Hard configuration errors. Any of these aborts the run before stepping.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A setting is outside its physical or numerical range.
    #[error("invalid value for {name}: {value} ({reason})")]
    InvalidValue {
        /// Name of the setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// A setting the selected models cannot run without.
    #[error("missing required setting: {name}")]
    MissingRequired {
        /// Name of the absent setting.
        name: &'static str,
    },

    /// Two or more settings contradict each other.
    #[error("inconsistent settings: {reason}")]
    Inconsistency {
        /// What contradicts what.
        reason: String,
    },

    /// The explicit diffusion CFL limit is violated by the initial timestep.
    #[error(
        "CFL violation on {channel}: chi*dt/dr^2 = {cfl:.1} > 0.5; reduce dt to at most {suggested_dt:.3e} s"
    )]
    CflViolation {
        /// The transport channel whose coefficient breaks the limit.
        channel: &'static str,
        /// The offending CFL number.
        cfl: Real,
        /// A timestep that would satisfy the limit.
        suggested_dt: Real,
    },

    /// Heating strong enough to change T by more than 50% in one step.
    #[error("heating source too strong: estimated |dT|/T per step = {estimate:.2} > 0.5")]
    HeatingUnstable {
        /// The estimated per-step relative temperature change.
        estimate: Real,
    },

    /// Fuelling strong enough to change nₑ by more than 20% in one step.
    #[error("particle source too strong: estimated |dn|/n per step = {estimate:.2} > 0.2")]
    FuellingUnstable {
        /// The estimated per-step relative density change.
        estimate: Real,
    },

    /// Localized deposition narrower than the grid can resolve.
    #[error("deposition width {width:.3} m is below the resolution limit 3*dr = {limit:.3} m")]
    UnresolvedDeposition {
        /// Deposition width in meters.
        width: Real,
        /// Three radial spacings, in meters.
        limit: Real,
    },

    /// Timestep above the global diffusion timescale.
    #[error("dt = {dt:.3e} s exceeds the diffusion timescale a^2/chi_max = {limit:.3e} s")]
    TimestepAboveDiffusionTime {
        /// The configured initial timestep.
        dt: Real,
        /// The diffusion timescale.
        limit: Real,
    },

    /// Too few radial cells.
    #[error("mesh too coarse: {n_cells} cells, need at least 50")]
    MeshTooCoarse {
        /// The configured cell count.
        n_cells: usize,
    },

    /// A peaked initial profile whose core does not exceed its edge.
    #[error("peaked profile for {name} requires core > edge (core = {core}, edge = {edge})")]
    BoundaryPeakMismatch {
        /// The profile name.
        name: &'static str,
        /// Configured core value.
        core: Real,
        /// Configured edge value.
        edge: Real,
    },

    /// Initial state outside a surrogate closure's training envelope.
    #[error("surrogate transport outside training range: {reason}")]
    SurrogateOutOfRange {
        /// Which bound is violated.
        reason: String,
    },

    /// Fuel fractions that do not sum to one.
    #[error("fuel fractions must sum to 1: D {deuterium} + T {tritium} = {sum}")]
    InvalidFuelMix {
        /// Deuterium fraction.
        deuterium: Real,
        /// Tritium fraction.
        tritium: Real,
        /// Their sum.
        sum: Real,
    },
}

/// Advisory conditions. Collected, never thrown.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// Peak auxiliary power density above ~10 MW/m³.
    HighPowerDensity {
        /// Estimated peak power density in MW/m³.
        peak: Real,
    },
    /// Initial dt more than three orders of magnitude below the CFL limit.
    TimestepFarBelowCfl {
        /// The configured initial timestep.
        dt: Real,
        /// The CFL-limited timestep.
        limit: Real,
    },
    /// Profile exponents steep enough to strain the radial resolution.
    VeryPeakedProfile {
        /// The profile name.
        name: &'static str,
        /// The configured exponent.
        exponent: Real,
    },
    /// More cells than the single-precision pipeline benefits from.
    FineMesh {
        /// The configured cell count.
        n_cells: usize,
    },
    /// Fusion enabled in a regime where it contributes nothing.
    FusionNegligible {
        /// Configured core ion temperature in eV.
        core_ti: Real,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighPowerDensity { peak } => {
                write!(f, "peak auxiliary power density {peak:.1} MW/m^3 is high")
            }
            Self::TimestepFarBelowCfl { dt, limit } => {
                write!(f, "initial dt {dt:.1e} s is far below the CFL limit {limit:.1e} s")
            }
            Self::VeryPeakedProfile { name, exponent } => {
                write!(f, "{name} profile exponent {exponent:.1} is very peaked")
            }
            Self::FineMesh { n_cells } => write!(f, "{n_cells} cells is unusually fine"),
            Self::FusionNegligible { core_ti } => {
                write!(f, "fusion enabled but core T_i = {core_ti:.0} eV produces negligible power")
            }
        }
    }
}
