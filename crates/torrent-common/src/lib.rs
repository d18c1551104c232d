#![doc = include_str!("../README.md")]

mod boundary;
mod error;
mod evaluated;
mod limiter;
mod profiles;
mod state;

pub use boundary::{BoundaryCondition, BoundarySet, EvolveFlags, Field, StateBoundaries};
pub use error::CommonError;
pub use evaluated::Evaluated;
pub use limiter::LogLimiter;
pub use profiles::{CoreProfiles, DENSITY_FLOOR};
pub use state::{FlattenedState, StateLayout};

pub type Result<T> = std::result::Result<T, CommonError>;

/// The scalar type of the hot numerical state.
///
/// Single precision, matching the numerical backend the solver was designed
/// against. Quantities spanning more than ~7 orders of magnitude (densities,
/// residuals) must be rescaled before being combined.
#[doc(alias = "f32")]
pub type Real = f32;

/// Conversion from MW/m³ to eV/(m³·s): 10⁶/e.
///
/// Heating sources arrive in MW/m³ and must be converted to equation units
/// before assembly.
pub const MEGAWATTS_TO_EV: Real = 6.241509e24;

/// Temperature in electron-volts.
#[doc(alias = "f32")]
pub type ElectronVolts = Real;

/// Particle density in m⁻³.
#[doc(alias = "f32")]
pub type PerCubicMeter = Real;

/// Magnetic flux in Webers.
#[doc(alias = "f32")]
pub type Webers = Real;
