#![doc = include_str!("../README.md")]

mod error;
mod sources;
mod transport;

pub use error::PhysicsError;
pub use sources::{
    CompositeSources, FuelMix, GasPuff, GaussianEcrh, NoSources, SourceModel, SourceTerms,
};
pub use transport::{
    BohmGyroBohm, ConstantTransport, FittedSurrogate, TransportCoefficients, TransportModel,
};

pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Conversion factor from eV to Joules (elementary charge).
pub const EV_TO_JOULES: f64 = 1.602_176_634e-19;
