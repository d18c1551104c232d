#![doc = include_str!("../README.md")]

mod error;
mod schema;
mod validate;

pub use error::{ConfigError, ConfigWarning};
pub use schema::{
    AdaptiveDtConfig, DynamicParams, EcrhConfig, FixedParams, FuelMixConfig, GasPuffConfig,
    InitialProfilesConfig, LineSearchConfig, LinearSolverConfig, MeshConfig, MhdConfig,
    NumericalTolerances, OutputConfig, OutputFormat, ProfileShape, RestartConfig, RuntimeConfig,
    SchemeConfig, SolverConfig, SolverKind, SourcesConfig, TimeConfig, TorrentConfig,
    TransportConfig, TransportModelKind,
};

pub type Result<T> = std::result::Result<T, ConfigError>;
