#![doc = include_str!("../README.md")]

mod assembly;
mod coeffs;
mod error;
mod faces;
mod jacobian;
mod linear;
mod newton;
mod operator;
mod residual;
mod simulation;
mod timestep;

pub use assembly::{PARALLEL_RESISTIVITY, assemble_coeffs};
pub use coeffs::{Block1DCoeffs, EquationCoeffs};
pub use error::{LinearFailure, SolverError};
pub use faces::{arithmetic_faces, harmonic_faces};
pub use jacobian::finite_difference_jacobian;
pub use linear::HybridSolver;
pub use newton::{FailureKind, NewtonSettings, SolverResult, StepMetadata, newton_solve, reference_state};
pub use operator::apply_spatial;
pub use residual::ResidualAssembler;
pub use simulation::{CheckpointState, Simulation, StepRecord, initial_profiles, solve_step};
pub use timestep::TimestepController;

pub type Result<T> = std::result::Result<T, SolverError>;
