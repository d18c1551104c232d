use torrent_common::{CommonError, Real};
use torrent_config::ConfigError;
use torrent_geometry::GeometryError;
use torrent_physics::PhysicsError;

use crate::newton::FailureKind;

/// Custom error types of the stepping pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SolverError {
    /// From [`CommonError`].
    #[error("{0}")]
    Common(#[from] CommonError),

    /// From [`GeometryError`].
    #[error("{0}")]
    Geometry(#[from] GeometryError),

    /// From [`PhysicsError`].
    #[error("{0}")]
    Physics(#[from] PhysicsError),

    /// From [`ConfigError`].
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A coefficient array with the wrong shape. Programmer error.
    #[error("coefficient array {name} has wrong shape: expected {expected}, found {found}")]
    CoeffShape {
        /// Which coefficient is malformed.
        name: &'static str,
        /// The required length.
        expected: usize,
        /// The offending length.
        found: usize,
    },

    /// The hybrid linear solver gave up.
    #[error("linear solver failed: {0}")]
    Linear(#[from] LinearFailure),

    /// A step kept failing after every dt shrink the controller allows.
    #[error("step failed to converge at t = {time:.6} s with dt = {dt:.3e} s ({kind:?})")]
    StepFailed {
        /// Simulation time of the failing step.
        time: Real,
        /// The smallest timestep that was attempted.
        dt: Real,
        /// Failure classification of the last attempt.
        kind: FailureKind,
    },
}

/// Failure of the iterative linear fallback, with its witnesses.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum LinearFailure {
    /// The SOR sweep diverged.
    #[error(
        "SOR diverged after {iterations} sweeps (relative update {update:.3e}, residual {residual:.3e})"
    )]
    Diverged {
        /// Sweeps performed before giving up.
        iterations: usize,
        /// Last relative update ratio.
        update: Real,
        /// ‖Ax − b‖ at exit.
        residual: Real,
    },

    /// The SOR sweep ran out of iterations without meeting its tolerance.
    #[error(
        "SOR exhausted {iterations} sweeps (relative update {update:.3e}, residual {residual:.3e})"
    )]
    Exhausted {
        /// The sweep cap.
        iterations: usize,
        /// Last relative update ratio.
        update: Real,
        /// ‖Ax − b‖ at exit.
        residual: Real,
    },
}
