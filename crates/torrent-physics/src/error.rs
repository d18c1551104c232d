use torrent_common::CommonError;

/// Custom error types for model evaluation.
#[derive(thiserror::Error, Debug)]
pub enum PhysicsError {
    /// From [`CommonError`].
    #[error("{0}")]
    Common(#[from] CommonError),

    /// A diffusive transport coefficient came out negative.
    #[error("transport coefficient {name} must be non-negative everywhere")]
    NegativeCoefficient {
        /// Name of the offending coefficient.
        name: &'static str,
    },

    /// A model parameter is outside its admissible range.
    #[error("model parameter {name} = {value} is invalid: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Why the value was rejected.
        reason: &'static str,
    },
}
