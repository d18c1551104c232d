use torrent_common::Real;

/// Custom error types for geometry construction.
#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    /// A device dimension or field strength is not strictly positive.
    #[error("{name} must be strictly positive, got {value}")]
    NonPositive {
        /// Name of the offending quantity.
        name: &'static str,
        /// The rejected value.
        value: Real,
    },

    /// The radial grid needs at least two cells to carry fluxes.
    #[error("radial grid needs at least 2 cells, got {found}")]
    TooFewCells {
        /// The rejected cell count.
        found: usize,
    },

    /// Aspect ratio outside the validity of the circular approximation.
    #[error("aspect ratio a/R = {ratio:.3} exceeds 0.5")]
    AspectRatio {
        /// The rejected a/R.
        ratio: Real,
    },
}
