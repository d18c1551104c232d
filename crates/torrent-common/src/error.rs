/// Custom error types shared across the workspace.
#[derive(thiserror::Error, Debug)]
pub enum CommonError {
    /// Arrays that must describe the same radial grid disagree on length.
    #[error("arrays disagree on cell count: expected {expected}, found {found}")]
    ShapeMismatch {
        /// The cell count implied by the first array.
        expected: usize,
        /// The offending length.
        found: usize,
    },

    /// A state layout was requested for an empty grid.
    #[error("state layout requires at least one cell")]
    EmptyLayout,
}
