#![doc = include_str!("../README.md")]

mod error;
mod factors;
mod geometry;

pub use error::GeometryError;
pub use factors::GeometricFactors;
pub use geometry::{Geometry, GeometryKind};

pub type Result<T> = std::result::Result<T, GeometryError>;
