//! # TORRENT
//!
//! TOroidal Radial tRansport EquatioNs in rusT: implicit simulation of the
//! coupled ion-temperature, electron-temperature, density and
//! poloidal-flux transport equations of a magnetically confined tokamak
//! plasma.
//!
//! This crate re-exports the whole workspace. A minimal run:
//!
//! ```
//! use torrent::config::TorrentConfig;
//! use torrent::solver::Simulation;
//!
//! # fn main() -> Result<(), torrent::solver::SolverError> {
//! let mut config = TorrentConfig::default();
//! config.time.initial_dt = 1.0e-4;
//! config.time.end = 3.0e-4;
//!
//! let mut simulation = Simulation::from_config(config)?;
//! simulation.run_until(3.0e-4)?;
//!
//! assert!(!simulation.history().is_empty());
//! # Ok(())
//! # }
//! ```

pub use torrent_common as common;
pub use torrent_config as config;
pub use torrent_geometry as geometry;
pub use torrent_physics as physics;
pub use torrent_solver as solver;
