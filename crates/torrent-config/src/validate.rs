//! Three-phase configuration validation.
//!
//! Phase 1 checks physical ranges, phase 2 numerical stability, phase 3
//! model-specific constraints. The first violation aborts with a hard
//! [`ConfigError`]; advisory conditions are collected separately by
//! [`TorrentConfig::collect_warnings`] and never throw.

use torrent_common::{MEGAWATTS_TO_EV, Real};

use crate::schema::{TorrentConfig, TransportConfig, TransportModelKind};
use crate::{ConfigError, ConfigWarning, Result};

/// Explicit diffusion stability bound.
const CFL_LIMIT: f64 = 0.5;

/// Maximum tolerated |ΔT|/T per step from heating sources.
const HEATING_LIMIT: f64 = 0.5;

/// Maximum tolerated |Δnₑ|/nₑ per step from particle sources.
const FUELLING_LIMIT: f64 = 0.2;

/// Tolerance on the fuel fraction sum.
const FUEL_SUM_TOLERANCE: Real = 1.0e-4;

impl TorrentConfig {
    /// Runs all three validation phases, in order.
    ///
    /// # Errors
    ///
    /// The first hard violation found, see [`ConfigError`].
    pub fn validate(&self) -> Result<()> {
        self.validate_physical()?;
        self.validate_numerical()?;
        self.validate_models()
    }

    /// Phase 1: physical ranges of device and initial state.
    fn validate_physical(&self) -> Result<()> {
        let mesh = &self.runtime.fixed.mesh;
        range_check("b0", mesh.b0, 0.5, 15.0, "tokamak field range is 0.5-15 T")?;
        range_check(
            "major_radius",
            mesh.major_radius,
            0.5,
            10.0,
            "device major radius range is 0.5-10 m",
        )?;
        range_check(
            "minor_radius",
            mesh.minor_radius,
            0.2,
            3.0,
            "device minor radius range is 0.2-3 m",
        )?;
        let aspect = mesh.minor_radius / mesh.major_radius;
        if aspect > 0.5 {
            return Err(ConfigError::Inconsistency {
                reason: format!("aspect ratio a/R = {aspect:.3} exceeds 0.5"),
            });
        }

        let shapes = &self.runtime.dynamic.initial_profiles;
        for (name, shape) in [
            ("T_i", shapes.ion_temperature),
            ("T_e", shapes.electron_temperature),
        ] {
            for (side, value) in [("core", shape.core), ("edge", shape.edge)] {
                if !(1.0..=1.0e5).contains(&value) {
                    return Err(ConfigError::InvalidValue {
                        name,
                        value: f64::from(value),
                        reason: if side == "core" {
                            "core temperature must lie in 1-1e5 eV"
                        } else {
                            "edge temperature must lie in 1-1e5 eV"
                        },
                    });
                }
            }
        }
        for value in [shapes.density.core, shapes.density.edge] {
            if !(1.0e17..=1.0e21).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    name: "n_e",
                    value: f64::from(value),
                    reason: "density must lie in 1e17-1e21 m^-3",
                });
            }
        }

        let scheme = &self.runtime.fixed.scheme;
        if !(0.0..=1.0).contains(&scheme.theta) {
            return Err(ConfigError::InvalidValue {
                name: "theta",
                value: f64::from(scheme.theta),
                reason: "theta-method parameter must lie in [0, 1]",
            });
        }

        let time = &self.time;
        if time.end <= time.start {
            return Err(ConfigError::Inconsistency {
                reason: format!("time span [{}, {}] is empty", time.start, time.end),
            });
        }
        if time.initial_dt <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "initial_dt",
                value: f64::from(time.initial_dt),
                reason: "the first timestep must be positive",
            });
        }
        if time.adaptive.safety_factor <= 0.0 || time.adaptive.safety_factor >= 1.0 {
            return Err(ConfigError::InvalidValue {
                name: "safety_factor",
                value: f64::from(time.adaptive.safety_factor),
                reason: "CFL safety factor must lie in (0, 1)",
            });
        }
        if time.adaptive.max_growth < 1.0 {
            return Err(ConfigError::InvalidValue {
                name: "max_growth",
                value: f64::from(time.adaptive.max_growth),
                reason: "timestep growth cap below 1 can never grow dt",
            });
        }
        if time.adaptive.resolved_min_dt(time.initial_dt) > time.adaptive.max_dt {
            return Err(ConfigError::Inconsistency {
                reason: "adaptive min_dt exceeds max_dt".into(),
            });
        }

        if let Some(restart) = &self.runtime.dynamic.restart
            && restart.filename.as_os_str().is_empty()
        {
            return Err(ConfigError::MissingRequired {
                name: "restart.filename",
            });
        }
        Ok(())
    }

    /// Phase 2: numerical stability.
    fn validate_numerical(&self) -> Result<()> {
        let mesh = &self.runtime.fixed.mesh;
        if mesh.n_cells < 50 {
            return Err(ConfigError::MeshTooCoarse {
                n_cells: mesh.n_cells,
            });
        }

        let dr = f64::from(mesh.dr());
        let dt = f64::from(self.time.initial_dt);

        for (channel, chi) in self.estimated_diffusivities() {
            let cfl = chi * dt / (dr * dr);
            if cfl > CFL_LIMIT {
                return Err(ConfigError::CflViolation {
                    channel,
                    cfl: cfl as Real,
                    suggested_dt: (CFL_LIMIT * dr * dr / chi) as Real,
                });
            }
        }

        let chi_max = self
            .estimated_diffusivities()
            .into_iter()
            .map(|(_, chi)| chi)
            .fold(1e-10, f64::max);
        let minor_radius = f64::from(mesh.minor_radius);
        let diffusion_time = minor_radius * minor_radius / chi_max;
        if dt > diffusion_time {
            return Err(ConfigError::TimestepAboveDiffusionTime {
                dt: dt as Real,
                limit: diffusion_time as Real,
            });
        }

        let sources = &self.runtime.dynamic.sources;
        if let Some(ecrh) = &sources.ecrh {
            let width_m = f64::from(ecrh.width) * minor_radius;
            let resolution_limit = 3.0 * dr;
            if width_m < resolution_limit {
                return Err(ConfigError::UnresolvedDeposition {
                    width: width_m as Real,
                    limit: resolution_limit as Real,
                });
            }
            let core = &self.runtime.dynamic.initial_profiles;
            let heating_rate = f64::from(self.peak_ecrh_density()) * f64::from(MEGAWATTS_TO_EV)
                / f64::from(core.density.core);
            let estimate = heating_rate * dt / f64::from(core.electron_temperature.core);
            if estimate > HEATING_LIMIT {
                return Err(ConfigError::HeatingUnstable {
                    estimate: estimate as Real,
                });
            }
        }
        if let Some(puff) = &sources.gas_puff {
            let shapes = &self.runtime.dynamic.initial_profiles;
            let volume = self.plasma_volume();
            let edge_volume = volume * f64::from(puff.penetration).clamp(0.01, 1.0) * 2.0;
            let peak_rate = f64::from(puff.rate) / edge_volume.min(volume);
            let estimate = peak_rate * dt / f64::from(shapes.density.edge);
            if estimate > FUELLING_LIMIT {
                return Err(ConfigError::FuellingUnstable {
                    estimate: estimate as Real,
                });
            }
        }

        let shapes = &self.runtime.dynamic.initial_profiles;
        for (name, shape) in [
            ("T_i", shapes.ion_temperature),
            ("T_e", shapes.electron_temperature),
            ("n_e", shapes.density),
        ] {
            if shape.exponent > 0.0 && shape.core <= shape.edge {
                return Err(ConfigError::BoundaryPeakMismatch {
                    name,
                    core: shape.core,
                    edge: shape.edge,
                });
            }
        }
        Ok(())
    }

    /// Phase 3: model-specific constraints.
    fn validate_models(&self) -> Result<()> {
        let dynamic = &self.runtime.dynamic;
        if dynamic.transport.model == TransportModelKind::Surrogate {
            let shapes = &dynamic.initial_profiles;
            let core_te = shapes.electron_temperature.core;
            if core_te < 500.0 {
                return Err(ConfigError::SurrogateOutOfRange {
                    reason: format!("core T_e = {core_te} eV below the 500 eV training floor"),
                });
            }
            let core_ne = shapes.density.core;
            if !(1.0e19..=1.0e20).contains(&core_ne) {
                return Err(ConfigError::SurrogateOutOfRange {
                    reason: format!("core n_e = {core_ne:.2e} outside the 1e19-1e20 training band"),
                });
            }
        }

        let fuel = dynamic.sources.fuel;
        let sum = fuel.deuterium_fraction + fuel.tritium_fraction;
        if (sum - 1.0).abs() > FUEL_SUM_TOLERANCE {
            return Err(ConfigError::InvalidFuelMix {
                deuterium: fuel.deuterium_fraction,
                tritium: fuel.tritium_fraction,
                sum,
            });
        }
        Ok(())
    }

    /// Collects advisory conditions. Never throws; calling it twice yields
    /// an identical enumeration.
    pub fn collect_warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mesh = &self.runtime.fixed.mesh;

        if mesh.n_cells > 500 {
            warnings.push(ConfigWarning::FineMesh {
                n_cells: mesh.n_cells,
            });
        }

        if self.runtime.dynamic.sources.ecrh.is_some() {
            let peak = self.peak_ecrh_density();
            if peak > 10.0 {
                warnings.push(ConfigWarning::HighPowerDensity { peak });
            }
        }

        let dr = f64::from(mesh.dr());
        let chi_max = self
            .estimated_diffusivities()
            .into_iter()
            .map(|(_, chi)| chi)
            .fold(1e-10, f64::max);
        let cfl_dt = CFL_LIMIT * dr * dr / chi_max;
        if f64::from(self.time.initial_dt) < 1.0e-3 * cfl_dt {
            warnings.push(ConfigWarning::TimestepFarBelowCfl {
                dt: self.time.initial_dt,
                limit: cfl_dt as Real,
            });
        }

        let shapes = &self.runtime.dynamic.initial_profiles;
        for (name, shape) in [
            ("T_i", shapes.ion_temperature),
            ("T_e", shapes.electron_temperature),
            ("n_e", shapes.density),
        ] {
            if shape.exponent >= 4.0 {
                warnings.push(ConfigWarning::VeryPeakedProfile {
                    name,
                    exponent: shape.exponent,
                });
            }
        }

        if self.runtime.dynamic.sources.fusion && shapes.ion_temperature.core < 2.0e3 {
            warnings.push(ConfigWarning::FusionNegligible {
                core_ti: shapes.ion_temperature.core,
            });
        }
        warnings
    }

    /// Upper estimates of (χᵢ, χₑ, D) for the configured closure, evaluated
    /// at the initial core state.
    fn estimated_diffusivities(&self) -> [(&'static str, f64); 3] {
        let transport = &self.runtime.dynamic.transport;
        let shapes = &self.runtime.dynamic.initial_profiles;
        let te_core = f64::from(shapes.electron_temperature.core);
        let ne_core = f64::from(shapes.density.core);
        let b0 = f64::from(self.runtime.fixed.mesh.b0);
        let minor_radius = f64::from(self.runtime.fixed.mesh.minor_radius);

        let (chi_ion, chi_electron, particle) = match transport.model {
            TransportModelKind::Constant => (
                f64::from(transport.param(TransportConfig::CHI_ION, 1.0)),
                f64::from(transport.param(TransportConfig::CHI_ELECTRON, 1.0)),
                f64::from(transport.param(TransportConfig::PARTICLE_DIFFUSIVITY, 0.5)),
            ),
            TransportModelKind::BohmGyroBohm => {
                let chi_bohm = te_core / (16.0 * b0);
                let rho_star = 1.02e-4 * (2.0 * te_core).sqrt() / (b0 * minor_radius);
                let chi_electron = 0.05 * chi_bohm + 0.35 * rho_star * chi_bohm;
                (2.0 * chi_electron, chi_electron, 0.3 * chi_electron)
            }
            TransportModelKind::Surrogate => {
                let chi = 1.2
                    * (te_core / 1.0e3).powf(1.5)
                    * (ne_core.clamp(1.0e19, 1.0e20) / 1.0e20).powf(-0.5);
                (chi, chi, 0.3 * chi)
            }
        };
        [
            ("chi_ion", chi_ion),
            ("chi_electron", chi_electron),
            ("particle_diffusivity", particle),
        ]
    }

    /// Estimated peak ECRH power density **in \[MW/m³\]**.
    fn peak_ecrh_density(&self) -> Real {
        let Some(ecrh) = &self.runtime.dynamic.sources.ecrh else {
            return 0.0;
        };
        let width = f64::from(ecrh.width).max(1e-3);
        let centre = f64::from(ecrh.deposition_rho);
        // Rough Gaussian-shell volume; exact normalization happens in the
        // source model against the discrete cell volumes.
        let deposition_volume = (self.plasma_volume() * width * (centre + width)).max(1e-3);
        (f64::from(ecrh.power_mw) / deposition_volume) as Real
    }

    /// Torus volume 2π²Ra² **in \[m³\]**.
    fn plasma_volume(&self) -> f64 {
        let mesh = &self.runtime.fixed.mesh;
        2.0 * std::f64::consts::PI.powi(2)
            * f64::from(mesh.major_radius)
            * f64::from(mesh.minor_radius).powi(2)
    }
}

/// Checks `value` against an inclusive physical range.
fn range_check(
    name: &'static str,
    value: Real,
    lo: Real,
    hi: Real,
    reason: &'static str,
) -> Result<()> {
    if !(lo..=hi).contains(&value) {
        return Err(ConfigError::InvalidValue {
            name,
            value: f64::from(value),
            reason,
        });
    }
    Ok(())
}
