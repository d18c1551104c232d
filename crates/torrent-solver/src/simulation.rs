//! The step driver and the outer simulation loop.
//!
//! [`solve_step`] advances the coupled state one implicit step: assemble
//! old-time coefficients, wrap the coefficient path into the residual, and
//! hand everything to the Newton driver. The [`Simulation`] owns the models
//! and the timestep controller, and implements the retry policy: a
//! non-converged step halves dt and tries again until the floor.

use ndarray::Array1;
use torrent_common::{CoreProfiles, EvolveFlags, FlattenedState, Real, StateBoundaries};
use torrent_config::{
    DynamicParams, InitialProfilesConfig, ProfileShape, SchemeConfig, SolverConfig, TorrentConfig,
    TransportConfig, TransportModelKind,
};
use torrent_geometry::Geometry;
use torrent_physics::{
    BohmGyroBohm, CompositeSources, ConstantTransport, FittedSurrogate, FuelMix, GasPuff,
    GaussianEcrh, SourceModel, TransportModel,
};

use crate::assembly::assemble_coeffs;
use crate::coeffs::Block1DCoeffs;
use crate::newton::{FailureKind, NewtonSettings, SolverResult, newton_solve};
use crate::residual::ResidualAssembler;
use crate::timestep::TimestepController;
use crate::{Result, SolverError};

/// Builds the initial profiles from the configured shapes.
///
/// Each field follows `edge + (core − edge)·(1 − (ρ/a)²)^exponent`; ψ
/// starts flat at zero and is filled in by current diffusion.
pub fn initial_profiles(config: &InitialProfilesConfig, geometry: &Geometry) -> CoreProfiles {
    let shaped = |shape: &ProfileShape| {
        let minor_radius = geometry.minor_radius();
        geometry.rho().mapv(|rho| {
            let normalized = rho / minor_radius;
            shape.edge + (shape.core - shape.edge) * (1.0 - normalized * normalized).powf(shape.exponent)
        })
    };
    CoreProfiles::new(
        shaped(&config.ion_temperature),
        shaped(&config.electron_temperature),
        shaped(&config.density),
        Array1::zeros(geometry.n_cells()),
    )
    .expect("shaped arrays share the grid length")
}

/// Advances the coupled state by one implicit step of size `dt`.
///
/// The coefficient path (transport → sources → assembly) is bundled into a
/// single callable evaluated at the old time and at every Newton iterate;
/// it is the only dependency the Newton loop has on physics.
///
/// # Errors
///
/// Genuine evaluation failures only. A step that merely fails to converge
/// comes back as a [`SolverResult`] with `converged = false`.
#[allow(clippy::too_many_arguments, reason = "the step driver wires every pipeline stage")]
pub fn solve_step(
    profiles_old: &CoreProfiles,
    geometry: &Geometry,
    transport: &dyn TransportModel,
    sources: &dyn SourceModel,
    boundaries: &StateBoundaries,
    evolve: EvolveFlags,
    scheme: &SchemeConfig,
    solver: &SolverConfig,
    dt: Real,
) -> Result<SolverResult> {
    let floor = solver.density_floor;
    let coeffs_for = |profiles: &CoreProfiles| -> Result<Block1DCoeffs> {
        let floored = floored_profiles(profiles, floor)?;
        let transport_coeffs = transport.coefficients(&floored, geometry)?;
        let source_terms = sources.terms(&floored, geometry)?;
        assemble_coeffs(
            &floored,
            geometry,
            &transport_coeffs,
            &source_terms,
            scheme.flux_inductance,
            floor,
        )
    };

    let coeffs_old = coeffs_for(profiles_old)?;
    let x_old = FlattenedState::from_profiles(profiles_old);
    let layout = x_old.layout();
    let assembler =
        ResidualAssembler::new(&x_old, &coeffs_old, boundaries, evolve, scheme.theta, dt);

    let residual_fn = |physical: &Array1<Real>| -> Result<Array1<Real>> {
        let state = FlattenedState::from_raw(physical.clone(), layout)?;
        let coeffs_new = coeffs_for(&state.to_profiles())?;
        Ok(assembler.residual(&state, &coeffs_new))
    };

    let settings = NewtonSettings::from_solver_config(solver, scheme.theta, dt);
    newton_solve(&x_old, residual_fn, &settings)
}

/// One accepted step of the outer loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// Simulation time after the step **in \[s\]**.
    pub time: Real,
    /// The accepted timestep **in \[s\]**.
    pub dt: Real,
    /// Newton iterations of the accepted attempt.
    pub iterations: usize,
    /// Final scaled residual norm of the accepted attempt.
    pub residual_norm: Real,
    /// How many shrink-and-retry rounds the step needed.
    pub retries: usize,
}

/// The persisted-state shape contract: four length-N arrays plus a time.
///
/// The binary format belongs to the I/O layer; the core only guarantees
/// this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointState {
    /// Tᵢ **in \[eV\]**.
    pub ti: Array1<Real>,
    /// Tₑ **in \[eV\]**.
    pub te: Array1<Real>,
    /// nₑ **in \[m⁻³\]**.
    pub ne: Array1<Real>,
    /// ψ **in \[Wb\]**.
    pub psi: Array1<Real>,
    /// Simulation time **in \[s\]**.
    pub time: Real,
}

impl CheckpointState {
    /// Snapshots profiles at `time`.
    pub fn from_profiles(profiles: &CoreProfiles, time: Real) -> Self {
        Self {
            ti: profiles.ti().clone(),
            te: profiles.te().clone(),
            ne: profiles.ne().clone(),
            psi: profiles.psi().clone(),
            time,
        }
    }

    /// Rebuilds the profiles, re-validating the shape contract.
    ///
    /// # Errors
    ///
    /// Shape mismatches between the four arrays.
    pub fn to_profiles(&self) -> Result<CoreProfiles> {
        Ok(CoreProfiles::new(
            self.ti.clone(),
            self.te.clone(),
            self.ne.clone(),
            self.psi.clone(),
        )?)
    }
}

/// A configured simulation run: geometry, models, state and controller.
#[derive(Debug)]
pub struct Simulation {
    config: TorrentConfig,
    geometry: Geometry,
    transport: Box<dyn TransportModel>,
    sources: Box<dyn SourceModel>,
    controller: TimestepController,
    profiles: CoreProfiles,
    previous_profiles: Option<CoreProfiles>,
    time: Real,
    dt: Real,
    history: Vec<StepRecord>,
}

impl Simulation {
    /// Shrink-and-retry rounds before a step is declared failed.
    const MAX_RETRIES: usize = 12;

    /// Validates `config` and builds the run: geometry, models, initial
    /// profiles and the timestep controller.
    ///
    /// # Errors
    ///
    /// Validation failures and geometry construction errors.
    pub fn from_config(config: TorrentConfig) -> Result<Self> {
        config.validate()?;
        for warning in config.collect_warnings() {
            log::warn!("config: {warning}");
        }

        let mesh = &config.runtime.fixed.mesh;
        let geometry =
            Geometry::circular(mesh.n_cells, mesh.major_radius, mesh.minor_radius, mesh.b0)?;
        let profiles = initial_profiles(&config.runtime.dynamic.initial_profiles, &geometry);
        let transport = transport_from_config(&config.runtime.dynamic);
        let sources = sources_from_config(&config.runtime.dynamic);
        let controller = TimestepController::from_config(&config.time);
        let time = config
            .runtime
            .dynamic
            .restart
            .as_ref()
            .map_or(config.time.start, |restart| restart.time);
        let dt = config.time.initial_dt;

        Ok(Self {
            config,
            geometry,
            transport,
            sources,
            controller,
            profiles,
            previous_profiles: None,
            time,
            dt,
            history: Vec::new(),
        })
    }

    /// Replaces the state with a checkpoint, e.g. when restarting.
    ///
    /// # Errors
    ///
    /// Shape mismatches between the checkpoint and the configured grid.
    pub fn with_state(mut self, checkpoint: &CheckpointState) -> Result<Self> {
        let profiles = checkpoint.to_profiles()?;
        if profiles.n_cells() != self.geometry.n_cells() {
            return Err(torrent_common::CommonError::ShapeMismatch {
                expected: self.geometry.n_cells(),
                found: profiles.n_cells(),
            }
            .into());
        }
        self.profiles = profiles;
        self.previous_profiles = None;
        self.time = checkpoint.time;
        Ok(self)
    }

    /// Returns the geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Returns the current profiles.
    pub fn profiles(&self) -> &CoreProfiles {
        &self.profiles
    }

    /// Returns the current simulation time **in \[s\]**.
    pub fn time(&self) -> Real {
        self.time
    }

    /// Returns the last accepted timestep **in \[s\]**.
    pub fn dt(&self) -> Real {
        self.dt
    }

    /// Returns the per-step history of the run.
    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    /// Snapshots the current state.
    pub fn checkpoint(&self) -> CheckpointState {
        CheckpointState::from_profiles(&self.profiles, self.time)
    }

    /// Advances one adaptive step, shrinking dt and retrying on
    /// non-convergence.
    ///
    /// # Errors
    ///
    /// [`SolverError::StepFailed`] once dt hits the floor (or the retry
    /// budget) without convergence; evaluation errors pass through.
    pub fn step(&mut self) -> Result<StepRecord> {
        let transport_coeffs = self
            .transport
            .coefficients(&self.profiles, &self.geometry)?;
        let pair = self
            .previous_profiles
            .as_ref()
            .map(|previous| (previous, &self.profiles));
        let mut dt = self.controller.propose(
            &transport_coeffs,
            self.geometry.dr(),
            self.dt,
            pair,
        );

        let mut retries = 0;
        loop {
            let fixed = &self.config.runtime.fixed;
            let result = solve_step(
                &self.profiles,
                &self.geometry,
                self.transport.as_ref(),
                self.sources.as_ref(),
                &self.config.runtime.dynamic.boundaries,
                fixed.evolve,
                &fixed.scheme,
                &fixed.solver,
                dt,
            )?;

            if result.converged {
                let record = StepRecord {
                    time: self.time + dt,
                    dt,
                    iterations: result.iterations,
                    residual_norm: result.residual_norm,
                    retries,
                };
                self.previous_profiles =
                    Some(std::mem::replace(&mut self.profiles, result.profiles));
                self.time += dt;
                self.dt = dt;
                self.history.push(record);
                return Ok(record);
            }

            let kind = result
                .metadata
                .failure
                .unwrap_or(FailureKind::MaxIterations);
            if self.controller.at_floor(dt) || retries >= Self::MAX_RETRIES {
                return Err(SolverError::StepFailed {
                    time: self.time,
                    dt,
                    kind,
                });
            }
            log::warn!(
                "step at t = {:.6} s failed ({kind:?}); retrying with dt = {:.3e} s",
                self.time,
                self.controller.shrink(dt),
            );
            dt = self.controller.shrink(dt);
            retries += 1;
        }
    }

    /// Runs adaptive steps until `t_end` **\[s\]** is reached.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the loop.
    pub fn run_until(&mut self, t_end: Real) -> Result<()> {
        while self.time < t_end {
            let _ = self.step()?;
        }
        Ok(())
    }
}

/// Clamps nₑ to the configured floor before models consume the profiles.
fn floored_profiles(profiles: &CoreProfiles, floor: Real) -> Result<CoreProfiles> {
    Ok(CoreProfiles::new(
        profiles.ti().clone(),
        profiles.te().clone(),
        profiles.ne().mapv(|value| value.max(floor)),
        profiles.psi().clone(),
    )?)
}

/// Instantiates the configured transport closure.
fn transport_from_config(dynamic: &DynamicParams) -> Box<dyn TransportModel> {
    let transport = &dynamic.transport;
    match transport.model {
        TransportModelKind::Constant => Box::new(ConstantTransport {
            chi_ion: transport.param(TransportConfig::CHI_ION, 1.0),
            chi_electron: transport.param(TransportConfig::CHI_ELECTRON, 1.0),
            particle_diffusivity: transport.param(TransportConfig::PARTICLE_DIFFUSIVITY, 0.5),
            convection: transport.param(TransportConfig::CONVECTION_VELOCITY, 0.0),
        }),
        TransportModelKind::BohmGyroBohm => {
            let defaults = BohmGyroBohm::default();
            Box::new(BohmGyroBohm {
                alpha_bohm: transport.param("alpha_bohm", defaults.alpha_bohm),
                alpha_gyro_bohm: transport.param("alpha_gyro_bohm", defaults.alpha_gyro_bohm),
                ion_ratio: transport.param("ion_ratio", defaults.ion_ratio),
                diffusivity_ratio: transport
                    .param("diffusivity_ratio", defaults.diffusivity_ratio),
                pinch: transport.param(TransportConfig::CONVECTION_VELOCITY, defaults.pinch),
            })
        }
        TransportModelKind::Surrogate => Box::new(FittedSurrogate::default()),
    }
}

/// Instantiates the configured source bundle.
fn sources_from_config(dynamic: &DynamicParams) -> Box<dyn SourceModel> {
    let sources = &dynamic.sources;
    Box::new(CompositeSources {
        fusion: sources.fusion,
        ohmic: sources.ohmic,
        bremsstrahlung: sources.bremsstrahlung,
        exchange: sources.exchange,
        fuel: FuelMix {
            deuterium: sources.fuel.deuterium_fraction,
            tritium: sources.fuel.tritium_fraction,
        },
        z_effective: sources.z_effective,
        plasma_current_ma: sources.plasma_current_ma,
        ecrh: sources.ecrh.map(|ecrh| GaussianEcrh {
            total_power_mw: ecrh.power_mw,
            deposition_rho: ecrh.deposition_rho,
            width: ecrh.width,
            electron_fraction: 1.0,
        }),
        gas_puff: sources.gas_puff.map(|puff| GasPuff {
            total_rate: puff.rate,
            penetration: puff.penetration,
        }),
        current_drive: sources.current_drive,
    })
}
