//! Newton–Raphson driver in physically scaled space.
//!
//! The state is divided by per-variable reference magnitudes before any
//! numerics run, and the residual is rescaled the same way. The scaling is
//! physically motivated (1 keV, 10²⁰ m⁻³, 1 Wb) rather than derived from
//! the state itself: state-derived scales underflow when a component is
//! initialized flat at zero, as ψ routinely is.

use ndarray::{Array1, s};
use torrent_common::{
    CoreProfiles, ElectronVolts, Field, FlattenedState, PerCubicMeter, Real, StateLayout, Webers,
};
use torrent_config::{LineSearchConfig, LinearSolverConfig, NumericalTolerances, SolverConfig};

use crate::Result;
use crate::jacobian::finite_difference_jacobian;
use crate::linear::HybridSolver;

/// Reference magnitude of the temperature slots.
const REFERENCE_TEMPERATURE: ElectronVolts = 1.0e3;

/// Reference magnitude of the density slots.
const REFERENCE_DENSITY: PerCubicMeter = 1.0e20;

/// Reference magnitude of the flux slots.
const REFERENCE_FLUX: Webers = 1.0;

/// A Newton direction is rejected when ‖J·Δ + R‖/‖R‖ reaches this ratio.
const LINEAR_ACCURACY_LIMIT: Real = 1.0e-3;

/// Coarse tolerance scale of the temperature equations.
const TEMPERATURE_TOLERANCE_SCALE: Real = 1.0e4;

/// Tight tolerance scale of the density and flux equations.
const PARTICLE_FLUX_TOLERANCE_SCALE: Real = 10.0;

/// Builds the per-slot reference state for `layout`.
pub fn reference_state(layout: &StateLayout) -> Array1<Real> {
    let mut reference = Array1::zeros(layout.total_len());
    for field in Field::ALL {
        let magnitude = match field {
            Field::IonTemperature | Field::ElectronTemperature => REFERENCE_TEMPERATURE,
            Field::Density => REFERENCE_DENSITY,
            Field::PoloidalFlux => REFERENCE_FLUX,
        };
        reference.slice_mut(s![layout.range(field)]).fill(magnitude);
    }
    reference
}

/// Everything the Newton driver needs beyond the residual itself.
#[derive(Debug, Clone, Copy)]
pub struct NewtonSettings {
    /// Iteration cap.
    pub max_iterations: usize,
    /// Base tolerances of the per-equation convergence criteria.
    pub tolerances: NumericalTolerances,
    /// Backtracking line search settings.
    pub line_search: LineSearchConfig,
    /// Inner linear solver settings.
    pub linear: LinearSolverConfig,
    /// Density floor applied to the returned profiles **in \[m⁻³\]**.
    pub density_floor: Real,
    /// θ of the step being solved, carried into the result metadata.
    pub theta: Real,
    /// dt of the step being solved **in \[s\]**, carried into metadata.
    pub dt: Real,
}

impl NewtonSettings {
    /// Derives driver settings from the solver configuration.
    pub fn from_solver_config(config: &SolverConfig, theta: Real, dt: Real) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerances: config.tolerances,
            line_search: config.line_search,
            linear: config.linear,
            density_floor: config.density_floor,
            theta,
            dt,
        }
    }
}

/// Why a step aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// NaN or infinity appeared in the scaled residual or state.
    NonFiniteState,
    /// The hybrid linear solver failed outright.
    LinearSolver,
    /// The direction solved the linear system too poorly:
    /// ‖J·Δ + R‖/‖R‖ ≥ 10⁻³.
    InaccurateDirection,
    /// The direction does not descend: Δ·(−R) ≤ 0.
    NonDescentDirection,
    /// The iteration cap was reached without per-variable convergence.
    MaxIterations,
}

/// Step metadata attached to every result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetadata {
    /// θ of the attempted step.
    pub theta: Real,
    /// dt of the attempted step **in \[s\]**.
    pub dt: Real,
    /// Failure classification; `None` when the step converged.
    pub failure: Option<FailureKind>,
}

/// Outcome of one implicit step.
///
/// Non-convergence is not an error: the timestep controller reads
/// `converged = false`, shrinks dt and retries.
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// The profiles at the new time (or the last finite iterate on abort),
    /// with the density floor applied.
    pub profiles: CoreProfiles,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Final overall L² norm of the scaled residual.
    pub residual_norm: Real,
    /// Whether all four per-variable criteria passed.
    pub converged: bool,
    /// θ, dt and the failure classification.
    pub metadata: StepMetadata,
}

/// Solves R(xⁿ⁺¹) = 0 for one step.
///
/// `residual_fn` evaluates the physical residual on a physical flat state;
/// scaling and unscaling stay inside this driver.
///
/// # Errors
///
/// Only genuine evaluation failures (shape violations, model errors)
/// propagate; numerical trouble becomes a non-converged [`SolverResult`].
pub fn newton_solve<F>(
    x0: &FlattenedState,
    residual_fn: F,
    settings: &NewtonSettings,
) -> Result<SolverResult>
where
    F: Fn(&Array1<Real>) -> Result<Array1<Real>>,
{
    let layout = x0.layout();
    let reference = reference_state(&layout);
    let scaled_residual = |scaled: &Array1<Real>| -> Result<Array1<Real>> {
        let physical = scaled * &reference;
        Ok(residual_fn(&physical)? / &reference)
    };
    let linear_solver = HybridSolver::new(settings.linear);

    let start = x0.data() / &reference;
    let mut scaled = start.clone();
    let mut iterations = 0;
    let mut converged = false;
    let mut failure = None;
    let mut initial_norms = [0.0; 4];

    let mut residual = scaled_residual(&scaled)?;
    let mut residual_norm = l2_norm(&residual);

    loop {
        if !residual.iter().all(|value| value.is_finite())
            || !scaled.iter().all(|value| value.is_finite())
        {
            failure = Some(FailureKind::NonFiniteState);
            break;
        }

        if iterations == 0 {
            for field in Field::ALL {
                initial_norms[field.index()] = field_norm(&residual, &layout, field);
            }
        }
        converged = Field::ALL.into_iter().all(|field| {
            let tolerance =
                equation_tolerance(&settings.tolerances, field, initial_norms[field.index()]);
            field_norm(&residual, &layout, field) < tolerance
        });
        if converged {
            break;
        }
        if iterations >= settings.max_iterations {
            failure = Some(FailureKind::MaxIterations);
            break;
        }

        let jacobian = finite_difference_jacobian(&scaled_residual, &scaled, &residual)?;
        let rhs = residual.mapv(|value| -value);
        let delta = match linear_solver.solve(&jacobian, &rhs) {
            Ok(delta) => delta,
            Err(error) => {
                log::warn!("linear solve failed in Newton iteration {iterations}: {error}");
                failure = Some(FailureKind::LinearSolver);
                break;
            }
        };

        // Direction validity: the step must actually solve the linear
        // model, and it must descend.
        let linear_residual = l2_norm(&(jacobian.dot(&delta) - &rhs));
        if linear_residual / residual_norm.max(1.0e-30) >= LINEAR_ACCURACY_LIMIT {
            failure = Some(FailureKind::InaccurateDirection);
            break;
        }
        if delta.dot(&rhs) <= 0.0 {
            failure = Some(FailureKind::NonDescentDirection);
            break;
        }

        // Backtracking line search with a fixed fallback step.
        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..=settings.line_search.max_halvings {
            let trial = &scaled + &(&delta * alpha);
            if let Ok(trial_residual) = scaled_residual(&trial) {
                let trial_norm = l2_norm(&trial_residual);
                if trial_norm.is_finite() && trial_norm < residual_norm {
                    accepted = Some((trial, trial_residual, trial_norm));
                    break;
                }
            }
            alpha *= 0.5;
        }
        (scaled, residual, residual_norm) = match accepted {
            Some(step) => step,
            None => {
                let trial = &scaled + &(&delta * settings.line_search.fallback_alpha);
                let trial_residual = scaled_residual(&trial)?;
                let trial_norm = l2_norm(&trial_residual);
                (trial, trial_residual, trial_norm)
            }
        };
        iterations += 1;
    }

    // Never report a poisoned state; fall back to the initial iterate.
    let reported = if scaled.iter().all(|value| value.is_finite()) {
        &scaled
    } else {
        &start
    };
    let physical = reported * &reference;
    let profiles = floor_density(
        FlattenedState::from_raw(physical, layout)?.to_profiles(),
        settings.density_floor,
    )?;

    Ok(SolverResult {
        profiles,
        iterations,
        residual_norm,
        converged,
        metadata: StepMetadata {
            theta: settings.theta,
            dt: settings.dt,
            failure,
        },
    })
}

/// Per-equation convergence tolerance derived from the base tolerances.
fn equation_tolerance(
    tolerances: &NumericalTolerances,
    field: Field,
    initial_norm: Real,
) -> Real {
    let scale = match field {
        Field::IonTemperature | Field::ElectronTemperature => TEMPERATURE_TOLERANCE_SCALE,
        Field::Density | Field::PoloidalFlux => PARTICLE_FLUX_TOLERANCE_SCALE,
    };
    tolerances.absolute * scale + tolerances.relative * initial_norm
}

fn field_norm(residual: &Array1<Real>, layout: &StateLayout, field: Field) -> Real {
    l2_norm(&residual.slice(s![layout.range(field)]).to_owned())
}

fn l2_norm(vector: &Array1<Real>) -> Real {
    vector.mapv(|value| value * value).sum().sqrt()
}

fn floor_density(profiles: CoreProfiles, floor: Real) -> Result<CoreProfiles> {
    let ne = profiles.ne().mapv(|value| value.max(floor));
    Ok(CoreProfiles::new(
        profiles.ti().clone(),
        profiles.te().clone(),
        ne,
        profiles.psi().clone(),
    )?)
}
