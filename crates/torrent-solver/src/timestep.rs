//! Adaptive timestep control.
//!
//! The proposal is CFL-driven: the diffusion limit on the largest χ and
//! the convection limit on the largest |V|, scaled by a safety factor.
//! An optional cap on the per-step relative profile change reins the step
//! in further, and growth/shrink clamps keep successive steps within a
//! bounded ratio before the hard [min, max] window applies.

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use torrent_common::{CoreProfiles, Real};
use torrent_config::TimeConfig;
use torrent_physics::TransportCoefficients;

/// Guard against division by vanishing coefficients.
const RATE_EPS: Real = 1.0e-10;

/// Shrink clamp relative to the previous step.
const SHRINK_CLAMP: Real = 0.5;

/// Growth clamp relative to the previous step.
const GROWTH_CLAMP: Real = 1.5;

/// Proposes the next timestep from CFL limits and profile rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestepController {
    /// Hard lower bound **in \[s\]**.
    pub min_dt: Real,
    /// Hard upper bound **in \[s\]**.
    pub max_dt: Real,
    /// CFL safety factor, in (0, 1).
    pub safety_factor: Real,
    /// Step-to-step growth cap.
    pub max_growth: Real,
    /// Cap on the per-step relative profile change, if any.
    pub max_rel_change: Option<Real>,
}

impl TimestepController {
    /// Derives a controller from the time configuration.
    pub fn from_config(time: &TimeConfig) -> Self {
        Self {
            min_dt: time.adaptive.resolved_min_dt(time.initial_dt),
            max_dt: time.adaptive.max_dt,
            safety_factor: time.adaptive.safety_factor,
            max_growth: time.adaptive.max_growth,
            max_rel_change: None,
        }
    }

    /// Proposes dt for the next step.
    ///
    /// `previous` carries the profiles before and after the last accepted
    /// step; without it the rate cap is skipped (first step, or a retry
    /// after a failure).
    pub fn propose(
        &self,
        transport: &TransportCoefficients,
        dr: Real,
        dt_prev: Real,
        previous: Option<(&CoreProfiles, &CoreProfiles)>,
    ) -> Real {
        let dt_diffusion =
            self.safety_factor * dr * dr / transport.max_diffusivity().max(RATE_EPS);
        let dt_convection = self.safety_factor * dr / transport.max_convection().max(RATE_EPS);
        let mut dt = dt_diffusion.min(dt_convection);

        if let (Some(max_rel_change), Some((before, after))) = (self.max_rel_change, previous) {
            let rate = max_relative_rate(before, after, dt_prev);
            if rate > RATE_EPS {
                dt = dt.min(max_rel_change / rate);
            }
        }

        let dt = dt
            .clamp(SHRINK_CLAMP * dt_prev, GROWTH_CLAMP * dt_prev)
            .min(dt_prev * self.max_growth);
        dt.clamp(self.min_dt, self.max_dt)
    }

    /// Halves dt after a failed step, respecting the floor.
    pub fn shrink(&self, dt: Real) -> Real {
        (SHRINK_CLAMP * dt).max(self.min_dt)
    }

    /// Whether dt already sits at the floor.
    pub fn at_floor(&self, dt: Real) -> bool {
        dt <= self.min_dt
    }
}

/// The largest per-field relative rate of change ‖Δu‖∞/‖u‖∞/dt.
fn max_relative_rate(before: &CoreProfiles, after: &CoreProfiles, dt_prev: Real) -> Real {
    let pairs = [
        (before.ti(), after.ti()),
        (before.te(), after.te()),
        (before.ne(), after.ne()),
        (before.psi(), after.psi()),
    ];
    let mut rate: Real = 0.0;
    for (old, new) in pairs {
        let delta: Array1<Real> = (new - old).mapv(Real::abs);
        let magnitude = old.mapv(Real::abs);
        let scale = (*magnitude.max_skipnan()).max(RATE_EPS);
        rate = rate.max(*delta.max_skipnan() / scale / dt_prev.max(RATE_EPS));
    }
    rate
}
