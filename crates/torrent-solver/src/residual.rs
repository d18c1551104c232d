//! The θ-method residual over the flattened state.
//!
//! R_raw = c·(uⁿ⁺¹ − uⁿ)/dt − θ·F(uⁿ⁺¹; coeffs_new) − (1−θ)·F(uⁿ; coeffs_old)
//!
//! Each equation's residual is then divided by (c + 10⁻¹⁰). That turns the
//! density-weighted rate (≈10²⁴ eV/(m³·s) for the heat equations) into a
//! plain rate (≈10⁵ eV/s), which is what keeps the residual inside
//! single-precision range; dropping the normalization stalls convergence.

use ndarray::{Array1, s};
use torrent_common::{EvolveFlags, Field, FlattenedState, Real, StateBoundaries};

use crate::coeffs::Block1DCoeffs;
use crate::operator::apply_spatial;

/// Transient-normalization guard.
const TRANSIENT_EPS: Real = 1.0e-10;

/// Assembles θ-method residuals against a fixed old-time state.
///
/// The old-time operator applications are computed once at construction;
/// only the new-time side is re-evaluated per Newton iterate.
#[derive(Debug)]
pub struct ResidualAssembler<'a> {
    x_old: &'a FlattenedState,
    old_operator: [Array1<Real>; 4],
    boundaries: &'a StateBoundaries,
    evolve: EvolveFlags,
    theta: Real,
    dt: Real,
}

impl<'a> ResidualAssembler<'a> {
    /// Captures the old-time state and pre-applies the spatial operator to
    /// it.
    pub fn new(
        x_old: &'a FlattenedState,
        coeffs_old: &Block1DCoeffs,
        boundaries: &'a StateBoundaries,
        evolve: EvolveFlags,
        theta: Real,
        dt: Real,
    ) -> Self {
        let old_operator = Field::ALL.map(|field| {
            apply_spatial(
                x_old.field(field),
                coeffs_old.for_field(field),
                &coeffs_old.geometry,
                boundaries.for_field(field),
            )
        });
        Self {
            x_old,
            old_operator,
            boundaries,
            evolve,
            theta,
            dt,
        }
    }

    /// Evaluates the normalized residual at `x_new` with freshly assembled
    /// new-time coefficients.
    ///
    /// Frozen equations contribute identity rows uⁿ⁺¹ − uⁿ, so the state
    /// never changes shape when fields are switched off.
    pub fn residual(&self, x_new: &FlattenedState, coeffs_new: &Block1DCoeffs) -> Array1<Real> {
        let layout = x_new.layout();
        let mut out = Array1::zeros(layout.total_len());

        for field in Field::ALL {
            let u_old = self.x_old.field(field);
            let u_new = x_new.field(field);
            let range = layout.range(field);

            if !self.evolve.evolves(field) {
                out.slice_mut(s![range]).assign(&(&u_new - &u_old));
                continue;
            }

            let eq = coeffs_new.for_field(field);
            let transient = eq.transient_coeff().as_array();
            let new_operator = apply_spatial(
                u_new,
                eq,
                &coeffs_new.geometry,
                self.boundaries.for_field(field),
            );

            let rate = transient * &((&u_new - &u_old) / self.dt);
            let raw = rate
                - new_operator.mapv(|value| value * self.theta)
                - self.old_operator[field.index()].mapv(|value| value * (1.0 - self.theta));
            let normalized = raw / &(transient + TRANSIENT_EPS);
            out.slice_mut(s![range]).assign(&normalized);
        }
        out
    }

    /// The timestep this assembler was built for.
    pub fn dt(&self) -> Real {
        self.dt
    }

    /// The θ of the time discretization.
    pub fn theta(&self) -> Real {
        self.theta
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use torrent_common::{CoreProfiles, DENSITY_FLOOR};
    use torrent_geometry::Geometry;
    use torrent_physics::{ConstantTransport, NoSources, SourceModel, TransportModel};

    use crate::assembly::assemble_coeffs;

    fn setup(n_cells: usize) -> (FlattenedState, Block1DCoeffs, Geometry) {
        let geometry = Geometry::circular(n_cells, 3.0, 1.0, 2.5).unwrap();
        let profiles = CoreProfiles::new(
            Array1::linspace(5.0e3, 1.0e3, n_cells),
            Array1::from_elem(n_cells, 4.0e3),
            Array1::from_elem(n_cells, 1.0e20),
            Array1::zeros(n_cells),
        )
        .unwrap();
        let transport = ConstantTransport::default()
            .coefficients(&profiles, &geometry)
            .unwrap();
        let sources = NoSources.terms(&profiles, &geometry).unwrap();
        let coeffs =
            assemble_coeffs(&profiles, &geometry, &transport, &sources, 1.0, DENSITY_FLOOR)
                .unwrap();
        (FlattenedState::from_profiles(&profiles), coeffs, geometry)
    }

    #[test]
    fn test_infinite_dt_reduces_to_normalized_operator() {
        // With dt → ∞ the rate term vanishes; at x_new = x_old the residual
        // collapses to −F(uⁿ)/(c + ε), the transient-normalized operator.
        let (state, coeffs, _geometry) = setup(40);
        let boundaries = StateBoundaries::default();
        let assembler = ResidualAssembler::new(
            &state,
            &coeffs,
            &boundaries,
            EvolveFlags::all(),
            1.0,
            Real::INFINITY,
        );
        let residual = assembler.residual(&state, &coeffs);

        for field in Field::ALL {
            let eq = coeffs.for_field(field);
            let operator = apply_spatial(
                state.field(field),
                eq,
                &coeffs.geometry,
                boundaries.for_field(field),
            );
            let expected = -&operator / &(eq.transient_coeff().as_array() + TRANSIENT_EPS);
            let range = state.layout().range(field);
            for (i, want) in expected.iter().enumerate() {
                let got = residual[range.start + i];
                assert_relative_eq!(got, *want, max_relative = 1e-5, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_frozen_equation_contributes_identity_row() {
        let (state, coeffs, _geometry) = setup(40);
        let boundaries = StateBoundaries::default();
        let flags = EvolveFlags {
            poloidal_flux: false,
            ..EvolveFlags::all()
        };
        let assembler =
            ResidualAssembler::new(&state, &coeffs, &boundaries, flags, 1.0, 1.0e-3);

        // Perturb the frozen field only.
        let mut data = state.data().clone();
        let range = state.layout().range(Field::PoloidalFlux);
        for i in range.clone() {
            data[i] += 0.25;
        }
        let perturbed = FlattenedState::from_raw(data, state.layout()).unwrap();
        let residual = assembler.residual(&perturbed, &coeffs);

        for i in range {
            assert_relative_eq!(residual[i], 0.25, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_rate_term_scaling() {
        // Pure rate: zero transport and sources make R = (Δu/dt)·c/(c+ε).
        let n_cells = 20;
        let geometry = Geometry::circular(n_cells, 3.0, 1.0, 2.5).unwrap();
        let profiles = CoreProfiles::new(
            Array1::from_elem(n_cells, 1.0e3),
            Array1::from_elem(n_cells, 1.0e3),
            Array1::from_elem(n_cells, 1.0e20),
            Array1::zeros(n_cells),
        )
        .unwrap();
        let transport = ConstantTransport {
            chi_ion: 0.0,
            chi_electron: 0.0,
            particle_diffusivity: 0.0,
            convection: 0.0,
        };
        let coeffs = assemble_coeffs(
            &profiles,
            &geometry,
            &transport.coefficients(&profiles, &geometry).unwrap(),
            &NoSources.terms(&profiles, &geometry).unwrap(),
            1.0,
            DENSITY_FLOOR,
        )
        .unwrap();

        let state = FlattenedState::from_profiles(&profiles);
        let boundaries = StateBoundaries::default();
        let dt = 1.0e-3;
        let assembler =
            ResidualAssembler::new(&state, &coeffs, &boundaries, EvolveFlags::all(), 1.0, dt);

        let mut data = state.data().clone();
        let ti_range = state.layout().range(Field::IonTemperature);
        data[ti_range.start + 5] += 100.0;
        let perturbed = FlattenedState::from_raw(data, state.layout()).unwrap();

        let residual = assembler.residual(&perturbed, &coeffs);
        // c/(c + 1e-10) ≈ 1 at c = 10²⁰, so the residual is the plain rate.
        assert_relative_eq!(residual[ti_range.start + 5], 100.0 / dt, max_relative = 1e-4);
        assert_relative_eq!(residual[ti_range.start + 6], 0.0, epsilon = 1e-3);
    }
}
