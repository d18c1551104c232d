//! Pure-diffusion scenarios: relaxation to the analytic steady state and
//! per-step particle conservation.

use ndarray::Array1;
use torrent_common::{
    BoundaryCondition, BoundarySet, CoreProfiles, EvolveFlags, Real, StateBoundaries,
};
use torrent_config::{NumericalTolerances, SchemeConfig, SolverConfig};
use torrent_geometry::Geometry;
use torrent_physics::{ConstantTransport, NoSources};
use torrent_solver::solve_step;

fn uniform_profiles(n_cells: usize, t: Real, ne: Real) -> CoreProfiles {
    CoreProfiles::new(
        Array1::from_elem(n_cells, t),
        Array1::from_elem(n_cells, t),
        Array1::from_elem(n_cells, ne),
        Array1::zeros(n_cells),
    )
    .unwrap()
}

fn tight_solver_config() -> SolverConfig {
    SolverConfig {
        tolerances: NumericalTolerances {
            absolute: 1.0e-4,
            relative: 1.0e-3,
        },
        ..SolverConfig::default()
    }
}

#[test]
fn test_dirichlet_diffusion_relaxes_to_edge_value() {
    // Hot uniform plasma, cold Dirichlet edge, no sources: the exact steady
    // state of pure diffusion with a zero-flux axis is uniform at the edge
    // value. Ten diffusion times of implicit stepping must land there.
    let n_cells = 50;
    let geometry = Geometry::circular(n_cells, 3.0, 1.0, 2.5).unwrap();
    let mut profiles = uniform_profiles(n_cells, 5.0e3, 1.0e20);

    let transport = ConstantTransport {
        chi_ion: 1.0,
        chi_electron: 1.0,
        particle_diffusivity: 0.5,
        convection: 0.0,
    };
    let edge_temperature = 100.0;
    let cooled = BoundarySet {
        axis: BoundaryCondition::Gradient(0.0),
        edge: BoundaryCondition::Value(edge_temperature),
    };
    let boundaries = StateBoundaries {
        ion_temperature: cooled,
        electron_temperature: cooled,
        ..StateBoundaries::default()
    };
    let scheme = SchemeConfig {
        theta: 1.0,
        ..SchemeConfig::default()
    };
    let solver = tight_solver_config();

    let dt = 5.0e-2;
    for _ in 0..200 {
        let result = solve_step(
            &profiles,
            &geometry,
            &transport,
            &NoSources,
            &boundaries,
            EvolveFlags::all(),
            &scheme,
            &solver,
            dt,
        )
        .unwrap();
        assert!(result.converged, "step failed: {:?}", result.metadata);
        profiles = result.profiles;
    }

    let worst = profiles
        .ti()
        .iter()
        .map(|&ti| (ti - edge_temperature).abs())
        .fold(0.0, Real::max);
    assert!(
        worst / edge_temperature < 5.0e-3,
        "T_i deviates from the steady state by {worst} eV"
    );
}

#[test]
fn test_particles_conserved_with_reflecting_boundaries() {
    // Zero source, reflecting boundaries, no convection: the total particle
    // content must survive a step to better than 1e-4 relative.
    let n_cells = 50;
    let geometry = Geometry::circular(n_cells, 3.0, 1.0, 2.5).unwrap();

    // A peaked density so diffusion actually moves particles around.
    let ne = geometry
        .rho()
        .mapv(|rho| 2.0e19 + 8.0e19 * (1.0 - rho * rho));
    let profiles = CoreProfiles::new(
        Array1::from_elem(n_cells, 3.0e3),
        Array1::from_elem(n_cells, 3.0e3),
        ne,
        Array1::zeros(n_cells),
    )
    .unwrap();

    let transport = ConstantTransport {
        chi_ion: 1.0,
        chi_electron: 1.0,
        particle_diffusivity: 0.5,
        convection: 0.0,
    };
    let boundaries = StateBoundaries::default(); // reflecting everywhere
    let scheme = SchemeConfig::default();
    let solver = tight_solver_config();

    let total = |p: &CoreProfiles| -> f64 {
        p.ne()
            .iter()
            .zip(geometry.cell_volumes())
            .map(|(&n, &v)| f64::from(n) * f64::from(v))
            .sum()
    };
    let before = total(&profiles);

    let result = solve_step(
        &profiles,
        &geometry,
        &transport,
        &NoSources,
        &boundaries,
        EvolveFlags::all(),
        &scheme,
        &solver,
        1.0e-3,
    )
    .unwrap();
    assert!(result.converged, "step failed: {:?}", result.metadata);

    let after = total(&result.profiles);
    let drift = ((after - before) / before).abs();
    assert!(drift < 1.0e-4, "particle content drifted by {drift:.3e}");

    // The density floor invariant holds after every step.
    assert!(result.profiles.ne().iter().all(|&n| n >= 1.0e18));
}
