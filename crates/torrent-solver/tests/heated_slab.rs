//! A heated ITER-like slab: one implicit step with the composite sources
//! must converge quickly and keep the temperatures physical.

use torrent_common::{
    BoundaryCondition, BoundarySet, EvolveFlags, Real, StateBoundaries,
};
use torrent_config::{InitialProfilesConfig, ProfileShape, SchemeConfig, SolverConfig};
use torrent_geometry::Geometry;
use torrent_physics::{CompositeSources, ConstantTransport};
use torrent_solver::{initial_profiles, solve_step};

#[test]
fn test_newton_converges_on_heated_slab() {
    let n_cells = 100;
    let geometry = Geometry::circular(n_cells, 6.2, 2.0, 5.3).unwrap();

    // Parabolic 20 keV temperatures over a 10²⁰ m⁻³ core.
    let shapes = InitialProfilesConfig {
        ion_temperature: ProfileShape {
            core: 2.0e4,
            edge: 1.0e3,
            exponent: 1.0,
        },
        electron_temperature: ProfileShape {
            core: 2.0e4,
            edge: 1.0e3,
            exponent: 1.0,
        },
        density: ProfileShape {
            core: 1.0e20,
            edge: 2.0e19,
            exponent: 1.0,
        },
    };
    let profiles = initial_profiles(&shapes, &geometry);

    let sources = CompositeSources {
        fusion: true,
        ohmic: true,
        bremsstrahlung: true,
        exchange: false,
        ..CompositeSources::default()
    };
    let dirichlet = |value: Real| BoundarySet {
        axis: BoundaryCondition::Gradient(0.0),
        edge: BoundaryCondition::Value(value),
    };
    let boundaries = StateBoundaries {
        ion_temperature: dirichlet(1.0e3),
        electron_temperature: dirichlet(1.0e3),
        density: dirichlet(2.0e19),
        poloidal_flux: BoundarySet::default(),
    };

    let result = solve_step(
        &profiles,
        &geometry,
        &ConstantTransport::default(),
        &sources,
        &boundaries,
        EvolveFlags::all(),
        &SchemeConfig::default(),
        &SolverConfig::default(),
        1.0e-4,
    )
    .unwrap();

    assert!(result.converged, "step failed: {:?}", result.metadata);
    assert!(
        result.iterations <= 20,
        "needed {} Newton iterations",
        result.iterations
    );

    let ti_max = result.profiles.ti().iter().fold(0.0, |m: Real, &t| m.max(t));
    assert!(
        (2.0e3..=3.0e4).contains(&ti_max),
        "peak T_i left the physical window: {ti_max} eV"
    );

    // Post-step invariants: finite state, floored density.
    assert!(result.profiles.is_finite());
    assert!(result.profiles.ne().iter().all(|&ne| ne >= 1.0e18));
}
