//! Assembly of model outputs into per-equation finite-volume coefficients.

use ndarray::Array1;
use torrent_common::{CoreProfiles, MEGAWATTS_TO_EV, Real};
use torrent_geometry::Geometry;
use torrent_physics::{SourceTerms, TransportCoefficients};

use crate::coeffs::{Block1DCoeffs, EquationCoeffs};
use crate::faces::{arithmetic_faces, harmonic_faces};
use crate::Result;

/// Parallel plasma resistivity η **in \[Ω·m\]**, the diffusivity of the
/// current diffusion equation.
pub const PARALLEL_RESISTIVITY: Real = 1.0e-7;

/// Assembles the four equation coefficient sets from the model outputs.
///
/// Cell quantities are interpolated to faces on the way in: the harmonic
/// mean for χ, D and nₑ, the arithmetic mean for velocities. Heating
/// sources arrive in MW/m³ and leave in eV/(m³·s). nₑ is floored wherever
/// it is consumed, so the non-conservation division downstream stays
/// well-defined.
///
/// # Errors
///
/// Shape violations from the coefficient constructors; the inputs
/// themselves are already validated by their owning crates.
pub fn assemble_coeffs(
    profiles: &CoreProfiles,
    geometry: &Geometry,
    transport: &TransportCoefficients,
    sources: &SourceTerms,
    flux_inductance: Real,
    density_floor: Real,
) -> Result<Block1DCoeffs> {
    let n_cells = profiles.n_cells();
    let ne_floored = profiles.ne().mapv(|ne| ne.max(density_floor));
    let ne_face = harmonic_faces(&ne_floored);

    let chi_ion_face = harmonic_faces(transport.chi_ion().as_array());
    let chi_electron_face = harmonic_faces(transport.chi_electron().as_array());
    let particle_d_face = harmonic_faces(transport.particle_diffusivity().as_array());
    let velocity_face = arithmetic_faces(transport.convection().as_array());

    let zero_faces = || Array1::zeros(n_cells + 1);
    let zero_cells = || Array1::zeros(n_cells);

    let ion_temperature = EquationCoeffs::new(
        n_cells,
        &ne_face * &chi_ion_face,
        zero_faces(),
        sources.ion_heating().mapv(|p| p * MEGAWATTS_TO_EV),
        zero_cells(),
        ne_floored.clone(),
    )?;

    let electron_temperature = EquationCoeffs::new(
        n_cells,
        &ne_face * &chi_electron_face,
        zero_faces(),
        sources.electron_heating().mapv(|p| p * MEGAWATTS_TO_EV),
        zero_cells(),
        ne_floored,
    )?;

    let density = EquationCoeffs::new(
        n_cells,
        particle_d_face,
        velocity_face,
        sources.particle_source().as_array().clone(),
        zero_cells(),
        Array1::ones(n_cells),
    )?;

    let poloidal_flux = EquationCoeffs::new(
        n_cells,
        Array1::from_elem(n_cells + 1, PARALLEL_RESISTIVITY),
        zero_faces(),
        sources.current_source().as_array().clone(),
        zero_cells(),
        Array1::from_elem(n_cells, flux_inductance),
    )?;

    Ok(Block1DCoeffs {
        ion_temperature,
        electron_temperature,
        density,
        poloidal_flux,
        geometry: geometry.factors(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use torrent_common::DENSITY_FLOOR;
    use torrent_physics::{ConstantTransport, SourceModel, NoSources, TransportModel};

    fn sample(n_cells: usize, ne: Real) -> (CoreProfiles, Geometry) {
        let profiles = CoreProfiles::new(
            Array1::from_elem(n_cells, 5.0e3),
            Array1::from_elem(n_cells, 5.0e3),
            Array1::from_elem(n_cells, ne),
            Array1::zeros(n_cells),
        )
        .unwrap();
        let geometry = Geometry::circular(n_cells, 3.0, 1.0, 2.5).unwrap();
        (profiles, geometry)
    }

    fn assemble(profiles: &CoreProfiles, geometry: &Geometry) -> Block1DCoeffs {
        let transport = ConstantTransport::default()
            .coefficients(profiles, geometry)
            .unwrap();
        let sources = NoSources.terms(profiles, geometry).unwrap();
        assemble_coeffs(profiles, geometry, &transport, &sources, 1.0, DENSITY_FLOOR).unwrap()
    }

    #[test]
    fn test_temperature_diffusivity_carries_density() {
        let (profiles, geometry) = sample(50, 1.0e20);
        let block = assemble(&profiles, &geometry);

        // d = nₑ_face · χ_face with χᵢ = 1.
        let d_face = block.ion_temperature.d_face();
        assert!(d_face.iter().all(|value| value.is_finite()));
        assert_relative_eq!(d_face[25], 1.0e20, max_relative = 1e-5);

        // Transients: nₑ for temperatures, 1 for density and flux.
        assert_relative_eq!(block.ion_temperature.transient_coeff()[0], 1.0e20, max_relative = 1e-6);
        assert_eq!(block.density.transient_coeff()[0], 1.0);
        assert_eq!(block.poloidal_flux.transient_coeff()[0], 1.0);
    }

    #[test]
    fn test_density_floor_applied_on_consumption() {
        let (profiles, geometry) = sample(50, 1.0e10); // far below the floor
        let block = assemble(&profiles, &geometry);
        assert!(
            block
                .ion_temperature
                .transient_coeff()
                .iter()
                .all(|&c| c >= DENSITY_FLOOR)
        );
    }

    #[test]
    fn test_heating_source_unit_conversion() {
        let (profiles, geometry) = sample(50, 1.0e20);
        let transport = ConstantTransport::default()
            .coefficients(&profiles, &geometry)
            .unwrap();
        // 2 MW/m³ of uniform electron heating.
        let sources = torrent_physics::SourceTerms::new(
            Array1::zeros(50),
            Array1::from_elem(50, 2.0),
            Array1::zeros(50),
            Array1::zeros(50),
        )
        .unwrap();
        let block =
            assemble_coeffs(&profiles, &geometry, &transport, &sources, 1.0, DENSITY_FLOOR)
                .unwrap();

        assert_relative_eq!(
            block.electron_temperature.source_cell()[10],
            2.0 * MEGAWATTS_TO_EV,
            max_relative = 1e-6
        );

        // Integrated source equals Q·ΣV_cell: the discrete integral is the
        // plain volume-weighted sum, with no hidden weighting.
        let integrated: Real = block
            .electron_temperature
            .source_cell()
            .iter()
            .zip(geometry.cell_volumes())
            .map(|(s, v)| s * v)
            .sum();
        let expected = 2.0 * MEGAWATTS_TO_EV * geometry.plasma_volume();
        assert_relative_eq!(integrated, expected, max_relative = 1e-4);
    }

    #[test]
    fn test_flux_equation_constants() {
        let (profiles, geometry) = sample(50, 1.0e20);
        let block = assemble(&profiles, &geometry);
        assert!(
            block
                .poloidal_flux
                .d_face()
                .iter()
                .all(|&d| d == PARALLEL_RESISTIVITY)
        );
        assert!(block.poloidal_flux.v_face().iter().all(|&v| v == 0.0));
    }
}
