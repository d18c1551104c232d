use criterion::{Criterion, criterion_group, criterion_main};
use ndarray::Array1;
use std::hint::black_box;

use torrent_common::{BoundarySet, Real};
use torrent_geometry::Geometry;
use torrent_solver::{EquationCoeffs, apply_spatial};

fn bench_operator(criterion: &mut Criterion) {
    let n_cells = 100;
    let geometry = Geometry::circular(n_cells, 6.2, 2.0, 5.3).unwrap();
    let factors = geometry.factors();
    let u: Array1<Real> = geometry.rho().mapv(|rho| 2.0e4 * (1.0 - rho * rho / 4.0));
    let coeffs = EquationCoeffs::new(
        n_cells,
        Array1::from_elem(n_cells + 1, 1.0e20),
        Array1::from_elem(n_cells + 1, -0.2),
        Array1::from_elem(n_cells, 1.0e24),
        Array1::zeros(n_cells),
        Array1::from_elem(n_cells, 1.0e20),
    )
    .unwrap();
    let boundaries = BoundarySet::default();

    let _ = criterion.bench_function("spatial operator, 100 cells", |bencher| {
        bencher.iter(|| black_box(apply_spatial(u.view(), &coeffs, &factors, &boundaries)))
    });
}

criterion_group!(benches, bench_operator);
criterion_main!(benches);
