use criterion::{criterion_group, criterion_main, Criterion};
use fastrand::Rng;
use std::hint::black_box;
use tactile_recon::config::Config;
use tactile_recon::grid::BinaryMask;
use tactile_recon::mixture::MixtureModel;
use tactile_recon::pipeline::Reconstructor;
use tactile_recon::segmentation::label;
use tactile_recon::synthetic::render_frame;

fn checkerboard_mask(rows: usize, cols: usize) -> BinaryMask {
    let mut mask = BinaryMask::filled(rows, cols, false);
    for r in 0..rows {
        for c in 0..cols {
            // 2x2 blocks separated by background lanes.
            mask.set(r, c, r % 3 != 2 && c % 3 != 2);
        }
    }
    mask
}

fn bench_labeling(c: &mut Criterion) {
    let small = checkerboard_mask(6, 8);
    let large = checkerboard_mask(64, 64);

    c.bench_function("label 6x8", |b| b.iter(|| label(black_box(&small))));
    c.bench_function("label 64x64", |b| b.iter(|| label(black_box(&large))));
}

fn bench_point_contact(c: &mut Criterion) {
    let touches =
        MixtureModel::from_components(&[[25.0, 45.0], [65.0, 25.0]], &[8.0, 8.0], &[0.5, 0.5])
            .expect("valid touches");
    let intensity = render_frame(&touches, 6, 8, 10.0, 1.0).expect("valid frame");
    let mask = intensity.binarize(0.18);
    let total_force = intensity.total_force(0.15);
    let reconstructor = Reconstructor::from_config(&Config::default()).expect("default config");

    c.bench_function("point contact cycle", |b| {
        let mut rng = Rng::with_seed(42);
        b.iter(|| {
            reconstructor
                .reconstruct(black_box(&mask), black_box(&intensity), total_force, &mut rng)
                .ok()
        })
    });
}

criterion_group!(benches, bench_labeling, bench_point_contact);
criterion_main!(benches);
