use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vfc::{estimate_vfc, CorrespondenceSet, FieldBasis, VfcConfig};

/// Rotated, rippled 640×480 view pair with a given outlier share.
fn make_fixture(n: usize, outlier_ratio: f64, seed: u64) -> CorrespondenceSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let (sin, cos) = 0.1f64.sin_cos();
    let n_outliers = (n as f64 * outlier_ratio).round() as usize;

    let mut source = Vec::with_capacity(n);
    let mut target = Vec::with_capacity(n);
    for i in 0..n {
        let x = rng.gen_range(0.0..640.0);
        let y = rng.gen_range(0.0..480.0);
        source.push([x, y]);
        if i < n - n_outliers {
            let ripple = 5.0 * (y / 100.0f64).sin();
            target.push([
                cos * x - sin * y + 20.0 + ripple + rng.gen_range(-1.0..1.0),
                sin * x + cos * y - 10.0 + rng.gen_range(-1.0..1.0),
            ]);
        } else {
            target.push([rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)]);
        }
    }
    CorrespondenceSet::from_points(&source, &target).expect("fixture is valid")
}

fn bench_landmarks(c: &mut Criterion) {
    let small = make_fixture(200, 0.3, 7);
    let large = make_fixture(2000, 0.5, 9);
    let cfg = VfcConfig {
        seed: Some(1),
        ..VfcConfig::default()
    };

    c.bench_function("vfc_landmarks_200_30pct", |b| {
        b.iter(|| {
            let result = estimate_vfc(black_box(&small), black_box(&cfg)).unwrap();
            black_box(result.inliers.len())
        })
    });

    c.bench_function("vfc_landmarks_2000_50pct", |b| {
        b.iter(|| {
            let result = estimate_vfc(black_box(&large), black_box(&cfg)).unwrap();
            black_box(result.inliers.len())
        })
    });
}

fn bench_dense_bases(c: &mut Criterion) {
    let set = make_fixture(300, 0.3, 11);
    let full = VfcConfig {
        basis: FieldBasis::Full,
        seed: Some(1),
        ..VfcConfig::default()
    };
    let low_rank = VfcConfig {
        basis: FieldBasis::LowRank { rank: 30 },
        seed: Some(1),
        ..VfcConfig::default()
    };

    c.bench_function("vfc_full_300", |b| {
        b.iter(|| {
            let result = estimate_vfc(black_box(&set), black_box(&full)).unwrap();
            black_box(result.inliers.len())
        })
    });

    c.bench_function("vfc_low_rank30_300", |b| {
        b.iter(|| {
            let result = estimate_vfc(black_box(&set), black_box(&low_rank)).unwrap();
            black_box(result.inliers.len())
        })
    });
}

criterion_group!(hotpaths, bench_landmarks, bench_dense_bases);
criterion_main!(hotpaths);
