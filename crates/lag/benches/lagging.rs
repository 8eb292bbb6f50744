use criterion::{criterion_group, criterion_main, Criterion};
use lagbox_lag::{FeatureSet, Session};
use ndarray::{Array1, Array3, Axis};

fn criterion_lagging(c: &mut Criterion) {
    let n = 5000;
    let dims = [4, 16, 32];

    let mut group = c.benchmark_group("lagging");
    group.sample_size(20);
    for dim in dims {
        let u = Array1::linspace(0., 1., n);
        let tau = Array3::from_shape_fn((n, dim, dim), |(t, i, j)| {
            (t as f64).sin() + (i.min(j) as f64) * (i.max(j) as f64)
        });
        let y = Array1::linspace(1., 2., n);
        let lags = [vec![1, 2, 5, 10], vec![1, 3]];

        group.bench_function(format!("batch {dim}x{dim}"), |b| {
            b.iter(|| {
                let mut session = Session::configure(&lags, &[false, true]).unwrap();
                let features = FeatureSet::multi([u.view().into_dyn(), tau.view().into_dyn()]);
                std::hint::black_box(session.build_batch(&features, &y).unwrap());
            });
        });

        group.bench_function(format!("streaming {dim}x{dim}"), |b| {
            b.iter(|| {
                let mut session = Session::configure(&lags, &[false, true]).unwrap();
                for t in 0..1000 {
                    let samples = FeatureSet::multi([
                        u.index_axis(Axis(0), t).into_dyn(),
                        tau.index_axis(Axis(0), t).into_dyn(),
                    ]);
                    session.push(&samples).unwrap();
                    if session.history().is_ready() {
                        std::hint::black_box(session.current_vector().unwrap());
                    }
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_lagging);
criterion_main!(benches);
