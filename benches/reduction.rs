/// Benchmarks for the metric reduction hot path.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridverify::metric::{MetricRegistry, MAE, RMSE};
use gridverify::models::ReductionMode;
use gridverify::reduce::{nanmean, reduce};
use ndarray::{ArrayD, IxDyn};

fn grid(time: usize, lat: usize, lon: usize, nan_every: usize) -> ArrayD<f64> {
    let values: Vec<f64> = (0..time * lat * lon)
        .map(|i| {
            if nan_every > 0 && i % nan_every == 0 {
                f64::NAN
            } else {
                (i % 97) as f64 * 0.25
            }
        })
        .collect();
    ArrayD::from_shape_vec(IxDyn(&[time, lat, lon]), values).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let registry = MetricRegistry::with_builtins();
    let dims = vec!["time".to_string(), "lat".to_string(), "lon".to_string()];
    for (time, lat, lon) in [(8, 64, 64), (32, 128, 128)] {
        for nan_every in [0, 13] {
            let sim = grid(time, lat, lon, nan_every);
            let obs = grid(time, lat, lon, 0);
            for name in [MAE, RMSE] {
                let metric = registry.lookup(name).unwrap();
                for mode in [
                    ReductionMode::Spatial,
                    ReductionMode::Temporal,
                    ReductionMode::Overall,
                ] {
                    let id = format!("{}({}x{}x{}, nan={}, {})", name, time, lat, lon, nan_every, mode);
                    c.bench_function(&id, |b| {
                        b.iter(|| {
                            let field = ndarray::Zip::from(black_box(&sim))
                                .and(black_box(&obs))
                                .map_collect(|s, o| metric.pointwise(*s, *o));
                            let mut reduced = reduce(&field, &dims, mode);
                            reduced.values.mapv_inplace(|mean| metric.finalize(mean));
                            black_box(nanmean(&reduced.values))
                        })
                    });
                }
            }
        }
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
