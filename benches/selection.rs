//! Benchmarks for error table construction and keyframe selection.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;

use keyframe_reduce::{
    compute::{AnimationSeries, CpuBackend, ErrorTable, SelectionManager, Selector},
    schema::ErrorMetric,
};

/// Random-walk motion capture style data: a frame channel plus `n_dims - 1` joints.
fn random_motion(n_frames: usize, n_dims: usize, seed: u64) -> AnimationSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pose = vec![0.0f32; n_dims];
    let mut velocity = vec![0.0f32; n_dims];
    let mut data = Vec::with_capacity(n_frames * n_dims);

    for f in 0..n_frames {
        pose[0] = f as f32;
        for d in 1..n_dims {
            velocity[d] = 0.9 * velocity[d] + rng.gen_range(-0.5..0.5);
            pose[d] += velocity[d];
        }
        data.extend_from_slice(&pose);
    }
    AnimationSeries::from_flat(data, n_dims).unwrap()
}

fn bench_error_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("error_table");

    for n_frames in [100, 200, 400] {
        let series = Arc::new(random_motion(n_frames, 8, 42));

        group.bench_with_input(
            BenchmarkId::new("line", n_frames),
            &n_frames,
            |b, _| {
                b.iter(|| {
                    ErrorTable::build(black_box(series.clone()), ErrorMetric::Line, &CpuBackend)
                        .unwrap()
                });
            },
        );
    }

    for n_frames in [50, 100] {
        let series = Arc::new(random_motion(n_frames, 8, 42));

        group.bench_with_input(
            BenchmarkId::new("curve", n_frames),
            &n_frames,
            |b, _| {
                b.iter(|| {
                    ErrorTable::build(black_box(series.clone()), ErrorMetric::Curve, &CpuBackend)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_selector(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector");

    for n_frames in [100, 200] {
        let series = random_motion(n_frames, 8, 7);
        let table = ErrorTable::using_line_based_error(series).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_frames_to_30", n_frames)),
            &n_frames,
            |b, _| {
                b.iter(|| {
                    let mut selector = Selector::new(table.clone());
                    selector.up_to(black_box(30)).unwrap();
                    selector
                });
            },
        );
    }

    group.finish();
}

fn bench_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager");
    let series = random_motion(300, 8, 3);

    for fixed in [Vec::<usize>::new(), vec![100, 200]] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_fixed", fixed.len())),
            &fixed,
            |b, fixed| {
                b.iter(|| {
                    let mut manager =
                        SelectionManager::new(&series, ErrorMetric::Line, fixed).unwrap();
                    manager.increment_until_n_keyframes(black_box(40)).unwrap();
                    manager
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_error_table, bench_selector, bench_manager);
criterion_main!(benches);
