//! Kernel benchmarks for framestack
//!
//! Compares the partitioned min/max kernel against a plain scan, and the
//! naive against the tiled Z projection.
//!
//! Run with: cargo bench --bench kernels

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framestack::minmax::find_min_max;
use framestack::{FrameStack, ProjectionAxis, ProjectionMode, ProjectionStrategy};
use std::hint::black_box;
use std::time::Duration;

/// Deterministic pseudo-random pixel data
fn pixels(len: usize, seed: u64) -> Vec<u16> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 48) as u16
        })
        .collect()
}

fn bench_min_max(c: &mut Criterion) {
    let mut group = c.benchmark_group("min_max");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));

    for size in [1 << 12, 1 << 18, 1 << 22] {
        group.throughput(Throughput::Elements(size as u64));
        let data = pixels(size, 7);

        group.bench_with_input(BenchmarkId::new("partitioned", size), &data, |bench, data| {
            bench.iter(|| find_min_max(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("scalar_scan", size), &data, |bench, data| {
            bench.iter(|| {
                let data = black_box(data);
                let min = data.iter().copied().min();
                let max = data.iter().copied().max();
                (min, max)
            })
        });
    }
    group.finish();
}

fn bench_z_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("z_projection");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(5));

    let (width, height) = (1024, 1024);
    for depth in [8, 64] {
        group.throughput(Throughput::Elements((width * height * depth) as u64));
        let frames = (0..depth).map(|z| pixels(width * height, z as u64)).collect();
        let stack = FrameStack::from_frames(width, height, frames).unwrap();

        for (name, strategy) in [
            ("naive", ProjectionStrategy::Naive),
            ("tiled", ProjectionStrategy::default()),
        ] {
            for mode in [ProjectionMode::Maximum, ProjectionMode::Average] {
                let id = BenchmarkId::new(format!("{}_{:?}", name, mode), depth);
                group.bench_with_input(id, &stack, |bench, stack| {
                    bench.iter(|| {
                        stack
                            .project(ProjectionAxis::Z, mode, strategy)
                            .unwrap()
                    })
                });
            }
        }
    }
    group.finish();
}

fn bench_transpose(c: &mut Criterion) {
    let mut group = c.benchmark_group("transpose");
    group.sample_size(10);

    let frames = (0..16).map(|z| pixels(1000 * 700, z)).collect();
    let stack = FrameStack::from_frames(1000, 700, frames).unwrap();
    group.throughput(Throughput::Elements((1000 * 700 * 16) as u64));
    group.bench_function("16x1000x700", |bench| bench.iter(|| stack.transpose()));
    group.finish();
}

criterion_group!(benches, bench_min_max, bench_z_projection, bench_transpose);
criterion_main!(benches);
