//! Benchmarks for the comparison statistics

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use priocomp_algorithms::compare::{cmcs, compare_rasters, jaccard, kendall_tau_b, ThresholdPair};
use priocomp_core::{GeoTransform, Raster};

fn create_rank_raster(size: usize, seed: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    let n = (size * size) as f64;
    for row in 0..size {
        for col in 0..size {
            let i = row * size + col;
            let v = ((i * (2 * seed + 1) + seed * 97) % (size * size)) as f64 / n;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn values(r: &Raster<f64>) -> Vec<f64> {
    r.data().iter().copied().collect()
}

fn bench_kendall(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare/kendall_tau_b");
    for size in [256, 512, 1024] {
        let a = values(&create_rank_raster(size, 1));
        let b = values(&create_rank_raster(size, 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| kendall_tau_b(black_box(&a), black_box(&b)).unwrap())
        });
    }
    group.finish();
}

fn bench_cmcs(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare/cmcs");
    for size in [256, 512, 1024] {
        let a = values(&create_rank_raster(size, 1));
        let b = values(&create_rank_raster(size, 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| cmcs(black_box(&a), black_box(&b)).unwrap())
        });
    }
    group.finish();
}

fn bench_jaccard(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare/jaccard");
    for size in [256, 512, 1024] {
        let a = values(&create_rank_raster(size, 1));
        let b = values(&create_rank_raster(size, 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| jaccard(black_box(&a), black_box(&b), ThresholdPair::HIGH_TAIL).unwrap())
        });
    }
    group.finish();
}

fn bench_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare/pair");
    group.sample_size(20);
    let thresholds = ThresholdPair::defaults();
    for size in [256, 512] {
        let a = create_rank_raster(size, 1);
        let b = create_rank_raster(size, 2);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| compare_rasters(black_box(&a), black_box(&b), &thresholds).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kendall, bench_cmcs, bench_jaccard, bench_pair);
criterion_main!(benches);
