//! Benchmarks for normalization, ranking and RWR

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use priocomp_algorithms::normalize::occurrence_level_normalize;
use priocomp_algorithms::rank::{rank_raster, TieBreak};
use priocomp_algorithms::rwr::{calculate_rwr, Feature, FeatureCategory, FeatureStack, RwrParams};
use priocomp_core::{GeoTransform, Raster};

fn create_test_raster(size: usize, seed: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let v = ((row * (7 + seed) + col * 13 + seed * 31) % 256) as f64;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn create_stack(size: usize, n_features: usize) -> FeatureStack {
    let features = (0..n_features)
        .map(|i| {
            let category = if i % 2 == 0 {
                FeatureCategory::Biodiversity
            } else {
                FeatureCategory::EcosystemServices
            };
            Feature::new(format!("f{}", i), category, create_test_raster(size, i))
        })
        .collect();
    FeatureStack::new(features).unwrap()
}

fn bench_occurrence_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize/occurrence_level");
    for size in [256, 512, 1024] {
        let raster = create_test_raster(size, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| occurrence_level_normalize(black_box(&raster)).unwrap())
        });
    }
    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    for size in [256, 512, 1024] {
        let raster = create_test_raster(size, 3);
        group.bench_with_input(BenchmarkId::new("random", size), &size, |b, _| {
            b.iter(|| rank_raster(black_box(&raster), TieBreak::default()).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("average", size), &size, |b, _| {
            b.iter(|| rank_raster(black_box(&raster), TieBreak::Average).unwrap())
        });
    }
    group.finish();
}

fn bench_rwr(c: &mut Criterion) {
    let mut group = c.benchmark_group("rwr");
    group.sample_size(20);
    for size in [256, 512] {
        let stack = create_stack(size, 16);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| calculate_rwr(black_box(&stack), None, &RwrParams::default()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_occurrence_level, bench_rank, bench_rwr);
criterion_main!(benches);
