// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mosaic_cache::{CacheConfig, Feature, FeatureId, Filter, MemoryStore, SpatialCache};
use mosaic_index::Region;

const EXTENT: f64 = 2000.0;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_store(count: usize) -> MemoryStore {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|i| {
            let x0 = rng.next_f64() * (EXTENT - 12.0);
            let y0 = rng.next_f64() * (EXTENT - 12.0);
            let w = 1.0 + rng.next_f64() * 11.0;
            Feature::new(FeatureId(i as u64), Region::from_xywh(x0, y0, w, w))
        })
        .collect()
}

fn gen_viewports(count: usize, size: f64) -> Vec<Region> {
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    (0..count)
        .map(|_| {
            let x0 = rng.next_f64() * (EXTENT - size);
            let y0 = rng.next_f64() * (EXTENT - size);
            Region::from_xywh(x0, y0, size, size)
        })
        .collect()
}

fn config(capacity: usize) -> CacheConfig {
    CacheConfig::new(Region::new(0.0, 0.0, EXTENT, EXTENT)).with_capacity(capacity)
}

fn bench_cold(c: &mut Criterion) {
    let store = gen_store(20_000);
    let viewports = gen_viewports(64, 250.0);
    let mut group = c.benchmark_group("cold");
    for &capacity in &[16usize, 64, 256] {
        group.throughput(Throughput::Elements(viewports.len() as u64));
        group.bench_function(format!("viewports_capacity{}", capacity), |b| {
            b.iter_batched(
                || SpatialCache::new(&store, config(capacity)),
                |mut cache| {
                    let mut hits = 0;
                    for v in &viewports {
                        hits += cache.get_features(&Filter::BBox(*v)).map_or(0, |fc| fc.len());
                    }
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_warm(c: &mut Criterion) {
    let store = gen_store(20_000);
    let viewports = gen_viewports(64, 250.0);
    let mut group = c.benchmark_group("warm");
    for &capacity in &[16usize, 64, 256] {
        let mut cache = SpatialCache::new(&store, config(capacity));
        let _ = cache.get_features(&Filter::Include);
        group.throughput(Throughput::Elements(viewports.len() as u64));
        group.bench_function(format!("viewports_capacity{}", capacity), |b| {
            b.iter(|| {
                let mut hits = 0;
                for v in &viewports {
                    hits += cache.get_features(&Filter::BBox(*v)).map_or(0, |fc| fc.len());
                }
                black_box(hits);
            })
        });
    }
    group.finish();
}

fn bench_store_direct(c: &mut Criterion) {
    use mosaic_cache::BackingStore;

    let store = gen_store(20_000);
    let viewports = gen_viewports(64, 250.0);
    c.bench_function("store_direct_viewports", |b| {
        b.iter(|| {
            let mut hits = 0;
            for v in &viewports {
                hits += store.get_features(&Filter::BBox(*v)).map_or(0, |fc| fc.len());
            }
            black_box(hits);
        })
    });
}

fn bench_missing_scan(c: &mut Criterion) {
    let store = gen_store(5_000);
    let mut cache = SpatialCache::new(&store, config(1024));
    // Leave a checkerboard of complete cells.
    for v in gen_viewports(200, 40.0) {
        let _ = cache.get_features(&Filter::BBox(v));
    }
    let query = Region::new(100.0, 100.0, 1900.0, 1900.0);
    c.bench_function("find_missing_regions_1024_cells", |b| {
        b.iter(|| black_box(cache.tree().find_missing_regions(black_box(query)).len()))
    });
}

criterion_group!(
    benches,
    bench_cold,
    bench_warm,
    bench_store_direct,
    bench_missing_scan
);
criterion_main!(benches);
