// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mosaic_index::backends::{FlatIndex, GridIndex};
use mosaic_index::{CollectNodes, Region, SpatialIndex};

fn gen_grid_regions(n: usize, cell: f64) -> Vec<Region> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            out.push(Region::from_xywh(x as f64 * cell, y as f64 * cell, cell, cell));
        }
    }
    out
}

fn fill<I: SpatialIndex<u32>>(idx: &mut I, regions: &[Region]) {
    for (i, r) in regions.iter().copied().enumerate() {
        idx.insert(i as u32, r);
    }
}

fn bench_backends(c: &mut Criterion) {
    let query = Region::from_xywh(100.0, 100.0, 400.0, 400.0);
    for &n in &[32usize, 64, 128] {
        let regions = gen_grid_regions(n, 10.0);
        let mut group = c.benchmark_group(format!("index_n{}", n));
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function("flatvec_insert_query", |b| {
            b.iter_batched(
                FlatIndex::<u32>::new,
                |mut idx| {
                    fill(&mut idx, &regions);
                    black_box(idx.intersecting(query).len());
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function("grid_insert_query", |b| {
            b.iter_batched(
                || GridIndex::<u32>::new(32.0),
                |mut idx| {
                    fill(&mut idx, &regions);
                    black_box(idx.intersecting(query).len());
                },
                BatchSize::SmallInput,
            )
        });

        let mut grid = GridIndex::<u32>::new(32.0);
        fill(&mut grid, &regions);
        group.bench_function("grid_nodes_only", |b| {
            b.iter(|| {
                let mut nodes = CollectNodes::default();
                grid.intersection_query(query, &mut nodes);
                black_box(nodes.nodes.len());
            })
        });
        group.finish();
    }
}

criterion_group!(benches, bench_backends);
criterion_main!(benches);
