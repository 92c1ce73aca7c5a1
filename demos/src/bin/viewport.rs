// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A map viewport panning across a synthetic city, backed by a `SpatialCache`.
//!
//! The viewport is tracked as a `kurbo::Rect` and converted to a `Region`
//! per query. Each step prints how many features were drawn and how many
//! store requests the cache made. Set `RUST_LOG=debug` (or `trace`) to see
//! the fetch plans and cell transitions.
//!
//! Run:
//! - `cargo run -p mosaic_demos --bin viewport`

use kurbo::{Rect, Vec2};
use log::{LevelFilter, info};
use mosaic_cache::{
    CacheConfig, CacheError, CompareOp, Feature, FeatureId, Filter, FilterBuilder, MemoryStore,
    SpatialCache, Value,
};
use mosaic_index::Region;

const CITY: f64 = 1000.0;
const BLOCK: f64 = 20.0;

fn build_city() -> MemoryStore {
    let blocks = (CITY / BLOCK) as u64;
    let mut store = MemoryStore::with_cell_size(BLOCK * 2.0);
    for i in 0..blocks * blocks {
        let x = (i % blocks) as f64 * BLOCK;
        let y = (i / blocks) as f64 * BLOCK;
        let kind = if i % 7 == 0 { "park" } else { "building" };
        let bounds = Rect::new(x + 2.0, y + 2.0, x + BLOCK - 2.0, y + BLOCK - 2.0);
        store.insert(
            Feature::new(FeatureId(i), Region::from(bounds))
                .with_attribute("kind", kind)
                .with_attribute("floors", (i % 12) as i64),
        );
    }
    // A few landmarks sit outside the tracked universe.
    for (n, x) in [1100.0, 1250.0, 1400.0].into_iter().enumerate() {
        store.insert(Feature::new(
            FeatureId(1_000_000 + n as u64),
            Region::new(x, 100.0, x + 40.0, 140.0),
        ));
    }
    store
}

fn main() -> Result<(), CacheError> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let store = build_city();
    let config = CacheConfig::new(Region::new(0.0, 0.0, CITY, CITY)).with_capacity(100);
    let mut cache = SpatialCache::with_filter_builder(&store, config, FilterBuilder::new());
    info!(
        "city of {} features, cache tracks {} cells",
        store.len(),
        cache.tree().cell_count()
    );

    let mut viewport = Rect::new(0.0, 0.0, 240.0, 180.0);
    let pan = Vec2::new(90.0, 45.0);
    for step in 0..16 {
        let before = cache.stats().fetches;
        let drawn = cache.get_features(&Filter::BBox(viewport.into()))?;
        info!(
            "step {step:2}: viewport {:?} drew {} features with {} fetch(es)",
            viewport,
            drawn.len(),
            cache.stats().fetches - before
        );
        // Pan right, then bounce back once past the eastern edge.
        viewport = viewport + if step < 10 { pan } else { -pan };
    }

    // Tall buildings near the centre; residual predicates always reach the store.
    let tall = Filter::And(vec![
        Filter::BBox(Region::new(400.0, 400.0, 600.0, 600.0)),
        Filter::Property {
            name: "floors".into(),
            op: CompareOp::Greater,
            value: Value::Int(9),
        },
    ]);
    let found = cache.get_features(&tall)?;
    info!("{} tall buildings downtown", found.len());

    let stale = Region::new(0.0, 0.0, 300.0, 300.0);
    let dropped = cache.remove_region(stale);
    info!("invalidated {stale:?}, dropped {dropped} cached features");

    let count = cache.get_count(&Filter::BBox(Region::new(500.0, 100.0, 700.0, 200.0)))?;
    info!("{count} features in the harbour district");

    let stats = cache.stats();
    info!(
        "{} queries, {} fetches, {} features fetched, {} served from cache, {} evicted",
        stats.queries, stats.fetches, stats.features_fetched, stats.cache_hits, stats.evictions
    );
    Ok(())
}
