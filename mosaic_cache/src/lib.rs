// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mosaic Cache: a spatial result cache in front of an authoritative feature store.
//!
//! The cache avoids re-fetching geographic data it has already retrieved. It
//! partitions a fixed *universe* region into cells and tracks, per cell,
//! whether it holds every store feature overlapping the cell.
//!
//! - [`SpatialCache`]: the façade. Splits each query into a tracked bounding box
//!   and residual restrictions, fetches only the missing cells, and merges
//!   cached and fetched features.
//! - [`ValidityTree`]: the cell partition with completeness flags and payload
//!   keys. It is also a [`SpatialIndex`](mosaic_index::SpatialIndex) over cached ids.
//! - [`BackingStore`]: the authoritative source. [`MemoryStore`] is an in-memory one.
//! - [`Filter`] and [`FilterBuilder`]: query predicates, and the injected builder
//!   that splits them and builds store requests.
//!
//! A cell only becomes complete once a single fetch covered all of it, while
//! any overlap with an invalidated region makes it incomplete again.
//!
//! ## Features
//!
//! - `serde`: derives `Serialize`/`Deserialize` for [`CacheConfig`], [`FeatureId`],
//!   [`Value`] and `Region`.
//!
//! # Example
//!
//! ```rust
//! use mosaic_cache::{CacheConfig, Feature, FeatureId, Filter, MemoryStore, SpatialCache};
//! use mosaic_index::Region;
//!
//! let store: MemoryStore = [
//!     Feature::new(FeatureId(1), Region::new(5.0, 5.0, 15.0, 15.0)),
//!     Feature::new(FeatureId(2), Region::new(70.0, 70.0, 80.0, 80.0)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let config = CacheConfig::new(Region::new(0.0, 0.0, 100.0, 100.0)).with_capacity(4);
//! let mut cache = SpatialCache::new(store, config);
//!
//! let near = Filter::BBox(Region::new(0.0, 0.0, 40.0, 40.0));
//! let hits = cache.get_features(&near).unwrap();
//! assert_eq!(hits.ids().collect::<Vec<_>>(), [FeatureId(1)]);
//!
//! // The owning cell is complete now, so this is answered without a fetch.
//! let fetches = cache.stats().fetches;
//! cache.get_features(&Filter::BBox(Region::new(10.0, 10.0, 20.0, 20.0))).unwrap();
//! assert_eq!(cache.stats().fetches, fetches);
//! ```
//!
//! This crate is `no_std` and uses `alloc`. It performs no locking: every
//! mutating operation takes `&mut self`.

#![no_std]

extern crate alloc;

mod cache;
mod cell;
mod config;
mod error;
mod feature;
mod filter;
mod store;
mod tree;
mod visitors;

pub use cache::{CacheStats, SpatialCache};
pub use cell::Cell;
pub use config::{CacheConfig, DEFAULT_CAPACITY, DEFAULT_MAX_MISSING_TILES};
pub use error::{CacheError, Result, StoreError, UnsupportedFilterShape};
pub use feature::{Attributes, Feature, FeatureCollection, FeatureId, Value};
pub use filter::{CompareOp, Filter, FilterBuilder, Spatial, SplitFilter};
pub use store::{BackingStore, MemoryStore};
pub use tree::{CellsOverlapping, MissingScan, TreeStats, ValidityTree};
