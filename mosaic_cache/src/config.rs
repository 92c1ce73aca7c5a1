// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cache configuration.

use mosaic_index::Region;

/// Default cell-count hint for the validity tree.
pub const DEFAULT_CAPACITY: usize = 64;

/// Default limit on missing tiles before a query falls back to one fetch.
pub const DEFAULT_MAX_MISSING_TILES: usize = 10;

/// Configuration for a [`SpatialCache`](crate::SpatialCache).
///
/// ```
/// use mosaic_cache::CacheConfig;
/// use mosaic_index::Region;
///
/// let config = CacheConfig::new(Region::new(-180.0, -90.0, 180.0, 90.0))
///     .with_capacity(256)
///     .with_max_features(100_000);
/// assert_eq!(config.max_missing_tiles, 10);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    /// Region partitioned and tracked by the cache. Queries outside it are
    /// always forwarded to the store.
    pub universe: Region,

    /// Cell-count hint. Each axis gets `ceil(sqrt(capacity))` divisions.
    /// Default: 64 (an 8×8 grid)
    pub capacity: usize,

    /// Queries missing more tiles than this are fetched as one region.
    ///
    /// That region is the query widened to the union of its missing cells, so
    /// the single fetch can extend past the query and marks those cells complete.
    /// Default: 10
    pub max_missing_tiles: usize,

    /// Maximum number of features held at once. `None` means unbounded.
    /// Default: `None`
    pub max_features: Option<usize>,
}

impl CacheConfig {
    /// Create a config for the given universe with default limits.
    pub fn new(universe: Region) -> Self {
        Self {
            universe,
            capacity: DEFAULT_CAPACITY,
            max_missing_tiles: DEFAULT_MAX_MISSING_TILES,
            max_features: None,
        }
    }

    /// Set the cell-count hint.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the missing-tile limit.
    pub fn with_max_missing_tiles(mut self, max_missing_tiles: usize) -> Self {
        self.max_missing_tiles = max_missing_tiles;
        self
    }

    /// Bound the number of cached features.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }
}
