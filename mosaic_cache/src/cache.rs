// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The caching façade in front of a [`BackingStore`].

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use mosaic_index::{Region, SpatialIndex};
use smallvec::SmallVec;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::feature::{Feature, FeatureCollection, FeatureId};
use crate::filter::{Filter, FilterBuilder, Spatial};
use crate::store::BackingStore;
use crate::tree::ValidityTree;

/// Counters accumulated by a [`SpatialCache`] since construction or the last clear.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to [`SpatialCache::get_features`].
    pub queries: u64,
    /// Requests sent to the backing store.
    pub fetches: u64,
    /// Features returned by the backing store.
    pub features_fetched: u64,
    /// Result features served without a fetch in the same call.
    pub cache_hits: u64,
    /// Features dropped by [`SpatialCache::remove_region`].
    pub evictions: u64,
}

/// One store request of a query plan.
#[derive(Copy, Clone, Debug)]
enum PlannedFetch {
    /// Missing cells inside the universe. Eligible for validation.
    Tracked(Region),
    /// Area of a bounded query outside the universe.
    Untracked(Region),
    /// Every feature wholly outside the universe, for queries without a bounding box.
    BeyondUniverse,
}

/// A spatial result cache.
///
/// The cache partitions its [universe](CacheConfig::universe) into cells and
/// remembers which cells it holds completely. Queries are answered from
/// complete cells, and only the missing cells (plus any area outside the
/// universe) are fetched from the store.
///
/// All operations are synchronous. Store errors are surfaced unchanged and a
/// failed call leaves the cache as it was.
#[derive(Debug)]
pub struct SpatialCache<S> {
    store: S,
    config: CacheConfig,
    filters: FilterBuilder,
    tree: ValidityTree,
    by_id: HashMap<FeatureId, Feature>,
    stats: CacheStats,
}

impl<S: BackingStore> SpatialCache<S> {
    /// Create an empty cache in front of `store`.
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::with_filter_builder(store, config, FilterBuilder::default())
    }

    /// Create an empty cache using `filters` to split queries and build store requests.
    pub fn with_filter_builder(store: S, config: CacheConfig, filters: FilterBuilder) -> Self {
        let tree = ValidityTree::new(config.universe, config.capacity);
        log::debug!(
            "new spatial cache: universe {:?}, {} cells",
            config.universe,
            tree.cell_count()
        );
        Self {
            store,
            config,
            filters,
            tree,
            by_id: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The validity tree.
    pub fn tree(&self) -> &ValidityTree {
        &self.tree
    }

    /// Counters since construction or the last [`clear`](Self::clear).
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached features.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no feature is cached.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Whether a feature with this id is cached.
    pub fn contains(&self, id: FeatureId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All features matching `filter`, fetching whatever the cache cannot prove it holds.
    ///
    /// Only the bounding-box part of the filter is tracked. Other restrictions
    /// are forwarded to the store, and a fetch restricted by them does not mark
    /// any cell complete. A filter without a bounding box is answered for the
    /// universe from the cells, and for everything outside it from the store.
    pub fn get_features(&mut self, filter: &Filter) -> Result<FeatureCollection> {
        self.stats.queries += 1;
        if matches!(filter, Filter::Exclude) {
            return Ok(FeatureCollection::new());
        }
        let split = self.filters.split(filter);
        let universe = self.config.universe;
        let query = match split.spatial {
            Spatial::Include => universe,
            Spatial::Bounded(region) => region,
        };

        let plan = self.plan(query, matches!(split.spatial, Spatial::Include));
        if !plan.is_empty() {
            log::debug!("query {query:?}: fetching {} region(s)", plan.len());
        }

        // Fetch everything before touching any state.
        let mut fetched: Vec<FeatureCollection> = Vec::with_capacity(plan.len());
        for step in &plan {
            let request = self.request(*step, &split.other);
            self.stats.fetches += 1;
            match self.store.get_features(&request) {
                Ok(fc) => fetched.push(fc),
                Err(err) => {
                    log::warn!("fetch of {step:?} failed: {err}");
                    return Err(err.into());
                }
            }
        }

        let fresh: HashSet<FeatureId> = fetched.iter().flat_map(|fc| fc.ids()).collect();
        self.check_admission(fresh.iter().copied())?;

        for fc in fetched {
            self.stats.features_fetched += fc.len() as u64;
            for feature in fc {
                self.admit(feature);
            }
        }
        if split.other.is_include() {
            for step in &plan {
                if let PlannedFetch::Tracked(region) = *step {
                    self.tree.validate(region);
                }
            }
        }

        let mut ids: Vec<FeatureId> = self.tree.intersecting(query);
        ids.extend(fresh.iter().copied());
        ids.sort_unstable();
        ids.dedup();

        let mut out = FeatureCollection::new();
        for id in ids {
            let Some(feature) = self.by_id.get(&id) else {
                continue;
            };
            if !filter.evaluate(feature) {
                continue;
            }
            if !fresh.contains(&id) {
                self.stats.cache_hits += 1;
            }
            out.push(feature.clone());
        }
        Ok(out)
    }

    /// Requests for `query`: missing cells of the tracked part, then the
    /// untracked area outside the universe.
    ///
    /// An `unbounded` query is the universe itself, and its outside area is
    /// everything not intersecting the universe.
    fn plan(&self, query: Region, unbounded: bool) -> SmallVec<[PlannedFetch; 8]> {
        let universe = self.config.universe;
        let mut plan = SmallVec::new();
        let Some(tracked) = query.clip(&universe) else {
            plan.push(PlannedFetch::Untracked(query));
            return plan;
        };

        let scan = self.tree.scan_missing(tracked);
        if scan.tiles.len() > self.config.max_missing_tiles {
            // One request for the query, widened to whole cells so it can
            // prove every missing cell complete.
            let whole = scan.tiles.iter().fold(tracked, |acc, t| acc.combine(t));
            log::debug!(
                "{} missing tiles exceed limit of {}, fetching {whole:?} whole",
                scan.tiles.len(),
                self.config.max_missing_tiles
            );
            plan.push(PlannedFetch::Tracked(whole));
        } else {
            plan.extend(scan.reduce().into_iter().map(PlannedFetch::Tracked));
        }
        if unbounded {
            plan.push(PlannedFetch::BeyondUniverse);
        } else {
            plan.extend(query.subtract(&universe).map(PlannedFetch::Untracked));
        }
        plan
    }

    /// Store request for one planned step, restricted by `other`.
    fn request(&self, step: PlannedFetch, other: &Filter) -> Filter {
        let area = match step {
            PlannedFetch::Tracked(region) | PlannedFetch::Untracked(region) => {
                self.filters.bbox(region)
            }
            PlannedFetch::BeyondUniverse => {
                self.filters.not(self.filters.bbox(self.config.universe))
            }
        };
        self.filters.and(area, other.clone())
    }

    /// Fail with [`CacheError::CacheOversized`] if these ids would not fit.
    fn check_admission(&self, ids: impl IntoIterator<Item = FeatureId>) -> Result<()> {
        let Some(limit) = self.config.max_features else {
            return Ok(());
        };
        let new = ids
            .into_iter()
            .filter(|id| !self.by_id.contains_key(id))
            .count();
        let requested = self.by_id.len() + new;
        if requested > limit {
            log::warn!("cache oversized: {requested} features, limit {limit}");
            return Err(CacheError::CacheOversized { limit, requested });
        }
        Ok(())
    }

    /// Insert a feature unless its id is already cached.
    fn admit(&mut self, feature: Feature) -> bool {
        if self.by_id.contains_key(&feature.id) {
            return false;
        }
        self.tree.insert(feature.id, feature.bounds);
        self.by_id.insert(feature.id, feature);
        true
    }

    /// Look up a feature by id, fetching it by id on a miss.
    ///
    /// An id fetch says nothing about completeness, so no cell is validated.
    pub fn get(&mut self, id: FeatureId) -> Result<Option<&Feature>> {
        if !self.by_id.contains_key(&id) {
            self.stats.fetches += 1;
            let fc = self.store.get_features(&self.filters.id(id)).map_err(|err| {
                log::warn!("fetch of {id} failed: {err}");
                CacheError::from(err)
            })?;
            self.stats.features_fetched += fc.len() as u64;
            let Some(feature) = fc.into_iter().find(|f| f.id == id) else {
                return Ok(None);
            };
            self.check_admission([id])?;
            self.admit(feature);
        }
        Ok(self.by_id.get(&id))
    }

    /// Cache a feature. Returns `false` if its id was already cached.
    ///
    /// The existing entry always wins; use [`remove`](Self::remove) first to replace it.
    pub fn put(&mut self, feature: Feature) -> Result<bool> {
        if self.by_id.contains_key(&feature.id) {
            return Ok(false);
        }
        self.check_admission([feature.id])?;
        Ok(self.admit(feature))
    }

    /// Cache several features. Returns how many were newly inserted.
    ///
    /// The size limit is checked for the whole batch before anything is inserted.
    pub fn put_all(&mut self, features: impl IntoIterator<Item = Feature>) -> Result<usize> {
        let features: Vec<Feature> = features.into_iter().collect();
        let distinct: HashSet<FeatureId> = features.iter().map(|f| f.id).collect();
        self.check_admission(distinct)?;
        Ok(features
            .into_iter()
            .map(|f| self.admit(f))
            .filter(|&inserted| inserted)
            .count())
    }

    /// Drop a cached feature. Cell completeness is not changed.
    pub fn remove(&mut self, id: FeatureId) -> Option<Feature> {
        let feature = self.by_id.remove(&id)?;
        self.tree.delete(id, feature.bounds);
        Some(feature)
    }

    /// Invalidate every cell intersecting `region` and drop the affected features.
    ///
    /// A feature is dropped if it was listed by an invalidated cell or its
    /// bounds intersect `region`. Returns the number of features dropped.
    pub fn remove_region(&mut self, region: Region) -> usize {
        let mut doomed = self.tree.invalidate(region);
        doomed.extend(
            self.by_id
                .values()
                .filter(|f| f.bounds.intersects(&region))
                .map(|f| f.id),
        );
        let mut dropped = 0;
        for id in doomed {
            if self.remove(id).is_some() {
                dropped += 1;
            }
        }
        log::debug!("invalidated {region:?}: dropped {dropped} feature(s)");
        self.stats.evictions += dropped as u64;
        dropped
    }

    /// Drop every cached feature and mark every cell incomplete.
    pub fn clear(&mut self) {
        self.tree.flush();
        self.by_id.clear();
        self.stats = CacheStats::default();
    }

    /// Bounds of the whole store.
    pub fn get_bounds(&self) -> Result<Option<Region>> {
        Ok(self.store.get_bounds()?)
    }

    /// Number of features matching `filter`.
    ///
    /// Answered locally when the filter is a bare bounding box inside the
    /// universe whose cells are all complete. Otherwise the store is asked.
    pub fn get_count(&self, filter: &Filter) -> Result<i64> {
        let split = self.filters.split(filter);
        if let Spatial::Bounded(region) = split.spatial
            && split.other.is_include()
            && self.tree.is_complete(region)
        {
            let n = self
                .tree
                .intersecting(region)
                .into_iter()
                .filter_map(|id| self.by_id.get(&id))
                .filter(|f| filter.evaluate(f))
                .count();
            return Ok(i64::try_from(n).unwrap_or(i64::MAX));
        }
        Ok(self.store.get_count(filter)?)
    }
}
