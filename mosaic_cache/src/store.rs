// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The authoritative feature source behind a cache.

use alloc::boxed::Box;
use alloc::vec::Vec;

use hashbrown::HashMap;
use mosaic_index::backends::GridIndex;
use mosaic_index::{Region, SpatialIndex};

use crate::error::StoreError;
use crate::feature::{Feature, FeatureCollection, FeatureId};
use crate::filter::{Filter, FilterBuilder, Spatial};

/// A filter-queryable feature source, authoritative for every id it returns.
///
/// Calls may block on I/O. Any failure is reported as a [`StoreError`] and
/// surfaced by the cache unchanged.
pub trait BackingStore {
    /// All features matching `filter`.
    fn get_features(&self, filter: &Filter) -> Result<FeatureCollection, StoreError>;

    /// Bounds of every feature in the store, or `None` when it is empty.
    fn get_bounds(&self) -> Result<Option<Region>, StoreError>;

    /// Bounds of the features matching `filter`, or `None` when none match.
    fn get_bounds_of(&self, filter: &Filter) -> Result<Option<Region>, StoreError>;

    /// Number of features matching `filter`.
    fn get_count(&self, filter: &Filter) -> Result<i64, StoreError>;
}

impl<S: BackingStore + ?Sized> BackingStore for &S {
    fn get_features(&self, filter: &Filter) -> Result<FeatureCollection, StoreError> {
        (**self).get_features(filter)
    }

    fn get_bounds(&self) -> Result<Option<Region>, StoreError> {
        (**self).get_bounds()
    }

    fn get_bounds_of(&self, filter: &Filter) -> Result<Option<Region>, StoreError> {
        (**self).get_bounds_of(filter)
    }

    fn get_count(&self, filter: &Filter) -> Result<i64, StoreError> {
        (**self).get_count(filter)
    }
}

impl<S: BackingStore + ?Sized> BackingStore for Box<S> {
    fn get_features(&self, filter: &Filter) -> Result<FeatureCollection, StoreError> {
        (**self).get_features(filter)
    }

    fn get_bounds(&self) -> Result<Option<Region>, StoreError> {
        (**self).get_bounds()
    }

    fn get_bounds_of(&self, filter: &Filter) -> Result<Option<Region>, StoreError> {
        (**self).get_bounds_of(filter)
    }

    fn get_count(&self, filter: &Filter) -> Result<i64, StoreError> {
        (**self).get_count(filter)
    }
}

/// Default bucket size of the store's grid index.
const DEFAULT_CELL_SIZE: f64 = 16.0;

/// An in-memory authoritative store.
///
/// Features are indexed by a [`GridIndex`], so bounding-box filters only
/// evaluate candidates from the touched buckets. Results are ordered by id.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    index: GridIndex<FeatureId>,
    features: HashMap<FeatureId, Feature>,
    splitter: FilterBuilder,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with the default grid cell size.
    pub fn new() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE)
    }

    /// Create an empty store whose grid index uses `cell_size` buckets.
    pub fn with_cell_size(cell_size: f64) -> Self {
        Self {
            index: GridIndex::new(cell_size),
            features: HashMap::new(),
            splitter: FilterBuilder::new(),
        }
    }

    /// Insert or replace a feature. Returns the feature previously stored under its id.
    pub fn insert(&mut self, feature: Feature) -> Option<Feature> {
        self.index.insert(feature.id, feature.bounds);
        self.features.insert(feature.id, feature)
    }

    /// Remove a feature by id.
    pub fn remove(&mut self, id: FeatureId) -> Option<Feature> {
        let feature = self.features.remove(&id)?;
        self.index.delete(id, feature.bounds);
        Some(feature)
    }

    /// Look up a feature by id.
    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(&id)
    }

    /// Number of stored features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the store holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn matching(&self, filter: &Filter) -> Vec<&Feature> {
        let mut out: Vec<&Feature> = match filter {
            Filter::Id(ids) => ids.iter().filter_map(|id| self.features.get(id)).collect(),
            _ => match self.splitter.split(filter).spatial {
                Spatial::Bounded(region) => self
                    .index
                    .intersecting(region)
                    .into_iter()
                    .filter_map(|id| self.features.get(&id))
                    .collect(),
                Spatial::Include => self.features.values().collect(),
            },
        };
        out.retain(|f| filter.evaluate(f));
        out.sort_unstable_by_key(|f| f.id);
        out
    }
}

impl Extend<Feature> for MemoryStore {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        for feature in iter {
            self.insert(feature);
        }
    }
}

impl FromIterator<Feature> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

impl BackingStore for MemoryStore {
    fn get_features(&self, filter: &Filter) -> Result<FeatureCollection, StoreError> {
        Ok(self.matching(filter).into_iter().cloned().collect())
    }

    fn get_bounds(&self) -> Result<Option<Region>, StoreError> {
        Ok(self
            .features
            .values()
            .map(|f| f.bounds)
            .reduce(|acc, b| acc.combine(&b)))
    }

    fn get_bounds_of(&self, filter: &Filter) -> Result<Option<Region>, StoreError> {
        Ok(self
            .matching(filter)
            .into_iter()
            .map(|f| f.bounds)
            .reduce(|acc, b| acc.combine(&b)))
    }

    fn get_count(&self, filter: &Filter) -> Result<i64, StoreError> {
        let n = self.matching(filter).len();
        Ok(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use crate::feature::Value;
    use crate::filter::CompareOp;

    fn store() -> MemoryStore {
        [
            Feature::new(FeatureId(1), Region::new(0.0, 0.0, 10.0, 10.0)).with_attribute("kind", "road"),
            Feature::new(FeatureId(2), Region::new(40.0, 40.0, 45.0, 45.0)).with_attribute("kind", "river"),
            Feature::new(FeatureId(3), Region::new(-30.0, -30.0, -20.0, -20.0)).with_attribute("kind", "road"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn bbox_queries_use_the_index() {
        let s = store();
        let fc = s
            .get_features(&Filter::BBox(Region::new(5.0, 5.0, 41.0, 41.0)))
            .unwrap();
        assert_eq!(fc.ids().collect::<Vec<_>>(), [FeatureId(1), FeatureId(2)]);
        assert_eq!(s.get_count(&Filter::Include).unwrap(), 3);
    }

    #[test]
    fn residual_predicates_are_evaluated() {
        let s = store();
        let roads = Filter::And(vec![
            Filter::BBox(Region::new(-50.0, -50.0, 50.0, 50.0)),
            Filter::Property {
                name: "kind".into(),
                op: CompareOp::Equal,
                value: Value::from("road"),
            },
        ]);
        let fc = s.get_features(&roads).unwrap();
        assert_eq!(fc.ids().collect::<Vec<_>>(), [FeatureId(1), FeatureId(3)]);
        assert_eq!(
            s.get_bounds_of(&roads).unwrap(),
            Some(Region::new(-30.0, -30.0, 10.0, 10.0))
        );
    }

    #[test]
    fn insert_replace_and_remove() {
        let mut s = store();
        let moved = Feature::new(FeatureId(1), Region::new(90.0, 90.0, 95.0, 95.0));
        assert!(s.insert(moved).is_some());
        assert!(
            s.get_features(&Filter::BBox(Region::new(0.0, 0.0, 10.0, 10.0)))
                .unwrap()
                .is_empty()
        );
        assert!(s.remove(FeatureId(1)).is_some());
        assert!(s.remove(FeatureId(1)).is_none());
        assert_eq!(s.len(), 2);
        assert_eq!(
            s.get_bounds().unwrap(),
            Some(Region::new(-30.0, -30.0, 45.0, 45.0))
        );
        assert_eq!(MemoryStore::new().get_bounds().unwrap(), None);
    }

    #[test]
    fn clones_do_not_share_state() {
        let original = store();
        let mut copy = original.clone();
        copy.remove(FeatureId(2));
        copy.insert(Feature::new(FeatureId(4), Region::new(1.0, 1.0, 2.0, 2.0)));

        let near = Filter::BBox(Region::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(
            original.get_features(&near).unwrap().ids().collect::<Vec<_>>(),
            [FeatureId(1), FeatureId(2)]
        );
        assert_eq!(
            copy.get_features(&near).unwrap().ids().collect::<Vec<_>>(),
            [FeatureId(1), FeatureId(4)]
        );
        assert_eq!(original.len(), 3);
    }
}
