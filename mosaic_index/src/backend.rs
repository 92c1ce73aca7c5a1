// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The spatial index abstraction.

use alloc::vec::Vec;

use crate::types::Region;
use crate::visitor::{CollectKeys, Visitor};

/// Associative structure mapping payload keys to the regions they occupy.
///
/// Queries report through a [`Visitor`]: nodes whose extent satisfies the
/// query first, then the matching data entries of that node. Visitors with
/// [`VisitScope::NodesOnly`](crate::VisitScope::NodesOnly) never receive data.
/// Each matching key is reported once per query even when an implementation
/// stores it in several nodes.
pub trait SpatialIndex<K: Copy> {
    /// Record `key` as occupying `bounds`. Re-inserting a key replaces its bounds.
    fn insert(&mut self, key: K, bounds: Region);

    /// Remove `key`, using `bounds` to locate it. Returns whether it was present.
    fn delete(&mut self, key: K, bounds: Region) -> bool;

    /// Visit entries whose bounds intersect `region`.
    fn intersection_query<V: Visitor<K>>(&self, region: Region, visitor: &mut V);

    /// Visit entries whose bounds are fully contained in `region`.
    fn containment_query<V: Visitor<K>>(&self, region: Region, visitor: &mut V);

    /// Number of distinct keys stored.
    fn len(&self) -> usize;

    /// Whether no keys are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every key.
    fn clear(&mut self);

    /// Keys whose bounds intersect `region`.
    ///
    /// The default implementation collects [`intersection_query`][Self::intersection_query].
    fn intersecting(&self, region: Region) -> Vec<K> {
        let mut collect = CollectKeys::default();
        self.intersection_query(region, &mut collect);
        collect.keys
    }

    /// Keys whose bounds are fully contained in `region`.
    ///
    /// The default implementation collects [`containment_query`][Self::containment_query].
    fn contained(&self, region: Region) -> Vec<K> {
        let mut collect = CollectKeys::default();
        self.containment_query(region, &mut collect);
        collect.keys
    }
}
