// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat vector index with linear scans. Small and simple; good for tiny sets.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::SpatialIndex;
use crate::types::Region;
use crate::visitor::{NodeRef, Visit, VisitScope, Visitor};

/// Flat vector index with linear scans.
///
/// The whole index is a single node whose bounds are the union of all
/// entries.
#[derive(Clone)]
pub struct FlatIndex<K> {
    entries: Vec<(K, Region)>,
}

impl<K> Default for FlatIndex<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K> Debug for FlatIndex<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlatIndex")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<K: Copy + PartialEq> FlatIndex<K> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn root(&self) -> Option<NodeRef> {
        let mut it = self.entries.iter().map(|(_, b)| *b);
        let first = it.next()?;
        Some(NodeRef {
            coord: (0, 0),
            bounds: it.fold(first, |acc, b| acc.combine(&b)),
            len: self.entries.len(),
        })
    }

    fn scan<V, P>(&self, region: Region, visitor: &mut V, matches: P)
    where
        V: Visitor<K>,
        P: Fn(&Region) -> bool,
    {
        let Some(root) = self.root() else {
            return;
        };
        if !root.bounds.intersects(&region) {
            return;
        }
        visitor.visit(Visit::Node(root));
        if visitor.scope() == VisitScope::NodesOnly {
            return;
        }
        for &(key, bounds) in &self.entries {
            if matches(&bounds) {
                visitor.visit(Visit::Data { key, bounds });
            }
        }
    }
}

impl<K: Copy + PartialEq> SpatialIndex<K> for FlatIndex<K> {
    fn insert(&mut self, key: K, bounds: Region) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = bounds;
        } else {
            self.entries.push((key, bounds));
        }
    }

    fn delete(&mut self, key: K, _bounds: Region) -> bool {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                self.entries.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    fn intersection_query<V: Visitor<K>>(&self, region: Region, visitor: &mut V) {
        self.scan(region, visitor, |b| b.intersects(&region));
    }

    fn containment_query<V: Visitor<K>>(&self, region: Region, visitor: &mut V) {
        self.scan(region, visitor, |b| region.contains(b));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
