// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One partition unit of a [`ValidityTree`](crate::ValidityTree).

use hashbrown::HashSet;
use mosaic_index::{NodeRef, Region};

use crate::feature::FeatureId;

/// A cell of the validity partition.
///
/// A cell is *complete* when the cache can prove it holds every store feature
/// intersecting [`bounds`](Self::bounds). Cells are created with the tree and
/// only go away when the tree is flushed.
#[derive(Clone, Debug)]
pub struct Cell {
    coord: (usize, usize),
    bounds: Region,
    complete: bool,
    payload_keys: HashSet<FeatureId>,
}

impl Cell {
    pub(crate) fn new(coord: (usize, usize), bounds: Region) -> Self {
        Self {
            coord,
            bounds,
            complete: false,
            payload_keys: HashSet::new(),
        }
    }

    /// Grid coordinate `(column, row)` of the cell.
    pub fn coord(&self) -> (usize, usize) {
        self.coord
    }

    /// Fixed extent of the cell.
    pub fn bounds(&self) -> Region {
        self.bounds
    }

    /// Whether the cell is known to hold every store feature it overlaps.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Keys of cached features overlapping the cell.
    pub fn payload_keys(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.payload_keys.iter().copied()
    }

    /// Number of cached features overlapping the cell.
    pub fn len(&self) -> usize {
        self.payload_keys.len()
    }

    /// Whether no cached feature overlaps the cell.
    pub fn is_empty(&self) -> bool {
        self.payload_keys.is_empty()
    }

    /// Whether the cell lists `key`.
    pub fn contains_key(&self, key: FeatureId) -> bool {
        self.payload_keys.contains(&key)
    }

    /// Set the completeness flag. Returns whether it changed.
    pub(crate) fn set_complete(&mut self, complete: bool) -> bool {
        let changed = self.complete != complete;
        self.complete = complete;
        changed
    }

    pub(crate) fn insert_key(&mut self, key: FeatureId) -> bool {
        self.payload_keys.insert(key)
    }

    pub(crate) fn remove_key(&mut self, key: FeatureId) -> bool {
        self.payload_keys.remove(&key)
    }

    pub(crate) fn drain_keys(&mut self) -> hashbrown::hash_set::Drain<'_, FeatureId> {
        self.payload_keys.drain()
    }

    pub(crate) fn node_ref(&self) -> NodeRef {
        let (x, y) = self.coord;
        NodeRef {
            coord: (
                i32::try_from(x).unwrap_or(i32::MAX),
                i32::try_from(y).unwrap_or(i32::MAX),
            ),
            bounds: self.bounds,
            len: self.payload_keys.len(),
        }
    }
}
