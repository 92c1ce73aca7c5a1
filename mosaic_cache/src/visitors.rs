// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell visitors that flip completeness.
//!
//! Validation and invalidation are deliberately asymmetric: a cell only
//! becomes complete when a fetch covered all of it, but any overlap with an
//! invalidated region makes it incomplete.

use alloc::vec::Vec;

use hashbrown::HashSet;
use mosaic_index::Region;

use crate::cell::Cell;
use crate::feature::FeatureId;

/// Receiver for mutable cell traversal, see [`ValidityTree::traverse`](crate::ValidityTree).
pub(crate) trait CellVisitor {
    fn visit_cell(&mut self, cell: &mut Cell);
}

/// Marks cells fully contained in a fetched region as complete.
#[derive(Debug)]
pub(crate) struct TileValidator {
    region: Region,
    pub(crate) flipped: usize,
}

impl TileValidator {
    pub(crate) fn new(region: Region) -> Self {
        Self { region, flipped: 0 }
    }
}

impl CellVisitor for TileValidator {
    fn visit_cell(&mut self, cell: &mut Cell) {
        // Partial overlap proves nothing about the part of the cell outside the fetch.
        if !self.region.contains(&cell.bounds()) {
            return;
        }
        if cell.set_complete(true) {
            log::trace!("cell {:?} complete", cell.coord());
            self.flipped += 1;
        }
    }
}

/// Marks every cell touching a region incomplete and evicts its payload keys.
#[derive(Debug)]
pub(crate) struct TileInvalidator {
    region: Region,
    pub(crate) flipped: usize,
    pub(crate) evicted: HashSet<FeatureId>,
}

impl TileInvalidator {
    pub(crate) fn new(region: Region) -> Self {
        Self {
            region,
            flipped: 0,
            evicted: HashSet::new(),
        }
    }

    pub(crate) fn into_evicted(self) -> Vec<FeatureId> {
        let mut keys: Vec<_> = self.evicted.into_iter().collect();
        keys.sort_unstable();
        keys
    }
}

impl CellVisitor for TileInvalidator {
    fn visit_cell(&mut self, cell: &mut Cell) {
        if !self.region.intersects(&cell.bounds()) {
            return;
        }
        if cell.set_complete(false) {
            log::trace!("cell {:?} invalidated", cell.coord());
            self.flipped += 1;
        }
        self.evicted.extend(cell.drain_keys());
    }
}
