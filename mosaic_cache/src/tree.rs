// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The validity tree: a fixed grid partition of the universe with per-cell
//! completeness flags and payload keys.

use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use mosaic_index::backends::{cell_coord, square_divisions};
use mosaic_index::{Region, SpatialIndex, Visit, VisitScope, Visitor};

use crate::cell::Cell;
use crate::feature::FeatureId;
use crate::visitors::{CellVisitor, TileInvalidator, TileValidator};

/// Counters accumulated by a [`ValidityTree`] since construction or the last flush.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Payload keys inserted.
    pub inserts: u64,
    /// Payload keys deleted (explicitly or by eviction).
    pub deletes: u64,
    /// Cell transitions from incomplete to complete.
    pub validated_cells: u64,
    /// Cell transitions from complete to incomplete.
    pub invalidated_cells: u64,
}

/// Result of scanning a query region for incomplete cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MissingScan {
    /// Full bounds of every incomplete cell overlapping the query.
    pub tiles: Vec<Region>,
    /// Whether at least one overlapping cell was complete.
    pub found_valid: bool,
}

impl MissingScan {
    /// Collapse the tiles into one region when nothing in the scanned area is cached.
    ///
    /// With several missing tiles and no valid one, keeping them apart gains
    /// nothing, so they are replaced by their combined bounds.
    pub fn reduce(self) -> Vec<Region> {
        if self.tiles.len() > 1 && !self.found_valid {
            self.tiles
                .into_iter()
                .reduce(|acc, r| acc.combine(&r))
                .into_iter()
                .collect()
        } else {
            self.tiles
        }
    }
}

/// Inclusive range of grid coordinates touched by a region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct CellSpan {
    ix0: usize,
    ix1: usize,
    iy0: usize,
    iy1: usize,
}

/// Fixed-capacity spatial partition of a universe region.
///
/// The universe is cut into a regular grid of cells. Each cell carries a
/// completeness flag and the keys of cached features overlapping it. The
/// tree is also a [`SpatialIndex`] over those keys, with cells as its nodes.
///
/// ```
/// use mosaic_cache::ValidityTree;
/// use mosaic_index::Region;
///
/// let mut tree = ValidityTree::new(Region::new(0.0, 0.0, 100.0, 100.0), 4);
/// let query = Region::new(0.0, 0.0, 40.0, 40.0);
/// assert_eq!(tree.find_missing_regions(query), [Region::new(0.0, 0.0, 50.0, 50.0)]);
///
/// tree.validate(Region::new(0.0, 0.0, 50.0, 50.0));
/// assert!(tree.find_missing_regions(query).is_empty());
/// ```
#[derive(Clone)]
pub struct ValidityTree {
    universe: Region,
    capacity: usize,
    divisions: usize,
    cell_w: f64,
    cell_h: f64,
    /// Row-major: `iy * divisions + ix`.
    cells: Vec<Cell>,
    entries: HashMap<FeatureId, Region>,
    complete_cells: usize,
    stats: TreeStats,
}

impl Debug for ValidityTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ValidityTree")
            .field("universe", &self.universe)
            .field("divisions", &self.divisions)
            .field("cells", &self.cells.len())
            .field("complete_cells", &self.complete_cells)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ValidityTree {
    /// Partition `universe` into a regular grid of roughly `capacity` cells.
    ///
    /// Each axis gets `ceil(sqrt(capacity))` divisions, so the actual cell
    /// count is the smallest square not below `capacity` (at least one).
    pub fn new(universe: Region, capacity: usize) -> Self {
        debug_assert!(
            universe.min_x <= universe.max_x && universe.min_y <= universe.max_y,
            "universe corners are inverted"
        );
        let divisions = square_divisions(capacity);
        let mut tree = Self {
            universe,
            capacity,
            divisions,
            cell_w: universe.width() / divisions as f64,
            cell_h: universe.height() / divisions as f64,
            cells: Vec::new(),
            entries: HashMap::new(),
            complete_cells: 0,
            stats: TreeStats::default(),
        };
        tree.build_cells();
        tree
    }

    fn build_cells(&mut self) {
        let n = self.divisions;
        let mut cells = Vec::with_capacity(n * n);
        for iy in 0..n {
            for ix in 0..n {
                cells.push(Cell::new((ix, iy), self.cell_bounds(ix, iy)));
            }
        }
        self.cells = cells;
    }

    fn cell_bounds(&self, ix: usize, iy: usize) -> Region {
        let u = &self.universe;
        let last = self.divisions - 1;
        // The last row and column end exactly on the universe edge.
        let x0 = u.min_x + ix as f64 * self.cell_w;
        let y0 = u.min_y + iy as f64 * self.cell_h;
        let x1 = if ix == last {
            u.max_x
        } else {
            u.min_x + (ix + 1) as f64 * self.cell_w
        };
        let y1 = if iy == last {
            u.max_y
        } else {
            u.min_y + (iy + 1) as f64 * self.cell_h
        };
        Region::new(x0, y0, x1, y1)
    }

    /// The tracked universe.
    pub fn universe(&self) -> Region {
        self.universe
    }

    /// Capacity hint given at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of divisions along each axis.
    pub fn divisions(&self) -> usize {
        self.divisions
    }

    /// Number of cells in the partition.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells currently complete.
    pub fn complete_cells(&self) -> usize {
        self.complete_cells
    }

    /// Whether every cell of the universe is complete.
    pub fn is_fully_complete(&self) -> bool {
        self.complete_cells == self.cells.len()
    }

    /// Counters since construction or the last flush.
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    /// Cell at grid coordinate `(column, row)`.
    pub fn cell(&self, ix: usize, iy: usize) -> Option<&Cell> {
        if ix >= self.divisions || iy >= self.divisions {
            return None;
        }
        self.cells.get(iy * self.divisions + ix)
    }

    /// Bounds recorded for a payload key.
    pub fn bounds_of(&self, key: FeatureId) -> Option<Region> {
        self.entries.get(&key).copied()
    }

    /// Whether the payload key is recorded.
    pub fn contains_key(&self, key: FeatureId) -> bool {
        self.entries.contains_key(&key)
    }

    fn axis_range(&self, min: f64, max: f64, origin: f64, size: f64) -> (usize, usize) {
        let last = self.divisions - 1;
        if size <= 0.0 {
            return (0, last);
        }
        let to_index = |coord: i32| usize::try_from(coord.max(0)).unwrap_or(0).min(last);
        // Widen by one cell on each side; boundary cells are re-checked
        // against their exact bounds.
        let c0 = to_index(cell_coord(min, origin, size)).saturating_sub(1);
        let c1 = (to_index(cell_coord(max, origin, size)) + 1).min(last);
        (c0, c1)
    }

    fn span(&self, region: &Region) -> Option<CellSpan> {
        let clipped = region.clip(&self.universe)?;
        let u = &self.universe;
        let (ix0, ix1) = self.axis_range(clipped.min_x, clipped.max_x, u.min_x, self.cell_w);
        let (iy0, iy1) = self.axis_range(clipped.min_y, clipped.max_y, u.min_y, self.cell_h);
        Some(CellSpan { ix0, ix1, iy0, iy1 })
    }

    /// Indices of cells whose bounds intersect `region`.
    fn overlapping_indices(&self, region: Region) -> Vec<usize> {
        self.cells_overlapping(region)
            .map(|c| {
                let (ix, iy) = c.coord();
                iy * self.divisions + ix
            })
            .collect()
    }

    /// Cells whose bounds intersect `region`, enumerated by grid coordinate.
    ///
    /// The iterator is lazy and finite; clone it to restart the enumeration.
    pub fn cells_overlapping(&self, region: Region) -> CellsOverlapping<'_> {
        let span = self.span(&region);
        CellsOverlapping {
            tree: self,
            region,
            span,
            next: span.map(|s| (s.ix0, s.iy0)),
        }
    }

    /// Scan `query` for incomplete cells without collapsing the result.
    pub fn scan_missing(&self, query: Region) -> MissingScan {
        let mut scan = MissingScan::default();
        if self.is_fully_complete() {
            scan.found_valid = self.span(&query).is_some();
            return scan;
        }
        for cell in self.cells_overlapping(query) {
            if cell.is_complete() {
                scan.found_valid = true;
            } else {
                scan.tiles.push(cell.bounds());
            }
        }
        scan
    }

    /// Regions that must be fetched before `query` can be answered from cache.
    ///
    /// Each incomplete cell contributes its full bounds, not just the queried
    /// part, so that fetching it proves the whole cell complete. When several
    /// cells are missing and none overlapping the query is complete, they are
    /// collapsed into their combined bounds.
    pub fn find_missing_regions(&self, query: Region) -> Vec<Region> {
        self.scan_missing(query).reduce()
    }

    /// Whether every cell overlapping `region` is complete.
    ///
    /// Regions extending past the universe are never complete.
    pub fn is_complete(&self, region: Region) -> bool {
        self.universe.contains(&region) && self.cells_overlapping(region).all(Cell::is_complete)
    }

    pub(crate) fn traverse<V: CellVisitor>(&mut self, region: Region, visitor: &mut V) {
        for idx in self.overlapping_indices(region) {
            visitor.visit_cell(&mut self.cells[idx]);
        }
    }

    /// Mark every cell fully contained in `region` complete.
    ///
    /// Cells that `region` only partially covers are left as they are.
    /// Returns the number of cells that became complete.
    pub fn validate(&mut self, region: Region) -> usize {
        let mut validator = TileValidator::new(region);
        self.traverse(region, &mut validator);
        self.complete_cells += validator.flipped;
        self.stats.validated_cells += validator.flipped as u64;
        debug_assert!(
            self.complete_cells <= self.cells.len(),
            "more complete cells than cells"
        );
        validator.flipped
    }

    /// Mark every cell intersecting `region` incomplete and evict its payload.
    ///
    /// Evicted keys are removed from every cell that listed them, not just
    /// the invalidated ones, and are returned sorted so the owner can drop
    /// the corresponding features.
    pub fn invalidate(&mut self, region: Region) -> Vec<FeatureId> {
        let mut invalidator = TileInvalidator::new(region);
        self.traverse(region, &mut invalidator);
        self.complete_cells -= invalidator.flipped;
        self.stats.invalidated_cells += invalidator.flipped as u64;
        let evicted = invalidator.into_evicted();
        for &key in &evicted {
            self.delete_entry(key);
        }
        evicted
    }

    /// Discard all cells and payloads and rebuild a fresh partition.
    pub fn flush(&mut self) {
        self.build_cells();
        self.entries.clear();
        self.complete_cells = 0;
        self.stats = TreeStats::default();
    }

    fn delete_entry(&mut self, key: FeatureId) -> bool {
        let Some(bounds) = self.entries.remove(&key) else {
            return false;
        };
        for idx in self.overlapping_indices(bounds) {
            self.cells[idx].remove_key(key);
        }
        self.stats.deletes += 1;
        true
    }

    fn query<V, P>(&self, region: Region, visitor: &mut V, matches: P)
    where
        V: Visitor<FeatureId>,
        P: Fn(&Region) -> bool,
    {
        let nodes_only = visitor.scope() == VisitScope::NodesOnly;
        let mut seen: HashSet<FeatureId> = HashSet::new();
        for cell in self.cells_overlapping(region) {
            visitor.visit(Visit::Node(cell.node_ref()));
            if nodes_only {
                continue;
            }
            for key in cell.payload_keys() {
                if !seen.insert(key) {
                    continue;
                }
                debug_assert!(
                    self.entries.contains_key(&key),
                    "cell lists unrecorded key {key}"
                );
                let Some(&bounds) = self.entries.get(&key) else {
                    continue;
                };
                if matches(&bounds) {
                    visitor.visit(Visit::Data { key, bounds });
                }
            }
        }
    }
}

impl SpatialIndex<FeatureId> for ValidityTree {
    /// Record `key` in every cell its bounds overlap.
    ///
    /// Bounds outside the universe are recorded without cell membership.
    fn insert(&mut self, key: FeatureId, bounds: Region) {
        if let Some(old) = self.entries.get(&key).copied() {
            if old == bounds {
                return;
            }
            self.delete_entry(key);
        }
        for idx in self.overlapping_indices(bounds) {
            self.cells[idx].insert_key(key);
        }
        self.entries.insert(key, bounds);
        self.stats.inserts += 1;
    }

    fn delete(&mut self, key: FeatureId, _bounds: Region) -> bool {
        self.delete_entry(key)
    }

    fn intersection_query<V: Visitor<FeatureId>>(&self, region: Region, visitor: &mut V) {
        self.query(region, visitor, |b| b.intersects(&region));
    }

    fn containment_query<V: Visitor<FeatureId>>(&self, region: Region, visitor: &mut V) {
        self.query(region, visitor, |b| region.contains(b));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove every payload key. Completeness flags are kept.
    fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.drain_keys();
        }
        self.entries.clear();
    }
}

/// Lazy iterator over the cells overlapping a region, in row-major order.
///
/// Created by [`ValidityTree::cells_overlapping`].
#[derive(Clone, Debug)]
pub struct CellsOverlapping<'a> {
    tree: &'a ValidityTree,
    region: Region,
    span: Option<CellSpan>,
    next: Option<(usize, usize)>,
}

impl<'a> Iterator for CellsOverlapping<'a> {
    type Item = &'a Cell;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.span?;
        while let Some((ix, iy)) = self.next {
            self.next = if ix < span.ix1 {
                Some((ix + 1, iy))
            } else if iy < span.iy1 {
                Some((span.ix0, iy + 1))
            } else {
                None
            };
            let cell = &self.tree.cells[iy * self.tree.divisions + ix];
            if cell.bounds().intersects(&self.region) {
                return Some(cell);
            }
        }
        None
    }
}

impl core::iter::FusedIterator for CellsOverlapping<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use mosaic_index::CollectNodes;

    fn universe() -> Region {
        Region::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn partitions_universe_exactly() {
        let tree = ValidityTree::new(universe(), 10);
        assert_eq!(tree.divisions(), 4);
        assert_eq!(tree.cell_count(), 16);
        let area: f64 = tree.cells.iter().map(|c| c.bounds().area()).sum();
        assert!((area - universe().area()).abs() < 1e-9);
        assert_eq!(tree.cell(3, 3).unwrap().bounds().max_x, 100.0);
        assert!(tree.cell(4, 0).is_none());
        assert!(tree.cells.iter().all(|c| !c.is_complete() && c.is_empty()));
    }

    #[test]
    fn cells_overlapping_is_restartable() {
        let tree = ValidityTree::new(universe(), 4);
        let it = tree.cells_overlapping(Region::new(10.0, 10.0, 60.0, 20.0));
        let first: Vec<_> = it.clone().map(Cell::coord).collect();
        let again: Vec<_> = it.map(Cell::coord).collect();
        assert_eq!(first, vec![(0, 0), (1, 0)]);
        assert_eq!(first, again);

        // Shared edges count as overlap.
        let edge: Vec<_> = tree
            .cells_overlapping(Region::new(50.0, 10.0, 50.0, 20.0))
            .map(Cell::coord)
            .collect();
        assert_eq!(edge, vec![(0, 0), (1, 0)]);

        assert_eq!(
            tree.cells_overlapping(Region::new(200.0, 200.0, 300.0, 300.0))
                .count(),
            0
        );
    }

    #[test]
    fn missing_regions_use_whole_cells() {
        let tree = ValidityTree::new(universe(), 4);
        let missing = tree.find_missing_regions(Region::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(missing, vec![Region::new(0.0, 0.0, 50.0, 50.0)]);
    }

    #[test]
    fn uniformly_missing_area_collapses() {
        let tree = ValidityTree::new(universe(), 4);
        let missing = tree.find_missing_regions(Region::new(10.0, 10.0, 60.0, 20.0));
        assert_eq!(missing, vec![Region::new(0.0, 0.0, 100.0, 50.0)]);
    }

    #[test]
    fn partially_cached_area_stays_split() {
        let mut tree = ValidityTree::new(universe(), 9);
        // Validate the top-left cell of a 3x3 grid.
        let third = 100.0 / 3.0;
        tree.validate(Region::new(0.0, 0.0, third, third));
        let scan = tree.scan_missing(Region::new(10.0, 10.0, 90.0, 20.0));
        assert!(scan.found_valid);
        assert_eq!(scan.tiles.len(), 2);
        assert_eq!(scan.clone().reduce(), scan.tiles);
    }

    #[test]
    fn fully_complete_fast_path() {
        let mut tree = ValidityTree::new(universe(), 4);
        assert_eq!(tree.validate(universe()), 4);
        assert!(tree.is_fully_complete());
        assert!(tree.find_missing_regions(universe()).is_empty());
        assert!(tree.is_complete(Region::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!tree.is_complete(Region::new(-1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn validate_and_invalidate_are_asymmetric() {
        let mut tree = ValidityTree::new(universe(), 4);
        let partial = Region::new(0.0, 0.0, 40.0, 40.0);

        assert_eq!(tree.validate(partial), 0);
        assert!(!tree.cell(0, 0).unwrap().is_complete());

        tree.validate(Region::new(0.0, 0.0, 50.0, 50.0));
        assert!(tree.cell(0, 0).unwrap().is_complete());

        tree.invalidate(partial);
        assert!(!tree.cell(0, 0).unwrap().is_complete());
        assert_eq!(tree.complete_cells(), 0);
        assert_eq!(tree.stats().validated_cells, 1);
        assert_eq!(tree.stats().invalidated_cells, 1);
    }

    #[test]
    fn invalidate_evicts_keys_from_all_their_cells() {
        let mut tree = ValidityTree::new(universe(), 4);
        tree.validate(universe());
        // Spans the two bottom cells.
        tree.insert(FeatureId(1), Region::new(40.0, 10.0, 60.0, 20.0));
        tree.insert(FeatureId(2), Region::new(70.0, 70.0, 80.0, 80.0));
        assert!(tree.cell(0, 0).unwrap().contains_key(FeatureId(1)));
        assert!(tree.cell(1, 0).unwrap().contains_key(FeatureId(1)));

        let evicted = tree.invalidate(Region::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(evicted, vec![FeatureId(1)]);
        assert!(!tree.cell(0, 0).unwrap().is_complete());
        assert!(tree.cell(1, 0).unwrap().is_complete());
        assert!(!tree.cell(1, 0).unwrap().contains_key(FeatureId(1)));
        assert!(!tree.contains_key(FeatureId(1)));
        assert!(tree.contains_key(FeatureId(2)));
    }

    #[test]
    fn spatial_index_queries() {
        let mut tree = ValidityTree::new(universe(), 4);
        tree.insert(FeatureId(1), Region::new(10.0, 10.0, 20.0, 20.0));
        tree.insert(FeatureId(2), Region::new(30.0, 30.0, 70.0, 70.0));
        tree.insert(FeatureId(3), Region::new(150.0, 150.0, 160.0, 160.0));
        assert_eq!(tree.len(), 3);

        let mut hits = tree.intersecting(Region::new(0.0, 0.0, 50.0, 50.0));
        hits.sort_unstable();
        assert_eq!(hits, vec![FeatureId(1), FeatureId(2)]);
        assert_eq!(
            tree.contained(Region::new(0.0, 0.0, 50.0, 50.0)),
            vec![FeatureId(1)]
        );

        let mut nodes = CollectNodes::default();
        tree.intersection_query(Region::new(60.0, 60.0, 65.0, 65.0), &mut nodes);
        assert_eq!(nodes.nodes.len(), 1);
        assert_eq!(nodes.nodes[0].coord, (1, 1));
        assert_eq!(nodes.nodes[0].len, 1);

        // Moving a key drops it from its old cells.
        tree.insert(FeatureId(1), Region::new(80.0, 80.0, 90.0, 90.0));
        assert!(!tree.cell(0, 0).unwrap().contains_key(FeatureId(1)));
        assert!(tree.cell(1, 1).unwrap().contains_key(FeatureId(1)));

        assert!(tree.delete(FeatureId(2), Region::new(30.0, 30.0, 70.0, 70.0)));
        assert!(tree.cells.iter().all(|c| !c.contains_key(FeatureId(2))));
    }

    #[test]
    fn flush_resets_everything() {
        let mut tree = ValidityTree::new(universe(), 4);
        tree.validate(universe());
        tree.insert(FeatureId(1), Region::new(10.0, 10.0, 20.0, 20.0));
        tree.flush();
        assert_eq!(tree.complete_cells(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.stats(), TreeStats::default());
        assert_eq!(tree.find_missing_regions(universe()), vec![universe()]);
    }
}
