// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid index for 2D regions.
//!
//! This index buckets keys into fixed-size grid cells and answers queries
//! by touching only the cells overlapping the query region. The grid is
//! unbounded: cells are created on first use and dropped when they empty.
//! It is intended for workloads with:
//! - moderately uniform spatial density (e.g., map features at one zoom level),
//! - dynamic updates, and
//! - query rectangles that are small compared to the full data extent.

use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::backend::SpatialIndex;
use crate::types::Region;
use crate::visitor::{NodeRef, Visit, VisitScope, Visitor};

/// Map a coordinate to a grid coordinate along one axis.
///
/// Rounds towards -∞ and saturates values outside the `i32` range.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Grid cell indices are intentionally i32; out-of-range values are saturated."
)]
#[inline]
pub fn cell_coord(value: f64, origin: f64, cell_size: f64) -> i32 {
    debug_assert!(cell_size > 0.0, "grid cell_size must be strictly positive");
    let t = (value - origin) / cell_size;
    let coord = t as i32;

    // Round towards -∞ (the cast above has already truncated).
    if t < 0.0 && f64::from(coord) > t {
        coord.saturating_sub(1)
    } else {
        coord
    }
}

/// Divisions per axis of the smallest square grid with at least `cells` cells.
///
/// Never less than one, so an empty request still yields a single cell.
#[inline]
pub const fn square_divisions(cells: usize) -> usize {
    let side = cells.isqrt();
    // `side * side <= cells`, so the product cannot overflow.
    let side = if side * side < cells { side + 1 } else { side };
    if side == 0 { 1 } else { side }
}

/// Uniform grid index with fixed cell size.
#[derive(Clone)]
pub struct GridIndex<K> {
    cell_size: f64,
    origin_x: f64,
    origin_y: f64,
    cells: HashMap<(i32, i32), Bucket<K>>,
    entries: HashMap<K, Entry>,
}

#[derive(Clone, Debug)]
struct Entry {
    bounds: Region,
    // Cells currently containing this key.
    cells: SmallVec<[(i32, i32); 4]>,
}

#[derive(Clone)]
struct Bucket<K> {
    keys: SmallVec<[K; 8]>,
}

impl<K> Default for Bucket<K> {
    fn default() -> Self {
        Self {
            keys: SmallVec::new(),
        }
    }
}

impl<K> Debug for GridIndex<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridIndex")
            .field("cell_size", &self.cell_size)
            .field("origin_x", &self.origin_x)
            .field("origin_y", &self.origin_y)
            .field("entries", &self.entries.len())
            .field("cells", &self.cells.len())
            .finish_non_exhaustive()
    }
}

impl<K: Copy + Eq + Hash> GridIndex<K> {
    /// Create a new grid index with the given cell size and origin at (0, 0).
    pub fn new(cell_size: f64) -> Self {
        Self::with_origin(cell_size, 0.0, 0.0)
    }

    /// Create a new grid index with the given cell size and origin.
    pub fn with_origin(cell_size: f64, origin_x: f64, origin_y: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell_size must be strictly positive");
        Self {
            cell_size,
            origin_x,
            origin_y,
            cells: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    /// Size of one grid cell along each axis.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Bounds recorded for `key`, if present.
    pub fn bounds_of(&self, key: K) -> Option<Region> {
        self.entries.get(&key).map(|e| e.bounds)
    }

    fn cell_bounds(&self, (ix, iy): (i32, i32)) -> Region {
        let x0 = self.origin_x + f64::from(ix) * self.cell_size;
        let y0 = self.origin_y + f64::from(iy) * self.cell_size;
        Region::new(x0, y0, x0 + self.cell_size, y0 + self.cell_size)
    }

    fn remove_from_cells(&mut self, key: K, cells: &[(i32, i32)]) {
        for &coord in cells {
            let bucket = self
                .cells
                .get_mut(&coord)
                .expect("grid invariant violated: missing cell while removing key");

            let pos = bucket
                .keys
                .iter()
                .position(|&k| k == key)
                .expect("grid invariant violated: key not found in expected cell");
            bucket.keys.swap_remove(pos);

            if bucket.keys.is_empty() {
                // Dropping empty cells keeps the map compact for sparse grids.
                self.cells.remove(&coord);
            }
        }
    }

    fn cell_range(&self, min: f64, max: f64, origin: f64) -> (i32, i32) {
        let c0 = cell_coord(min, origin, self.cell_size);
        let c1 = cell_coord(max, origin, self.cell_size);
        if c0 <= c1 { (c0, c1) } else { (c1, c0) }
    }

    fn covered_cells(&self, r: &Region) -> SmallVec<[(i32, i32); 4]> {
        let (ix0, ix1) = self.cell_range(r.min_x, r.max_x, self.origin_x);
        let (iy0, iy1) = self.cell_range(r.min_y, r.max_y, self.origin_y);
        let mut out: SmallVec<[(i32, i32); 4]> = SmallVec::new();
        for ix in ix0..=ix1 {
            for iy in iy0..=iy1 {
                out.push((ix, iy));
            }
        }
        out
    }

    fn query<V, P>(&self, region: Region, visitor: &mut V, matches: P)
    where
        V: Visitor<K>,
        P: Fn(&Region) -> bool,
    {
        let (ix0, ix1) = self.cell_range(region.min_x, region.max_x, self.origin_x);
        let (iy0, iy1) = self.cell_range(region.min_y, region.max_y, self.origin_y);
        let nodes_only = visitor.scope() == VisitScope::NodesOnly;

        let mut seen: HashSet<K> = HashSet::new();

        for ix in ix0..=ix1 {
            for iy in iy0..=iy1 {
                let Some(bucket) = self.cells.get(&(ix, iy)) else {
                    continue;
                };
                visitor.visit(Visit::Node(NodeRef {
                    coord: (ix, iy),
                    bounds: self.cell_bounds((ix, iy)),
                    len: bucket.keys.len(),
                }));
                if nodes_only {
                    continue;
                }
                for &key in &bucket.keys {
                    if !seen.insert(key) {
                        continue;
                    }
                    let bounds = self.entries[&key].bounds;
                    if matches(&bounds) {
                        visitor.visit(Visit::Data { key, bounds });
                    }
                }
            }
        }
    }
}

impl<K: Copy + Eq + Hash> SpatialIndex<K> for GridIndex<K> {
    fn insert(&mut self, key: K, bounds: Region) {
        // If this key was previously present, clean up its old cell memberships.
        if let Some(old) = self.entries.remove(&key) {
            if old.bounds == bounds {
                self.entries.insert(key, old);
                return;
            }
            self.remove_from_cells(key, &old.cells);
        }

        let cells = self.covered_cells(&bounds);
        for &coord in &cells {
            self.cells.entry(coord).or_default().keys.push(key);
        }
        self.entries.insert(key, Entry { bounds, cells });
    }

    fn delete(&mut self, key: K, _bounds: Region) -> bool {
        match self.entries.remove(&key) {
            Some(entry) => {
                self.remove_from_cells(key, &entry.cells);
                true
            }
            None => false,
        }
    }

    fn intersection_query<V: Visitor<K>>(&self, region: Region, visitor: &mut V) {
        self.query(region, visitor, |b| b.intersects(&region));
    }

    fn containment_query<V: Visitor<K>>(&self, region: Region, visitor: &mut V) {
        self.query(region, visitor, |b| region.contains(b));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }
}
