// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mosaic Index: 2D regions and a visitor-based spatial index.
//!
//! Mosaic Index is the substrate the Mosaic cache is built on.
//!
//! - [`Region`]: an axis-aligned bounding box with intersection, containment,
//!   combination, clipping and subtraction.
//! - [`SpatialIndex`]: insert, delete, intersection and containment queries over
//!   payload keys, reporting through a [`Visitor`].
//! - [`Visit`]: a traversal step, either a [`NodeRef`] or a data entry. Visitors
//!   declare a [`VisitScope`]; node-only visitors never see data.
//!
//! Two in-memory substrates are provided in [`backends`]: a flat vector
//! ([`FlatIndex`](backends::FlatIndex)) and, with the `backend_grid` feature, an
//! unbounded uniform grid ([`GridIndex`](backends::GridIndex)).
//!
//! ## Features
//!
//! - `backend_grid` *(default)*: enables the grid index backed by `hashbrown` and `smallvec`.
//! - `serde`: derives `Serialize`/`Deserialize` for [`Region`].
//! - `kurbo`: conversions between [`Region`] and `kurbo::Rect`.
//!
//! # Example
//!
//! ```rust
//! use mosaic_index::{Region, SpatialIndex, backends::FlatIndex};
//!
//! let mut idx = FlatIndex::new();
//! idx.insert(1_u32, Region::new(0.0, 0.0, 10.0, 10.0));
//! idx.insert(2_u32, Region::new(5.0, 5.0, 15.0, 15.0));
//!
//! let hits = idx.intersecting(Region::new(12.0, 12.0, 13.0, 13.0));
//! assert_eq!(hits, [2]);
//! ```
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for coordinates. Debug builds may assert.

#![no_std]

extern crate alloc;

mod backend;
pub mod backends;
mod types;
mod visitor;

pub use backend::SpatialIndex;
pub use types::Region;
pub use visitor::{CollectKeys, CollectNodes, NodeRef, Visit, VisitScope, Visitor};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn exercise<I: SpatialIndex<u32>>(mut idx: I) {
        idx.insert(1, Region::new(0.0, 0.0, 10.0, 10.0));
        idx.insert(2, Region::new(40.0, 40.0, 60.0, 60.0));
        idx.insert(3, Region::new(55.0, 55.0, 70.0, 70.0));

        let mut hits = idx.intersecting(Region::new(50.0, 50.0, 56.0, 56.0));
        hits.sort_unstable();
        assert_eq!(hits, [2, 3]);

        let mut inside = idx.contained(Region::new(0.0, 0.0, 65.0, 65.0));
        inside.sort_unstable();
        assert_eq!(inside, [1, 2]);

        assert!(idx.delete(2, Region::new(40.0, 40.0, 60.0, 60.0)));
        assert_eq!(idx.intersecting(Region::new(50.0, 50.0, 54.0, 54.0)), Vec::<u32>::new());
        assert_eq!(idx.len(), 2);

        idx.clear();
        assert!(idx.is_empty());
    }

    #[test]
    fn backends_agree() {
        exercise(backends::FlatIndex::new());
        #[cfg(feature = "backend_grid")]
        exercise(backends::GridIndex::new(16.0));
    }

    #[test]
    fn closures_are_visitors() {
        let mut idx = backends::FlatIndex::new();
        idx.insert(9_u32, Region::new(0.0, 0.0, 1.0, 1.0));
        let mut nodes = 0;
        let mut data = Vec::new();
        idx.intersection_query(Region::new(0.0, 0.0, 2.0, 2.0), &mut |v: Visit<u32>| match v {
            Visit::Node(_) => nodes += 1,
            Visit::Data { key, .. } => data.push(key),
        });
        assert_eq!(nodes, 1);
        assert_eq!(data, [9]);
    }
}
