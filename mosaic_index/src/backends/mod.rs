// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory implementations of [`SpatialIndex`](crate::SpatialIndex).
//!
//! - `flatvec`: flat vector with linear scans (small, simple).
//! - `grid` (feature `backend_grid`): unbounded uniform grid with configurable cell size.

pub(crate) mod flatvec;
#[cfg(feature = "backend_grid")]
pub(crate) mod grid;

pub use flatvec::FlatIndex;
#[cfg(feature = "backend_grid")]
pub use grid::{GridIndex, cell_coord, square_divisions};
