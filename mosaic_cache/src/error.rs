// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the cache.

use alloc::boxed::Box;
use core::error::Error as StdError;

use thiserror::Error;

/// Failure reported by a [`BackingStore`](crate::BackingStore).
///
/// Wraps whatever error the store implementation produced (I/O, protocol,
/// query rejection).
#[derive(Error, Debug)]
#[error("{0}")]
pub struct StoreError(#[source] Box<dyn StdError + Send + Sync>);

impl StoreError {
    /// Wrap a store failure.
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(err.into())
    }

    /// The underlying store error.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }
}

/// Cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store failed; no cache state was changed.
    #[error("backing store error: {0}")]
    BackingStore(#[from] StoreError),

    /// Admitting more features would exceed the configured limit.
    #[error("cache oversized: {requested} features requested, limit is {limit}")]
    CacheOversized {
        /// Configured maximum number of cached features.
        limit: usize,
        /// Number of features the cache would hold after the operation.
        requested: usize,
    },
}

/// A spatial predicate that cannot be reduced to a single bounding box.
///
/// This is a degradation, not a failure: the cache passes such predicates
/// through to the store without region tracking.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("spatial predicate `{0}` is not reducible to a bounding box")]
pub struct UnsupportedFilterShape(pub &'static str);

/// Result type for cache operations.
pub type Result<T> = core::result::Result<T, CacheError>;
