// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visitor types passed to [`SpatialIndex`](crate::SpatialIndex) queries.

use alloc::vec::Vec;

use crate::types::Region;

/// A traversed index node: a grid cell, or the single root of a flat index.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeRef {
    /// Integer grid coordinate of the node. Flat indexes report `(0, 0)`.
    pub coord: (i32, i32),
    /// Spatial extent covered by the node.
    pub bounds: Region,
    /// Number of data entries stored in the node.
    pub len: usize,
}

/// One step of an index traversal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Visit<K> {
    /// A node whose extent satisfies the query was entered.
    Node(NodeRef),
    /// A data entry satisfying the query.
    Data {
        /// Payload key of the entry.
        key: K,
        /// Bounds recorded for the entry.
        bounds: Region,
    },
}

/// Which traversal steps a visitor wants to receive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum VisitScope {
    /// Nodes and data entries.
    #[default]
    All,
    /// Only nodes. Indexes skip data entries entirely.
    NodesOnly,
}

/// Receiver for index traversal steps.
///
/// Any `FnMut(Visit<K>)` closure is a visitor with [`VisitScope::All`].
pub trait Visitor<K> {
    /// Scope of this visitor; defaults to [`VisitScope::All`].
    fn scope(&self) -> VisitScope {
        VisitScope::All
    }

    /// Receive one traversal step.
    fn visit(&mut self, visit: Visit<K>);
}

impl<K, F: FnMut(Visit<K>)> Visitor<K> for F {
    fn visit(&mut self, visit: Visit<K>) {
        self(visit);
    }
}

/// Visitor that collects the keys of visited data entries.
#[derive(Clone, Debug)]
pub struct CollectKeys<K> {
    /// Keys in visiting order.
    pub keys: Vec<K>,
}

impl<K> Default for CollectKeys<K> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<K> Visitor<K> for CollectKeys<K> {
    fn visit(&mut self, visit: Visit<K>) {
        if let Visit::Data { key, .. } = visit {
            self.keys.push(key);
        }
    }
}

/// Node-only visitor that records the nodes a query touches.
#[derive(Clone, Debug, Default)]
pub struct CollectNodes {
    /// Nodes in visiting order.
    pub nodes: Vec<NodeRef>,
}

impl<K> Visitor<K> for CollectNodes {
    fn scope(&self) -> VisitScope {
        VisitScope::NodesOnly
    }

    fn visit(&mut self, visit: Visit<K>) {
        debug_assert!(
            matches!(visit, Visit::Node(_)),
            "node-only visitor received a data entry"
        );
        if let Visit::Node(node) = visit {
            self.nodes.push(node);
        }
    }
}
