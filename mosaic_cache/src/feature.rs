// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Features and feature collections.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use mosaic_index::Region;

/// Identifier of a feature, unique within its backing store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An attribute value. Opaque to the cache; only filters inspect it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Boolean attribute.
    Bool(bool),
    /// Integer attribute.
    Int(i64),
    /// Floating-point attribute.
    Float(f64),
    /// Text attribute.
    Text(String),
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            // Mixed int/float comparisons follow f64 semantics.
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

/// Named attribute values of a feature.
pub type Attributes = BTreeMap<String, Value>;

/// A geographic feature as seen by the cache: an id, a bounding region, and
/// attributes the cache never interprets.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    /// Store-unique identifier.
    pub id: FeatureId,
    /// Bounding region of the feature's geometry.
    pub bounds: Region,
    /// Attribute values.
    pub attributes: Attributes,
}

impl Feature {
    /// Create a feature without attributes.
    pub fn new(id: FeatureId, bounds: Region) -> Self {
        Self {
            id,
            bounds,
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute, builder style.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// An ordered collection of features, as returned by a query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Append a feature.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Iterate the features in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Iterate the feature ids in order.
    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.features.iter().map(|f| f.id)
    }

    /// Find a feature by id.
    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Whether a feature with this id is present.
    pub fn contains(&self, id: FeatureId) -> bool {
        self.get(id).is_some()
    }

    /// Combined bounds of all features, or `None` when empty.
    pub fn bounds(&self) -> Option<Region> {
        let mut it = self.features.iter().map(|f| f.bounds);
        let first = it.next()?;
        Some(it.fold(first, |acc, b| acc.combine(&b)))
    }

    /// Sort features by id.
    pub fn sort_by_id(&mut self) {
        self.features.sort_unstable_by_key(|f| f.id);
    }

    /// Consume the collection, returning the features.
    pub fn into_vec(self) -> Vec<Feature> {
        self.features
    }
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl Extend<Feature> for FeatureCollection {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        self.features.extend(iter);
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = alloc::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = core::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
