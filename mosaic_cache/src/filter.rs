// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query filters, and splitting them into a tracked region plus the rest.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

use mosaic_index::Region;

use crate::error::UnsupportedFilterShape;
use crate::feature::{Feature, FeatureId, Value};

/// Comparison applied by [`Filter::Property`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// Attribute equals the value.
    Equal,
    /// Attribute differs from the value (or is absent).
    NotEqual,
    /// Attribute is less than the value.
    Less,
    /// Attribute is greater than the value.
    Greater,
}

/// A predicate over features, understood by both the cache and the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Matches every feature.
    Include,
    /// Matches no feature.
    Exclude,
    /// Features whose bounds intersect the region.
    BBox(Region),
    /// Features whose bounds come within `distance` of a point.
    WithinDistance {
        /// Point x.
        x: f64,
        /// Point y.
        y: f64,
        /// Maximum distance.
        distance: f64,
    },
    /// Features with one of these ids.
    Id(BTreeSet<FeatureId>),
    /// Features whose named attribute compares to `value`.
    Property {
        /// Attribute name.
        name: String,
        /// Comparison.
        op: CompareOp,
        /// Value to compare against.
        value: Value,
    },
    /// All children match.
    And(Vec<Filter>),
    /// Any child matches.
    Or(Vec<Filter>),
    /// The child does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// Evaluate the filter against a feature.
    pub fn evaluate(&self, feature: &Feature) -> bool {
        match self {
            Self::Include => true,
            Self::Exclude => false,
            Self::BBox(region) => feature.bounds.intersects(region),
            Self::WithinDistance { x, y, distance } => {
                feature.bounds.distance_squared_to_point(*x, *y) <= distance * distance
            }
            Self::Id(ids) => ids.contains(&feature.id),
            Self::Property { name, op, value } => {
                let attr = feature.attribute(name);
                match op {
                    CompareOp::Equal => attr == Some(value),
                    CompareOp::NotEqual => attr != Some(value),
                    CompareOp::Less => attr.is_some_and(|a| a < value),
                    CompareOp::Greater => attr.is_some_and(|a| a > value),
                }
            }
            Self::And(children) => children.iter().all(|c| c.evaluate(feature)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(feature)),
            Self::Not(child) => !child.evaluate(feature),
        }
    }

    /// Classify this predicate as a bounding-box restriction.
    ///
    /// Returns `Ok(Some(region))` for a bounding box, `Ok(None)` for a
    /// predicate with no spatial component, and an error for spatial
    /// predicates that no single bounding box expresses exactly.
    pub fn bounding_predicate(&self) -> Result<Option<Region>, UnsupportedFilterShape> {
        match self {
            Self::BBox(region) => Ok(Some(*region)),
            Self::Include | Self::Exclude | Self::Id(_) | Self::Property { .. } => Ok(None),
            Self::WithinDistance { .. } => Err(UnsupportedFilterShape("within-distance")),
            Self::And(children) => {
                if children.iter().any(|c| c.bounding_predicate().is_err()) {
                    Err(UnsupportedFilterShape("and"))
                } else {
                    Ok(None)
                }
            }
            Self::Or(children) => {
                if children.iter().all(|c| matches!(c.bounding_predicate(), Ok(None))) {
                    Ok(None)
                } else {
                    Err(UnsupportedFilterShape("or"))
                }
            }
            Self::Not(child) => match child.bounding_predicate() {
                Ok(None) => Ok(None),
                _ => Err(UnsupportedFilterShape("not")),
            },
        }
    }

    /// Whether this is [`Filter::Include`].
    pub fn is_include(&self) -> bool {
        matches!(self, Self::Include)
    }
}

/// Spatial part of a split filter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Spatial {
    /// No spatial restriction: the whole tracked universe.
    Include,
    /// Restricted to a single bounding box.
    Bounded(Region),
}

/// A filter decomposed into the region tracked by the cache and everything else.
///
/// `AND(spatial, other)` is equivalent to the original filter.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitFilter {
    /// The single bounding box restriction, if any.
    pub spatial: Spatial,
    /// Remaining restrictions, not subject to region tracking.
    pub other: Filter,
}

/// Builds the filters the cache sends to its store and splits incoming ones.
///
/// A builder is handed to the cache at construction; callers with a store
/// that prefers a particular filter shape can supply their own settings.
#[derive(Clone, Debug)]
pub struct FilterBuilder {
    flatten: bool,
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self { flatten: true }
    }
}

impl FilterBuilder {
    /// Create a builder that flattens nested conjunctions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep nested `And` filters as given instead of flattening them.
    pub fn without_flattening(mut self) -> Self {
        self.flatten = false;
        self
    }

    /// Bounding-box filter.
    pub fn bbox(&self, region: Region) -> Filter {
        Filter::BBox(region)
    }

    /// Single-id filter.
    pub fn id(&self, id: FeatureId) -> Filter {
        Filter::Id(BTreeSet::from([id]))
    }

    /// Conjunction of two filters.
    ///
    /// `Include` operands are dropped, and an `Exclude` operand makes the
    /// whole conjunction `Exclude`.
    pub fn and(&self, a: Filter, b: Filter) -> Filter {
        let mut children = Vec::new();
        for f in [a, b] {
            match f {
                Filter::Include => {}
                Filter::Exclude => return Filter::Exclude,
                Filter::And(inner) if self.flatten => children.extend(inner),
                other => children.push(other),
            }
        }
        match children.len() {
            0 => Filter::Include,
            1 => children.pop().unwrap_or(Filter::Include),
            _ => Filter::And(children),
        }
    }

    /// Negation of a filter.
    ///
    /// `Include` and `Exclude` swap, and a double negation is unwrapped.
    pub fn not(&self, f: Filter) -> Filter {
        match f {
            Filter::Include => Filter::Exclude,
            Filter::Exclude => Filter::Include,
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    /// Split a filter into its tracked bounding box and the remaining restrictions.
    ///
    /// Only a bare bounding box, or a conjunction whose bounding-box children
    /// intersect in one region, yields [`Spatial::Bounded`]. Any other spatial
    /// shape is passed through whole as `other` with [`Spatial::Include`].
    pub fn split(&self, filter: &Filter) -> SplitFilter {
        match filter {
            Filter::BBox(region) => SplitFilter {
                spatial: Spatial::Bounded(*region),
                other: Filter::Include,
            },
            Filter::And(children) => self.split_and(filter, children),
            _ => {
                if let Err(shape) = filter.bounding_predicate() {
                    log::debug!("not tracking filter region: {shape}");
                }
                SplitFilter {
                    spatial: Spatial::Include,
                    other: filter.clone(),
                }
            }
        }
    }

    fn split_and(&self, whole: &Filter, children: &[Filter]) -> SplitFilter {
        let mut spatial: Option<Region> = None;
        let mut rest = Vec::new();
        for child in children {
            match child.bounding_predicate() {
                Ok(Some(region)) => {
                    let clipped = match spatial {
                        None => Some(region),
                        Some(acc) => acc.clip(&region),
                    };
                    let Some(clipped) = clipped else {
                        log::debug!("not tracking filter region: disjoint bounding boxes");
                        return SplitFilter {
                            spatial: Spatial::Include,
                            other: whole.clone(),
                        };
                    };
                    spatial = Some(clipped);
                }
                Ok(None) => rest.push(child.clone()),
                Err(shape) => {
                    log::debug!("keeping untracked predicate in residual filter: {shape}");
                    rest.push(child.clone());
                }
            }
        }
        let other = rest
            .into_iter()
            .fold(Filter::Include, |acc, f| self.and(acc, f));
        SplitFilter {
            spatial: spatial.map_or(Spatial::Include, Spatial::Bounded),
            other,
        }
    }
}
