// Copyright 2025 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

/// Axis-aligned bounding box in 2D.
///
/// Boundaries are inclusive: two regions that share an edge intersect, and a
/// region contains itself.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    /// Minimum x (west)
    pub min_x: f64,
    /// Minimum y (south)
    pub min_y: f64,
    /// Maximum x (east)
    pub max_x: f64,
    /// Maximum y (north)
    pub max_y: f64,
}

impl Region {
    /// Create a new region from min/max corners.
    ///
    /// Debug builds assert `min <= max` on both axes.
    #[inline]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        debug_assert!(
            min_x <= max_x && min_y <= max_y,
            "region corners are inverted: ({min_x}, {min_y}) -> ({max_x}, {max_y})"
        );
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a region from origin and size.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    /// Create a degenerate region covering a single point.
    #[inline]
    pub fn from_point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Extent along the x axis.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Extent along the y axis.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area of the region (zero for degenerate regions).
    #[inline]
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Return true if the region has no area. Assumes no NaN.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }

    /// Whether this region contains the point.
    #[inline]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.min_x <= x && self.min_y <= y && x <= self.max_x && y <= self.max_y
    }

    /// Determines whether this region overlaps with another in any way.
    ///
    /// The edge of a region is part of itself, so two regions that share an
    /// edge are considered to intersect.
    ///
    /// # Examples
    ///
    /// ```
    /// use mosaic_index::Region;
    ///
    /// let a = Region::new(0.0, 0.0, 10.0, 10.0);
    /// assert!(a.intersects(&Region::new(5.0, 5.0, 15.0, 15.0)));
    /// assert!(a.intersects(&Region::new(10.0, 0.0, 20.0, 10.0)));
    /// assert!(!a.intersects(&Region::new(11.0, 0.0, 20.0, 10.0)));
    /// ```
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Whether `other` lies fully inside this region (boundaries inclusive).
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    /// The smallest region enclosing both regions.
    #[inline]
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// The intersection of two regions, or `None` if they are disjoint.
    ///
    /// Regions that only touch produce a degenerate (zero-area) result.
    #[inline]
    pub fn clip(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// The parts of this region that lie outside `other`, as at most four
    /// non-overlapping bands.
    ///
    /// Bands are split off west and east first (full height), then south and
    /// north of the overlap. Bands with no area are skipped, so a region fully
    /// inside `other` yields nothing.
    pub fn subtract(&self, other: &Self) -> impl Iterator<Item = Self> {
        let mut bands: [Option<Self>; 4] = [None; 4];
        match self.clip(other) {
            None => {
                if !self.is_empty() {
                    bands[0] = Some(*self);
                }
            }
            Some(inner) => {
                let west = Self::new(self.min_x, self.min_y, inner.min_x, self.max_y);
                let east = Self::new(inner.max_x, self.min_y, self.max_x, self.max_y);
                let south = Self::new(inner.min_x, self.min_y, inner.max_x, inner.min_y);
                let north = Self::new(inner.min_x, inner.max_y, inner.max_x, self.max_y);
                for (slot, band) in bands.iter_mut().zip([west, east, south, north]) {
                    if !band.is_empty() {
                        *slot = Some(band);
                    }
                }
            }
        }
        bands.into_iter().flatten()
    }

    /// Squared distance from a point to the closest point of this region.
    ///
    /// Zero when the point lies inside.
    #[inline]
    pub fn distance_squared_to_point(&self, x: f64, y: f64) -> f64 {
        let dx = (self.min_x - x).max(0.0).max(x - self.max_x);
        let dy = (self.min_y - y).max(0.0).max(y - self.max_y);
        dx * dx + dy * dy
    }
}

#[cfg(feature = "kurbo")]
impl From<kurbo::Rect> for Region {
    fn from(r: kurbo::Rect) -> Self {
        let r = r.abs();
        Self::new(r.x0, r.y0, r.x1, r.y1)
    }
}

#[cfg(feature = "kurbo")]
impl From<Region> for kurbo::Rect {
    fn from(r: Region) -> Self {
        Self::new(r.min_x, r.min_y, r.max_x, r.max_y)
    }
}
