//! Scale ranges
//!
//! A scale is the current map resolution in map units per pixel; zooming in
//! makes it smaller. Selectors restrict matching to a zoom interval, which
//! maps to a scale range, and computed styles record the range they are
//! valid for.

/// A half-open scale interval `(lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub lower: f64,
    pub upper: f64,
}

/// Map units per pixel at zoom level 0 on the usual web-mercator tiling.
const ZOOM_0_SCALE: f64 = 2.0 * std::f64::consts::PI * 6_378_137.0 / 256.0;

/// Scale at the top of the given zoom level.
fn zoom_scale(zoom: u32) -> f64 {
    ZOOM_0_SCALE / f64::powi(2.0, zoom as i32)
}

impl Range {
    /// The full range of valid scales.
    pub const ZERO_TO_INFINITY: Range = Range { lower: 0.0, upper: f64::INFINITY };

    /// Creates a range; `lower` must be strictly below `upper`.
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(lower < upper, "empty range {lower}..{upper}");
        Range { lower, upper }
    }

    /// Scale range for a zoom interval, as written `|z12-14`. `None` bounds
    /// are open ends (`|z12-`, `|z-14`).
    pub fn zoom(min: Option<u32>, max: Option<u32>) -> Self {
        let lower = max.map(|m| zoom_scale(m + 1)).unwrap_or(0.0);
        let upper = min.map(zoom_scale).unwrap_or(f64::INFINITY);
        Range { lower, upper }
    }

    /// Whether the scale falls in this range.
    pub fn contains(&self, scale: f64) -> bool {
        self.lower < scale && scale <= self.upper
    }

    /// Intersection of two overlapping ranges.
    pub fn intersect(&self, other: Range) -> Range {
        Range {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// Shrinks this range around `scale` so that it no longer overlaps
    /// `other`, which is known not to contain `scale`. Keeps the result
    /// containing `scale`. Used to record that a zoom-restricted rule did
    /// not apply at this scale: the cached style is only valid up to the
    /// point where that rule would start applying.
    pub fn reduce_around(&self, scale: f64, other: Range) -> Range {
        debug_assert!(self.contains(scale));
        if other.contains(scale) {
            return self.intersect(other);
        }
        let mut r = *self;
        if other.upper <= scale && other.upper > r.lower {
            r.lower = other.upper;
        }
        if other.lower >= scale && other.lower < r.upper {
            r.upper = other.lower;
        }
        r
    }
}
