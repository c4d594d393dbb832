//! Projected coordinates
//!
//! Positions are stored in projected east/north map units. The engine only
//! needs enough geometry to derive headings between consecutive way nodes
//! and segment lengths; projection math itself lives outside this crate.

use std::f64::consts::TAU;

/// A point in projected coordinates (map units).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EastNorth {
    pub east: f64,
    pub north: f64,
}

impl EastNorth {
    /// Creates a new point.
    pub const fn new(east: f64, north: f64) -> Self {
        EastNorth { east, north }
    }

    /// Heading from this point towards `other`, in radians in `[0, 2*PI)`.
    ///
    /// North is 0, east is PI/2. This is the projected heading, not the
    /// great-circle bearing. `offset` is added before normalization, so a
    /// backward heading is `heading(other, PI)`.
    pub fn heading(&self, other: EastNorth, offset: f64) -> f64 {
        let hd = (other.east - self.east).atan2(other.north - self.north) + offset;
        hd.rem_euclid(TAU)
    }

    /// Euclidean distance to `other` in map units.
    pub fn distance(&self, other: EastNorth) -> f64 {
        (other.east - self.east).hypot(other.north - self.north)
    }

    /// Whether both coordinates agree within `epsilon`.
    pub fn equals_epsilon(&self, other: EastNorth, epsilon: f64) -> bool {
        (self.east - other.east).abs() <= epsilon && (self.north - other.north).abs() <= epsilon
    }
}
