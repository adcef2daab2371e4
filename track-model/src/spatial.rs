//! # Small spatial utilities shared across the model
//!
//! Planar convention: [`geo::Coord`] where `.x` is world x (east) and `.y`
//! holds world z (north). Headings are degrees, 0° = north, clockwise
//! positive.

use geo::{Coord, Distance, Euclidean, Point};

/// Builds a planar point from world (x, z).
#[inline]
pub fn planar(x: f64, z: f64) -> Coord<f64> {
    Coord { x, y: z }
}

/// Normalizes a heading into `[0°, 360°)`.
#[inline]
pub fn normalize_heading_deg(heading: f64) -> f64 {
    heading.rem_euclid(360.0)
}

/// Absolute shortest angular difference between two headings on the 360°
/// circle. The result is always in `[0°, 180°]`.
#[inline]
pub fn heading_delta_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// [`heading_delta_deg`] lifted over optional headings.
///
/// A missing heading on either side makes the delta undefined.
#[inline]
pub fn try_heading_delta_deg(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(heading_delta_deg(a, b)),
        _ => None,
    }
}

/// Euclidean planar distance in meters.
#[inline]
pub fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Euclidean.distance(Point::from(a), Point::from(b))
}
