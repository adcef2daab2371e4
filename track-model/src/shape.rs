//! # Planar shape primitives and the shape registry
//!
//! Shapes gate the activation of areas, markers, and beacons. They are
//! registered once, looked up by case-insensitive id, and never mutated.

use std::collections::HashMap;

use geo::Coord;

use crate::metadata::canonical_id;
use crate::LayoutError;

/// Guards the ray-casting denominator against exactly horizontal polygon
/// edges.
const RAY_CAST_EPSILON: f64 = 1e-12;

/// Geometry of a planar shape.
///
/// Rectangles are axis-aligned; `x`/`z` name the minimum corner. Polylines
/// carry no width of their own: containment against a polyline needs an
/// external half-width (areas and cues supply it).
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Rect {
        x: f64,
        z: f64,
        width: f64,
        height: f64,
    },
    Circle {
        x: f64,
        z: f64,
        radius: f64,
    },
    Polygon(Vec<Coord<f64>>),
    Polyline(Vec<Coord<f64>>),
}

/// A registered planar shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    id: String,
    kind: ShapeKind,
}

impl Shape {
    /// Builds a shape, enforcing the structural invariants:
    /// non-empty id, polygons need ≥ 3 points, polylines need ≥ 2.
    pub fn new(id: impl Into<String>, kind: ShapeKind) -> Result<Self, LayoutError> {
        let id = id.into();
        if canonical_id(&id).is_empty() {
            return Err(LayoutError::EmptyId);
        }
        match &kind {
            ShapeKind::Polygon(points) if points.len() < 3 => {
                return Err(LayoutError::DegeneratePolygon)
            }
            ShapeKind::Polyline(points) if points.len() < 2 => {
                return Err(LayoutError::DegeneratePolyline)
            }
            _ => {}
        }
        Ok(Self { id, kind })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Point-in-shape test.
    ///
    /// Rectangle bounds are inclusive; circles compare squared distance.
    /// Polylines cannot contain anything without a width, so they always
    /// report `false` here; see [`Shape::contains_with_width`].
    pub fn contains(&self, p: Coord<f64>) -> bool {
        match &self.kind {
            ShapeKind::Rect {
                x,
                z,
                width,
                height,
            } => p.x >= *x && p.x <= x + width && p.y >= *z && p.y <= z + height,
            ShapeKind::Circle { x, z, radius } => {
                let dx = p.x - x;
                let dz = p.y - z;
                dx * dx + dz * dz <= radius * radius
            }
            ShapeKind::Polygon(points) => polygon_contains(points, p),
            ShapeKind::Polyline(_) => false,
        }
    }

    /// Point-in-shape test with an external half-width for polylines.
    ///
    /// A point is inside a polyline iff its distance to the nearest segment
    /// is at most `half_width` (inclusive at the boundary). Non-polyline
    /// kinds ignore the width.
    pub fn contains_with_width(&self, p: Coord<f64>, half_width: f64) -> bool {
        match &self.kind {
            ShapeKind::Polyline(points) => {
                half_width >= 0.0
                    && polyline_min_distance_sq(points, p) <= half_width * half_width
            }
            _ => self.contains(p),
        }
    }
}

/// Even-odd ray casting along +x.
///
/// A small epsilon in the denominator keeps exactly horizontal edges from
/// dividing by zero.
fn polygon_contains(points: &[Coord<f64>], p: Coord<f64>) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[j];
        let crosses = (a.y > p.y) != (b.y > p.y);
        if crosses {
            let t = (p.y - a.y) / (b.y - a.y + RAY_CAST_EPSILON);
            if p.x < a.x + t * (b.x - a.x) {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Minimum squared distance from `p` to any segment of the polyline.
///
/// Per segment the parametric foot point is clamped to `[0, 1]`, so
/// endpoints are handled without special cases.
fn polyline_min_distance_sq(points: &[Coord<f64>], p: Coord<f64>) -> f64 {
    let mut min_sq = f64::INFINITY;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq > 0.0 {
            (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let cx = a.x + t * dx - p.x;
        let cy = a.y + t * dy - p.y;
        min_sq = min_sq.min(cx * cx + cy * cy);
    }
    min_sq
}

/// Registry of immutable shapes, looked up by case-insensitive id.
#[derive(Debug, Default)]
pub struct ShapeStore {
    shapes: Vec<Shape>,
    index: HashMap<String, usize>,
}

impl ShapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shape. Ids must be unique (case-insensitive).
    pub fn register(&mut self, shape: Shape) -> Result<(), LayoutError> {
        let key = canonical_id(shape.id());
        if self.index.contains_key(&key) {
            return Err(LayoutError::DuplicateId(shape.id().to_owned()));
        }
        self.index.insert(key, self.shapes.len());
        self.shapes.push(shape);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, id: &str) -> Option<&Shape> {
        self.index
            .get(&canonical_id(id))
            .map(|&i| &self.shapes[i])
    }

    /// Containment against a shape by id. An unknown id is simply
    /// "not contained"; it is never an error.
    pub fn contains_id(&self, id: &str, p: Coord<f64>) -> bool {
        self.get(id).is_some_and(|shape| shape.contains(p))
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::planar;
    use proptest::prelude::*;

    fn polyline_shape(points: Vec<Coord<f64>>) -> Shape {
        Shape::new("line", ShapeKind::Polyline(points)).unwrap()
    }

    #[test]
    fn rect_bounds_are_inclusive() {
        let rect = Shape::new(
            "r",
            ShapeKind::Rect {
                x: 0.0,
                z: 0.0,
                width: 10.0,
                height: 5.0,
            },
        )
        .unwrap();
        assert!(rect.contains(planar(0.0, 0.0)));
        assert!(rect.contains(planar(10.0, 5.0)));
        assert!(rect.contains(planar(5.0, 2.5)));
        assert!(!rect.contains(planar(10.0001, 5.0)));
        assert!(!rect.contains(planar(-0.0001, 0.0)));
    }

    #[test]
    fn circle_boundary_is_inclusive() {
        let circle = Shape::new(
            "c",
            ShapeKind::Circle {
                x: 0.0,
                z: 0.0,
                radius: 2.0,
            },
        )
        .unwrap();
        assert!(circle.contains(planar(2.0, 0.0)));
        assert!(circle.contains(planar(0.0, -2.0)));
        assert!(!circle.contains(planar(2.0, 0.1)));
    }

    #[test]
    fn polygon_even_odd() {
        // Concave "L" shape.
        let poly = Shape::new(
            "l",
            ShapeKind::Polygon(vec![
                planar(0.0, 0.0),
                planar(4.0, 0.0),
                planar(4.0, 1.0),
                planar(1.0, 1.0),
                planar(1.0, 4.0),
                planar(0.0, 4.0),
            ]),
        )
        .unwrap();
        assert!(poly.contains(planar(0.5, 0.5)));
        assert!(poly.contains(planar(3.0, 0.5)));
        assert!(poly.contains(planar(0.5, 3.0)));
        assert!(!poly.contains(planar(3.0, 3.0)));
        assert!(!poly.contains(planar(-1.0, 0.5)));
    }

    #[test]
    fn polygon_with_horizontal_edges() {
        let square = Shape::new(
            "s",
            ShapeKind::Polygon(vec![
                planar(0.0, 0.0),
                planar(2.0, 0.0),
                planar(2.0, 2.0),
                planar(0.0, 2.0),
            ]),
        )
        .unwrap();
        assert!(square.contains(planar(1.0, 1.0)));
        assert!(!square.contains(planar(3.0, 1.0)));
    }

    #[test]
    fn polyline_needs_width() {
        let line = polyline_shape(vec![planar(0.0, 0.0), planar(10.0, 0.0)]);
        assert!(!line.contains(planar(5.0, 0.0)));
        assert!(line.contains_with_width(planar(5.0, 0.0), 1.0));
    }

    #[test]
    fn polyline_boundary_is_inclusive() {
        let line = polyline_shape(vec![planar(0.0, 0.0), planar(10.0, 0.0), planar(10.0, 10.0)]);
        // Exactly half-width away from the second segment.
        assert!(line.contains_with_width(planar(12.0, 5.0), 2.0));
        assert!(!line.contains_with_width(planar(13.0, 5.0), 2.0));
        // On the line itself.
        assert!(line.contains_with_width(planar(10.0, 3.0), 2.0));
    }

    #[test]
    fn polyline_clamps_beyond_endpoints() {
        let line = polyline_shape(vec![planar(0.0, 0.0), planar(10.0, 0.0)]);
        assert!(line.contains_with_width(planar(-1.0, 0.0), 1.5));
        assert!(!line.contains_with_width(planar(-2.0, 0.0), 1.5));
    }

    #[test]
    fn degenerate_shapes_rejected() {
        assert_eq!(
            Shape::new("p", ShapeKind::Polygon(vec![planar(0.0, 0.0), planar(1.0, 0.0)])),
            Err(LayoutError::DegeneratePolygon)
        );
        assert_eq!(
            Shape::new("p", ShapeKind::Polyline(vec![planar(0.0, 0.0)])),
            Err(LayoutError::DegeneratePolyline)
        );
        assert_eq!(
            Shape::new(
                "  ",
                ShapeKind::Circle {
                    x: 0.0,
                    z: 0.0,
                    radius: 1.0
                }
            ),
            Err(LayoutError::EmptyId)
        );
    }

    #[test]
    fn store_lookup_is_case_insensitive() {
        let mut store = ShapeStore::new();
        store
            .register(
                Shape::new(
                    "Pit-Circle",
                    ShapeKind::Circle {
                        x: 0.0,
                        z: 0.0,
                        radius: 1.0,
                    },
                )
                .unwrap(),
            )
            .unwrap();
        assert!(store.get("pit-circle").is_some());
        assert!(store.get(" PIT-CIRCLE ").is_some());
        assert!(store.contains_id("PIT-circle", planar(0.5, 0.0)));
        assert!(!store.contains_id("unknown", planar(0.5, 0.0)));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut store = ShapeStore::new();
        let make = || {
            Shape::new(
                "a",
                ShapeKind::Circle {
                    x: 0.0,
                    z: 0.0,
                    radius: 1.0,
                },
            )
            .unwrap()
        };
        store.register(make()).unwrap();
        assert_eq!(
            store.register(make()),
            Err(LayoutError::DuplicateId("a".to_owned()))
        );
    }

    proptest! {
        // Containment must not depend on the traversal direction of the
        // polyline.
        #[test]
        fn polyline_hit_symmetry(
            points in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 2..8),
            px in -60.0f64..60.0,
            pz in -60.0f64..60.0,
            width in 0.1f64..20.0,
        ) {
            let coords: Vec<_> = points.iter().map(|&(x, z)| planar(x, z)).collect();
            let mut reversed = coords.clone();
            reversed.reverse();
            let forward = polyline_shape(coords);
            let backward = polyline_shape(reversed);
            let p = planar(px, pz);
            prop_assert_eq!(
                forward.contains_with_width(p, width / 2.0),
                backward.contains_with_width(p, width / 2.0)
            );
        }
    }
}
