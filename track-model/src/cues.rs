//! # Trackside markers and beacons
//!
//! Point cues with optional shape-gated activation. Both managers answer
//! the same question: given a world position and an optional heading,
//! which cues are active, and which is the nearest?
//!
//! Activation rules:
//! - An entry referencing a shape is active iff the position is contained.
//!   Polyline shapes take their half-width from the entry's own `width_m`,
//!   else the first of the metadata keys `width` / `activation_width` /
//!   `lane_width`, else the manager's default.
//! - A shapeless beacon is active within its `activation_radius_m`
//!   (falling back to the caller's range); a shapeless marker is active
//!   within the caller's range.
//!
//! Results are sorted by ascending distance; equidistant entries keep
//! insertion order (unspecified among equals).

use geo::Coord;

use crate::metadata::canonical_id;
use crate::shape::{ShapeKind, ShapeStore};
use crate::spatial::{planar_distance, try_heading_delta_deg};
use crate::{LayoutError, MetadataMap};

/// Fallback polyline activation half-width source when neither the entry
/// nor its metadata specify one.
pub const DEFAULT_ACTIVATION_WIDTH_M: f64 = 4.0;

const WIDTH_METADATA_KEYS: [&str; 3] = ["width", "activation_width", "lane_width"];

/// A named point of interest announced when the driver passes nearby.
#[derive(Debug, Clone)]
pub struct TracksideMarker {
    pub id: String,
    /// Free-form type tag, compared case-insensitively by filters.
    pub marker_type: String,
    pub position: Coord<f64>,
    /// Facing of the cue, if it has one. Degrees, 0° = north, clockwise.
    pub heading_deg: Option<f64>,
    pub shape_id: Option<String>,
    pub width_m: Option<f64>,
    pub metadata: MetadataMap,
}

impl TracksideMarker {
    pub fn new(id: impl Into<String>, marker_type: impl Into<String>, position: Coord<f64>) -> Self {
        Self {
            id: id.into(),
            marker_type: marker_type.into(),
            position,
            heading_deg: None,
            shape_id: None,
            width_m: None,
            metadata: MetadataMap::new(),
        }
    }
}

/// A navigational sound source with its own activation radius.
#[derive(Debug, Clone)]
pub struct Beacon {
    pub id: String,
    pub beacon_type: String,
    /// Free-form role tag (e.g. start line, pit entry).
    pub role: String,
    pub position: Coord<f64>,
    pub heading_deg: Option<f64>,
    pub activation_radius_m: Option<f64>,
    pub shape_id: Option<String>,
    pub width_m: Option<f64>,
    pub metadata: MetadataMap,
}

impl Beacon {
    pub fn new(id: impl Into<String>, beacon_type: impl Into<String>, position: Coord<f64>) -> Self {
        Self {
            id: id.into(),
            beacon_type: beacon_type.into(),
            role: String::new(),
            position,
            heading_deg: None,
            activation_radius_m: None,
            shape_id: None,
            width_m: None,
            metadata: MetadataMap::new(),
        }
    }
}

/// The closest active cue, with the angular offset to its facing.
#[derive(Debug, Clone, Copy)]
pub struct NearestCue<'a, T> {
    pub entry: &'a T,
    pub distance_m: f64,
    /// Shortest angular difference between the query heading and the cue's
    /// facing, in `[0°, 180°]`. `None` when either heading is missing.
    pub heading_delta_deg: Option<f64>,
}

/// Resolves the polyline activation half-width for an entry.
fn activation_half_width(
    width_m: Option<f64>,
    metadata: &MetadataMap,
    default_width_m: f64,
) -> f64 {
    let width = width_m
        .or_else(|| {
            WIDTH_METADATA_KEYS
                .iter()
                .find_map(|key| metadata.get_f64(key))
        })
        .unwrap_or(default_width_m);
    width / 2.0
}

/// Shape-gated containment shared by both managers.
fn shape_active(
    shapes: &ShapeStore,
    shape_id: &str,
    width_m: Option<f64>,
    metadata: &MetadataMap,
    default_width_m: f64,
    p: Coord<f64>,
) -> bool {
    let Some(shape) = shapes.get(shape_id) else {
        return false;
    };
    match shape.kind() {
        ShapeKind::Polyline(_) => {
            shape.contains_with_width(p, activation_half_width(width_m, metadata, default_width_m))
        }
        _ => shape.contains(p),
    }
}

fn matches_tag(filter: Option<&str>, value: &str) -> bool {
    filter.is_none_or(|f| canonical_id(f) == canonical_id(value))
}

fn register_unique<T>(entries: &[T], id: &str, id_of: impl Fn(&T) -> &str) -> Result<(), LayoutError> {
    if canonical_id(id).is_empty() {
        return Err(LayoutError::EmptyId);
    }
    if entries
        .iter()
        .any(|e| canonical_id(id_of(e)) == canonical_id(id))
    {
        return Err(LayoutError::DuplicateId(id.to_owned()));
    }
    Ok(())
}

/// Registry and spatial query surface for trackside markers.
#[derive(Debug)]
pub struct MarkerManager<'a> {
    shapes: &'a ShapeStore,
    markers: Vec<TracksideMarker>,
    default_width_m: f64,
}

impl<'a> MarkerManager<'a> {
    pub fn new(shapes: &'a ShapeStore) -> Self {
        Self {
            shapes,
            markers: Vec::new(),
            default_width_m: DEFAULT_ACTIVATION_WIDTH_M,
        }
    }

    pub fn with_default_width(mut self, width_m: f64) -> Self {
        self.default_width_m = width_m;
        self
    }

    pub fn register(&mut self, marker: TracksideMarker) -> Result<(), LayoutError> {
        register_unique(&self.markers, &marker.id, |m| m.id.as_str())?;
        self.markers.push(marker);
        Ok(())
    }

    pub fn markers(&self) -> &[TracksideMarker] {
        &self.markers
    }

    fn is_active(&self, marker: &TracksideMarker, p: Coord<f64>, range_m: f64) -> bool {
        match &marker.shape_id {
            Some(shape_id) => shape_active(
                self.shapes,
                shape_id,
                marker.width_m,
                &marker.metadata,
                self.default_width_m,
                p,
            ),
            None => planar_distance(marker.position, p) <= range_m,
        }
    }

    /// Active markers within `range_m`, sorted by ascending distance.
    pub fn find_markers_in_range(
        &self,
        p: Coord<f64>,
        range_m: f64,
        type_filter: Option<&str>,
    ) -> Vec<(&TracksideMarker, f64)> {
        let mut hits: Vec<_> = self
            .markers
            .iter()
            .filter(|m| matches_tag(type_filter, &m.marker_type))
            .filter(|m| self.is_active(m, p, range_m))
            .map(|m| (m, planar_distance(m.position, p)))
            .filter(|(_, distance)| *distance <= range_m)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    /// The single closest active marker.
    pub fn try_get_nearest_marker(
        &self,
        p: Coord<f64>,
        heading_deg: Option<f64>,
        range_m: f64,
        type_filter: Option<&str>,
    ) -> Option<NearestCue<'_, TracksideMarker>> {
        self.find_markers_in_range(p, range_m, type_filter)
            .into_iter()
            .next()
            .map(|(entry, distance_m)| NearestCue {
                entry,
                distance_m,
                heading_delta_deg: try_heading_delta_deg(heading_deg, entry.heading_deg),
            })
    }
}

/// Registry and spatial query surface for beacons.
#[derive(Debug)]
pub struct BeaconManager<'a> {
    shapes: &'a ShapeStore,
    beacons: Vec<Beacon>,
    default_width_m: f64,
}

impl<'a> BeaconManager<'a> {
    pub fn new(shapes: &'a ShapeStore) -> Self {
        Self {
            shapes,
            beacons: Vec::new(),
            default_width_m: DEFAULT_ACTIVATION_WIDTH_M,
        }
    }

    pub fn with_default_width(mut self, width_m: f64) -> Self {
        self.default_width_m = width_m;
        self
    }

    pub fn register(&mut self, beacon: Beacon) -> Result<(), LayoutError> {
        register_unique(&self.beacons, &beacon.id, |b| b.id.as_str())?;
        self.beacons.push(beacon);
        Ok(())
    }

    pub fn beacons(&self) -> &[Beacon] {
        &self.beacons
    }

    fn is_active(&self, beacon: &Beacon, p: Coord<f64>, range_m: Option<f64>) -> bool {
        match &beacon.shape_id {
            Some(shape_id) => shape_active(
                self.shapes,
                shape_id,
                beacon.width_m,
                &beacon.metadata,
                self.default_width_m,
                p,
            ),
            None => match beacon.activation_radius_m.or(range_m) {
                Some(radius) => planar_distance(beacon.position, p) <= radius,
                None => false,
            },
        }
    }

    /// Active beacons, optionally capped by `range_m` and filtered by role
    /// and type, sorted by ascending distance.
    pub fn find_beacons_in_range(
        &self,
        p: Coord<f64>,
        range_m: Option<f64>,
        role_filter: Option<&str>,
        type_filter: Option<&str>,
    ) -> Vec<(&Beacon, f64)> {
        let mut hits: Vec<_> = self
            .beacons
            .iter()
            .filter(|b| matches_tag(role_filter, &b.role))
            .filter(|b| matches_tag(type_filter, &b.beacon_type))
            .filter(|b| self.is_active(b, p, range_m))
            .map(|b| (b, planar_distance(b.position, p)))
            .filter(|(_, distance)| range_m.is_none_or(|range| *distance <= range))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    /// The single closest active beacon.
    pub fn try_get_nearest_cue(
        &self,
        p: Coord<f64>,
        heading_deg: Option<f64>,
        range_m: Option<f64>,
        role_filter: Option<&str>,
        type_filter: Option<&str>,
    ) -> Option<NearestCue<'_, Beacon>> {
        self.find_beacons_in_range(p, range_m, role_filter, type_filter)
            .into_iter()
            .next()
            .map(|(entry, distance_m)| NearestCue {
                entry,
                distance_m,
                heading_delta_deg: try_heading_delta_deg(heading_deg, entry.heading_deg),
            })
    }
}
