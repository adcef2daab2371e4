//! # The track layout facade
//!
//! A layout combines a course graph with track-wide defaults and exposes
//! every linear attribute under a single route coordinate. Construction
//! concatenates the primary route's edges: a cumulative edge-start table
//! is computed, every zone list is rewritten into route coordinates by
//! offsetting with the owning edge's start, and the route's spans are
//! merged into one flat geometry for the controller.
//!
//! All query methods are total: out-of-range `s` wraps on loops and clamps
//! on open routes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{BuiltGeometry, GeometrySpec, Pose};
use crate::graph::{Graph, GraphEdge};
use crate::metadata::canonical_id;
use crate::profile::{zone_contains, NoiseZone, SpeedZone, SurfaceZone, TrackMarker, WidthZone};
use crate::{Ambience, LayoutError, NoiseKind, Surface, Weather};

/// Display metadata of a layout, surfaced to the session/network layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub name: String,
    pub author: String,
    pub version: String,
    pub tags: Vec<String>,
}

/// An opaque named group of edges around a start/finish feature.
///
/// Carried for external collaborators (session setup, timing); the core
/// never interprets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartFinishSubgraph {
    pub name: String,
    pub edge_ids: Vec<String>,
}

/// Result of mapping route-s onto the primary route's edge list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEdge {
    /// Index into the primary route (not the graph's full edge list).
    pub edge_index: usize,
    /// Offset within that edge.
    pub local_s: f64,
}

/// The assembled, immutable track model.
#[derive(Debug)]
pub struct TrackLayout {
    graph: Graph,
    metadata: TrackMetadata,
    start_finish_subgraphs: Vec<StartFinishSubgraph>,
    weather: Weather,
    ambience: Ambience,
    default_surface: Surface,
    default_noise: NoiseKind,
    default_width_m: f64,
    /// Indices into `graph.edges()`, route order.
    route_edges: Vec<usize>,
    /// Cumulative route-s at each edge start; `len = route_edges.len() + 1`.
    edge_starts: Vec<f64>,
    surface_zones: Vec<SurfaceZone>,
    noise_zones: Vec<NoiseZone>,
    width_zones: Vec<WidthZone>,
    speed_zones: Vec<SpeedZone>,
    markers: Vec<TrackMarker>,
    primary_spec: GeometrySpec,
    primary_geometry: BuiltGeometry,
}

impl TrackLayout {
    /// Builds a layout from a graph and track-wide defaults.
    ///
    /// This is the crate's single fail-fast site: a non-positive default
    /// width, an empty primary route, consecutive route edges that do not
    /// share a portal, a violated loop closure, or unbuildable geometry
    /// all reject the layout here. Everything downstream is total.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: Graph,
        weather: Weather,
        ambience: Ambience,
        default_surface: Surface,
        default_noise: NoiseKind,
        default_width_m: f64,
        metadata: TrackMetadata,
        start_finish_subgraphs: Vec<StartFinishSubgraph>,
    ) -> Result<Self, LayoutError> {
        if !(default_width_m > 0.0) || !default_width_m.is_finite() {
            return Err(LayoutError::NonPositiveWidth(default_width_m));
        }
        let route_edges = graph.primary_route_indices();
        if route_edges.is_empty() {
            return Err(LayoutError::EmptyRoute);
        }
        let is_loop = graph.primary_route().is_loop;

        // Route ordering invariants: consecutive edges share a portal, and
        // a loop closes back onto its first portal.
        for pair in route_edges.windows(2) {
            let (prev, next) = (&graph.edges()[pair[0]], &graph.edges()[pair[1]]);
            if canonical_id(&prev.to_portal_id) != canonical_id(&next.from_portal_id) {
                return Err(LayoutError::RouteDiscontinuity {
                    from_edge: prev.id.clone(),
                    to_edge: next.id.clone(),
                });
            }
        }
        if is_loop {
            let first = &graph.edges()[route_edges[0]];
            let last = &graph.edges()[route_edges[route_edges.len() - 1]];
            if canonical_id(&last.to_portal_id) != canonical_id(&first.from_portal_id) {
                return Err(LayoutError::LoopClosure {
                    start: first.from_portal_id.clone(),
                    end: last.to_portal_id.clone(),
                });
            }
        }

        // Merge the per-edge views into route coordinates.
        let mut edge_starts = Vec::with_capacity(route_edges.len() + 1);
        let mut surface_zones = Vec::new();
        let mut noise_zones = Vec::new();
        let mut width_zones = Vec::new();
        let mut speed_zones = Vec::new();
        let mut markers = Vec::new();
        let mut spans = Vec::new();
        let mut sample_spacing = f64::INFINITY;
        let mut offset = 0.0;
        edge_starts.push(0.0);
        for &edge_index in &route_edges {
            let edge = &graph.edges()[edge_index];
            let length = edge.length_m();
            let profile = &edge.profile;

            for zone in &profile.surface_zones {
                surface_zones.push(SurfaceZone {
                    start_s: zone.start_s + offset,
                    end_s: zone.end_s + offset,
                    surface: zone.surface,
                });
            }
            // An edge default that differs from the layout default becomes
            // a whole-edge zone behind the explicit ones, so first-match
            // still prefers the explicit zones.
            if profile.default_surface != default_surface {
                surface_zones.push(SurfaceZone {
                    start_s: offset,
                    end_s: offset + length,
                    surface: profile.default_surface,
                });
            }
            for zone in &profile.noise_zones {
                noise_zones.push(NoiseZone {
                    start_s: zone.start_s + offset,
                    end_s: zone.end_s + offset,
                    noise: zone.noise,
                });
            }
            if profile.default_noise != default_noise {
                noise_zones.push(NoiseZone {
                    start_s: offset,
                    end_s: offset + length,
                    noise: profile.default_noise,
                });
            }
            for zone in &profile.width_zones {
                width_zones.push(WidthZone {
                    start_s: zone.start_s + offset,
                    end_s: zone.end_s + offset,
                    ..*zone
                });
            }
            if (profile.default_width_m - default_width_m).abs() > f64::EPSILON {
                width_zones.push(WidthZone {
                    start_s: offset,
                    end_s: offset + length,
                    width_m: profile.default_width_m,
                    shoulder_left_m: 0.0,
                    shoulder_right_m: 0.0,
                });
            }
            for zone in &profile.speed_zones {
                speed_zones.push(SpeedZone {
                    start_s: zone.start_s + offset,
                    end_s: zone.end_s + offset,
                    max_speed_kph: zone.max_speed_kph,
                });
            }
            for marker in &profile.markers {
                markers.push(TrackMarker {
                    name: marker.name.clone(),
                    position_s: marker.position_s + offset,
                });
            }

            spans.extend(edge.geometry.spans.iter().copied());
            sample_spacing = sample_spacing.min(edge.geometry.sample_spacing_m);
            offset += length;
            edge_starts.push(offset);
        }

        let primary_spec = GeometrySpec {
            spans,
            sample_spacing_m: sample_spacing,
            is_loop,
        };
        let primary_geometry = BuiltGeometry::build(&primary_spec)?;

        debug!(
            name = %metadata.name,
            edges = route_edges.len(),
            spans = primary_spec.spans.len(),
            length_m = offset,
            is_loop,
            "track layout built"
        );

        Ok(Self {
            graph,
            metadata,
            start_finish_subgraphs,
            weather,
            ambience,
            default_surface,
            default_noise,
            default_width_m,
            route_edges,
            edge_starts,
            surface_zones,
            noise_zones,
            width_zones,
            speed_zones,
            markers,
            primary_spec,
            primary_geometry,
        })
    }

    /// Total length of the primary route in meters.
    pub fn primary_route_length_m(&self) -> f64 {
        *self.edge_starts.last().expect("at least one edge")
    }

    pub fn is_loop(&self) -> bool {
        self.primary_spec.is_loop
    }

    /// Brings `s` into the route domain (wrap on loops, clamp otherwise).
    pub fn normalize_s(&self, s: f64) -> f64 {
        self.primary_geometry.normalize_s(s)
    }

    /// Surface at route-s.
    pub fn surface_at(&self, s: f64) -> Surface {
        let s = self.normalize_s(s);
        self.surface_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map_or(self.default_surface, |z| z.surface)
    }

    /// Noise at route-s.
    pub fn noise_at(&self, s: f64) -> NoiseKind {
        let s = self.normalize_s(s);
        self.noise_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map_or(self.default_noise, |z| z.noise)
    }

    /// Drivable width at route-s.
    pub fn width_at(&self, s: f64) -> f64 {
        let s = self.normalize_s(s);
        self.width_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map_or(self.default_width_m, |z| z.width_m)
    }

    /// Speed limit at route-s, if any zone imposes one.
    pub fn try_speed_limit(&self, s: f64) -> Option<f64> {
        let s = self.normalize_s(s);
        self.speed_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map(|z| z.max_speed_kph)
    }

    /// Maps route-s to the containing primary-route edge.
    pub fn resolve_primary_edge(&self, s: f64) -> ResolvedEdge {
        let s = self.normalize_s(s);
        let i = self.edge_starts.partition_point(|&start| start <= s);
        let edge_index = i.saturating_sub(1).min(self.route_edges.len() - 1);
        ResolvedEdge {
            edge_index,
            local_s: s - self.edge_starts[edge_index],
        }
    }

    /// Route-coordinate `[start, end)` bounds of the edge containing `s`.
    pub fn resolve_primary_edge_bounds(&self, s: f64) -> (f64, f64) {
        let resolved = self.resolve_primary_edge(s);
        (
            self.edge_starts[resolved.edge_index],
            self.edge_starts[resolved.edge_index + 1],
        )
    }

    /// The `index`-th edge of the primary route.
    pub fn route_edge(&self, index: usize) -> &GraphEdge {
        &self.graph.edges()[self.route_edges[index]]
    }

    pub fn route_edge_count(&self) -> usize {
        self.route_edges.len()
    }

    /// Route-s at which route edge `index` starts.
    pub fn edge_start(&self, index: usize) -> f64 {
        self.edge_starts[index]
    }

    /// Pose at route-s on the primary geometry.
    pub fn pose_at(&self, s: f64) -> Pose {
        self.primary_geometry.pose_at(s)
    }

    /// The flat span array of the primary route.
    pub fn primary_geometry(&self) -> &BuiltGeometry {
        &self.primary_geometry
    }

    pub fn primary_spec(&self) -> &GeometrySpec {
        &self.primary_spec
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    pub fn start_finish_subgraphs(&self) -> &[StartFinishSubgraph] {
        &self.start_finish_subgraphs
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn ambience(&self) -> Ambience {
        self.ambience
    }

    pub fn default_surface(&self) -> Surface {
        self.default_surface
    }

    pub fn default_noise(&self) -> NoiseKind {
        self.default_noise
    }

    pub fn default_width_m(&self) -> f64 {
        self.default_width_m
    }

    /// Merged surface zones in route coordinates.
    pub fn surface_zones(&self) -> &[SurfaceZone] {
        &self.surface_zones
    }

    pub fn noise_zones(&self) -> &[NoiseZone] {
        &self.noise_zones
    }

    pub fn width_zones(&self) -> &[WidthZone] {
        &self.width_zones
    }

    pub fn speed_zones(&self) -> &[SpeedZone] {
        &self.speed_zones
    }

    /// Merged markers in route coordinates.
    pub fn markers(&self) -> &[TrackMarker] {
        &self.markers
    }
}
