//! # Layout validation
//!
//! Checks a candidate layout for geometric sanity (radius, slope, bank,
//! curvature continuity) and zone coherence (ranges, widths, overlaps),
//! tiered into warnings and errors. Validation never mutates and never
//! fails: it reports, and the caller decides whether to reject.
//!
//! Four phases run in order: geometry, zones, markers, overlaps. Curvature
//! continuity is checked modularly (span N−1 wraps to span 0), for loops
//! and open routes alike.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{GeometrySpan, SpanKind};
use crate::layout::TrackLayout;
use crate::Severity;

/// Which phase produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSection {
    Geometry,
    Zones,
    Markers,
    Overlaps,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    /// Index into the primary route's flat span array, where applicable.
    pub span_index: Option<usize>,
    pub section: IssueSection,
}

/// Thresholds for every check, with the standard defaults.
///
/// Relaxing any threshold never introduces a new issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Spans shorter than this warn. Meters.
    pub short_span_warning_m: f64,
    /// Radii larger than this warn (the span is effectively straight).
    pub max_radius_warning_m: f64,
    /// Radii smaller than this are errors.
    pub min_radius_error_m: f64,
    pub bank_warning_deg: f64,
    pub bank_error_deg: f64,
    /// Slope `|Δh / length|` as a fraction.
    pub slope_warning: f64,
    pub slope_error: f64,
    /// Curvature discontinuity between neighbouring spans, 1/m.
    pub curvature_jump_warning: f64,
    pub curvature_jump_error: f64,
    pub min_zone_width_warning_m: f64,
    pub min_zone_width_error_m: f64,
    /// Clothoid length-to-mean-radius ratio bounds (warnings).
    pub clothoid_ratio_min: f64,
    pub clothoid_ratio_max: f64,
    pub min_speed_limit_warning_kph: f64,
    pub min_total_length_warning_m: f64,
    /// When false, overlapping zones within one list warn pair-wise.
    pub allow_zone_overlap: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            short_span_warning_m: 5.0,
            max_radius_warning_m: 20_000.0,
            min_radius_error_m: 15.0,
            bank_warning_deg: 8.0,
            bank_error_deg: 15.0,
            slope_warning: 0.06,
            slope_error: 0.12,
            curvature_jump_warning: 0.005,
            curvature_jump_error: 0.01,
            min_zone_width_warning_m: 8.0,
            min_zone_width_error_m: 6.0,
            clothoid_ratio_min: 0.1,
            clothoid_ratio_max: 3.0,
            min_speed_limit_warning_kph: 20.0,
            min_total_length_warning_m: 200.0,
            allow_zone_overlap: false,
        }
    }
}

/// The outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// A layout is valid iff nothing reached error severity.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }
}

struct Collector {
    issues: Vec<Issue>,
}

impl Collector {
    fn warn(&mut self, section: IssueSection, span_index: Option<usize>, message: String) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            message,
            span_index,
            section,
        });
    }

    fn error(&mut self, section: IssueSection, span_index: Option<usize>, message: String) {
        self.issues.push(Issue {
            severity: Severity::Error,
            message,
            span_index,
            section,
        });
    }
}

/// Validates a layout against the given thresholds.
pub fn validate(layout: &TrackLayout, options: &ValidationOptions) -> ValidationReport {
    let mut out = Collector { issues: Vec::new() };
    check_geometry(layout, options, &mut out);
    check_zones(layout, options, &mut out);
    check_markers(layout, options, &mut out);
    if !options.allow_zone_overlap {
        check_overlaps(layout, &mut out);
    }
    debug!(
        issues = out.issues.len(),
        errors = out.issues.iter().filter(|i| i.severity == Severity::Error).count(),
        "validation complete"
    );
    ValidationReport { issues: out.issues }
}

/// Radii carried by a span's kind, for radius and spacing checks.
fn span_radii(span: &GeometrySpan) -> Vec<f64> {
    match span.kind {
        SpanKind::Straight => Vec::new(),
        SpanKind::Arc { radius_m } => vec![radius_m.abs()],
        SpanKind::Clothoid {
            start_radius_m,
            end_radius_m,
        } => vec![start_radius_m.abs(), end_radius_m.abs()],
    }
}

fn check_geometry(layout: &TrackLayout, options: &ValidationOptions, out: &mut Collector) {
    const SECTION: IssueSection = IssueSection::Geometry;
    // Arc curvature must match 1/R to within this tolerance.
    const CURVATURE_TOLERANCE: f64 = 1e-6;

    let spans = layout.primary_geometry().spans();
    for (index, span) in spans.iter().enumerate() {
        let at = Some(index);
        if span.length_m < options.short_span_warning_m {
            out.warn(SECTION, at, format!("span is short ({} m)", span.length_m));
        }

        match span.kind {
            SpanKind::Straight => {
                if span.start_curvature != 0.0 || span.end_curvature != 0.0 {
                    out.error(SECTION, at, format!(
                        "straight span carries non-zero curvature ({} .. {})",
                        span.start_curvature, span.end_curvature
                    ));
                }
            }
            SpanKind::Arc { radius_m } => {
                let expected = 1.0 / radius_m.abs();
                if (span.start_curvature - span.end_curvature).abs() > CURVATURE_TOLERANCE
                    || (span.start_curvature.abs() - expected).abs() > CURVATURE_TOLERANCE
                {
                    out.error(SECTION, at, format!(
                        "arc curvature ({} .. {}) inconsistent with radius {radius_m} m",
                        span.start_curvature, span.end_curvature
                    ));
                }
            }
            SpanKind::Clothoid {
                start_radius_m,
                end_radius_m,
            } => {
                if start_radius_m.is_finite() && end_radius_m.is_finite() {
                    let mean_radius = (start_radius_m.abs() + end_radius_m.abs()) / 2.0;
                    let ratio = span.length_m / mean_radius;
                    if ratio < options.clothoid_ratio_min || ratio > options.clothoid_ratio_max {
                        out.warn(SECTION, at, format!(
                            "clothoid length-to-mean-radius ratio {ratio:.3} outside [{}, {}]",
                            options.clothoid_ratio_min, options.clothoid_ratio_max
                        ));
                    }
                }
            }
        }

        for radius in span_radii(span) {
            if radius < options.min_radius_error_m {
                out.error(SECTION, at, format!(
                    "radius {radius} m is below the minimum {} m",
                    options.min_radius_error_m
                ));
            } else if radius > options.max_radius_warning_m {
                out.warn(SECTION, at, format!(
                    "radius {radius} m is implausibly large (> {} m)",
                    options.max_radius_warning_m
                ));
            }
        }

        let bank = span.bank_deg.abs();
        if bank > options.bank_error_deg {
            out.error(SECTION, at, format!(
                "bank {bank}° exceeds the maximum {}°",
                options.bank_error_deg
            ));
        } else if bank > options.bank_warning_deg {
            out.warn(SECTION, at, format!("bank {bank}° is steep (> {}°)", options.bank_warning_deg));
        }

        let slope = (span.elevation_delta_m / span.length_m).abs();
        if slope > options.slope_error {
            out.error(SECTION, at, format!(
                "slope {:.1}% exceeds the maximum {:.1}%",
                slope * 100.0,
                options.slope_error * 100.0
            ));
        } else if slope > options.slope_warning {
            out.warn(SECTION, at, format!(
                "slope {:.1}% is steep (> {:.1}%)",
                slope * 100.0,
                options.slope_warning * 100.0
            ));
        }
    }

    // Neighbour curvature continuity, modular: the last span wraps onto
    // the first for loops and open routes alike.
    let count = spans.len();
    for index in 0..count {
        let next = (index + 1) % count;
        let jump = (spans[index].end_curvature - spans[next].start_curvature).abs();
        if jump > options.curvature_jump_error {
            out.error(SECTION, Some(index), format!(
                "curvature jumps by {jump:.4} 1/m into span {next}"
            ));
        } else if jump > options.curvature_jump_warning {
            out.warn(SECTION, Some(index), format!(
                "curvature jumps by {jump:.4} 1/m into span {next}"
            ));
        }
    }

    let total = layout.primary_route_length_m();
    if total < options.min_total_length_warning_m {
        out.warn(SECTION, None, format!(
            "track is only {total} m long (< {} m)",
            options.min_total_length_warning_m
        ));
    }

    // Sampling must resolve the tightest curve.
    let min_radius = spans
        .iter()
        .flat_map(span_radii)
        .filter(|r| r.is_finite())
        .fold(f64::INFINITY, f64::min);
    if min_radius.is_finite() {
        let spacing = layout.primary_geometry().sample_spacing_m();
        if spacing > min_radius / 2.0 {
            out.error(SECTION, None, format!(
                "sample spacing {spacing} m exceeds half the minimum radius ({min_radius} m)"
            ));
        } else if spacing > min_radius / 4.0 {
            out.warn(SECTION, None, format!(
                "sample spacing {spacing} m exceeds a quarter of the minimum radius ({min_radius} m)"
            ));
        }
    }
}

fn check_zone_range(
    name: &str,
    start_s: f64,
    end_s: f64,
    track_length: f64,
    out: &mut Collector,
) {
    const SECTION: IssueSection = IssueSection::Zones;
    if !start_s.is_finite() || !end_s.is_finite() {
        out.error(SECTION, None, format!("{name} zone has a non-finite range"));
        return;
    }
    if start_s < 0.0 || end_s < 0.0 {
        out.error(SECTION, None, format!(
            "{name} zone [{start_s}, {end_s}) has a negative bound"
        ));
    }
    if end_s < start_s {
        out.error(SECTION, None, format!(
            "{name} zone [{start_s}, {end_s}) is reversed"
        ));
    }
    if end_s > track_length {
        out.warn(SECTION, None, format!(
            "{name} zone [{start_s}, {end_s}) extends past the track end ({track_length} m)"
        ));
    }
}

fn check_zones(layout: &TrackLayout, options: &ValidationOptions, out: &mut Collector) {
    const SECTION: IssueSection = IssueSection::Zones;
    let length = layout.primary_route_length_m();

    for zone in layout.surface_zones() {
        check_zone_range("surface", zone.start_s, zone.end_s, length, out);
    }
    for zone in layout.noise_zones() {
        check_zone_range("noise", zone.start_s, zone.end_s, length, out);
    }
    for zone in layout.width_zones() {
        check_zone_range("width", zone.start_s, zone.end_s, length, out);
        if zone.width_m < options.min_zone_width_error_m {
            out.error(SECTION, None, format!(
                "width zone [{}, {}) is only {} m wide (< {} m)",
                zone.start_s, zone.end_s, zone.width_m, options.min_zone_width_error_m
            ));
        } else if zone.width_m < options.min_zone_width_warning_m {
            out.warn(SECTION, None, format!(
                "width zone [{}, {}) is narrow ({} m)",
                zone.start_s, zone.end_s, zone.width_m
            ));
        }
    }
    for zone in layout.speed_zones() {
        check_zone_range("speed", zone.start_s, zone.end_s, length, out);
        if zone.max_speed_kph < options.min_speed_limit_warning_kph {
            out.warn(SECTION, None, format!(
                "speed limit {} kph in [{}, {}) is unusually low",
                zone.max_speed_kph, zone.start_s, zone.end_s
            ));
        }
    }
}

fn check_markers(layout: &TrackLayout, _options: &ValidationOptions, out: &mut Collector) {
    const SECTION: IssueSection = IssueSection::Markers;
    let length = layout.primary_route_length_m();
    for marker in layout.markers() {
        if marker.position_s < 0.0 || !marker.position_s.is_finite() {
            out.error(SECTION, None, format!(
                "marker {:?} has invalid position {}",
                marker.name, marker.position_s
            ));
        } else if marker.position_s > length {
            out.warn(SECTION, None, format!(
                "marker {:?} at {} m lies past the track end ({length} m)",
                marker.name, marker.position_s
            ));
        }
    }
}

fn check_overlaps(layout: &TrackLayout, out: &mut Collector) {
    check_overlap_list(
        "surface",
        layout.surface_zones().iter().map(|z| (z.start_s, z.end_s)),
        out,
    );
    check_overlap_list(
        "noise",
        layout.noise_zones().iter().map(|z| (z.start_s, z.end_s)),
        out,
    );
    check_overlap_list(
        "width",
        layout.width_zones().iter().map(|z| (z.start_s, z.end_s)),
        out,
    );
    check_overlap_list(
        "speed",
        layout.speed_zones().iter().map(|z| (z.start_s, z.end_s)),
        out,
    );
}

fn check_overlap_list(
    name: &str,
    ranges: impl Iterator<Item = (f64, f64)>,
    out: &mut Collector,
) {
    let sorted = ranges.sorted_by(|a, b| a.0.total_cmp(&b.0));
    for (prev, next) in sorted.tuple_windows() {
        if prev.1 > next.0 {
            out.warn(IssueSection::Overlaps, None, format!(
                "{name} zones [{}, {}) and [{}, {}) overlap",
                prev.0, prev.1, next.0, next.1
            ));
        }
    }
}
