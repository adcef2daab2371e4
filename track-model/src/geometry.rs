//! # Linear track geometry
//!
//! A course is a sequence of arc-length-parameterised spans: straights,
//! constant-curvature arcs, and clothoids whose curvature interpolates
//! linearly. Building a [`GeometrySpec`] accumulates a cumulative
//! span-start table and the pose at every span start; sampling an
//! arbitrary `s` binary-searches that table and integrates within the
//! span.
//!
//! Conventions: world x is east, z is north, y is elevation. Headings are
//! clockwise from north; signed curvature is 1/m with positive values
//! turning right (heading increasing).

use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::{CurveDirection, CurveSeverity, LayoutError};

/// Shape family of a span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpanKind {
    Straight,
    Arc { radius_m: f64 },
    Clothoid { start_radius_m: f64, end_radius_m: f64 },
}

/// One piece of 1-D geometry with monotone curvature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySpan {
    pub kind: SpanKind,
    pub length_m: f64,
    /// Signed curvature at the span start (1/m, positive = right).
    pub start_curvature: f64,
    pub end_curvature: f64,
    pub bank_deg: f64,
    pub elevation_delta_m: f64,
    pub curve_severity: Option<CurveSeverity>,
    pub curve_direction: Option<CurveDirection>,
}

impl GeometrySpan {
    /// A flat straight of the given length.
    pub fn straight(length_m: f64) -> Self {
        Self {
            kind: SpanKind::Straight,
            length_m,
            start_curvature: 0.0,
            end_curvature: 0.0,
            bank_deg: 0.0,
            elevation_delta_m: 0.0,
            curve_severity: None,
            curve_direction: Some(CurveDirection::Straight),
        }
    }

    /// A constant-radius arc. The curvature sign follows `direction`.
    pub fn arc(length_m: f64, radius_m: f64, direction: CurveDirection) -> Self {
        let curvature = match direction {
            CurveDirection::Right => 1.0 / radius_m,
            CurveDirection::Left => -1.0 / radius_m,
            CurveDirection::Straight => 0.0,
        };
        Self {
            kind: SpanKind::Arc { radius_m },
            length_m,
            start_curvature: curvature,
            end_curvature: curvature,
            bank_deg: 0.0,
            elevation_delta_m: 0.0,
            curve_severity: None,
            curve_direction: Some(direction),
        }
    }

    /// A clothoid blending between two radii. The curvature sign follows
    /// `direction` on both ends.
    pub fn clothoid(
        length_m: f64,
        start_radius_m: f64,
        end_radius_m: f64,
        direction: CurveDirection,
    ) -> Self {
        let sign = match direction {
            CurveDirection::Right => 1.0,
            CurveDirection::Left => -1.0,
            CurveDirection::Straight => 0.0,
        };
        Self {
            kind: SpanKind::Clothoid {
                start_radius_m,
                end_radius_m,
            },
            length_m,
            start_curvature: sign / start_radius_m,
            end_curvature: sign / end_radius_m,
            bank_deg: 0.0,
            elevation_delta_m: 0.0,
            curve_severity: None,
            curve_direction: Some(direction),
        }
    }

    pub fn with_bank(mut self, bank_deg: f64) -> Self {
        self.bank_deg = bank_deg;
        self
    }

    pub fn with_elevation_delta(mut self, elevation_delta_m: f64) -> Self {
        self.elevation_delta_m = elevation_delta_m;
        self
    }

    pub fn with_curve_class(
        mut self,
        direction: CurveDirection,
        severity: CurveSeverity,
    ) -> Self {
        self.curve_direction = Some(direction);
        self.curve_severity = Some(severity);
        self
    }

    /// Curvature at local offset `u`, linearly interpolated.
    pub fn curvature_at(&self, u: f64) -> f64 {
        if self.length_m <= 0.0 {
            return self.start_curvature;
        }
        let t = (u / self.length_m).clamp(0.0, 1.0);
        self.start_curvature + (self.end_curvature - self.start_curvature) * t
    }

    /// Total heading change over the span in radians.
    ///
    /// Curvature is linear in `u`, so the integral is the trapezoid
    /// `½(κ₀+κ₁)·L`; for an arc this reduces to the signed `L/R`.
    pub fn heading_change_rad(&self) -> f64 {
        0.5 * (self.start_curvature + self.end_curvature) * self.length_m
    }
}

/// Default pose-sampling step for built geometry.
pub const DEFAULT_SAMPLE_SPACING_M: f64 = 1.0;

/// An ordered list of spans plus sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySpec {
    pub spans: Vec<GeometrySpan>,
    pub sample_spacing_m: f64,
    pub is_loop: bool,
}

impl GeometrySpec {
    pub fn new(spans: Vec<GeometrySpan>, is_loop: bool) -> Self {
        Self {
            spans,
            sample_spacing_m: DEFAULT_SAMPLE_SPACING_M,
            is_loop,
        }
    }

    /// Sum of span lengths.
    pub fn length_m(&self) -> f64 {
        self.spans.iter().map(|s| s.length_m).sum()
    }
}

/// A sampled pose on the track.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// World position: x east, y elevation, z north.
    pub position: Vector3<f64>,
    pub forward: Vector3<f64>,
    pub right: Vector3<f64>,
    pub up: Vector3<f64>,
    /// Heading in `[0°, 360°)`, 0° = north, clockwise.
    pub heading_deg: f64,
    /// Signed curvature at this point (1/m, positive = right).
    pub curvature: f64,
}

/// Pose state at a span start, cached during the build.
#[derive(Debug, Clone, Copy)]
struct SpanStartState {
    x: f64,
    z: f64,
    heading_rad: f64,
    elevation_m: f64,
}

/// A geometry spec with its derived sampling tables.
///
/// Construction integrates the whole course once; `pose_at` is then
/// O(log n) in the number of spans plus a bounded within-span
/// re-integration.
#[derive(Debug, Clone)]
pub struct BuiltGeometry {
    spans: Vec<GeometrySpan>,
    /// Cumulative arc length at each span start; `len = spans.len() + 1`,
    /// last entry is the total length.
    span_starts: Vec<f64>,
    start_states: Vec<SpanStartState>,
    sample_spacing_m: f64,
    is_loop: bool,
}

impl BuiltGeometry {
    /// Integrates the spec into a sampleable course.
    pub fn build(spec: &GeometrySpec) -> Result<Self, LayoutError> {
        if spec.spans.is_empty() {
            return Err(LayoutError::EmptySpans);
        }
        if spec.sample_spacing_m <= 0.0 || !spec.sample_spacing_m.is_finite() {
            return Err(LayoutError::NonPositiveSampleSpacing(spec.sample_spacing_m));
        }
        for (index, span) in spec.spans.iter().enumerate() {
            if !(span.length_m > 0.0) || !span.length_m.is_finite() {
                return Err(LayoutError::NonPositiveSpanLength {
                    index,
                    length_m: span.length_m,
                });
            }
        }

        let mut span_starts = Vec::with_capacity(spec.spans.len() + 1);
        let mut start_states = Vec::with_capacity(spec.spans.len() + 1);
        let mut s = 0.0;
        let mut state = SpanStartState {
            x: 0.0,
            z: 0.0,
            heading_rad: 0.0,
            elevation_m: 0.0,
        };
        span_starts.push(s);
        start_states.push(state);
        for span in &spec.spans {
            let (x, z) = advance_planar(state, span, span.length_m, spec.sample_spacing_m);
            state = SpanStartState {
                x,
                z,
                heading_rad: state.heading_rad + span.heading_change_rad(),
                elevation_m: state.elevation_m + span.elevation_delta_m,
            };
            s += span.length_m;
            span_starts.push(s);
            start_states.push(state);
        }

        Ok(Self {
            spans: spec.spans.clone(),
            span_starts,
            start_states,
            sample_spacing_m: spec.sample_spacing_m,
            is_loop: spec.is_loop,
        })
    }

    pub fn total_length_m(&self) -> f64 {
        *self.span_starts.last().expect("at least one span")
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn sample_spacing_m(&self) -> f64 {
        self.sample_spacing_m
    }

    pub fn spans(&self) -> &[GeometrySpan] {
        &self.spans
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Route-s at which span `index` starts.
    pub fn span_start(&self, index: usize) -> f64 {
        self.span_starts[index]
    }

    /// `[start, end)` bounds of span `index` in route coordinates.
    pub fn span_bounds(&self, index: usize) -> (f64, f64) {
        (self.span_starts[index], self.span_starts[index + 1])
    }

    /// Brings `s` into the course domain: wraps modulo the total length on
    /// loops, clamps to `[0, length]` on open courses. Non-finite input
    /// clamps to 0.
    pub fn normalize_s(&self, s: f64) -> f64 {
        let total = self.total_length_m();
        if !s.is_finite() {
            return 0.0;
        }
        if self.is_loop {
            s.rem_euclid(total)
        } else {
            s.clamp(0.0, total)
        }
    }

    /// Index of the span containing `s` (after normalization).
    pub fn span_index_at(&self, s: f64) -> usize {
        let s = self.normalize_s(s);
        let i = self.span_starts.partition_point(|&start| start <= s);
        i.saturating_sub(1).min(self.spans.len() - 1)
    }

    /// Pose at route-s, interpolated within the containing span.
    pub fn pose_at(&self, s: f64) -> Pose {
        let s = self.normalize_s(s);
        let index = self.span_index_at(s);
        let span = &self.spans[index];
        let state = self.start_states[index];
        let u = (s - self.span_starts[index]).clamp(0.0, span.length_m);

        let (x, z) = advance_planar(state, span, u, self.sample_spacing_m);
        let heading_rad = heading_at(state.heading_rad, span, u);
        let elevation = state.elevation_m + span.elevation_delta_m * (u / span.length_m);

        let forward = Vector3::new(heading_rad.sin(), 0.0, heading_rad.cos());
        let mut right = Vector3::new(heading_rad.cos(), 0.0, -heading_rad.sin());
        let mut up = Vector3::y();
        if span.bank_deg != 0.0 {
            let roll =
                Rotation3::from_axis_angle(&Unit::new_normalize(forward), span.bank_deg.to_radians());
            right = roll * right;
            up = roll * up;
        }

        Pose {
            position: Vector3::new(x, elevation, z),
            forward,
            right,
            up,
            heading_deg: crate::spatial::normalize_heading_deg(heading_rad.to_degrees()),
            curvature: span.curvature_at(u),
        }
    }
}

/// Heading at local offset `u` within a span whose curvature is linear:
/// `h(u) = h₀ + κ₀u + (κ₁−κ₀)u²/2L`.
fn heading_at(start_heading_rad: f64, span: &GeometrySpan, u: f64) -> f64 {
    start_heading_rad
        + span.start_curvature * u
        + (span.end_curvature - span.start_curvature) * u * u / (2.0 * span.length_m)
}

/// Advances the planar position from a span start by `u` meters of arc
/// length, using midpoint integration at `spacing` steps.
fn advance_planar(
    state: SpanStartState,
    span: &GeometrySpan,
    u: f64,
    spacing: f64,
) -> (f64, f64) {
    let steps = ((u / spacing).ceil() as usize).max(1);
    let ds = u / steps as f64;
    let mut x = state.x;
    let mut z = state.z;
    for step in 0..steps {
        let mid = (step as f64 + 0.5) * ds;
        let h = heading_at(state.heading_rad, span, mid);
        x += ds * h.sin();
        z += ds * h.cos();
    }
    (x, z)
}
