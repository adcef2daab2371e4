//! # Per-edge attribute zones
//!
//! An edge profile layers scalar attributes over an edge's arc length:
//! surface, noise, width, and speed limit, plus point markers. Each zone
//! list is evaluated by a linear first-match scan over half-open
//! `[start_s, end_s)` ranges; anything not covered falls back to the
//! profile default. Lists are short (hand-authored), so no index is kept.

use serde::{Deserialize, Serialize};

use crate::{Ambience, NoiseKind, Surface, Weather};

/// Surface override over `[start_s, end_s)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceZone {
    pub start_s: f64,
    pub end_s: f64,
    pub surface: Surface,
}

/// Noise emitter over `[start_s, end_s)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseZone {
    pub start_s: f64,
    pub end_s: f64,
    pub noise: NoiseKind,
}

/// Width override over `[start_s, end_s)`, with per-side shoulders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthZone {
    pub start_s: f64,
    pub end_s: f64,
    pub width_m: f64,
    pub shoulder_left_m: f64,
    pub shoulder_right_m: f64,
}

/// Speed limit over `[start_s, end_s)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedZone {
    pub start_s: f64,
    pub end_s: f64,
    pub max_speed_kph: f64,
}

/// A named point cue on the edge's arc length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMarker {
    pub name: String,
    pub position_s: f64,
}

/// Scalar attribute layers of a single edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeProfile {
    pub default_surface: Surface,
    pub default_noise: NoiseKind,
    pub default_width_m: f64,
    pub weather: Weather,
    pub ambience: Ambience,
    pub surface_zones: Vec<SurfaceZone>,
    pub noise_zones: Vec<NoiseZone>,
    pub width_zones: Vec<WidthZone>,
    pub speed_zones: Vec<SpeedZone>,
    pub markers: Vec<TrackMarker>,
}

impl EdgeProfile {
    pub fn new(default_surface: Surface, default_noise: NoiseKind, default_width_m: f64) -> Self {
        Self {
            default_surface,
            default_noise,
            default_width_m,
            weather: Weather::default(),
            ambience: Ambience::default(),
            surface_zones: Vec::new(),
            noise_zones: Vec::new(),
            width_zones: Vec::new(),
            speed_zones: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Surface at local offset `s`: first matching zone, else the default.
    pub fn surface_at(&self, s: f64) -> Surface {
        self.surface_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map_or(self.default_surface, |z| z.surface)
    }

    /// Noise at local offset `s`: first matching zone, else the default.
    pub fn noise_at(&self, s: f64) -> NoiseKind {
        self.noise_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map_or(self.default_noise, |z| z.noise)
    }

    /// Drivable width at local offset `s`.
    pub fn width_at(&self, s: f64) -> f64 {
        self.width_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map_or(self.default_width_m, |z| z.width_m)
    }

    /// Speed limit at local offset `s`, if any zone imposes one.
    pub fn try_speed_limit(&self, s: f64) -> Option<f64> {
        self.speed_zones
            .iter()
            .find(|z| zone_contains(z.start_s, z.end_s, s))
            .map(|z| z.max_speed_kph)
    }
}

/// Half-open zone membership: `start <= s < end`.
#[inline]
pub(crate) fn zone_contains(start_s: f64, end_s: f64, s: f64) -> bool {
    s >= start_s && s < end_s
}
