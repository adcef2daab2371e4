//! # The track controller
//!
//! The one stateful piece of the model: a per-driver cursor over a shared
//! [`TrackLayout`]. Each tick the driver's route-s is fed in; the
//! controller resolves the current stretch of road, decides when the next
//! stretch should be announced, and drives the noise fade state machine,
//! emitting fire-and-forget events into an [`AudioSink`].
//!
//! The primary route's flat span array is the controller's segment unit:
//! one span is one announceable stretch of road.

use tracing::debug;

use crate::layout::TrackLayout;
use crate::profile::zone_contains;
use crate::{Ambience, NoiseKind, RoadKind, Surface, Weather};

/// Events handed to the audio collaborator. Failures on the receiving side
/// are invisible to the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioEvent {
    NoiseStarted {
        noise: NoiseKind,
        /// One-shot noises play once per window; the rest loop.
        looped: bool,
        /// Stereo pan, negative = left, `None` = centred.
        pan: Option<f32>,
        position_s: f64,
    },
    NoiseVolume {
        noise: NoiseKind,
        volume: f32,
    },
    NoiseStopped {
        noise: NoiseKind,
    },
    WeatherStarted(Weather),
    AmbienceStarted(Ambience),
}

/// Receiver of controller audio events.
pub trait AudioSink {
    fn handle(&mut self, event: AudioEvent);
}

/// Discards every event. Useful for oracle queries and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn handle(&mut self, _event: AudioEvent) {}
}

/// Lookahead strategy for [`TrackController::next_road`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceMode {
    /// Announce when the segment boundary falls inside the window swept
    /// since the previous tick, shifted forward by the call length.
    Boundary,
    /// Announce the segment found `call_length + speed/2` meters ahead,
    /// at most once per segment.
    Adaptive,
}

/// Controller tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// How far ahead of the driver announcements are aimed, meters.
    pub call_length_m: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { call_length_m: 50.0 }
    }
}

/// What the driver is on right now, in announcement terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Road {
    /// Left road edge relative to the centreline (negative).
    pub left_m: f64,
    /// Right road edge relative to the centreline (positive).
    pub right_m: f64,
    pub surface: Surface,
    pub kind: RoadKind,
    /// Length of the whole segment, meters.
    pub length_m: f64,
}

/// Per-driver stateful cursor over a layout.
///
/// Strictly single-owner: every driver holds their own controller, and
/// within one controller the update methods are expected to be called
/// sequentially each tick (`road_at_position`, then `next_road`/`run`).
#[derive(Debug)]
pub struct TrackController<'a, S: AudioSink> {
    layout: &'a TrackLayout,
    sink: &'a mut S,
    config: ControllerConfig,
    lap_distance_m: f64,
    segment_index: usize,
    rel_s: f64,
    prev_rel_s: f64,
    last_announced: Option<usize>,
    current_noise: Option<NoiseKind>,
    noise_window: (f64, f64),
    noise_playing: bool,
}

impl<'a, S: AudioSink> TrackController<'a, S> {
    pub fn new(layout: &'a TrackLayout, sink: &'a mut S) -> Self {
        Self::with_config(layout, sink, ControllerConfig::default())
    }

    pub fn with_config(layout: &'a TrackLayout, sink: &'a mut S, config: ControllerConfig) -> Self {
        Self {
            layout,
            sink,
            config,
            lap_distance_m: layout.primary_route_length_m(),
            segment_index: 0,
            rel_s: 0.0,
            prev_rel_s: 0.0,
            last_announced: None,
            current_noise: None,
            noise_window: (0.0, 0.0),
            noise_playing: false,
        }
    }

    /// Resets the cursor and starts the track-wide looping sounds.
    ///
    /// Weather and ambience events are skipped when there is nothing to
    /// loop (`Sunny` / `NoAmbience`).
    pub fn initialize(&mut self) {
        self.stop_noise();
        self.lap_distance_m = self.layout.primary_route_length_m();
        self.segment_index = 0;
        self.rel_s = 0.0;
        self.prev_rel_s = 0.0;
        self.last_announced = None;
        self.current_noise = None;
        self.noise_window = (0.0, 0.0);

        if self.layout.weather() != Weather::Sunny {
            self.sink.handle(AudioEvent::WeatherStarted(self.layout.weather()));
        }
        if self.layout.ambience() != Ambience::NoAmbience {
            self.sink
                .handle(AudioEvent::AmbienceStarted(self.layout.ambience()));
        }
        debug!(lap_distance_m = self.lap_distance_m, "controller initialized");
    }

    pub fn lap_distance_m(&self) -> f64 {
        self.lap_distance_m
    }

    /// Current road at `s`, advancing the cursor.
    pub fn road_at_position(&mut self, s: f64) -> Road {
        let s = self.layout.normalize_s(s);
        let geometry = self.layout.primary_geometry();
        let index = geometry.span_index_at(s);
        self.prev_rel_s = self.rel_s;
        self.rel_s = s - geometry.span_start(index);
        self.segment_index = index;
        self.road_at(s, index)
    }

    /// Current road at `s` without touching the cursor. Oracle queries
    /// (AI drivers, spectators) go through here.
    pub fn road_computer(&self, s: f64) -> Road {
        let s = self.layout.normalize_s(s);
        let index = self.layout.primary_geometry().span_index_at(s);
        self.road_at(s, index)
    }

    /// Announcement lookahead. Returns the road to announce, if the chosen
    /// mode decided this tick is the moment.
    pub fn next_road(&mut self, s: f64, speed_mps: f64, mode: AnnounceMode) -> Option<Road> {
        match mode {
            AnnounceMode::Boundary => self.next_road_boundary(),
            AnnounceMode::Adaptive => self.next_road_adaptive(s, speed_mps),
        }
    }

    /// Emits the next segment when the current segment's end falls within
    /// `(prev_rel_s + call, rel_s + call]`.
    fn next_road_boundary(&mut self) -> Option<Road> {
        let geometry = self.layout.primary_geometry();
        let boundary = geometry.spans()[self.segment_index].length_m;
        let lo = self.prev_rel_s + self.config.call_length_m;
        let hi = self.rel_s + self.config.call_length_m;
        if hi < lo || boundary <= lo || boundary > hi {
            return None;
        }
        let next = self.segment_index + 1;
        let next = if next < geometry.span_count() {
            next
        } else if self.layout.is_loop() {
            0
        } else {
            return None;
        };
        Some(self.road_for_segment(next))
    }

    /// Emits the segment found `call + speed/2` ahead of `s`, at most once,
    /// and only for a forward move. The half-route limit keeps a loop from
    /// announcing backwards.
    fn next_road_adaptive(&mut self, s: f64, speed_mps: f64) -> Option<Road> {
        let geometry = self.layout.primary_geometry();
        let count = geometry.span_count();
        let lookahead = self.config.call_length_m + speed_mps / 2.0;
        let target = geometry.span_index_at(s + lookahead);
        let baseline = self.last_announced.unwrap_or(self.segment_index);
        let delta = if self.layout.is_loop() {
            (target + count - baseline) % count
        } else {
            target.saturating_sub(baseline)
        };
        if delta == 0 || (self.layout.is_loop() && delta * 2 > count) {
            return None;
        }
        self.last_announced = Some(target);
        Some(self.road_for_segment(target))
    }

    /// The noise sub-state machine: {Idle, Playing}.
    ///
    /// Idle→Playing when `noise_at(s)` becomes a real noise; the window is
    /// the containing noise zone (or the whole lap when the default noise
    /// matches). Playing→Idle when `s` leaves the window or the noise
    /// value changes. While playing, the volume follows a triangular
    /// envelope over the window. Transitions are idempotent.
    pub fn run(&mut self, s: f64) {
        let s = self.layout.normalize_s(s);
        let noise = self.layout.noise_at(s);

        if self.current_noise != Some(noise) {
            self.stop_noise();
            self.current_noise = Some(noise);
            if noise != NoiseKind::NoNoise {
                self.noise_window = self.noise_window_at(s);
                self.sink.handle(AudioEvent::NoiseStarted {
                    noise,
                    looped: !noise.is_one_shot(),
                    pan: noise.pan(),
                    position_s: s,
                });
                self.noise_playing = true;
                debug!(?noise, window = ?self.noise_window, "noise window entered");
            }
        } else if self.noise_playing {
            let (start, end) = self.noise_window;
            if !zone_contains(start, end, s) {
                self.stop_noise();
            }
        }

        if self.noise_playing {
            let (start, end) = self.noise_window;
            let window = end - start;
            if window > 0.0 {
                let u = (s - start) / window;
                let factor = u.min(1.0 - u).max(0.0) * 2.0;
                self.sink.handle(AudioEvent::NoiseVolume {
                    noise,
                    volume: (0.8 + 0.2 * factor) as f32,
                });
            }
        }
    }

    /// Stops any playing noise source. Call before dropping the
    /// controller; audio handles must not outlive their owner.
    pub fn shutdown(&mut self) {
        self.stop_noise();
    }

    fn stop_noise(&mut self) {
        if self.noise_playing {
            if let Some(noise) = self.current_noise {
                self.sink.handle(AudioEvent::NoiseStopped { noise });
            }
            self.noise_playing = false;
        }
    }

    /// The first noise zone containing `s`, else the whole lap (the
    /// default noise is in effect everywhere no zone overrides it).
    fn noise_window_at(&self, s: f64) -> (f64, f64) {
        self.layout
            .noise_zones()
            .iter()
            .find(|zone| zone_contains(zone.start_s, zone.end_s, s))
            .map_or((0.0, self.lap_distance_m), |zone| (zone.start_s, zone.end_s))
    }

    fn road_at(&self, s: f64, segment_index: usize) -> Road {
        let span = &self.layout.primary_geometry().spans()[segment_index];
        let width = self.layout.width_at(s);
        Road {
            left_m: -width / 2.0,
            right_m: width / 2.0,
            surface: self.layout.surface_at(s),
            kind: RoadKind::from_curve(span.curve_direction, span.curve_severity),
            length_m: span.length_m,
        }
    }

    fn road_for_segment(&self, segment_index: usize) -> Road {
        self.road_at(
            self.layout.primary_geometry().span_start(segment_index),
            segment_index,
        )
    }
}
