//! # track-legacy
//!
//! Loader for the legacy whitespace-delimited integer track format, the
//! text files the original generation of audio racing tracks shipped in:
//!
//! ```text
//! # comment                  (';' also starts a comment)
//! name = Harbour Loop        (also `trackname =` / `title:`)
//! <type> <surface> <noise> <length>
//! <type> <surface> <length>
//! -1
//! <weather> <ambience>
//! ```
//!
//! Records are 3 or 4 integers: a record is 4 ints iff its third int is
//! below the legacy minimum part length (5000 legacy units, 1/100 m each);
//! otherwise the third int is the length and the noise is implicit.
//! A `type` of 9 or more encodes a noise-only straight (`noise = type − 8`,
//! `type = 0`). A negative sentinel ends the segment list; two further
//! ints pick the weather and ambience. Out-of-range discrete values clamp
//! to 0 and lengths are floored at 5000 legacy units, with a warning.
//!
//! Decoding is two-pass: a count pass sizes and checks the record stream,
//! the decode pass then materialises the segments. The decoded track
//! builds a one-edge loop [`TrackLayout`].

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use track_model::{
    Ambience, EdgeProfile, GeometrySpan, GeometrySpec, Graph, GraphEdge, LayoutError, NoiseKind,
    NoiseZone, Portal, PortalManager, PrimaryRoute, RoadKind, Surface, SurfaceZone, TrackLayout,
    TrackMetadata, Weather,
};

/// Shortest representable part, in legacy 1/100 m units (50 m).
pub const LEGACY_MIN_PART_LENGTH: i64 = 5000;

/// Legacy lengths are hundredths of a meter.
pub const LEGACY_UNITS_PER_METER: f64 = 100.0;

/// Track width of legacy courses, which carried none of their own.
const DEFAULT_TRACK_WIDTH_M: f64 = 10.0;

const RECOGNISED_NAME_KEYS: [&str; 3] = ["name", "trackname", "title"];

#[derive(Debug, Error)]
pub enum LegacyTrackError {
    #[error("failed to read track file")]
    Io(#[from] std::io::Error),
    #[error("invalid token {token:?} on line {line}")]
    InvalidToken { token: String, line: usize },
    #[error("record starting at value {index} is truncated")]
    TruncatedRecord { index: usize },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// One decoded part of the course.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacySegment {
    pub kind: RoadKind,
    pub surface: Surface,
    pub noise: NoiseKind,
    pub length_m: f64,
}

/// A decoded legacy track file.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyTrack {
    pub name: Option<String>,
    pub segments: Vec<LegacySegment>,
    pub weather: Weather,
    pub ambience: Ambience,
}

impl LegacyTrack {
    /// The track an empty or missing file decodes to: a single 50 m
    /// straight under clear skies.
    pub fn fallback() -> Self {
        Self {
            name: None,
            segments: vec![LegacySegment {
                kind: RoadKind::Straight,
                surface: Surface::default(),
                noise: NoiseKind::default(),
                length_m: 50.0,
            }],
            weather: Weather::Sunny,
            ambience: Ambience::NoAmbience,
        }
    }

    /// Parses the text form of a legacy track.
    ///
    /// Tolerates comments and metadata lines anywhere; an empty stream
    /// yields [`LegacyTrack::fallback`].
    pub fn parse(text: &str) -> Result<Self, LegacyTrackError> {
        let (name, ints) = tokenize(text)?;
        if ints.is_empty() {
            debug!("empty track stream, using the fallback course");
            return Ok(Self {
                name,
                ..Self::fallback()
            });
        }

        // Count pass: walk the record stream, checking that every record
        // is complete before the sentinel.
        let mut index = 0;
        let mut record_count = 0usize;
        while index < ints.len() && ints[index] >= 0 {
            if index + 2 >= ints.len() {
                return Err(LegacyTrackError::TruncatedRecord { index });
            }
            let record_len = if ints[index + 2] < LEGACY_MIN_PART_LENGTH { 4 } else { 3 };
            if index + record_len > ints.len() {
                return Err(LegacyTrackError::TruncatedRecord { index });
            }
            index += record_len;
            record_count += 1;
        }
        let sentinel = index;

        // Decode pass.
        let mut segments = Vec::with_capacity(record_count);
        let mut index = 0;
        while index < sentinel {
            let type_raw = ints[index];
            let surface_raw = ints[index + 1];
            let (mut noise_raw, length_raw, record_len) =
                if ints[index + 2] < LEGACY_MIN_PART_LENGTH {
                    (ints[index + 2], ints[index + 3], 4)
                } else {
                    (0, ints[index + 2], 3)
                };
            let mut kind_raw = type_raw;
            if record_len == 3 && type_raw >= 9 {
                // Noise-only straights are packed into the type column.
                noise_raw = type_raw - 8;
                kind_raw = 0;
            }

            let length_legacy = if length_raw < LEGACY_MIN_PART_LENGTH {
                warn!(length_raw, "legacy length below minimum, raising to 5000");
                LEGACY_MIN_PART_LENGTH
            } else {
                length_raw
            };

            segments.push(LegacySegment {
                kind: clamp_discrete(kind_raw, "type"),
                surface: clamp_discrete(surface_raw, "surface"),
                noise: clamp_discrete(noise_raw, "noise"),
                length_m: length_legacy as f64 / LEGACY_UNITS_PER_METER,
            });
            index += record_len;
        }

        // Two trailing ints after the sentinel pick weather and ambience.
        let weather = clamp_discrete(ints.get(sentinel + 1).copied().unwrap_or(0), "weather");
        let ambience = clamp_discrete(ints.get(sentinel + 2).copied().unwrap_or(0), "ambience");

        if segments.is_empty() {
            debug!("track stream holds no segments, using the fallback course");
            segments = Self::fallback().segments;
        }
        debug!(segments = segments.len(), ?weather, ?ambience, "legacy track decoded");
        Ok(Self {
            name,
            segments,
            weather,
            ambience,
        })
    }

    /// Reads and parses a track file. A missing file is not an error: it
    /// decodes to the fallback course, like an empty one.
    pub fn load(path: &Path) -> Result<Self, LegacyTrackError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "track file missing, using the fallback course");
                Ok(Self::fallback())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Assembles the decoded segments into a one-edge loop layout.
    ///
    /// Every segment becomes one straight span annotated with the
    /// segment's curve class; surfaces and noises that differ from the
    /// defaults become zones over the segment's range.
    pub fn build_layout(&self) -> Result<TrackLayout, LayoutError> {
        let default_surface = Surface::default();
        let default_noise = NoiseKind::default();

        let mut spans = Vec::with_capacity(self.segments.len());
        let mut profile = EdgeProfile::new(default_surface, default_noise, DEFAULT_TRACK_WIDTH_M);
        profile.weather = self.weather;
        profile.ambience = self.ambience;

        let mut s = 0.0;
        for segment in &self.segments {
            let mut span = GeometrySpan::straight(segment.length_m);
            span.curve_direction = Some(segment.kind.direction());
            span.curve_severity = segment.kind.severity();
            spans.push(span);

            let end_s = s + segment.length_m;
            if segment.surface != default_surface {
                profile.surface_zones.push(SurfaceZone {
                    start_s: s,
                    end_s,
                    surface: segment.surface,
                });
            }
            if segment.noise != default_noise {
                profile.noise_zones.push(NoiseZone {
                    start_s: s,
                    end_s,
                    noise: segment.noise,
                });
            }
            s = end_s;
        }

        let mut portals = PortalManager::new();
        portals.register_portal(Portal::new(
            "start-finish",
            "circuit",
            track_model::spatial::planar(0.0, 0.0),
            DEFAULT_TRACK_WIDTH_M,
        ))?;
        let graph = Graph::new(
            portals,
            vec![GraphEdge {
                id: "circuit".into(),
                from_portal_id: "start-finish".into(),
                to_portal_id: "start-finish".into(),
                geometry: GeometrySpec::new(spans, true),
                profile,
            }],
            PrimaryRoute {
                edge_ids: vec!["circuit".into()],
                is_loop: true,
            },
        )?;
        TrackLayout::new(
            graph,
            self.weather,
            self.ambience,
            default_surface,
            default_noise,
            DEFAULT_TRACK_WIDTH_M,
            TrackMetadata {
                name: self.name.clone().unwrap_or_default(),
                ..TrackMetadata::default()
            },
            Vec::new(),
        )
    }

    /// Convenience: [`LegacyTrack::load`] followed by
    /// [`LegacyTrack::build_layout`].
    pub fn load_layout(path: &Path) -> Result<TrackLayout, LegacyTrackError> {
        Ok(Self::load(path)?.build_layout()?)
    }
}

/// Splits the text into the track name (from metadata lines) and the
/// integer stream, dropping comments.
fn tokenize(text: &str) -> Result<(Option<String>, Vec<i64>), LegacyTrackError> {
    let mut name = None;
    let mut ints = Vec::new();
    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line
            .split(['#', ';'])
            .next()
            .unwrap_or_default()
            .trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(['=', ':']) {
            let key = key.trim().to_ascii_lowercase();
            if RECOGNISED_NAME_KEYS.contains(&key.as_str()) {
                name = Some(value.trim().to_owned());
            } else {
                warn!(key = %key, line = line_no + 1, "unrecognised metadata key skipped");
            }
            continue;
        }
        for token in line.split_whitespace() {
            let value = token
                .parse::<i64>()
                .map_err(|_| LegacyTrackError::InvalidToken {
                    token: token.to_owned(),
                    line: line_no + 1,
                })?;
            ints.push(value);
        }
    }
    Ok((name, ints))
}

/// Decodes a discrete legacy value, clamping anything out of range to the
/// enum's 0 variant.
fn clamp_discrete<T: TryFrom<u8> + Default>(raw: i64, field: &'static str) -> T {
    match u8::try_from(raw).ok().and_then(|v| T::try_from(v).ok()) {
        Some(value) => value,
        None => {
            warn!(field, raw, "out-of-range value clamped to 0");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn two_record_track_with_weather() {
        let track = LegacyTrack::parse("1 2 0 6000 2 3 7000 -1 1 0").unwrap();
        assert_eq!(
            track.segments,
            vec![
                LegacySegment {
                    kind: RoadKind::EasyLeft,
                    surface: Surface::Sand,
                    noise: NoiseKind::NoNoise,
                    length_m: 60.0,
                },
                LegacySegment {
                    kind: RoadKind::Left,
                    surface: Surface::Dirt,
                    noise: NoiseKind::NoNoise,
                    length_m: 70.0,
                },
            ]
        );
        assert_eq!(track.weather, Weather::Rain);
        assert_eq!(track.ambience, Ambience::NoAmbience);
    }

    #[test]
    fn four_int_records_carry_noise() {
        let track = LegacyTrack::parse("0 0 7 9000 -1 0 0").unwrap();
        assert_eq!(track.segments[0].noise, NoiseKind::Thunder);
        assert!((track.segments[0].length_m - 90.0).abs() < 1e-12);
    }

    #[test]
    fn high_types_encode_noise_only_straights() {
        // type 10 → noise = 10 − 8 = River, straight road.
        let track = LegacyTrack::parse("10 1 6000 -1").unwrap();
        assert_eq!(
            track.segments,
            vec![LegacySegment {
                kind: RoadKind::Straight,
                surface: Surface::Gravel,
                noise: NoiseKind::River,
                length_m: 60.0,
            }]
        );
    }

    #[test]
    fn out_of_range_values_clamp_to_zero() {
        let track = LegacyTrack::parse("1 9 30 6000 -1 7 -3").unwrap();
        assert_eq!(track.segments[0].surface, Surface::Asphalt);
        assert_eq!(track.segments[0].noise, NoiseKind::NoNoise);
        assert_eq!(track.weather, Weather::Sunny);
        assert_eq!(track.ambience, Ambience::NoAmbience);
    }

    #[test]
    fn short_lengths_are_floored() {
        let track = LegacyTrack::parse("0 0 0 100 -1").unwrap();
        assert!((track.segments[0].length_m - 50.0).abs() < 1e-12);
    }

    #[test]
    fn comments_and_metadata_are_tolerated() {
        let text = "\
# a legacy course
name = Harbour Loop
unknown = ignored
0 0 6000   ; the pit straight
5 1 0 7500
-1
2 1";
        let track = LegacyTrack::parse(text).unwrap();
        assert_eq!(track.name.as_deref(), Some("Harbour Loop"));
        assert_eq!(track.segments.len(), 2);
        assert_eq!(track.segments[1].kind, RoadKind::EasyRight);
        assert_eq!(track.weather, Weather::Wind);
        assert_eq!(track.ambience, Ambience::Desert);
    }

    #[test]
    fn alternate_name_keys() {
        assert_eq!(
            LegacyTrack::parse("title: Night Run\n-1").unwrap().name.as_deref(),
            Some("Night Run")
        );
        assert_eq!(
            LegacyTrack::parse("TrackName = Dunes\n-1").unwrap().name.as_deref(),
            Some("Dunes")
        );
    }

    #[test]
    fn empty_input_yields_the_fallback_course() {
        let track = LegacyTrack::parse("").unwrap();
        assert_eq!(track, LegacyTrack::fallback());
        // A sentinel with no records also falls back, keeping the weather.
        let track = LegacyTrack::parse("-1 3 2").unwrap();
        assert_eq!(track.segments, LegacyTrack::fallback().segments);
        assert_eq!(track.weather, Weather::Storm);
        assert_eq!(track.ambience, Ambience::Airport);
    }

    #[test]
    fn missing_file_yields_the_fallback_course() {
        let track = LegacyTrack::load(Path::new("/no/such/track.file")).unwrap();
        assert_eq!(track, LegacyTrack::fallback());
    }

    #[test]
    fn truncated_and_malformed_streams_error() {
        assert!(matches!(
            LegacyTrack::parse("1 2"),
            Err(LegacyTrackError::TruncatedRecord { index: 0 })
        ));
        assert!(matches!(
            LegacyTrack::parse("1 2 0"),
            Err(LegacyTrackError::TruncatedRecord { index: 0 })
        ));
        assert!(matches!(
            LegacyTrack::parse("1 2 x 6000"),
            Err(LegacyTrackError::InvalidToken { line: 1, .. })
        ));
    }

    #[test]
    fn layout_assembly_places_zones_per_segment() {
        let layout = LegacyTrack::parse("1 2 0 6000 2 3 7000 -1 1 0")
            .unwrap()
            .build_layout()
            .unwrap();
        assert!((layout.primary_route_length_m() - 130.0).abs() < 1e-12);
        assert!(layout.is_loop());
        assert_eq!(layout.weather(), Weather::Rain);
        assert_eq!(layout.surface_at(30.0), Surface::Sand);
        assert_eq!(layout.surface_at(100.0), Surface::Dirt);
        // The spans carry the decoded curve classes.
        let spans = layout.primary_geometry().spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(
            spans[0].curve_severity,
            Some(track_model::CurveSeverity::Easy)
        );
        assert_eq!(
            spans[1].curve_direction,
            Some(track_model::CurveDirection::Left)
        );
    }

    #[test]
    fn fallback_layout_is_a_minimal_loop() {
        let layout = LegacyTrack::fallback().build_layout().unwrap();
        assert!((layout.primary_route_length_m() - 50.0).abs() < 1e-12);
        assert_eq!(layout.surface_at(10.0), Surface::Asphalt);
        assert_eq!(layout.noise_at(10.0), NoiseKind::NoNoise);
    }

    proptest! {
        // In-range 4-int records with legal lengths survive a round trip
        // through the text form.
        #[test]
        fn in_range_records_round_trip(
            records in prop::collection::vec(
                (0u8..=8, 0u8..=4, 0u8..=11, 5000i64..=99_999),
                1..12,
            ),
            weather in 0u8..=3,
            ambience in 0u8..=2,
        ) {
            let mut text = String::new();
            for (kind, surface, noise, length) in &records {
                // Noise < 5000 always makes these 4-int records.
                text.push_str(&format!("{kind} {surface} {noise} {length}\n"));
            }
            text.push_str(&format!("-1 {weather} {ambience}\n"));

            let track = LegacyTrack::parse(&text).unwrap();
            prop_assert_eq!(track.segments.len(), records.len());
            for (segment, (kind, surface, noise, length)) in
                track.segments.iter().zip(&records)
            {
                prop_assert_eq!(segment.kind, RoadKind::try_from(*kind).unwrap());
                prop_assert_eq!(segment.surface, Surface::try_from(*surface).unwrap());
                prop_assert_eq!(segment.noise, NoiseKind::try_from(*noise).unwrap());
                prop_assert!((segment.length_m - *length as f64 / 100.0).abs() < 1e-9);
            }
            prop_assert_eq!(track.weather, Weather::try_from(weather).unwrap());
            prop_assert_eq!(track.ambience, Ambience::try_from(ambience).unwrap());
        }
    }
}
