//! # track-model
//!
//! The track world model of an audio racing simulator: a deterministic,
//! read-mostly description of a race course as a graph of linear geometry
//! spans overlaid with attribute zones (surface, noise, width, speed limit),
//! point markers, portals/links, and planar areas/beacons.
//!
//! The model answers two kinds of queries:
//!
//! - **Linear**: "at curvilinear distance `s` along the primary route, what
//!   are the surface, noise, width, and speed limit? which span am I on?"
//!   See [`TrackLayout`] and [`TrackController`].
//! - **Spatial**: "at world position (x, z) with heading θ, which areas
//!   contain me and which beacons/markers are active?" See [`AreaManager`],
//!   [`BeaconManager`], and [`MarkerManager`].
//!
//! Everything except the per-driver [`TrackController`] is immutable after
//! construction and safe to share across threads.

pub mod area;
pub mod branch;
pub mod controller;
mod error;
pub mod geometry;
pub mod graph;
pub mod layout;
mod metadata;
pub mod portal;
pub mod profile;
pub mod sector;
pub mod shape;
pub mod spatial;
pub mod validator;

pub mod cues;

use enumset::EnumSetType;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

// Pub use for re-export without too many levels of hierarchy.
// Most modules only have a handful of useful definitions,
// so this flattens things for better ergonomics.
pub use area::{Area, AreaManager};
pub use branch::{Approach, Branch, BranchExit, BranchManager};
pub use controller::{
    AnnounceMode, AudioEvent, AudioSink, ControllerConfig, NullSink, Road, TrackController,
};
pub use error::LayoutError;
pub use geometry::{BuiltGeometry, GeometrySpan, GeometrySpec, Pose, SpanKind};
pub use graph::{Graph, GraphEdge, PrimaryRoute};
pub use layout::{ResolvedEdge, StartFinishSubgraph, TrackLayout, TrackMetadata};
pub use metadata::{canonical_id, MetadataMap};
pub use portal::{Link, Portal, PortalManager};
pub use profile::{EdgeProfile, NoiseZone, SpeedZone, SurfaceZone, TrackMarker, WidthZone};
pub use sector::{Sector, SectorRegistry};
pub use shape::{Shape, ShapeKind, ShapeStore};
pub use validator::{Issue, IssueSection, ValidationOptions, ValidationReport};

pub use cues::{Beacon, BeaconManager, MarkerManager, NearestCue, TracksideMarker};

/// Road surface, as carried by surface zones and announced to the driver.
///
/// The discriminants match the legacy track format's surface column
/// (`0..=4`); out-of-range values clamp to [`Surface::Asphalt`] at decode
/// sites.
#[repr(u8)]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum Surface {
    #[default]
    Asphalt = 0,
    Gravel = 1,
    Sand = 2,
    Dirt = 3,
    Snow = 4,
}

/// Environmental noise attached to a stretch of track.
///
/// Noises are the main positional cue of the audio game: the controller
/// fades them in and out over the containing noise zone. The discriminants
/// match the legacy format's noise column (`0..=11`).
#[repr(u8)]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum NoiseKind {
    #[default]
    NoNoise = 0,
    Ocean = 1,
    River = 2,
    Traffic = 3,
    Crowd = 4,
    Runway = 5,
    Jet = 6,
    Thunder = 7,
    Helicopter = 8,
    Owl = 9,
    Clock = 10,
    Forest = 11,
}

impl NoiseKind {
    /// One-shot noises play a single time per noise window;
    /// every other kind loops for as long as the driver stays inside.
    pub fn is_one_shot(self) -> bool {
        matches!(
            self,
            NoiseKind::Runway
                | NoiseKind::Jet
                | NoiseKind::Thunder
                | NoiseKind::Helicopter
                | NoiseKind::Owl
        )
    }

    /// Fixed stereo pan for kinds that are always heard off to one side.
    ///
    /// Negative is left. `None` means centred.
    pub fn pan(self) -> Option<f32> {
        match self {
            NoiseKind::Ocean => Some(-0.10),
            NoiseKind::Clock => Some(0.25),
            _ => None,
        }
    }
}

/// Track-wide weather, decoded from the two trailing legacy ints.
#[repr(u8)]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum Weather {
    #[default]
    Sunny = 0,
    Rain = 1,
    Wind = 2,
    Storm = 3,
}

/// Track-wide background ambience.
#[repr(u8)]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum Ambience {
    #[default]
    NoAmbience = 0,
    Desert = 1,
    Airport = 2,
}

/// Discrete curve class attached to a geometry span for announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveSeverity {
    Easy,
    Normal,
    Hard,
    Hairpin,
}

/// Turn direction of a span, as announced to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveDirection {
    Left,
    Right,
    Straight,
}

/// The nine announceable road classes of the legacy format (`0..=8`).
///
/// `Straight` plus four severities in each turn direction. This is what the
/// controller hands to the speech/audio layer when a new stretch of road
/// needs calling out.
#[repr(u8)]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum RoadKind {
    #[default]
    Straight = 0,
    EasyLeft = 1,
    Left = 2,
    HardLeft = 3,
    HairpinLeft = 4,
    EasyRight = 5,
    Right = 6,
    HardRight = 7,
    HairpinRight = 8,
}

impl RoadKind {
    /// Derives the road class from a span's discrete curve annotations.
    ///
    /// A missing direction (or an explicit `Straight`) is a straight; a
    /// missing severity defaults to `Normal`.
    pub fn from_curve(
        direction: Option<CurveDirection>,
        severity: Option<CurveSeverity>,
    ) -> Self {
        let severity = severity.unwrap_or(CurveSeverity::Normal);
        match direction {
            None | Some(CurveDirection::Straight) => RoadKind::Straight,
            Some(CurveDirection::Left) => match severity {
                CurveSeverity::Easy => RoadKind::EasyLeft,
                CurveSeverity::Normal => RoadKind::Left,
                CurveSeverity::Hard => RoadKind::HardLeft,
                CurveSeverity::Hairpin => RoadKind::HairpinLeft,
            },
            Some(CurveDirection::Right) => match severity {
                CurveSeverity::Easy => RoadKind::EasyRight,
                CurveSeverity::Normal => RoadKind::Right,
                CurveSeverity::Hard => RoadKind::HardRight,
                CurveSeverity::Hairpin => RoadKind::HairpinRight,
            },
        }
    }

    /// Turn direction of this class.
    pub fn direction(self) -> CurveDirection {
        match self {
            RoadKind::Straight => CurveDirection::Straight,
            RoadKind::EasyLeft | RoadKind::Left | RoadKind::HardLeft | RoadKind::HairpinLeft => {
                CurveDirection::Left
            }
            _ => CurveDirection::Right,
        }
    }

    /// Curve severity, `None` for straights.
    pub fn severity(self) -> Option<CurveSeverity> {
        match self {
            RoadKind::Straight => None,
            RoadKind::EasyLeft | RoadKind::EasyRight => Some(CurveSeverity::Easy),
            RoadKind::Left | RoadKind::Right => Some(CurveSeverity::Normal),
            RoadKind::HardLeft | RoadKind::HardRight => Some(CurveSeverity::Hard),
            RoadKind::HairpinLeft | RoadKind::HairpinRight => Some(CurveSeverity::Hairpin),
        }
    }
}

/// Role of a portal within its sector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortalRole {
    Entry,
    Exit,
    EntryExit,
    #[default]
    Undefined,
}

/// Whether a link may be traversed in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkDirection {
    OneWay,
    TwoWay,
}

/// Classification of a sector, used by branch synthesis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorType {
    #[default]
    Normal,
    Intersection,
    Merge,
    Split,
}

/// Validator issue severity. Ordered: `Warning < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Warning,
    Error,
}

/// Behaviour flags attached to an area.
///
/// Stored as a bitset; an area may carry any combination.
#[derive(Debug, EnumSetType, Serialize, Deserialize)]
pub enum AreaFlag {
    /// The area should be announced when entered.
    Announce,
    /// Driving through the area is penalised or dangerous.
    Hazard,
    /// The area is an intended shortcut.
    Shortcut,
    /// Crossing the area affects lap/sector timing.
    Timing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_discriminants_round_trip() {
        for raw in 0u8..=4 {
            assert_eq!(u8::from(Surface::try_from(raw).unwrap()), raw);
        }
        for raw in 0u8..=11 {
            assert_eq!(u8::from(NoiseKind::try_from(raw).unwrap()), raw);
        }
        for raw in 0u8..=8 {
            assert_eq!(u8::from(RoadKind::try_from(raw).unwrap()), raw);
        }
        assert!(Surface::try_from(5u8).is_err());
        assert!(NoiseKind::try_from(12u8).is_err());
    }

    #[test]
    fn road_kind_from_curve() {
        assert_eq!(RoadKind::from_curve(None, None), RoadKind::Straight);
        assert_eq!(
            RoadKind::from_curve(Some(CurveDirection::Left), Some(CurveSeverity::Hairpin)),
            RoadKind::HairpinLeft
        );
        assert_eq!(
            RoadKind::from_curve(Some(CurveDirection::Right), None),
            RoadKind::Right
        );
        // Severity is meaningless without a turn direction.
        assert_eq!(
            RoadKind::from_curve(Some(CurveDirection::Straight), Some(CurveSeverity::Hard)),
            RoadKind::Straight
        );
    }

    #[test]
    fn road_kind_decomposition() {
        for raw in 0u8..=8 {
            let kind = RoadKind::try_from(raw).unwrap();
            assert_eq!(
                RoadKind::from_curve(Some(kind.direction()), kind.severity()),
                kind
            );
        }
    }

    #[test]
    fn one_shot_and_pan_tables() {
        assert!(NoiseKind::Thunder.is_one_shot());
        assert!(!NoiseKind::Ocean.is_one_shot());
        assert_eq!(NoiseKind::Ocean.pan(), Some(-0.10));
        assert_eq!(NoiseKind::Clock.pan(), Some(0.25));
        assert_eq!(NoiseKind::Jet.pan(), None);
    }
}
