//! End-to-end exercise of the public surface: build a small two-edge
//! course, validate it, and drive a controller around it.

use track_model::{
    validator, AnnounceMode, Ambience, AudioEvent, AudioSink, CurveDirection, CurveSeverity,
    GeometrySpan, GeometrySpec, Graph, GraphEdge, EdgeProfile, NoiseKind, NoiseZone, Portal,
    PortalManager, PrimaryRoute, RoadKind, SpeedZone, Surface, SurfaceZone, TrackController,
    TrackLayout, TrackMetadata, ValidationOptions, Weather,
};

#[derive(Default)]
struct Recorder {
    events: Vec<AudioEvent>,
}

impl AudioSink for Recorder {
    fn handle(&mut self, event: AudioEvent) {
        self.events.push(event);
    }
}

fn planar(x: f64, z: f64) -> geo::Coord<f64> {
    geo::Coord { x, y: z }
}

/// A 100 m pit straight into a 150 m back section, closed into a loop.
fn build_course() -> TrackLayout {
    let mut portals = PortalManager::new();
    portals
        .register_portal(Portal::new("start", "pit", planar(0.0, 0.0), 12.0))
        .unwrap();
    portals
        .register_portal(Portal::new("hairpin", "back", planar(0.0, 100.0), 10.0))
        .unwrap();

    let mut pit_straight = EdgeProfile::new(Surface::Asphalt, NoiseKind::NoNoise, 10.0);
    pit_straight.surface_zones.push(SurfaceZone {
        start_s: 10.0,
        end_s: 40.0,
        surface: Surface::Dirt,
    });
    pit_straight.noise_zones.push(NoiseZone {
        start_s: 60.0,
        end_s: 100.0,
        noise: NoiseKind::Crowd,
    });

    let mut back_section = EdgeProfile::new(Surface::Asphalt, NoiseKind::NoNoise, 10.0);
    back_section.speed_zones.push(SpeedZone {
        start_s: 0.0,
        end_s: 50.0,
        max_speed_kph: 60.0,
    });

    let graph = Graph::new(
        portals,
        vec![
            GraphEdge {
                id: "pit-straight".into(),
                from_portal_id: "start".into(),
                to_portal_id: "hairpin".into(),
                geometry: GeometrySpec::new(vec![GeometrySpan::straight(100.0)], false),
                profile: pit_straight,
            },
            GraphEdge {
                id: "back-section".into(),
                from_portal_id: "hairpin".into(),
                to_portal_id: "start".into(),
                geometry: GeometrySpec::new(
                    vec![
                        GeometrySpan::straight(90.0),
                        GeometrySpan::arc(60.0, 250.0, CurveDirection::Right)
                            .with_curve_class(CurveDirection::Right, CurveSeverity::Easy),
                    ],
                    false,
                ),
                profile: back_section,
            },
        ],
        PrimaryRoute {
            edge_ids: vec!["pit-straight".into(), "back-section".into()],
            is_loop: true,
        },
    )
    .unwrap();

    TrackLayout::new(
        graph,
        Weather::Rain,
        Ambience::NoAmbience,
        Surface::Asphalt,
        NoiseKind::NoNoise,
        10.0,
        TrackMetadata {
            name: "Harbour Loop".into(),
            author: "tests".into(),
            version: "1".into(),
            tags: vec!["short".into()],
        },
        Vec::new(),
    )
    .unwrap()
}

#[test]
fn route_queries_span_edge_seams() {
    let layout = build_course();
    assert!((layout.primary_route_length_m() - 250.0).abs() < 1e-9);

    assert_eq!(layout.surface_at(20.0), Surface::Dirt);
    assert_eq!(layout.surface_at(50.0), Surface::Asphalt);
    assert_eq!(layout.try_speed_limit(120.0), Some(60.0));
    assert_eq!(layout.try_speed_limit(50.0), None);

    let resolved = layout.resolve_primary_edge(200.0);
    assert_eq!(layout.route_edge(resolved.edge_index).id, "back-section");
    assert!((resolved.local_s - 100.0).abs() < 1e-9);

    // One lap later everything repeats.
    assert_eq!(layout.surface_at(20.0 + 250.0), Surface::Dirt);
    assert_eq!(layout.try_speed_limit(120.0 - 250.0), Some(60.0));
}

#[test]
fn the_course_validates_cleanly() {
    let layout = build_course();
    let report = validator::validate(&layout, &ValidationOptions::default());
    assert!(report.is_valid(), "unexpected issues: {:?}", report.issues);
}

#[test]
fn a_lap_with_announcements_and_noise() {
    let layout = build_course();
    let mut sink = Recorder::default();
    let mut controller = TrackController::new(&layout, &mut sink);
    controller.initialize();

    let mut announced = Vec::new();
    let mut s = 0.0;
    while s < 250.0 {
        controller.road_at_position(s);
        if let Some(road) = controller.next_road(s, 10.0, AnnounceMode::Adaptive) {
            announced.push(road.kind);
        }
        controller.run(s);
        s += 5.0;
    }
    controller.shutdown();

    // The straight after the seam and the closing right-hander both get
    // called, each exactly once per lap.
    assert_eq!(
        announced,
        vec![RoadKind::Straight, RoadKind::EasyRight, RoadKind::Straight]
    );

    // Rain started on initialize; the crowd noise faded in and out once.
    assert_eq!(sink.events[0], AudioEvent::WeatherStarted(Weather::Rain));
    let starts: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AudioEvent::NoiseStarted { noise, looped, .. } => Some((*noise, *looped)),
            _ => None,
        })
        .collect();
    assert_eq!(starts, vec![(NoiseKind::Crowd, true)]);
    let stops = sink
        .events
        .iter()
        .filter(|e| matches!(e, AudioEvent::NoiseStopped { .. }))
        .count();
    assert_eq!(stops, 1);
}

#[test]
fn pose_sampling_follows_the_route() {
    let layout = build_course();
    let start = layout.pose_at(0.0);
    assert!((start.heading_deg - 0.0).abs() < 1e-9);
    // Midway through the closing arc the heading has swung right.
    let in_arc = layout.pose_at(220.0);
    assert!(in_arc.heading_deg > 5.0 && in_arc.heading_deg < 90.0);
    // Wrap-around reproduces the start pose.
    let wrapped = layout.pose_at(250.0);
    assert!((wrapped.position - start.position).norm() < 1e-9);
}
