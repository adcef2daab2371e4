use thiserror::Error;

/// Construction-time faults.
///
/// These are the only fatal conditions in the crate: they surface once, at
/// the single build site of a registry, graph, or layout. Query paths never
/// return errors; they fall back to defaults instead.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("identifier is empty")]
    EmptyId,
    #[error("duplicate identifier: {0}")]
    DuplicateId(String),
    #[error("polygon requires at least 3 points")]
    DegeneratePolygon,
    #[error("polyline requires at least 2 points")]
    DegeneratePolyline,
    #[error("link {link} references unknown portal {portal}")]
    UnknownLinkPortal { link: String, portal: String },
    #[error("edge {edge} references unknown portal {portal}")]
    UnknownEdgePortal { edge: String, portal: String },
    #[error("primary route references unknown edge {0}")]
    UnknownRouteEdge(String),
    #[error("primary route resolves to zero edges")]
    EmptyRoute,
    #[error("route discontinuity: edge {from_edge} ends at a different portal than {to_edge} starts from")]
    RouteDiscontinuity { from_edge: String, to_edge: String },
    #[error("loop closure violated: route ends at portal {end} but starts at portal {start}")]
    LoopClosure { start: String, end: String },
    #[error("edge {0} has no geometry spans")]
    EmptyGeometry(String),
    #[error("geometry spec has no spans")]
    EmptySpans,
    #[error("span {index} has non-positive length ({length_m} m)")]
    NonPositiveSpanLength { index: usize, length_m: f64 },
    #[error("sample spacing must be positive (got {0})")]
    NonPositiveSampleSpacing(f64),
    #[error("default width must be positive (got {0})")]
    NonPositiveWidth(f64),
}
