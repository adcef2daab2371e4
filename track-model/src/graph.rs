//! # The course graph
//!
//! Edges connect portals and carry their own geometry and attribute
//! profile. A designated primary route orders a subset of edges into the
//! course that linear queries run along.

use std::collections::HashMap;

use crate::metadata::canonical_id;
use crate::profile::EdgeProfile;
use crate::{GeometrySpec, LayoutError, PortalManager};

/// A directed edge between two portals.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub id: String,
    pub from_portal_id: String,
    pub to_portal_id: String,
    pub geometry: GeometrySpec,
    pub profile: EdgeProfile,
}

impl GraphEdge {
    /// Derived edge length: the sum of its span lengths.
    pub fn length_m(&self) -> f64 {
        self.geometry.length_m()
    }
}

/// The ordered edge list linear queries run along.
#[derive(Debug, Clone)]
pub struct PrimaryRoute {
    pub edge_ids: Vec<String>,
    pub is_loop: bool,
}

/// Edges and portals with a primary route.
///
/// Construction verifies referential integrity (unique edge ids, resolvable
/// endpoints, known route edges, non-empty edge geometry); route ordering
/// invariants are enforced when a [`crate::TrackLayout`] is built from the
/// graph.
#[derive(Debug)]
pub struct Graph {
    edges: Vec<GraphEdge>,
    edge_index: HashMap<String, usize>,
    portals: PortalManager,
    primary_route: PrimaryRoute,
}

impl Graph {
    pub fn new(
        portals: PortalManager,
        edges: Vec<GraphEdge>,
        primary_route: PrimaryRoute,
    ) -> Result<Self, LayoutError> {
        let mut edge_index = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            let key = canonical_id(&edge.id);
            if key.is_empty() {
                return Err(LayoutError::EmptyId);
            }
            if edge_index.insert(key, index).is_some() {
                return Err(LayoutError::DuplicateId(edge.id.clone()));
            }
            for endpoint in [&edge.from_portal_id, &edge.to_portal_id] {
                if portals.get(endpoint).is_none() {
                    return Err(LayoutError::UnknownEdgePortal {
                        edge: edge.id.clone(),
                        portal: endpoint.clone(),
                    });
                }
            }
            if edge.geometry.spans.is_empty() {
                return Err(LayoutError::EmptyGeometry(edge.id.clone()));
            }
        }
        for edge_id in &primary_route.edge_ids {
            if !edge_index.contains_key(&canonical_id(edge_id)) {
                return Err(LayoutError::UnknownRouteEdge(edge_id.clone()));
            }
        }
        Ok(Self {
            edges,
            edge_index,
            portals,
            primary_route,
        })
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edge_index
            .get(&canonical_id(id))
            .map(|&i| &self.edges[i])
    }

    pub fn portals(&self) -> &PortalManager {
        &self.portals
    }

    pub fn primary_route(&self) -> &PrimaryRoute {
        &self.primary_route
    }

    /// Indices into `edges()` for the primary route, in route order.
    pub fn primary_route_indices(&self) -> Vec<usize> {
        self.primary_route
            .edge_ids
            .iter()
            .map(|id| self.edge_index[&canonical_id(id)])
            .collect()
    }
}
