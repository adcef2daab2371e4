//! # Portals and links
//!
//! Portals are the only endpoints of graph edges and links. The manager
//! keeps three indices: portal-by-id, portals-by-sector, and
//! links-by-portal (a multi-map over both endpoints), so adjacency queries
//! never scan the full link list.

use std::collections::HashMap;

use geo::Coord;

use crate::metadata::canonical_id;
use crate::{LayoutError, LinkDirection, PortalRole};

/// A typed connection point between edges.
#[derive(Debug, Clone)]
pub struct Portal {
    pub id: String,
    pub sector_id: String,
    pub position: Coord<f64>,
    pub width_m: f64,
    /// Suggested heading when entering through this portal.
    /// Degrees, 0° = north, clockwise.
    pub entry_heading_deg: Option<f64>,
    pub exit_heading_deg: Option<f64>,
    pub role: PortalRole,
}

impl Portal {
    pub fn new(
        id: impl Into<String>,
        sector_id: impl Into<String>,
        position: Coord<f64>,
        width_m: f64,
    ) -> Self {
        Self {
            id: id.into(),
            sector_id: sector_id.into(),
            position,
            width_m,
            entry_heading_deg: None,
            exit_heading_deg: None,
            role: PortalRole::Undefined,
        }
    }

    pub fn with_role(mut self, role: PortalRole) -> Self {
        self.role = role;
        self
    }
}

/// A directed or bidirectional connection between two portals.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: String,
    pub from_portal_id: String,
    pub to_portal_id: String,
    pub direction: LinkDirection,
}

/// Registry of portals and links with adjacency indices.
#[derive(Debug, Default)]
pub struct PortalManager {
    portals: Vec<Portal>,
    portal_index: HashMap<String, usize>,
    portals_by_sector: HashMap<String, Vec<usize>>,
    links: Vec<Link>,
    links_by_portal: HashMap<String, Vec<usize>>,
}

impl PortalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a portal. Ids are unique case-insensitively.
    pub fn register_portal(&mut self, portal: Portal) -> Result<(), LayoutError> {
        let key = canonical_id(&portal.id);
        if key.is_empty() {
            return Err(LayoutError::EmptyId);
        }
        if self.portal_index.contains_key(&key) {
            return Err(LayoutError::DuplicateId(portal.id));
        }
        let index = self.portals.len();
        self.portals_by_sector
            .entry(canonical_id(&portal.sector_id))
            .or_default()
            .push(index);
        self.portal_index.insert(key, index);
        self.portals.push(portal);
        Ok(())
    }

    /// Registers a link. Both endpoints must already resolve.
    pub fn register_link(&mut self, link: Link) -> Result<(), LayoutError> {
        for endpoint in [&link.from_portal_id, &link.to_portal_id] {
            if self.get(endpoint).is_none() {
                return Err(LayoutError::UnknownLinkPortal {
                    link: link.id.clone(),
                    portal: endpoint.clone(),
                });
            }
        }
        let index = self.links.len();
        self.links_by_portal
            .entry(canonical_id(&link.from_portal_id))
            .or_default()
            .push(index);
        if canonical_id(&link.from_portal_id) != canonical_id(&link.to_portal_id) {
            self.links_by_portal
                .entry(canonical_id(&link.to_portal_id))
                .or_default()
                .push(index);
        }
        self.links.push(link);
        Ok(())
    }

    pub fn get(&self, portal_id: &str) -> Option<&Portal> {
        self.portal_index
            .get(&canonical_id(portal_id))
            .map(|&i| &self.portals[i])
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Portals of a sector, registration order.
    pub fn portals_in_sector(&self, sector_id: &str) -> Vec<&Portal> {
        self.portals_by_sector
            .get(&canonical_id(sector_id))
            .map(|indices| indices.iter().map(|&i| &self.portals[i]).collect())
            .unwrap_or_default()
    }

    /// Portals reachable over one link from `portal_id`.
    ///
    /// For each incident link: the other endpoint if the link originates
    /// here, or if the link is two-way and terminates here. Unknown ids
    /// yield an empty list.
    pub fn get_linked_portals(&self, portal_id: &str) -> Vec<&Portal> {
        let key = canonical_id(portal_id);
        let Some(link_indices) = self.links_by_portal.get(&key) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for &index in link_indices {
            let link = &self.links[index];
            let other = if canonical_id(&link.from_portal_id) == key {
                Some(&link.to_portal_id)
            } else if link.direction == LinkDirection::TwoWay {
                Some(&link.from_portal_id)
            } else {
                None
            };
            if let Some(other_id) = other {
                if let Some(portal) = self.get(other_id) {
                    result.push(portal);
                }
            }
        }
        result
    }

    /// Sectors reachable from `sector_id` over one link, deduplicated,
    /// in discovery order. The sector itself is excluded.
    pub fn get_connected_sector_ids(&self, sector_id: &str) -> Vec<String> {
        let own = canonical_id(sector_id);
        let mut seen = Vec::new();
        for portal in self.portals_in_sector(sector_id) {
            for linked in self.get_linked_portals(&portal.id) {
                let key = canonical_id(&linked.sector_id);
                if key != own && !seen.iter().any(|(k, _)| *k == key) {
                    seen.push((key, linked.sector_id.clone()));
                }
            }
        }
        seen.into_iter().map(|(_, original)| original).collect()
    }
}
