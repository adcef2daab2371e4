//! # Branch synthesis
//!
//! A branch describes the possible exits from a sector, for voice guidance
//! at intersections, merges, and splits. Branches are not authored
//! directly: they are derived once from three sources, in a fixed
//! resolution order per field: explicit sector metadata, then approach
//! hints, then inference from the sector's portals.
//!
//! Recognised metadata keys: `branch_name`, `branch_entry`, `branch_exits`
//! (any key starting with `branch` marks the sector as branching).

use std::collections::HashMap;

use tracing::debug;

use crate::metadata::canonical_id;
use crate::portal::PortalManager;
use crate::sector::SectorRegistry;
use crate::{PortalRole, SectorType};

/// One way out of a branching sector.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchExit {
    pub portal_id: String,
    /// Suggested exit heading, degrees. `None` when unknown.
    pub heading_deg: Option<f64>,
}

/// A derived description of a sector's exits.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub sector_id: String,
    pub name: String,
    pub entry_portal_id: Option<String>,
    pub exits: Vec<BranchExit>,
}

/// A guidance hint attached to a sector by the layout author.
#[derive(Debug, Clone, Default)]
pub struct Approach {
    pub sector_id: String,
    pub name: Option<String>,
    pub entry_portal_id: Option<String>,
    pub exits: Vec<BranchExit>,
}

/// Derived branches, grouped by sector.
#[derive(Debug)]
pub struct BranchManager {
    branches_by_sector: HashMap<String, Vec<Branch>>,
}

impl BranchManager {
    /// Derives all branches.
    ///
    /// A branch is synthesised for every sector whose metadata carries any
    /// `branch*` key, or whose type is Intersection/Merge/Split even
    /// without metadata. Approaches supplement missing fields of those
    /// branches; an approach for any other sector produces a branch of its
    /// own.
    pub fn derive(
        sectors: &SectorRegistry,
        approaches: &[Approach],
        portals: &PortalManager,
    ) -> Self {
        let mut branches_by_sector: HashMap<String, Vec<Branch>> = HashMap::new();
        let approach_for = |sector_id: &str| {
            approaches
                .iter()
                .find(|a| canonical_id(&a.sector_id) == canonical_id(sector_id))
        };

        for sector in sectors.sectors() {
            let has_branch_meta = sector.metadata.has_key_with_prefix("branch");
            let branching_type = matches!(
                sector.sector_type,
                SectorType::Intersection | SectorType::Merge | SectorType::Split
            );
            if !has_branch_meta && !branching_type {
                continue;
            }
            let approach = approach_for(&sector.id);

            let name = sector
                .metadata
                .get("branch_name")
                .map(str::to_owned)
                .or_else(|| approach.and_then(|a| a.name.clone()))
                .unwrap_or_else(|| sector.id.clone());
            let entry_portal_id = sector
                .metadata
                .get("branch_entry")
                .map(str::to_owned)
                .or_else(|| approach.and_then(|a| a.entry_portal_id.clone()))
                .or_else(|| infer_entry(portals, &sector.id));
            let mut exits = sector
                .metadata
                .get("branch_exits")
                .map(parse_exit_spec)
                .unwrap_or_default();
            if exits.is_empty() {
                if let Some(approach) = approach {
                    exits.clone_from(&approach.exits);
                }
            }
            if exits.is_empty() {
                exits = infer_exits(portals, &sector.id, entry_portal_id.as_deref());
            }

            branches_by_sector
                .entry(canonical_id(&sector.id))
                .or_default()
                .push(Branch {
                    sector_id: sector.id.clone(),
                    name,
                    entry_portal_id,
                    exits,
                });
        }

        // Approaches aimed at sectors that produced no branch above stand
        // on their own.
        for approach in approaches {
            let key = canonical_id(&approach.sector_id);
            if branches_by_sector.contains_key(&key) {
                continue;
            }
            let entry_portal_id = approach
                .entry_portal_id
                .clone()
                .or_else(|| infer_entry(portals, &approach.sector_id));
            let exits = if approach.exits.is_empty() {
                infer_exits(portals, &approach.sector_id, entry_portal_id.as_deref())
            } else {
                approach.exits.clone()
            };
            branches_by_sector.entry(key).or_default().push(Branch {
                sector_id: approach.sector_id.clone(),
                name: approach
                    .name
                    .clone()
                    .unwrap_or_else(|| approach.sector_id.clone()),
                entry_portal_id,
                exits,
            });
        }

        let total: usize = branches_by_sector.values().map(Vec::len).sum();
        debug!(branches = total, "branch derivation complete");
        Self { branches_by_sector }
    }

    /// Branches of a sector; unknown sectors have none.
    pub fn get_branches_for_sector(&self, sector_id: &str) -> &[Branch] {
        self.branches_by_sector
            .get(&canonical_id(sector_id))
            .map_or(&[], Vec::as_slice)
    }
}

/// Entry inference: the first portal with role Entry or EntryExit,
/// falling back to the sector's first portal.
fn infer_entry(portals: &PortalManager, sector_id: &str) -> Option<String> {
    let in_sector = portals.portals_in_sector(sector_id);
    in_sector
        .iter()
        .find(|p| matches!(p.role, PortalRole::Entry | PortalRole::EntryExit))
        .or_else(|| in_sector.first())
        .map(|p| p.id.clone())
}

/// Exit inference: every portal with role Exit or EntryExit that is not
/// the entry portal.
fn infer_exits(
    portals: &PortalManager,
    sector_id: &str,
    entry_portal_id: Option<&str>,
) -> Vec<BranchExit> {
    let entry_key = entry_portal_id.map(canonical_id);
    portals
        .portals_in_sector(sector_id)
        .into_iter()
        .filter(|p| matches!(p.role, PortalRole::Exit | PortalRole::EntryExit))
        .filter(|p| Some(canonical_id(&p.id)) != entry_key)
        .map(|p| BranchExit {
            portal_id: p.id.clone(),
            heading_deg: p.exit_heading_deg,
        })
        .collect()
}

/// Parses a delimited exit list: `portalId[:heading]` tokens separated by
/// `,` `|` `;` or whitespace. Heading tokens accept a compass letter or a
/// float; anything else leaves the heading unset.
fn parse_exit_spec(spec: &str) -> Vec<BranchExit> {
    spec.split([',', '|', ';', ' ', '\t'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once(':') {
            Some((id, heading)) => BranchExit {
                portal_id: id.trim().to_owned(),
                heading_deg: parse_heading_token(heading),
            },
            None => BranchExit {
                portal_id: token.to_owned(),
                heading_deg: None,
            },
        })
        .collect()
}

fn parse_heading_token(token: &str) -> Option<f64> {
    match token.trim().to_ascii_uppercase().as_str() {
        "N" => Some(0.0),
        "E" => Some(90.0),
        "S" => Some(180.0),
        "W" => Some(270.0),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::Portal;
    use crate::sector::Sector;
    use crate::spatial::planar;
    use crate::MetadataMap;

    fn portals() -> PortalManager {
        let mut manager = PortalManager::new();
        let mut add = |id: &str, sector: &str, role: PortalRole| {
            let mut portal = Portal::new(id, sector, planar(0.0, 0.0), 8.0).with_role(role);
            portal.exit_heading_deg = Some(90.0);
            manager.register_portal(portal).unwrap();
        };
        add("in", "junction", PortalRole::Entry);
        add("out-a", "junction", PortalRole::Exit);
        add("out-b", "junction", PortalRole::Exit);
        add("both", "merge", PortalRole::EntryExit);
        add("side", "merge", PortalRole::Exit);
        manager
    }

    #[test]
    fn exit_spec_parsing() {
        let exits = parse_exit_spec("p1:N, p2:45.5 | p3;p4:W p5:bogus");
        assert_eq!(
            exits,
            vec![
                BranchExit { portal_id: "p1".into(), heading_deg: Some(0.0) },
                BranchExit { portal_id: "p2".into(), heading_deg: Some(45.5) },
                BranchExit { portal_id: "p3".into(), heading_deg: None },
                BranchExit { portal_id: "p4".into(), heading_deg: Some(270.0) },
                BranchExit { portal_id: "p5".into(), heading_deg: None },
            ]
        );
    }

    #[test]
    fn metadata_keys_win_over_inference() {
        let mut sectors = SectorRegistry::new();
        let mut meta = MetadataMap::new();
        meta.insert("branch_name", "Chicane fork");
        meta.insert("branch_entry", "in");
        meta.insert("branch_exits", "out-b:E");
        sectors
            .register(Sector::new("junction", SectorType::Normal).with_metadata(meta))
            .unwrap();

        let manager = BranchManager::derive(&sectors, &[], &portals());
        let branches = manager.get_branches_for_sector("JUNCTION");
        assert_eq!(branches.len(), 1);
        let branch = &branches[0];
        assert_eq!(branch.name, "Chicane fork");
        assert_eq!(branch.entry_portal_id.as_deref(), Some("in"));
        assert_eq!(
            branch.exits,
            vec![BranchExit { portal_id: "out-b".into(), heading_deg: Some(90.0) }]
        );
    }

    #[test]
    fn branching_type_without_metadata_is_inferred() {
        let mut sectors = SectorRegistry::new();
        sectors
            .register(Sector::new("junction", SectorType::Intersection))
            .unwrap();
        let manager = BranchManager::derive(&sectors, &[], &portals());
        let branch = &manager.get_branches_for_sector("junction")[0];
        assert_eq!(branch.entry_portal_id.as_deref(), Some("in"));
        let exit_ids: Vec<_> = branch.exits.iter().map(|e| e.portal_id.as_str()).collect();
        assert_eq!(exit_ids, ["out-a", "out-b"]);
    }

    #[test]
    fn entry_exit_portal_is_excluded_from_its_own_exits() {
        let mut sectors = SectorRegistry::new();
        sectors.register(Sector::new("merge", SectorType::Merge)).unwrap();
        let manager = BranchManager::derive(&sectors, &[], &portals());
        let branch = &manager.get_branches_for_sector("merge")[0];
        // "both" is the inferred entry, so only "side" remains an exit.
        assert_eq!(branch.entry_portal_id.as_deref(), Some("both"));
        let exit_ids: Vec<_> = branch.exits.iter().map(|e| e.portal_id.as_str()).collect();
        assert_eq!(exit_ids, ["side"]);
    }

    #[test]
    fn approach_supplements_missing_fields() {
        let mut sectors = SectorRegistry::new();
        let mut meta = MetadataMap::new();
        meta.insert("branch_exits", "out-a");
        sectors
            .register(Sector::new("junction", SectorType::Normal).with_metadata(meta))
            .unwrap();
        let approaches = vec![Approach {
            sector_id: "junction".into(),
            name: Some("Back straight fork".into()),
            entry_portal_id: None,
            exits: vec![BranchExit { portal_id: "ignored".into(), heading_deg: None }],
        }];
        let manager = BranchManager::derive(&sectors, &approaches, &portals());
        let branch = &manager.get_branches_for_sector("junction")[0];
        // Name came from the approach, exits from metadata, entry inferred.
        assert_eq!(branch.name, "Back straight fork");
        assert_eq!(branch.exits[0].portal_id, "out-a");
        assert_eq!(branch.entry_portal_id.as_deref(), Some("in"));
    }

    #[test]
    fn approach_alone_creates_a_branch() {
        let sectors = SectorRegistry::new();
        let approaches = vec![Approach {
            sector_id: "merge".into(),
            name: None,
            entry_portal_id: Some("both".into()),
            exits: Vec::new(),
        }];
        let manager = BranchManager::derive(&sectors, &approaches, &portals());
        let branch = &manager.get_branches_for_sector("merge")[0];
        assert_eq!(branch.name, "merge");
        let exit_ids: Vec<_> = branch.exits.iter().map(|e| e.portal_id.as_str()).collect();
        assert_eq!(exit_ids, ["side"]);
    }

    #[test]
    fn plain_sectors_produce_nothing() {
        let mut sectors = SectorRegistry::new();
        sectors.register(Sector::new("straight", SectorType::Normal)).unwrap();
        let manager = BranchManager::derive(&sectors, &[], &portals());
        assert!(manager.get_branches_for_sector("straight").is_empty());
        assert!(manager.get_branches_for_sector("nowhere").is_empty());
    }
}
