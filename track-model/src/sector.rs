//! # Sectors
//!
//! A sector groups portals and carries the metadata that drives branch
//! synthesis. The registry preserves registration order so derived
//! structures stay deterministic.

use crate::metadata::canonical_id;
use crate::{LayoutError, MetadataMap, SectorType};

/// A named region of the course topology.
#[derive(Debug, Clone)]
pub struct Sector {
    pub id: String,
    pub sector_type: SectorType,
    pub metadata: MetadataMap,
}

impl Sector {
    pub fn new(id: impl Into<String>, sector_type: SectorType) -> Self {
        Self {
            id: id.into(),
            sector_type,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Insertion-ordered sector registry with case-insensitive lookup.
#[derive(Debug, Default)]
pub struct SectorRegistry {
    sectors: Vec<Sector>,
}

impl SectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sector: Sector) -> Result<(), LayoutError> {
        let key = canonical_id(&sector.id);
        if key.is_empty() {
            return Err(LayoutError::EmptyId);
        }
        if self.sectors.iter().any(|s| canonical_id(&s.id) == key) {
            return Err(LayoutError::DuplicateId(sector.id));
        }
        self.sectors.push(sector);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Sector> {
        let key = canonical_id(id);
        self.sectors.iter().find(|s| canonical_id(&s.id) == key)
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }
}
