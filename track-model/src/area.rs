//! # Named planar areas over registered shapes

use enumset::EnumSet;
use geo::Coord;

use crate::metadata::canonical_id;
use crate::shape::{ShapeKind, ShapeStore};
use crate::{AreaFlag, LayoutError, MetadataMap, NoiseKind, Surface};

/// A named 2-D zone of the world, referencing a shape by id.
///
/// Areas can layer attribute overrides (surface, noise) on top of whatever
/// the linear model says, carry behaviour flags, and hold free-form
/// metadata for other collaborators.
#[derive(Debug, Clone)]
pub struct Area {
    pub id: String,
    /// Free-form type tag, compared case-insensitively by callers.
    pub area_type: String,
    pub shape_id: String,
    pub surface_override: Option<Surface>,
    pub noise_override: Option<NoiseKind>,
    /// Half-width source for polyline shapes. A polyline area without a
    /// positive width cannot match any point.
    pub width_m: Option<f64>,
    pub flags: EnumSet<AreaFlag>,
    pub metadata: MetadataMap,
}

impl Area {
    /// A minimal area over a shape; overrides, flags, and metadata default
    /// to empty.
    pub fn new(id: impl Into<String>, area_type: impl Into<String>, shape_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            area_type: area_type.into(),
            shape_id: shape_id.into(),
            surface_override: None,
            noise_override: None,
            width_m: None,
            flags: EnumSet::empty(),
            metadata: MetadataMap::new(),
        }
    }
}

/// Ordered registry of areas with containment listing.
///
/// Borrows the shape store it resolves against; both are immutable after
/// construction and freely shareable.
#[derive(Debug)]
pub struct AreaManager<'a> {
    shapes: &'a ShapeStore,
    areas: Vec<Area>,
}

impl<'a> AreaManager<'a> {
    pub fn new(shapes: &'a ShapeStore) -> Self {
        Self {
            shapes,
            areas: Vec::new(),
        }
    }

    /// Registers an area. Registration order is the iteration and result
    /// order of every query.
    pub fn register(&mut self, area: Area) -> Result<(), LayoutError> {
        if canonical_id(&area.id).is_empty() {
            return Err(LayoutError::EmptyId);
        }
        if self
            .areas
            .iter()
            .any(|a| canonical_id(&a.id) == canonical_id(&area.id))
        {
            return Err(LayoutError::DuplicateId(area.id));
        }
        self.areas.push(area);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Area> {
        let key = canonical_id(id);
        self.areas.iter().find(|a| canonical_id(&a.id) == key)
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// All areas containing `p`, in insertion order.
    ///
    /// Every containing area is returned, not only the first, so callers
    /// can layer attributes. A missing shape means "not contained" and is
    /// never an error.
    pub fn find_areas_containing(&self, p: Coord<f64>) -> Vec<&Area> {
        self.areas
            .iter()
            .filter(|area| self.area_contains(area, p))
            .collect()
    }

    fn area_contains(&self, area: &Area, p: Coord<f64>) -> bool {
        let Some(shape) = self.shapes.get(&area.shape_id) else {
            return false;
        };
        match shape.kind() {
            ShapeKind::Polyline(_) => match area.width_m {
                Some(width) if width > 0.0 => shape.contains_with_width(p, width / 2.0),
                _ => false,
            },
            _ => shape.contains(p),
        }
    }
}
