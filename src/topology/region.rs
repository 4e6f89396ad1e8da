//! Regions: named element groupings that overlap freely.
//!
//! Unlike meshes, regions carry no handle lists of their own; membership is
//! stored on the elements (see
//! [`ElementBuffer`](crate::topology::element_buffer::ElementBuffer)). The
//! region table only maps ids to names and carries the per-region boundary
//! classification cache.

use serde::{Deserialize, Serialize};

use crate::topology::element::RegionId;
use crate::topology::mesh::BoundaryFlags;

/// One region of the hierarchy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Region {
    pub(crate) id: RegionId,
    pub(crate) name: String,
    /// Cached region-scoped surface classification, if derived.
    pub(crate) flags: Option<BoundaryFlags>,
}

impl Region {
    pub(crate) fn new(id: RegionId, name: impl Into<String>) -> Self {
        Region {
            id,
            name: name.into(),
            flags: None,
        }
    }

    /// Stable id of this region.
    #[inline]
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Name given at creation.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
