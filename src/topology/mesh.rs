//! Meshes: named element collections forming a tree.
//!
//! A [`Mesh`] is a view onto a subset of the hierarchy's elements, one handle
//! buffer per dimension. Meshes form a tree rooted at the implicit root mesh,
//! which owns every element; child meshes hold subsets registered into them
//! and, transitively, into all their ancestors.

use serde::{Deserialize, Serialize};

use crate::topology::element::{ElementId, MeshId, MAX_DIMENSION};
use crate::topology::handle_buffer::HandleBuffer;

/// Cached boundary classification: which elements of a facet dimension lie on
/// the surface, stamped with the generation it was derived from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BoundaryFlags {
    /// Hierarchy generation this classification was built against.
    pub(crate) stamp: u64,
    /// How many times the classification has been (re)built.
    pub(crate) builds: u64,
    /// Flagged element ids, sorted.
    pub(crate) flags: Vec<ElementId>,
}

impl BoundaryFlags {
    /// `true` if `id` was classified as lying on the boundary.
    #[inline]
    pub fn is_flagged(&self, id: ElementId) -> bool {
        self.flags.binary_search(&id).is_ok()
    }

    /// All flagged ids, sorted.
    #[inline]
    pub fn flagged(&self) -> &[ElementId] {
        &self.flags
    }

    /// Number of times this classification was built.
    #[inline]
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

/// One mesh of the hierarchy: a name, a place in the mesh tree, and the
/// handles of the elements it contains.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mesh {
    pub(crate) name: String,
    pub(crate) parent: Option<MeshId>,
    pub(crate) children: Vec<MeshId>,
    /// One handle buffer per dimension `0..=MAX_DIMENSION`.
    pub(crate) handles: Vec<HandleBuffer>,
    /// Cached surface classification, if one was derived for this mesh.
    pub(crate) boundary_flags: Option<BoundaryFlags>,
}

impl Mesh {
    pub(crate) fn new(name: impl Into<String>, parent: Option<MeshId>) -> Self {
        Mesh {
            name: name.into(),
            parent,
            children: Vec::new(),
            handles: (0..=MAX_DIMENSION).map(HandleBuffer::new).collect(),
            boundary_flags: None,
        }
    }

    /// Name given at creation.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent mesh, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<MeshId> {
        self.parent
    }

    /// Direct child meshes, in creation order.
    #[inline]
    pub fn children(&self) -> &[MeshId] {
        &self.children
    }

    /// Handle buffer for `dimension`.
    ///
    /// # Panics
    /// Panics if `dimension > MAX_DIMENSION`.
    #[inline]
    pub fn handles(&self, dimension: usize) -> &HandleBuffer {
        &self.handles[dimension]
    }

    #[inline]
    pub(crate) fn handles_mut(&mut self, dimension: usize) -> &mut HandleBuffer {
        &mut self.handles[dimension]
    }

    /// `true` if this mesh contains `id`.
    #[inline]
    pub fn contains(&self, id: ElementId) -> bool {
        self.handles[id.dimension()].contains(id)
    }

    /// Register `id` into this mesh. Returns `true` if the handle is new.
    pub(crate) fn register(&mut self, id: ElementId) -> bool {
        self.handles_mut(id.dimension()).insert(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_mesh_has_empty_handle_buffers() {
        let m = Mesh::new("interior", Some(MeshId::ROOT));
        assert_eq!(m.name(), "interior");
        assert_eq!(m.parent(), Some(MeshId::ROOT));
        for dim in 0..=MAX_DIMENSION {
            assert!(m.handles(dim).is_empty());
            assert_eq!(m.handles(dim).dimension(), dim);
        }
    }

    #[test]
    fn register_routes_by_dimension() {
        let mut m = Mesh::new("root", None);
        let v = ElementId::new(0, 4);
        let c = ElementId::new(3, 1);
        assert!(m.register(v));
        assert!(m.register(c));
        assert!(!m.register(v));
        assert!(m.contains(v));
        assert!(m.contains(c));
        assert!(!m.contains(ElementId::new(3, 2)));
        assert_eq!(m.handles(0).ids(), &[v]);
        assert_eq!(m.handles(3).ids(), &[c]);
    }

    #[test]
    fn boundary_flag_membership() {
        let flags = BoundaryFlags {
            stamp: 1,
            builds: 1,
            flags: vec![ElementId::new(1, 0), ElementId::new(1, 2)],
        };
        assert!(flags.is_flagged(ElementId::new(1, 0)));
        assert!(!flags.is_flagged(ElementId::new(1, 1)));
    }
}
