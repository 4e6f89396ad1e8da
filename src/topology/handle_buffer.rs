//! Per-mesh handle lists and their cached relations.
//!
//! Every mesh in the hierarchy keeps one [`HandleBuffer`] per dimension: the
//! sorted list of element ids the mesh contains at that dimension, plus the
//! co-boundary and neighbor relations derived for those handles. Relations
//! are cached with the hierarchy generation they were built against and are
//! rebuilt transparently when the topology has changed since.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::storage::SparsePackedBuffer;
use crate::topology::element::ElementId;

/// One cached relation: rows keyed by element index, stamped with the
/// hierarchy generation it was derived from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Relation {
    /// Hierarchy generation this relation was built against.
    pub(crate) stamp: u64,
    /// How many times this relation has been (re)built. Test hook for cache
    /// behavior; starts at 0 and grows by 1 per build.
    pub(crate) builds: u64,
    /// Related element ids per element index, each row sorted.
    pub(crate) data: SparsePackedBuffer<ElementId>,
}

impl Relation {
    /// Related ids for the element with the given per-dimension index.
    #[inline]
    pub fn get(&self, index: usize) -> &[ElementId] {
        self.data.get(index)
    }

    /// Generation stamp of the last build.
    #[inline]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Number of times this relation was built.
    #[inline]
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

/// The elements of one dimension that belong to one mesh, with their caches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandleBuffer {
    /// Dimension of every handle in this buffer.
    dimension: usize,
    /// Sorted, duplicate-free element ids.
    pub(crate) ids: Vec<ElementId>,
    /// Co-boundary caches keyed by the co-boundary dimension.
    pub(crate) coboundary: HashMap<u8, Relation>,
    /// Neighbor caches keyed by `(connector_dim, neighbor_dim)`.
    pub(crate) neighbors: HashMap<(u8, u8), Relation>,
}

impl HandleBuffer {
    /// Create an empty buffer for handles of `dimension`.
    pub fn new(dimension: usize) -> Self {
        HandleBuffer {
            dimension,
            ids: Vec::new(),
            coboundary: HashMap::new(),
            neighbors: HashMap::new(),
        }
    }

    /// Dimension of the handles stored here.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Sorted element ids of this mesh at this dimension.
    #[inline]
    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    /// Number of handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// `true` if the mesh has no element at this dimension.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `true` if `id` belongs to this mesh.
    #[inline]
    pub fn contains(&self, id: ElementId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Insert `id`, keeping the list sorted and duplicate-free. Returns
    /// `true` if the handle is new.
    ///
    /// Ids handed out by the hierarchy grow monotonically, so the common
    /// case is an O(1) append at the tail.
    pub(crate) fn insert(&mut self, id: ElementId) -> bool {
        debug_assert_eq!(id.dimension(), self.dimension);
        if self.ids.last().is_none_or(|&last| last < id) {
            self.ids.push(id);
            return true;
        }
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                self.ids.insert(pos, id);
                true
            }
        }
    }

    /// `true` if the handle list is strictly increasing.
    pub(crate) fn ids_are_sorted(&self) -> bool {
        self.ids.windows(2).all(|w| w[0] < w[1])
    }

    /// Cached co-boundary toward `codim_dim`, regardless of freshness.
    pub fn coboundary_cache(&self, codim_dim: usize) -> Option<&Relation> {
        self.coboundary.get(&(codim_dim as u8))
    }

    /// Cached neighbor relation for `(connector_dim, neighbor_dim)`,
    /// regardless of freshness.
    pub fn neighbor_cache(&self, connector_dim: usize, neighbor_dim: usize) -> Option<&Relation> {
        self.neighbors
            .get(&(connector_dim as u8, neighbor_dim as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(n: usize) -> ElementId {
        ElementId::new(1, n)
    }

    #[test]
    fn insert_keeps_ids_sorted_and_unique() {
        let mut hb = HandleBuffer::new(1);
        assert!(hb.insert(eid(1)));
        assert!(hb.insert(eid(5)));
        assert!(hb.insert(eid(3)));
        assert!(!hb.insert(eid(5)));
        assert_eq!(hb.ids(), &[eid(1), eid(3), eid(5)]);
        assert!(hb.ids_are_sorted());
    }

    #[test]
    fn contains_uses_the_sorted_order() {
        let mut hb = HandleBuffer::new(1);
        for n in [4, 2, 8] {
            hb.insert(eid(n));
        }
        assert!(hb.contains(eid(2)));
        assert!(!hb.contains(eid(3)));
    }

    #[test]
    fn fresh_buffer_has_no_caches() {
        let hb = HandleBuffer::new(2);
        assert!(hb.coboundary_cache(3).is_none());
        assert!(hb.neighbor_cache(1, 2).is_none());
    }
}
