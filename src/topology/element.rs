//! Strong, zero-cost handles for mesh entities.
//!
//! Every element (vertex, edge, face, cell) is identified by an [`ElementId`]
//! that packs the element's topological dimension and its index within that
//! dimension's buffer into a single `u64`. Meshes and regions get their own
//! newtypes so the three id spaces cannot be mixed up at call sites.
//!
//! This module provides:
//! - A transparent `ElementId` newtype with dimension/index accessors.
//! - `MeshId` and `RegionId` wrappers for the mesh arena and region table.
//! - Implementations of common traits (`Debug`, `Display`, ordering,
//!   hashing) so the ids can be used in maps, sets, and printed easily.

use std::fmt;

/// Highest supported topological dimension.
pub const MAX_DIMENSION: usize = 3;

/// Bits reserved for the element index; the top two bits hold the dimension.
const INDEX_BITS: u32 = 62;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Identifier of one mesh element: two dimension bits over a 62-bit index.
///
/// The packing makes the derived `Ord` sort by dimension first and index
/// second, which is the canonical element order everywhere in this crate.
///
/// # Memory layout
/// This type is `repr(transparent)`, so it has the same ABI and alignment as
/// a plain `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct ElementId(u64);

impl ElementId {
    /// Reserved id used to fill boundary slots before they are materialized.
    /// Never handed out for a real element.
    pub(crate) const PLACEHOLDER: ElementId = ElementId(u64::MAX);

    /// Creates an `ElementId` from a dimension and a per-dimension index.
    ///
    /// # Panics
    ///
    /// Panics if `dimension > 3` or if `index` does not fit in 62 bits.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use topomesh::topology::element::ElementId;
    /// let e = ElementId::new(2, 14);
    /// assert_eq!(e.dimension(), 2);
    /// assert_eq!(e.index(), 14);
    /// ```
    #[inline]
    pub fn new(dimension: usize, index: usize) -> Self {
        assert!(
            dimension <= MAX_DIMENSION,
            "element dimension {dimension} exceeds {MAX_DIMENSION}"
        );
        let index = index as u64;
        assert!(index <= INDEX_MASK, "element index does not fit in 62 bits");
        ElementId(((dimension as u64) << INDEX_BITS) | index)
    }

    /// Topological dimension encoded in this id.
    #[inline]
    pub const fn dimension(self) -> usize {
        (self.0 >> INDEX_BITS) as usize
    }

    /// Index into the element buffer of [`dimension`](Self::dimension).
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    /// `true` for dimension-0 elements.
    #[inline]
    pub const fn is_vertex(self) -> bool {
        self.dimension() == 0
    }

    /// `true` for the reserved placeholder id.
    #[inline]
    pub(crate) const fn is_placeholder(self) -> bool {
        self.0 == u64::MAX
    }
}

/// Custom `Debug` implementation to display as `ElementId(dim, index)`.
impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementId")
            .field(&self.dimension())
            .field(&self.index())
            .finish()
    }
}

/// Prints as `dim#index`, e.g. `2#14` for face 14.
impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.dimension(), self.index())
    }
}

/// Index of a mesh in the hierarchy's mesh arena. The root mesh is always 0.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct MeshId(pub(crate) usize);

impl MeshId {
    /// The root mesh that owns every element of the hierarchy.
    pub const ROOT: MeshId = MeshId(0);

    /// Arena index of this mesh.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a region. Stable across serialization and refinement.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct RegionId(pub u32);

impl RegionId {
    /// Raw numeric id.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -----------------------------------------------------------------------------
// Testing and assertions
// -----------------------------------------------------------------------------

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that `ElementId` has the same size as `u64`.
    use super::*;
    use static_assertions::assert_eq_size;

    // If this fails, our repr(transparent) guarantee is broken!
    assert_eq_size!(ElementId, u64);
}
