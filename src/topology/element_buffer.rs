//! Per-dimension element storage with deduplicating lookup.
//!
//! An [`ElementBuffer`] holds every element of one topological dimension:
//! its cell type, its boundary lists toward each lower dimension, its
//! refinement parent, and its region memberships. Elements are addressed by
//! their index; the owning hierarchy derives the public
//! [`ElementId`](crate::topology::element::ElementId) from `(dimension, index)`.
//!
//! Boundary lists live in packed buffers whose shape follows the hierarchy's
//! boundary layout: dense [`PackedBuffer`] rows under the full layout, sparse
//! rows under the sparse layout. The dimension-0 list (the element's vertex
//! set) is always dense because element identity is keyed on it.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::error::TopoMeshError;
use crate::storage::{BucketBuffer, PackedBuffer, SparsePackedBuffer};
use crate::topology::cell_type::CellType;
use crate::topology::element::{ElementId, RegionId};

/// Storage shape of one boundary list, following the hierarchy layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BoundaryStorage {
    /// One row per element, present for every element index.
    Full(PackedBuffer<ElementId>),
    /// Rows only for the elements whose boundary was materialized.
    Sparse(SparsePackedBuffer<ElementId>),
}

impl BoundaryStorage {
    /// Row for element `index`; empty if absent or not materialized.
    #[inline]
    pub fn get(&self, index: usize) -> &[ElementId] {
        match self {
            BoundaryStorage::Full(buf) => buf.get(index),
            BoundaryStorage::Sparse(buf) => buf.get(index),
        }
    }

    /// `true` once a real boundary row was written for `index`.
    pub fn is_materialized(&self, index: usize) -> bool {
        let row = self.get(index);
        !row.is_empty() && !row[0].is_placeholder()
    }
}

/// Region membership storage. Starts as growable per-element vectors and can
/// be switched once to the packed shape; the switch is one-way.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RegionStorage {
    Vectors(BucketBuffer<RegionId>),
    Packed(SparsePackedBuffer<RegionId>),
}

/// All elements of one topological dimension.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementBuffer {
    /// Dimension of every element in this buffer.
    dimension: usize,
    /// Cell type per element.
    types: Vec<CellType>,
    /// Boundary lists toward dimension `d`, for `d` in `0..dimension`.
    boundaries: Vec<BoundaryStorage>,
    /// Refinement parent per element, if any.
    parents: Vec<Option<ElementId>>,
    /// Region memberships per element, each row sorted by id.
    regions: RegionStorage,
    /// Smallest vertex id -> indices of elements whose vertex set starts there.
    lookup: HashMap<ElementId, Vec<usize>>,
}

impl ElementBuffer {
    /// Create an empty buffer for elements of `dimension`.
    ///
    /// `sparse` selects the storage shape of the boundary lists toward
    /// dimensions `1..dimension`; the vertex list is always dense.
    pub fn new(dimension: usize, sparse: bool) -> Self {
        let boundaries = (0..dimension)
            .map(|d| {
                if d == 0 || !sparse {
                    BoundaryStorage::Full(PackedBuffer::new())
                } else {
                    BoundaryStorage::Sparse(SparsePackedBuffer::new())
                }
            })
            .collect();
        ElementBuffer {
            dimension,
            types: Vec::new(),
            boundaries,
            parents: Vec::new(),
            regions: RegionStorage::Vectors(BucketBuffer::new()),
            lookup: HashMap::new(),
        }
    }

    /// Dimension of the elements stored here.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// `true` if no element is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Cell type of element `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    pub fn cell_type(&self, index: usize) -> CellType {
        self.types[index]
    }

    /// Append a dimension-0 element. Only valid on the vertex buffer.
    pub fn push_vertex(&mut self) -> usize {
        debug_assert_eq!(self.dimension, 0);
        self.types.push(CellType::Vertex);
        self.parents.push(None);
        self.types.len() - 1
    }

    /// Append an element of `cell_type` spanning `vertices`, after validating
    /// the vertex list. Returns the new element's index.
    ///
    /// With `reserve` set, dense boundary rows toward dimensions
    /// `1..dimension` are pre-sized with placeholder ids so the boundary
    /// extraction can fill them in place; otherwise those rows start empty
    /// and are resized when materialized.
    ///
    /// # Errors
    /// - `EmptyVertexList` if `vertices` is empty.
    /// - `VertexCountMismatch` if the count does not match `cell_type`.
    /// - `ExpectedVertex` if any id is not dimension 0.
    /// - `DuplicateVertex` if the same vertex appears twice.
    pub fn try_push_element(
        &mut self,
        cell_type: CellType,
        vertices: &[ElementId],
        reserve: bool,
    ) -> Result<usize, TopoMeshError> {
        debug_assert!(self.dimension >= 1);
        self.validate_vertex_list(cell_type, vertices)?;

        let index = self.types.len();
        self.types.push(cell_type);
        self.parents.push(None);
        match &mut self.boundaries[0] {
            BoundaryStorage::Full(buf) => {
                buf.push_row(vertices);
            }
            BoundaryStorage::Sparse(_) => unreachable!("vertex lists are always dense"),
        }
        for target_dim in 1..self.dimension {
            if let BoundaryStorage::Full(buf) = &mut self.boundaries[target_dim] {
                if reserve {
                    buf.push_row_filled(cell_type.boundary_count(target_dim), ElementId::PLACEHOLDER);
                } else {
                    buf.push_row(&[]);
                }
            }
        }
        let key = *vertices.iter().min().unwrap();
        self.lookup.entry(key).or_default().push(index);
        Ok(index)
    }

    /// Bulk-append elements from parallel type and offset arrays over one
    /// flat vertex array, without deduplication. Element `i` has cell type
    /// `types[i]` and spans `flat[offsets[i]..offsets[i + 1]]`. Returns the
    /// index range of the new elements.
    ///
    /// # Errors
    /// - `EmptyVertexList` if `types` is empty.
    /// - `RowCountMismatch` if `offsets` does not have `types.len() + 1`
    ///   entries, or does not start at 0 and end at `flat.len()`.
    /// - `CorruptOffsets` if `offsets` is not monotone.
    /// - `MixedBatchDimensions` if a type's dimension differs from the
    ///   buffer's.
    /// - The per-cell validation errors of
    ///   [`try_push_element`](Self::try_push_element).
    ///
    /// Validation runs before anything is stored, so a failed call leaves the
    /// buffer untouched.
    pub fn try_push_elements(
        &mut self,
        types: &[CellType],
        offsets: &[usize],
        flat: &[ElementId],
    ) -> Result<std::ops::Range<usize>, TopoMeshError> {
        debug_assert!(self.dimension >= 1);
        if types.is_empty() {
            return Err(TopoMeshError::EmptyVertexList);
        }
        if offsets.len() != types.len() + 1 {
            return Err(TopoMeshError::RowCountMismatch {
                expected: types.len() + 1,
                found: offsets.len(),
            });
        }
        if offsets[0] != 0 || offsets[types.len()] != flat.len() {
            return Err(TopoMeshError::RowCountMismatch {
                expected: flat.len(),
                found: offsets[types.len()],
            });
        }
        let mut row_lens = Vec::with_capacity(types.len());
        for (i, &cell_type) in types.iter().enumerate() {
            if cell_type.dimension() != self.dimension {
                return Err(TopoMeshError::MixedBatchDimensions {
                    expected: self.dimension,
                    found: cell_type.dimension(),
                });
            }
            let (start, end) = (offsets[i], offsets[i + 1]);
            if start > end || end > flat.len() {
                return Err(TopoMeshError::CorruptOffsets { index: i });
            }
            self.validate_vertex_list(cell_type, &flat[start..end])?;
            row_lens.push(end - start);
        }

        let count = types.len();
        let first = self.types.len();
        self.types.extend_from_slice(types);
        self.parents.extend(std::iter::repeat(None).take(count));
        match &mut self.boundaries[0] {
            BoundaryStorage::Full(buf) => {
                buf.try_push_rows(&row_lens, flat)?;
            }
            BoundaryStorage::Sparse(_) => unreachable!("vertex lists are always dense"),
        }
        for target_dim in 1..self.dimension {
            if let BoundaryStorage::Full(buf) = &mut self.boundaries[target_dim] {
                for _ in 0..count {
                    buf.push_row(&[]);
                }
            }
        }
        for i in 0..count {
            let chunk = &flat[offsets[i]..offsets[i + 1]];
            let key = *chunk.iter().min().unwrap();
            self.lookup.entry(key).or_default().push(first + i);
        }
        Ok(first..first + count)
    }

    fn validate_vertex_list(
        &self,
        cell_type: CellType,
        vertices: &[ElementId],
    ) -> Result<(), TopoMeshError> {
        if vertices.is_empty() {
            return Err(TopoMeshError::EmptyVertexList);
        }
        let expected = cell_type.vertex_count();
        if vertices.len() != expected {
            return Err(TopoMeshError::VertexCountMismatch {
                cell_type,
                expected,
                found: vertices.len(),
            });
        }
        for (i, &v) in vertices.iter().enumerate() {
            if !v.is_vertex() {
                return Err(TopoMeshError::ExpectedVertex(v));
            }
            if vertices[..i].contains(&v) {
                return Err(TopoMeshError::DuplicateVertex(v));
            }
        }
        Ok(())
    }

    /// Find the element of `cell_type` spanning exactly the given vertex set,
    /// winding ignored.
    pub fn find(&self, cell_type: CellType, vertices: &[ElementId]) -> Option<usize> {
        let key = *vertices.iter().min()?;
        let candidates = self.lookup.get(&key)?;
        candidates.iter().copied().find(|&idx| {
            self.types[idx] == cell_type && same_vertex_set(self.vertices_of(idx), vertices)
        })
    }

    /// Vertex list of element `index`, in stored winding order. Empty on the
    /// dimension-0 buffer, which stores no lists.
    #[inline]
    pub fn vertices_of(&self, index: usize) -> &[ElementId] {
        self.boundary_of(index, 0)
    }

    /// Boundary list of element `index` toward `target_dim`; empty if that
    /// list was never materialized.
    #[inline]
    pub fn boundary_of(&self, index: usize, target_dim: usize) -> &[ElementId] {
        match self.boundaries.get(target_dim) {
            Some(storage) => storage.get(index),
            None => &[],
        }
    }

    /// `true` once element `index` has a materialized boundary at `target_dim`.
    pub fn has_boundary(&self, index: usize, target_dim: usize) -> bool {
        if target_dim == 0 {
            return index < self.len();
        }
        self.boundaries
            .get(target_dim)
            .is_some_and(|storage| storage.is_materialized(index))
    }

    /// Storage of the boundary lists toward `target_dim`.
    pub fn boundary_storage(&self, target_dim: usize) -> Option<&BoundaryStorage> {
        self.boundaries.get(target_dim)
    }

    /// Overwrite the boundary row of element `index` toward `target_dim`.
    ///
    /// Dense rows of a different size are resized in place, shifting the
    /// packed tail; sparse rows are inserted.
    pub fn set_boundary_row(&mut self, index: usize, target_dim: usize, ids: &[ElementId]) {
        debug_assert!(target_dim >= 1 && target_dim < self.dimension);
        debug_assert!(ids.iter().all(|id| id.dimension() == target_dim));
        match &mut self.boundaries[target_dim] {
            BoundaryStorage::Full(buf) => {
                if buf.len_of(index) != ids.len() {
                    buf.resize_row(index, ids.len(), ElementId::PLACEHOLDER);
                }
                buf.get_mut(index).copy_from_slice(ids);
            }
            BoundaryStorage::Sparse(buf) => {
                buf.insert(index, ids);
            }
        }
    }

    /// Refinement parent of element `index`.
    #[inline]
    pub fn parent(&self, index: usize) -> Option<ElementId> {
        self.parents.get(index).copied().flatten()
    }

    /// Record the refinement parent of element `index`.
    pub fn set_parent(&mut self, index: usize, parent: ElementId) {
        self.parents[index] = Some(parent);
    }

    /// Regions containing element `index`, sorted by id.
    pub fn regions_of(&self, index: usize) -> &[RegionId] {
        match &self.regions {
            RegionStorage::Vectors(buckets) => buckets.get(index),
            RegionStorage::Packed(buf) => buf.get(index),
        }
    }

    /// Add element `index` to `region`. Returns `true` if the membership is
    /// new, `false` if it was already recorded.
    pub fn add_region(&mut self, index: usize, region: RegionId) -> bool {
        match &mut self.regions {
            RegionStorage::Vectors(buckets) => {
                let row = buckets.row_mut(index);
                match row.binary_search(&region) {
                    Ok(_) => false,
                    Err(pos) => {
                        row.insert(pos, region);
                        true
                    }
                }
            }
            RegionStorage::Packed(buf) => {
                if buf.get(index).contains(&region) {
                    return false;
                }
                buf.push_value(index, region);
                if let Some(row) = buf.get_mut(index) {
                    row.sort_unstable();
                }
                true
            }
        }
    }

    /// `true` once the region storage was switched to the packed shape.
    pub fn region_storage_is_packed(&self) -> bool {
        matches!(self.regions, RegionStorage::Packed(_))
    }

    /// Switch region storage from per-element vectors to the packed shape.
    /// A no-op if already packed; the switch cannot be reversed.
    pub fn pack_region_storage(&mut self) {
        if let RegionStorage::Vectors(buckets) = &self.regions {
            let mut packed = SparsePackedBuffer::new();
            for (index, row) in buckets.iter() {
                if !row.is_empty() {
                    packed.insert(index, row);
                }
            }
            self.regions = RegionStorage::Packed(packed);
        }
    }

    /// Replace every boundary list toward dimensions `1..dimension` with
    /// fresh dense storage holding one empty row per element.
    pub(crate) fn reset_boundaries_full(&mut self) {
        let rows = self.len();
        for target_dim in 1..self.dimension {
            self.boundaries[target_dim] = BoundaryStorage::Full(PackedBuffer::with_empty_rows(rows));
        }
    }

    /// Replace every boundary list toward dimensions `1..dimension` with
    /// empty sparse storage, dropping the materialized lists.
    pub(crate) fn reset_boundaries_sparse(&mut self) {
        for target_dim in 1..self.dimension {
            self.boundaries[target_dim] = BoundaryStorage::Sparse(SparsePackedBuffer::new());
        }
    }

    /// Drop every element while keeping the layout shape.
    pub fn clear(&mut self) {
        let sparse = matches!(
            self.boundaries.get(1),
            Some(BoundaryStorage::Sparse(_))
        );
        *self = ElementBuffer::new(self.dimension, sparse);
    }
}

/// Unordered equality of a stored vertex list against a query. Stored lists
/// are duplicate-free, so mutual containment at equal length is exact set
/// equality even when the query repeats an id.
fn same_vertex_set(stored: &[ElementId], query: &[ElementId]) -> bool {
    stored.len() == query.len()
        && query.iter().all(|v| stored.contains(v))
        && stored.iter().all(|v| query.contains(v))
}

impl DebugInvariants for ElementBuffer {
    fn debug_assert_invariants(&self) {
        crate::debug_assert_ok!(self.validate_invariants(), "ElementBuffer");
    }

    fn validate_invariants(&self) -> Result<(), TopoMeshError> {
        let n = self.len();
        if self.parents.len() != n {
            return Err(TopoMeshError::RowCountMismatch {
                expected: n,
                found: self.parents.len(),
            });
        }
        for storage in &self.boundaries {
            match storage {
                BoundaryStorage::Full(buf) => {
                    buf.validate_invariants()?;
                    if buf.len() != n {
                        return Err(TopoMeshError::RowCountMismatch {
                            expected: n,
                            found: buf.len(),
                        });
                    }
                }
                BoundaryStorage::Sparse(buf) => buf.validate_invariants()?,
            }
        }
        let mut indexed = 0;
        for (&key, indices) in &self.lookup {
            for &idx in indices {
                indexed += 1;
                let verts = self.vertices_of(idx);
                if idx >= n || verts.iter().min() != Some(&key) {
                    return Err(TopoMeshError::LookupCorrupt {
                        element: ElementId::new(self.dimension, idx),
                    });
                }
            }
        }
        if self.dimension >= 1 && indexed != n {
            return Err(TopoMeshError::RowCountMismatch {
                expected: n,
                found: indexed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vid(n: usize) -> ElementId {
        ElementId::new(0, n)
    }

    fn triangle_buffer() -> ElementBuffer {
        let mut buf = ElementBuffer::new(2, false);
        buf.try_push_element(CellType::Triangle, &[vid(0), vid(1), vid(2)], false)
            .unwrap();
        buf.try_push_element(CellType::Triangle, &[vid(1), vid(3), vid(2)], false)
            .unwrap();
        buf
    }

    #[test]
    fn push_and_inspect() {
        let buf = triangle_buffer();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.cell_type(0), CellType::Triangle);
        assert_eq!(buf.vertices_of(1), &[vid(1), vid(3), vid(2)]);
        buf.debug_assert_invariants();
    }

    #[test]
    fn vertex_list_validation() {
        let mut buf = ElementBuffer::new(2, false);
        assert_eq!(
            buf.try_push_element(CellType::Triangle, &[], false),
            Err(TopoMeshError::EmptyVertexList)
        );
        assert_eq!(
            buf.try_push_element(CellType::Triangle, &[vid(0), vid(1)], false),
            Err(TopoMeshError::VertexCountMismatch {
                cell_type: CellType::Triangle,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            buf.try_push_element(CellType::Triangle, &[vid(0), vid(1), vid(0)], false),
            Err(TopoMeshError::DuplicateVertex(vid(0)))
        );
        let edge = ElementId::new(1, 0);
        assert_eq!(
            buf.try_push_element(CellType::Triangle, &[vid(0), vid(1), edge], false),
            Err(TopoMeshError::ExpectedVertex(edge))
        );
    }

    #[test]
    fn find_ignores_winding_but_not_type() {
        let buf = triangle_buffer();
        assert_eq!(buf.find(CellType::Triangle, &[vid(2), vid(0), vid(1)]), Some(0));
        assert_eq!(buf.find(CellType::Triangle, &[vid(2), vid(1), vid(3)]), Some(1));
        assert_eq!(buf.find(CellType::Triangle, &[vid(0), vid(1), vid(3)]), None);
        // Same vertex set under another 3-vertex type matches nothing.
        assert_eq!(buf.find(CellType::Polygon(3), &[vid(0), vid(1), vid(2)]), None);
        // Nor does a query that repeats an id against a stored list.
        assert_eq!(buf.find(CellType::Triangle, &[vid(0), vid(0), vid(1)]), None);
    }

    #[test]
    fn reserved_rows_hold_placeholders() {
        let mut buf = ElementBuffer::new(2, false);
        let idx = buf
            .try_push_element(CellType::Triangle, &[vid(0), vid(1), vid(2)], true)
            .unwrap();
        assert!(!buf.has_boundary(idx, 1));
        assert_eq!(buf.boundary_of(idx, 1).len(), 3);

        let edges = [ElementId::new(1, 0), ElementId::new(1, 1), ElementId::new(1, 2)];
        buf.set_boundary_row(idx, 1, &edges);
        assert!(buf.has_boundary(idx, 1));
        assert_eq!(buf.boundary_of(idx, 1), &edges);
        buf.debug_assert_invariants();
    }

    #[test]
    fn unreserved_rows_grow_on_materialization() {
        let mut buf = triangle_buffer();
        assert!(!buf.has_boundary(0, 1));
        assert_eq!(buf.boundary_of(0, 1).len(), 0);

        let edges = [ElementId::new(1, 0), ElementId::new(1, 1), ElementId::new(1, 2)];
        buf.set_boundary_row(1, 1, &edges);
        assert!(buf.has_boundary(1, 1));
        assert!(!buf.has_boundary(0, 1));
        buf.debug_assert_invariants();
    }

    #[test]
    fn sparse_boundaries_materialize_on_demand() {
        let mut buf = ElementBuffer::new(2, true);
        buf.try_push_element(CellType::Triangle, &[vid(0), vid(1), vid(2)], false)
            .unwrap();
        assert!(!buf.has_boundary(0, 1));
        let edges = [ElementId::new(1, 0), ElementId::new(1, 1), ElementId::new(1, 2)];
        buf.set_boundary_row(0, 1, &edges);
        assert!(buf.has_boundary(0, 1));
        assert_eq!(buf.boundary_of(0, 1), &edges);
        buf.debug_assert_invariants();
    }

    #[test]
    fn region_rows_stay_sorted_across_the_switch() {
        let mut buf = triangle_buffer();
        assert!(buf.add_region(0, RegionId(3)));
        assert!(buf.add_region(0, RegionId(1)));
        assert!(!buf.add_region(0, RegionId(3)));
        assert_eq!(buf.regions_of(0), &[RegionId(1), RegionId(3)]);

        buf.pack_region_storage();
        assert!(buf.region_storage_is_packed());
        assert_eq!(buf.regions_of(0), &[RegionId(1), RegionId(3)]);

        assert!(buf.add_region(0, RegionId(2)));
        assert!(buf.add_region(1, RegionId(7)));
        assert_eq!(buf.regions_of(0), &[RegionId(1), RegionId(2), RegionId(3)]);
        assert_eq!(buf.regions_of(1), &[RegionId(7)]);
        buf.debug_assert_invariants();
    }

    #[test]
    fn bulk_push_validates_before_storing() {
        let mut buf = ElementBuffer::new(2, false);
        let range = buf
            .try_push_elements(
                &[CellType::Triangle, CellType::Quadrilateral],
                &[0, 3, 7],
                &[vid(0), vid(1), vid(2), vid(1), vid(3), vid(4), vid(2)],
            )
            .unwrap();
        assert_eq!(range, 0..2);
        assert_eq!(buf.cell_type(1), CellType::Quadrilateral);
        assert_eq!(buf.vertices_of(1), &[vid(1), vid(3), vid(4), vid(2)]);
        assert_eq!(buf.find(CellType::Quadrilateral, &[vid(2), vid(4), vid(3), vid(1)]), Some(1));

        // A bad cell in the middle leaves the buffer untouched.
        let err = buf
            .try_push_elements(
                &[CellType::Triangle, CellType::Triangle],
                &[0, 3, 6],
                &[vid(4), vid(5), vid(6), vid(7), vid(7), vid(8)],
            )
            .unwrap_err();
        assert_eq!(err, TopoMeshError::DuplicateVertex(vid(7)));
        assert_eq!(buf.len(), 2);

        // Offsets must cover the flat array exactly.
        let err = buf
            .try_push_elements(&[CellType::Triangle], &[0, 2], &[vid(4), vid(5), vid(6)])
            .unwrap_err();
        assert_eq!(err, TopoMeshError::RowCountMismatch { expected: 3, found: 2 });
        assert_eq!(buf.len(), 2);
        buf.debug_assert_invariants();
    }

    #[test]
    fn parents_are_recorded() {
        let mut buf = triangle_buffer();
        assert_eq!(buf.parent(0), None);
        buf.set_parent(0, ElementId::new(2, 9));
        assert_eq!(buf.parent(0), Some(ElementId::new(2, 9)));
    }
}
