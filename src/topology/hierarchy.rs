//! The mesh hierarchy: element buffers, meshes, regions and layout state.
//!
//! [`MeshHierarchy`] is the facade of the crate. It owns one
//! [`ElementBuffer`] per dimension, the vertex coordinate array, the region
//! table, and the arena of [`Mesh`] views rooted at the implicit root mesh.
//! Every topology mutation flows through it and bumps a hierarchy-wide
//! generation counter that derived caches stamp themselves against.
//!
//! # Determinism
//!
//! Element ids are handed out in creation order, ties in any derived data are
//! broken by id order, and all iteration is over sorted structures; the same
//! sequence of operations always produces the same hierarchy.

use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::error::TopoMeshError;
use crate::topology::cell_type::CellType;
use crate::topology::element::{ElementId, MeshId, RegionId, MAX_DIMENSION};
use crate::topology::element_buffer::ElementBuffer;
use crate::topology::mesh::Mesh;
use crate::topology::region::Region;

/// Storage shape of the boundary lists of dimensions `1..=2`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryLayout {
    /// One row per element; rows are reserved at creation and filled by
    /// boundary extraction.
    #[default]
    Full,
    /// Rows only for elements whose boundary was explicitly materialized.
    /// Cheaper for cell-only workloads, but child meshes are unavailable.
    Sparse,
}

/// An indexed mesh hierarchy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshHierarchy {
    /// Number of coordinates per vertex, in `1..=3`.
    pub(crate) geometric_dimension: usize,
    /// Vertex coordinates, `geometric_dimension` values per vertex.
    pub(crate) coordinates: Vec<f64>,
    /// One element buffer per topological dimension `0..=MAX_DIMENSION`.
    pub(crate) buffers: Vec<ElementBuffer>,
    /// Region table, sorted by id.
    pub(crate) regions: Vec<Region>,
    /// Current boundary storage layout.
    pub(crate) layout: BoundaryLayout,
    /// Mesh arena; index 0 is the root mesh owning every element.
    pub(crate) meshes: Vec<Mesh>,
    /// Bumped on every topology mutation; caches stamp against it.
    pub(crate) generation: u64,
}

impl MeshHierarchy {
    /// Create an empty hierarchy with the default full boundary layout.
    ///
    /// # Errors
    /// Returns `InvalidGeometricDimension` unless
    /// `geometric_dimension` is in `1..=3`.
    pub fn new(geometric_dimension: usize) -> Result<Self, TopoMeshError> {
        Self::with_layout(geometric_dimension, BoundaryLayout::Full)
    }

    /// Create an empty hierarchy with an explicit boundary layout.
    ///
    /// # Errors
    /// Returns `InvalidGeometricDimension` unless
    /// `geometric_dimension` is in `1..=3`.
    pub fn with_layout(
        geometric_dimension: usize,
        layout: BoundaryLayout,
    ) -> Result<Self, TopoMeshError> {
        if !(1..=3).contains(&geometric_dimension) {
            return Err(TopoMeshError::InvalidGeometricDimension {
                dimension: geometric_dimension,
            });
        }
        let sparse = layout == BoundaryLayout::Sparse;
        Ok(MeshHierarchy {
            geometric_dimension,
            coordinates: Vec::new(),
            buffers: (0..=MAX_DIMENSION)
                .map(|d| ElementBuffer::new(d, sparse))
                .collect(),
            regions: Vec::new(),
            layout,
            meshes: vec![Mesh::new("root", None)],
            generation: 0,
        })
    }

    /// Number of coordinates stored per vertex.
    #[inline]
    pub fn geometric_dimension(&self) -> usize {
        self.geometric_dimension
    }

    /// Current boundary storage layout.
    #[inline]
    pub fn boundary_layout(&self) -> BoundaryLayout {
        self.layout
    }

    /// Current topology generation. Any mutation makes it grow.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of elements of `dimension`; 0 for out-of-range dimensions.
    #[inline]
    pub fn element_count(&self, dimension: usize) -> usize {
        self.buffers.get(dimension).map_or(0, ElementBuffer::len)
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.buffers[0].len()
    }

    /// Highest dimension at which elements exist.
    pub fn cell_dimension(&self) -> usize {
        (1..=MAX_DIMENSION)
            .rev()
            .find(|&d| !self.buffers[d].is_empty())
            .unwrap_or(0)
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    // ---------------------------------------------------------------------
    // Validation helpers
    // ---------------------------------------------------------------------

    fn check_mesh(&self, mesh: MeshId) -> Result<(), TopoMeshError> {
        if mesh.0 < self.meshes.len() {
            Ok(())
        } else {
            Err(TopoMeshError::UnknownMesh(mesh))
        }
    }

    fn check_element(&self, id: ElementId) -> Result<(), TopoMeshError> {
        if id.index() < self.buffers[id.dimension()].len() {
            Ok(())
        } else {
            Err(TopoMeshError::UnknownElement(id))
        }
    }

    fn check_vertex(&self, id: ElementId) -> Result<(), TopoMeshError> {
        if !id.is_vertex() {
            return Err(TopoMeshError::ExpectedVertex(id));
        }
        self.check_element(id)
    }

    fn check_region(&self, region: RegionId) -> Result<(), TopoMeshError> {
        match self.regions.binary_search_by_key(&region, Region::id) {
            Ok(_) => Ok(()),
            Err(_) => Err(TopoMeshError::UnknownRegion(region)),
        }
    }

    // ---------------------------------------------------------------------
    // Vertices
    // ---------------------------------------------------------------------

    /// Create a vertex at the given coordinates and register it into the
    /// root mesh.
    ///
    /// # Errors
    /// Returns `GeometryDimensionMismatch` if `coords` does not hold exactly
    /// `geometric_dimension` values.
    pub fn make_vertex(&mut self, coords: &[f64]) -> Result<ElementId, TopoMeshError> {
        if coords.len() != self.geometric_dimension {
            return Err(TopoMeshError::GeometryDimensionMismatch {
                expected: self.geometric_dimension,
                found: coords.len(),
            });
        }
        let index = self.buffers[0].push_vertex();
        self.coordinates.extend_from_slice(coords);
        let id = ElementId::new(0, index);
        self.meshes[0].register(id);
        self.touch();
        Ok(id)
    }

    /// Coordinates of `vertex`.
    ///
    /// # Errors
    /// Returns `ExpectedVertex` for non-vertex ids and `UnknownElement` for
    /// out-of-range ids.
    pub fn vertex_coords(&self, vertex: ElementId) -> Result<&[f64], TopoMeshError> {
        self.check_vertex(vertex)?;
        let start = vertex.index() * self.geometric_dimension;
        Ok(&self.coordinates[start..start + self.geometric_dimension])
    }

    // ---------------------------------------------------------------------
    // Element creation and lookup
    // ---------------------------------------------------------------------

    /// Get or create the element of `cell_type` spanning `vertices`, register
    /// it (with its boundary closure) into `mesh` and all ancestor meshes,
    /// and return `(id, created)`.
    ///
    /// Identity is the cell type plus its unordered vertex set; the stored
    /// winding is that of the first creation. With `make_boundary` set, the
    /// element's boundary elements are created and linked as well.
    ///
    /// # Errors
    /// - `UnknownMesh` / `UnknownElement` for stale handles.
    /// - `InvalidDimension` when `cell_type` is `Vertex`.
    /// - `EmptyVertexList`, `VertexCountMismatch`, `DuplicateVertex`,
    ///   `ExpectedVertex` for malformed vertex lists.
    pub fn get_make_element(
        &mut self,
        mesh: MeshId,
        cell_type: CellType,
        vertices: &[ElementId],
        make_boundary: bool,
    ) -> Result<(ElementId, bool), TopoMeshError> {
        self.check_mesh(mesh)?;
        let dim = cell_type.dimension();
        if dim == 0 {
            return Err(TopoMeshError::InvalidDimension { dimension: dim });
        }
        for &v in vertices {
            self.check_vertex(v)?;
        }
        let (id, created) = self.get_make_inner(mesh, cell_type, vertices, make_boundary)?;
        if make_boundary {
            self.make_boundary(id, mesh)?;
        }
        Ok((id, created))
    }

    /// Dedup-or-create without the public-entry validation. `reserve` presizes
    /// dense boundary rows so extraction can fill them in place.
    fn get_make_inner(
        &mut self,
        mesh: MeshId,
        cell_type: CellType,
        vertices: &[ElementId],
        reserve: bool,
    ) -> Result<(ElementId, bool), TopoMeshError> {
        let dim = cell_type.dimension();
        if let Some(index) = self.buffers[dim].find(cell_type, vertices) {
            let id = ElementId::new(dim, index);
            self.register_with_closure(mesh, id);
            return Ok((id, false));
        }
        let reserve = reserve && self.layout == BoundaryLayout::Full;
        let index = self.buffers[dim].try_push_element(cell_type, vertices, reserve)?;
        let id = ElementId::new(dim, index);
        self.touch();
        self.register_with_closure(mesh, id);
        Ok((id, true))
    }

    /// Find the element of `cell_type` spanning exactly `vertices`.
    ///
    /// Both the unordered vertex set and the cell type must match; a query
    /// that repeats a vertex id matches nothing.
    ///
    /// # Errors
    /// Returns `InvalidDimension` when `cell_type` is `Vertex`, and
    /// `UnknownElement`/`ExpectedVertex` for bad ids.
    pub fn get_element(
        &self,
        cell_type: CellType,
        vertices: &[ElementId],
    ) -> Result<Option<ElementId>, TopoMeshError> {
        let dimension = cell_type.dimension();
        if dimension == 0 {
            return Err(TopoMeshError::InvalidDimension { dimension });
        }
        for &v in vertices {
            self.check_vertex(v)?;
        }
        Ok(self.buffers[dimension]
            .find(cell_type, vertices)
            .map(|index| ElementId::new(dimension, index)))
    }

    /// Bulk-create elements from parallel type and offset arrays over one
    /// flat vertex array, without deduplication against existing elements.
    /// Element `i` has cell type `types[i]` and spans
    /// `vertices[offsets[i]..offsets[i + 1]]`, so `offsets` carries one more
    /// entry than `types`. All types in a batch must share one topological
    /// dimension. Intended for loading a mesh wholesale; boundary extraction
    /// is not performed.
    ///
    /// # Errors
    /// Returns `RowCountMismatch` or `CorruptOffsets` for a malformed offset
    /// array, `MixedBatchDimensions` when the types span more than one
    /// dimension, plus the per-cell validation errors of
    /// [`get_make_element`](Self::get_make_element).
    pub fn make_elements(
        &mut self,
        mesh: MeshId,
        types: &[CellType],
        offsets: &[usize],
        vertices: &[ElementId],
    ) -> Result<Vec<ElementId>, TopoMeshError> {
        self.check_mesh(mesh)?;
        let dim = match types.first() {
            Some(cell_type) => cell_type.dimension(),
            None => return Err(TopoMeshError::EmptyVertexList),
        };
        if dim == 0 {
            return Err(TopoMeshError::InvalidDimension { dimension: dim });
        }
        for &v in vertices {
            self.check_vertex(v)?;
        }
        let range = self.buffers[dim].try_push_elements(types, offsets, vertices)?;
        let ids: Vec<ElementId> = range.map(|index| ElementId::new(dim, index)).collect();
        self.touch();
        for &id in &ids {
            self.register_with_closure(mesh, id);
        }
        Ok(ids)
    }

    /// Cell type of `element`.
    pub fn element_cell_type(&self, element: ElementId) -> Result<CellType, TopoMeshError> {
        self.check_element(element)?;
        Ok(self.buffers[element.dimension()].cell_type(element.index()))
    }

    /// Refinement parent of `element`, if it was produced by refinement.
    pub fn element_parent(&self, element: ElementId) -> Result<Option<ElementId>, TopoMeshError> {
        self.check_element(element)?;
        Ok(self.buffers[element.dimension()].parent(element.index()))
    }

    // ---------------------------------------------------------------------
    // Boundary extraction
    // ---------------------------------------------------------------------

    /// Materialize the boundary of `element`: create (or find) its edges and,
    /// for 3D cells, its faces; link them in local table order; propagate the
    /// element's regions onto them; register everything into `mesh` and its
    /// ancestors.
    ///
    /// A no-op for vertices and lines (their boundary is always stored) and
    /// for cells whose boundary is already materialized.
    ///
    /// # Errors
    /// Returns `UnknownMesh`/`UnknownElement` for stale handles.
    pub fn make_boundary(&mut self, element: ElementId, mesh: MeshId) -> Result<(), TopoMeshError> {
        self.check_mesh(mesh)?;
        self.check_element(element)?;
        let dim = element.dimension();
        if dim <= 1 {
            self.register_with_closure(mesh, element);
            return Ok(());
        }
        let index = element.index();
        if self.buffers[dim].has_boundary(index, 1)
            && (dim < 3 || self.buffers[dim].has_boundary(index, 2))
        {
            self.register_with_closure(mesh, element);
            return Ok(());
        }

        let cell_type = self.buffers[dim].cell_type(index);
        let verts: Vec<ElementId> = self.buffers[dim].vertices_of(index).to_vec();
        let cell_regions: Vec<RegionId> = self.buffers[dim].regions_of(index).to_vec();

        // Edges, in local table order; Polygon edges are the cyclic pairs.
        let mut edge_ids = Vec::with_capacity(cell_type.edge_count());
        if let CellType::Polygon(n) = cell_type {
            let n = n as usize;
            for i in 0..n {
                let pair = [verts[i], verts[(i + 1) % n]];
                let (eid, _) = self.get_make_inner(mesh, CellType::Line, &pair, false)?;
                edge_ids.push(eid);
            }
        } else {
            for e in cell_type.local_edges() {
                let pair = [verts[e[0]], verts[e[1]]];
                let (eid, _) = self.get_make_inner(mesh, CellType::Line, &pair, false)?;
                edge_ids.push(eid);
            }
        }
        self.buffers[dim].set_boundary_row(index, 1, &edge_ids);

        if dim == 3 {
            let mut face_ids = Vec::with_capacity(cell_type.face_count());
            for f in cell_type.local_faces() {
                let fverts: Vec<ElementId> = f.vertices.iter().map(|&i| verts[i]).collect();
                let (fid, _) = self.get_make_inner(mesh, f.cell_type, &fverts, false)?;
                // The face's own edge list follows from the cell tables; fill
                // it unless an earlier cell already did.
                if !self.buffers[2].has_boundary(fid.index(), 1) {
                    let fedges: Vec<ElementId> = f.edges.iter().map(|&e| edge_ids[e]).collect();
                    self.buffers[2].set_boundary_row(fid.index(), 1, &fedges);
                }
                face_ids.push(fid);
            }
            self.buffers[dim].set_boundary_row(index, 2, &face_ids);
        }

        if !cell_regions.is_empty() {
            let mut any = false;
            for &r in &cell_regions {
                for target in 0..dim {
                    for id in self.buffers[dim].boundary_of(index, target).to_vec() {
                        any |= self.buffers[id.dimension()].add_region(id.index(), r);
                    }
                }
            }
            if any {
                self.touch();
            }
        }
        self.register_with_closure(mesh, element);
        Ok(())
    }

    /// Boundary elements of `element` at `target_dim`, in local table order.
    ///
    /// # Errors
    /// - `InvalidDimension` unless `target_dim < element.dimension()`.
    /// - `BoundaryNotMaterialized` if the list exists but was never built.
    pub fn boundary(
        &self,
        element: ElementId,
        target_dim: usize,
    ) -> Result<&[ElementId], TopoMeshError> {
        self.check_element(element)?;
        let dim = element.dimension();
        if target_dim >= dim {
            return Err(TopoMeshError::InvalidDimension {
                dimension: target_dim,
            });
        }
        if target_dim == 0 {
            return Ok(self.buffers[dim].vertices_of(element.index()));
        }
        if !self.buffers[dim].has_boundary(element.index(), target_dim) {
            return Err(TopoMeshError::BoundaryNotMaterialized {
                element,
                dimension: target_dim,
            });
        }
        Ok(self.buffers[dim].boundary_of(element.index(), target_dim))
    }

    // ---------------------------------------------------------------------
    // Meshes
    // ---------------------------------------------------------------------

    /// The root mesh id.
    #[inline]
    pub fn root(&self) -> MeshId {
        MeshId::ROOT
    }

    /// Number of meshes, the root included.
    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Mesh by id.
    pub fn mesh(&self, mesh: MeshId) -> Result<&Mesh, TopoMeshError> {
        self.check_mesh(mesh)?;
        Ok(&self.meshes[mesh.0])
    }

    /// Sorted element ids of `mesh` at `dimension`.
    pub fn mesh_elements(
        &self,
        mesh: MeshId,
        dimension: usize,
    ) -> Result<&[ElementId], TopoMeshError> {
        self.check_mesh(mesh)?;
        if dimension > MAX_DIMENSION {
            return Err(TopoMeshError::InvalidDimension { dimension });
        }
        Ok(self.meshes[mesh.0].handles(dimension).ids())
    }

    /// Create a child mesh under `parent`.
    ///
    /// # Errors
    /// - `UnknownMesh` if `parent` does not exist.
    /// - `SparseLayoutUnsupported` under the sparse layout, where element
    ///   closures are not available for registration.
    pub fn create_mesh(&mut self, parent: MeshId, name: &str) -> Result<MeshId, TopoMeshError> {
        self.check_mesh(parent)?;
        if self.layout == BoundaryLayout::Sparse {
            return Err(TopoMeshError::SparseLayoutUnsupported {
                operation: "create_mesh",
            });
        }
        let id = MeshId(self.meshes.len());
        self.meshes.push(Mesh::new(name, Some(parent)));
        self.meshes[parent.0].children.push(id);
        Ok(id)
    }

    /// Register `element` and its boundary closure into `mesh` and all
    /// ancestors of `mesh`.
    pub fn add_to_mesh(&mut self, element: ElementId, mesh: MeshId) -> Result<(), TopoMeshError> {
        self.check_mesh(mesh)?;
        self.check_element(element)?;
        self.register_with_closure(mesh, element);
        Ok(())
    }

    /// Collect `id` plus its materialized boundary closure, register the lot
    /// into `mesh` and every ancestor, and bump the generation if any mesh
    /// gained a handle.
    fn register_with_closure(&mut self, mesh: MeshId, id: ElementId) {
        let mut ids = vec![id];
        let buf = &self.buffers[id.dimension()];
        for target in (0..id.dimension()).rev() {
            let row = buf.boundary_of(id.index(), target);
            if target == 0 || buf.has_boundary(id.index(), target) {
                ids.extend_from_slice(row);
            }
        }
        let mut any_new = false;
        let mut cursor = Some(mesh);
        while let Some(m) = cursor {
            let mesh_ref = &mut self.meshes[m.0];
            for &e in &ids {
                any_new |= mesh_ref.register(e);
            }
            cursor = mesh_ref.parent;
        }
        if any_new {
            self.touch();
        }
    }

    // ---------------------------------------------------------------------
    // Regions
    // ---------------------------------------------------------------------

    /// Region table, sorted by id.
    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Create a region under the lowest unused id.
    pub fn create_region(&mut self, name: &str) -> RegionId {
        let mut id = self.regions.len() as u32;
        for (i, r) in self.regions.iter().enumerate() {
            if r.id.0 != i as u32 {
                id = i as u32;
                break;
            }
        }
        self.regions
            .insert(id as usize, Region::new(RegionId(id), name));
        RegionId(id)
    }

    /// Region with the given explicit id, creating it if absent. New regions
    /// are named by the id's decimal form. Calling this again with the same
    /// id changes nothing, whatever ids `create_region` has handed out in
    /// between.
    pub fn get_or_create_region(&mut self, region: RegionId) -> RegionId {
        self.insert_region(region, &region.0.to_string());
        region
    }

    /// Insert a region under an explicit id and name; no-op if the id exists.
    pub(crate) fn insert_region(&mut self, region: RegionId, name: &str) {
        if let Err(pos) = self.regions.binary_search_by_key(&region, Region::id) {
            self.regions.insert(pos, Region::new(region, name));
        }
    }

    /// First region with the given name, in id order.
    pub fn region_by_name(&self, name: &str) -> Option<RegionId> {
        self.regions
            .iter()
            .find(|r| r.name == name)
            .map(Region::id)
    }

    /// Name of `region`.
    pub fn region_name(&self, region: RegionId) -> Result<&str, TopoMeshError> {
        match self.regions.binary_search_by_key(&region, Region::id) {
            Ok(pos) => Ok(self.regions[pos].name()),
            Err(_) => Err(TopoMeshError::UnknownRegion(region)),
        }
    }

    /// Add `element` and its materialized boundary closure to `region`.
    /// Returns `true` if the element itself is a new member.
    ///
    /// # Errors
    /// Returns `UnknownElement` / `UnknownRegion` for stale handles.
    pub fn add_to_region(
        &mut self,
        element: ElementId,
        region: RegionId,
    ) -> Result<bool, TopoMeshError> {
        self.check_element(element)?;
        self.check_region(region)?;
        let dim = element.dimension();
        let index = element.index();
        let mut closure: Vec<ElementId> = Vec::new();
        {
            let buf = &self.buffers[dim];
            for target in 0..dim {
                if target == 0 || buf.has_boundary(index, target) {
                    closure.extend_from_slice(buf.boundary_of(index, target));
                }
            }
        }
        let added = self.buffers[dim].add_region(index, region);
        let mut any = added;
        for id in closure {
            any |= self.buffers[id.dimension()].add_region(id.index(), region);
        }
        if any {
            self.touch();
        }
        Ok(added)
    }

    /// Regions containing `element`, sorted by id.
    pub fn element_regions(&self, element: ElementId) -> Result<&[RegionId], TopoMeshError> {
        self.check_element(element)?;
        Ok(self.buffers[element.dimension()].regions_of(element.index()))
    }

    /// Switch region storage from growable vectors to the packed shape.
    /// One-way; later membership additions go through the packed buffers.
    pub fn switch_region_storage(&mut self) {
        if self.region_storage_is_packed() {
            return;
        }
        log::debug!("packing region storage across all element buffers");
        for buf in &mut self.buffers {
            buf.pack_region_storage();
        }
    }

    /// `true` once region storage was switched to the packed shape.
    pub fn region_storage_is_packed(&self) -> bool {
        self.buffers[0].region_storage_is_packed()
    }

    // ---------------------------------------------------------------------
    // Boundary layout transitions
    // ---------------------------------------------------------------------

    /// Change the boundary storage layout.
    ///
    /// Switching to `Full` rebuilds every cell's boundary through the normal
    /// extraction path (and re-propagates regions). Switching to `Sparse`
    /// drops all boundary lists of dimensions >= 1 and is only allowed while
    /// the root mesh is the only mesh.
    ///
    /// # Errors
    /// Returns `UnsupportedLayoutTransition` for a full-to-sparse switch with
    /// child meshes present, and for a request naming the current layout.
    /// Either way the hierarchy is left untouched.
    pub fn set_boundary_layout(&mut self, layout: BoundaryLayout) -> Result<(), TopoMeshError> {
        if layout == self.layout {
            return Err(TopoMeshError::UnsupportedLayoutTransition {
                from: self.layout,
                to: layout,
                meshes: self.meshes.len(),
            });
        }
        match layout {
            BoundaryLayout::Full => {
                log::debug!("materializing full boundary layout");
                for d in 1..=MAX_DIMENSION {
                    self.buffers[d].reset_boundaries_full();
                }
                self.layout = BoundaryLayout::Full;
                for d in 2..=MAX_DIMENSION {
                    for index in 0..self.buffers[d].len() {
                        self.make_boundary(ElementId::new(d, index), MeshId::ROOT)?;
                    }
                }
                self.touch();
            }
            BoundaryLayout::Sparse => {
                if self.meshes.len() > 1 {
                    return Err(TopoMeshError::UnsupportedLayoutTransition {
                        from: self.layout,
                        to: layout,
                        meshes: self.meshes.len(),
                    });
                }
                log::debug!("dropping boundary lists for sparse layout");
                for d in 1..=MAX_DIMENSION {
                    self.buffers[d].reset_boundaries_sparse();
                }
                self.layout = BoundaryLayout::Sparse;
                self.touch();
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Drop every element, coordinate, region and child mesh, keeping the
    /// geometric dimension and layout. The generation keeps growing so stale
    /// external caches cannot alias the cleared state.
    pub fn clear(&mut self) {
        let sparse = self.layout == BoundaryLayout::Sparse;
        for (d, buf) in self.buffers.iter_mut().enumerate() {
            *buf = ElementBuffer::new(d, sparse);
        }
        self.coordinates.clear();
        self.regions.clear();
        self.meshes.clear();
        self.meshes.push(Mesh::new("root", None));
        self.touch();
    }

    // ---------------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------------

    /// Serialize the complete hierarchy state to bytes.
    ///
    /// # Errors
    /// Returns `SerializationFailed` when encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TopoMeshError> {
        bincode::serialize(self).map_err(|e| TopoMeshError::SerializationFailed(e.to_string()))
    }

    /// Restore a hierarchy from bytes produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// Returns `DeserializationFailed` when decoding fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TopoMeshError> {
        bincode::deserialize(bytes).map_err(|e| TopoMeshError::DeserializationFailed(e.to_string()))
    }
}

impl DebugInvariants for MeshHierarchy {
    fn debug_assert_invariants(&self) {
        crate::debug_assert_ok!(self.validate_invariants(), "MeshHierarchy");
    }

    fn validate_invariants(&self) -> Result<(), TopoMeshError> {
        for buf in &self.buffers {
            buf.validate_invariants()?;
        }
        let expected = self.vertex_count() * self.geometric_dimension;
        if self.coordinates.len() != expected {
            return Err(TopoMeshError::RowCountMismatch {
                expected,
                found: self.coordinates.len(),
            });
        }
        for (i, mesh) in self.meshes.iter().enumerate() {
            if i == 0 {
                // Root owns every element.
                for d in 0..=MAX_DIMENSION {
                    if mesh.handles(d).len() != self.buffers[d].len() {
                        return Err(TopoMeshError::RowCountMismatch {
                            expected: self.buffers[d].len(),
                            found: mesh.handles(d).len(),
                        });
                    }
                }
            } else {
                match mesh.parent {
                    Some(p) if p.0 < self.meshes.len() => {}
                    _ => return Err(TopoMeshError::UnknownMesh(MeshId(i))),
                }
            }
            for child in &mesh.children {
                if child.0 >= self.meshes.len()
                    || self.meshes[child.0].parent != Some(MeshId(i))
                {
                    return Err(TopoMeshError::UnknownMesh(*child));
                }
            }
            for d in 0..=MAX_DIMENSION {
                if !mesh.handles(d).ids_are_sorted() {
                    return Err(TopoMeshError::UnsortedHandles {
                        mesh: MeshId(i),
                        dimension: d,
                    });
                }
            }
        }
        Ok(())
    }
}
