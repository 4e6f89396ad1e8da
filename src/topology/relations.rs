//! Derived relations: co-boundary, neighbors, boundary flags.
//!
//! Relations are computed per mesh from the stored boundary lists, cached in
//! the mesh's handle buffers, and stamped with the hierarchy generation they
//! were derived from. The accessor methods rebuild a stale cache
//! transparently; the `make_*` methods force a rebuild.
//!
//! # Determinism
//!
//! Every relation row is sorted by element id and the assembly passes iterate
//! over sorted handle lists, so rebuilding a relation on an unchanged
//! topology reproduces it exactly.

use crate::error::TopoMeshError;
use crate::storage::{BucketBuffer, SparsePackedBuffer};
use crate::topology::element::{ElementId, MeshId, RegionId, MAX_DIMENSION};
use crate::topology::hierarchy::MeshHierarchy;
use crate::topology::mesh::BoundaryFlags;
use crate::topology::region::Region;

impl MeshHierarchy {
    // ---------------------------------------------------------------------
    // Co-boundary
    // ---------------------------------------------------------------------

    /// Build the co-boundary relation of dimension `dim` toward
    /// `codim_dim` for `mesh`, replacing any cached version.
    ///
    /// For every element of `dim` in the mesh, the relation lists the mesh's
    /// `codim_dim` elements that carry it in their boundary, in id order.
    ///
    /// # Errors
    /// - `InvalidDimension` unless `dim < codim_dim <= MAX_DIMENSION`.
    /// - `BoundaryNotMaterialized` if a co-element misses its boundary list.
    ///
    /// # Complexity
    /// O(total boundary size) over the mesh's `codim_dim` elements.
    pub fn make_coboundary(
        &mut self,
        mesh: MeshId,
        dim: usize,
        codim_dim: usize,
    ) -> Result<(), TopoMeshError> {
        self.mesh(mesh)?;
        if codim_dim > MAX_DIMENSION || dim >= codim_dim {
            return Err(TopoMeshError::InvalidDimension {
                dimension: codim_dim,
            });
        }
        if self.meshes[mesh.0].handles(codim_dim).is_empty() {
            log::warn!(
                "deriving co-boundary toward dimension {codim_dim} for a mesh without such elements"
            );
        }
        let mut bucket: BucketBuffer<ElementId> = BucketBuffer::new();
        for &cob in self.meshes[mesh.0].handles(codim_dim).ids() {
            for &b in self.boundary(cob, dim)? {
                bucket.push_at(b.index(), cob);
            }
        }
        let mut data = SparsePackedBuffer::new();
        for &e in self.meshes[mesh.0].handles(dim).ids() {
            // Rows come out sorted: co-elements were visited in id order.
            data.insert(e.index(), bucket.get(e.index()));
        }
        let generation = self.generation;
        let rel = self.meshes[mesh.0]
            .handles_mut(dim)
            .coboundary
            .entry(codim_dim as u8)
            .or_default();
        rel.stamp = generation;
        rel.builds += 1;
        rel.data = data;
        Ok(())
    }

    /// Co-boundary of `element` toward `codim_dim` within `mesh`, in id
    /// order. Rebuilds the cached relation if the topology changed since it
    /// was built. Elements not registered in the mesh yield the empty slice.
    ///
    /// # Errors
    /// Those of [`make_coboundary`](Self::make_coboundary), plus
    /// `UnknownElement`/`UnknownMesh` for stale handles.
    pub fn coboundary(
        &mut self,
        mesh: MeshId,
        element: ElementId,
        codim_dim: usize,
    ) -> Result<&[ElementId], TopoMeshError> {
        self.mesh(mesh)?;
        self.element_cell_type(element)?;
        let dim = element.dimension();
        let fresh = self.meshes[mesh.0]
            .handles(dim)
            .coboundary_cache(codim_dim)
            .is_some_and(|rel| rel.stamp == self.generation);
        if !fresh {
            self.make_coboundary(mesh, dim, codim_dim)?;
        }
        Ok(self.meshes[mesh.0]
            .handles(dim)
            .coboundary_cache(codim_dim)
            .unwrap()
            .get(element.index()))
    }

    /// Build count of the cached co-boundary relation, 0 if never built.
    /// Test hook for cache invalidation behavior.
    pub fn coboundary_builds(&self, mesh: MeshId, dim: usize, codim_dim: usize) -> u64 {
        self.meshes
            .get(mesh.0)
            .and_then(|m| m.handles(dim).coboundary_cache(codim_dim))
            .map_or(0, |rel| rel.builds)
    }

    // ---------------------------------------------------------------------
    // Neighbors
    // ---------------------------------------------------------------------

    fn check_neighbor_config(
        dim: usize,
        connector_dim: usize,
        neighbor_dim: usize,
    ) -> Result<(), TopoMeshError> {
        let invalid = connector_dim > MAX_DIMENSION
            || neighbor_dim > MAX_DIMENSION
            || connector_dim == dim
            || connector_dim == neighbor_dim
            // A connector strictly between the two dimensions only ever
            // reaches the element's own closure, which is excluded anyway.
            || (dim > connector_dim && connector_dim > neighbor_dim);
        if invalid {
            Err(TopoMeshError::InvalidNeighborConfig {
                dim,
                connector: connector_dim,
                neighbor: neighbor_dim,
            })
        } else {
            Ok(())
        }
    }

    /// Build the neighbor relation for `mesh`: elements of `dim` reach the
    /// mesh's `neighbor_dim` elements that share a `connector_dim` element
    /// with them, in id order. The element itself is excluded at equal
    /// dimensions; its own boundary elements are excluded at lower ones.
    ///
    /// # Errors
    /// - `InvalidNeighborConfig` for underivable dimension triples.
    /// - `BoundaryNotMaterialized` if a required boundary list is missing.
    ///
    /// # Complexity
    /// O(sum of connector incidences) over the mesh.
    pub fn make_neighbor(
        &mut self,
        mesh: MeshId,
        dim: usize,
        connector_dim: usize,
        neighbor_dim: usize,
    ) -> Result<(), TopoMeshError> {
        self.mesh(mesh)?;
        if dim > MAX_DIMENSION {
            return Err(TopoMeshError::InvalidDimension { dimension: dim });
        }
        Self::check_neighbor_config(dim, connector_dim, neighbor_dim)?;

        // Incidence from connectors to the neighbor dimension.
        let mut conn_to_neigh: BucketBuffer<ElementId> = BucketBuffer::new();
        if neighbor_dim > connector_dim {
            for &n in self.meshes[mesh.0].handles(neighbor_dim).ids() {
                for &c in self.boundary(n, connector_dim)? {
                    conn_to_neigh.push_at(c.index(), n);
                }
            }
        } else {
            for &c in self.meshes[mesh.0].handles(connector_dim).ids() {
                for &n in self.boundary(c, neighbor_dim)? {
                    conn_to_neigh.push_at(c.index(), n);
                }
            }
        }

        // Connectors of each element of `dim`.
        let mut elem_to_conn: BucketBuffer<ElementId> = BucketBuffer::new();
        if connector_dim < dim {
            for &e in self.meshes[mesh.0].handles(dim).ids() {
                for &c in self.boundary(e, connector_dim)? {
                    elem_to_conn.push_at(e.index(), c);
                }
            }
        } else {
            for &c in self.meshes[mesh.0].handles(connector_dim).ids() {
                for &e in self.boundary(c, dim)? {
                    elem_to_conn.push_at(e.index(), c);
                }
            }
        }

        let mut data = SparsePackedBuffer::new();
        for &e in self.meshes[mesh.0].handles(dim).ids() {
            let mut row: Vec<ElementId> = Vec::new();
            for &c in elem_to_conn.get(e.index()) {
                row.extend_from_slice(conn_to_neigh.get(c.index()));
            }
            row.sort_unstable();
            row.dedup();
            if neighbor_dim == dim {
                row.retain(|&n| n != e);
            } else if neighbor_dim < dim {
                let own = self.boundary(e, neighbor_dim)?;
                row.retain(|&n| !own.contains(&n));
            }
            data.insert(e.index(), &row);
        }

        let generation = self.generation;
        let rel = self.meshes[mesh.0]
            .handles_mut(dim)
            .neighbors
            .entry((connector_dim as u8, neighbor_dim as u8))
            .or_default();
        rel.stamp = generation;
        rel.builds += 1;
        rel.data = data;
        Ok(())
    }

    /// Neighbors of `element` through shared `connector_dim` elements,
    /// reaching `neighbor_dim`, within `mesh`. Rebuilds the cached relation
    /// if the topology changed since it was built.
    ///
    /// # Errors
    /// Those of [`make_neighbor`](Self::make_neighbor), plus
    /// `UnknownElement`/`UnknownMesh` for stale handles.
    pub fn neighbors(
        &mut self,
        mesh: MeshId,
        element: ElementId,
        connector_dim: usize,
        neighbor_dim: usize,
    ) -> Result<&[ElementId], TopoMeshError> {
        self.mesh(mesh)?;
        self.element_cell_type(element)?;
        let dim = element.dimension();
        let fresh = self.meshes[mesh.0]
            .handles(dim)
            .neighbor_cache(connector_dim, neighbor_dim)
            .is_some_and(|rel| rel.stamp == self.generation);
        if !fresh {
            self.make_neighbor(mesh, dim, connector_dim, neighbor_dim)?;
        }
        Ok(self.meshes[mesh.0]
            .handles(dim)
            .neighbor_cache(connector_dim, neighbor_dim)
            .unwrap()
            .get(element.index()))
    }

    /// Build count of the cached neighbor relation, 0 if never built.
    pub fn neighbor_builds(
        &self,
        mesh: MeshId,
        dim: usize,
        connector_dim: usize,
        neighbor_dim: usize,
    ) -> u64 {
        self.meshes
            .get(mesh.0)
            .and_then(|m| m.handles(dim).neighbor_cache(connector_dim, neighbor_dim))
            .map_or(0, |rel| rel.builds)
    }

    // ---------------------------------------------------------------------
    // Boundary flags
    // ---------------------------------------------------------------------

    /// Facets whose incidence count is exactly one, plus their closures.
    fn collect_boundary_flags(
        &self,
        facet_dim: usize,
        counts: &[u32],
        facets: impl Iterator<Item = ElementId>,
    ) -> Vec<ElementId> {
        let mut flags: Vec<ElementId> = Vec::new();
        for f in facets {
            if counts[f.index()] != 1 {
                continue;
            }
            flags.push(f);
            let buf = &self.buffers[facet_dim];
            for target in 0..facet_dim {
                if target == 0 || buf.has_boundary(f.index(), target) {
                    flags.extend_from_slice(buf.boundary_of(f.index(), target));
                }
            }
        }
        flags.sort_unstable();
        flags.dedup();
        flags
    }

    /// Classify the surface of `mesh`: a facet (element one dimension below
    /// the hierarchy's cell dimension) is on the boundary when exactly one
    /// cell of the mesh carries it; flagged facets drag their closure along.
    /// Cell incidence comes from the facet-to-cell co-boundary relation,
    /// reused when current and built through [`make_coboundary`] otherwise.
    /// Replaces any cached classification.
    ///
    /// # Errors
    /// `BoundaryNotMaterialized` if a cell misses its facet list, as under
    /// the sparse layout without explicit extraction.
    ///
    /// [`make_coboundary`]: Self::make_coboundary
    pub fn make_boundary_flags(&mut self, mesh: MeshId) -> Result<(), TopoMeshError> {
        self.mesh(mesh)?;
        let cell_dim = self.cell_dimension();
        let mut flags = Vec::new();
        if cell_dim > 0 {
            let facet_dim = cell_dim - 1;
            let fresh = self.meshes[mesh.0]
                .handles(facet_dim)
                .coboundary_cache(cell_dim)
                .is_some_and(|rel| rel.stamp == self.generation);
            if !fresh {
                self.make_coboundary(mesh, facet_dim, cell_dim)?;
            }
            let facets = self.meshes[mesh.0].handles(facet_dim).ids().to_vec();
            let rel = self.meshes[mesh.0]
                .handles(facet_dim)
                .coboundary_cache(cell_dim)
                .unwrap();
            let mut counts = vec![0u32; self.buffers[facet_dim].len()];
            for &f in &facets {
                counts[f.index()] = rel.get(f.index()).len() as u32;
            }
            flags = self.collect_boundary_flags(facet_dim, &counts, facets.into_iter());
        }
        let generation = self.generation;
        let bf = self.meshes[mesh.0]
            .boundary_flags
            .get_or_insert_with(BoundaryFlags::default);
        bf.stamp = generation;
        bf.builds += 1;
        bf.flags = flags;
        Ok(())
    }

    /// Boundary classification of `mesh`, rebuilt if stale.
    ///
    /// # Errors
    /// Those of [`make_boundary_flags`](Self::make_boundary_flags).
    pub fn boundary_flags(&mut self, mesh: MeshId) -> Result<&BoundaryFlags, TopoMeshError> {
        self.mesh(mesh)?;
        let fresh = self.meshes[mesh.0]
            .boundary_flags
            .as_ref()
            .is_some_and(|bf| bf.stamp == self.generation);
        if !fresh {
            self.make_boundary_flags(mesh)?;
        }
        Ok(self.meshes[mesh.0].boundary_flags.as_ref().unwrap())
    }

    /// Classify the surface of `region`: a facet is on the region boundary
    /// when exactly one cell of the region carries it, interfaces to other
    /// regions included. Incidence comes from the root mesh's facet-to-cell
    /// co-boundary relation (the root owns every element) with co-cells
    /// filtered to region members. Replaces any cached classification.
    ///
    /// # Errors
    /// `UnknownRegion` for stale ids, plus the errors of
    /// [`make_boundary_flags`](Self::make_boundary_flags).
    pub fn make_region_boundary_flags(&mut self, region: RegionId) -> Result<(), TopoMeshError> {
        let pos = self
            .regions
            .binary_search_by_key(&region, Region::id)
            .map_err(|_| TopoMeshError::UnknownRegion(region))?;
        let cell_dim = self.cell_dimension();
        let mut flags = Vec::new();
        if cell_dim > 0 {
            let facet_dim = cell_dim - 1;
            let fresh = self.meshes[MeshId::ROOT.0]
                .handles(facet_dim)
                .coboundary_cache(cell_dim)
                .is_some_and(|rel| rel.stamp == self.generation);
            if !fresh {
                self.make_coboundary(MeshId::ROOT, facet_dim, cell_dim)?;
            }
            let rel = self.meshes[MeshId::ROOT.0]
                .handles(facet_dim)
                .coboundary_cache(cell_dim)
                .unwrap();
            let cells = &self.buffers[cell_dim];
            let mut counts = vec![0u32; self.buffers[facet_dim].len()];
            for (index, count) in counts.iter_mut().enumerate() {
                *count = rel
                    .get(index)
                    .iter()
                    .filter(|c| cells.regions_of(c.index()).contains(&region))
                    .count() as u32;
            }
            let facets = (0..counts.len()).map(|i| ElementId::new(facet_dim, i));
            flags = self.collect_boundary_flags(facet_dim, &counts, facets);
        }
        let generation = self.generation;
        let bf = self.regions[pos]
            .flags
            .get_or_insert_with(BoundaryFlags::default);
        bf.stamp = generation;
        bf.builds += 1;
        bf.flags = flags;
        Ok(())
    }

    /// Boundary classification of `region`, rebuilt if stale.
    ///
    /// # Errors
    /// Those of [`make_region_boundary_flags`](Self::make_region_boundary_flags).
    pub fn region_boundary_flags(
        &mut self,
        region: RegionId,
    ) -> Result<&BoundaryFlags, TopoMeshError> {
        let pos = self
            .regions
            .binary_search_by_key(&region, Region::id)
            .map_err(|_| TopoMeshError::UnknownRegion(region))?;
        let fresh = self.regions[pos]
            .flags
            .as_ref()
            .is_some_and(|bf| bf.stamp == self.generation);
        if !fresh {
            self.make_region_boundary_flags(region)?;
        }
        Ok(self.regions[pos].flags.as_ref().unwrap())
    }
}
