//! Edge-based mesh refinement.
//!
//! [`refine`] consumes a source hierarchy and a [`RefinementMarks`] edge
//! selection and produces a new hierarchy in which every marked edge is
//! split at its midpoint. Cells are subdivided through per-type case tables
//! (triangles, quadrilaterals, tetrahedra; lines split directly). Every
//! child element carries a parent pointer into the source hierarchy and
//! inherits the source cell's regions.
//!
//! # Determinism
//!
//! Copied vertices keep their index order and midpoints follow in edge index
//! order, so midpoint ids always sort after copied-vertex ids and equal
//! inputs produce identical output hierarchies. Ambiguous diagonals are
//! resolved by squared length with an id-pair tie-break, which keeps
//! subdivisions of shared faces consistent across neighboring cells.

use itertools::Itertools;

use crate::error::TopoMeshError;
use crate::topology::cell_type::CellType;
use crate::topology::element::{ElementId, RegionId};
use crate::topology::hierarchy::{BoundaryLayout, MeshHierarchy};

mod quad;
mod tetrahedron;
mod triangle;

/// Edge selection for [`refine`]: one flag per edge element of the source
/// hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefinementMarks {
    marks: Vec<bool>,
}

impl RefinementMarks {
    /// Marks covering the edges of `source`, none selected.
    pub fn none(source: &MeshHierarchy) -> Self {
        RefinementMarks {
            marks: vec![false; source.element_count(1)],
        }
    }

    /// Marks covering the edges of `source`, all selected.
    pub fn all(source: &MeshHierarchy) -> Self {
        RefinementMarks {
            marks: vec![true; source.element_count(1)],
        }
    }

    /// Select `edge` for splitting.
    ///
    /// # Panics
    /// Panics if `edge` is not an edge id covered by these marks.
    pub fn mark(&mut self, edge: ElementId) {
        assert!(
            edge.dimension() == 1 && edge.index() < self.marks.len(),
            "cannot mark {edge}: not an edge covered by these marks"
        );
        self.marks[edge.index()] = true;
    }

    /// Whether `edge` is selected. Ids outside the covered range are not.
    pub fn is_marked(&self, edge: ElementId) -> bool {
        edge.dimension() == 1 && self.marks.get(edge.index()).is_some_and(|&m| m)
    }

    /// Number of covered edges.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// `true` when no edges are covered.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    fn marked_count(&self) -> usize {
        self.marks.iter().filter(|&&m| m).count()
    }
}

/// Refine `source` by splitting every marked edge at its midpoint.
///
/// Returns a fresh hierarchy: vertices are copied in index order, one
/// midpoint vertex is appended per marked edge in edge index order, and each
/// cell is replaced by its subdivision. Parent pointers record the source
/// element every output element descends from; regions are recreated with
/// their source ids and names, and membership carries over.
///
/// # Errors
/// - `SparseLayoutUnsupported` unless `source` uses the full layout.
/// - `RefinementMarksMismatch` when `marks` does not cover the source edges.
/// - `BoundaryNotMaterialized` when a cell misses its boundary lists.
pub fn refine(
    source: &MeshHierarchy,
    marks: &RefinementMarks,
) -> Result<MeshHierarchy, TopoMeshError> {
    if source.boundary_layout() == BoundaryLayout::Sparse {
        return Err(TopoMeshError::SparseLayoutUnsupported {
            operation: "refine",
        });
    }
    if marks.len() != source.element_count(1) {
        return Err(TopoMeshError::RefinementMarksMismatch {
            expected: source.element_count(1),
            found: marks.len(),
        });
    }
    let mut out = MeshHierarchy::new(source.geometric_dimension())?;
    for region in source.regions() {
        out.insert_region(region.id(), region.name());
    }

    // Copied vertices keep their index, so the old-to-new map is positional.
    let mut vertex_map = Vec::with_capacity(source.vertex_count());
    for index in 0..source.vertex_count() {
        let sv = ElementId::new(0, index);
        let nv = out.make_vertex(source.vertex_coords(sv)?)?;
        out.buffers[0].set_parent(nv.index(), sv);
        for &r in source.element_regions(sv)? {
            out.add_to_region(nv, r)?;
        }
        vertex_map.push(nv);
    }

    let mut midpoints: Vec<Option<ElementId>> = vec![None; source.element_count(1)];
    for index in 0..source.element_count(1) {
        let se = ElementId::new(1, index);
        if !marks.is_marked(se) {
            continue;
        }
        let ends = source.boundary(se, 0)?;
        let a = source.vertex_coords(ends[0])?;
        let b = source.vertex_coords(ends[1])?;
        let mid: Vec<f64> = a.iter().zip(b).map(|(x, y)| 0.5 * (x + y)).collect();
        let mv = out.make_vertex(&mid)?;
        out.buffers[0].set_parent(mv.index(), se);
        for &r in source.element_regions(se)? {
            out.add_to_region(mv, r)?;
        }
        midpoints[index] = Some(mv);
    }

    let cell_dim = source.cell_dimension();
    if cell_dim == 1 {
        split_lines(source, marks, &vertex_map, &midpoints, &mut out)?;
    } else if cell_dim >= 2 {
        for index in 0..source.element_count(cell_dim) {
            let cell = ElementId::new(cell_dim, index);
            split_cell(source, marks, &vertex_map, &midpoints, &mut out, cell)?;
        }
    }

    log::debug!(
        "refined {} cells / {} vertices ({} marked edges) into {} cells / {} vertices",
        source.element_count(cell_dim),
        source.vertex_count(),
        marks.marked_count(),
        out.element_count(cell_dim),
        out.vertex_count(),
    );
    Ok(out)
}

/// Refine with every edge selected: triangles split into 4 children,
/// quadrilaterals into 4, tetrahedra into 8.
///
/// # Errors
/// Those of [`refine`].
pub fn refine_uniform(source: &MeshHierarchy) -> Result<MeshHierarchy, TopoMeshError> {
    refine(source, &RefinementMarks::all(source))
}

// ---------------------------------------------------------------------
// Per-cell machinery shared by the case kernels
// ---------------------------------------------------------------------

/// A source element together with the output vertices it covers. A new child
/// boundary element inherits the parent of the first descriptor containing
/// its vertex set; edge descriptors come before face descriptors, the whole
/// cell last.
struct IntersectDescriptor {
    parent: ElementId,
    verts: Vec<ElementId>,
}

impl IntersectDescriptor {
    fn new(parent: ElementId, mut verts: Vec<ElementId>) -> Self {
        verts.sort_unstable();
        IntersectDescriptor { parent, verts }
    }

    fn covers(&self, verts: &[ElementId]) -> bool {
        verts.iter().all(|v| self.verts.binary_search(v).is_ok())
    }
}

/// Splits one source cell into the output hierarchy.
pub(crate) struct CellRefiner<'a> {
    out: &'a mut MeshHierarchy,
    cell: ElementId,
    regions: &'a [RegionId],
    descriptors: Vec<IntersectDescriptor>,
}

impl CellRefiner<'_> {
    /// Create one child cell, wire its parentage and regions.
    pub(crate) fn make(
        &mut self,
        cell_type: CellType,
        verts: &[ElementId],
    ) -> Result<(), TopoMeshError> {
        make_refined_element(
            self.out,
            self.cell,
            cell_type,
            verts,
            &self.descriptors,
            self.regions,
        )?;
        Ok(())
    }

    /// Create a cell-interior vertex at the average of `corners`.
    pub(crate) fn add_center_vertex(
        &mut self,
        corners: &[ElementId],
    ) -> Result<ElementId, TopoMeshError> {
        let mut center = vec![0.0; self.out.geometric_dimension()];
        for &corner in corners {
            let coords = self.out.vertex_coords(corner)?;
            for (acc, x) in center.iter_mut().zip(coords) {
                *acc += x;
            }
        }
        for acc in &mut center {
            *acc /= corners.len() as f64;
        }
        let v = self.out.make_vertex(&center)?;
        self.out.buffers[0].set_parent(v.index(), self.cell);
        for &r in self.regions {
            self.out.add_to_region(v, r)?;
        }
        let cell_descriptor = self
            .descriptors
            .last_mut()
            .expect("descriptor list always ends with the cell descriptor");
        cell_descriptor.verts.push(v);
        cell_descriptor.verts.sort_unstable();
        Ok(v)
    }

    fn squared_length(&self, a: ElementId, b: ElementId) -> Result<f64, TopoMeshError> {
        let pa = self.out.vertex_coords(a)?;
        let pb = self.out.vertex_coords(b)?;
        Ok(pa.iter().zip(pb).map(|(x, y)| (x - y) * (x - y)).sum())
    }

    /// `true` when `first` is the diagonal to insert: strictly shorter than
    /// `second`, or tied and ahead in the id-pair order.
    pub(crate) fn use_first_diagonal(
        &self,
        first: (ElementId, ElementId),
        second: (ElementId, ElementId),
    ) -> Result<bool, TopoMeshError> {
        Ok(!stable_line_is_longer(
            self.squared_length(first.0, first.1)?,
            first,
            self.squared_length(second.0, second.1)?,
            second,
        ))
    }

    /// The shorter of two diagonals, ties resolved by the id-pair order.
    pub(crate) fn shorter_diagonal(
        &self,
        a: (ElementId, ElementId),
        b: (ElementId, ElementId),
    ) -> Result<(ElementId, ElementId), TopoMeshError> {
        Ok(if self.use_first_diagonal(a, b)? { a } else { b })
    }
}

/// Total order on candidate split lines: squared length first, then the
/// sorted endpoint id pair. Both sides of a shared face evaluate this to the
/// same answer, so adjacent cells subdivide their interface identically.
fn stable_line_is_longer(
    len_sq_a: f64,
    a: (ElementId, ElementId),
    len_sq_b: f64,
    b: (ElementId, ElementId),
) -> bool {
    if len_sq_a > len_sq_b {
        return true;
    }
    if len_sq_a < len_sq_b {
        return false;
    }
    let ka = if a.0 <= a.1 { (a.0, a.1) } else { (a.1, a.0) };
    let kb = if b.0 <= b.1 { (b.0, b.1) } else { (b.1, b.0) };
    ka > kb
}

/// Midpoint vertex of canonical local edge `local_edge`.
///
/// # Panics
/// Panics when the edge was not marked; case handlers only read midpoints of
/// edges their mask covers.
pub(crate) fn midpoint_of(mids: &[Option<ElementId>], local_edge: usize) -> ElementId {
    match mids[local_edge] {
        Some(v) => v,
        None => panic!("refinement case expects a midpoint on local edge {local_edge}"),
    }
}

/// Index of the local edge joining local vertices `a` and `b`.
pub(crate) fn local_edge_between(edges: &[[usize; 2]], a: usize, b: usize) -> usize {
    for (k, e) in edges.iter().enumerate() {
        if (e[0] == a && e[1] == b) || (e[0] == b && e[1] == a) {
            return k;
        }
    }
    panic!("no local edge between vertices {a} and {b}")
}

/// Relabel corners and midpoints into the canonical frame of `perm`, where
/// canonical slot `i` holds actual local vertex `perm[i]`.
pub(crate) fn relabel<const V: usize, const E: usize>(
    edges: &[[usize; 2]],
    perm: &[usize; V],
    verts: &[ElementId],
    mids: &[Option<ElementId>],
) -> ([ElementId; V], [Option<ElementId>; E]) {
    let corners = std::array::from_fn(|i| verts[perm[i]]);
    let midpoints = std::array::from_fn(|k| {
        let e = edges[k];
        mids[local_edge_between(edges, perm[e[0]], perm[e[1]])]
    });
    (corners, midpoints)
}

fn split_cell(
    source: &MeshHierarchy,
    marks: &RefinementMarks,
    vertex_map: &[ElementId],
    midpoints: &[Option<ElementId>],
    out: &mut MeshHierarchy,
    cell: ElementId,
) -> Result<(), TopoMeshError> {
    let cell_type = source.element_cell_type(cell)?;
    let verts: Vec<ElementId> = source
        .boundary(cell, 0)?
        .iter()
        .map(|v| vertex_map[v.index()])
        .collect();
    let edges = source.boundary(cell, 1)?;
    let mut mask = 0usize;
    let mut mids = vec![None; edges.len()];
    for (i, &e) in edges.iter().enumerate() {
        if marks.is_marked(e) {
            mask |= 1 << i;
            mids[i] = midpoints[e.index()];
        }
    }
    let regions = source.element_regions(cell)?;
    let descriptors = build_descriptors(source, cell, cell_type, &verts, &mids)?;
    let mut refiner = CellRefiner {
        out,
        cell,
        regions,
        descriptors,
    };
    match cell_type {
        CellType::Triangle => triangle::split(&mut refiner, &verts, mask, &mids),
        CellType::Quadrilateral => quad::split(&mut refiner, &verts, mask, &mids),
        CellType::Tetrahedron => tetrahedron::split(&mut refiner, &verts, mask, &mids),
        _ if mask == 0 => refiner.make(cell_type, &verts),
        _ => Err(TopoMeshError::UnsupportedRefinementCellType { element: cell, cell_type }),
    }
}

/// Edge, face and cell descriptors of one source cell, in lookup order.
fn build_descriptors(
    source: &MeshHierarchy,
    cell: ElementId,
    cell_type: CellType,
    verts: &[ElementId],
    mids: &[Option<ElementId>],
) -> Result<Vec<IntersectDescriptor>, TopoMeshError> {
    let edges = source.boundary(cell, 1)?;
    let mut descriptors = Vec::with_capacity(edges.len() + cell_type.face_count() + 1);
    if let CellType::Polygon(_) = cell_type {
        for ((i, &a), (_, &b)) in verts.iter().enumerate().circular_tuple_windows() {
            let mut dverts = vec![a, b];
            if let Some(m) = mids[i] {
                dverts.push(m);
            }
            descriptors.push(IntersectDescriptor::new(edges[i], dverts));
        }
    } else {
        for (i, e) in cell_type.local_edges().iter().enumerate() {
            let mut dverts = vec![verts[e[0]], verts[e[1]]];
            if let Some(m) = mids[i] {
                dverts.push(m);
            }
            descriptors.push(IntersectDescriptor::new(edges[i], dverts));
        }
    }
    if cell_type.dimension() == 3 {
        let faces = source.boundary(cell, 2)?;
        for (fi, f) in cell_type.local_faces().iter().enumerate() {
            let mut dverts: Vec<ElementId> = f.vertices.iter().map(|&i| verts[i]).collect();
            for &e in f.edges {
                if let Some(m) = mids[e] {
                    dverts.push(m);
                }
            }
            descriptors.push(IntersectDescriptor::new(faces[fi], dverts));
        }
    }
    let mut all = verts.to_vec();
    all.extend(mids.iter().flatten().copied());
    descriptors.push(IntersectDescriptor::new(cell, all));
    Ok(descriptors)
}

/// Create one child element, stamp its parent, inherit `regions`, and give
/// every new unparented boundary element the parent of the first descriptor
/// covering its vertex set.
fn make_refined_element(
    out: &mut MeshHierarchy,
    parent: ElementId,
    cell_type: CellType,
    verts: &[ElementId],
    descriptors: &[IntersectDescriptor],
    regions: &[RegionId],
) -> Result<ElementId, TopoMeshError> {
    let root = out.root();
    let (id, created) = out.get_make_element(root, cell_type, verts, true)?;
    if created {
        out.buffers[id.dimension()].set_parent(id.index(), parent);
    }
    for target in 1..id.dimension() {
        for b in out.boundary(id, target)?.to_vec() {
            if out.element_parent(b)?.is_some() {
                continue;
            }
            let bverts = out.boundary(b, 0)?;
            if let Some(d) = descriptors.iter().find(|d| d.covers(bverts)) {
                let p = d.parent;
                out.buffers[b.dimension()].set_parent(b.index(), p);
            }
        }
    }
    for &r in regions {
        out.add_to_region(id, r)?;
    }
    Ok(id)
}

fn split_lines(
    source: &MeshHierarchy,
    marks: &RefinementMarks,
    vertex_map: &[ElementId],
    midpoints: &[Option<ElementId>],
    out: &mut MeshHierarchy,
) -> Result<(), TopoMeshError> {
    for index in 0..source.element_count(1) {
        let cell = ElementId::new(1, index);
        let ends = source.boundary(cell, 0)?;
        let a = vertex_map[ends[0].index()];
        let b = vertex_map[ends[1].index()];
        let regions = source.element_regions(cell)?;
        if marks.is_marked(cell) {
            let m = match midpoints[index] {
                Some(v) => v,
                None => panic!("no midpoint vertex for marked line {cell}"),
            };
            make_refined_element(out, cell, CellType::Line, &[a, m], &[], regions)?;
            make_refined_element(out, cell, CellType::Line, &[m, b], &[], regions)?;
        } else {
            make_refined_element(out, cell, CellType::Line, &[a, b], &[], regions)?;
        }
    }
    Ok(())
}
