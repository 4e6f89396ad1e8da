//! Triangle refinement: the 8 marked-edge masks, normalized by rotation onto
//! one case per marked-edge count.

use crate::error::TopoMeshError;
use crate::refine::{CellRefiner, midpoint_of, relabel};
use crate::topology::cell_type::CellType;
use crate::topology::element::ElementId;

/// Rotation mapping `mask` onto its canonical case; canonical slot `i` holds
/// actual local vertex `perm[i]`.
fn rotation(mask: usize) -> [usize; 3] {
    match mask {
        0b010 | 0b110 => [1, 2, 0],
        0b100 | 0b101 => [2, 0, 1],
        _ => [0, 1, 2],
    }
}

pub(crate) fn split(
    r: &mut CellRefiner<'_>,
    verts: &[ElementId],
    mask: usize,
    mids: &[Option<ElementId>],
) -> Result<(), TopoMeshError> {
    let edges = CellType::Triangle.local_edges();
    let perm = rotation(mask);
    let (c, m) = relabel::<3, 3>(edges, &perm, verts, mids);
    match mask.count_ones() {
        0 => r.make(CellType::Triangle, &c),
        1 => split_one(r, &c, &m),
        2 => split_two(r, &c, &m),
        _ => split_three(r, &c, &m),
    }
}

/// Edge (0,1) marked: bisect toward the opposite corner.
fn split_one(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 3],
    m: &[Option<ElementId>; 3],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    r.make(CellType::Triangle, &[c[0], m01, c[2]])?;
    r.make(CellType::Triangle, &[m01, c[1], c[2]])
}

/// Edges (0,1) and (1,2) marked: cut off the corner at vertex 1, then split
/// the remaining quadrilateral along its shorter diagonal.
fn split_two(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 3],
    m: &[Option<ElementId>; 3],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    r.make(CellType::Triangle, &[m01, c[1], m12])?;
    if r.use_first_diagonal((c[0], m12), (m01, c[2]))? {
        r.make(CellType::Triangle, &[c[0], m01, m12])?;
        r.make(CellType::Triangle, &[c[0], m12, c[2]])
    } else {
        r.make(CellType::Triangle, &[c[0], m01, c[2]])?;
        r.make(CellType::Triangle, &[m01, m12, c[2]])
    }
}

/// All edges marked: three corner children around an inverted center child.
fn split_three(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 3],
    m: &[Option<ElementId>; 3],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    let m20 = midpoint_of(m, 2);
    r.make(CellType::Triangle, &[c[0], m01, m20])?;
    r.make(CellType::Triangle, &[c[1], m12, m01])?;
    r.make(CellType::Triangle, &[c[2], m20, m12])?;
    r.make(CellType::Triangle, &[m01, m12, m20])
}
