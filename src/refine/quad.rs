//! Quadrilateral refinement: the 16 marked-edge masks, normalized by corner
//! rotation onto six canonical cases.

use crate::error::TopoMeshError;
use crate::refine::{CellRefiner, midpoint_of, relabel};
use crate::topology::cell_type::CellType;
use crate::topology::element::ElementId;

const CANONICAL: [usize; 6] = [0b0000, 0b0001, 0b0011, 0b0101, 0b0111, 0b1111];

/// Rotate `mask` onto a canonical case. Returns the canonical mask and the
/// corner relabeling; canonical slot `i` holds actual local vertex `perm[i]`.
fn normalize(mask: usize) -> (usize, [usize; 4]) {
    for r in 0..4 {
        let canonical = ((mask >> r) | (mask << (4 - r))) & 0b1111;
        if CANONICAL.contains(&canonical) {
            return (canonical, [r, (r + 1) % 4, (r + 2) % 4, (r + 3) % 4]);
        }
    }
    panic!("quadrilateral mask {mask:#06b} has no canonical rotation")
}

pub(crate) fn split(
    r: &mut CellRefiner<'_>,
    verts: &[ElementId],
    mask: usize,
    mids: &[Option<ElementId>],
) -> Result<(), TopoMeshError> {
    let edges = CellType::Quadrilateral.local_edges();
    let (canonical, perm) = normalize(mask);
    let (c, m) = relabel::<4, 4>(edges, &perm, verts, mids);
    match canonical {
        0b0000 => r.make(CellType::Quadrilateral, &c),
        0b0001 => split_one(r, &c, &m),
        0b0011 => split_two_adjacent(r, &c, &m),
        0b0101 => split_two_opposite(r, &c, &m),
        0b0111 => split_three(r, &c, &m),
        _ => split_four(r, &c, &m),
    }
}

/// Edge (0,1) marked: a triangle and a quadrilateral, cut along whichever
/// diagonal from the midpoint is shorter.
fn split_one(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 4],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    if r.use_first_diagonal((m01, c[2]), (m01, c[3]))? {
        r.make(CellType::Triangle, &[m01, c[1], c[2]])?;
        r.make(CellType::Quadrilateral, &[c[0], m01, c[2], c[3]])
    } else {
        r.make(CellType::Quadrilateral, &[m01, c[1], c[2], c[3]])?;
        r.make(CellType::Triangle, &[c[0], m01, c[3]])
    }
}

/// Edges (0,1) and (1,2) marked: cut off the corner at vertex 1 and split
/// the remaining pentagon.
fn split_two_adjacent(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 4],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    r.make(CellType::Triangle, &[m01, c[1], m12])?;
    if r.use_first_diagonal((m01, c[2]), (m12, c[3]))? {
        r.make(CellType::Triangle, &[m01, m12, c[2]])?;
        r.make(CellType::Quadrilateral, &[c[0], m01, c[2], c[3]])
    } else {
        r.make(CellType::Quadrilateral, &[c[0], m01, m12, c[3]])?;
        r.make(CellType::Triangle, &[m12, c[2], c[3]])
    }
}

/// Edges (0,1) and (2,3) marked: two quadrilateral halves.
fn split_two_opposite(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 4],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m23 = midpoint_of(m, 2);
    r.make(CellType::Quadrilateral, &[c[0], m01, m23, c[3]])?;
    r.make(CellType::Quadrilateral, &[m01, c[1], c[2], m23])
}

/// Edges (0,1), (1,2) and (2,3) marked: corner triangles at vertices 1 and
/// 2, a central quadrilateral, and a corner triangle at vertex 3.
fn split_three(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 4],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    let m23 = midpoint_of(m, 2);
    r.make(CellType::Triangle, &[m01, c[1], m12])?;
    r.make(CellType::Triangle, &[m12, c[2], m23])?;
    r.make(CellType::Quadrilateral, &[c[0], m01, m12, m23])?;
    r.make(CellType::Triangle, &[c[0], m23, c[3]])
}

/// All edges marked: four children around a new center vertex.
fn split_four(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 4],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    let m23 = midpoint_of(m, 2);
    let m30 = midpoint_of(m, 3);
    let center = r.add_center_vertex(c)?;
    r.make(CellType::Quadrilateral, &[c[0], m01, center, m30])?;
    r.make(CellType::Quadrilateral, &[m01, c[1], m12, center])?;
    r.make(CellType::Quadrilateral, &[center, m12, c[2], m23])?;
    r.make(CellType::Quadrilateral, &[m30, center, m23, c[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::local_edge_between;

    #[test]
    fn every_mask_normalizes_onto_a_canonical_case() {
        let edges = CellType::Quadrilateral.local_edges();
        for mask in 0..16usize {
            let (canonical, perm) = normalize(mask);
            assert!(CANONICAL.contains(&canonical), "mask {mask:#06b}");
            // The relabeling must reproduce the canonical mask.
            let mut relabeled = 0usize;
            for (k, e) in edges.iter().enumerate() {
                if mask & (1 << local_edge_between(edges, perm[e[0]], perm[e[1]])) != 0 {
                    relabeled |= 1 << k;
                }
            }
            assert_eq!(relabeled, canonical, "mask {mask:#06b}");
        }
    }

    #[test]
    fn normalization_is_the_identity_on_canonical_masks() {
        for mask in CANONICAL {
            assert_eq!(normalize(mask), (mask, [0, 1, 2, 3]));
        }
    }
}
