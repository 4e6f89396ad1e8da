//! Tetrahedron refinement: the 64 marked-edge masks, dispatched through a
//! table of canonical cases and orientation-preserving corner relabelings.
//!
//! Splits that cross a quadrilateral interior pick a diagonal by the stable
//! shorter-line comparison, so the faces shared between neighboring
//! tetrahedra subdivide identically on both sides.

use once_cell::sync::Lazy;

use crate::error::TopoMeshError;
use crate::refine::{CellRefiner, local_edge_between, midpoint_of, relabel};
use crate::topology::cell_type::CellType;
use crate::topology::element::ElementId;

/// The orientation-preserving relabelings of the four corners.
const EVEN_PERMS: [[usize; 4]; 12] = [
    [0, 1, 2, 3],
    [0, 2, 3, 1],
    [0, 3, 1, 2],
    [1, 0, 3, 2],
    [1, 2, 0, 3],
    [1, 3, 2, 0],
    [2, 0, 1, 3],
    [2, 1, 3, 0],
    [2, 3, 0, 1],
    [3, 0, 2, 1],
    [3, 1, 0, 2],
    [3, 2, 1, 0],
];

/// Split case of a canonical marked-edge mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TetSplit {
    Keep,
    OneEdge,
    TwoAdjacent,
    TwoOpposite,
    ThreeFace,
    ThreeCorner,
    ThreePath,
    ThreePathMirrored,
    FourUnmarkedAdjacent,
    FourUnmarkedOpposite,
    FiveEdges,
    SixEdges,
}

/// One canonical mask per case, bit `k` = local edge `k` of the table
/// (0,1), (1,2), (2,0), (0,3), (1,3), (2,3).
const CANONICAL_CASES: [(TetSplit, usize); 12] = [
    (TetSplit::Keep, 0b000000),
    (TetSplit::OneEdge, 0b000001),
    (TetSplit::TwoAdjacent, 0b000011),
    (TetSplit::TwoOpposite, 0b100001),
    (TetSplit::ThreeFace, 0b000111),
    (TetSplit::ThreeCorner, 0b001101),
    (TetSplit::ThreePath, 0b100011),
    (TetSplit::ThreePathMirrored, 0b110001),
    (TetSplit::FourUnmarkedAdjacent, 0b111100),
    (TetSplit::FourUnmarkedOpposite, 0b011110),
    (TetSplit::FiveEdges, 0b011111),
    (TetSplit::SixEdges, 0b111111),
];

#[derive(Copy, Clone)]
struct Dispatch {
    perm: [usize; 4],
    case: TetSplit,
}

/// Case and relabeling for each of the 64 masks. Built by pushing every
/// canonical mask through the even permutations; the first relabeling that
/// reaches a mask wins, which keeps the table deterministic.
static DISPATCH: Lazy<[Dispatch; 64]> = Lazy::new(|| {
    let edges = CellType::Tetrahedron.local_edges();
    let mut table: [Option<Dispatch>; 64] = [None; 64];
    for (case, canonical) in CANONICAL_CASES {
        for perm in EVEN_PERMS {
            let mut mask = 0usize;
            for (k, e) in edges.iter().enumerate() {
                if canonical & (1 << k) != 0 {
                    mask |= 1 << local_edge_between(edges, perm[e[0]], perm[e[1]]);
                }
            }
            if table[mask].is_none() {
                table[mask] = Some(Dispatch { perm, case });
            }
        }
    }
    table.map(|d| d.expect("every tetrahedron mask relabels onto a canonical case"))
});

pub(crate) fn split(
    r: &mut CellRefiner<'_>,
    verts: &[ElementId],
    mask: usize,
    mids: &[Option<ElementId>],
) -> Result<(), TopoMeshError> {
    let edges = CellType::Tetrahedron.local_edges();
    let d = DISPATCH[mask];
    let (c, m) = relabel::<4, 6>(edges, &d.perm, verts, mids);
    match d.case {
        TetSplit::Keep => r.make(CellType::Tetrahedron, &c),
        TetSplit::OneEdge => one_edge(r, &c, &m),
        TetSplit::TwoAdjacent => two_adjacent(r, &c, &m),
        TetSplit::TwoOpposite => two_opposite(r, &c, &m),
        TetSplit::ThreeFace => three_face(r, &c, &m),
        TetSplit::ThreeCorner => three_corner(r, &c, &m),
        TetSplit::ThreePath => {
            let mids = [midpoint_of(&m, 0), midpoint_of(&m, 1), midpoint_of(&m, 5)];
            path_split(r, [c[0], c[1], c[2], c[3]], mids, false)
        }
        TetSplit::ThreePathMirrored => {
            let mids = [midpoint_of(&m, 0), midpoint_of(&m, 4), midpoint_of(&m, 5)];
            path_split(r, [c[0], c[1], c[3], c[2]], mids, true)
        }
        TetSplit::FourUnmarkedAdjacent => four_unmarked_adjacent(r, &c, &m),
        TetSplit::FourUnmarkedOpposite => four_unmarked_opposite(r, &c, &m),
        TetSplit::FiveEdges => five_edges(r, &c, &m),
        TetSplit::SixEdges => six_edges(r, &c, &m),
    }
}

/// Edge (0,1) marked: bisect toward the opposite edge.
fn one_edge(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    r.make(CellType::Tetrahedron, &[c[0], m01, c[2], c[3]])?;
    r.make(CellType::Tetrahedron, &[m01, c[1], c[2], c[3]])
}

/// Edges (0,1) and (1,2) marked: a corner child at vertex 1 plus the split
/// of the remaining wedge-shaped region along its shorter diagonal.
fn two_adjacent(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    r.make(CellType::Tetrahedron, &[m01, c[1], m12, c[3]])?;
    if r.use_first_diagonal((c[0], m12), (m01, c[2]))? {
        r.make(CellType::Tetrahedron, &[c[0], m01, m12, c[3]])?;
        r.make(CellType::Tetrahedron, &[c[0], m12, c[2], c[3]])
    } else {
        r.make(CellType::Tetrahedron, &[c[0], m01, c[2], c[3]])?;
        r.make(CellType::Tetrahedron, &[m01, m12, c[2], c[3]])
    }
}

/// Edges (0,1) and (2,3) marked: both splits cross, four children.
fn two_opposite(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m23 = midpoint_of(m, 5);
    r.make(CellType::Tetrahedron, &[c[0], m01, c[2], m23])?;
    r.make(CellType::Tetrahedron, &[c[0], m01, m23, c[3]])?;
    r.make(CellType::Tetrahedron, &[m01, c[1], c[2], m23])?;
    r.make(CellType::Tetrahedron, &[m01, c[1], m23, c[3]])
}

/// The three edges of face (0,1,2) marked: the face refines like a uniform
/// triangle, every child keeps the apex.
fn three_face(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    let m20 = midpoint_of(m, 2);
    r.make(CellType::Tetrahedron, &[c[0], m01, m20, c[3]])?;
    r.make(CellType::Tetrahedron, &[m01, c[1], m12, c[3]])?;
    r.make(CellType::Tetrahedron, &[m20, m12, c[2], c[3]])?;
    r.make(CellType::Tetrahedron, &[m01, m12, m20, c[3]])
}

/// The three edges at corner 0 marked: a corner child plus a prism.
fn three_corner(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m20 = midpoint_of(m, 2);
    let m03 = midpoint_of(m, 3);
    r.make(CellType::Tetrahedron, &[c[0], m01, m20, m03])?;
    let top = [m01, m20, m03];
    let bottom = [c[1], c[2], c[3]];
    let arrows = [
        quad_arrow(r, top[0], top[1], bottom[0], bottom[1])?,
        quad_arrow(r, top[1], top[2], bottom[1], bottom[2])?,
        quad_arrow(r, top[2], top[0], bottom[2], bottom[0])?,
    ];
    prism_split(r, top, bottom, arrows)
}

/// Marked edges forming the path `v0-v1-v2-v3` over the relabeled corners
/// `v`, with `m` holding the midpoints of its three legs. `flip` swaps the
/// first two corners of every child to restore orientation for mirrored
/// paths.
fn path_split(
    r: &mut CellRefiner<'_>,
    v: [ElementId; 4],
    m: [ElementId; 3],
    flip: bool,
) -> Result<(), TopoMeshError> {
    let [va, vb, vc, vd] = v;
    let [mab, mbc, mcd] = m;
    let p = r.use_first_diagonal((mab, vc), (va, mbc))?;
    let q = r.use_first_diagonal((mbc, vd), (vb, mcd))?;
    let tets = [
        [va, mab, mcd, vd],
        if q { [mab, vb, mbc, vd] } else { [mab, vb, mbc, mcd] },
        if q { [mab, mbc, mcd, vd] } else { [mab, vb, mcd, vd] },
        if p { [mab, mbc, vc, mcd] } else { [va, mbc, vc, mcd] },
        if p { [va, mab, vc, mcd] } else { [va, mab, mbc, mcd] },
    ];
    for mut t in tets {
        if flip {
            t.swap(0, 1);
        }
        r.make(CellType::Tetrahedron, &t)?;
    }
    Ok(())
}

/// Four edges marked, the unmarked pair (0,1)/(1,2) adjacent at corner 1:
/// two children near corner 3 plus two split quadrilateral regions.
fn four_unmarked_adjacent(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m20 = midpoint_of(m, 2);
    let m03 = midpoint_of(m, 3);
    let m13 = midpoint_of(m, 4);
    let m23 = midpoint_of(m, 5);
    r.make(CellType::Tetrahedron, &[m03, m13, m23, c[3]])?;
    r.make(CellType::Tetrahedron, &[m20, m23, m03, m13])?;
    if r.use_first_diagonal((m03, c[1]), (c[0], m13))? {
        r.make(CellType::Tetrahedron, &[c[0], c[1], m20, m03])?;
        r.make(CellType::Tetrahedron, &[m20, m03, c[1], m13])?;
    } else {
        r.make(CellType::Tetrahedron, &[c[0], c[1], m20, m13])?;
        r.make(CellType::Tetrahedron, &[c[0], m20, m03, m13])?;
    }
    if r.use_first_diagonal((m13, c[2]), (c[1], m23))? {
        r.make(CellType::Tetrahedron, &[m20, c[1], c[2], m13])?;
        r.make(CellType::Tetrahedron, &[m20, c[2], m23, m13])
    } else {
        r.make(CellType::Tetrahedron, &[m20, c[1], c[2], m23])?;
        r.make(CellType::Tetrahedron, &[m20, c[1], m23, m13])
    }
}

/// Four edges marked, the unmarked pair (0,1)/(2,3) opposite: two prisms
/// sharing the quadrilateral (m20, m03, m13, m12), whose diagonal is chosen
/// once for both.
fn four_unmarked_opposite(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m12 = midpoint_of(m, 1);
    let m20 = midpoint_of(m, 2);
    let m03 = midpoint_of(m, 3);
    let m13 = midpoint_of(m, 4);
    let top1 = [c[0], m20, m03];
    let bottom1 = [c[1], m12, m13];
    let first1 = quad_arrow(r, top1[0], top1[1], bottom1[0], bottom1[1])?;
    let last1 = quad_arrow(r, top1[2], top1[0], bottom1[2], bottom1[0])?;
    let top2 = [c[2], m20, m12];
    let bottom2 = [c[3], m03, m13];
    let first2 = quad_arrow(r, top2[0], top2[1], bottom2[0], bottom2[1])?;
    let last2 = quad_arrow(r, top2[2], top2[0], bottom2[2], bottom2[0])?;
    let shared = match forced_middle(first1, last1).or(forced_middle(first2, last2)) {
        Some(arrow) => arrow,
        None => quad_arrow(r, m20, m03, m12, m13)?,
    };
    prism_split(r, top1, bottom1, [first1, shared, last1])?;
    prism_split(r, top2, bottom2, [first2, shared, last2])
}

/// All edges but (2,3) marked: corner children at vertices 0 and 1, a prism
/// along the unmarked edge, and a pyramid under m01 glued to the prism's
/// interior diagonal.
fn five_edges(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    let m20 = midpoint_of(m, 2);
    let m03 = midpoint_of(m, 3);
    let m13 = midpoint_of(m, 4);
    r.make(CellType::Tetrahedron, &[c[0], m01, m20, m03])?;
    r.make(CellType::Tetrahedron, &[m01, c[1], m12, m13])?;
    let top = [c[2], m20, m12];
    let bottom = [c[3], m03, m13];
    let first = quad_arrow(r, top[0], top[1], bottom[0], bottom[1])?;
    let last = quad_arrow(r, top[2], top[0], bottom[2], bottom[0])?;
    let middle = match forced_middle(first, last) {
        Some(arrow) => arrow,
        None => quad_arrow(r, top[1], top[2], bottom[1], bottom[2])?,
    };
    prism_split(r, top, bottom, [first, middle, last])?;
    match middle {
        Arrow::Forward => {
            r.make(CellType::Tetrahedron, &[m20, m13, m03, m01])?;
            r.make(CellType::Tetrahedron, &[m20, m12, m13, m01])
        }
        Arrow::Backward => {
            r.make(CellType::Tetrahedron, &[m03, m20, m12, m01])?;
            r.make(CellType::Tetrahedron, &[m03, m12, m13, m01])
        }
    }
}

/// All edges marked: four corner children plus the central octahedron split
/// around its shortest diagonal.
fn six_edges(
    r: &mut CellRefiner<'_>,
    c: &[ElementId; 4],
    m: &[Option<ElementId>; 6],
) -> Result<(), TopoMeshError> {
    let m01 = midpoint_of(m, 0);
    let m12 = midpoint_of(m, 1);
    let m20 = midpoint_of(m, 2);
    let m03 = midpoint_of(m, 3);
    let m13 = midpoint_of(m, 4);
    let m23 = midpoint_of(m, 5);
    r.make(CellType::Tetrahedron, &[c[0], m01, m20, m03])?;
    r.make(CellType::Tetrahedron, &[m01, c[1], m12, m13])?;
    r.make(CellType::Tetrahedron, &[m20, m12, c[2], m23])?;
    r.make(CellType::Tetrahedron, &[m03, m13, m23, c[3]])?;
    let d1 = (m01, m23);
    let d2 = (m20, m13);
    let d3 = (m03, m12);
    let shortest = r.shorter_diagonal(r.shorter_diagonal(d1, d2)?, d3)?;
    let tets: [[ElementId; 4]; 4] = if shortest == d1 {
        [
            [m23, m01, m20, m12],
            [m23, m01, m12, m13],
            [m23, m01, m13, m03],
            [m23, m01, m03, m20],
        ]
    } else if shortest == d2 {
        [
            [m20, m13, m01, m12],
            [m20, m13, m12, m23],
            [m20, m13, m23, m03],
            [m20, m13, m03, m01],
        ]
    } else {
        [
            [m03, m12, m01, m20],
            [m03, m12, m20, m23],
            [m03, m12, m23, m13],
            [m03, m12, m13, m01],
        ]
    };
    for t in tets {
        r.make(CellType::Tetrahedron, &t)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Prism splitting
// ---------------------------------------------------------------------

/// Diagonal orientation of quad face `k` of a prism, joining corners `k`
/// and `k + 1` of the top and bottom triangles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Arrow {
    /// Diagonal from `top[k]` to `bottom[k + 1]`.
    Forward,
    /// Diagonal from `top[k + 1]` to `bottom[k]`.
    Backward,
}

/// Stable diagonal choice for the quad face spanned by two top and two
/// bottom corners.
fn quad_arrow(
    r: &CellRefiner<'_>,
    top_a: ElementId,
    top_b: ElementId,
    bottom_a: ElementId,
    bottom_b: ElementId,
) -> Result<Arrow, TopoMeshError> {
    Ok(if r.use_first_diagonal((top_a, bottom_b), (top_b, bottom_a))? {
        Arrow::Forward
    } else {
        Arrow::Backward
    })
}

/// Middle arrow forced by the outer arrows of a prism: matching outer
/// arrows leave a single middle orientation that avoids a cyclic
/// tournament.
fn forced_middle(first: Arrow, last: Arrow) -> Option<Arrow> {
    match (first, last) {
        (Arrow::Forward, Arrow::Forward) => Some(Arrow::Backward),
        (Arrow::Backward, Arrow::Backward) => Some(Arrow::Forward),
        _ => None,
    }
}

/// Split the prism `top` over `bottom` into three tetrahedra along the
/// chosen quad-face diagonals.
///
/// # Panics
/// Panics when the arrows form a cycle; cyclic diagonal choices admit no
/// three-tetrahedra split and violate the refinement invariant.
fn prism_split(
    r: &mut CellRefiner<'_>,
    top: [ElementId; 3],
    bottom: [ElementId; 3],
    arrows: [Arrow; 3],
) -> Result<(), TopoMeshError> {
    let mut out_degree = [0usize; 3];
    for (k, arrow) in arrows.iter().enumerate() {
        match arrow {
            Arrow::Forward => out_degree[k] += 1,
            Arrow::Backward => out_degree[(k + 1) % 3] += 1,
        }
    }
    let source = out_degree.iter().position(|&d| d == 2);
    let target = out_degree.iter().position(|&d| d == 0);
    let (s, t) = match (source, target) {
        (Some(s), Some(t)) => (s, t),
        _ => panic!("prism diagonal arrows form a cycle"),
    };
    let mid = 3 - s - t;
    let tet1 = [top[0], top[1], top[2], bottom[t]];
    let mut tet2 = [top[mid], top[s], bottom[t], bottom[mid]];
    let mut tet3 = [top[s], bottom[t], bottom[mid], bottom[s]];
    if matches!((s, mid, t), (0, 1, 2) | (1, 2, 0) | (2, 0, 1)) {
        tet2.swap(0, 1);
        tet3.swap(0, 1);
    }
    r.make(CellType::Tetrahedron, &tet1)?;
    r.make(CellType::Tetrahedron, &tet2)?;
    r.make(CellType::Tetrahedron, &tet3)
}
