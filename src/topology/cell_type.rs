//! Cell type metadata and local boundary tables.
//!
//! Every element carries a [`CellType`] describing its shape. The tables in
//! this module fix, once and for all, the local numbering of a cell's edges
//! and faces; boundary extraction and refinement both index into them, so a
//! cell's stored boundary lists are always in local table order.

use serde::{Deserialize, Serialize};

/// Common cell types for mesh elements.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum CellType {
    /// 0D vertex.
    #[default]
    Vertex,
    /// 1D segment/edge.
    Line,
    /// 2D simplex (triangle).
    Triangle,
    /// 2D tensor-product cell (quad).
    Quadrilateral,
    /// 2D polygon with `n` vertices.
    Polygon(u8),
    /// 3D simplex (tet).
    Tetrahedron,
    /// 3D tensor-product cell (hex).
    Hexahedron,
    /// 3D wedge/prism.
    Wedge,
    /// 3D pyramid.
    Pyramid,
}

/// One face of a 3D cell, in the cell's local vertex numbering.
///
/// `edges[i]` is the local edge index connecting `vertices[i]` to
/// `vertices[(i + 1) % len]`.
#[derive(Clone, Copy, Debug)]
pub struct LocalFace {
    /// Shape of the face.
    pub cell_type: CellType,
    /// Local vertex indices, in cyclic order.
    pub vertices: &'static [usize],
    /// Local edge indices, aligned with `vertices`.
    pub edges: &'static [usize],
}

const fn face(cell_type: CellType, vertices: &'static [usize], edges: &'static [usize]) -> LocalFace {
    LocalFace {
        cell_type,
        vertices,
        edges,
    }
}

const TRIANGLE_EDGES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
const QUADRILATERAL_EDGES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

const TETRAHEDRON_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];
const TETRAHEDRON_FACES: [LocalFace; 4] = [
    face(CellType::Triangle, &[0, 1, 2], &[0, 1, 2]),
    face(CellType::Triangle, &[0, 1, 3], &[0, 4, 3]),
    face(CellType::Triangle, &[1, 2, 3], &[1, 5, 4]),
    face(CellType::Triangle, &[0, 2, 3], &[2, 5, 3]),
];

const HEXAHEDRON_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];
const HEXAHEDRON_FACES: [LocalFace; 6] = [
    face(CellType::Quadrilateral, &[0, 1, 2, 3], &[0, 1, 2, 3]),
    face(CellType::Quadrilateral, &[4, 5, 6, 7], &[4, 5, 6, 7]),
    face(CellType::Quadrilateral, &[0, 1, 5, 4], &[0, 9, 4, 8]),
    face(CellType::Quadrilateral, &[1, 2, 6, 5], &[1, 10, 5, 9]),
    face(CellType::Quadrilateral, &[2, 3, 7, 6], &[2, 11, 6, 10]),
    face(CellType::Quadrilateral, &[3, 0, 4, 7], &[3, 8, 7, 11]),
];

const WEDGE_EDGES: [[usize; 2]; 9] = [
    [0, 1],
    [1, 2],
    [2, 0],
    [3, 4],
    [4, 5],
    [5, 3],
    [0, 3],
    [1, 4],
    [2, 5],
];
const WEDGE_FACES: [LocalFace; 5] = [
    face(CellType::Triangle, &[0, 1, 2], &[0, 1, 2]),
    face(CellType::Triangle, &[3, 4, 5], &[3, 4, 5]),
    face(CellType::Quadrilateral, &[0, 1, 4, 3], &[0, 7, 3, 6]),
    face(CellType::Quadrilateral, &[1, 2, 5, 4], &[1, 8, 4, 7]),
    face(CellType::Quadrilateral, &[2, 0, 3, 5], &[2, 6, 5, 8]),
];

const PYRAMID_EDGES: [[usize; 2]; 8] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [0, 4],
    [1, 4],
    [2, 4],
    [3, 4],
];
const PYRAMID_FACES: [LocalFace; 5] = [
    face(CellType::Quadrilateral, &[0, 1, 2, 3], &[0, 1, 2, 3]),
    face(CellType::Triangle, &[0, 1, 4], &[0, 5, 4]),
    face(CellType::Triangle, &[1, 2, 4], &[1, 6, 5]),
    face(CellType::Triangle, &[2, 3, 4], &[2, 7, 6]),
    face(CellType::Triangle, &[3, 0, 4], &[3, 4, 7]),
];

impl CellType {
    /// Topological dimension of the cell.
    pub fn dimension(self) -> usize {
        match self {
            CellType::Vertex => 0,
            CellType::Line => 1,
            CellType::Triangle | CellType::Quadrilateral | CellType::Polygon(_) => 2,
            CellType::Tetrahedron | CellType::Hexahedron | CellType::Wedge | CellType::Pyramid => 3,
        }
    }

    /// Number of vertices spanning the cell.
    pub fn vertex_count(self) -> usize {
        match self {
            CellType::Vertex => 1,
            CellType::Line => 2,
            CellType::Triangle => 3,
            CellType::Quadrilateral => 4,
            CellType::Polygon(n) => n as usize,
            CellType::Tetrahedron => 4,
            CellType::Hexahedron => 8,
            CellType::Wedge => 6,
            CellType::Pyramid => 5,
        }
    }

    /// Number of 1D edges on the cell's boundary (0 for cells of dimension <= 1).
    pub fn edge_count(self) -> usize {
        match self {
            CellType::Vertex | CellType::Line => 0,
            CellType::Triangle => 3,
            CellType::Quadrilateral => 4,
            CellType::Polygon(n) => n as usize,
            CellType::Tetrahedron => 6,
            CellType::Hexahedron => 12,
            CellType::Wedge => 9,
            CellType::Pyramid => 8,
        }
    }

    /// Number of 2D faces on the cell's boundary (0 for cells of dimension <= 2).
    pub fn face_count(self) -> usize {
        match self {
            CellType::Tetrahedron => 4,
            CellType::Hexahedron => 6,
            CellType::Wedge | CellType::Pyramid => 5,
            _ => 0,
        }
    }

    /// Number of boundary elements of dimension `target_dim`.
    ///
    /// Returns 0 when `target_dim` is not below the cell's own dimension.
    pub fn boundary_count(self, target_dim: usize) -> usize {
        if target_dim >= self.dimension() {
            return 0;
        }
        match target_dim {
            0 => self.vertex_count(),
            1 => self.edge_count(),
            2 => self.face_count(),
            _ => 0,
        }
    }

    /// Local edge table: pairs of local vertex indices.
    ///
    /// `Polygon` returns the empty slice; its edges follow the cyclic pattern
    /// `(i, (i + 1) % n)` and are generated by the boundary extraction code.
    pub fn local_edges(self) -> &'static [[usize; 2]] {
        match self {
            CellType::Triangle => &TRIANGLE_EDGES,
            CellType::Quadrilateral => &QUADRILATERAL_EDGES,
            CellType::Tetrahedron => &TETRAHEDRON_EDGES,
            CellType::Hexahedron => &HEXAHEDRON_EDGES,
            CellType::Wedge => &WEDGE_EDGES,
            CellType::Pyramid => &PYRAMID_EDGES,
            _ => &[],
        }
    }

    /// Local face table for 3D cells; empty for everything else.
    pub fn local_faces(self) -> &'static [LocalFace] {
        match self {
            CellType::Tetrahedron => &TETRAHEDRON_FACES,
            CellType::Hexahedron => &HEXAHEDRON_FACES,
            CellType::Wedge => &WEDGE_FACES,
            CellType::Pyramid => &PYRAMID_FACES,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CellType; 9] = [
        CellType::Vertex,
        CellType::Line,
        CellType::Triangle,
        CellType::Quadrilateral,
        CellType::Polygon(5),
        CellType::Tetrahedron,
        CellType::Hexahedron,
        CellType::Wedge,
        CellType::Pyramid,
    ];

    #[test]
    fn counts_match_tables() {
        for ct in ALL {
            if !matches!(ct, CellType::Polygon(_)) {
                assert_eq!(ct.local_edges().len(), ct.edge_count(), "{ct:?}");
            }
            assert_eq!(ct.local_faces().len(), ct.face_count(), "{ct:?}");
        }
    }

    #[test]
    fn boundary_count_by_dimension() {
        assert_eq!(CellType::Tetrahedron.boundary_count(0), 4);
        assert_eq!(CellType::Tetrahedron.boundary_count(1), 6);
        assert_eq!(CellType::Tetrahedron.boundary_count(2), 4);
        assert_eq!(CellType::Tetrahedron.boundary_count(3), 0);
        assert_eq!(CellType::Triangle.boundary_count(2), 0);
        assert_eq!(CellType::Polygon(6).boundary_count(1), 6);
    }

    #[test]
    fn edge_tables_stay_in_range() {
        for ct in ALL {
            let n = ct.vertex_count();
            for e in ct.local_edges() {
                assert!(e[0] < n && e[1] < n, "{ct:?} edge {e:?}");
                assert_ne!(e[0], e[1], "{ct:?} edge {e:?}");
            }
        }
    }

    #[test]
    fn face_edges_connect_consecutive_face_vertices() {
        for ct in [
            CellType::Tetrahedron,
            CellType::Hexahedron,
            CellType::Wedge,
            CellType::Pyramid,
        ] {
            let edges = ct.local_edges();
            for f in ct.local_faces() {
                assert_eq!(f.vertices.len(), f.cell_type.vertex_count(), "{ct:?}");
                assert_eq!(f.edges.len(), f.vertices.len(), "{ct:?}");
                for i in 0..f.vertices.len() {
                    let a = f.vertices[i];
                    let b = f.vertices[(i + 1) % f.vertices.len()];
                    let e = edges[f.edges[i]];
                    let matches = (e[0] == a && e[1] == b) || (e[0] == b && e[1] == a);
                    assert!(matches, "{ct:?} face {f:?} edge slot {i}");
                }
            }
        }
    }

    #[test]
    fn every_cell_edge_appears_on_some_face() {
        for ct in [
            CellType::Tetrahedron,
            CellType::Hexahedron,
            CellType::Wedge,
            CellType::Pyramid,
        ] {
            let mut seen = vec![false; ct.edge_count()];
            for f in ct.local_faces() {
                for &e in f.edges {
                    seen[e] = true;
                }
            }
            assert!(seen.iter().all(|&s| s), "{ct:?}");
        }
    }
}
