//! Geometric measures for hierarchy elements.
//!
//! Measures follow the topological dimension: length for lines, area for 2D
//! cells, volume for 3D cells. Coordinates of hierarchies with a geometric
//! dimension below 3 are zero-padded, so 1D and 2D meshes work unchanged.
//! Volume cells are measured through fixed straight-edge tetrahedral
//! decompositions; curved geometry is out of scope.

use crate::error::TopoMeshError;
use crate::topology::cell_type::CellType;
use crate::topology::element::{ElementId, MeshId};
use crate::topology::hierarchy::MeshHierarchy;

/// Signed volume of the tetrahedron spanned by `a`, `b`, `c`, `d`.
///
/// Positive when `(b - a, c - a, d - a)` is a right-handed frame.
pub fn tetrahedron_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    dot(sub(b, a), cross(sub(c, a), sub(d, a))) / 6.0
}

/// Length / area / volume of `element`, by its cell type.
///
/// Vertices measure 0. Polygons are measured as a triangle fan around their
/// first vertex and must be planar and convex for the result to be exact.
///
/// # Errors
/// Returns `UnknownElement` for stale ids.
pub fn cell_measure(h: &MeshHierarchy, element: ElementId) -> Result<f64, TopoMeshError> {
    let cell_type = h.element_cell_type(element)?;
    if element.is_vertex() {
        return Ok(0.0);
    }
    let p = corners(h, element)?;
    Ok(match cell_type {
        CellType::Vertex => 0.0,
        CellType::Line => norm(sub(p[1], p[0])),
        CellType::Triangle => 0.5 * norm(cross(sub(p[1], p[0]), sub(p[2], p[0]))),
        CellType::Quadrilateral | CellType::Polygon(_) => fan_area(&p),
        CellType::Tetrahedron => tetrahedron_volume(p[0], p[1], p[2], p[3]).abs(),
        CellType::Hexahedron => hexahedron_volume(&p).abs(),
        CellType::Wedge => wedge_volume(&p).abs(),
        CellType::Pyramid => pyramid_volume(&p).abs(),
    })
}

/// Total measure of the highest-dimensional elements of `mesh`.
///
/// The name follows the 3D case; for a surface mesh this is the total area,
/// for a line mesh the total length.
///
/// # Errors
/// Returns `UnknownMesh` for stale ids.
pub fn mesh_volume(h: &MeshHierarchy, mesh: MeshId) -> Result<f64, TopoMeshError> {
    let cell_dim = h.cell_dimension();
    let mut total = 0.0;
    for &cell in h.mesh_elements(mesh, cell_dim)? {
        total += cell_measure(h, cell)?;
    }
    Ok(total)
}

/// Total measure of the boundary facets of `mesh`.
///
/// Builds (or reuses) the mesh's boundary classification and sums the
/// measures of the flagged elements one dimension below the cells.
///
/// # Errors
/// Those of [`MeshHierarchy::boundary_flags`].
pub fn boundary_surface(h: &mut MeshHierarchy, mesh: MeshId) -> Result<f64, TopoMeshError> {
    let cell_dim = h.cell_dimension();
    if cell_dim == 0 {
        return Ok(0.0);
    }
    let facet_dim = cell_dim - 1;
    let facets: Vec<ElementId> = h
        .boundary_flags(mesh)?
        .flagged()
        .iter()
        .copied()
        .filter(|f| f.dimension() == facet_dim)
        .collect();
    let mut total = 0.0;
    for f in facets {
        total += cell_measure(h, f)?;
    }
    Ok(total)
}

/// Corner coordinates of `element`, zero-padded to 3D.
fn corners(h: &MeshHierarchy, element: ElementId) -> Result<Vec<[f64; 3]>, TopoMeshError> {
    let verts = h.boundary(element, 0)?;
    let mut out = Vec::with_capacity(verts.len());
    for &v in verts {
        let coords = h.vertex_coords(v)?;
        let mut p = [0.0; 3];
        p[..coords.len()].copy_from_slice(coords);
        out.push(p);
    }
    Ok(out)
}

/// Triangle-fan area around the first corner.
fn fan_area(p: &[[f64; 3]]) -> f64 {
    let mut area = 0.0;
    for i in 1..p.len() - 1 {
        area += 0.5 * norm(cross(sub(p[i], p[0]), sub(p[i + 1], p[0])));
    }
    area
}

fn hexahedron_volume(p: &[[f64; 3]]) -> f64 {
    tetrahedron_volume(p[0], p[1], p[3], p[4])
        + tetrahedron_volume(p[1], p[2], p[3], p[6])
        + tetrahedron_volume(p[1], p[3], p[4], p[6])
        + tetrahedron_volume(p[1], p[4], p[5], p[6])
        + tetrahedron_volume(p[3], p[4], p[6], p[7])
}

fn wedge_volume(p: &[[f64; 3]]) -> f64 {
    tetrahedron_volume(p[0], p[1], p[2], p[3])
        + tetrahedron_volume(p[1], p[4], p[2], p[3])
        + tetrahedron_volume(p[2], p[4], p[5], p[3])
}

fn pyramid_volume(p: &[[f64; 3]]) -> f64 {
    tetrahedron_volume(p[0], p[1], p[2], p[4])
        + tetrahedron_volume(p[0], p[2], p[3], p[4])
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn signed_tetrahedron_volume_tracks_orientation() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [0.0, 1.0, 0.0];
        let d = [0.0, 0.0, 1.0];
        assert!(approx(tetrahedron_volume(a, b, c, d), 1.0 / 6.0));
        assert!(approx(tetrahedron_volume(a, c, b, d), -1.0 / 6.0));
    }

    #[test]
    fn line_length_in_one_geometric_dimension() {
        let mut h = MeshHierarchy::new(1).unwrap();
        let v0 = h.make_vertex(&[1.0]).unwrap();
        let v1 = h.make_vertex(&[4.0]).unwrap();
        let root = h.root();
        let (l, _) = h
            .get_make_element(root, CellType::Line, &[v0, v1], false)
            .unwrap();
        assert!(approx(cell_measure(&h, l).unwrap(), 3.0));
        assert!(approx(cell_measure(&h, v0).unwrap(), 0.0));
    }

    #[test]
    fn planar_cell_areas() {
        let mut h = MeshHierarchy::new(2).unwrap();
        let v = [
            h.make_vertex(&[0.0, 0.0]).unwrap(),
            h.make_vertex(&[4.0, 0.0]).unwrap(),
            h.make_vertex(&[0.0, 3.0]).unwrap(),
        ];
        let root = h.root();
        let (t, _) = h
            .get_make_element(root, CellType::Triangle, &v, false)
            .unwrap();
        assert!(approx(cell_measure(&h, t).unwrap(), 6.0));

        let q = [
            h.make_vertex(&[10.0, 0.0]).unwrap(),
            h.make_vertex(&[11.0, 0.0]).unwrap(),
            h.make_vertex(&[11.0, 1.0]).unwrap(),
            h.make_vertex(&[10.0, 1.0]).unwrap(),
        ];
        let (quad, _) = h
            .get_make_element(root, CellType::Quadrilateral, &q, false)
            .unwrap();
        assert!(approx(cell_measure(&h, quad).unwrap(), 1.0));
    }

    #[test]
    fn convex_polygon_area_matches_the_shoelace_value() {
        let mut h = MeshHierarchy::new(2).unwrap();
        let v = [
            h.make_vertex(&[0.0, 0.0]).unwrap(),
            h.make_vertex(&[2.0, 0.0]).unwrap(),
            h.make_vertex(&[2.0, 2.0]).unwrap(),
            h.make_vertex(&[1.0, 3.0]).unwrap(),
            h.make_vertex(&[0.0, 2.0]).unwrap(),
        ];
        let root = h.root();
        let (p, _) = h
            .get_make_element(root, CellType::Polygon(5), &v, false)
            .unwrap();
        assert!(approx(cell_measure(&h, p).unwrap(), 5.0));
    }

    #[test]
    fn volume_cell_measures() {
        let mut h = MeshHierarchy::new(3).unwrap();
        let root = h.root();

        let t = [
            h.make_vertex(&[0.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[1.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[0.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[0.0, 0.0, 1.0]).unwrap(),
        ];
        let (tet, _) = h
            .get_make_element(root, CellType::Tetrahedron, &t, false)
            .unwrap();
        assert!(approx(cell_measure(&h, tet).unwrap(), 1.0 / 6.0));

        let c = [
            h.make_vertex(&[2.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[3.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[3.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[2.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[2.0, 0.0, 1.0]).unwrap(),
            h.make_vertex(&[3.0, 0.0, 1.0]).unwrap(),
            h.make_vertex(&[3.0, 1.0, 1.0]).unwrap(),
            h.make_vertex(&[2.0, 1.0, 1.0]).unwrap(),
        ];
        let (hex, _) = h
            .get_make_element(root, CellType::Hexahedron, &c, false)
            .unwrap();
        assert!(approx(cell_measure(&h, hex).unwrap(), 1.0));

        let w = [
            h.make_vertex(&[5.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[6.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[5.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[5.0, 0.0, 1.0]).unwrap(),
            h.make_vertex(&[6.0, 0.0, 1.0]).unwrap(),
            h.make_vertex(&[5.0, 1.0, 1.0]).unwrap(),
        ];
        let (wedge, _) = h
            .get_make_element(root, CellType::Wedge, &w, false)
            .unwrap();
        assert!(approx(cell_measure(&h, wedge).unwrap(), 0.5));

        let p = [
            h.make_vertex(&[8.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[9.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[9.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[8.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[8.5, 0.5, 1.0]).unwrap(),
        ];
        let (pyr, _) = h
            .get_make_element(root, CellType::Pyramid, &p, false)
            .unwrap();
        assert!(approx(cell_measure(&h, pyr).unwrap(), 1.0 / 3.0));
    }

    #[test]
    fn mesh_volume_and_boundary_surface_of_a_unit_square() {
        let mut h = MeshHierarchy::new(2).unwrap();
        let v0 = h.make_vertex(&[0.0, 0.0]).unwrap();
        let v1 = h.make_vertex(&[1.0, 0.0]).unwrap();
        let v2 = h.make_vertex(&[1.0, 1.0]).unwrap();
        let v3 = h.make_vertex(&[0.0, 1.0]).unwrap();
        let root = h.root();
        h.get_make_element(root, CellType::Triangle, &[v0, v1, v2], true)
            .unwrap();
        h.get_make_element(root, CellType::Triangle, &[v0, v2, v3], true)
            .unwrap();
        assert!(approx(mesh_volume(&h, root).unwrap(), 1.0));
        // Perimeter only; the interior diagonal is not flagged.
        assert!(approx(boundary_surface(&mut h, root).unwrap(), 4.0));
    }

    #[test]
    fn boundary_surface_of_a_unit_cube() {
        let mut h = MeshHierarchy::new(3).unwrap();
        let c = [
            h.make_vertex(&[0.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[1.0, 0.0, 0.0]).unwrap(),
            h.make_vertex(&[1.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[0.0, 1.0, 0.0]).unwrap(),
            h.make_vertex(&[0.0, 0.0, 1.0]).unwrap(),
            h.make_vertex(&[1.0, 0.0, 1.0]).unwrap(),
            h.make_vertex(&[1.0, 1.0, 1.0]).unwrap(),
            h.make_vertex(&[0.0, 1.0, 1.0]).unwrap(),
        ];
        let root = h.root();
        h.get_make_element(root, CellType::Hexahedron, &c, true)
            .unwrap();
        assert!(approx(mesh_volume(&h, root).unwrap(), 1.0));
        assert!(approx(boundary_surface(&mut h, root).unwrap(), 6.0));
    }
}
