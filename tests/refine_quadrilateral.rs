use topomesh::geometry::cell_measure;
use topomesh::refine::{refine, RefinementMarks};
use topomesh::topology::cell_type::CellType;
use topomesh::topology::element::ElementId;
use topomesh::topology::hierarchy::MeshHierarchy;

fn unit_square() -> (MeshHierarchy, ElementId) {
    let mut h = MeshHierarchy::new(2).unwrap();
    let v0 = h.make_vertex(&[0.0, 0.0]).unwrap();
    let v1 = h.make_vertex(&[1.0, 0.0]).unwrap();
    let v2 = h.make_vertex(&[1.0, 1.0]).unwrap();
    let v3 = h.make_vertex(&[0.0, 1.0]).unwrap();
    let root = h.root();
    let (cell, _) = h
        .get_make_element(root, CellType::Quadrilateral, &[v0, v1, v2, v3], true)
        .unwrap();
    (h, cell)
}

/// 2x2 grid of unit squares; returns the nine grid vertices row by row.
fn quad_grid() -> (MeshHierarchy, Vec<ElementId>) {
    let mut h = MeshHierarchy::new(2).unwrap();
    let mut verts = Vec::new();
    for y in 0..3 {
        for x in 0..3 {
            verts.push(h.make_vertex(&[x as f64, y as f64]).unwrap());
        }
    }
    let root = h.root();
    for y in 0..2 {
        for x in 0..2 {
            let i = y * 3 + x;
            let corners = [verts[i], verts[i + 1], verts[i + 4], verts[i + 3]];
            h.get_make_element(root, CellType::Quadrilateral, &corners, true)
                .unwrap();
        }
    }
    (h, verts)
}

fn signed_area(h: &MeshHierarchy, cell: ElementId) -> f64 {
    let verts = h.boundary(cell, 0).unwrap().to_vec();
    let mut area = 0.0;
    for i in 0..verts.len() {
        let a = h.vertex_coords(verts[i]).unwrap();
        let b = h.vertex_coords(verts[(i + 1) % verts.len()]).unwrap();
        area += a[0] * b[1] - b[0] * a[1];
    }
    0.5 * area
}

fn total_area(h: &MeshHierarchy) -> f64 {
    (0..h.element_count(2))
        .map(|i| cell_measure(h, ElementId::new(2, i)).unwrap())
        .sum()
}

#[test]
fn every_mask_preserves_area_and_orientation() {
    for mask in 0..16usize {
        let (h, cell) = unit_square();
        let edges = h.boundary(cell, 1).unwrap().to_vec();

        let mut marks = RefinementMarks::none(&h);
        for (i, &e) in edges.iter().enumerate() {
            if mask & (1 << i) != 0 {
                marks.mark(e);
            }
        }
        let out = refine(&h, &marks).unwrap();

        let expected_cells = match mask {
            0b0000 => 1,
            0b0001 | 0b0010 | 0b0100 | 0b1000 => 2,
            0b0101 | 0b1010 => 2,
            0b0011 | 0b0110 | 0b1100 | 0b1001 => 3,
            _ => 4,
        };
        let expected_vertices = 4 + mask.count_ones() as usize + usize::from(mask == 0b1111);
        assert_eq!(out.element_count(2), expected_cells, "mask {mask:#06b}");
        assert_eq!(out.vertex_count(), expected_vertices, "mask {mask:#06b}");
        assert!((total_area(&out) - 1.0).abs() < 1e-12, "mask {mask:#06b}");
        for i in 0..out.element_count(2) {
            let child = ElementId::new(2, i);
            assert!(signed_area(&out, child) > 0.0, "mask {mask:#06b} child {i}");
            assert_eq!(out.element_parent(child).unwrap(), Some(cell));
        }
    }
}

#[test]
fn opposite_splits_produce_two_quadrilaterals() {
    let (h, cell) = unit_square();
    let edges = h.boundary(cell, 1).unwrap().to_vec();
    let mut marks = RefinementMarks::none(&h);
    marks.mark(edges[0]);
    marks.mark(edges[2]);
    let out = refine(&h, &marks).unwrap();

    assert_eq!(out.element_count(2), 2);
    for i in 0..2 {
        let child = ElementId::new(2, i);
        assert_eq!(out.element_cell_type(child).unwrap(), CellType::Quadrilateral);
        assert!((cell_measure(&out, child).unwrap() - 0.5).abs() < 1e-12);
    }
}

#[test]
fn full_refinement_adds_a_center_vertex() {
    let (h, cell) = unit_square();
    let marks = RefinementMarks::all(&h);
    let out = refine(&h, &marks).unwrap();

    assert_eq!(out.element_count(2), 4);
    assert_eq!(out.vertex_count(), 9);
    for i in 0..4 {
        let child = ElementId::new(2, i);
        assert_eq!(out.element_cell_type(child).unwrap(), CellType::Quadrilateral);
        assert!((cell_measure(&out, child).unwrap() - 0.25).abs() < 1e-12);
    }

    // The center vertex is appended after the four corners and four midpoints.
    let center = ElementId::new(0, 8);
    assert_eq!(out.element_parent(center).unwrap(), Some(cell));
    let coords = out.vertex_coords(center).unwrap();
    assert!((coords[0] - 0.5).abs() < 1e-15);
    assert!((coords[1] - 0.5).abs() < 1e-15);
}

#[test]
fn single_split_on_a_grid_stays_conforming() {
    let (h, verts) = quad_grid();
    assert_eq!(h.element_count(2), 4);
    assert_eq!(h.vertex_count(), 9);

    // Mark one interior edge, incident to the shared center vertex. The two
    // quads carrying it split in two, the other two are copied unchanged.
    let edge = h.get_element(CellType::Line, &[verts[1], verts[4]]).unwrap().unwrap();
    let mut marks = RefinementMarks::none(&h);
    marks.mark(edge);
    let mut out = refine(&h, &marks).unwrap();

    assert_eq!(out.element_count(2), 6);
    assert_eq!(out.vertex_count(), 10);
    assert!((total_area(&out) - 4.0).abs() < 1e-10);

    let root = out.root();
    for i in 0..out.element_count(1) {
        let e = ElementId::new(1, i);
        let cells = out.coboundary(root, e, 2).unwrap().len();
        assert!(cells <= 2, "edge {e} carried by {cells} cells");
    }
}
