use topomesh::geometry::mesh_volume;
use topomesh::refine::{refine, RefinementMarks};
use topomesh::topology::cell_type::CellType;
use topomesh::topology::element::ElementId;
use topomesh::topology::hierarchy::MeshHierarchy;
use topomesh::TopoMeshError;

const CUBE: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];
const WEDGE: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
];
const PYRAMID: [[f64; 3]; 5] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.5, 0.5, 1.0],
];
const TET: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
];

fn single_cell(cell_type: CellType, coords: &[[f64; 3]]) -> (MeshHierarchy, ElementId) {
    let mut h = MeshHierarchy::new(3).unwrap();
    let verts: Vec<ElementId> = coords.iter().map(|c| h.make_vertex(c).unwrap()).collect();
    let root = h.root();
    let (cell, _) = h.get_make_element(root, cell_type, &verts, true).unwrap();
    (h, cell)
}

fn volume_cases() -> [(CellType, &'static [[f64; 3]]); 4] {
    [
        (CellType::Tetrahedron, &TET),
        (CellType::Hexahedron, &CUBE),
        (CellType::Wedge, &WEDGE),
        (CellType::Pyramid, &PYRAMID),
    ]
}

#[test]
fn volume_cells_materialize_their_full_boundary_chain() {
    for (cell_type, coords) in volume_cases() {
        let (h, cell) = single_cell(cell_type, coords);
        let cell_verts = h.boundary(cell, 0).unwrap().to_vec();
        let edges = h.boundary(cell, 1).unwrap().to_vec();
        let faces = h.boundary(cell, 2).unwrap().to_vec();
        assert_eq!(edges.len(), cell_type.edge_count(), "{cell_type:?}");
        assert_eq!(faces.len(), cell_type.face_count(), "{cell_type:?}");

        for &e in &edges {
            for v in h.boundary(e, 0).unwrap() {
                assert!(cell_verts.contains(v), "{cell_type:?} edge {e}");
            }
        }
        for &f in &faces {
            for v in h.boundary(f, 0).unwrap() {
                assert!(cell_verts.contains(v), "{cell_type:?} face {f}");
            }
            // A face's own edges are drawn from the cell's edge list.
            for fe in h.boundary(f, 1).unwrap() {
                assert!(edges.contains(fe), "{cell_type:?} face {f}");
            }
        }
    }
}

#[test]
fn shared_boundary_elements_are_created_once() {
    // Two cubes stacked along z share the quad face between them.
    let mut h = MeshHierarchy::new(3).unwrap();
    let mut lower = Vec::new();
    let mut shared = Vec::new();
    let mut upper = Vec::new();
    for z in 0..3 {
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let v = h.make_vertex(&[x, y, f64::from(z)]).unwrap();
            match z {
                0 => lower.push(v),
                1 => shared.push(v),
                _ => upper.push(v),
            }
        }
    }
    let root = h.root();
    let bottom: Vec<ElementId> = lower.iter().chain(&shared).copied().collect();
    let top: Vec<ElementId> = shared.iter().chain(&upper).copied().collect();
    h.get_make_element(root, CellType::Hexahedron, &bottom, true)
        .unwrap();
    h.get_make_element(root, CellType::Hexahedron, &top, true)
        .unwrap();

    // 6 + 6 faces, minus the one in the middle; 12 + 12 edges, minus 4.
    assert_eq!(h.element_count(2), 11);
    assert_eq!(h.element_count(1), 20);
    let mid = h.get_element(CellType::Quadrilateral, &shared).unwrap();
    assert!(mid.is_some());
}

#[test]
fn unmarked_cells_of_every_volume_type_are_copied() {
    for (cell_type, coords) in volume_cases() {
        let (h, cell) = single_cell(cell_type, coords);
        let before = mesh_volume(&h, h.root()).unwrap();
        let out = refine(&h, &RefinementMarks::none(&h)).unwrap();

        for dim in 0..=3 {
            assert_eq!(
                out.element_count(dim),
                h.element_count(dim),
                "{cell_type:?} dimension {dim}"
            );
        }
        let copy = ElementId::new(3, 0);
        assert_eq!(out.element_cell_type(copy).unwrap(), cell_type);
        assert_eq!(out.element_parent(copy).unwrap(), Some(cell));
        assert!((mesh_volume(&out, out.root()).unwrap() - before).abs() < 1e-12);
    }
}

#[test]
fn marked_cells_without_a_split_rule_are_rejected() {
    for (cell_type, coords) in volume_cases() {
        if cell_type == CellType::Tetrahedron {
            continue;
        }
        let (h, cell) = single_cell(cell_type, coords);
        let edges = h.boundary(cell, 1).unwrap().to_vec();
        let mut marks = RefinementMarks::none(&h);
        marks.mark(edges[0]);
        let err = refine(&h, &marks).unwrap_err();
        assert!(
            matches!(err, TopoMeshError::UnsupportedRefinementCellType { .. }),
            "{cell_type:?}: {err}"
        );
    }
}

#[test]
fn polygons_are_copied_but_never_split() {
    let mut h = MeshHierarchy::new(2).unwrap();
    let v = [
        h.make_vertex(&[0.0, 0.0]).unwrap(),
        h.make_vertex(&[2.0, 0.0]).unwrap(),
        h.make_vertex(&[2.0, 2.0]).unwrap(),
        h.make_vertex(&[1.0, 3.0]).unwrap(),
        h.make_vertex(&[0.0, 2.0]).unwrap(),
    ];
    let root = h.root();
    let (cell, _) = h
        .get_make_element(root, CellType::Polygon(5), &v, true)
        .unwrap();

    let out = refine(&h, &RefinementMarks::none(&h)).unwrap();
    assert_eq!(out.element_count(2), 1);
    assert_eq!(
        out.element_cell_type(ElementId::new(2, 0)).unwrap(),
        CellType::Polygon(5)
    );

    let edges = h.boundary(cell, 1).unwrap().to_vec();
    assert_eq!(edges.len(), 5);
    let mut marks = RefinementMarks::none(&h);
    marks.mark(edges[3]);
    let err = refine(&h, &marks).unwrap_err();
    assert!(matches!(
        err,
        TopoMeshError::UnsupportedRefinementCellType { .. }
    ));
}
