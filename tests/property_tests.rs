use proptest::prelude::*;

use topomesh::geometry::{cell_measure, tetrahedron_volume};
use topomesh::refine::{refine, RefinementMarks};
use topomesh::topology::cell_type::CellType;
use topomesh::topology::element::ElementId;
use topomesh::topology::hierarchy::MeshHierarchy;

fn permute<T: Copy>(items: [T; 3], perm: usize) -> [T; 3] {
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    let o = orders[perm];
    [items[o[0]], items[o[1]], items[o[2]]]
}

proptest! {
    /// Lookup keys on an unordered vertex set, so any vertex order finds the
    /// element created first and leaves the hierarchy untouched.
    #[test]
    fn prop_element_lookup_ignores_vertex_order(perm in 0usize..6) {
        let mut h = MeshHierarchy::new(2).unwrap();
        let v0 = h.make_vertex(&[0.0, 0.0]).unwrap();
        let v1 = h.make_vertex(&[1.0, 0.0]).unwrap();
        let v2 = h.make_vertex(&[0.0, 1.0]).unwrap();
        let root = h.root();
        let (first, created) = h
            .get_make_element(root, CellType::Triangle, &[v0, v1, v2], true)
            .unwrap();
        prop_assert!(created);

        let before = (h.element_count(2), h.element_count(1), h.generation());
        let shuffled = permute([v0, v1, v2], perm);
        let (second, created) = h
            .get_make_element(root, CellType::Triangle, &shuffled, true)
            .unwrap();
        prop_assert!(!created);
        prop_assert_eq!(second, first);
        prop_assert_eq!(
            (h.element_count(2), h.element_count(1), h.generation()),
            before
        );
    }

    /// Any mask on any non-degenerate triangle partitions its area, and
    /// refining twice yields byte-identical output.
    #[test]
    fn prop_triangle_refinement_partitions_the_area(
        x1 in 0.5f64..2.0,
        y1 in -0.3f64..0.3,
        x2 in -0.5f64..0.5,
        y2 in 0.5f64..2.0,
        mask in 0usize..8,
    ) {
        let mut h = MeshHierarchy::new(2).unwrap();
        let v0 = h.make_vertex(&[0.0, 0.0]).unwrap();
        let v1 = h.make_vertex(&[x1, y1]).unwrap();
        let v2 = h.make_vertex(&[x2, y2]).unwrap();
        let root = h.root();
        let (cell, _) = h
            .get_make_element(root, CellType::Triangle, &[v0, v1, v2], true)
            .unwrap();
        let parent_area = cell_measure(&h, cell).unwrap();

        let mut marks = RefinementMarks::none(&h);
        for (i, &e) in h.boundary(cell, 1).unwrap().to_vec().iter().enumerate() {
            if mask & (1 << i) != 0 {
                marks.mark(e);
            }
        }
        let out = refine(&h, &marks).unwrap();

        let total: f64 = (0..out.element_count(2))
            .map(|i| cell_measure(&out, ElementId::new(2, i)).unwrap())
            .sum();
        prop_assert!((total - parent_area).abs() < 1e-12 * parent_area.max(1.0));
        prop_assert_eq!(out.vertex_count(), 3 + mask.count_ones() as usize);

        let again = refine(&h, &marks).unwrap();
        prop_assert_eq!(out.to_bytes().unwrap(), again.to_bytes().unwrap());
    }

    /// Any mask on any positively oriented tetrahedron partitions its volume
    /// into positively oriented children.
    #[test]
    fn prop_tetrahedron_refinement_partitions_the_volume(
        x1 in 0.5f64..2.0,
        x2 in -1.0f64..1.0,
        y2 in 0.5f64..2.0,
        x3 in -1.0f64..1.0,
        y3 in -1.0f64..1.0,
        z3 in 0.5f64..2.0,
        mask in 0usize..64,
    ) {
        let mut h = MeshHierarchy::new(3).unwrap();
        let v0 = h.make_vertex(&[0.0, 0.0, 0.0]).unwrap();
        let v1 = h.make_vertex(&[x1, 0.0, 0.0]).unwrap();
        let v2 = h.make_vertex(&[x2, y2, 0.0]).unwrap();
        let v3 = h.make_vertex(&[x3, y3, z3]).unwrap();
        let root = h.root();
        let (cell, _) = h
            .get_make_element(root, CellType::Tetrahedron, &[v0, v1, v2, v3], true)
            .unwrap();
        let parent_volume = x1 * y2 * z3 / 6.0;

        let mut marks = RefinementMarks::none(&h);
        for (i, &e) in h.boundary(cell, 1).unwrap().to_vec().iter().enumerate() {
            if mask & (1 << i) != 0 {
                marks.mark(e);
            }
        }
        let out = refine(&h, &marks).unwrap();

        let mut total = 0.0;
        for i in 0..out.element_count(3) {
            let child = ElementId::new(3, i);
            let p: Vec<[f64; 3]> = out
                .boundary(child, 0)
                .unwrap()
                .iter()
                .map(|&v| out.vertex_coords(v).unwrap().try_into().unwrap())
                .collect();
            let volume = tetrahedron_volume(p[0], p[1], p[2], p[3]);
            prop_assert!(volume > 0.0, "child {i} of mask {mask:#08b} is inverted");
            total += volume;
        }
        prop_assert!((total - parent_volume).abs() < 1e-12 * parent_volume.max(1.0));
        prop_assert_eq!(out.vertex_count(), 4 + mask.count_ones() as usize);
    }
}
